//! Core domain types for the peptide cycle tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Dosages and cycle lengths as typed, validated values
//! - Schedule intents produced by the parser
//! - Persisted schedules and the worker checkpoint

use crate::error::ParseFailure;
use crate::frequency::FrequencyDescriptor;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Largest dosage value accepted in any unit
pub const MAX_DOSAGE_VALUE: f64 = 10_000.0;

/// Cycle lengths outside this range are rejected
pub const MIN_CYCLE_DAYS: u32 = 1;
pub const MAX_CYCLE_DAYS: u32 = 365;

// ============================================================================
// Dosage Types
// ============================================================================

/// Unit a dose is measured in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DoseUnit {
    Mg,
    Mcg,
    Iu,
    Ml,
    Cc,
}

impl FromStr for DoseUnit {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mg" => Ok(Self::Mg),
            // Greek mu and the micro sign both show up in pasted text
            "mcg" | "μg" | "µg" | "ug" => Ok(Self::Mcg),
            "iu" => Ok(Self::Iu),
            "ml" => Ok(Self::Ml),
            "cc" => Ok(Self::Cc),
            other => Err(ParseFailure::dosage(format!("unknown unit '{}'", other))),
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mg => write!(f, "mg"),
            Self::Mcg => write!(f, "mcg"),
            Self::Iu => write!(f, "iu"),
            Self::Ml => write!(f, "ml"),
            Self::Cc => write!(f, "cc"),
        }
    }
}

/// A single dose amount, e.g. 1.5mg
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Dosage {
    pub value: f64,
    pub unit: DoseUnit,
}

impl Dosage {
    /// Build a dosage, rejecting non-positive and implausibly large values
    pub fn new(value: f64, unit: DoseUnit) -> Result<Self, ParseFailure> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ParseFailure::dosage(format!(
                "{} must be greater than zero",
                value
            )));
        }
        if value > MAX_DOSAGE_VALUE {
            return Err(ParseFailure::dosage(format!(
                "{}{} exceeds the {} limit",
                value, unit, MAX_DOSAGE_VALUE
            )));
        }
        Ok(Self { value, unit })
    }
}

impl fmt::Display for Dosage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

// ============================================================================
// Cycle Length Types
// ============================================================================

/// Unit of a declared cycle length
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
}

impl DurationUnit {
    /// Days per unit; a month is counted as 30 days
    pub fn days(self) -> u32 {
        match self {
            Self::Days => 1,
            Self::Weeks => 7,
            Self::Months => 30,
        }
    }
}

impl FromStr for DurationUnit {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "days" => Ok(Self::Days),
            "week" | "weeks" => Ok(Self::Weeks),
            "month" | "months" => Ok(Self::Months),
            other => Err(ParseFailure::duration(format!("unknown unit '{}'", other))),
        }
    }
}

/// A declared cycle length, e.g. "5 weeks"
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleLength {
    pub value: u32,
    pub unit: DurationUnit,
}

impl CycleLength {
    /// Build a cycle length whose total day count lies in
    /// [`MIN_CYCLE_DAYS`, `MAX_CYCLE_DAYS`]
    pub fn new(value: u32, unit: DurationUnit) -> Result<Self, ParseFailure> {
        let length = Self { value, unit };
        match length.total_days() {
            Some(days) if (MIN_CYCLE_DAYS..=MAX_CYCLE_DAYS).contains(&days) => Ok(length),
            _ => Err(ParseFailure::duration(format!(
                "cycle must last between {} and {} days",
                MIN_CYCLE_DAYS, MAX_CYCLE_DAYS
            ))),
        }
    }

    /// Total days, or None on overflow
    pub fn total_days(&self) -> Option<u32> {
        self.value.checked_mul(self.unit.days())
    }
}

// ============================================================================
// Schedule Types
// ============================================================================

/// A validated recurring-dose definition, as understood from user text
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduleIntent {
    pub peptide_name: String,
    pub dosage: Dosage,
    pub frequency: FrequencyDescriptor,
    pub duration_days: u32,
}

/// A persisted dosing cycle
///
/// Created active; flips to inactive with `completed_at` set exactly once
/// (see [`crate::cycle::apply_completion`]) and is never reactivated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub id: Uuid,
    pub owner_id: i64,
    pub peptide_name: String,
    pub dosage: Dosage,
    pub frequency: FrequencyDescriptor,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    /// Advisory only, never enforced
    pub rest_period_days: u32,
    pub active: bool,
    pub completed_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    /// Start a new cycle for `owner_id` on the day of `now`
    pub fn from_intent(intent: ScheduleIntent, owner_id: i64, now: DateTime<Utc>) -> Self {
        let rest_period_days =
            crate::cycle::suggested_rest_days(&intent.peptide_name, intent.duration_days);

        Self {
            id: Uuid::new_v4(),
            owner_id,
            peptide_name: intent.peptide_name,
            dosage: intent.dosage,
            frequency: intent.frequency,
            start_date: now.date_naive(),
            duration_days: intent.duration_days,
            rest_period_days,
            active: true,
            completed_at: None,
            created_at: now,
        }
    }
}

/// Checkpoint of the last notification pass that fully completed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerState {
    pub last_run_at: DateTime<Utc>,
}

impl WorkerState {
    /// Checkpoint for a process with no usable history: nothing to replay
    pub fn first_run(now: DateTime<Utc>) -> Self {
        Self { last_run_at: now }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_aliases() {
        assert_eq!("MCG".parse::<DoseUnit>().unwrap(), DoseUnit::Mcg);
        assert_eq!("μg".parse::<DoseUnit>().unwrap(), DoseUnit::Mcg);
        assert_eq!("µg".parse::<DoseUnit>().unwrap(), DoseUnit::Mcg);
        assert!("kg".parse::<DoseUnit>().is_err());
    }

    #[test]
    fn test_dosage_bounds() {
        assert!(Dosage::new(0.0, DoseUnit::Mg).is_err());
        assert!(Dosage::new(-1.0, DoseUnit::Mg).is_err());
        assert!(Dosage::new(10_001.0, DoseUnit::Iu).is_err());
        assert!(Dosage::new(10_000.0, DoseUnit::Iu).is_ok());
        assert_eq!(Dosage::new(1.5, DoseUnit::Mg).unwrap().to_string(), "1.5mg");
        assert_eq!(Dosage::new(500.0, DoseUnit::Mcg).unwrap().to_string(), "500mcg");
    }

    #[test]
    fn test_cycle_length_conversion() {
        assert_eq!(
            CycleLength::new(5, DurationUnit::Weeks).unwrap().total_days(),
            Some(35)
        );
        assert_eq!(
            CycleLength::new(2, DurationUnit::Months).unwrap().total_days(),
            Some(60)
        );
        assert!(CycleLength::new(0, DurationUnit::Days).is_err());
        assert!(CycleLength::new(366, DurationUnit::Days).is_err());
        assert!(CycleLength::new(13, DurationUnit::Months).is_err());
        assert!(CycleLength::new(u32::MAX, DurationUnit::Weeks).is_err());
    }

    #[test]
    fn test_schedule_starts_active_on_creation_day() {
        let intent = ScheduleIntent {
            peptide_name: "TB-500".into(),
            dosage: Dosage::new(2.0, DoseUnit::Mg).unwrap(),
            frequency: FrequencyDescriptor::Weekly,
            duration_days: 70,
        };
        let now = "2026-03-01T08:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let schedule = Schedule::from_intent(intent, 42, now);

        assert!(schedule.active);
        assert_eq!(schedule.completed_at, None);
        assert_eq!(
            schedule.start_date,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert_eq!(schedule.rest_period_days, 60);
    }
}
