//! Frequency grammar.
//!
//! A closed set of phrases, matched case-insensitively after whitespace
//! normalization:
//!
//! | phrase                      | descriptor          |
//! |-----------------------------|---------------------|
//! | `daily`                     | `Daily`             |
//! | `weekly`, `once weekly`     | `Weekly`            |
//! | `twice weekly`              | `TimesPerWeek(2)`   |
//! | `<N>x weekly`, N in 2..=7   | `TimesPerWeek(N)`   |
//! | `eod`, `every other day`    | `EveryOtherDay`     |
//!
//! `1x weekly` is rejected so "weekly" has a single spelling, and
//! `7x weekly` normalizes to `Daily`.

use crate::error::ParseFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a dose recurs within a cycle
///
/// Persisted as its canonical phrase so stored data passes back through
/// the grammar on load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FrequencyDescriptor {
    Daily,
    EveryOtherDay,
    Weekly,
    /// Always in 2..=6 once constructed through [`FrequencyDescriptor::times_per_week`]
    TimesPerWeek(u8),
}

impl FrequencyDescriptor {
    /// Normalizing constructor: 1 becomes `Weekly`, 7 becomes `Daily`,
    /// anything outside 1..=7 is None
    pub fn times_per_week(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Weekly),
            2..=6 => Some(Self::TimesPerWeek(n)),
            7 => Some(Self::Daily),
            _ => None,
        }
    }
}

/// Parse a frequency phrase into its descriptor
pub fn parse_frequency(text: &str) -> Result<FrequencyDescriptor, ParseFailure> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let normalized = normalized.to_lowercase();

    let unknown = || ParseFailure::UnknownFrequency {
        raw: text.trim().to_string(),
    };

    match normalized.as_str() {
        "daily" => Ok(FrequencyDescriptor::Daily),
        "weekly" | "once weekly" => Ok(FrequencyDescriptor::Weekly),
        "twice weekly" => Ok(FrequencyDescriptor::TimesPerWeek(2)),
        "eod" | "every other day" => Ok(FrequencyDescriptor::EveryOtherDay),
        other => {
            let count = other
                .strip_suffix("x weekly")
                .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|n| n.parse::<u8>().ok())
                .ok_or_else(unknown)?;

            match count {
                2..=7 => FrequencyDescriptor::times_per_week(count).ok_or_else(unknown),
                _ => Err(unknown()),
            }
        }
    }
}

impl FromStr for FrequencyDescriptor {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_frequency(s)
    }
}

impl fmt::Display for FrequencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::EveryOtherDay => write!(f, "every other day"),
            Self::Weekly => write!(f, "weekly"),
            Self::TimesPerWeek(2) => write!(f, "twice weekly"),
            Self::TimesPerWeek(n) => write!(f, "{}x weekly", n),
        }
    }
}

impl From<FrequencyDescriptor> for String {
    fn from(value: FrequencyDescriptor) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for FrequencyDescriptor {
    type Error = ParseFailure;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_frequency(&value)
    }
}
