//! Cycle lifecycle: elapsed/remaining days, completion and next dose.
//!
//! A cycle covers `[start_date, start_date + duration_days)`. The first day
//! outside that window is the day the cycle is observed complete.

use crate::dose;
use crate::types::Schedule;
use chrono::{Duration, NaiveDate};

/// Whole days from `start_date` to `today`, clamped to 0 for cycles that
/// have not started yet
pub fn days_elapsed(start_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - start_date).num_days().max(0)
}

/// Days left in the cycle, never negative
pub fn days_remaining(schedule: &Schedule, today: NaiveDate) -> i64 {
    (i64::from(schedule.duration_days) - days_elapsed(schedule.start_date, today)).max(0)
}

/// Whether the cycle has run its full length by `today`
///
/// Monotonic: once true for a date it stays true for every later date.
pub fn is_complete(schedule: &Schedule, today: NaiveDate) -> bool {
    days_elapsed(schedule.start_date, today) >= i64::from(schedule.duration_days)
}

/// First day outside the cycle
pub fn end_date(schedule: &Schedule) -> NaiveDate {
    schedule.start_date + Duration::days(i64::from(schedule.duration_days))
}

/// Next dose strictly after `after_date`, or None if the cycle ends (or
/// already ended) first
pub fn next_dose_date(schedule: &Schedule, after_date: NaiveDate) -> Option<NaiveDate> {
    next_dose_from(schedule, after_date + Duration::days(1))
}

/// Next dose on or after `from`, or None if the cycle ends (or already
/// ended) first
pub fn next_dose_from(schedule: &Schedule, from: NaiveDate) -> Option<NaiveDate> {
    if !schedule.active {
        return None;
    }

    let candidate = dose::next_dose_on_or_after(schedule.frequency, schedule.start_date, from);
    (candidate < end_date(schedule)).then_some(candidate)
}

/// Number of dose days in the whole cycle
pub fn total_doses(schedule: &Schedule) -> usize {
    dose::dose_days_between(
        schedule.frequency,
        schedule.start_date,
        schedule.start_date,
        end_date(schedule),
    )
    .len()
}

/// Mark the schedule completed if its cycle has elapsed
///
/// Returns a copy with `active = false, completed_at = today` the first
/// time the cycle is seen complete; otherwise returns it unchanged.
/// Idempotent: an already-completed schedule is never touched again.
pub fn apply_completion(schedule: &Schedule, today: NaiveDate) -> Schedule {
    let mut updated = schedule.clone();
    if schedule.active && is_complete(schedule, today) {
        updated.active = false;
        updated.completed_at = Some(today);
    }
    updated
}

/// Advisory rest period before starting a new cycle of the same peptide
///
/// A few peptides carry longer customary breaks; everything else rests
/// for as long as it ran.
pub fn suggested_rest_days(peptide_name: &str, duration_days: u32) -> u32 {
    let name = peptide_name.to_lowercase();
    if name.contains("foxo4") {
        120
    } else if name.contains("epithalon") {
        180
    } else if name.contains("tb-500") {
        60
    } else {
        duration_days
    }
}

/// Earliest advisable date to start a new cycle, once this one completed
pub fn next_restart_date(schedule: &Schedule) -> Option<NaiveDate> {
    schedule
        .completed_at
        .map(|completed| completed + Duration::days(i64::from(schedule.rest_period_days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyDescriptor;
    use crate::parser::parse_schedule_line;
    use chrono::{DateTime, Utc};

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap() + Duration::days(n)
    }

    fn schedule_from(text: &str) -> Schedule {
        let intent = parse_schedule_line(text).unwrap();
        let start: DateTime<Utc> = day(0).and_hms_opt(8, 0, 0).unwrap().and_utc();
        Schedule::from_intent(intent, 7, start)
    }

    #[test]
    fn test_completion_boundary() {
        let schedule = schedule_from("GHK-Cu 1.5mg daily for 5 weeks");
        assert_eq!(schedule.duration_days, 35);

        assert!(!is_complete(&schedule, day(34)));
        assert!(is_complete(&schedule, day(35)));
        assert_eq!(days_remaining(&schedule, day(34)), 1);
        assert_eq!(days_remaining(&schedule, day(35)), 0);
        assert_eq!(days_remaining(&schedule, day(400)), 0);
        assert_eq!(end_date(&schedule), day(35));
    }

    #[test]
    fn test_is_complete_is_monotonic() {
        let schedule = schedule_from("TB-500 2mg weekly for 10 days");
        let mut seen_complete = false;
        for n in -5..60 {
            let complete = is_complete(&schedule, day(n));
            assert!(!(seen_complete && !complete), "regressed at day {}", n);
            seen_complete |= complete;
        }
        assert!(seen_complete);
    }

    #[test]
    fn test_future_start_is_not_started() {
        let schedule = schedule_from("GHK-Cu 1mg daily for 1 day");
        assert_eq!(days_elapsed(schedule.start_date, day(-3)), 0);
        assert!(!is_complete(&schedule, day(-3)));
        assert_eq!(days_remaining(&schedule, day(-3)), 1);
    }

    #[test]
    fn test_every_other_day_cycle_dose_count() {
        let schedule = schedule_from("FOXO4-DRI 5mg EOD for 4 weeks");
        assert_eq!(schedule.frequency, FrequencyDescriptor::EveryOtherDay);

        let doses = dose::dose_days_between(
            schedule.frequency,
            schedule.start_date,
            schedule.start_date,
            end_date(&schedule),
        );
        assert_eq!(doses.len(), 14);
        assert_eq!(doses.first(), Some(&day(0)));
        assert_eq!(doses.last(), Some(&day(26)));
        assert_eq!(total_doses(&schedule), 14);

        assert_eq!(next_dose_date(&schedule, day(26)), None);
        assert_eq!(next_dose_date(&schedule, day(25)), Some(day(26)));
    }

    #[test]
    fn test_twice_weekly_pattern() {
        let schedule = schedule_from("Thymosin 1.2mg twice weekly for 10 weeks");
        assert_eq!(schedule.duration_days, 70);
        assert_eq!(total_doses(&schedule), 20);
        assert_eq!(next_dose_date(&schedule, day(0)), Some(day(3)));
        assert_eq!(next_dose_date(&schedule, day(3)), Some(day(7)));
        assert_eq!(next_dose_from(&schedule, day(3)), Some(day(3)));
    }

    #[test]
    fn test_apply_completion_is_idempotent() {
        let schedule = schedule_from("GHK-Cu 1.5mg daily for 5 weeks");

        let untouched = apply_completion(&schedule, day(34));
        assert_eq!(untouched, schedule);

        let once = apply_completion(&schedule, day(35));
        assert!(!once.active);
        assert_eq!(once.completed_at, Some(day(35)));

        let twice = apply_completion(&once, day(35));
        assert_eq!(twice, once);

        // A later observation never moves the completion date
        let later = apply_completion(&once, day(50));
        assert_eq!(later.completed_at, Some(day(35)));
    }

    #[test]
    fn test_completed_schedule_has_no_next_dose() {
        let schedule = schedule_from("GHK-Cu 1mg daily for 5 days");
        let completed = apply_completion(&schedule, day(5));
        assert_eq!(next_dose_from(&completed, day(0)), None);
    }

    #[test]
    fn test_rest_period_advice() {
        assert_eq!(suggested_rest_days("FOXO4-DRI", 28), 120);
        assert_eq!(suggested_rest_days("Epithalon", 21), 180);
        assert_eq!(suggested_rest_days("TB-500", 70), 60);
        assert_eq!(suggested_rest_days("GHK-Cu", 35), 35);

        let schedule = schedule_from("GHK-Cu 1mg daily for 5 days");
        assert_eq!(next_restart_date(&schedule), None);
        let completed = apply_completion(&schedule, day(5));
        assert_eq!(next_restart_date(&completed), Some(day(10)));
    }
}
