//! Dose-day evaluation.
//!
//! Pure functions of (frequency, cycle start, candidate date). Every
//! pattern repeats within 7 days of the start date, which keeps forward
//! scans bounded.

use crate::frequency::FrequencyDescriptor;
use chrono::{Duration, NaiveDate};

/// Day offsets within each 7-day week (counted from the start date) on
/// which an `n`-times-per-week schedule doses: `floor(i * 7 / n)` for
/// `i in 0..n`
///
/// 2 → {0, 3}, 3 → {0, 2, 4}, 4 → {0, 1, 3, 5}, 5 → {0, 1, 2, 4, 5},
/// 6 → {0, 1, 2, 3, 4, 5}.
pub fn week_offsets(n: u8) -> Vec<i64> {
    let n = i64::from(n.clamp(1, 7));
    (0..n).map(|i| i * 7 / n).collect()
}

/// Whether `candidate` is a dose day for a cycle starting on `start_date`
///
/// Always false before the cycle starts.
pub fn is_dose_day(freq: FrequencyDescriptor, start_date: NaiveDate, candidate: NaiveDate) -> bool {
    let d = (candidate - start_date).num_days();
    if d < 0 {
        return false;
    }

    match freq {
        FrequencyDescriptor::Daily => true,
        FrequencyDescriptor::EveryOtherDay => d % 2 == 0,
        FrequencyDescriptor::Weekly => d % 7 == 0,
        FrequencyDescriptor::TimesPerWeek(n) => week_offsets(n).contains(&(d % 7)),
    }
}

/// First dose day on or after `from` (inclusive)
pub fn next_dose_on_or_after(
    freq: FrequencyDescriptor,
    start_date: NaiveDate,
    from: NaiveDate,
) -> NaiveDate {
    let from = from.max(start_date);
    (0..7)
        .map(|offset| from + Duration::days(offset))
        .find(|day| is_dose_day(freq, start_date, *day))
        // Unreachable: the start-of-week offset 0 fires for every variant
        .unwrap_or(from)
}

/// Every dose day in `[from, until)`, in order
pub fn dose_days_between(
    freq: FrequencyDescriptor,
    start_date: NaiveDate,
    from: NaiveDate,
    until: NaiveDate,
) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = from.max(start_date);
    while day < until {
        if is_dose_day(freq, start_date, day) {
            days.push(day);
        }
        day += Duration::days(1);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn offsets_in_first_week(freq: FrequencyDescriptor) -> Vec<i64> {
        let start = date(2026, 1, 5);
        (0..7)
            .filter(|d| is_dose_day(freq, start, start + Duration::days(*d)))
            .collect()
    }

    #[test]
    fn test_week_offsets() {
        assert_eq!(week_offsets(2), vec![0, 3]);
        assert_eq!(week_offsets(3), vec![0, 2, 4]);
        assert_eq!(week_offsets(4), vec![0, 1, 3, 5]);
        assert_eq!(week_offsets(5), vec![0, 1, 2, 4, 5]);
        assert_eq!(week_offsets(6), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_patterns_per_variant() {
        assert_eq!(
            offsets_in_first_week(FrequencyDescriptor::Daily),
            vec![0, 1, 2, 3, 4, 5, 6]
        );
        assert_eq!(
            offsets_in_first_week(FrequencyDescriptor::EveryOtherDay),
            vec![0, 2, 4, 6]
        );
        assert_eq!(offsets_in_first_week(FrequencyDescriptor::Weekly), vec![0]);
        assert_eq!(
            offsets_in_first_week(FrequencyDescriptor::TimesPerWeek(2)),
            vec![0, 3]
        );
    }

    #[test]
    fn test_times_per_week_recurs_every_seven_days() {
        let start = date(2026, 1, 5);
        let freq = FrequencyDescriptor::TimesPerWeek(2);

        for week in 0..10 {
            let window = dose_days_between(
                freq,
                start,
                start + Duration::days(week * 7),
                start + Duration::days(week * 7 + 7),
            );
            assert_eq!(window.len(), 2, "week {}", week);
        }
        assert!(is_dose_day(freq, start, start + Duration::days(10)));
        assert!(!is_dose_day(freq, start, start + Duration::days(11)));
    }

    #[test]
    fn test_every_other_day_is_start_anchored() {
        let start = date(2026, 2, 27);
        let freq = FrequencyDescriptor::EveryOtherDay;

        // Parity follows the start date across a month boundary
        assert!(is_dose_day(freq, start, date(2026, 3, 1)));
        assert!(!is_dose_day(freq, start, date(2026, 3, 2)));
    }

    #[test]
    fn test_no_doses_before_start() {
        let start = date(2026, 1, 5);
        assert!(!is_dose_day(
            FrequencyDescriptor::Daily,
            start,
            date(2026, 1, 4)
        ));
    }

    #[test]
    fn test_next_dose_on_or_after() {
        let start = date(2026, 1, 5);
        let weekly = FrequencyDescriptor::Weekly;

        assert_eq!(next_dose_on_or_after(weekly, start, start), start);
        assert_eq!(
            next_dose_on_or_after(weekly, start, date(2026, 1, 6)),
            date(2026, 1, 12)
        );
        assert_eq!(
            next_dose_on_or_after(weekly, start, date(2025, 12, 1)),
            start
        );
        assert_eq!(
            next_dose_on_or_after(FrequencyDescriptor::TimesPerWeek(2), start, date(2026, 1, 6)),
            date(2026, 1, 8)
        );
    }
}
