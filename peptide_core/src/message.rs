//! User-facing message text composed from schedule fields.

use crate::cycle;
use crate::error::ParseFailure;
use crate::types::Schedule;
use chrono::NaiveDate;

/// Morning reminder for a dose day
pub fn dose_reminder(schedule: &Schedule, today: NaiveDate) -> String {
    format!(
        "Good morning!\n\n\
         Today you need to take: {}\n\
         Dosage: {}\n\
         Days remaining in cycle: {}\n\n\
         Have a great day!",
        schedule.peptide_name,
        schedule.dosage,
        cycle::days_remaining(schedule, today)
    )
}

/// One-off notice when a cycle completes
pub fn completion_notice(schedule: &Schedule) -> String {
    let mut text = format!(
        "Your {} cycle ({} {}, {} days) is complete.",
        schedule.peptide_name, schedule.dosage, schedule.frequency, schedule.duration_days
    );

    if let Some(restart) = cycle::next_restart_date(schedule) {
        text.push_str(&format!(
            "\nSuggested rest: {} days, until {}. Send a new schedule to start another cycle.",
            schedule.rest_period_days, restart
        ));
    }

    text
}

/// Confirmation after a schedule is accepted
pub fn schedule_created(schedule: &Schedule) -> String {
    format!(
        "Schedule created!\n\n\
         Peptide: {}\n\
         Dosage: {}\n\
         Frequency: {}\n\
         Cycle: {} days (starting {})\n\
         Rest: {} days\n\n\
         You'll get a reminder on each dose day.",
        schedule.peptide_name,
        schedule.dosage,
        schedule.frequency,
        schedule.duration_days,
        schedule.start_date,
        schedule.rest_period_days
    )
}

/// Re-prompt naming the field that needs fixing
pub fn parse_help(failure: &ParseFailure) -> String {
    format!(
        "I couldn't understand that schedule ({} problem: {}).\n\n\
         Please try something like:\n\
         GHK-Cu 1mg daily for 6 weeks\n\
         BPC-157 500mcg twice weekly for 8 weeks",
        failure.field(),
        failure
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schedule_line;
    use chrono::{Duration, Utc};

    fn schedule() -> Schedule {
        let intent = parse_schedule_line("GHK-Cu 1.5mg daily for 5 weeks").unwrap();
        let now = "2026-01-05T08:00:00Z".parse::<chrono::DateTime<Utc>>().unwrap();
        Schedule::from_intent(intent, 1, now)
    }

    #[test]
    fn test_dose_reminder_fields() {
        let s = schedule();
        let text = dose_reminder(&s, s.start_date + Duration::days(5));

        assert!(text.contains("GHK-Cu"));
        assert!(text.contains("1.5mg"));
        assert!(text.contains("Days remaining in cycle: 30"));
    }

    #[test]
    fn test_completion_notice_mentions_rest() {
        let s = cycle::apply_completion(&schedule(), schedule().start_date + Duration::days(35));
        let text = completion_notice(&s);

        assert!(text.contains("GHK-Cu cycle"));
        assert!(text.contains("Suggested rest: 35 days"));
    }

    #[test]
    fn test_parse_help_names_field() {
        let failure = parse_schedule_line("GHK-Cu 1mg daily for 400 days").unwrap_err();
        assert!(parse_help(&failure).contains("duration problem"));
    }
}
