//! Free-text schedule parser.
//!
//! Turns a line such as `GHK-Cu 1.5mg daily for 5 weeks` into a
//! [`ScheduleIntent`]. Parsing runs as an ordered series of extractor
//! stages over the whitespace-normalized line:
//!
//! 1. dosage   - `<decimal><mg|mcg|μg|iu|ml|cc>`
//! 2. duration - trailing `for <integer> <days|weeks|months>`
//! 3. frequency - the text between the two, handed to the frequency grammar
//! 4. name     - everything before the dosage, allow-listed
//!
//! The first stage to fail decides the reported [`ParseFailure`]. The name
//! stage runs last but is the only way text reaches a stored schedule, so
//! nothing un-validated is ever persisted or echoed into messages.

use crate::error::ParseFailure;
use crate::frequency::{parse_frequency, FrequencyDescriptor};
use crate::types::{CycleLength, Dosage, DoseUnit, DurationUnit, ScheduleIntent};
use once_cell::sync::Lazy;
use regex::Regex;

/// Inputs longer than this are refused before any matching
pub const MAX_INPUT_CHARS: usize = 500;

/// Longest accepted peptide name
pub const MAX_NAME_CHARS: usize = 64;

static DOSAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)([-+]?(?:\d+(?:\.\d+)?|\.\d+))\s*(mcg|mg|μg|µg|ug|iu|ml|cc)\b")
        .expect("dosage pattern is valid")
});

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)for\s+([-+]?\d+)\s*(days?|weeks?|months?)\s*\.?\s*$")
        .expect("duration pattern is valid")
});

/// Dosage stage output; offsets index the normalized line
#[derive(Debug)]
struct DosageToken {
    dosage: Dosage,
    start: usize,
    end: usize,
}

/// Duration stage output; `start` is where the `for` clause begins
#[derive(Debug)]
struct DurationToken {
    days: u32,
    start: usize,
}

/// Parse one line of user text into a schedule intent
///
/// Pure and total: never panics, never touches storage.
pub fn parse_schedule_line(text: &str) -> Result<ScheduleIntent, ParseFailure> {
    let len = text.chars().count();
    if len > MAX_INPUT_CHARS {
        return Err(ParseFailure::InputTooLong {
            len,
            max: MAX_INPUT_CHARS,
        });
    }

    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let dosage = extract_dosage(&line)?;
    let duration = extract_duration(&line, dosage.end)?;
    let frequency = extract_frequency(&line[dosage.end..duration.start])?;
    let peptide_name = extract_name(&line[..dosage.start])?;

    let intent = ScheduleIntent {
        peptide_name,
        dosage: dosage.dosage,
        frequency,
        duration_days: duration.days,
    };

    tracing::debug!(
        "Parsed schedule: {} {} {} for {} days",
        intent.peptide_name,
        intent.dosage,
        intent.frequency,
        intent.duration_days
    );

    Ok(intent)
}

fn extract_dosage(line: &str) -> Result<DosageToken, ParseFailure> {
    let captures = DOSAGE_PATTERN
        .captures(line)
        .ok_or_else(|| ParseFailure::dosage("expected an amount such as 1.5mg or 500mcg"))?;

    // Groups 1 and 2 always participate when the pattern matches
    let (value_match, unit_match) = match (captures.get(1), captures.get(2)) {
        (Some(value), Some(unit)) => (value, unit),
        _ => return Err(ParseFailure::dosage("expected an amount such as 1.5mg")),
    };

    let value = value_match
        .as_str()
        .parse::<f64>()
        .map_err(|_| ParseFailure::dosage(format!("'{}' is not a number", value_match.as_str())))?;
    let unit = unit_match.as_str().parse::<DoseUnit>()?;

    Ok(DosageToken {
        dosage: Dosage::new(value, unit)?,
        start: value_match.start(),
        end: unit_match.end(),
    })
}

fn extract_duration(line: &str, search_from: usize) -> Result<DurationToken, ParseFailure> {
    let rest = &line[search_from..];
    let captures = DURATION_PATTERN.captures(rest).ok_or_else(|| {
        ParseFailure::duration("expected 'for <number> days|weeks|months' at the end")
    })?;

    let groups = (captures.get(0), captures.get(1), captures.get(2));
    let (clause, count_match, unit_match) = match groups {
        (Some(clause), Some(count), Some(unit)) => (clause, count, unit),
        _ => {
            return Err(ParseFailure::duration(
                "expected 'for <number> days|weeks|months'",
            ))
        }
    };

    let count = count_match
        .as_str()
        .parse::<i64>()
        .map_err(|_| ParseFailure::duration(format!("'{}' is too large", count_match.as_str())))?;
    if count <= 0 {
        return Err(ParseFailure::duration(format!(
            "{} must be greater than zero",
            count
        )));
    }
    let count = u32::try_from(count)
        .map_err(|_| ParseFailure::duration(format!("{} is too large", count)))?;

    let unit = unit_match.as_str().parse::<DurationUnit>()?;
    let length = CycleLength::new(count, unit)?;
    let days = length
        .total_days()
        .ok_or_else(|| ParseFailure::duration(format!("{} is too large", count)))?;

    Ok(DurationToken {
        days,
        start: search_from + clause.start(),
    })
}

fn extract_frequency(phrase: &str) -> Result<FrequencyDescriptor, ParseFailure> {
    parse_frequency(phrase)
}

fn extract_name(prefix: &str) -> Result<String, ParseFailure> {
    let name = prefix.trim();

    if name.is_empty() {
        return Err(ParseFailure::name("a peptide name must come before the dosage"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ParseFailure::name(format!(
            "names are limited to {} characters",
            MAX_NAME_CHARS
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ParseFailure::name(
            "only letters, digits and hyphens are allowed",
        ));
    }

    Ok(name.to_string())
}
