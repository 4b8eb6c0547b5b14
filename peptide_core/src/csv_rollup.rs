//! CSV rollup for archiving the reminder log.
//!
//! The CSV is fsynced before the log is renamed, so a crash between the two
//! leaves a log that is rolled up again rather than lost.

use crate::wal::{ReminderKind, ReminderRecord};
use crate::Result;
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    schedule_id: String,
    owner_id: i64,
    kind: &'static str,
    reminder_date: String,
    sent: bool,
    recorded_at: String,
}

impl From<&ReminderRecord> for CsvRow {
    fn from(record: &ReminderRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            schedule_id: record.schedule_id.to_string(),
            owner_id: record.owner_id,
            kind: match record.kind {
                ReminderKind::Dose => "dose",
                ReminderKind::Completion => "completion",
            },
            reminder_date: record.reminder_date.to_string(),
            sent: record.sent,
            recorded_at: record.recorded_at.to_rfc3339(),
        }
    }
}

/// Roll up the reminder log into CSV and archive the log
///
/// 1. Read all records from the log
/// 2. Append them to the CSV file (headers only when the file is new)
/// 3. Sync the CSV to disk
/// 4. Rename the log to `.wal.processed`
///
/// Returns the number of records processed.
pub fn log_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = crate::wal::read_records(log_path)?;

    if records.is_empty() {
        tracing::info!("No reminders in log to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in &records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} reminders to CSV", records.len());

    let processed_path = log_path.with_extension("wal.processed");
    std::fs::rename(log_path, &processed_path)?;

    tracing::info!("Archived reminder log to {:?}", processed_path);

    Ok(records.len())
}

/// Remove archived `.processed` logs in `dir`
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().map_or(false, |ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed logs", count);
    }

    Ok(count)
}
