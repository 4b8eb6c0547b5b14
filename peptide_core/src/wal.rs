//! Reminder log.
//!
//! Every delivery attempt is appended to a JSONL (JSON Lines) file with
//! file locking to ensure safe concurrent access.

use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What a notification was about
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Dose,
    Completion,
}

/// One delivery attempt
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReminderRecord {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub owner_id: i64,
    pub kind: ReminderKind,
    pub reminder_date: NaiveDate,
    pub sent: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Identifies a notification independent of how many times it was tried
pub type DeliveryKey = (Uuid, NaiveDate, ReminderKind);

impl ReminderRecord {
    pub fn key(&self) -> DeliveryKey {
        (self.schedule_id, self.reminder_date, self.kind)
    }
}

/// Reminder sink trait for recording delivery attempts
pub trait ReminderSink {
    fn append(&mut self, record: &ReminderRecord) -> Result<()>;
}

/// JSONL-based reminder sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ReminderSink for JsonlSink {
    fn append(&mut self, record: &ReminderRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Logged {:?} reminder for schedule {} on {} (sent: {})",
            record.kind,
            record.schedule_id,
            record.reminder_date,
            record.sent
        );
        Ok(())
    }
}

/// In-memory sink, for tests and callers that don't keep a log
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ReminderRecord>,
}

impl ReminderSink for MemorySink {
    fn append(&mut self, record: &ReminderRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Read all records from a reminder log
///
/// Corrupt lines (e.g. a partial write before a crash) are skipped.
pub fn read_records(path: &Path) -> Result<Vec<ReminderRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ReminderRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse reminder at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} reminders from log", records.len());
    Ok(records)
}

/// Notifications that were actually delivered
pub fn delivered_keys(records: &[ReminderRecord]) -> HashSet<DeliveryKey> {
    records.iter().filter(|r| r.sent).map(|r| r.key()).collect()
}

/// Notifications that failed and were never delivered since, oldest first
///
/// A key drops out once it has failed `max_attempts` times.
pub fn owed_keys(records: &[ReminderRecord], max_attempts: usize) -> Vec<DeliveryKey> {
    let delivered = delivered_keys(records);
    let mut failures: HashMap<DeliveryKey, usize> = HashMap::new();
    let mut order = Vec::new();

    for record in records.iter().filter(|r| !r.sent) {
        let key = record.key();
        if delivered.contains(&key) {
            continue;
        }
        let count = failures.entry(key).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter(|key| {
            let owed = failures[key] < max_attempts;
            if !owed {
                tracing::debug!("Giving up on {:?} after {} failed attempts", key, failures[key]);
            }
            owed
        })
        .collect()
}
