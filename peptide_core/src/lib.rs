#![forbid(unsafe_code)]

//! Core scheduling logic for peptide dosing cycles.
//!
//! This crate provides:
//! - A parser for free-text schedules ("GHK-Cu 1.5mg daily for 5 weeks")
//! - Dose-day evaluation and cycle lifecycle (completion, next dose)
//! - Catch-up of missed daily notification passes
//! - Persistence (schedule store, reminder log, CSV rollup)

pub mod types;
pub mod error;
pub mod frequency;
pub mod parser;
pub mod dose;
pub mod cycle;
pub mod catchup;
pub mod message;
pub mod clock;
pub mod messenger;
pub mod store;
pub mod wal;
pub mod csv_rollup;
pub mod dispatch;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, ParseFailure, Result};
pub use types::*;
pub use frequency::{parse_frequency, FrequencyDescriptor};
pub use parser::parse_schedule_line;
pub use dose::is_dose_day;
pub use cycle::{
    apply_completion, days_elapsed, days_remaining, is_complete, next_dose_date, next_dose_from,
};
pub use catchup::{passes_to_run, resolve_checkpoint};
pub use clock::{Clock, FixedClock, SystemClock};
pub use messenger::{ConsoleMessenger, Messenger};
pub use store::{JsonFileStore, MemoryStore, ScheduleStore};
pub use wal::{JsonlSink, ReminderSink};
pub use dispatch::{plan_day, Dispatcher, PassReport};
pub use config::Config;
