//! Catch-up of missed notification passes.
//!
//! The checkpoint ([`WorkerState`]) is passed in and handed back by value;
//! persisting it is the caller's job. It may only move forward once the
//! pass it names has had its notifications sent.

use crate::types::WorkerState;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Checkpoint to resume from; a missing or unreadable one means first run,
/// which replays nothing
pub fn resolve_checkpoint(loaded: Option<WorkerState>, now: DateTime<Utc>) -> WorkerState {
    match loaded {
        Some(state) => state,
        None => {
            tracing::info!("No usable worker checkpoint, treating {} as first run", now);
            WorkerState::first_run(now)
        }
    }
}

/// Every evaluation point owed since `last_run_at`, oldest first
///
/// Yields `last_run_at + k * run_interval` for each `k >= 1` strictly
/// before `now`, followed by `now` itself, so a wake-up always evaluates
/// the current moment even when nothing was missed.
pub fn passes_to_run(
    last_run_at: DateTime<Utc>,
    now: DateTime<Utc>,
    run_interval: Duration,
) -> Vec<DateTime<Utc>> {
    if run_interval <= Duration::zero() {
        tracing::warn!("Non-positive run interval {:?}, running once", run_interval);
        return vec![now];
    }

    let mut passes = Vec::new();
    let mut boundary = last_run_at + run_interval;
    while boundary < now {
        passes.push(boundary);
        boundary += run_interval;
    }

    if !passes.is_empty() {
        tracing::info!(
            "Catching up {} missed passes since {}",
            passes.len(),
            last_run_at
        );
    }
    passes.push(now);

    passes
}

/// Calendar day each pass evaluates as "today"
pub fn pass_day(pass: DateTime<Utc>) -> NaiveDate {
    pass.date_naive()
}
