//! Outbound message delivery.

use crate::{Error, Result};
use std::collections::HashSet;
use std::io::Write;

/// Delivers text to a user; an `Err` means the message did not go out
pub trait Messenger {
    fn send(&mut self, owner_id: i64, text: &str) -> Result<()>;
}

/// Writes each message to stdout, for running without a chat transport
#[derive(Debug, Default)]
pub struct ConsoleMessenger;

impl Messenger for ConsoleMessenger {
    fn send(&mut self, owner_id: i64, text: &str) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "── message to user {} ──", owner_id)?;
        writeln!(out, "{}", text)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

/// Keeps every delivered message in memory; sends to users listed in
/// `unreachable` fail
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    pub sent: Vec<(i64, String)>,
    pub unreachable: HashSet<i64>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered to one user, oldest first
    pub fn sent_to(&self, owner_id: i64) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(id, _)| *id == owner_id)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl Messenger for RecordingMessenger {
    fn send(&mut self, owner_id: i64, text: &str) -> Result<()> {
        if self.unreachable.contains(&owner_id) {
            return Err(Error::Delivery(format!("user {} is unreachable", owner_id)));
        }
        self.sent.push((owner_id, text.to_string()));
        Ok(())
    }
}
