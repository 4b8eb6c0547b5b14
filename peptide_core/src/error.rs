//! Error types for the peptide_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for peptide_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// User-supplied schedule text could not be understood
    #[error("Parse error: {0}")]
    Parse(#[from] ParseFailure),

    /// Schedule store error
    #[error("Store error: {0}")]
    Store(String),

    /// One or more notifications could not be delivered
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Why a line of schedule text was rejected.
///
/// Every variant is a user-input problem: callers re-prompt with
/// [`ParseFailure::field`] instead of treating it as fatal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("unknown frequency '{raw}' (try daily, weekly, twice weekly, 3x weekly, EOD)")]
    UnknownFrequency { raw: String },

    #[error("invalid dosage: {reason}")]
    InvalidDosage { reason: String },

    #[error("invalid duration: {reason}")]
    InvalidDuration { reason: String },

    #[error("invalid peptide name: {reason}")]
    InvalidName { reason: String },

    #[error("input is {len} characters long, the limit is {max}")]
    InputTooLong { len: usize, max: usize },
}

impl ParseFailure {
    pub(crate) fn dosage(reason: impl Into<String>) -> Self {
        Self::InvalidDosage {
            reason: reason.into(),
        }
    }

    pub(crate) fn duration(reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn name(reason: impl Into<String>) -> Self {
        Self::InvalidName {
            reason: reason.into(),
        }
    }

    /// The input field the user needs to fix
    pub fn field(&self) -> &'static str {
        match self {
            Self::UnknownFrequency { .. } => "frequency",
            Self::InvalidDosage { .. } => "dosage",
            Self::InvalidDuration { .. } => "duration",
            Self::InvalidName { .. } => "name",
            Self::InputTooLong { .. } => "input",
        }
    }
}
