//! Unified error hierarchy for barcoach
//!
//! Structured error information mirrors the taxonomy the core contract
//! requires: invalid input, missing state, inconsistent history, and
//! degraded configuration. All infallible pure functions (normalization,
//! state update) never use this type — they saturate/clamp instead.

use thiserror::Error;

/// Top-level error type for all barcoach operations.
#[derive(Debug, Error)]
pub enum BarcoachError {
    /// Malformed input: bad set notation, nonexistent date, days-per-week
    /// outside 1..5, unknown exercise id, out-of-range weights/reps.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required precondition for the operation is absent, e.g. `plan`
    /// without any baseline, or a profile missing a required field.
    #[error("missing state: {0}")]
    MissingState(String),

    /// History or profile data is internally inconsistent, e.g. a record
    /// for an unknown exercise, or a planned_sets record missing fields.
    #[error("inconsistent data: {0}")]
    Inconsistent(String),

    /// A config overlay failed to parse or a required key was absent from
    /// both bundled and override config. The loader already fell back to
    /// bundled defaults; this variant only carries the warning forward.
    #[error("config degraded: {0}")]
    ConfigDegraded(String),

    /// IO errors from history/profile file access.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors from storage.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BarcoachError>;

impl BarcoachError {
    /// Severity used to pick a tracing level when the CLI logs a failure.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BarcoachError::InvalidInput(_) => ErrorSeverity::Warning,
            BarcoachError::MissingState(_) => ErrorSeverity::Warning,
            BarcoachError::ConfigDegraded(_) => ErrorSeverity::Warning,
            BarcoachError::Inconsistent(_) => ErrorSeverity::Error,
            BarcoachError::Io(_) => ErrorSeverity::Error,
            BarcoachError::Serde(_) => ErrorSeverity::Error,
        }
    }

    /// User-facing message: for most variants this is just the Display
    /// impl, but a couple of cases get friendlier phrasing.
    pub fn user_message(&self) -> String {
        match self {
            BarcoachError::MissingState(what) => {
                format!("Can't proceed yet: {}. Run `init` or log a session first.", what)
            }
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Error,
    Warning,
}

impl ErrorSeverity {
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
