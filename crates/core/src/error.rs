//! Error types shared by the signal and backtest crates.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the pipeline core.
///
/// Missing auxiliary data is never an error here; it is handled fail-open by
/// the stage that consumes it and reported through diagnostics instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// A configuration value is outside its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested date range selects nothing.
    #[error("empty date range: {start} to {end}")]
    EmptyDateRange {
        /// Inclusive range start.
        start: NaiveDate,
        /// Inclusive range end.
        end: NaiveDate,
    },

    /// Not enough data to produce a single result.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Two series that must be aligned have different lengths.
    #[error("series length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first series.
        left: usize,
        /// Length of the second series.
        right: usize,
    },

    /// A statistic was requested over an empty series.
    #[error("empty series: {0}")]
    EmptySeries(&'static str),
}

impl PipelineError {
    /// Shorthand for [`PipelineError::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
