//! # Error Module
//!
//! Fault conditions of the tuning core. Silence and out-of-range frequencies
//! are not errors; they are modelled as regular results
//! (`PitchEstimate::Indeterminate`, `None` from the mapper).

use thiserror::Error;

/// Errors produced by the tuning core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TunerError {
    /// Malformed input handed to a core function (empty frame, zero sample
    /// rate, non-finite samples, unparsable note name, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value outside its accepted domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TunerError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        TunerError::InvalidInput(msg.into())
    }

    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        TunerError::InvalidConfig(msg.into())
    }
}

/// Result alias used throughout the core.
pub type TunerResult<T> = Result<T, TunerError>;
