//! Error types for the resonator simulation.
//!
//! This module provides a unified error type [`ResonatorError`] that covers
//! parameter validation, internal invariant failures inside the pipe model,
//! and the audio output stage of the CLI.

use thiserror::Error;

/// Result type alias using [`ResonatorError`].
pub type Result<T> = std::result::Result<T, ResonatorError>;

/// Unified error type for all resonator operations.
#[derive(Error, Debug)]
pub enum ResonatorError {
    // ============ Parameter Errors ============
    /// Invalid geometry or source parameter
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// Invalid simulation-wide parameter (sample rate, step size)
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ Simulation Errors ============
    /// A wave segment or output frame broke a structural invariant.
    ///
    /// Raised by the pipe model; the simulation step recovers by dropping
    /// the offending segment or frame.
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String },

    // ============ I/O Errors ============
    /// Error writing audio output
    #[error("Audio output error: {message}")]
    AudioOutputError { message: String },

    /// Error writing a WAV file
    #[cfg(feature = "cli")]
    #[error("Failed to write WAV file '{path}': {source}")]
    WavWriteError {
        path: String,
        #[source]
        source: hound::Error,
    },
}

impl ResonatorError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Whether this error is a recoverable invariant failure of the model.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

/// Reject non-finite or non-positive values for a named parameter.
pub(crate) fn ensure_positive(param: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ResonatorError::invalid_parameter(
            param,
            format!("must be a finite positive number (got {value})"),
        ));
    }
    Ok(())
}
