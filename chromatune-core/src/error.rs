//! Error types for the tuner core.

use thiserror::Error;

/// Result type for tuner operations.
pub type TunerResult<T> = Result<T, TunerError>;

/// Errors raised by contract violations at the call site.
///
/// "No pitch" is never an error; estimators and the frequency mapper
/// report it as `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TunerError {
    /// Note name outside the 12-entry chromatic table.
    #[error("invalid note name: '{0}' (expected one of C, C#, D, D#, E, F, F#, G, G#, A, A#, B)")]
    InvalidNoteName(String),

    /// Reference frequency that is not a positive finite number of Hz.
    #[error("invalid reference frequency: {0} Hz")]
    InvalidReferenceFrequency(f32),

    /// Configuration value outside its valid range.
    #[error("invalid configuration '{field}': {message}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Instrument identifier with no entry in the instrument table.
    #[error("unknown instrument: '{0}'")]
    UnknownInstrument(String),

    /// Instrument with an open string the detector's frequency range excludes.
    #[error(
        "instrument '{instrument}' has a string at {frequency:.2} Hz, outside the detector range {min_frequency}-{max_frequency} Hz"
    )]
    InstrumentOutOfRange {
        instrument: String,
        frequency: f32,
        min_frequency: f32,
        max_frequency: f32,
    },
}

impl TunerError {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        TunerError::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}
