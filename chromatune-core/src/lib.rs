// chromatune-core/src/lib.rs

//! The core logic for the chromatic tuner.
//! This crate turns windows of audio samples into a fundamental frequency
//! and maps that frequency to a note name, octave and cents deviation.
//! It is completely headless: no audio capture and no display code.

pub mod config;
pub mod error;
pub mod framing;
pub mod instrument;
pub mod pitch;
pub mod session;
pub mod tuning;
pub mod yin;

use serde::Serialize;

pub use config::TunerConfig;
pub use error::{TunerError, TunerResult};
pub use instrument::{InstrumentProfile, StringMatch, instrument_ids, instrument_profile};
pub use pitch::{
    Algorithm, AutocorrelationDetector, DetectorSettings, PitchDetector, PitchReading,
    SampleWindow,
};
pub use session::{TunerSession, TuningMode};
pub use tuning::{
    ClosestNote, NoteName, NoteResult, closest_note, frequency_to_note, note_to_frequency,
};
pub use yin::YinDetector;

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// The detected fundamental frequency in Hz.
    pub detected_frequency: Option<f32>,
    /// The clarity of the detected frequency (0.0 to 1.0).
    pub confidence: Option<f32>,
    /// The nearest note and its exact frequency.
    pub note: Option<ClosestNote>,
    /// The nearest open string, in instrument mode.
    pub string: Option<StringMatch>,
    /// The unrounded deviation from the current target in cents.
    pub cents_deviation: Option<f32>,
    /// Mean of the recent `cents_deviation` values.
    pub smoothed_cents: Option<f32>,
}
