//! # Musical Tuning Module
//!
//! This module maps frequencies to equal-tempered note names and back.
//! Every function here is pure: the reference frequency for A4 is passed in
//! on each call and nothing is cached, so a caller can change its tuning
//! standard between two frames without any reset.
//!
//! ## Features
//! - Frequency to nearest note, octave and cents deviation
//! - Note name and octave to exact frequency
//! - Closest-note lookup reporting the "should-be" frequency
//! - Cent deviation between two arbitrary frequencies
//!
//! ## Rounding
//! The semitone count is rounded half away from zero (`f32::round`). A
//! frequency exactly halfway between two semitones therefore belongs to the
//! note further from the reference and reports -50 cents above it, or +50
//! cents below it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TunerError, TunerResult};

/// Semitones from C0 to A4 in scientific pitch notation.
const A4_OFFSET: i32 = 57;

/// Default tuning standard: A4 = 440 Hz.
pub const DEFAULT_REFERENCE_FREQUENCY: f32 = 440.0;

/// One of the twelve chromatic pitch classes, named with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteName {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D#")]
    DSharp,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A#")]
    ASharp,
    #[serde(rename = "B")]
    B,
}

impl NoteName {
    /// The chromatic table, starting at C.
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Position within the octave, 0 (C) to 11 (B).
    pub fn chromatic_index(self) -> i32 {
        self as i32
    }

    /// Looks a pitch class up by chromatic index, wrapping modulo 12.
    pub fn from_chromatic_index(index: i32) -> NoteName {
        NoteName::ALL[index.rem_euclid(12) as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }

    /// Exact equal-tempered frequency of this note in `octave`.
    ///
    /// # Arguments
    /// * `octave` - Scientific pitch octave (A4 is the reference note)
    /// * `reference_freq` - Frequency of A4 in Hz
    pub fn frequency(self, octave: i32, reference_freq: f32) -> f32 {
        let n = self.chromatic_index() + 12 * octave - A4_OFFSET;
        reference_freq * 2.0_f32.powf(n as f32 / 12.0)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteName {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| TunerError::InvalidNoteName(s.to_string()))
    }
}

/// Nearest note to a frequency, with the deviation from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteResult {
    pub name: NoteName,
    pub octave: i32,
    /// Rounded deviation in cents, always within [-50, 50].
    pub cents: i32,
}

impl fmt::Display for NoteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {:+} cents", self.name, self.octave, self.cents)
    }
}

/// [`NoteResult`] plus the exact frequency the cents figure is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestNote {
    pub name: NoteName,
    pub octave: i32,
    /// Equal-tempered frequency of `name` in `octave`, in Hz.
    pub exact_frequency: f32,
    pub cents: i32,
}

/// Signed, unrounded number of semitones from the reference to `freq`.
///
/// # Returns
/// * `Some(steps)` - Semitones above (positive) or below (negative) A4
/// * `None` - Either frequency is not a positive finite number
fn semitones_from_reference(freq: f32, reference_freq: f32) -> Option<f32> {
    if !(freq > 0.0 && freq.is_finite() && reference_freq > 0.0 && reference_freq.is_finite()) {
        return None;
    }
    Some(12.0 * (freq / reference_freq).log2())
}

/// Splits a semitone count into the nearest whole semitone and the rounded
/// cents left over. Ties go away from zero.
fn split_semitones(steps: f32) -> (i32, i32) {
    let n = steps.round();
    let cents = ((steps - n) * 100.0).round() as i32;
    (n as i32, cents)
}

/// Nearest semitone to `freq`, counted from A4 (A4 is 0, A#4 is 1, G#4 is -1).
///
/// Non-decreasing in `freq` for a fixed reference.
pub fn semitone_index(freq: f32, reference_freq: f32) -> Option<i32> {
    semitones_from_reference(freq, reference_freq).map(|steps| split_semitones(steps).0)
}

/// Maps a frequency to the nearest note, its octave and the cents deviation.
///
/// # Arguments
/// * `freq` - Detected frequency in Hz
/// * `reference_freq` - Frequency of A4 in Hz
///
/// # Returns
/// * `Some(NoteResult)` - Nearest note with cents in [-50, 50]
/// * `None` - `freq` is not positive (including a missing pitch passed
///   through as zero) or the reference is not usable
pub fn frequency_to_note(freq: f32, reference_freq: f32) -> Option<NoteResult> {
    let (n, cents) = split_semitones(semitones_from_reference(freq, reference_freq)?);

    let absolute = n + A4_OFFSET;
    Some(NoteResult {
        name: NoteName::from_chromatic_index(absolute),
        octave: absolute.div_euclid(12),
        cents,
    })
}

/// Calculates the exact frequency of a named note.
///
/// # Arguments
/// * `note_name` - One of the twelve sharp-spelled names ("C", "C#", ... "B")
/// * `octave` - Scientific pitch octave
/// * `reference_freq` - Frequency of A4 in Hz
///
/// # Returns
/// * `Ok(frequency)` - Equal-tempered frequency in Hz
/// * `Err(TunerError::InvalidNoteName)` - `note_name` is not in the table
/// * `Err(TunerError::InvalidReferenceFrequency)` - Reference is not positive
pub fn note_to_frequency(note_name: &str, octave: i32, reference_freq: f32) -> TunerResult<f32> {
    let name: NoteName = note_name.parse()?;
    if !(reference_freq > 0.0 && reference_freq.is_finite()) {
        return Err(TunerError::InvalidReferenceFrequency(reference_freq));
    }
    Ok(name.frequency(octave, reference_freq))
}

/// Finds the closest note to a frequency along with its exact target frequency.
///
/// This is what a display uses to show both the detected frequency and the
/// frequency the player should be hitting.
pub fn closest_note(freq: f32, reference_freq: f32) -> Option<ClosestNote> {
    let note = frequency_to_note(freq, reference_freq)?;
    Some(ClosestNote {
        name: note.name,
        octave: note.octave,
        exact_frequency: note.name.frequency(note.octave, reference_freq),
        cents: note.cents,
    })
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
///
/// # Arguments
/// * `freq` - Measured frequency in Hz
/// * `target_freq` - Target frequency in Hz
///
/// # Returns
/// * Cent deviation (positive = sharp, negative = flat)
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
