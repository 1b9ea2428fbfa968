//! # Instrument Profiles
//!
//! Read-only table of open-string tunings for common stringed instruments.
//! Frequencies are derived on demand from the caller's reference frequency,
//! so the table itself never changes.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::tuning::{NoteName, calculate_cents_deviation};

/// One open string, low to high in its profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstrumentString {
    pub name: NoteName,
    pub octave: i32,
}

impl InstrumentString {
    const fn new(name: NoteName, octave: i32) -> Self {
        Self { name, octave }
    }

    pub fn frequency(&self, reference_freq: f32) -> f32 {
        self.name.frequency(self.octave, reference_freq)
    }
}

/// The open strings of one instrument in standard tuning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentProfile {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Strings in the order a player names them (low to high for most).
    pub strings: Vec<InstrumentString>,
}

/// The open string closest to a detected frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StringMatch {
    /// Position of the string within its profile.
    pub index: usize,
    pub name: NoteName,
    pub octave: i32,
    pub target_frequency: f32,
    /// Unrounded deviation from the string's frequency.
    pub cents: f32,
}

impl InstrumentProfile {
    /// Frequencies of the open strings under the given tuning standard.
    pub fn frequencies(&self, reference_freq: f32) -> Vec<f32> {
        self.strings
            .iter()
            .map(|string| string.frequency(reference_freq))
            .collect()
    }

    /// Lowest and highest open-string frequencies.
    pub fn frequency_range(&self, reference_freq: f32) -> (f32, f32) {
        self.frequencies(reference_freq)
            .into_iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(low, high), freq| {
                (low.min(freq), high.max(freq))
            })
    }

    /// Finds the open string closest to `freq` in cents.
    ///
    /// # Returns
    /// * `Some(StringMatch)` - Closest string and the deviation from it
    /// * `None` - `freq` is not a positive finite frequency
    pub fn nearest_string(&self, freq: f32, reference_freq: f32) -> Option<StringMatch> {
        if !(freq > 0.0 && freq.is_finite()) {
            return None;
        }
        self.strings
            .iter()
            .enumerate()
            .map(|(index, string)| {
                let target_frequency = string.frequency(reference_freq);
                StringMatch {
                    index,
                    name: string.name,
                    octave: string.octave,
                    target_frequency,
                    cents: calculate_cents_deviation(freq, target_frequency),
                }
            })
            .min_by(|a, b| a.cents.abs().total_cmp(&b.cents.abs()))
    }
}

/// Static instrument table keyed by identifier.
static INSTRUMENTS: Lazy<BTreeMap<&'static str, InstrumentProfile>> = Lazy::new(|| {
    use NoteName::*;

    let table: [(&'static str, &'static str, &[InstrumentString]); 8] = [
        (
            "guitar",
            "Guitar",
            &[
                InstrumentString::new(E, 2),
                InstrumentString::new(A, 2),
                InstrumentString::new(D, 3),
                InstrumentString::new(G, 3),
                InstrumentString::new(B, 3),
                InstrumentString::new(E, 4),
            ],
        ),
        (
            "bass",
            "Bass Guitar",
            &[
                InstrumentString::new(E, 1),
                InstrumentString::new(A, 1),
                InstrumentString::new(D, 2),
                InstrumentString::new(G, 2),
            ],
        ),
        (
            "ukulele",
            "Ukulele",
            &[
                InstrumentString::new(G, 4),
                InstrumentString::new(C, 4),
                InstrumentString::new(E, 4),
                InstrumentString::new(A, 4),
            ],
        ),
        (
            "violin",
            "Violin",
            &[
                InstrumentString::new(G, 3),
                InstrumentString::new(D, 4),
                InstrumentString::new(A, 4),
                InstrumentString::new(E, 5),
            ],
        ),
        (
            "viola",
            "Viola",
            &[
                InstrumentString::new(C, 3),
                InstrumentString::new(G, 3),
                InstrumentString::new(D, 4),
                InstrumentString::new(A, 4),
            ],
        ),
        (
            "cello",
            "Cello",
            &[
                InstrumentString::new(C, 2),
                InstrumentString::new(G, 2),
                InstrumentString::new(D, 3),
                InstrumentString::new(A, 3),
            ],
        ),
        (
            "mandolin",
            "Mandolin",
            &[
                InstrumentString::new(G, 3),
                InstrumentString::new(D, 4),
                InstrumentString::new(A, 4),
                InstrumentString::new(E, 5),
            ],
        ),
        (
            "banjo",
            "Banjo (open G)",
            &[
                InstrumentString::new(G, 4),
                InstrumentString::new(D, 3),
                InstrumentString::new(G, 3),
                InstrumentString::new(B, 3),
                InstrumentString::new(D, 4),
            ],
        ),
    ];

    table
        .into_iter()
        .map(|(id, display_name, strings)| {
            (
                id,
                InstrumentProfile {
                    id,
                    display_name,
                    strings: strings.to_vec(),
                },
            )
        })
        .collect()
});

/// Looks up an instrument by identifier.
///
/// An unknown identifier is an expected, displayable case and yields `None`.
pub fn instrument_profile(instrument_id: &str) -> Option<&'static InstrumentProfile> {
    INSTRUMENTS.get(instrument_id)
}

/// Identifiers of every built-in instrument, sorted.
pub fn instrument_ids() -> impl Iterator<Item = &'static str> {
    INSTRUMENTS.keys().copied()
}
