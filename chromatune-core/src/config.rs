//! # Tuner Configuration
//!
//! User-adjustable settings for an analysis session, stored as JSON.
//! Every field has a default, so a partial file (or `{}`) is a valid
//! configuration.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::{TunerError, TunerResult};
use crate::instrument::InstrumentProfile;
use crate::pitch::{Algorithm, DetectorSettings};
use crate::tuning::DEFAULT_REFERENCE_FREQUENCY;

/// Valid tuning standards for A4, in Hz.
pub const REFERENCE_FREQUENCY_RANGE: RangeInclusive<f32> = 420.0..=460.0;

/// Analysis window size in samples (~46ms at 44.1kHz).
pub const DEFAULT_WINDOW_SIZE: usize = 2048;

/// Highest capture rate window sizes are checked against, in Hz.
pub const MAX_SAMPLE_RATE: u32 = 48_000;

/// Number of frames averaged for the displayed cents value.
pub const DEFAULT_SMOOTHING_FACTOR: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Frequency of A4 in Hz.
    pub reference_frequency: f32,
    pub algorithm: Algorithm,
    /// Samples per analysis window.
    pub window_size: usize,
    /// Frames of cents history averaged for display. 1 disables smoothing.
    pub smoothing_factor: usize,
    pub detector: DetectorSettings,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            reference_frequency: DEFAULT_REFERENCE_FREQUENCY,
            algorithm: Algorithm::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            detector: DetectorSettings::default(),
        }
    }
}

/// Checks a tuning standard against [`REFERENCE_FREQUENCY_RANGE`].
pub fn validate_reference_frequency(reference_freq: f32) -> TunerResult<()> {
    if REFERENCE_FREQUENCY_RANGE.contains(&reference_freq) {
        Ok(())
    } else {
        Err(TunerError::InvalidReferenceFrequency(reference_freq))
    }
}

impl TunerConfig {
    /// Rejects values that would make the detectors meaningless.
    pub fn validate(&self) -> TunerResult<()> {
        validate_reference_frequency(self.reference_frequency)?;

        if self.smoothing_factor == 0 {
            return Err(TunerError::config("smoothing_factor", "must be at least 1"));
        }

        let d = &self.detector;
        if !(d.min_frequency > 0.0 && d.min_frequency.is_finite()) {
            return Err(TunerError::config(
                "detector.min_frequency",
                format!("must be positive, got {}", d.min_frequency),
            ));
        }
        if !(d.max_frequency > d.min_frequency && d.max_frequency.is_finite()) {
            return Err(TunerError::config(
                "detector.max_frequency",
                format!(
                    "must exceed min_frequency ({}), got {}",
                    d.min_frequency, d.max_frequency
                ),
            ));
        }
        if d.silence_threshold.is_nan() || d.silence_threshold < 0.0 {
            return Err(TunerError::config(
                "detector.silence_threshold",
                "must not be negative",
            ));
        }
        for (field, value) in [
            ("detector.clarity_threshold", d.clarity_threshold),
            ("detector.peak_tolerance", d.peak_tolerance),
            ("detector.yin_threshold", d.yin_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TunerError::config(
                    field,
                    format!("must be within [0, 1], got {value}"),
                ));
            }
        }

        let min_window = self.min_window_size();
        if self.window_size < min_window {
            return Err(TunerError::config(
                "window_size",
                format!(
                    "must hold two periods of min_frequency ({} Hz): at least {} samples, got {}",
                    d.min_frequency, min_window, self.window_size
                ),
            ));
        }
        Ok(())
    }

    /// Smallest window holding two periods of `min_frequency` at
    /// [`MAX_SAMPLE_RATE`].
    pub fn min_window_size(&self) -> usize {
        2 * (MAX_SAMPLE_RATE as f32 / self.detector.min_frequency).ceil() as usize
    }

    /// Checks that every open string of `profile` lies within the detector's
    /// frequency range under the configured reference.
    pub fn check_instrument(&self, profile: &InstrumentProfile) -> TunerResult<()> {
        let (lowest, highest) = profile.frequency_range(self.reference_frequency);
        let d = &self.detector;
        for frequency in [lowest, highest] {
            if frequency < d.min_frequency || frequency > d.max_frequency {
                return Err(TunerError::InstrumentOutOfRange {
                    instrument: profile.id.to_string(),
                    frequency,
                    min_frequency: d.min_frequency,
                    max_frequency: d.max_frequency,
                });
            }
        }
        Ok(())
    }

    /// Widens the frequency range and window so `profile` passes
    /// [`check_instrument`](Self::check_instrument) under any reference in
    /// [`REFERENCE_FREQUENCY_RANGE`].
    ///
    /// A configuration that already covers the instrument comes back
    /// unchanged.
    pub fn fitted_to(&self, profile: &InstrumentProfile) -> TunerConfig {
        let mut config = self.clone();
        let (lowest, _) = profile.frequency_range(*REFERENCE_FREQUENCY_RANGE.start());
        let (_, highest) = profile.frequency_range(*REFERENCE_FREQUENCY_RANGE.end());

        // Leave room for a string tuned well off pitch.
        if lowest < config.detector.min_frequency {
            config.detector.min_frequency = (lowest * 0.9).floor();
        }
        if highest > config.detector.max_frequency {
            config.detector.max_frequency = (highest * 1.1).ceil();
        }
        let min_window = config.min_window_size();
        if config.window_size < min_window {
            config.window_size = min_window.next_power_of_two();
        }
        config
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TunerConfig =
            serde_json::from_str(json).context("Failed to parse tuner configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize tuner configuration")
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&data)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("loaded tuner config from {}", path.display());
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        debug!("saved tuner config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{instrument_ids, instrument_profile};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reference_frequency, 440.0);
        assert_eq!(config.window_size, 2048);
        assert_eq!(config.algorithm, Algorithm::Autocorrelation);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = TunerConfig::from_json(
            r#"{ "reference_frequency": 442.0, "algorithm": "yin", "detector": { "min_frequency": 60.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.reference_frequency, 442.0);
        assert_eq!(config.algorithm, Algorithm::Yin);
        assert_eq!(config.detector.min_frequency, 60.0);
        assert_eq!(config.detector.max_frequency, 1500.0);
        assert_eq!(config.smoothing_factor, DEFAULT_SMOOTHING_FACTOR);
    }

    #[test]
    fn reference_outside_range_is_rejected() {
        for reference in [419.9, 460.1, 0.0, -440.0, f32::NAN] {
            let config = TunerConfig {
                reference_frequency: reference,
                ..TunerConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(TunerError::InvalidReferenceFrequency(_))
            ));
        }
        validate_reference_frequency(420.0).unwrap();
        validate_reference_frequency(460.0).unwrap();
    }

    #[test]
    fn inverted_frequency_bounds_are_rejected() {
        let mut config = TunerConfig::default();
        config.detector.max_frequency = 40.0;
        assert_eq!(
            config.validate().unwrap_err(),
            TunerError::InvalidConfig {
                field: "detector.max_frequency",
                message: "must exceed min_frequency (50), got 40".to_string(),
            }
        );
    }

    #[test]
    fn thresholds_must_be_fractions() {
        let mut config = TunerConfig::default();
        config.detector.clarity_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(TunerError::InvalidConfig { field: "detector.clarity_threshold", .. })
        ));
    }

    #[test]
    fn windows_must_hold_two_periods_of_the_lowest_frequency() {
        let config = TunerConfig {
            window_size: 512,
            ..TunerConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            TunerError::InvalidConfig {
                field: "window_size",
                message: "must hold two periods of min_frequency (50 Hz): at least 1920 samples, got 512"
                    .to_string(),
            }
        );

        let mut config = TunerConfig {
            window_size: 1024,
            ..TunerConfig::default()
        };
        config.detector.min_frequency = 100.0;
        config.validate().unwrap();
    }

    #[test]
    fn instruments_outside_the_detector_range_are_reported() {
        let config = TunerConfig::default();
        config
            .check_instrument(instrument_profile("guitar").unwrap())
            .unwrap();

        match config.check_instrument(instrument_profile("bass").unwrap()) {
            Err(TunerError::InstrumentOutOfRange {
                instrument,
                frequency,
                ..
            }) => {
                assert_eq!(instrument, "bass");
                assert!((frequency - 41.20).abs() < 0.01, "{frequency}");
            }
            other => panic!("expected out-of-range error, got {other:?}"),
        }
    }

    #[test]
    fn fitting_widens_only_when_needed() {
        let config = TunerConfig::default();
        for id in instrument_ids() {
            let profile = instrument_profile(id).unwrap();
            let fitted = config.fitted_to(profile);
            fitted.validate().unwrap();
            for reference in [420.0, 440.0, 460.0] {
                let fitted = TunerConfig {
                    reference_frequency: reference,
                    ..fitted.clone()
                };
                fitted.check_instrument(profile).unwrap();
            }
            if id != "bass" {
                assert_eq!(fitted, config, "{id}");
            }
        }

        let bass = config.fitted_to(instrument_profile("bass").unwrap());
        assert_eq!(bass.detector.min_frequency, 35.0);
        assert_eq!(bass.window_size, 4096);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(TunerConfig::from_json("{ not json").is_err());
        assert!(TunerConfig::from_json(r#"{ "algorithm": "fft" }"#).is_err());
        assert!(TunerConfig::from_json(r#"{ "window_size": 0 }"#).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuner.json");
        let config = TunerConfig {
            reference_frequency: 432.0,
            algorithm: Algorithm::Yin,
            smoothing_factor: 3,
            ..TunerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(TunerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_mentions_the_path() {
        let err = TunerConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
