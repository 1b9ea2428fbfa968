//! # Analysis Session
//!
//! The one stateful piece of the tuner. A session owns the configuration,
//! the selected detector, the tuning mode and the cents smoothing history,
//! and turns each incoming [`SampleWindow`] into an [`AnalysisResult`].
//! The detectors and note mapping it calls stay pure.
//!
//! [`TunerSession::run`] is the polling loop for a dedicated analysis
//! thread: it pulls windows from a channel until the source closes, the
//! consumer goes away, or a shutdown signal arrives.

use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::collections::VecDeque;

use crate::AnalysisResult;
use crate::config::{TunerConfig, validate_reference_frequency};
use crate::error::{TunerError, TunerResult};
use crate::instrument::{InstrumentProfile, instrument_profile};
use crate::pitch::{Algorithm, PitchDetector, SampleWindow};
use crate::tuning::{calculate_cents_deviation, closest_note};

/// What the detected pitch is compared against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuningMode {
    /// Nearest note of the chromatic scale.
    Chromatic,
    /// Nearest open string of an instrument.
    Instrument(&'static InstrumentProfile),
}

pub struct TunerSession {
    config: TunerConfig,
    detector: Box<dyn PitchDetector>,
    mode: TuningMode,
    smoothing_buffer: VecDeque<f32>,
}

impl TunerSession {
    /// Creates a session in chromatic mode.
    ///
    /// # Returns
    /// * `Err(TunerError)` - The configuration failed validation
    pub fn new(config: TunerConfig) -> TunerResult<Self> {
        config.validate()?;
        let detector = config.algorithm.build(config.detector.clone());
        debug!(
            "session created: {} detector, A4 = {} Hz",
            detector.name(),
            config.reference_frequency
        );
        Ok(Self {
            smoothing_buffer: VecDeque::with_capacity(config.smoothing_factor),
            config,
            detector,
            mode: TuningMode::Chromatic,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn mode(&self) -> TuningMode {
        self.mode
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Changes the tuning standard. Takes effect on the next window.
    ///
    /// In instrument mode the strings must stay within the detector range
    /// under the new reference.
    pub fn set_reference_frequency(&mut self, reference_freq: f32) -> TunerResult<()> {
        validate_reference_frequency(reference_freq)?;
        if let TuningMode::Instrument(profile) = self.mode {
            TunerConfig {
                reference_frequency: reference_freq,
                ..self.config.clone()
            }
            .check_instrument(profile)?;
        }
        debug!(
            "reference frequency {} -> {} Hz",
            self.config.reference_frequency, reference_freq
        );
        self.config.reference_frequency = reference_freq;
        self.smoothing_buffer.clear();
        Ok(())
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        if algorithm == self.config.algorithm {
            return;
        }
        self.config.algorithm = algorithm;
        self.detector = algorithm.build(self.config.detector.clone());
        debug!("switched to {} detector", self.detector.name());
        self.smoothing_buffer.clear();
    }

    /// Switches what detected pitches are compared against.
    ///
    /// # Returns
    /// * `Err(TunerError::InstrumentOutOfRange)` - A string of the instrument
    ///   lies outside the detector's frequency range; see
    ///   [`TunerConfig::fitted_to`]
    pub fn set_mode(&mut self, mode: TuningMode) -> TunerResult<()> {
        if let TuningMode::Instrument(profile) = mode {
            self.config.check_instrument(profile)?;
        }
        self.mode = mode;
        self.smoothing_buffer.clear();
        Ok(())
    }

    /// Switches to instrument mode by identifier.
    pub fn select_instrument(&mut self, instrument_id: &str) -> TunerResult<()> {
        let profile = instrument_profile(instrument_id)
            .ok_or_else(|| TunerError::UnknownInstrument(instrument_id.to_string()))?;
        self.set_mode(TuningMode::Instrument(profile))?;
        debug!("tuning against {}", profile.display_name);
        Ok(())
    }

    /// Mean of the recent cents deviations, `None` after a silent window.
    pub fn smoothed_cents(&self) -> Option<f32> {
        if self.smoothing_buffer.is_empty() {
            return None;
        }
        Some(self.smoothing_buffer.iter().sum::<f32>() / self.smoothing_buffer.len() as f32)
    }

    /// Performs a full analysis on a single window.
    ///
    /// 1. Detects the fundamental with the selected detector
    /// 2. Maps it to the closest note under the current reference
    /// 3. In instrument mode, finds the closest open string
    /// 4. Updates the cents smoothing history
    pub fn analyze(&mut self, window: &SampleWindow) -> AnalysisResult {
        let reference = self.config.reference_frequency;
        let reading = self
            .detector
            .detect_with_clarity(&window.samples, window.sample_rate);

        let detected_frequency = reading.map(|r| r.frequency);
        let note = detected_frequency.and_then(|freq| closest_note(freq, reference));
        let string = match (self.mode, detected_frequency) {
            (TuningMode::Instrument(profile), Some(freq)) => profile.nearest_string(freq, reference),
            _ => None,
        };

        let cents_deviation = match self.mode {
            TuningMode::Chromatic => detected_frequency
                .zip(note)
                .map(|(freq, note)| calculate_cents_deviation(freq, note.exact_frequency)),
            TuningMode::Instrument(_) => string.map(|s| s.cents),
        };

        match cents_deviation {
            Some(cents) => {
                self.smoothing_buffer.push_back(cents);
                if self.smoothing_buffer.len() > self.config.smoothing_factor {
                    self.smoothing_buffer.pop_front();
                }
            }
            None => self.smoothing_buffer.clear(),
        }

        AnalysisResult {
            detected_frequency,
            confidence: reading.map(|r| r.clarity),
            note,
            string,
            cents_deviation,
            smoothed_cents: self.smoothed_cents(),
        }
    }

    /// Analyses windows from `frames` and forwards results until stopped.
    ///
    /// Stops when `frames` disconnects, `results` has no receiver left, or
    /// `shutdown` yields (a message or a disconnect). Pass
    /// `crossbeam_channel::never()` to run until the source closes.
    ///
    /// # Returns
    /// * Number of windows analysed
    pub fn run(
        &mut self,
        frames: &Receiver<SampleWindow>,
        results: &Sender<AnalysisResult>,
        shutdown: &Receiver<()>,
    ) -> usize {
        debug!("analysis loop started");
        let mut processed = 0;
        loop {
            crossbeam_channel::select! {
                recv(frames) -> msg => match msg {
                    Ok(window) => {
                        let result = self.analyze(&window);
                        processed += 1;
                        if results.send(result).is_err() {
                            debug!("result receiver dropped");
                            break;
                        }
                    }
                    Err(_) => {
                        debug!("frame channel closed");
                        break;
                    }
                },
                recv(shutdown) -> _ => {
                    debug!("received shutdown signal");
                    break;
                },
            }
        }
        debug!("analysis loop finished after {} windows", processed);
        processed
    }
}
