//! Command implementations.

use anyhow::{Context, Result, anyhow};
use chromatune_core::framing::FrameAccumulator;
use chromatune_core::{
    AnalysisResult, TunerConfig, TunerError, TunerSession, closest_note, instrument_ids,
    instrument_profile, note_to_frequency,
};
use log::{debug, info};
use std::fmt::Write as _;
use std::path::Path;
use std::thread;

use crate::cli_args::TuningArgs;
use crate::wav;

/// Block size handed to the framer, mimicking an audio callback.
const FEED_BLOCK: usize = 512;

/// Builds the effective configuration: file (or defaults), then CLI overrides.
pub(crate) fn resolve_config(args: &TuningArgs) -> Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::load(path)?,
        None => TunerConfig::default(),
    };
    if let Some(reference) = args.reference {
        config.reference_frequency = reference;
    }
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm.into();
    }
    config.validate()?;
    Ok(config)
}

/// Runs every window of a WAV file through an analysis session on a worker
/// thread and returns one output line per window.
///
/// With an instrument, the detector range and window grow as needed to
/// reach its lowest string.
pub(crate) fn analyze(
    config: TunerConfig,
    input: &Path,
    instrument: Option<&str>,
    json: bool,
) -> Result<Vec<String>> {
    let audio = wav::read_mono(input)?;
    let config = match instrument {
        Some(id) => {
            let profile = instrument_profile(id)
                .ok_or_else(|| TunerError::UnknownInstrument(id.to_string()))?;
            let fitted = config.fitted_to(profile);
            if fitted != config {
                info!(
                    "{} needs {}-{} Hz with {}-sample windows",
                    profile.display_name,
                    fitted.detector.min_frequency,
                    fitted.detector.max_frequency,
                    fitted.window_size
                );
            }
            fitted
        }
        None => config,
    };
    let window_size = config.window_size;

    let mut session = TunerSession::new(config)?;
    if let Some(id) = instrument {
        session.select_instrument(id)?;
    }

    let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<AnalysisResult>();

    let worker = thread::spawn(move || {
        session.run(&frame_rx, &result_tx, &crossbeam_channel::never())
    });

    let mut framer = FrameAccumulator::new(window_size, audio.sample_rate)?;
    for block in audio.samples.chunks(FEED_BLOCK) {
        for window in framer.push(block) {
            frame_tx
                .send(window)
                .context("Analysis thread stopped early")?;
        }
    }
    debug!("{} trailing samples shorter than a window", framer.pending());
    drop(frame_tx);

    let processed = worker
        .join()
        .map_err(|_| anyhow!("Analysis thread panicked"))?;
    debug!("analysed {} windows", processed);

    let seconds_per_window = window_size as f32 / audio.sample_rate as f32;
    result_rx
        .iter()
        .enumerate()
        .map(|(index, result)| {
            if json {
                serde_json::to_string(&result).context("Failed to serialize analysis result")
            } else {
                Ok(format_result(index as f32 * seconds_per_window, &result))
            }
        })
        .collect()
}

/// One human-readable line for an analysis window.
pub(crate) fn format_result(time: f32, result: &AnalysisResult) -> String {
    let mut line = format!("{time:>8.3}s  ");
    match (result.detected_frequency, result.note) {
        (Some(freq), Some(note)) => {
            let _ = write!(
                line,
                "{:<4} {:>+4} cents  {:>8.2} Hz (target {:.2} Hz)",
                format!("{}{}", note.name, note.octave),
                note.cents,
                freq,
                note.exact_frequency
            );
            if let Some(string) = result.string {
                let _ = write!(
                    line,
                    "  string {} ({}{}) {:+.1} cents",
                    string.index + 1,
                    string.name,
                    string.octave,
                    string.cents
                );
            }
        }
        _ => line.push_str("--"),
    }
    line
}

pub(crate) fn note(config: &TunerConfig, name: &str, octave: i32) -> Result<String> {
    let freq = note_to_frequency(name, octave, config.reference_frequency)?;
    Ok(format!("{name}{octave} = {freq:.2} Hz"))
}

pub(crate) fn freq(config: &TunerConfig, hz: f32) -> String {
    match closest_note(hz, config.reference_frequency) {
        Some(note) => format!(
            "{hz:.2} Hz -> {}{} {:+} cents (target {:.2} Hz)",
            note.name, note.octave, note.cents, note.exact_frequency
        ),
        None => format!("{hz} Hz has no note"),
    }
}

pub(crate) fn instruments(config: &TunerConfig, id: Option<&str>) -> Vec<String> {
    let Some(id) = id else {
        return instrument_ids()
            .filter_map(instrument_profile)
            .map(|profile| format!("{:<10} {}", profile.id, profile.display_name))
            .collect();
    };

    match instrument_profile(id) {
        Some(profile) => {
            let mut lines = vec![format!(
                "{} (A4 = {} Hz)",
                profile.display_name, config.reference_frequency
            )];
            lines.extend(profile.strings.iter().enumerate().map(|(index, string)| {
                format!(
                    "  {}: {}{:<3} {:>8.2} Hz",
                    index + 1,
                    string.name,
                    string.octave,
                    string.frequency(config.reference_frequency)
                )
            }));
            lines
        }
        None => vec![format!(
            "No profile for '{id}'. Available: {}",
            instrument_ids().collect::<Vec<_>>().join(", ")
        )],
    }
}
