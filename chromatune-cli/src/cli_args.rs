//! CLI argument definitions for the chromatune command-line interface.

use chromatune_core::Algorithm;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Chromatune - monophonic pitch detection and note mapping
#[derive(Parser)]
#[command(name = "chromatune")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub tuning: TuningArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every command.
#[derive(Args, Debug, Clone)]
pub(crate) struct TuningArgs {
    /// Frequency of A4 in Hz (420-460); overrides the config file
    #[arg(short, long, global = true)]
    pub reference: Option<f32>,

    /// Pitch detection algorithm; overrides the config file
    #[arg(short, long, global = true, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Path to a JSON tuner configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Detect the pitch of every analysis window of a WAV file
    Analyze {
        /// Path to the WAV file
        input: PathBuf,

        /// Compare against the open strings of an instrument (e.g. guitar)
        #[arg(short, long)]
        instrument: Option<String>,

        /// Print one JSON object per window instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the exact frequency of a note
    Note {
        /// Note name: C, C#, D, D#, E, F, F#, G, G#, A, A#, B
        name: String,

        /// Octave in scientific pitch notation (A4 is the reference)
        #[arg(allow_negative_numbers = true)]
        octave: i32,
    },

    /// Print the closest note to a frequency
    Freq {
        /// Frequency in Hz
        hz: f32,
    },

    /// List instruments, or the open strings of one instrument
    Instruments {
        /// Instrument identifier
        id: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum AlgorithmArg {
    /// Unbiased autocorrelation peak
    Autocorrelation,
    /// YIN cumulative mean normalized difference
    Yin,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Autocorrelation => Algorithm::Autocorrelation,
            AlgorithmArg::Yin => Algorithm::Yin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "chromatune", "note", "E", "2", "--reference", "442", "-a", "yin",
        ])
        .unwrap();
        assert_eq!(cli.tuning.reference, Some(442.0));
        assert_eq!(cli.tuning.algorithm, Some(AlgorithmArg::Yin));
        match cli.command {
            Commands::Note { name, octave } => assert_eq!((name.as_str(), octave), ("E", 2)),
            _ => panic!("expected note command"),
        }
    }

    #[test]
    fn negative_octaves_parse() {
        let cli = Cli::try_parse_from(["chromatune", "note", "C", "-1"]).unwrap();
        assert!(matches!(cli.command, Commands::Note { octave: -1, .. }));
    }
}
