//! # Chromatune - Command-line Tuner
//!
//! Text front end for the chromatune core. It feeds WAV audio through an
//! analysis session on a worker thread, the same way a live capture layer
//! would, and answers note, frequency and instrument queries.
//!
//! Logging goes to stderr through `env_logger`; set `RUST_LOG=debug` to see
//! session and framing details.

mod cli_args;
mod commands;
mod wav;

use clap::Parser;
use std::process::ExitCode;

use cli_args::{Cli, Commands};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<Vec<String>> {
    let config = commands::resolve_config(&cli.tuning)?;
    log::debug!(
        "A4 = {} Hz, {:?} detector, {}-sample windows",
        config.reference_frequency,
        config.algorithm,
        config.window_size
    );

    match cli.command {
        Commands::Analyze {
            input,
            instrument,
            json,
        } => commands::analyze(config, &input, instrument.as_deref(), json),
        Commands::Note { name, octave } => Ok(vec![commands::note(&config, &name, octave)?]),
        Commands::Freq { hz } => Ok(vec![commands::freq(&config, hz)]),
        Commands::Instruments { id } => Ok(commands::instruments(&config, id.as_deref())),
    }
}
