//! # Tuner - Terminal Front-End
//!
//! Thin host around `tuner-core`: captures the microphone, runs the
//! acquisition loop and prints one status line per reading. Also plays
//! reference tones and maps single frequencies.
//!
//! ## Architecture
//! - **Capture**: cpal input callback cuts frames and hands them over a
//!   one-slot crossbeam channel
//! - **Acquisition thread**: estimates pitch and maps notes
//! - **Main thread**: prints readings until the deadline or the source ends

mod display;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cpal::traits::StreamTrait;
use crossbeam_channel::RecvTimeoutError;
use log::{info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tuner_core::audio::{self, TARGET_SAMPLE_RATE};
use tuner_core::tuning::SUPPORTED_REFERENCE_PITCHES;
use tuner_core::{AcquisitionLoop, Note, Tone, TunerConfig};

#[derive(Debug, Parser)]
#[command(name = "tuner", version, about = "Chromatic instrument tuner")]
struct Cli {
    /// JSON configuration file; missing fields use defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Listen to the microphone and show the nearest note.
    Listen {
        /// Reference pitch of A4 in Hz.
        #[arg(short, long)]
        reference: Option<f32>,
        /// Tune towards this note (e.g. E2) instead of the nearest one.
        #[arg(short, long)]
        target: Option<Note>,
        /// Stop after this many seconds.
        #[arg(short, long)]
        seconds: Option<f32>,
    },
    /// Play a reference tone for a note.
    Tone {
        note: Note,
        #[arg(short, long)]
        reference: Option<f32>,
        /// Tone length in seconds.
        #[arg(short, long)]
        duration: Option<f32>,
    },
    /// Map a frequency to its nearest note.
    Note {
        frequency: f32,
        #[arg(short, long)]
        reference: Option<f32>,
    },
    /// Print the effective configuration, or write it to a file.
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => TunerConfig::load(path)?,
        None => TunerConfig::default(),
    };

    match cli.command {
        Command::Listen { reference, target, seconds } => {
            apply_reference(&mut config, reference)?;
            listen(&config, target, seconds)
        }
        Command::Tone { note, reference, duration } => {
            apply_reference(&mut config, reference)?;
            if let Some(duration) = duration {
                config.tone_duration_secs = duration;
            }
            config.validate()?;
            play(&config, note)
        }
        Command::Note { frequency, reference } => {
            apply_reference(&mut config, reference)?;
            let table = config.note_table()?;
            match config.mapper().map(frequency, &table) {
                Some(estimate) => println!("{}", display::describe(&estimate)),
                None => println!(
                    "{frequency} Hz is outside {}..{} Hz",
                    config.min_frequency, config.max_frequency
                ),
            }
            Ok(())
        }
        Command::Config { output } => match output {
            Some(path) => {
                config.save(&path)?;
                info!("Configuration written to {}", path.display());
                Ok(())
            }
            None => {
                println!("{}", config.to_json()?);
                Ok(())
            }
        },
    }
}

fn apply_reference(config: &mut TunerConfig, reference: Option<f32>) -> Result<()> {
    if let Some(reference) = reference {
        config.reference_a4 = reference;
    }
    if !SUPPORTED_REFERENCE_PITCHES.contains(&config.reference_a4) {
        warn!("Non-standard reference pitch A4 = {} Hz", config.reference_a4);
    }
    config.validate()?;
    Ok(())
}

fn listen(config: &TunerConfig, target: Option<Note>, seconds: Option<f32>) -> Result<()> {
    let table = Arc::new(config.note_table()?);
    let mapper = config.mapper();

    // One slot: the capture callback drops frames while a frame is being analysed.
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(1);
    let (stream, sample_rate) = audio::start_audio_capture(config.frame_size, config.hop_size, frame_tx)
        .context("starting audio capture")?;

    let (reading_tx, reading_rx) = crossbeam_channel::unbounded();
    let acquisition = AcquisitionLoop::spawn(
        frame_rx,
        sample_rate,
        config.estimator(),
        mapper,
        Arc::clone(&table),
        reading_tx,
    )?;

    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs_f32(s.max(0.0)));
    let target_name = target.map(|note| note.to_string());
    let mut stdout = std::io::stdout();

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match reading_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(reading) => {
                let line = match (target, &target_name) {
                    (Some(note), Some(name)) => {
                        let cents = reading
                            .pitch
                            .frequency()
                            .and_then(|f| mapper.deviation_from(f, note, &table));
                        display::target_line(&reading, name, cents)
                    }
                    _ => display::nearest_line(&reading),
                };
                write!(stdout, "\r\x1b[2K{line}")?;
                stdout.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Acquisition loop ended");
                break;
            }
        }
    }
    writeln!(stdout)?;

    if let Err(e) = stream.pause() {
        warn!("Error pausing input stream: {}", e);
    }
    drop(stream);
    acquisition.stop();
    Ok(())
}

fn play(config: &TunerConfig, note: Note) -> Result<()> {
    let table = config.note_table()?;
    let frequency = table.frequency_of(note);
    println!("{note}: {frequency:.2} Hz");

    let tone = Tone::new(frequency, TARGET_SAMPLE_RATE, config.tone_envelope())?;
    audio::play_tone(tone)?.wait();
    Ok(())
}
