//! # Acquisition Loop Module
//!
//! Runs pitch estimation on a dedicated thread. Frames arrive over a
//! crossbeam channel (usually fed by [`crate::audio::start_audio_capture`]);
//! every analysed frame produces one [`Reading`] for the presentation layer.
//!
//! At most one frame is in flight: the loop finishes a frame before it
//! receives the next one, and the capture side drops frames while the loop
//! is busy.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::TunerResult;
use crate::mapper::{NoteEstimate, NoteMapper};
use crate::pitch::{self, AudioFrame, PitchEstimate, PitchEstimator};
use crate::tuning::NoteTable;

/// Result of analysing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Level meter value in [0, 1].
    pub loudness: f32,
    pub pitch: PitchEstimate,
    /// Nearest note, `None` when the pitch is indeterminate or out of range.
    pub note: Option<NoteEstimate>,
}

/// Control messages for a running loop.
#[derive(Debug, Clone)]
pub enum AcquisitionCommand {
    /// Swap in the table for a new reference pitch.
    SetReference(Arc<NoteTable>),
    Shutdown,
}

/// Analyses a single frame: loudness, pitch estimate and nearest note.
///
/// # Errors
/// `InvalidInput` when the frame is malformed (see [`AudioFrame::new`]).
pub fn analyze_frame(
    samples: &[f32],
    sample_rate: u32,
    estimator: &PitchEstimator,
    mapper: &NoteMapper,
    table: &NoteTable,
) -> TunerResult<Reading> {
    let frame = AudioFrame::new(samples, sample_rate)?;
    let loudness = pitch::loudness(samples);
    let estimate = estimator.estimate(&frame);
    Ok(Reading {
        loudness,
        pitch: estimate,
        note: estimate.frequency().and_then(|f| mapper.map(f, table)),
    })
}

/// Handle to the analysis thread.
#[derive(Debug)]
pub struct AcquisitionLoop {
    command_tx: Sender<AcquisitionCommand>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AcquisitionLoop {
    /// Starts the analysis thread.
    ///
    /// The thread exits when `frames` disconnects, when `readings` has no
    /// receiver left, or on [`AcquisitionLoop::stop`].
    pub fn spawn(
        frames: Receiver<Vec<f32>>,
        sample_rate: u32,
        estimator: PitchEstimator,
        mapper: NoteMapper,
        table: Arc<NoteTable>,
        readings: Sender<Reading>,
    ) -> std::io::Result<Self> {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let thread_handle = thread::Builder::new()
            .name("acquisition".into())
            .spawn(move || {
                run(frames, command_rx, sample_rate, estimator, mapper, table, readings)
            })?;
        Ok(Self {
            command_tx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Switches the running loop to a new reference pitch.
    pub fn set_reference(&self, table: Arc<NoteTable>) {
        let _ = self.command_tx.send(AcquisitionCommand::SetReference(table));
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the thread to finish and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("Acquisition thread panicked");
            }
        }
    }

    fn shutdown(&self) {
        let _ = self.command_tx.send(AcquisitionCommand::Shutdown);
    }
}

impl Drop for AcquisitionLoop {
    fn drop(&mut self) {
        // Not joined here: a blocked frame source must not hang the caller.
        self.shutdown();
    }
}

fn run(
    frames: Receiver<Vec<f32>>,
    commands: Receiver<AcquisitionCommand>,
    sample_rate: u32,
    estimator: PitchEstimator,
    mapper: NoteMapper,
    mut table: Arc<NoteTable>,
    readings: Sender<Reading>,
) {
    info!(
        "Acquisition loop started at {} Hz, A4 = {} Hz",
        sample_rate,
        table.reference_a4()
    );

    loop {
        crossbeam_channel::select! {
            recv(frames) -> msg => match msg {
                Ok(frame) => match analyze_frame(&frame, sample_rate, &estimator, &mapper, &table) {
                    Ok(reading) => {
                        debug!("{:?}", reading);
                        if readings.send(reading).is_err() {
                            info!("Reading receiver dropped");
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping frame: {}", e),
                },
                Err(_) => {
                    info!("Frame source closed");
                    break;
                }
            },
            recv(commands) -> msg => match msg {
                Ok(AcquisitionCommand::SetReference(new_table)) => {
                    info!("Reference pitch set to {} Hz", new_table.reference_a4());
                    table = new_table;
                }
                Ok(AcquisitionCommand::Shutdown) | Err(_) => {
                    info!("Received shutdown signal");
                    break;
                }
            },
        }
    }

    info!("Acquisition loop finished");
}
