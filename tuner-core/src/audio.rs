//! # Audio Device Module
//!
//! Real-time audio I/O using CPAL (Cross-Platform Audio Library): microphone
//! capture feeding the acquisition loop, and reference-tone playback.
//!
//! ## Features
//! - Automatic input/output device selection
//! - Preference for a 44.1 kHz f32 input stream, any channel count
//! - Sliding analysis frames with a configurable hop
//! - Tone playback that releases its stream when the envelope ends

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use log::{error, info};
use std::time::Duration;

use crate::synth::Tone;

/// Preferred capture sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Starts audio capture from the default input device.
///
/// Incoming audio is downmixed to mono and cut into frames of `frame_size`
/// samples, a new frame every `hop_size` samples. Frames are handed to
/// `sender` with `try_send`, so a busy consumer loses frames instead of
/// building a backlog.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate
/// * `Err(e)` - No device or no usable f32 configuration
pub fn start_audio_capture(
    frame_size: usize,
    hop_size: usize,
    sender: Sender<Vec<f32>>,
) -> Result<(cpal::Stream, u32)> {
    if frame_size == 0 || hop_size == 0 || hop_size > frame_size {
        return Err(anyhow!(
            "invalid framing: frame size {frame_size}, hop size {hop_size}"
        ));
    }

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = clamp_rate(&supported_config, TARGET_SAMPLE_RATE);
    let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    info!("Selected sample rate: {} Hz, {} channel(s)", sample_rate, channels);

    let mut framer = Framer::new(frame_size, hop_size);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            framer.push_interleaved(data, channels, |frame| {
                let _ = sender.try_send(frame);
            });
        },
        |err| error!("An error occurred on the input stream: {}", err),
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks an f32 configuration whose rate range is closest to `target_rate`,
/// preferring fewer channels.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate = clamp_rate(c, target_rate);
            ((rate as i64 - target_rate as i64).abs(), c.channels())
        })
}

fn clamp_rate(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    target_rate.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}

/// Accumulates mono samples and emits overlapping frames.
#[derive(Debug)]
struct Framer {
    frame_size: usize,
    hop_size: usize,
    buffer: Vec<f32>,
}

impl Framer {
    fn new(frame_size: usize, hop_size: usize) -> Self {
        Self {
            frame_size,
            hop_size,
            buffer: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Averages each interleaved group of `channels` samples into one.
    fn push_interleaved(&mut self, data: &[f32], channels: usize, mut emit: impl FnMut(Vec<f32>)) {
        let channels = channels.max(1);
        self.buffer.extend(
            data.chunks(channels)
                .map(|group| group.iter().sum::<f32>() / group.len() as f32),
        );

        // While we have enough data for a full frame, emit it.
        while self.buffer.len() >= self.frame_size {
            emit(self.buffer[..self.frame_size].to_vec());
            self.buffer.drain(..self.hop_size);
        }
    }
}

/// A reference tone playing on the default output device.
///
/// Dropping the handle stops playback and closes the stream.
pub struct TonePlayback {
    stream: Option<cpal::Stream>,
    finished_rx: Receiver<()>,
    duration: Duration,
}

impl TonePlayback {
    /// Blocks until the tone's envelope has finished, then releases the
    /// output stream.
    pub fn wait(mut self) {
        // Allow for device latency on top of the nominal duration.
        let timeout = self.duration + Duration::from_secs(2);
        if self.finished_rx.recv_timeout(timeout).is_err() {
            error!("Tone playback did not report completion in {:?}", timeout);
        }
        self.release();
    }

    /// Stops playback immediately.
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                error!("Error pausing output stream: {}", e);
            }
            drop(stream);
            info!("Tone playback released");
        }
    }
}

impl Drop for TonePlayback {
    fn drop(&mut self) {
        self.release();
    }
}

/// Plays `tone` on the default output device.
///
/// The tone's own sample rate is ignored in favour of the device rate: the
/// tone is re-created at the device rate with the same frequency and
/// envelope.
pub fn play_tone(tone: Tone) -> Result<TonePlayback> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No output device available"))?;

    info!("Using audio output device: {}", device.name()?);

    let supported = device.default_output_config()?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(anyhow!(
            "Output device format {:?} is not supported",
            supported.sample_format()
        ));
    }
    let channels = supported.channels() as usize;
    let sample_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    let mut tone = Tone::new(tone.frequency(), sample_rate, tone.envelope())?;
    let duration = Duration::from_secs_f32(tone.envelope().duration_secs);
    let (finished_tx, finished_rx) = crossbeam_channel::bounded(1);
    let mut reported = false;

    info!("Playing {:.2} Hz for {:?}", tone.frequency(), duration);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels.max(1)) {
                let sample = tone.next().unwrap_or(0.0);
                frame.fill(sample);
            }
            if tone.is_finished() && !reported {
                reported = true;
                let _ = finished_tx.try_send(());
            }
        },
        |err| error!("An error occurred on the output stream: {}", err),
        None,
    )?;

    stream.play()?;

    Ok(TonePlayback {
        stream: Some(stream),
        finished_rx,
        duration,
    })
}
