//! # Pitch Detection Module
//!
//! Time-domain autocorrelation pitch estimation for monophonic tuning.
//!
//! ## Features
//! - RMS noise gate to reject silence
//! - Edge trimming of low-amplitude samples (center clipping)
//! - Autocorrelation peak search past the zero-lag lobe
//! - Parabolic interpolation for sub-sample accuracy

use crate::error::{TunerError, TunerResult};

/// RMS below which a frame is treated as silence.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;

/// Absolute amplitude below which edge samples are trimmed.
pub const DEFAULT_CLIP_THRESHOLD: f32 = 0.2;

/// Default number of samples per analysed frame.
pub const DEFAULT_FRAME_SIZE: usize = 4096;

/// Shortest trimmed buffer that still allows a three-point peak fit.
const MIN_TRIMMED_LEN: usize = 3;

/// One block of mono samples captured at `sample_rate`.
///
/// Borrows the caller's buffer; nothing here outlives the call that uses it.
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    samples: &'a [f32],
    sample_rate: u32,
}

impl<'a> AudioFrame<'a> {
    /// Wraps `samples`, rejecting frames the estimator cannot work with.
    ///
    /// # Errors
    /// `InvalidInput` for an empty frame, a zero sample rate or any
    /// NaN/infinite sample.
    pub fn new(samples: &'a [f32], sample_rate: u32) -> TunerResult<Self> {
        if samples.is_empty() {
            return Err(TunerError::invalid_input("audio frame is empty"));
        }
        if sample_rate == 0 {
            return Err(TunerError::invalid_input("sample rate must be positive"));
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(TunerError::invalid_input(format!(
                "non-finite sample at index {pos}"
            )));
        }
        Ok(Self { samples, sample_rate })
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Outcome of analysing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// Fundamental frequency in Hz, always finite and positive.
    Frequency(f32),
    /// Too quiet, or no periodicity found.
    Indeterminate,
}

impl PitchEstimate {
    pub fn frequency(self) -> Option<f32> {
        match self {
            PitchEstimate::Frequency(f) => Some(f),
            PitchEstimate::Indeterminate => None,
        }
    }

    pub fn is_indeterminate(self) -> bool {
        matches!(self, PitchEstimate::Indeterminate)
    }
}

/// Stateless autocorrelation pitch estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimator {
    pub silence_threshold: f32,
    pub clip_threshold: f32,
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self {
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            clip_threshold: DEFAULT_CLIP_THRESHOLD,
        }
    }
}

impl PitchEstimator {
    /// Estimates the fundamental frequency of `frame`.
    ///
    /// Silence and aperiodic input give `Indeterminate`; this never fails for
    /// a frame that passed [`AudioFrame::new`].
    pub fn estimate(&self, frame: &AudioFrame<'_>) -> PitchEstimate {
        let samples = frame.samples();

        if rms(samples) < self.silence_threshold {
            return PitchEstimate::Indeterminate;
        }

        let trimmed = self.trim(samples);
        let correlation = autocorrelate(trimmed);

        let Some(peak) = find_period_peak(&correlation) else {
            return PitchEstimate::Indeterminate;
        };

        let lag = refine_peak(&correlation, peak);
        let frequency = frame.sample_rate() as f32 / lag;

        if frequency.is_finite() && frequency > 0.0 {
            PitchEstimate::Frequency(frequency)
        } else {
            PitchEstimate::Indeterminate
        }
    }

    /// Drops quiet samples at both edges of the frame.
    ///
    /// The window starts at the first quiet sample of the first half and
    /// ends (exclusive) at the first quiet sample met scanning back through
    /// the second half. Either edge stays put when no quiet sample is found.
    /// A window shorter than three samples falls back to the whole frame.
    fn trim<'a>(&self, samples: &'a [f32]) -> &'a [f32] {
        let size = samples.len();
        let half = size / 2;

        let start = samples[..half]
            .iter()
            .position(|s| s.abs() < self.clip_threshold)
            .unwrap_or(0);
        let end = (1..half)
            .map(|i| size - i)
            .find(|&i| samples[i].abs() < self.clip_threshold)
            .unwrap_or(size);

        if end <= start || end - start < MIN_TRIMMED_LEN {
            return samples;
        }
        &samples[start..end]
    }
}

/// Convenience wrapper: validates and estimates with default thresholds.
pub fn estimate(samples: &[f32], sample_rate: u32) -> TunerResult<PitchEstimate> {
    let frame = AudioFrame::new(samples, sample_rate)?;
    Ok(PitchEstimator::default().estimate(&frame))
}

/// Root mean square of `samples`, 0 for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Level meter value in [0, 1] derived from the frame RMS.
pub fn loudness(samples: &[f32]) -> f32 {
    (rms(samples) * 5.0).min(1.0)
}

/// `c[k] = sum_j buf[j] * buf[j + k]` for every lag `k` in `0..buf.len()`.
fn autocorrelate(buf: &[f32]) -> Vec<f32> {
    let size = buf.len();
    (0..size)
        .map(|lag| {
            buf[..size - lag]
                .iter()
                .zip(&buf[lag..])
                .map(|(a, b)| a * b)
                .sum::<f32>()
        })
        .collect()
}

/// Lag of the highest correlation after the zero-lag lobe has fallen off.
///
/// `None` when the correlation never turns upward or the peak sits at lag 0.
fn find_period_peak(correlation: &[f32]) -> Option<usize> {
    let size = correlation.len();

    let mut dip = 0;
    while dip + 1 < size && correlation[dip] > correlation[dip + 1] {
        dip += 1;
    }
    if dip + 1 >= size {
        return None;
    }

    let mut peak = dip;
    for (lag, &value) in correlation.iter().enumerate().skip(dip + 1) {
        if value > correlation[peak] {
            peak = lag;
        }
    }

    (peak > 0).then_some(peak)
}

/// Sub-sample position of the peak at `peak` from a parabola through its
/// neighbours. Falls back to the integer lag at the buffer edges, on a flat
/// top, or when the vertex lands more than one sample away.
fn refine_peak(correlation: &[f32], peak: usize) -> f32 {
    if peak == 0 || peak + 1 >= correlation.len() {
        return peak as f32;
    }

    let x1 = correlation[peak - 1];
    let x2 = correlation[peak];
    let x3 = correlation[peak + 1];
    let a = (x1 + x3 - 2.0 * x2) / 2.0;
    let b = (x3 - x1) / 2.0;
    if a == 0.0 {
        return peak as f32;
    }

    let offset = -b / (2.0 * a);
    if offset.is_finite() && offset.abs() <= 1.0 {
        peak as f32 + offset
    } else {
        peak as f32
    }
}
