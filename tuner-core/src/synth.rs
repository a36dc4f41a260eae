//! # Tone Synthesizer Module
//!
//! Reference tones for tuning by ear: a sine at the target frequency whose
//! amplitude decays exponentially so playback ends without a click.

use std::f64::consts::TAU;

use crate::error::{TunerError, TunerResult};

/// Starting amplitude of a reference tone.
pub const DEFAULT_GAIN: f32 = 0.3;
/// Amplitude the envelope reaches at the end of the tone.
pub const DEFAULT_FLOOR: f32 = 0.001;
/// Default tone length in seconds.
pub const DEFAULT_DURATION_SECS: f32 = 1.5;

/// Exponential decay from `gain` to `floor` over `duration_secs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneEnvelope {
    pub gain: f32,
    pub floor: f32,
    pub duration_secs: f32,
}

impl Default for ToneEnvelope {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            floor: DEFAULT_FLOOR,
            duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl ToneEnvelope {
    pub fn with_duration(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            ..Self::default()
        }
    }

    fn validate(&self) -> TunerResult<()> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(TunerError::invalid_input(format!(
                "tone duration must be positive, got {}",
                self.duration_secs
            )));
        }
        if !(self.gain > 0.0 && self.gain <= 1.0) || !(self.floor > 0.0 && self.floor < self.gain) {
            return Err(TunerError::invalid_input(format!(
                "envelope needs 0 < floor < gain <= 1, got gain {} floor {}",
                self.gain, self.floor
            )));
        }
        Ok(())
    }

    /// Amplitude `t` seconds into the tone.
    pub fn amplitude_at(&self, t: f32) -> f32 {
        let progress = (t / self.duration_secs).clamp(0.0, 1.0);
        self.gain * (self.floor / self.gain).powf(progress)
    }
}

/// A finite stream of mono samples for one reference tone.
#[derive(Debug, Clone)]
pub struct Tone {
    frequency: f32,
    sample_rate: u32,
    envelope: ToneEnvelope,
    position: usize,
    total_samples: usize,
    // Per-sample multiplier of the exponential envelope.
    decay: f64,
    amplitude: f64,
}

impl Tone {
    /// # Errors
    /// `InvalidInput` for a non-positive frequency, sample rate or duration.
    pub fn new(frequency: f32, sample_rate: u32, envelope: ToneEnvelope) -> TunerResult<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(TunerError::invalid_input(format!(
                "tone frequency must be positive, got {frequency}"
            )));
        }
        if sample_rate == 0 {
            return Err(TunerError::invalid_input("sample rate must be positive"));
        }
        envelope.validate()?;

        let total_samples = (envelope.duration_secs as f64 * sample_rate as f64).round() as usize;
        let steps = total_samples.saturating_sub(1).max(1) as f64;
        let decay = (envelope.floor as f64 / envelope.gain as f64).powf(1.0 / steps);

        Ok(Self {
            frequency,
            sample_rate,
            envelope,
            position: 0,
            total_samples,
            decay,
            amplitude: envelope.gain as f64,
        })
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn envelope(&self) -> ToneEnvelope {
        self.envelope
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.is_finished() {
            return None;
        }
        let t = self.position as f64 / self.sample_rate as f64;
        let sample = self.amplitude * (TAU * self.frequency as f64 * t).sin();
        self.amplitude *= self.decay;
        self.position += 1;
        Some(sample as f32)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_samples - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Tone {}

/// Renders a full reference tone with the default envelope.
pub fn synthesize(frequency: f32, duration_secs: f32, sample_rate: u32) -> TunerResult<Vec<f32>> {
    Ok(Tone::new(frequency, sample_rate, ToneEnvelope::with_duration(duration_secs))?.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_and_envelope() {
        let samples = synthesize(440.0, 1.5, 48000).unwrap();
        assert_eq!(samples.len(), 72000);

        let head = samples[..200].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((head - 0.3).abs() < 0.01, "head peak {head}");

        let tail = samples[samples.len() - 200..]
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(tail <= 0.0011, "tail peak {tail}");
        assert!(samples.iter().all(|s| s.abs() <= 0.3 + 1e-6));
    }

    #[test]
    fn envelope_curve() {
        let env = ToneEnvelope::default();
        assert!((env.amplitude_at(0.0) - 0.3).abs() < 1e-6);
        assert!((env.amplitude_at(1.5) - 0.001).abs() < 1e-6);
        assert!((env.amplitude_at(0.75) - (0.3f32 * 0.001).sqrt()).abs() < 1e-5);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(synthesize(0.0, 1.5, 44100).is_err());
        assert!(synthesize(-1.0, 1.5, 44100).is_err());
        assert!(synthesize(440.0, 0.0, 44100).is_err());
        assert!(synthesize(440.0, f32::NAN, 44100).is_err());
        assert!(synthesize(440.0, 1.5, 0).is_err());
    }

    #[test]
    fn iterator_is_exact() {
        let mut tone = Tone::new(220.0, 8000, ToneEnvelope::with_duration(0.01)).unwrap();
        assert_eq!(tone.len(), 80);
        tone.by_ref().take(79).for_each(drop);
        assert!(!tone.is_finished());
        assert!(tone.next().is_some());
        assert!(tone.is_finished());
        assert_eq!(tone.next(), None);
    }
}
