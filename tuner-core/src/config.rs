//! # Configuration Module
//!
//! User-adjustable tuner settings, persisted as JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{TunerError, TunerResult};
use crate::mapper::{MAX_FREQUENCY, MIN_FREQUENCY, NoteMapper};
use crate::pitch::{
    DEFAULT_CLIP_THRESHOLD, DEFAULT_FRAME_SIZE, DEFAULT_SILENCE_THRESHOLD, PitchEstimator,
};
use crate::synth::{DEFAULT_DURATION_SECS, ToneEnvelope};
use crate::tuning::{DEFAULT_REFERENCE_A4, NoteTable};

/// Smallest frame the capture layer will hand out.
pub const MIN_FRAME_SIZE: usize = 32;

/// Default number of new samples between two analysed frames.
pub const DEFAULT_HOP_SIZE: usize = 1024;

/// All tunable parameters of the tuner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Concert pitch of A4 in Hz.
    pub reference_a4: f32,
    /// RMS below which a frame counts as silence.
    pub silence_threshold: f32,
    /// Edge amplitude below which samples are trimmed before correlation.
    pub clip_threshold: f32,
    /// Samples per analysed frame (power of two).
    pub frame_size: usize,
    /// New samples between consecutive frames.
    pub hop_size: usize,
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// Length of reference tones in seconds.
    pub tone_duration_secs: f32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            reference_a4: DEFAULT_REFERENCE_A4,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            clip_threshold: DEFAULT_CLIP_THRESHOLD,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            min_frequency: MIN_FREQUENCY,
            max_frequency: MAX_FREQUENCY,
            tone_duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl TunerConfig {
    /// Checks every field against its accepted domain.
    pub fn validate(&self) -> TunerResult<()> {
        if !self.reference_a4.is_finite() || self.reference_a4 <= 0.0 {
            return Err(TunerError::invalid_config(format!(
                "reference_a4 must be positive, got {}",
                self.reference_a4
            )));
        }
        for (name, value) in [
            ("silence_threshold", self.silence_threshold),
            ("clip_threshold", self.clip_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(TunerError::invalid_config(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        if !self.frame_size.is_power_of_two() || self.frame_size < MIN_FRAME_SIZE {
            return Err(TunerError::invalid_config(format!(
                "frame_size must be a power of two >= {MIN_FRAME_SIZE}, got {}",
                self.frame_size
            )));
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(TunerError::invalid_config(format!(
                "hop_size must be in 1..={}, got {}",
                self.frame_size, self.hop_size
            )));
        }
        if !(self.min_frequency > 0.0 && self.min_frequency < self.max_frequency)
            || !self.max_frequency.is_finite()
        {
            return Err(TunerError::invalid_config(format!(
                "frequency range [{}, {}] is empty",
                self.min_frequency, self.max_frequency
            )));
        }
        if !self.tone_duration_secs.is_finite() || self.tone_duration_secs <= 0.0 {
            return Err(TunerError::invalid_config(format!(
                "tone_duration_secs must be positive, got {}",
                self.tone_duration_secs
            )));
        }
        Ok(())
    }

    pub fn estimator(&self) -> PitchEstimator {
        PitchEstimator {
            silence_threshold: self.silence_threshold,
            clip_threshold: self.clip_threshold,
        }
    }

    pub fn mapper(&self) -> NoteMapper {
        NoteMapper {
            min_frequency: self.min_frequency,
            max_frequency: self.max_frequency,
        }
    }

    pub fn note_table(&self) -> TunerResult<NoteTable> {
        NoteTable::new(self.reference_a4)
    }

    pub fn tone_envelope(&self) -> ToneEnvelope {
        ToneEnvelope::with_duration(self.tone_duration_secs)
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: TunerConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json_string = self.to_json()?;
        let mut file =
            File::create(path).with_context(|| format!("creating config {}", path.display()))?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = TunerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.frame_size, 4096);
        assert_eq!(config.note_table().unwrap().reference_a4(), 440.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: TunerConfig = serde_json::from_str(r#"{ "reference_a4": 432.0 }"#).unwrap();
        assert_eq!(config.reference_a4, 432.0);
        assert_eq!(config.hop_size, DEFAULT_HOP_SIZE);
        assert_eq!(config.mapper(), NoteMapper::default());
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            TunerConfig { reference_a4: 0.0, ..Default::default() },
            TunerConfig { silence_threshold: 0.0, ..Default::default() },
            TunerConfig { clip_threshold: 1.5, ..Default::default() },
            TunerConfig { frame_size: 3000, ..Default::default() },
            TunerConfig { frame_size: 16, hop_size: 8, ..Default::default() },
            TunerConfig { hop_size: 0, ..Default::default() },
            TunerConfig { hop_size: 8192, ..Default::default() },
            TunerConfig { min_frequency: 6000.0, ..Default::default() },
            TunerConfig { tone_duration_secs: -1.0, ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(TunerError::InvalidConfig(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn save_and_load() {
        let path = std::env::temp_dir().join(format!("tuner-config-{}.json", std::process::id()));
        let config = TunerConfig { reference_a4: 442.0, hop_size: 512, ..Default::default() };
        config.save(&path).unwrap();
        let loaded = TunerConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
