//! # Note Mapper Module
//!
//! Turns a frequency estimate into the nearest equal-tempered note and a
//! signed cents deviation under a [`NoteTable`]'s reference pitch.

use crate::tuning::{Note, NoteTable, PitchClass, SEMITONES_PER_OCTAVE};

/// Lowest frequency the mapper will interpret, in Hz.
pub const MIN_FREQUENCY: f32 = 20.0;
/// Highest frequency the mapper will interpret, in Hz.
pub const MAX_FREQUENCY: f32 = 5000.0;

/// Cents deviation at or below which a note counts as in tune.
pub const IN_TUNE_CENTS: i32 = 5;
/// Cents deviation at or below which a note counts as close.
pub const CLOSE_CENTS: i32 = 15;

/// Nearest note to a measured frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEstimate {
    pub pitch_class: PitchClass,
    pub octave: i32,
    /// Signed deviation from the nearest note, in [-50, 49].
    pub cents: i32,
    /// The frequency that was mapped, in Hz.
    pub frequency: f32,
}

impl NoteEstimate {
    pub fn note(&self) -> Note {
        Note::new(self.pitch_class, self.octave)
    }

    pub fn status(&self) -> TuningStatus {
        TuningStatus::from_cents(self.cents as f32)
    }
}

/// Coarse verdict on a cents deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningStatus {
    InTune,
    Close,
    Sharp,
    Flat,
}

impl TuningStatus {
    pub fn from_cents(cents: f32) -> Self {
        let abs = cents.abs();
        if abs <= IN_TUNE_CENTS as f32 {
            TuningStatus::InTune
        } else if abs <= CLOSE_CENTS as f32 {
            TuningStatus::Close
        } else if cents > 0.0 {
            TuningStatus::Sharp
        } else {
            TuningStatus::Flat
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TuningStatus::InTune => "In Tune!",
            TuningStatus::Close => "Almost",
            TuningStatus::Sharp => "Too Sharp",
            TuningStatus::Flat => "Too Flat",
        }
    }
}

/// Frequency to note mapping restricted to an interpretable range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteMapper {
    pub min_frequency: f32,
    pub max_frequency: f32,
}

impl Default for NoteMapper {
    fn default() -> Self {
        Self {
            min_frequency: MIN_FREQUENCY,
            max_frequency: MAX_FREQUENCY,
        }
    }
}

impl NoteMapper {
    pub fn accepts(&self, frequency: f32) -> bool {
        frequency.is_finite() && frequency >= self.min_frequency && frequency <= self.max_frequency
    }

    /// Maps `frequency` to the nearest note of `table`.
    ///
    /// Returns `None` when the frequency falls outside the mapper's range.
    pub fn map(&self, frequency: f32, table: &NoteTable) -> Option<NoteEstimate> {
        if !self.accepts(frequency) {
            return None;
        }

        let semitones = SEMITONES_PER_OCTAVE as f64
            * (frequency as f64 / table.reference_a4() as f64).log2();
        // Half-up rounding keeps the fractional part in [-0.5, 0.5).
        let mut nearest = (semitones + 0.5).floor();
        let mut cents = ((semitones - nearest) * 100.0).round() as i32;
        if cents >= 50 {
            nearest += 1.0;
            cents -= 100;
        }

        let note = Note::from_semitones_from_a4(nearest as i32);
        Some(NoteEstimate {
            pitch_class: note.pitch_class,
            octave: note.octave,
            cents,
            frequency,
        })
    }

    /// Deviation of `frequency` from a fixed `target` note, in cents.
    ///
    /// Used when the player tunes towards a chosen string instead of the
    /// nearest note. Returns `None` outside the mapper's range.
    pub fn deviation_from(&self, frequency: f32, target: Note, table: &NoteTable) -> Option<f32> {
        if !self.accepts(frequency) {
            return None;
        }
        Some(cents_between(frequency, table.frequency_of(target)))
    }
}

/// Maps `frequency` with the default [20 Hz, 5000 Hz] range.
pub fn map_to_note(frequency: f32, table: &NoteTable) -> Option<NoteEstimate> {
    NoteMapper::default().map(frequency, table)
}

/// Distance from `target` to `frequency` in cents (positive = sharp).
pub fn cents_between(frequency: f32, target: f32) -> f32 {
    1200.0 * (frequency / target).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        let table = NoteTable::standard();
        assert!(map_to_note(19.9, table).is_none());
        assert!(map_to_note(5000.1, table).is_none());
        assert!(map_to_note(f32::NAN, table).is_none());
        assert!(map_to_note(f32::INFINITY, table).is_none());
        assert!(map_to_note(20.0, table).is_some());
        assert!(map_to_note(5000.0, table).is_some());
    }

    #[test]
    fn cents_never_reach_fifty() {
        let table = NoteTable::standard();
        // Just below the quarter-tone between A4 and A#4.
        let f = 440.0 * 2f32.powf(0.497 / 12.0);
        let estimate = map_to_note(f, table).unwrap();
        assert_eq!(estimate.pitch_class, PitchClass::ASharp);
        assert_eq!(estimate.cents, -50);

        let mut f = 20.0;
        while f < 5000.0 {
            let estimate = map_to_note(f, table).unwrap();
            assert!((-50..50).contains(&estimate.cents), "{f} -> {}", estimate.cents);
            f *= 1.0007;
        }
    }

    #[test]
    fn low_notes_use_floor_division() {
        let table = NoteTable::standard();
        let estimate = map_to_note(27.5, table).unwrap();
        assert_eq!(estimate.note(), Note::new(PitchClass::A, 0));
        let estimate = map_to_note(32.7032, table).unwrap();
        assert_eq!(estimate.note(), Note::new(PitchClass::C, 1));
        let estimate = map_to_note(30.8677, table).unwrap();
        assert_eq!(estimate.note(), Note::new(PitchClass::B, 0));
    }

    #[test]
    fn deviation_from_target() {
        let table = NoteTable::standard();
        let mapper = NoteMapper::default();
        let e2 = Note::new(PitchClass::E, 2);
        let cents = mapper.deviation_from(82.4069, e2, table).unwrap();
        assert!(cents.abs() < 0.1);
        // A whole tone flat of the target is reported as such, not re-snapped.
        let cents = mapper.deviation_from(73.4162, e2, table).unwrap();
        assert!((cents + 200.0).abs() < 0.1);
        assert!(mapper.deviation_from(10.0, e2, table).is_none());
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(TuningStatus::from_cents(0.0), TuningStatus::InTune);
        assert_eq!(TuningStatus::from_cents(-5.0), TuningStatus::InTune);
        assert_eq!(TuningStatus::from_cents(12.0), TuningStatus::Close);
        assert_eq!(TuningStatus::from_cents(16.0), TuningStatus::Sharp);
        assert_eq!(TuningStatus::from_cents(-30.0), TuningStatus::Flat);
        assert_eq!(TuningStatus::Flat.label(), "Too Flat");
    }
}
