//! # Musical Tuning Module
//!
//! Equal-temperament note identities and the reference-pitch dependent note
//! table shared by the mapper and the tone synthesizer.
//!
//! ## Features
//! - 12-symbol chromatic pitch classes starting at C
//! - Note names with octave numbers ("A4", "C#3", "Bb2")
//! - Immutable note table built once per reference pitch (C0 to B8)
//! - Note to frequency conversion for any octave

use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;

use crate::error::{TunerError, TunerResult};

/// Number of semitones in an octave.
pub const SEMITONES_PER_OCTAVE: i32 = 12;

/// Octave number of the reference note A4.
pub const REFERENCE_OCTAVE: i32 = 4;

/// Semitone offset of A from C within one octave.
pub const SEMITONE_OFFSET_OF_A4_FROM_C0: i32 = 9;

/// Default concert pitch in Hz.
pub const DEFAULT_REFERENCE_A4: f32 = 440.0;

/// Reference pitches offered to the user. Any positive frequency is accepted
/// by [`NoteTable::new`]; this list is the usual selection.
pub const SUPPORTED_REFERENCE_PITCHES: [f32; 6] = [432.0, 435.0, 438.0, 440.0, 442.0, 444.0];

/// Octaves covered by [`NoteTable::entries`].
pub const TABLE_OCTAVES: std::ops::RangeInclusive<i32> = 0..=8;

/// One of the twelve chromatic pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting at C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Position in the chromatic sequence (C = 0, B = 11).
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Pitch class at `index`, wrapping modulo 12 (negative indices included).
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(SEMITONES_PER_OCTAVE) as usize]
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PitchClass {
    type Err = TunerError;

    /// Parses "C", "c#", "Db", "B♭" and friends.
    fn from_str(s: &str) -> TunerResult<Self> {
        let mut chars = s.trim().chars();
        let letter = chars
            .next()
            .ok_or_else(|| TunerError::invalid_input("empty pitch class"))?;
        let natural = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            other => {
                return Err(TunerError::invalid_input(format!(
                    "unknown pitch letter '{other}'"
                )));
            }
        };
        let accidental = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            other => {
                return Err(TunerError::invalid_input(format!(
                    "unknown accidental '{other}'"
                )));
            }
        };
        Ok(Self::from_index(natural + accidental))
    }
}

/// A concrete note: pitch class plus octave number (scientific pitch notation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note {
    pub octave: i32,
    pub pitch_class: PitchClass,
}

impl Note {
    pub fn new(pitch_class: PitchClass, octave: i32) -> Self {
        Self { octave, pitch_class }
    }

    /// Signed semitone distance from A4 (A4 = 0, A#4 = 1, A3 = -12).
    pub fn semitones_from_a4(self) -> i32 {
        (self.octave - REFERENCE_OCTAVE) * SEMITONES_PER_OCTAVE
            + (self.pitch_class.index() - SEMITONE_OFFSET_OF_A4_FROM_C0)
    }

    /// Inverse of [`Note::semitones_from_a4`].
    pub fn from_semitones_from_a4(semitones: i32) -> Self {
        let from_c0 =
            semitones + REFERENCE_OCTAVE * SEMITONES_PER_OCTAVE + SEMITONE_OFFSET_OF_A4_FROM_C0;
        Self {
            octave: from_c0.div_euclid(SEMITONES_PER_OCTAVE),
            pitch_class: PitchClass::from_index(from_c0),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

impl FromStr for Note {
    type Err = TunerError;

    fn from_str(s: &str) -> TunerResult<Self> {
        let s = s.trim();
        // The octave starts at the first digit or at a minus sign that follows the accidental.
        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_ascii_digit() || *c == '-')
            .map(|(i, _)| i)
            .ok_or_else(|| TunerError::invalid_input(format!("note '{s}' has no octave")))?;
        let (class, octave) = s.split_at(split);
        let pitch_class = class.parse()?;
        let octave = octave
            .parse::<i32>()
            .map_err(|_| TunerError::invalid_input(format!("bad octave in note '{s}'")))?;
        Ok(Self::new(pitch_class, octave))
    }
}

/// A note of the table with its equal-tempered frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEntry {
    pub note: Note,
    pub frequency: f32,
}

/// Equal-temperament note table for one reference pitch.
///
/// Built once whenever the reference pitch changes and never mutated
/// afterwards; the mapper and the synthesizer read it through shared
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteTable {
    reference_a4: f32,
    entries: Vec<NoteEntry>,
}

/// The A4 = 440 Hz table, computed on first use.
static STANDARD: Lazy<NoteTable> = Lazy::new(|| NoteTable::build(DEFAULT_REFERENCE_A4));

impl NoteTable {
    /// Builds the table for `reference_a4` Hz.
    ///
    /// # Errors
    /// `InvalidConfig` when the reference is not a positive finite number.
    pub fn new(reference_a4: f32) -> TunerResult<Self> {
        if !reference_a4.is_finite() || reference_a4 <= 0.0 {
            return Err(TunerError::invalid_config(format!(
                "reference A4 must be a positive frequency, got {reference_a4}"
            )));
        }
        Ok(Self::build(reference_a4))
    }

    /// Shared table for A4 = 440 Hz.
    pub fn standard() -> &'static NoteTable {
        &STANDARD
    }

    fn build(reference_a4: f32) -> Self {
        let entries = TABLE_OCTAVES
            .flat_map(|octave| {
                PitchClass::ALL.into_iter().map(move |pc| Note::new(pc, octave))
            })
            .map(|note| NoteEntry {
                note,
                frequency: equal_tempered(reference_a4, note.semitones_from_a4()),
            })
            .collect();
        Self { reference_a4, entries }
    }

    pub fn reference_a4(&self) -> f32 {
        self.reference_a4
    }

    /// Frequency of `note` under this table's reference, for any octave.
    pub fn frequency_of(&self, note: Note) -> f32 {
        equal_tempered(self.reference_a4, note.semitones_from_a4())
    }

    /// All tabulated notes, C0 through B8, in ascending frequency.
    pub fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }

    /// Tabulated frequency of `note`, or `None` outside C0..B8.
    pub fn lookup(&self, note: Note) -> Option<f32> {
        if !TABLE_OCTAVES.contains(&note.octave) {
            return None;
        }
        let index = (note.octave - TABLE_OCTAVES.start()) * SEMITONES_PER_OCTAVE
            + note.pitch_class.index();
        self.entries.get(index as usize).map(|e| e.frequency)
    }
}

fn equal_tempered(reference_a4: f32, semitones_from_a4: i32) -> f32 {
    (reference_a4 as f64 * 2f64.powf(semitones_from_a4 as f64 / 12.0)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_note_names() {
        assert_eq!("A4".parse::<Note>().unwrap(), Note::new(PitchClass::A, 4));
        assert_eq!("c#3".parse::<Note>().unwrap(), Note::new(PitchClass::CSharp, 3));
        assert_eq!("Bb2".parse::<Note>().unwrap(), Note::new(PitchClass::ASharp, 2));
        assert_eq!("E-1".parse::<Note>().unwrap(), Note::new(PitchClass::E, -1));
        assert!("H2".parse::<Note>().is_err());
        assert!("C".parse::<Note>().is_err());
        assert!("".parse::<Note>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for entry in NoteTable::standard().entries() {
            let name = entry.note.to_string();
            assert_eq!(name.parse::<Note>().unwrap(), entry.note);
        }
    }

    #[test]
    fn semitone_offsets() {
        assert_eq!(Note::new(PitchClass::A, 4).semitones_from_a4(), 0);
        assert_eq!(Note::new(PitchClass::C, 4).semitones_from_a4(), -9);
        assert_eq!(Note::new(PitchClass::C, 0).semitones_from_a4(), -57);
        for s in -70..70 {
            assert_eq!(Note::from_semitones_from_a4(s).semitones_from_a4(), s);
        }
    }

    #[test]
    fn table_is_strictly_increasing_and_wraps_at_c() {
        let table = NoteTable::new(442.0).unwrap();
        let entries = table.entries();
        assert_eq!(entries.len(), 108);
        for pair in entries.windows(2) {
            assert!(pair[1].frequency > pair[0].frequency);
            if pair[1].note.octave != pair[0].note.octave {
                assert_eq!(pair[0].note.pitch_class, PitchClass::B);
                assert_eq!(pair[1].note.pitch_class, PitchClass::C);
            }
        }
    }

    #[test]
    fn known_frequencies() {
        let table = NoteTable::standard();
        assert_eq!(table.frequency_of(Note::new(PitchClass::A, 4)), 440.0);
        assert!((table.frequency_of(Note::new(PitchClass::E, 2)) - 82.4069).abs() < 1e-3);
        assert!((table.frequency_of(Note::new(PitchClass::C, 4)) - 261.6256).abs() < 1e-3);
        assert_eq!(
            table.lookup(Note::new(PitchClass::G, 3)),
            Some(table.frequency_of(Note::new(PitchClass::G, 3)))
        );
        assert_eq!(table.lookup(Note::new(PitchClass::C, 9)), None);
    }

    #[test]
    fn rejects_bad_reference() {
        assert!(NoteTable::new(0.0).is_err());
        assert!(NoteTable::new(-440.0).is_err());
        assert!(NoteTable::new(f32::NAN).is_err());
        for reference in SUPPORTED_REFERENCE_PITCHES {
            let table = NoteTable::new(reference).unwrap();
            assert_eq!(table.frequency_of(Note::new(PitchClass::A, 4)), reference);
        }
    }
}
