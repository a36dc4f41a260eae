// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for pitch estimation, note mapping under a
//! configurable reference pitch, and reference-tone synthesis. It is
//! headless and contains no presentation code.

pub mod acquisition;
pub mod audio;
pub mod config;
pub mod error;
pub mod mapper;
pub mod pitch;
pub mod synth;
pub mod tuning;

pub use acquisition::{AcquisitionLoop, Reading, analyze_frame};
pub use config::TunerConfig;
pub use error::{TunerError, TunerResult};
pub use mapper::{NoteEstimate, NoteMapper, TuningStatus, map_to_note};
pub use pitch::{AudioFrame, PitchEstimate, PitchEstimator};
pub use synth::{Tone, ToneEnvelope, synthesize};
pub use tuning::{Note, NoteTable, PitchClass};
