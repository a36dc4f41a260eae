//! Single-line terminal rendering of tuner readings.

use ansi_term::Color::{Green, Red, Yellow};
use ansi_term::Style;
use tuner_core::{NoteEstimate, Reading, TuningStatus};

/// Width of the loudness bar in characters.
const METER_WIDTH: usize = 10;

fn status_style(status: TuningStatus) -> Style {
    match status {
        TuningStatus::InTune => Green.bold(),
        TuningStatus::Close => Yellow.normal(),
        TuningStatus::Sharp | TuningStatus::Flat => Red.normal(),
    }
}

pub fn meter(loudness: f32) -> String {
    let filled = ((loudness.clamp(0.0, 1.0) * METER_WIDTH as f32).round() as usize).min(METER_WIDTH);
    format!("{}{}", "#".repeat(filled), ".".repeat(METER_WIDTH - filled))
}

/// Nearest-note view: "A4   +3 cents  441.2 Hz  In Tune!".
pub fn nearest_line(reading: &Reading) -> String {
    match reading.note {
        Some(estimate) => format!("[{}] {}", meter(reading.loudness), describe(&estimate)),
        None => format!("[{}] --", meter(reading.loudness)),
    }
}

pub fn describe(estimate: &NoteEstimate) -> String {
    let status = estimate.status();
    format!(
        "{:<4} {:>+4} cents {:>8.2} Hz  {}",
        estimate.note().to_string(),
        estimate.cents,
        estimate.frequency,
        status_style(status).paint(status.label())
    )
}

/// Fixed-target view: deviation from the chosen string's note.
pub fn target_line(reading: &Reading, target: &str, cents: Option<f32>) -> String {
    match (reading.pitch.frequency(), cents) {
        (Some(frequency), Some(cents)) => {
            let status = TuningStatus::from_cents(cents);
            format!(
                "[{}] {:<4} {:>+7.1} cents {:>8.2} Hz  {}",
                meter(reading.loudness),
                target,
                cents,
                frequency,
                status_style(status).paint(status.label())
            )
        }
        _ => format!("[{}] {:<4} --", meter(reading.loudness), target),
    }
}
