//! # Musical Tuning Module
//!
//! Decides where a measured frequency sits relative to the selected string.
//!
//! ## Features
//! - The six open-string pitches of a standard-tuned guitar
//! - Priority-ordered mapping from selector inputs to target pitches
//! - Closed-band Flat / InTune / Sharp classification
//! - Cent deviation and nearest-note lookup for diagnostics

use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;

use crate::config::{
    SELECT_A2_PIN, SELECT_B3_PIN, SELECT_D3_PIN, SELECT_E2_PIN, SELECT_E4_PIN, SELECT_G3_PIN,
};
use crate::hal::{DigitalInputs, PinId};

/// An open-string target pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pitch {
    E4,
    B3,
    G3,
    D3,
    A2,
    E2,
}

impl Pitch {
    /// All pitches, highest string first.
    pub const ALL: [Pitch; 6] = [Pitch::E4, Pitch::B3, Pitch::G3, Pitch::D3, Pitch::A2, Pitch::E2];

    /// Target frequency in Hz.
    pub fn frequency(self) -> f32 {
        match self {
            Pitch::E4 => 329.63,
            Pitch::B3 => 246.94,
            Pitch::G3 => 196.00,
            Pitch::D3 => 146.83,
            Pitch::A2 => 110.00,
            Pitch::E2 => 82.41,
        }
    }

    /// Scientific pitch name, e.g. "A2".
    pub fn name(self) -> &'static str {
        match self {
            Pitch::E4 => "E4",
            Pitch::B3 => "B3",
            Pitch::G3 => "G3",
            Pitch::D3 => "D3",
            Pitch::A2 => "A2",
            Pitch::E2 => "E2",
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mapping from selector input to pitch, in priority order.
///
/// When several inputs are active at once the first entry wins.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchTable {
    entries: Vec<(PinId, Pitch)>,
}

/// The standard wiring: one switch per string, E4 on the highest priority.
pub static STANDARD_TABLE: Lazy<PitchTable> = Lazy::new(|| {
    PitchTable::new(vec![
        (SELECT_E4_PIN, Pitch::E4),
        (SELECT_B3_PIN, Pitch::B3),
        (SELECT_G3_PIN, Pitch::G3),
        (SELECT_D3_PIN, Pitch::D3),
        (SELECT_A2_PIN, Pitch::A2),
        (SELECT_E2_PIN, Pitch::E2),
    ])
});

impl PitchTable {
    /// Creates a table from selector wiring.
    ///
    /// # Arguments
    /// * `entries` - `(input pin, pitch)` pairs, highest priority first
    pub fn new(entries: Vec<(PinId, Pitch)>) -> Self {
        Self { entries }
    }

    /// The `(input pin, pitch)` pairs in priority order.
    pub fn entries(&self) -> &[(PinId, Pitch)] {
        &self.entries
    }

    /// Polls every input in priority order and returns the first active pitch.
    pub fn first_active<I: DigitalInputs + ?Sized>(&self, inputs: &mut I) -> Option<Pitch> {
        self.entries
            .iter()
            .find(|(pin, _)| inputs.read_pin(*pin))
            .map(|(_, pitch)| *pitch)
    }
}

/// Holds the current target pitch across cycles.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    table: PitchTable,
    current: Pitch,
}

impl TargetSelector {
    /// `initial` is the target until some input is seen active.
    pub fn new(table: PitchTable, initial: Pitch) -> Self {
        Self { table, current: initial }
    }

    /// Reads the selector inputs and updates the target.
    ///
    /// With no input active the previous target is kept.
    pub fn select<I: DigitalInputs + ?Sized>(&mut self, inputs: &mut I) -> Pitch {
        if let Some(pitch) = self.table.first_active(inputs) {
            self.current = pitch;
        }
        self.current
    }

    /// The target used by the most recent cycle, or the initial one.
    pub fn current(&self) -> Pitch {
        self.current
    }
}

/// Where the measured frequency sits relative to the target band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorState {
    Flat,
    InTune,
    Sharp,
}

/// Classifies a measured frequency against the tolerance band of a target.
///
/// The band `[target - gap, target + gap]` is closed: a measurement exactly
/// on either edge is in tune.
///
/// # Arguments
/// * `measured` - Dominant frequency of the last buffer in Hz
/// * `target` - Target frequency in Hz
/// * `gap` - Half-width of the in-tune band in Hz
///
/// # Returns
/// * `Flat` below the band, `Sharp` above it, `InTune` inside it
pub fn classify(measured: f32, target: f32, gap: f32) -> IndicatorState {
    if measured < target - gap {
        IndicatorState::Flat
    } else if measured > target + gap {
        IndicatorState::Sharp
    } else {
        IndicatorState::InTune
    }
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents make a semitone. Positive values are sharp, negative flat.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// A note of the equal-tempered scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    /// Note name (e.g., "A2", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

/// Equal-tempered notes from C1 to B7 (A4 = 440 Hz), covering everything
/// below the 1 kHz Nyquist limit of the sampler.
static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    const NOTE_NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    // MIDI 24 is C1, MIDI 69 is A4.
    (24..108)
        .map(|midi: i32| Note {
            name: format!("{}{}", NOTE_NAMES[(midi % 12) as usize], midi / 12 - 1),
            frequency: 440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0),
        })
        .collect()
});

/// Finds the equal-tempered note closest to a frequency, for diagnostics.
///
/// # Arguments
/// * `freq` - Frequency in Hz
///
/// # Returns
/// * `Some(note)` - The note with the smallest cent deviation
/// * `None` - `freq` is non-positive or not finite
pub fn nearest_note(freq: f32) -> Option<&'static Note> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    NOTES.iter().min_by(|a, b| {
        let diff_a = calculate_cents_deviation(freq, a.frequency).abs();
        let diff_b = calculate_cents_deviation(freq, b.frequency).abs();
        diff_a.total_cmp(&diff_b)
    })
}
