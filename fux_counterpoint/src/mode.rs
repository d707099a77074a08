// Modal scale model: diatonic membership and interval classification.
//
// All pitches inside the search are stored relative to the final of the
// cantus (pitch class 0 = final), so a mode is just a fixed 12-entry
// membership table indexed by that relative pitch class. Interval
// classification works the same way on octave-reduced vertical intervals.
//
// Pure tables, no state. Used by rules.rs for mode conformance and
// dissonance checks, and by results.rs when raising leading tones.

use serde::{Deserialize, Serialize};

/// The seven diatonic modes, each defined by its interval pattern from the final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// C D E F G A B
    Ionian,
    /// D E F G A B C (minor with raised 6th)
    Dorian,
    /// E F G A B C D (half-step from 1 to 2)
    Phrygian,
    /// F G A B C D E (raised 4th)
    Lydian,
    /// G A B C D E F (major with lowered 7th)
    Mixolydian,
    /// A B C D E F G (natural minor)
    Aeolian,
    /// B C D E F G A (diminished 5th above the final)
    Locrian,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Ionian,
        Mode::Dorian,
        Mode::Phrygian,
        Mode::Lydian,
        Mode::Mixolydian,
        Mode::Aeolian,
        Mode::Locrian,
    ];

    /// Semitones from the final to scale degrees 1-7.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Mode::Ionian => [0, 2, 4, 5, 7, 9, 11],
            Mode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Mode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Mode::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Mode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Mode::Aeolian => [0, 2, 3, 5, 7, 8, 10],
            Mode::Locrian => [0, 1, 3, 5, 6, 8, 10],
        }
    }

    /// Membership table indexed by pitch class relative to the final.
    pub fn pitch_classes(self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for &interval in &self.intervals() {
            pcs[interval as usize] = true;
        }
        pcs
    }

    /// Is this (final-relative) pitch diatonic in the mode? Any pitch is
    /// reduced mod 12 first, negatives included.
    pub fn contains(self, pitch: i32) -> bool {
        self.pitch_classes()[pitch.rem_euclid(12) as usize]
    }

    /// The pitch class a cadence raises to form a leading tone: 11 in every
    /// mode, except Phrygian whose cadence leans on the (diatonic) 10.
    pub fn is_leading_tone(self, pitch_class: i32) -> bool {
        pitch_class == 11 || (pitch_class == 10 && self == Mode::Phrygian)
    }
}

/// Consonance class of an octave-reduced vertical interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalKind {
    /// Unison, fifth, octave.
    Perfect,
    /// Thirds and sixths.
    Imperfect,
    /// Seconds, fourth, tritone, sevenths.
    Dissonant,
}

impl IntervalKind {
    const TABLE: [IntervalKind; 13] = [
        IntervalKind::Perfect,   // unison
        IntervalKind::Dissonant, // minor second
        IntervalKind::Dissonant, // major second
        IntervalKind::Imperfect, // minor third
        IntervalKind::Imperfect, // major third
        IntervalKind::Dissonant, // fourth
        IntervalKind::Dissonant, // tritone
        IntervalKind::Perfect,   // fifth
        IntervalKind::Imperfect, // minor sixth
        IntervalKind::Imperfect, // major sixth
        IntervalKind::Dissonant, // minor seventh
        IntervalKind::Dissonant, // major seventh
        IntervalKind::Perfect,   // octave
    ];

    /// Classify an interval class 0-12. Anything outside that range is
    /// reduced mod 12 first.
    pub fn of(interval_class: i32) -> IntervalKind {
        let ic = if (0..=12).contains(&interval_class) {
            interval_class
        } else {
            interval_class.rem_euclid(12)
        };
        Self::TABLE[ic as usize]
    }
}

pub fn is_perfect(interval_class: i32) -> bool {
    IntervalKind::of(interval_class) == IntervalKind::Perfect
}

pub fn is_imperfect(interval_class: i32) -> bool {
    IntervalKind::of(interval_class) == IntervalKind::Imperfect
}

pub fn is_dissonant(interval_class: i32) -> bool {
    IntervalKind::of(interval_class) == IntervalKind::Dissonant
}
