// The score grid: pitch, onset and duration for every voice and note.
//
// Voice 0 is the cantus firmus, voices 1..=num_parts the counterpoint. Notes
// are addressed by 1-based position within their voice. Time is measured in
// eighth notes (8 per cantus bar), so the final note of every voice starts at
// `total_time = (cantus_len - 1) * 8`.
//
// Pitches are stored relative to `base_pitch`, the pitch class of the
// cantus's final note. That makes the pitch class of any stored pitch its
// position relative to the modal final, which is what mode.rs indexes by.
//
// The grid is sized once, before the search starts: the cantus is written by
// `Grid::new`, each counterpoint voice's rhythm and first pitch by
// `add_voice`. After that only pitches change. The search engine owns the one
// live grid and overwrites pitches in place as it backtracks; see search.rs
// for that contract.

use crate::error::{CounterpointError, Result};
use serde::{Deserialize, Serialize};

/// Note positions available per voice (positions are 1-based).
pub const MAX_NOTES: usize = 127;
/// Voices available, cantus included.
pub const MAX_VOICES: usize = 6;

pub const WHOLE_NOTE: i32 = 8;
pub const HALF_NOTE: i32 = 4;
pub const QUARTER_NOTE: i32 = 2;
pub const EIGHTH_NOTE: i32 = 1;

/// One note of one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Pitch relative to the grid's base pitch.
    pub pitch: i32,
    /// Onset in eighth notes from the start of the piece.
    pub onset: i32,
    /// Duration in eighth notes.
    pub dur: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    /// Pitch class (0-11) of the cantus's final; all stored pitches are
    /// relative to it.
    pub base_pitch: i32,
    /// Onset of every voice's final note.
    pub total_time: i32,
    /// `voices[v][n - 1]` is note `n` of voice `v`.
    voices: Vec<Vec<Note>>,
}

impl Grid {
    /// Lay out the cantus firmus (absolute pitches, one whole note each).
    pub fn new(cantus: &[i32]) -> Result<Self> {
        if cantus.len() > MAX_NOTES {
            return Err(CounterpointError::CapacityExceeded {
                what: "cantus firmus notes",
                requested: cantus.len(),
                limit: MAX_NOTES,
            });
        }
        let Some(&last) = cantus.last() else {
            return Err(CounterpointError::CantusTooShort { len: 0 });
        };
        if cantus.len() < 2 {
            return Err(CounterpointError::CantusTooShort { len: cantus.len() });
        }
        let base_pitch = last.rem_euclid(12);
        let notes = cantus
            .iter()
            .enumerate()
            .map(|(i, &p)| Note {
                pitch: p - base_pitch,
                onset: i as i32 * WHOLE_NOTE,
                dur: WHOLE_NOTE,
            })
            .collect();

        let mut voices = Vec::with_capacity(MAX_VOICES);
        voices.push(notes);
        Ok(Grid {
            base_pitch,
            total_time: (cantus.len() as i32 - 1) * WHOLE_NOTE,
            voices,
        })
    }

    /// Add a counterpoint voice with the given rhythm and absolute starting
    /// pitch. Pitches after the first start equal to the first and are
    /// filled in by the search. Returns the new voice's index.
    pub fn add_voice(&mut self, durations: &[i32], start_pitch: i32) -> Result<usize> {
        if self.voices.len() >= MAX_VOICES {
            return Err(CounterpointError::CapacityExceeded {
                what: "voices",
                requested: self.voices.len() + 1,
                limit: MAX_VOICES,
            });
        }
        if durations.len() > MAX_NOTES {
            return Err(CounterpointError::CapacityExceeded {
                what: "counterpoint notes per voice",
                requested: durations.len(),
                limit: MAX_NOTES,
            });
        }
        debug_assert_eq!(
            durations[..durations.len().saturating_sub(1)].iter().sum::<i32>(),
            self.total_time,
            "rhythm must end on the cantus's final bar"
        );

        let first = start_pitch - self.base_pitch;
        let mut onset = 0;
        let notes = durations
            .iter()
            .map(|&dur| {
                let note = Note { pitch: first, onset, dur };
                onset += dur;
                note
            })
            .collect();
        self.voices.push(notes);
        Ok(self.voices.len() - 1)
    }

    /// Counterpoint voices in the grid (the cantus not counted).
    pub fn num_parts(&self) -> usize {
        self.voices.len() - 1
    }

    pub fn total_notes(&self, v: usize) -> usize {
        self.voices[v].len()
    }

    pub fn notes(&self, v: usize) -> &[Note] {
        &self.voices[v]
    }

    pub fn pitch(&self, n: usize, v: usize) -> i32 {
        self.voices[v][n - 1].pitch
    }

    pub fn set_pitch(&mut self, n: usize, v: usize, pitch: i32) {
        self.voices[v][n - 1].pitch = pitch;
    }

    pub fn onset(&self, n: usize, v: usize) -> i32 {
        self.voices[v][n - 1].onset
    }

    pub fn dur(&self, n: usize, v: usize) -> i32 {
        self.voices[v][n - 1].dur
    }

    /// Position of the eighth-note onset within its bar (0-7).
    pub fn beat8(&self, n: usize, v: usize) -> i32 {
        self.onset(n, v) % 8
    }

    pub fn is_down_beat(&self, n: usize, v: usize) -> bool {
        self.beat8(n, v) == 0
    }

    pub fn is_last(&self, n: usize, v: usize) -> bool {
        n == self.total_notes(v)
    }

    pub fn is_next_to_last(&self, n: usize, v: usize) -> bool {
        n + 1 == self.total_notes(v)
    }

    /// Index of voice `v`'s note sounding at `time`. Past the end of the
    /// voice this is its final note.
    pub fn index_at(&self, time: i32, v: usize) -> usize {
        let notes = &self.voices[v];
        notes[..notes.len() - 1]
            .iter()
            .position(|note| note.onset <= time && note.onset + note.dur > time)
            .map_or(notes.len(), |i| i + 1)
    }

    /// Pitch of voice `other` sounding at the onset of note `n` of voice `v`.
    pub fn other(&self, n: usize, v: usize, other: usize) -> i32 {
        let time = self.onset(n, v);
        self.pitch(self.index_at(time, other), other)
    }

    /// Cantus pitch sounding at the onset of note `n` of voice `v`.
    pub fn cantus(&self, n: usize, v: usize) -> i32 {
        let bar = (self.onset(n, v) / WHOLE_NOTE) as usize;
        self.pitch(bar + 1, 0)
    }

    /// Lowest pitch among the cantus and voices below `v`, at the onset of
    /// note `n` of `v`.
    pub fn bass(&self, n: usize, v: usize) -> i32 {
        (1..v).fold(self.cantus(n, v), |low, j| low.min(self.other(n, v, j)))
    }

    /// Does any voice below `v` sound pitch class `pc` at note `n`'s onset?
    pub fn doubled(&self, pc: i32, n: usize, v: usize) -> bool {
        (0..v).any(|other| self.other(n, v, other).rem_euclid(12) == pc)
    }

    /// How many earlier notes of `v` (before `n`) have pitch `cp`.
    pub fn pitch_repeats(&self, n: usize, cp: i32, v: usize) -> usize {
        self.voices[v][..n - 1].iter().filter(|note| note.pitch == cp).count()
    }

    /// Span between lowest and highest pitch of `v` through note `n`, with
    /// `cp` standing in for note `n`.
    pub fn total_range(&self, n: usize, cp: i32, v: usize) -> i32 {
        let (low, high) = self.voices[v][..n - 1]
            .iter()
            .fold((cp, cp), |(lo, hi), note| (lo.min(note.pitch), hi.max(note.pitch)));
        high - low
    }

    /// Absolute pitches of voice `v`.
    pub fn absolute_pitches(&self, v: usize) -> Vec<i32> {
        self.voices[v].iter().map(|n| n.pitch + self.base_pitch).collect()
    }
}

impl Grid {
    /// Compact text rendering of every voice, one row each, for logging.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (v, notes) in self.voices.iter().enumerate() {
            let label = if v == 0 { "cantus".to_string() } else { format!("voice {v}") };
            out.push_str(&format!("{label:>8}: "));
            for note in notes {
                if note.onset > 0 && note.onset % WHOLE_NOTE == 0 {
                    out.push_str("| ");
                }
                out.push_str(&pitch_name(note.pitch + self.base_pitch));
                for _ in 1..note.dur.min(WHOLE_NOTE) {
                    out.push('-');
                }
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }
}

/// Note name with octave for an absolute pitch (60 = C4).
pub fn pitch_name(pitch: i32) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
    ];
    let octave = pitch.div_euclid(12) - 1;
    format!("{}{}", NAMES[pitch.rem_euclid(12) as usize], octave)
}

/// Melodic and two-voice motion helpers. Intervals are signed semitones.
pub mod interval {
    pub const UNISON: i32 = 0;
    pub const MINOR_SECOND: i32 = 1;
    pub const MAJOR_SECOND: i32 = 2;
    pub const MINOR_THIRD: i32 = 3;
    pub const MAJOR_THIRD: i32 = 4;
    pub const FOURTH: i32 = 5;
    pub const TRITONE: i32 = 6;
    pub const FIFTH: i32 = 7;
    pub const MINOR_SIXTH: i32 = 8;
    pub const MAJOR_SIXTH: i32 = 9;
    pub const MINOR_SEVENTH: i32 = 10;
    pub const MAJOR_SEVENTH: i32 = 11;
    pub const OCTAVE: i32 = 12;

    /// Octave-reduced size of the distance between two pitches.
    pub fn class(a: i32, b: i32) -> i32 {
        (b - a).abs() % 12
    }

    pub fn is_step(iv: i32) -> bool {
        matches!(iv.abs(), MINOR_SECOND | MAJOR_SECOND)
    }

    pub fn is_skip(iv: i32) -> bool {
        iv.abs() > MAJOR_SECOND
    }

    pub fn is_third(iv: i32) -> bool {
        matches!(iv, MINOR_THIRD | MAJOR_THIRD)
    }

    pub fn is_seventh(iv: i32) -> bool {
        matches!(iv, MINOR_SEVENTH | MAJOR_SEVENTH)
    }

    /// Any nonzero multiple of an octave.
    pub fn is_octave(iv: i32) -> bool {
        iv != UNISON && iv.abs() % 12 == 0
    }

    /// A third compounded by at least one octave.
    pub fn is_tenth(iv: i32) -> bool {
        iv.abs() > 14 && is_third(iv.abs() % 12)
    }

    /// Melodic intervals that are never sung: tritone, major sixth,
    /// sevenths, anything past the octave, and a descending minor sixth.
    pub fn is_bad_melody(iv: i32) -> bool {
        let size = iv.abs();
        size > OCTAVE
            || matches!(size, TRITONE | MAJOR_SIXTH | MINOR_SEVENTH | MAJOR_SEVENTH)
            || iv == -MINOR_SIXTH
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Motion {
        Direct,
        Contrary,
        Oblique,
        Stationary,
    }

    /// Relative motion of two voices: one moving `a1 -> a2`, the other
    /// `b1 -> b2`.
    pub fn motion(a1: i32, a2: i32, b1: i32, b2: i32) -> Motion {
        match (a1 == a2, b1 == b2) {
            (true, true) => Motion::Stationary,
            (true, false) | (false, true) => Motion::Oblique,
            _ if (a2 - a1) * (b2 - b1) > 0 => Motion::Direct,
            _ => Motion::Contrary,
        }
    }

    /// Similar motion arriving on a unison, fifth or octave.
    pub fn direct_to_perfect(a1: i32, a2: i32, b1: i32, b2: i32) -> bool {
        matches!(class(a2, b2), UNISON | FIFTH) && motion(a1, a2, b1, b2) == Motion::Direct
    }

    /// Two skips in a row going the same way.
    pub fn consecutive_skips_same_direction(p1: i32, p2: i32, p3: i32) -> bool {
        ((p1 > p2 && p2 > p3) || (p1 < p2 && p2 < p3)) && is_skip(p2 - p1) && is_skip(p3 - p2)
    }

    /// Melodic size in steps (unison 0, second 2, third 3 ...), signed.
    /// Used to tally interval usage; sizes with no name count as unison.
    pub fn size(iv: i32) -> i32 {
        let steps = match iv.abs() {
            MINOR_SECOND | MAJOR_SECOND => 2,
            MINOR_THIRD | MAJOR_THIRD => 3,
            FOURTH => 4,
            FIFTH => 5,
            MINOR_SIXTH => 6,
            OCTAVE => 8,
            _ => 0,
        };
        if iv > 0 { steps } else { -steps }
    }
}
