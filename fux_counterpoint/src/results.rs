// Completed solutions: leading-tone raising and the top-three record.
//
// When the search completes a piece it hands over a snapshot of the grid.
// Before recording it, notes leading stepwise into a raised leading tone
// are raised too (musica ficta): the sixth and seventh degrees climbing to
// the final are sung sharp. Raising happens on the snapshot only, so the
// live search grid still holds exactly the pitches the search committed,
// and every raised note is listed as an `Alteration` so the evaluated
// pitches can be recovered.

use crate::grid::interval::{self, FIFTH, FOURTH, MINOR_SECOND, MINOR_THIRD, OCTAVE, UNISON};
use crate::grid::{Grid, Note};
use crate::mode::Mode;
use serde::{Deserialize, Serialize};

/// How many completed solutions are kept.
pub const KEPT_SOLUTIONS: usize = 3;

/// A note raised a semitone after the search chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alteration {
    pub voice: usize,
    /// 1-based note position within the voice.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Total penalty the search assigned, before any raising.
    pub penalty: u64,
    /// `voices[v - 1]` holds counterpoint voice `v`, absolute pitches.
    pub voices: Vec<Vec<Note>>,
    pub alterations: Vec<Alteration>,
}

impl Solution {
    pub fn from_grid(grid: &Grid, penalty: u64, alterations: Vec<Alteration>) -> Self {
        let voices = (1..=grid.num_parts())
            .map(|v| {
                grid.notes(v)
                    .iter()
                    .map(|note| Note {
                        pitch: note.pitch + grid.base_pitch,
                        ..*note
                    })
                    .collect()
            })
            .collect();
        Solution {
            penalty,
            voices,
            alterations,
        }
    }

    /// Absolute pitches of counterpoint voice `v` (1-based).
    pub fn pitches(&self, v: usize) -> Vec<i32> {
        self.voices[v - 1].iter().map(|n| n.pitch).collect()
    }
}

/// The best few solutions, lowest penalty first.
#[derive(Debug, Clone, Default)]
pub struct Solutions {
    ranked: Vec<Solution>,
}

impl Solutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, solution: Solution) {
        let pos = self.ranked.partition_point(|s| s.penalty <= solution.penalty);
        if pos < KEPT_SOLUTIONS {
            self.ranked.insert(pos, solution);
            self.ranked.truncate(KEPT_SOLUTIONS);
        }
    }

    pub fn best(&self) -> Option<&Solution> {
        self.ranked.first()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn into_vec(self) -> Vec<Solution> {
        self.ranked
    }
}

/// Raise the notes leading into each voice's raised penultimate note.
///
/// Walks back from the note before the penultimate while the line keeps
/// to the top of the scale (pitch classes 8-11 and 0 over the final) and
/// moves by step. The walk stops at a leap into a note (unison, fourth,
/// fifth or octave) and wherever another voice sounds the same pitch class
/// unraised, which would make a cross relation. A note a minor third or
/// minor second under the leading tone is raised.
pub fn raise_leading_tones(grid: &mut Grid, mode: Mode) -> Vec<Alteration> {
    let parts = grid.num_parts();
    let mut alterations = Vec::new();
    for v in 1..=parts {
        let total = grid.total_notes(v);
        if total < 3 {
            continue;
        }
        let leading_tone = grid.pitch(total - 1, v);
        if mode.contains(leading_tone) {
            continue;
        }
        let mut k = 2;
        while k + 1 < total {
            let pos = total - k;
            let pitch = grid.pitch(pos, v);
            let pc = pitch.rem_euclid(12);
            if (pc < 8 && pc != 0) || interval::is_skip(grid.pitch(pos + 1, v) - pitch) {
                break;
            }
            let approach = (pitch - grid.pitch(pos - 1, v)).abs();
            if matches!(approach, UNISON | FOURTH | FIFTH | OCTAVE) {
                break;
            }
            let cross_relation = (0..=parts)
                .filter(|&other| other != v)
                .any(|other| grid.other(pos, v, other).rem_euclid(12) == pc);
            if cross_relation {
                break;
            }
            let below = leading_tone - pitch;
            if below == MINOR_THIRD || below == MINOR_SECOND {
                grid.set_pitch(pos, v, pitch + 1);
                alterations.push(Alteration { voice: v, position: pos });
            }
            k += 1;
        }
    }
    alterations
}
