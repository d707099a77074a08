// The five species and the rhythm each one lays out against the cantus.
//
// Species 1-4 have fixed rhythms (whole, half, quarter, tied half notes);
// species 5 draws one template per bar from rhythm.rs. Every rhythm ends
// with a whole note on the cantus's final bar.

use crate::error::{CounterpointError, Result};
use crate::grid::{HALF_NOTE, QUARTER_NOTE, WHOLE_NOTE};
use crate::rhythm::RhythmBalancer;
use fux_prng::RandomSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    /// Note against note.
    First = 1,
    /// Two half notes per cantus note.
    Second = 2,
    /// Four quarter notes per cantus note.
    Third = 3,
    /// Half notes syncopated across the bar (ligatures/suspensions).
    Fourth = 4,
    /// Florid: a free mix of the above.
    Fifth = 5,
}

impl Species {
    pub const ALL: [Species; 5] = [
        Species::First,
        Species::Second,
        Species::Third,
        Species::Fourth,
        Species::Fifth,
    ];

    pub fn from_number(n: u8) -> Result<Self> {
        match n {
            1 => Ok(Species::First),
            2 => Ok(Species::Second),
            3 => Ok(Species::Third),
            4 => Ok(Species::Fourth),
            5 => Ok(Species::Fifth),
            _ => Err(CounterpointError::InvalidSpecies(n)),
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Species actually written by voice `v` of `parts` when the request
    /// asks for `self`: only the top voice is florid, the rest move note
    /// against note.
    pub fn for_voice(self, v: usize, parts: usize) -> Species {
        if v == parts { self } else { Species::First }
    }

    /// Durations (eighth notes) of every note of a voice in this species
    /// over a cantus of `cantus_len` notes. Only fifth species consumes
    /// randomness.
    pub fn durations(self, cantus_len: usize, rng: &mut impl RandomSource) -> Vec<i32> {
        let bars = cantus_len.saturating_sub(1);
        let mut durs = match self {
            Species::First => vec![WHOLE_NOTE; bars],
            Species::Second | Species::Fourth => vec![HALF_NOTE; bars * 2],
            Species::Third => vec![QUARTER_NOTE; bars * 4],
            Species::Fifth => {
                let mut balancer = RhythmBalancer::new();
                let mut durs = Vec::with_capacity(bars * 4 + 1);
                for _ in 0..bars {
                    durs.extend_from_slice(balancer.pick(rng));
                }
                durs
            }
        };
        durs.push(WHOLE_NOTE);
        durs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fux_prng::SeededRng;

    #[test]
    fn note_counts_per_species() {
        let mut rng = SeededRng::new(1);
        let len = 11;
        assert_eq!(Species::First.durations(len, &mut rng).len(), len);
        assert_eq!(Species::Second.durations(len, &mut rng).len(), 2 * len - 1);
        assert_eq!(Species::Third.durations(len, &mut rng).len(), 4 * len - 3);
        assert_eq!(Species::Fourth.durations(len, &mut rng).len(), 2 * len - 1);
    }

    #[test]
    fn every_rhythm_fills_the_cantus() {
        let mut rng = SeededRng::new(9);
        for species in Species::ALL {
            let durs = species.durations(12, &mut rng);
            let body: i32 = durs[..durs.len() - 1].iter().sum();
            assert_eq!(body, 11 * WHOLE_NOTE, "{species:?}");
            assert_eq!(*durs.last().unwrap(), WHOLE_NOTE, "{species:?}");
        }
    }

    #[test]
    fn only_top_voice_is_florid() {
        assert_eq!(Species::Fourth.for_voice(3, 3), Species::Fourth);
        assert_eq!(Species::Fourth.for_voice(1, 3), Species::First);
        assert_eq!(Species::Third.for_voice(1, 1), Species::Third);
    }

    #[test]
    fn numbers_round_trip() {
        for species in Species::ALL {
            assert_eq!(Species::from_number(species.number()).unwrap(), species);
        }
        assert!(matches!(Species::from_number(0), Err(CounterpointError::InvalidSpecies(0))));
        assert!(matches!(Species::from_number(6), Err(CounterpointError::InvalidSpecies(6))));
    }
}
