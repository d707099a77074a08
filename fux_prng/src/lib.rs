// Seedable pseudo-random source for the counterpoint generator.
//
// The search itself is fully deterministic; randomness enters only when the
// fifth-species rhythm is laid out (which template fills each bar). To keep
// whole pieces reproducible, that choice draws from a `RandomSource` passed
// in by the caller instead of any global or OS-seeded generator.
//
// `SeededRng` implements xoshiro256++ (Blackman & Vigna, 2019), expanded from
// a single `u64` seed with SplitMix64. Integer-only arithmetic, so the stream
// is identical on every platform and optimization level.

use serde::{Deserialize, Serialize};

/// The narrow interface the generator needs from a random source.
///
/// Only `next_u64` is required; `below` has a bias-free default built on it.
pub trait RandomSource {
    /// Next raw 64-bit value in the stream.
    fn next_u64(&mut self) -> u64;

    /// Uniform integer in `[0, bound)`.
    ///
    /// Panics if `bound == 0`.
    fn below(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "below: bound must be positive");
        let range = bound as u64;
        if range.is_power_of_two() {
            return (self.next_u64() & (range - 1)) as usize;
        }
        // Rejection sampling avoids modulo bias.
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return (r % range) as usize;
            }
        }
    }
}

/// Xoshiro256++ generator seeded from a single `u64`.
///
/// Two instances built from the same seed produce identical streams, and the
/// state serializes so a run can be resumed exactly where it left off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    s: [u64; 4],
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }
}

impl RandomSource for SeededRng {
    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

/// A fixed, repeating sequence of values. Handy for pinning down exactly
/// which template a balancer samples in tests.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    values: Vec<u64>,
    next: usize,
}

impl ScriptedSource {
    /// Panics if `values` is empty.
    pub fn new(values: Vec<u64>) -> Self {
        assert!(!values.is_empty(), "ScriptedSource needs at least one value");
        Self { values, next: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn next_u64(&mut self) -> u64 {
        let v = self.values[self.next % self.values.len()];
        self.next += 1;
        v
    }
}

/// SplitMix64 step, used only to expand the seed.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
