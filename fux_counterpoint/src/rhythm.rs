// Fifth-species rhythm templates and the usage balancer that picks them.
//
// Each template fills exactly one cantus bar (8 eighths). A piece draws one
// template per bar; to keep the rhythm varied, the balancer tracks how often
// each template has been used and steers every pick toward the least-used
// ones. The pick starts from a template sampled from the caller's random
// source, so different seeds give different pieces while usage stays even:
// within a piece, no template is used more than once more than any other.

use fux_prng::RandomSource;

/// The nine florid-bar rhythms, durations in eighth notes.
pub const TEMPLATES: [&[i32]; 9] = [
    &[4, 4],
    &[4, 2, 2],
    &[2, 2, 2, 2],
    &[2, 2, 4],
    &[2, 1, 1, 4],
    &[2, 1, 1, 2, 2],
    &[4, 2, 1, 1],
    &[2, 1, 1, 2, 1, 1],
    &[2, 2, 2, 1, 1],
];

/// Per-piece template usage counter.
#[derive(Debug, Clone, Default)]
pub struct RhythmBalancer {
    usage: [u32; TEMPLATES.len()],
}

impl RhythmBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage(&self) -> &[u32; TEMPLATES.len()] {
        &self.usage
    }

    /// Choose the next bar's template index and count it as used.
    ///
    /// Samples a template, then compares it with its two neighbours
    /// (wrapping around the table). If the sample is used more than the
    /// least-used template, walk toward whichever neighbour is used less
    /// (left on a tie) until reaching a least-used template. Walking the
    /// whole way, not one neighbour, keeps any two counts within one.
    pub fn pick_index(&mut self, rng: &mut impl RandomSource) -> usize {
        let len = TEMPLATES.len();
        let mut i = rng.below(len);
        let least = self.usage.iter().copied().min().unwrap_or(0);

        if self.usage[i] > least {
            let left = (i + len - 1) % len;
            let right = (i + 1) % len;
            let step = if self.usage[left] <= self.usage[right] { len - 1 } else { 1 };
            while self.usage[i] > least {
                i = (i + step) % len;
            }
        }

        self.usage[i] += 1;
        i
    }

    /// Choose the next bar's durations.
    pub fn pick(&mut self, rng: &mut impl RandomSource) -> &'static [i32] {
        TEMPLATES[self.pick_index(rng)]
    }
}
