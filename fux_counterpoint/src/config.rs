// Search tuning knobs.
//
// Most defaults depend on the request: the harder the problem (higher
// species, more voices) the gentler the ceiling tightening and the sooner it
// happens. `SearchConfig` holds optional overrides; `resolve` fills in the
// rest for a concrete species and voice count.

use crate::error::Result;
use crate::species::Species;
use crate::weights::{FORBIDDEN, REAL_BAD};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Multiplier (< 1) applied to the ceiling each time it tightens.
    /// Default: `1 - species * voices * 0.01`.
    pub penalty_ratio: Option<f64>,
    /// Group calls between periodic ceiling tightenings.
    /// Default: `50 * (6 - voices) * (6 - species)`.
    pub branch_limit: Option<usize>,
    /// Best assignments kept per decision point. Default 16.
    pub leaderboard_capacity: Option<usize>,
    /// Starting ceiling when exactly one voice is written.
    /// Default `2 * REAL_BAD`.
    pub single_voice_ceiling: Option<u64>,
    /// Rerun a fruitless single-voice search with no ceiling. Default true.
    pub unbounded_fallback: Option<bool>,
}

/// Concrete values for one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub penalty_ratio: f64,
    pub branch_limit: usize,
    pub leaderboard_capacity: usize,
    pub initial_ceiling: u64,
    pub unbounded_fallback: bool,
}

pub const DEFAULT_LEADERBOARD_CAPACITY: usize = 16;

impl SearchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Fill in every unset knob for `voices` counterpoint voices whose top
    /// voice is written in `species`.
    pub fn resolve(&self, species: Species, voices: usize) -> SearchParams {
        let s = species.number() as usize;
        let initial_ceiling = if voices == 1 {
            self.single_voice_ceiling.unwrap_or(2 * REAL_BAD)
        } else {
            FORBIDDEN
        };
        SearchParams {
            penalty_ratio: self
                .penalty_ratio
                .unwrap_or(1.0 - (s * voices) as f64 * 0.01),
            branch_limit: self
                .branch_limit
                .unwrap_or(50 * 6usize.saturating_sub(voices) * (6 - s))
                .max(1),
            leaderboard_capacity: self
                .leaderboard_capacity
                .unwrap_or(DEFAULT_LEADERBOARD_CAPACITY)
                .max(1),
            initial_ceiling,
            unbounded_fallback: self.unbounded_fallback.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_species_and_voices() {
        let p = SearchConfig::default().resolve(Species::First, 1);
        assert!((p.penalty_ratio - 0.99).abs() < 1e-9);
        assert_eq!(p.branch_limit, 50 * 5 * 5);
        assert_eq!(p.leaderboard_capacity, 16);
        assert_eq!(p.initial_ceiling, 400);
        assert!(p.unbounded_fallback);

        let p = SearchConfig::default().resolve(Species::Fifth, 3);
        assert!((p.penalty_ratio - 0.85).abs() < 1e-9);
        assert_eq!(p.branch_limit, 50 * 3);
        assert_eq!(p.initial_ceiling, FORBIDDEN);
    }

    #[test]
    fn five_voices_still_branch() {
        // 6 - 5 voices = 1, 6 - 5 species = 1.
        let p = SearchConfig::default().resolve(Species::Fifth, 5);
        assert_eq!(p.branch_limit, 50);
    }

    #[test]
    fn overrides_win() {
        let config = SearchConfig {
            penalty_ratio: Some(0.5),
            branch_limit: Some(10),
            leaderboard_capacity: Some(4),
            single_voice_ceiling: Some(1000),
            unbounded_fallback: Some(false),
        };
        let p = config.resolve(Species::Second, 1);
        assert_eq!(p.penalty_ratio, 0.5);
        assert_eq!(p.branch_limit, 10);
        assert_eq!(p.leaderboard_capacity, 4);
        assert_eq!(p.initial_ceiling, 1000);
        assert!(!p.unbounded_fallback);
    }

    #[test]
    fn json_subset() {
        let config: SearchConfig = serde_json::from_str(r#"{ "branch_limit": 200 }"#).unwrap();
        assert_eq!(config.branch_limit, Some(200));
        assert_eq!(config.penalty_ratio, None);
    }
}
