// Fux Counterpoint Generator
//
// Writes one to five counterpoint voices against a cantus firmus in any of
// the five species of Fux's Gradus ad Parnassum. Every candidate note is
// scored by a table of weighted style rules, and a depth-first
// branch-and-bound search picks the lowest-penalty pieces it can find under
// an adaptive ceiling.
//
// Architecture:
// - mode.rs: the seven church modes and interval classification
// - grid.rs: score representation (cantus + counterpoint voices, eighth-note time)
// - species.rs, rhythm.rs: per-species rhythms, balanced fifth-species templates
// - candidates.rs: the fixed melodic offsets tried for each next note
// - weights.rs: the penalty weight table (JSON-loadable)
// - config.rs: search tuning knobs with species/voice-derived defaults
// - rules.rs: the staged rule evaluator and whole-grid rescoring
// - leaderboard.rs: bounded best-first list of choices at one decision point
// - search.rs: onset-group branch-and-bound search with the adaptive ceiling
// - results.rs: leading-tone raising and the three best solutions
// - compose.rs: request in, ranked solutions out
//
// Output is deterministic given the request and the random source.

pub mod candidates;
pub mod compose;
pub mod config;
pub mod error;
pub mod grid;
pub mod leaderboard;
pub mod mode;
pub mod results;
pub mod rhythm;
pub mod rules;
pub mod search;
pub mod species;
pub mod weights;

pub use compose::{Composition, CounterpointRequest, compose};
pub use config::SearchConfig;
pub use error::{CounterpointError, Result};
pub use mode::Mode;
pub use results::{Alteration, Solution};
pub use species::Species;
pub use weights::PenaltyWeights;
