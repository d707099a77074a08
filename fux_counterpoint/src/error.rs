// Errors surfaced by the counterpoint library.
//
// The search itself never fails: not finding a solution is an empty result,
// not an error. What can fail is setting a search up (too many notes or
// voices for the fixed grid, an unusable cantus) and loading configuration
// from disk.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterpointError {
    /// A voice needs more note positions, or the request more voices, than
    /// the fixed grid holds.
    #[error("capacity exceeded: {what} needs {requested}, limit is {limit}")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        limit: usize,
    },

    #[error("at least one counterpoint voice (start pitch) is required")]
    NoCounterpointVoices,

    /// A cantus needs a penultimate and a final note.
    #[error("cantus firmus has {len} notes, at least 2 are required")]
    CantusTooShort { len: usize },

    #[error("species must be 1-5, got {0}")]
    InvalidSpecies(u8),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CounterpointError>;
