// Entry point: from a request to ranked, finished counterpoint.

use crate::config::{SearchConfig, SearchParams};
use crate::error::{CounterpointError, Result};
use crate::grid::{Grid, MAX_VOICES};
use crate::mode::Mode;
use crate::results::Solution;
use crate::rules::{Evaluator, score_grid};
use crate::search::{SearchEngine, SearchOutcome, SearchStats};
use crate::species::Species;
use crate::weights::{FORBIDDEN, PenaltyWeights};
use fux_prng::RandomSource;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// What to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpointRequest {
    pub mode: Mode,
    /// Species of the highest counterpoint voice.
    pub species: Species,
    /// Absolute pitches of the cantus firmus, one per bar.
    pub cantus: Vec<i32>,
    /// Absolute first pitch of each counterpoint voice, lowest voice first.
    pub start_pitches: Vec<i32>,
}

/// The result of one `compose` call.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Best first; at most three.
    pub solutions: Vec<Solution>,
    pub stats: SearchStats,
    pub mode: Mode,
    pub species: Species,
    /// The grid as laid out before the search: rhythms and first pitches.
    template: Grid,
    weights: PenaltyWeights,
}

impl Composition {
    pub fn best(&self) -> Option<&Solution> {
        self.solutions.first()
    }

    /// Score `solution` from scratch, note by note, at the pitches the
    /// search evaluated (alterations undone).
    pub fn rescore(&self, solution: &Solution) -> u64 {
        let mut grid = self.template.clone();
        for (i, notes) in solution.voices.iter().enumerate() {
            for (n, note) in notes.iter().enumerate() {
                grid.set_pitch(n + 1, i + 1, note.pitch - grid.base_pitch);
            }
        }
        for alt in &solution.alterations {
            let raised = grid.pitch(alt.position, alt.voice);
            grid.set_pitch(alt.position, alt.voice, raised - 1);
        }
        let evaluator = Evaluator::new(&self.weights, self.mode);
        score_grid(&grid, &evaluator, self.species)
    }
}

/// Write counterpoint for `request`. `rng` lays out the fifth-species
/// rhythm; the search itself is deterministic.
pub fn compose(
    request: &CounterpointRequest,
    weights: &PenaltyWeights,
    config: &SearchConfig,
    rng: &mut impl RandomSource,
) -> Result<Composition> {
    let parts = request.start_pitches.len();
    if parts == 0 {
        return Err(CounterpointError::NoCounterpointVoices);
    }
    if parts > MAX_VOICES - 1 {
        return Err(CounterpointError::CapacityExceeded {
            what: "counterpoint voices",
            requested: parts,
            limit: MAX_VOICES - 1,
        });
    }

    let mut template = Grid::new(&request.cantus)?;
    for (i, &start) in request.start_pitches.iter().enumerate() {
        let species = request.species.for_voice(i + 1, parts);
        let durations = species.durations(request.cantus.len(), rng);
        template.add_voice(&durations, start)?;
    }

    let params = config.resolve(request.species, parts);
    info!(
        "composing {:?} species {} in {:?}: {} voice(s) over {} cantus notes",
        request.species,
        request.species.number(),
        request.mode,
        parts,
        request.cantus.len()
    );

    let evaluator = Evaluator::new(weights, request.mode);
    let mut outcome = search(&template, evaluator, request.species, params);
    if outcome.solutions.is_empty() && params.unbounded_fallback && params.initial_ceiling < FORBIDDEN {
        warn!(
            "no solution under a ceiling of {}, searching again without one",
            params.initial_ceiling
        );
        let earlier = outcome.stats;
        outcome = search(
            &template,
            evaluator,
            request.species,
            SearchParams {
                initial_ceiling: FORBIDDEN,
                ..params
            },
        );
        outcome.stats.absorb(&earlier);
    }

    let solutions = outcome.solutions.into_vec();
    match solutions.first() {
        Some(best) => info!(
            "best penalty {} after {} group calls ({} improvements)",
            best.penalty,
            outcome.stats.group_calls,
            outcome.stats.solutions()
        ),
        None => info!("no solution after {} group calls", outcome.stats.group_calls),
    }

    Ok(Composition {
        solutions,
        stats: outcome.stats,
        mode: request.mode,
        species: request.species,
        template,
        weights: weights.clone(),
    })
}

fn search(template: &Grid, evaluator: Evaluator<'_>, species: Species, params: SearchParams) -> SearchOutcome {
    SearchEngine::new(template.clone(), evaluator, species, params).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fux_prng::SeededRng;

    fn request(start_pitches: Vec<i32>) -> CounterpointRequest {
        CounterpointRequest {
            mode: Mode::Dorian,
            species: Species::First,
            cantus: vec![50, 53, 52, 50],
            start_pitches,
        }
    }

    #[test]
    fn no_voices_is_an_error() {
        let err = compose(
            &request(vec![]),
            &PenaltyWeights::default(),
            &SearchConfig::default(),
            &mut SeededRng::new(1),
        )
        .unwrap_err();
        assert!(matches!(err, CounterpointError::NoCounterpointVoices));
    }

    #[test]
    fn six_counterpoint_voices_exceed_the_grid() {
        let err = compose(
            &request(vec![45, 50, 57, 62, 69, 74]),
            &PenaltyWeights::default(),
            &SearchConfig::default(),
            &mut SeededRng::new(1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CounterpointError::CapacityExceeded { requested: 6, limit: 5, .. }
        ));
    }

    #[test]
    fn overlong_cantus_is_rejected_before_searching() {
        let mut req = request(vec![57]);
        req.cantus = vec![50; 128];
        let err = compose(
            &req,
            &PenaltyWeights::default(),
            &SearchConfig::default(),
            &mut SeededRng::new(1),
        )
        .unwrap_err();
        assert!(matches!(err, CounterpointError::CapacityExceeded { limit: 127, .. }));
    }

    #[test]
    fn florid_rhythm_too_long_for_the_grid() {
        // 39 bars of four quarters plus the final: 157 notes.
        let mut req = request(vec![57]);
        req.species = Species::Third;
        req.cantus = [50, 53, 52, 55].repeat(10);
        let err = compose(
            &req,
            &PenaltyWeights::default(),
            &SearchConfig::default(),
            &mut SeededRng::new(1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CounterpointError::CapacityExceeded {
                what: "counterpoint notes per voice",
                requested: 157,
                limit: 127,
            }
        ));
    }

    #[test]
    fn request_reads_from_json() {
        let req: CounterpointRequest = serde_json::from_str(
            r#"{ "mode": "Dorian", "species": "First", "cantus": [50, 53, 52, 50], "start_pitches": [57] }"#,
        )
        .unwrap();
        assert_eq!(req, request(vec![57]));
    }

    #[test]
    fn short_piece_rescores_to_its_penalty() {
        let config = SearchConfig {
            branch_limit: Some(200),
            ..SearchConfig::default()
        };
        let piece = compose(
            &request(vec![57]),
            &PenaltyWeights::default(),
            &config,
            &mut SeededRng::new(3),
        )
        .unwrap();
        let best = piece.best().expect("a four-bar line exists");
        assert_eq!(piece.rescore(best), best.penalty);
        assert!(piece.stats.group_calls > 0);
    }
}
