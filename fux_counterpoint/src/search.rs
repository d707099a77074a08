// Branch-and-bound search over onset groups.
//
// The piece is decided one onset group at a time: a group is the next time
// point at which one or more counterpoint voices start a note. At each
// group the engine enumerates every combination of candidate pitches for
// the voices starting there (voice by voice, depth first), keeps the best
// few combinations on a leaderboard, and then tries them best first: commit
// the pitches, recurse into the next group, move on to the next entry when
// the recursion returns. The final group records a completed solution.
//
// Two bounds prune the tree:
// - while enumerating, a combination must score below the best completed
//   total so far (less what the path has already spent), and, once the
//   leaderboard is full, below its worst entry;
// - while trying entries, a path must stay below the adaptive ceiling,
//   which tightens by a fixed ratio every `branch_limit` group calls and
//   drops below every new best solution.
//
// Grid discipline: the engine owns the only live grid and never restores a
// cell. Enumeration writes each candidate into its cell before scoring it;
// committing an entry overwrites the same cells with the entry's pitches.
// A group only ever writes the cells of the notes starting at that group,
// and every cell a deeper group reads was written by this group or an
// earlier one, so whatever a sibling branch left behind is overwritten
// before it can be read.
//
// Leaderboards, the list of deciding voices and the per-voice choice
// indices are allocated per group call: a group recurses into the next
// group while still iterating its own leaderboard.

use crate::candidates::{candidates, pitch_for};
use crate::config::SearchParams;
use crate::grid::Grid;
use crate::leaderboard::Leaderboard;
use crate::results::{Solution, Solutions, raise_leading_tones};
use crate::rules::Evaluator;
use crate::species::Species;
use crate::weights::FORBIDDEN;
use log::debug;
use serde::{Deserialize, Serialize};

/// The two bounds the search prunes with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltySchedule {
    /// Total of the best completed solution so far.
    pub best_fit: u64,
    /// Ceiling a partial path must stay below.
    pub max_penalty: u64,
    ratio: f64,
}

impl PenaltySchedule {
    pub fn new(initial_ceiling: u64, ratio: f64) -> Self {
        PenaltySchedule {
            best_fit: FORBIDDEN,
            max_penalty: initial_ceiling,
            ratio,
        }
    }

    /// `x * ratio`, rounded down, never above `x`.
    fn scaled(&self, x: u64) -> u64 {
        ((x as f64 * self.ratio) as u64).min(x)
    }

    /// Periodic tightening.
    pub fn tighten(&mut self) {
        self.max_penalty = self.scaled(self.max_penalty);
    }

    /// Pull the ceiling under the best total, never loosening it.
    pub fn tighten_to_best(&mut self) {
        self.max_penalty = self.max_penalty.min(self.scaled(self.best_fit));
    }

    /// A completed solution with a lower total than any before.
    pub fn record_best(&mut self, total: u64) {
        debug_assert!(total < self.best_fit);
        self.best_fit = total;
        self.tighten_to_best();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Onset-group calls, pruned ones excluded.
    pub group_calls: u64,
    /// Periodic ceiling tightenings.
    pub tightenings: u64,
    /// Totals of successive new best solutions, in the order found.
    pub improvements: Vec<u64>,
    /// Every value the ceiling took, in order, starting with the initial one.
    pub ceilings: Vec<u64>,
}

impl SearchStats {
    pub fn solutions(&self) -> usize {
        self.improvements.len()
    }

    /// Fold in the counts from an earlier pass over the same request.
    pub fn absorb(&mut self, earlier: &SearchStats) {
        self.group_calls += earlier.group_calls;
        self.tightenings += earlier.tightenings;
    }
}

pub struct SearchOutcome {
    pub solutions: Solutions,
    pub stats: SearchStats,
    pub schedule: PenaltySchedule,
}

/// A note that has to be decided: (voice, position).
type Need = (usize, usize);

pub struct SearchEngine<'w> {
    grid: Grid,
    evaluator: Evaluator<'w>,
    top_species: Species,
    params: SearchParams,
    schedule: PenaltySchedule,
    branches: usize,
    stats: SearchStats,
    solutions: Solutions,
}

impl<'w> SearchEngine<'w> {
    /// `grid` must hold the cantus, every voice's rhythm and every voice's
    /// first pitch.
    pub fn new(grid: Grid, evaluator: Evaluator<'w>, top_species: Species, params: SearchParams) -> Self {
        SearchEngine {
            grid,
            evaluator,
            top_species,
            params,
            schedule: PenaltySchedule::new(params.initial_ceiling, params.penalty_ratio),
            branches: 0,
            stats: SearchStats::default(),
            solutions: Solutions::new(),
        }
    }

    pub fn run(mut self) -> SearchOutcome {
        self.note_ceiling();
        self.best_fit_first(0, 0);
        SearchOutcome {
            solutions: self.solutions,
            stats: self.stats,
            schedule: self.schedule,
        }
    }

    /// Decide the group after `cur_time`, having spent `current` so far.
    fn best_fit_first(&mut self, cur_time: i32, current: u64) {
        if current > self.schedule.max_penalty {
            return;
        }
        self.stats.group_calls += 1;
        self.branches += 1;
        if self.branches >= self.params.branch_limit {
            self.schedule.tighten();
            self.branches = 0;
            self.stats.tightenings += 1;
            self.note_ceiling();
            debug!("ceiling tightened to {}", self.schedule.max_penalty);
        }

        let Some((next_time, needs)) = self.next_group(cur_time) else {
            return;
        };

        let mut board = Leaderboard::new(self.params.leaderboard_capacity);
        if needs.is_empty() {
            board.insert(0, &[]);
        } else {
            let mut choices = vec![0; needs.len()];
            let lim = self.schedule.best_fit.saturating_sub(current);
            self.look(&needs, 0, 0, lim, &mut board, &mut choices);
        }

        let is_final = next_time >= self.grid.total_time;
        for entry in board.entries() {
            let total = current + entry.penalty;
            if total >= self.schedule.max_penalty || (is_final && total >= self.schedule.best_fit) {
                break;
            }
            for (&(v, n), &choice) in needs.iter().zip(&entry.choices) {
                let cp = pitch_for(self.grid.pitch(n - 1, v), choice);
                self.grid.set_pitch(n, v, cp);
            }
            if is_final {
                self.save_results(total);
            } else {
                self.best_fit_first(next_time, total);
            }
            if cur_time == 0 {
                self.schedule.tighten_to_best();
            }
            self.note_ceiling();
        }
    }

    fn note_ceiling(&mut self) {
        let ceiling = self.schedule.max_penalty;
        if self.stats.ceilings.last() != Some(&ceiling) {
            self.stats.ceilings.push(ceiling);
        }
    }

    /// Enumerate candidates for `needs[idx..]`, voice by voice, given the
    /// penalty `cur_pen` of the voices already fixed. Complete combinations
    /// under `lim` go onto the leaderboard. Returns the bound, which only
    /// shrinks as the leaderboard fills.
    fn look(
        &mut self,
        needs: &[Need],
        idx: usize,
        cur_pen: u64,
        lim: u64,
        board: &mut Leaderboard,
        choices: &mut [usize],
    ) -> u64 {
        let (v, n) = needs[idx];
        let species = self.top_species.for_voice(v, self.grid.num_parts());
        let mut lim = lim;
        for (choice, cp) in candidates(self.grid.pitch(n - 1, v)) {
            if cur_pen >= lim {
                break;
            }
            self.grid.set_pitch(n, v, cp);
            let penalty = cur_pen + self.evaluator.check(&self.grid, n, cp, v, species, lim - cur_pen);
            if penalty >= lim {
                continue;
            }
            choices[idx] = choice;
            if idx + 1 < needs.len() {
                lim = self.look(needs, idx + 1, penalty, lim, board, choices);
            } else {
                board.insert(penalty, choices);
                if let Some(bound) = board.admission_bound() {
                    lim = lim.min(bound);
                }
            }
        }
        lim
    }

    /// The next time after `cur_time` at which any voice starts a note, and
    /// the counterpoint notes starting then.
    fn next_group(&self, cur_time: i32) -> Option<(i32, Vec<Need>)> {
        let grid = &self.grid;
        let next_time = (0..=grid.num_parts())
            .filter_map(|v| {
                let i = grid.index_at(cur_time, v);
                (i < grid.total_notes(v)).then(|| grid.onset(i + 1, v))
            })
            .min()?;
        let needs = (1..=grid.num_parts())
            .filter_map(|v| {
                let i = grid.index_at(next_time, v);
                (grid.onset(i, v) == next_time).then_some((v, i))
            })
            .collect();
        Some((next_time, needs))
    }

    fn save_results(&mut self, total: u64) {
        let mut snapshot = self.grid.clone();
        let alterations = raise_leading_tones(&mut snapshot, self.evaluator.mode());
        self.schedule.record_best(total);
        self.stats.improvements.push(total);
        debug!(
            "new best {total} after {} group calls ({} notes raised), ceiling {}",
            self.stats.group_calls,
            alterations.len(),
            self.schedule.max_penalty
        );
        debug!("\n{}", snapshot.summary());
        self.solutions.record(Solution::from_grid(&snapshot, total, alterations));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::grid::{HALF_NOTE, WHOLE_NOTE};
    use crate::mode::Mode;
    use crate::rules::score_grid;
    use crate::weights::PenaltyWeights;

    fn short_grid() -> Grid {
        // D F E D: a four-bar cantus ending on the final.
        let mut grid = Grid::new(&[50, 53, 52, 50]).unwrap();
        grid.add_voice(&[WHOLE_NOTE; 4], 57).unwrap();
        grid
    }

    fn engine<'w>(grid: Grid, evaluator: Evaluator<'w>, species: Species) -> SearchEngine<'w> {
        let params = SearchConfig {
            branch_limit: Some(200),
            ..SearchConfig::default()
        }
        .resolve(species, grid.num_parts());
        SearchEngine::new(grid, evaluator, species, params)
    }

    #[test]
    fn groups_follow_the_fastest_voice() {
        let weights = PenaltyWeights::default();
        let evaluator = Evaluator::new(&weights, Mode::Dorian);
        let mut grid = Grid::new(&[50, 53, 52, 50]).unwrap();
        grid.add_voice(&[WHOLE_NOTE; 4], 45).unwrap();
        let mut halves = vec![HALF_NOTE; 6];
        halves.push(WHOLE_NOTE);
        grid.add_voice(&halves, 62).unwrap();
        let engine = engine(grid, evaluator, Species::Second);

        let (t, needs) = engine.next_group(0).unwrap();
        assert_eq!(t, 4);
        assert_eq!(needs, vec![(2, 2)]);
        let (t, needs) = engine.next_group(4).unwrap();
        assert_eq!(t, 8);
        assert_eq!(needs, vec![(1, 2), (2, 3)]);
        let (t, needs) = engine.next_group(20).unwrap();
        assert_eq!(t, 24);
        assert_eq!(needs, vec![(1, 4), (2, 7)]);
        assert!(engine.next_group(24).is_none());
    }

    #[test]
    fn finds_a_solution_that_rescores_exactly() {
        let weights = PenaltyWeights::default();
        let evaluator = Evaluator::new(&weights, Mode::Dorian);
        let template = short_grid();
        let outcome = engine(template.clone(), evaluator, Species::First).run();

        let best = outcome.solutions.best().expect("a four-bar line exists");
        assert!(best.penalty < FORBIDDEN);
        assert_eq!(best.voices[0].len(), 4);
        assert_eq!(best.pitches(1)[0], 57);

        let mut grid = template;
        for (i, &p) in best.pitches(1).iter().enumerate() {
            grid.set_pitch(i + 1, 1, p - grid.base_pitch);
        }
        for alt in &best.alterations {
            let p = grid.pitch(alt.position, alt.voice);
            grid.set_pitch(alt.position, alt.voice, p - 1);
        }
        assert_eq!(score_grid(&grid, &evaluator, Species::First), best.penalty);
    }

    #[test]
    fn bounds_never_loosen() {
        let weights = PenaltyWeights::default();
        let evaluator = Evaluator::new(&weights, Mode::Dorian);
        let outcome = engine(short_grid(), evaluator, Species::First).run();
        let improvements = &outcome.stats.improvements;
        assert!(!improvements.is_empty());
        assert!(improvements.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(outcome.schedule.best_fit, *improvements.last().unwrap());
        assert!(outcome.schedule.max_penalty <= outcome.schedule.best_fit);
    }

    #[test]
    fn ceiling_never_rises_during_a_search() {
        let weights = PenaltyWeights::default();
        let evaluator = Evaluator::new(&weights, Mode::Dorian);
        let mut grid = Grid::new(&[50, 53, 52, 55, 53, 52, 50]).unwrap();
        let mut durs = vec![HALF_NOTE; 12];
        durs.push(WHOLE_NOTE);
        grid.add_voice(&durs, 57).unwrap();
        // Tighten on every group call.
        let params = SearchConfig {
            branch_limit: Some(1),
            ..SearchConfig::default()
        }
        .resolve(Species::Second, 1);
        let outcome = SearchEngine::new(grid, evaluator, Species::Second, params).run();

        let ceilings = &outcome.stats.ceilings;
        assert_eq!(ceilings[0], params.initial_ceiling);
        assert!(outcome.stats.tightenings > 0);
        assert!(ceilings.len() > 1);
        assert!(ceilings.windows(2).all(|w| w[1] < w[0]), "{ceilings:?}");
        assert_eq!(*ceilings.last().unwrap(), outcome.schedule.max_penalty);
    }

    #[test]
    fn schedule_tightening() {
        let mut schedule = PenaltySchedule::new(FORBIDDEN, 0.9);
        schedule.tighten();
        assert_eq!(schedule.max_penalty, 900_000);
        schedule.record_best(1000);
        assert_eq!(schedule.best_fit, 1000);
        assert_eq!(schedule.max_penalty, 900);
        // A later periodic tightening goes lower still; re-tightening to the
        // best does not undo it.
        schedule.tighten();
        schedule.tighten_to_best();
        assert_eq!(schedule.max_penalty, 810);
    }

    #[test]
    fn ratio_above_one_cannot_loosen() {
        let mut schedule = PenaltySchedule::new(500, 1.5);
        schedule.tighten();
        assert_eq!(schedule.max_penalty, 500);
    }
}
