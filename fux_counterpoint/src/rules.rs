// Rule-penalty evaluator: how bad is pitch `cp` for note `n` of voice `v`?
//
// A note is judged against a reference voice (the cantus when only one
// counterpoint voice is written, otherwise the lowest pitch sounding below
// the voice, the "bass"), against its own melody so far, and, for upper
// voices, against every voice below it. Every rule adds a weight from
// `PenaltyWeights`; nothing is rejected outright. Hard rules simply carry
// the FORBIDDEN weight.
//
// Rules are plain functions over a precomputed `NoteContext`, grouped into
// stages that run in a fixed order:
//
//   placement -> dissonance -> species idioms -> other voices ->
//   voice leading -> melodic shape -> repetition -> consonance -> style
//
// Only the species-idiom stage differs between species; `stages` picks its
// rule list. The running total is compared with the caller's limit after
// every rule and returned as soon as it reaches it. Totals only grow, so
// that partial total is already proof the candidate cannot be admitted.
// A candidate that stays under the limit is always scored in full, which
// is what lets `score_grid` reproduce the search's totals exactly.
//
// The evaluator reads the grid and never writes it. Note `n` of voice `v`
// is never read from the grid: `cp` stands in for it everywhere.

use crate::grid::interval::{self, Motion};
use crate::grid::{EIGHTH_NOTE, Grid, HALF_NOTE, QUARTER_NOTE, WHOLE_NOTE};
use crate::mode::{Mode, is_dissonant, is_perfect};
use crate::species::Species;
use crate::weights::PenaltyWeights;

use interval::{
    FIFTH, FOURTH, MAJOR_SECOND, MAJOR_SIXTH, MAJOR_THIRD, MINOR_SECOND, MINOR_SIXTH, OCTAVE,
    TRITONE, UNISON,
};

/// Lowest and highest absolute pitch a voice may use without penalty.
pub const LOWEST_PITCH: i32 = 24;
pub const HIGHEST_PITCH: i32 = 72;
/// Distance from either bound that still counts as extreme.
const EXTREME_MARGIN: i32 = 3;

type Rule = fn(&NoteContext<'_>) -> u64;

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'w> {
    weights: &'w PenaltyWeights,
    mode: Mode,
}

impl<'w> Evaluator<'w> {
    pub fn new(weights: &'w PenaltyWeights, mode: Mode) -> Self {
        Evaluator { weights, mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Penalty for placing `cp` at note `n` (>= 2) of voice `v`, written in
    /// `species`. Returns early, with a partial total, once the total
    /// reaches `limit`.
    pub fn check(&self, grid: &Grid, n: usize, cp: i32, v: usize, species: Species, limit: u64) -> u64 {
        let ctx = NoteContext::new(grid, self.weights, self.mode, n, cp, v, species);
        let mut val = 0;
        for stage in stages(species) {
            for rule in stage {
                val += rule(&ctx);
                if val >= limit {
                    return val;
                }
            }
        }
        val
    }
}

/// Total penalty of a completely filled grid: every counterpoint note after
/// the first, each scored with no limit. `top_species` is the species of
/// the highest voice.
pub fn score_grid(grid: &Grid, evaluator: &Evaluator<'_>, top_species: Species) -> u64 {
    let parts = grid.num_parts();
    let mut total = 0;
    for v in 1..=parts {
        let species = top_species.for_voice(v, parts);
        for n in 2..=grid.total_notes(v) {
            total += evaluator.check(grid, n, grid.pitch(n, v), v, species, u64::MAX);
        }
    }
    total
}

fn stages(species: Species) -> [&'static [Rule]; 9] {
    [
        PLACEMENT,
        DISSONANCE,
        species_idioms(species),
        OTHER_VOICES,
        VOICE_LEADING,
        MELODIC_SHAPE,
        REPETITION,
        CONSONANCE,
        STYLE,
    ]
}

const PLACEMENT: &[Rule] = &[range, cross_above_cantus, mode_conformance];

const DISSONANCE: &[Rule] = &[dissonance_legality];

fn species_idioms(species: Species) -> &'static [Rule] {
    match species {
        Species::First => &[],
        Species::Second => SECOND_SPECIES,
        Species::Third => THIRD_SPECIES,
        Species::Fourth => FOURTH_SPECIES,
        Species::Fifth => FIFTH_SPECIES,
    }
}

const SECOND_SPECIES: &[Rule] = &[second_species_cadence];
const THIRD_SPECIES: &[Rule] = &[florid_downbeat, cambiata, third_species_dissonance];
const FOURTH_SPECIES: &[Rule] = &[ligature];
const FIFTH_SPECIES: &[Rule] = &[
    florid_downbeat,
    cambiata,
    fifth_species_ties,
    fifth_species_dissonance,
    fifth_species_motion,
];

const OTHER_VOICES: &[Rule] = &[other_voices];

const VOICE_LEADING: &[Rule] = &[
    direct_to_perfect,
    parallel_perfects,
    no_motion_against_octave,
    bad_melody,
    end_on_perfect,
];

const MELODIC_SHAPE: &[Rule] = &[
    direct_motion,
    compound,
    consecutive_skips,
    skip_to_octave,
    skip_from_unison,
    skips_in_same_direction,
    three_skips_in_a_row,
    melodic_tritone,
    tenth_to_octave,
    over_octave,
    over_twelfth,
];

const REPETITION: &[Rule] = &[repeated_figures, unresolved_leading_tone];

const CONSONANCE: &[Rule] = &[perfect_consonance, two_part_unison];

const STYLE: &[Rule] = &[
    pitch_repetition,
    octave_and_sixth_leaps,
    neighbours,
    chromatic_approach,
    leap_back,
    leap_at_cadence,
    entanglement,
    repetition_on_upbeat,
    lydian_cadential_tritone,
    downbeat,
    vertical_tritone,
    interval_variety,
];

/// Everything the rules need about one candidate, computed once.
///
/// Earlier notes that do not exist (before note 1) read as pitch 0 and
/// duration 0; every rule that looks back guards on `n` first.
struct NoteContext<'a> {
    grid: &'a Grid,
    w: &'a PenaltyWeights,
    mode: Mode,
    n: usize,
    cp: i32,
    v: usize,
    num_parts: usize,
    species: Species,
    /// Reference pitch at notes n, n-1, n-2.
    other0: i32,
    other1: i32,
    other2: i32,
    last_cp: i32,
    last_cp2: i32,
    last_cp3: i32,
    last_cp4: i32,
    /// Signed vertical interval to the reference.
    interval: i32,
    int_class: i32,
    /// Interval class to the reference at the previous note.
    last_int_class: i32,
    mel: i32,
    last_mel: i32,
    same_dir: bool,
    pitch_class: i32,
    beat8: i32,
}

impl<'a> NoteContext<'a> {
    fn new(
        grid: &'a Grid,
        w: &'a PenaltyWeights,
        mode: Mode,
        n: usize,
        cp: i32,
        v: usize,
        species: Species,
    ) -> Self {
        debug_assert!(n >= 2, "the first note is given, never checked");
        let reference = |i: usize| if v == 1 { grid.cantus(i, v) } else { grid.bass(i, v) };
        let back = |k: usize| if n > k { grid.pitch(n - k, v) } else { 0 };

        let other0 = reference(n);
        let other1 = reference(n - 1);
        let other2 = if n > 2 { reference(n - 2) } else { 0 };
        let last_cp = back(1);
        let last_cp2 = back(2);
        let interval = cp - other0;
        let mel = cp - last_cp;
        let last_mel = if n > 2 { last_cp - last_cp2 } else { 0 };

        NoteContext {
            grid,
            w,
            mode,
            n,
            cp,
            v,
            num_parts: grid.num_parts(),
            species,
            other0,
            other1,
            other2,
            last_cp,
            last_cp2,
            last_cp3: back(3),
            last_cp4: back(4),
            interval,
            int_class: interval.abs() % 12,
            last_int_class: (last_cp - other1).abs() % 12,
            mel,
            last_mel,
            same_dir: mel * last_mel >= 0,
            pitch_class: cp.rem_euclid(12),
            beat8: grid.beat8(n, v),
        }
    }

    /// Pitch of this voice's note `i`, with the candidate at `n`.
    fn us(&self, i: usize) -> i32 {
        match i {
            0 => 0,
            i if i == self.n => self.cp,
            i => self.grid.pitch(i, self.v),
        }
    }

    fn dur(&self, i: usize) -> i32 {
        if i == 0 { 0 } else { self.grid.dur(i, self.v) }
    }

    fn is_last(&self) -> bool {
        self.grid.is_last(self.n, self.v)
    }

    fn is_next_to_last(&self) -> bool {
        self.grid.is_next_to_last(self.n, self.v)
    }

    fn is_down_beat(&self) -> bool {
        self.beat8 == 0
    }

    fn total_notes(&self) -> usize {
        self.grid.total_notes(self.v)
    }

    /// Interval class to the reference two notes back, if there is such a note.
    fn int_class_two_back(&self) -> Option<i32> {
        (self.n > 2).then(|| (self.last_cp2 - self.other2).abs() % 12)
    }
}

fn when(cond: bool, weight: u64) -> u64 {
    if cond { weight } else { 0 }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

fn range(c: &NoteContext<'_>) -> u64 {
    let pitch = c.cp + c.grid.base_pitch;
    when(!(LOWEST_PITCH..=HIGHEST_PITCH).contains(&pitch), c.w.out_of_range)
        + when(
            pitch > HIGHEST_PITCH - EXTREME_MARGIN || pitch < LOWEST_PITCH + EXTREME_MARGIN,
            c.w.extreme_range,
        )
}

/// In two-part writing a voice that starts below the cantus stays below.
fn cross_above_cantus(c: &NoteContext<'_>) -> u64 {
    let starts_below = c.grid.pitch(1, c.v) < c.grid.cantus(1, c.v);
    when(c.num_parts == 1 && starts_below && c.interval > UNISON, c.w.cross_above_cantus)
}

/// Diatonic pitches only, except the raised leading tone at the cadence.
fn mode_conformance(c: &NoteContext<'_>) -> u64 {
    let w = c.w;
    let in_mode = c.mode.contains(c.pitch_class);
    if !c.is_next_to_last() {
        let aeolian_fifth = c.species == Species::Second
            && c.n + 2 == c.total_notes()
            && c.mode == Mode::Aeolian
            && c.cp > c.other0
            && c.int_class == FIFTH;
        return when(!aeolian_fifth && !in_mode, w.out_of_mode);
    }

    if c.mode.is_leading_tone(c.pitch_class) {
        when(c.grid.doubled(c.pitch_class, c.n, c.v), w.doubled_leading_tone)
    } else if c.pitch_class == 10 {
        w.bad_cadence
    } else if !in_mode {
        w.out_of_mode
    } else if c.v == c.num_parts {
        let below_has_one = c.grid.doubled(11, c.n, c.v) || c.grid.doubled(10, c.n, c.v);
        when(!below_has_one, w.no_leading_tone)
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Dissonance legality
// ---------------------------------------------------------------------------

/// Is a dissonance against the reference allowed here? Whole notes and
/// first species never allow one; the other species each have their own
/// placements.
fn dissonance_legality(c: &NoteContext<'_>) -> u64 {
    if !is_dissonant(c.int_class) {
        return 0;
    }
    let step = interval::is_step(c.mel);
    let illegal = if c.dur(c.n) == WHOLE_NOTE {
        true
    } else {
        match c.species {
            Species::First => true,
            // Passing tones off the beat.
            Species::Second => c.is_down_beat() || !step,
            Species::Third => c.is_down_beat() || c.n == 1 || c.is_last() || !step,
            // Only a tied (repeated) downbeat may be dissonant; its
            // resolution is checked on the following upbeat.
            Species::Fourth => !c.is_down_beat() || c.n == 1 || c.is_last() || c.mel != UNISON,
            Species::Fifth => {
                if c.is_down_beat() {
                    c.cp != c.last_cp
                } else {
                    !step
                }
            }
        }
    };
    when(illegal, c.w.dissonance)
}

// ---------------------------------------------------------------------------
// Species idioms
// ---------------------------------------------------------------------------

/// The penultimate leading tone sits a fifth over the reference (a minor
/// sixth under it in Phrygian).
fn second_species_cadence(c: &NoteContext<'_>) -> u64 {
    if !(c.is_next_to_last() && (c.pitch_class == 11 || c.pitch_class == 10)) {
        return 0;
    }
    let wanted = if c.mode != Mode::Phrygian || c.interval >= 0 { FIFTH } else { MINOR_SIXTH };
    when(c.last_int_class != wanted, c.w.bad_cadence)
}

/// Fourth species: downbeats are tied over, dissonant ties resolve down by
/// step onto a consonance that leaves room for the next tie.
fn ligature(c: &NoteContext<'_>) -> u64 {
    let w = c.w;
    if c.is_down_beat() {
        return when(c.mel != UNISON, w.not_a_ligature);
    }
    if !is_dissonant(c.last_int_class) {
        return 0;
    }
    let resolves_down = c.mel == -MINOR_SECOND || c.mel == -MAJOR_SECOND;
    let unison_after_unison = c.int_class_two_back() == Some(UNISON);
    when(!resolves_down, w.unresolved_ligature)
        + when(
            c.int_class == UNISON && (c.interval < 0 || unison_after_unison),
            w.no_time_for_ligature,
        )
        + when(c.int_class == FIFTH || c.int_class == TRITONE, w.no_time_for_ligature)
}

/// Third and fifth species: downbeat arrivals and repeated notes late in
/// the bar.
fn florid_downbeat(c: &NoteContext<'_>) -> u64 {
    let w = c.w;
    let mut val = when((c.beat8 == 6 || c.beat8 == 7) && c.cp == c.last_cp, w.unison_on_beat_4);
    if c.beat8 != 0 {
        return val;
    }
    val += when(interval::is_skip(c.mel), w.skip_to_downbeat);
    if c.n > 2 && (c.int_class == UNISON || c.int_class == FIFTH) {
        // The same perfect interval on the previous downbeat.
        let i = if c.species == Species::Fifth {
            (1..c.n).rev().find(|&i| c.grid.beat8(i, c.v) == 0).unwrap_or(1)
        } else {
            c.n.saturating_sub(4).max(1)
        };
        let earlier = (c.us(i) - c.grid.bass(i, c.v)).abs() % 12;
        val += when(earlier == c.int_class, w.downbeat_unison);
    }
    val
}

/// A dissonance left by a third on beat 4 must be a cambiata, resolving up
/// by step.
fn cambiata(c: &NoteContext<'_>) -> u64 {
    let left_by_third = interval::is_third(c.last_mel.abs());
    let dissonance_before = c.int_class_two_back().is_some_and(is_dissonant);
    let bad_resolution = c.mel < 0 || !interval::is_step(c.mel);
    when(
        c.beat8 == 6 && left_by_third && dissonance_before && bad_resolution,
        c.w.not_a_cambiata,
    )
}

/// A passing dissonance on beat 3 may move on by a skip only when it
/// completes a seventh over the reference (or a fourth under it).
fn skip_after_passing(c: &NoteContext<'_>) -> bool {
    if interval::is_step(c.mel) {
        return false;
    }
    if c.interval >= 0 {
        !interval::is_seventh(c.last_int_class)
    } else {
        c.last_int_class != FOURTH
    }
}

fn third_species_dissonance(c: &NoteContext<'_>) -> u64 {
    if !is_dissonant(c.last_int_class) {
        return 0;
    }
    let steps_on = interval::is_step(c.mel) && interval::is_step(c.last_mel) && c.mel * c.last_mel >= 0;
    let illegal = match c.beat8 {
        0 | 6 => !steps_on,
        2 => true,
        4 => {
            let bad = !interval::is_step(c.last_mel)
                || c.mel.abs() > MAJOR_THIRD
                || c.mel == UNISON
                || c.last_mel * c.mel < 0;
            bad || skip_after_passing(c)
        }
        _ => false,
    };
    when(illegal, c.w.dissonance)
}

fn fifth_species_ties(c: &NoteContext<'_>) -> u64 {
    let w = c.w;
    let n = c.n;
    when(
        c.beat8 == 0 && c.cp != c.last_cp && c.dur(n) <= c.dur(n - 1),
        w.lesser_ligature,
    ) + when(
        n > 3
            && c.dur(n) == HALF_NOTE
            && c.beat8 == 4
            && c.dur(n - 1) == QUARTER_NOTE
            && c.dur(n - 2) == QUARTER_NOTE,
        w.half_untied,
    ) + when(
        c.dur(n) == EIGHTH_NOTE && c.is_down_beat() && is_dissonant(c.int_class),
        w.dissonance,
    )
}

/// How the previous note, if it was dissonant, is left. Depends on where
/// in the bar that note fell.
fn fifth_species_dissonance(c: &NoteContext<'_>) -> u64 {
    let w = c.w;
    let n = c.n;
    let last_dis = c.last_int_class;
    if !is_dissonant(last_dis) {
        return 0;
    }
    let step = interval::is_step(c.mel);
    let last_step = interval::is_step(c.last_mel);
    let reverses = c.mel * c.last_mel < 0;

    match c.grid.beat8(n - 1, c.v) {
        4 | 6 => {
            let held_fourth = last_dis == FOURTH
                && c.mel == UNISON
                && c.other0 == c.other1
                && c.beat8 == 0;
            let rushed = c.dur(n - 1) == EIGHTH_NOTE
                || (c.dur(n - 1) == QUARTER_NOTE && c.dur(n - 2) == HALF_NOTE);
            when(
                !held_fourth && (!step || !last_step || reverses || rushed),
                w.dissonance,
            )
        }
        1 | 3 | 5 | 7 => when(!step || !last_step || reverses, w.dissonance),
        0 => {
            // A suspension: tied into the downbeat, resolved down by step.
            let short_preparation = c.dur(n - 2) == EIGHTH_NOTE || c.dur(n - 2) < c.dur(n - 1);
            when(short_preparation, w.no_time_for_ligature)
                + when(c.mel != -MINOR_SECOND && c.mel != -MAJOR_SECOND, w.unresolved_ligature)
                + when(c.int_class == FOURTH || c.int_class == TRITONE, w.no_time_for_ligature)
                + when(c.int_class == FIFTH && c.interval < 0, w.no_time_for_ligature)
                + when(
                    c.int_class == UNISON && c.int_class_two_back() == Some(UNISON),
                    w.no_time_for_ligature,
                )
                + when(c.last_mel != UNISON, w.dissonance)
        }
        2 => {
            let bad = !last_step
                || c.mel.abs() > MAJOR_THIRD
                || c.mel == UNISON
                || c.dur(n - 1) == EIGHTH_NOTE
                || reverses;
            when(bad || skip_after_passing(c), w.dissonance)
        }
        _ => 0,
    }
}

fn fifth_species_motion(c: &NoteContext<'_>) -> u64 {
    let n = c.n;
    when(
        c.dur(n - 1) == EIGHTH_NOTE && !interval::is_step(c.mel),
        c.w.eighth_jump,
    ) + when(
        c.dur(n - 1) == HALF_NOTE && c.beat8 == 4 && c.mel == UNISON,
        c.w.unison_upbeat,
    )
}

// ---------------------------------------------------------------------------
// Other voices
// ---------------------------------------------------------------------------

/// Counts of chord members above the bass, by interval size:
/// 0 octave, 2 second, 3 third, 4 fourth, 5 fifth, 6 sixth, 7 seventh.
#[derive(Debug, Default)]
struct ChordTally([u8; 8]);

impl ChordTally {
    fn add(&mut self, semitones: i32) {
        let slot = match semitones.rem_euclid(12) {
            0 => 0,
            1 | 2 => 2,
            3 | 4 => 3,
            5 | 6 => 4,
            7 => 5,
            8 | 9 => 6,
            _ => 7,
        };
        self.0[slot] += 1;
    }

    fn count(&self, size: usize) -> u8 {
        self.0[size]
    }
}

/// Harmony between an upper voice and every voice below it. Voice 1 has
/// nothing below but the cantus, which the other stages already cover.
///
/// The chord-completeness checks only run for the top voice: when it is
/// written in a florid species its dissonances are not chord tones, so a
/// dissonant top voice skips the chord analysis altogether.
fn other_voices(c: &NoteContext<'_>) -> u64 {
    if c.v == 1 {
        return 0;
    }
    let w = c.w;
    let grid = c.grid;
    let (n, v, cp, last_cp) = (c.n, c.v, c.cp, c.last_cp);
    let top = v == c.num_parts;

    let bass = grid.bass(n, v);
    let int_bass = (cp - bass).rem_euclid(12);
    let mut val = when(cp <= bass, w.cross_below_bass)
        + when(int_bass == MAJOR_THIRD && !c.mode.contains(bass), w.augmented_interval);
    if top && is_dissonant(int_bass) {
        return val;
    }

    let mut chord = ChordTally::default();
    chord.add(int_bass);
    let mut all_skip = interval::is_skip(c.mel);

    for k in 0..v {
        let other0 = grid.other(n, v, k);
        let other1 = grid.other(n - 1, v, k);
        if !interval::is_skip(other0 - other1) {
            all_skip = false;
        }
        chord.add(other0 - bass);

        val += when(!c.is_last() && other0 == cp, w.unison);
        val += when(
            other0 != bass && (cp - other0).abs() >= OCTAVE + FIFTH,
            w.upper_voices_too_far_apart,
        );

        let int0 = (other0 - cp).abs() % 12;
        let int1 = (other1 - last_cp).abs() % 12;
        if int0 == int1 {
            val += match int0 {
                UNISON => w.parallel_unison,
                FIFTH => w.parallel_fifth,
                _ => 0,
            };
        }
        let standing_unison =
            n > 2 && (c.last_cp2 - grid.other(n - 2, v, k)).abs() % 12 == UNISON;
        val += when(int0 == UNISON && standing_unison, w.parallel_unison);
        val += when(int0 == TRITONE, w.vertical_tritone);

        if c.species == Species::Fifth {
            val += six_five(c, int_bass, other0, other1, int0, int1);
        }

        let motion = interval::motion(last_cp, cp, other1, other0);
        val += when(
            !c.is_last() && interval::direct_to_perfect(last_cp, cp, other1, other0),
            w.inner_voices_direct_to_perfect,
        );
        // An unraised leading tone against another voice's raised one.
        val += when(
            c.pitch_class == 10 && other0.rem_euclid(12) == 11,
            w.doubled_leading_tone,
        );
        val += when(
            motion == Motion::Direct && int0 == TRITONE,
            w.inner_voices_direct_to_tritone,
        );
        // Diminished fourth over a raised leading tone.
        val += when(
            c.pitch_class == 3 && other0.rem_euclid(12) == 11,
            w.augmented_interval,
        );
        val += when(motion != Motion::Contrary, w.not_contrary_to_others);
    }

    let thirds = chord.count(3);
    let sixths = chord.count(6);
    let fifths = chord.count(5);
    val += when(thirds > 1, w.third_doubled);
    val += when(thirds == 0 && sixths > 1, w.doubled_sixth);
    val += when(chord.count(0) > 2, w.tripled_bass);
    val += when(fifths > 1, w.doubled_fifth);
    val += when(top && !c.is_last() && thirds == 0 && sixths == 0, w.not_triad);
    val += when(top && all_skip, w.all_voices_skip);
    val += when(fifths > 0 && sixths > 0 && c.species != Species::Fifth, w.six_five_chord);
    val
}

/// Fifth species 6-5 figures against one lower voice: the dissonance
/// between the sixth and the fifth must be prepared and must resolve down.
fn six_five(
    c: &NoteContext<'_>,
    int_bass: i32,
    other0: i32,
    other1: i32,
    int0: i32,
    int1: i32,
) -> u64 {
    let w = c.w;
    let mut val = 0;
    if is_dissonant(int1) && int1 != FOURTH {
        let our_last = (c.last_cp - c.grid.bass(c.n - 1, c.v)).rem_euclid(12);
        if our_last == FIFTH {
            val += when(interval::is_skip(c.mel) || c.cp >= c.last_cp, w.unresolved_six_five);
        } else if our_last != UNISON {
            val += when(
                interval::is_skip(other0 - other1) || other0 >= other1,
                w.unresolved_six_five,
            );
        }
    }
    if is_dissonant(int0) && int0 != FOURTH && int_bass != UNISON {
        let unprepared = if int_bass == FIFTH {
            c.mel != UNISON
        } else {
            other0 != other1
        };
        val += when(unprepared, w.unprepared_six_five);
    }
    val
}

// ---------------------------------------------------------------------------
// Voice leading against the reference
// ---------------------------------------------------------------------------

fn direct_to_perfect(c: &NoteContext<'_>) -> u64 {
    if c.is_last() && c.num_parts != 1 {
        return 0;
    }
    if !interval::direct_to_perfect(c.last_cp, c.cp, c.other1, c.other0) {
        return 0;
    }
    if c.int_class == UNISON { c.w.direct_to_octave } else { c.w.direct_to_fifth }
}

fn parallel_perfects(c: &NoteContext<'_>) -> u64 {
    let same = c.int_class == c.last_int_class;
    when(same && c.int_class == FIFTH, c.w.parallel_fifth)
        + when(same && c.int_class == UNISON, c.w.parallel_unison)
}

/// First species, two parts: holding a pitch while the interval does not
/// change.
fn no_motion_against_octave(c: &NoteContext<'_>) -> u64 {
    when(
        c.species == Species::First
            && c.num_parts == 1
            && c.int_class == c.last_int_class
            && c.mel == UNISON,
        c.w.no_motion_against_octave,
    )
}

fn bad_melody(c: &NoteContext<'_>) -> u64 {
    when(interval::is_bad_melody(c.mel), c.w.bad_melody)
}

/// The last note is a unison or octave in two parts; with more voices an
/// upper voice may also end on a fifth or major third above the bass.
fn end_on_perfect(c: &NoteContext<'_>) -> u64 {
    if !c.is_last() || c.int_class == UNISON {
        return 0;
    }
    let allowed = c.num_parts > 1
        && c.interval >= 0
        && (c.int_class == FIFTH || c.int_class == MAJOR_THIRD);
    when(!allowed, c.w.end_on_perfect)
}

// ---------------------------------------------------------------------------
// Melodic shape
// ---------------------------------------------------------------------------

fn direct_motion(c: &NoteContext<'_>) -> u64 {
    if interval::motion(c.last_cp, c.cp, c.other1, c.other0) != Motion::Direct {
        return 0;
    }
    c.w.direct_motion + when(c.int_class == TRITONE, c.w.direct_to_fifth)
}

fn compound(c: &NoteContext<'_>) -> u64 {
    when(c.interval.abs() > OCTAVE, c.w.compound)
}

fn consecutive_skips(c: &NoteContext<'_>) -> u64 {
    if c.n <= 2 || !interval::consecutive_skips_same_direction(c.last_cp2, c.last_cp, c.cp) {
        return 0;
    }
    // Two skips may outline a triad or an octave, not a seventh.
    let span = (c.cp - c.last_cp2).abs();
    c.w.two_skips + when(span > MAJOR_SIXTH && span < OCTAVE, c.w.two_skips_not_in_triad)
}

fn skip_to_octave(c: &NoteContext<'_>) -> u64 {
    when(
        c.int_class == UNISON
            && (interval::is_skip(c.mel) || interval::is_skip(c.other0 - c.other1)),
        c.w.skip_to_octave,
    )
}

fn skip_from_unison(c: &NoteContext<'_>) -> u64 {
    when(c.other1 == c.last_cp && interval::is_skip(c.mel), c.w.skip_from_unison)
}

/// Skips should be approached and left by contrary motion; large ones
/// especially.
fn skips_in_same_direction(c: &NoteContext<'_>) -> u64 {
    if c.n <= 2 || !c.same_dir {
        return 0;
    }
    let w = c.w;
    let graded = |size: i32, small: u64, fifth: u64, sixth: u64| {
        if !interval::is_skip(size) {
            0
        } else if size.abs() < FIFTH {
            small
        } else if size.abs() == FIFTH || size.abs() == OCTAVE {
            fifth
        } else {
            sixth
        }
    };
    graded(
        c.mel,
        w.skip_preceded_by_same_direction,
        w.fifth_preceded_by_same_direction,
        w.sixth_preceded_by_same_direction,
    ) + graded(
        c.last_mel,
        w.skip_followed_by_same_direction,
        w.fifth_followed_by_same_direction,
        w.sixth_followed_by_same_direction,
    )
}

fn three_skips_in_a_row(c: &NoteContext<'_>) -> u64 {
    when(
        c.n > 4
            && interval::is_skip(c.mel)
            && interval::is_skip(c.last_mel)
            && interval::is_skip(c.last_cp2 - c.last_cp3),
        c.w.melodic_boredom,
    )
}

fn melodic_tritone(c: &NoteContext<'_>) -> u64 {
    let outlines = [c.last_cp2, c.last_cp3, c.last_cp4]
        .iter()
        .any(|&p| (c.cp - p).abs() == TRITONE);
    when(c.n > 4 && outlines, c.w.melodic_tritone)
}

fn tenth_to_octave(c: &NoteContext<'_>) -> u64 {
    when(
        c.species != Species::Fifth
            && c.num_parts == 1
            && interval::is_tenth(c.other1 - c.last_cp)
            && interval::is_octave(c.interval),
        c.w.tenth_to_octave,
    )
}

fn over_octave(c: &NoteContext<'_>) -> u64 {
    when(c.n > 2 && (c.cp - c.last_cp2).abs() > OCTAVE, c.w.over_octave)
}

/// The whole line stays within a twelfth. Early in a florid line the rule
/// waits until enough notes exist to judge.
fn over_twelfth(c: &NoteContext<'_>) -> u64 {
    let applies = c.n > 30 || c.species != Species::Fifth;
    when(
        applies && c.grid.total_range(c.n, c.cp, c.v) > OCTAVE + FIFTH,
        c.w.over_twelfth,
    )
}

// ---------------------------------------------------------------------------
// Repetition
// ---------------------------------------------------------------------------

/// Short figures repeated back to back (a-b-a-b, a-b-c-a-b-c, ...).
fn repeated_figures(c: &NoteContext<'_>) -> u64 {
    let w = c.w;
    let n = c.n;
    let us = |k: usize| c.us(n - k);
    let mut val = 0;
    if n > 3 && us(0) == us(2) && us(1) == us(3) {
        val += w.two_repeated_notes;
    }
    if n > 5 && us(0) == us(3) && us(1) == us(4) && us(2) == us(5) {
        val += w.three_repeated_notes;
    }
    if n > 6 && us(0) == us(4) && us(1) == us(5) && us(2) == us(6) {
        val += w.spread_three_repeated_notes;
    }
    if n > 7 && us(0) == us(4) && us(1) == us(5) && us(2) == us(6) && us(3) == us(7) {
        val += w.four_repeated_notes;
    }
    if n > 8 && us(0) == us(5) && us(1) == us(6) && us(2) == us(7) && us(3) == us(8) {
        val += w.four_repeated_notes;
    }
    val
}

fn unresolved_leading_tone(c: &NoteContext<'_>) -> u64 {
    let from_leading_tone = c.mode.is_leading_tone(c.last_cp.rem_euclid(12));
    when(
        c.is_last() && from_leading_tone && c.pitch_class != 0,
        c.w.unresolved_leading_tone,
    )
}

// ---------------------------------------------------------------------------
// Consonance preference
// ---------------------------------------------------------------------------

fn perfect_consonance(c: &NoteContext<'_>) -> u64 {
    when(is_perfect(c.int_class), c.w.perfect_consonance)
}

fn two_part_unison(c: &NoteContext<'_>) -> u64 {
    when(c.num_parts == 1 && c.interval == UNISON, c.w.unison)
}

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

fn pitch_repetition(c: &NoteContext<'_>) -> u64 {
    (c.grid.pitch_repeats(c.n, c.cp, c.v) / 2) as u64 * c.w.repeated_pitch
}

fn octave_and_sixth_leaps(c: &NoteContext<'_>) -> u64 {
    when(interval::is_octave(c.mel), c.w.octave_leap)
        + when(c.mel == MINOR_SIXTH, c.w.sixth_leap)
}

fn neighbours(c: &NoteContext<'_>) -> u64 {
    if c.n <= 2 || !interval::is_step(c.mel) || c.cp != c.last_cp2 {
        return 0;
    }
    if c.mel < 0 { c.w.upper_neighbor } else { c.w.lower_neighbor }
}

/// A chromatic note may not be reached by a rising semitone, a rising minor
/// sixth or a falling major third (the unraised form right before the
/// raised one, diminished fourths, augmented fifths).
fn chromatic_approach(c: &NoteContext<'_>) -> u64 {
    when(
        !c.mode.contains(c.pitch_class)
            && (c.mel == MINOR_SECOND || c.mel == MINOR_SIXTH || c.mel == -MAJOR_THIRD),
        c.w.out_of_mode,
    )
}

fn leap_back(c: &NoteContext<'_>) -> u64 {
    if c.n <= 2 || c.same_dir || !interval::is_skip(c.mel) || !interval::is_skip(c.last_mel) {
        return 0;
    }
    let excess = (c.mel.abs() + c.last_mel.abs() - MINOR_SIXTH).max(0) as u64;
    excess * c.w.leap_back
        + when(
            c.n > 3 && interval::is_skip(c.last_cp2 - c.last_cp3),
            c.w.three_skips,
        )
}

fn leap_at_cadence(c: &NoteContext<'_>) -> u64 {
    when(
        c.num_parts == 1 && c.n + 4 >= c.total_notes() && c.mel.abs() > MAJOR_THIRD,
        c.w.leap_at_cadence,
    )
}

/// Two-part writing: a line that keeps crossing the cantus is tangled.
fn entanglement(c: &NoteContext<'_>) -> u64 {
    if c.num_parts != 1 {
        return 0;
    }
    let side = |k: usize| c.us(k) - c.grid.cantus(k, c.v);
    let crossings = (4..=c.n).filter(|&k| side(k) * side(k - 1) < 0).count() as u64;
    crossings.saturating_sub(2) * c.w.entanglement
}

fn repetition_on_upbeat(c: &NoteContext<'_>) -> u64 {
    when(!c.is_down_beat() && c.mel == UNISON, c.w.repetition_on_upbeat)
}

fn lydian_cadential_tritone(c: &NoteContext<'_>) -> u64 {
    when(
        c.mode == Mode::Lydian && c.n + 4 > c.total_notes() && c.pitch_class == 6,
        c.w.lydian_cadential_tritone,
    )
}

/// Downbeats in the moving species.
fn downbeat(c: &NoteContext<'_>) -> u64 {
    if c.species == Species::First || !c.is_down_beat() {
        return 0;
    }
    let w = c.w;
    let mut val = 0;
    if matches!(c.species, Species::Second | Species::Third) {
        val += when(c.mel == UNISON && !c.is_last(), w.unison_downbeat);
        // An offbeat dissonance must be a passing tone filling a third.
        val += when(
            is_dissonant(c.last_int_class) && (!interval::is_step(c.mel) || !c.same_dir),
            w.dissonance_not_filling_third,
        );
    }
    // Direct fifths or octaves from the previous downbeat, barely broken up
    // by the intervening note.
    val += when(
        c.n > 2
            && interval::direct_to_perfect(c.last_cp2, c.cp, c.other2, c.other0)
            && c.last_mel.abs() < FOURTH,
        w.direct_perfect_on_downbeat,
    );
    val
}

fn vertical_tritone(c: &NoteContext<'_>) -> u64 {
    when(c.int_class == TRITONE, c.w.vertical_tritone)
}

fn interval_variety(c: &NoteContext<'_>) -> u64 {
    when(c.n > 10 && too_much_of_interval(c), c.w.melodic_boredom)
}

/// Has the candidate's melodic interval size been used more than six times
/// as often as any other size so far?
fn too_much_of_interval(c: &NoteContext<'_>) -> bool {
    let slot = |iv: i32| (interval::size(iv) + 8) as usize;
    let mut counts = [0u32; 17];
    for i in 2..c.n {
        counts[slot(c.us(i) - c.us(i - 1))] += 1;
    }
    let ours = slot(c.mel);
    let mut busiest_other = 0;
    for i in 1..counts.len() {
        if i != ours && counts[i] > counts[busiest_other] {
            busiest_other = i;
        }
    }
    counts[ours] > counts[busiest_other] + 6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::FORBIDDEN;

    /// D F E D G F A G F E D, stored relative to D: 48 51 50 48 53 51 55 53 51 50 48.
    fn dorian_grid(species_durs: &[i32], start: i32) -> Grid {
        let mut grid = Grid::new(&[50, 53, 52, 50, 55, 53, 57, 55, 53, 52, 50]).unwrap();
        grid.add_voice(species_durs, start).unwrap();
        grid
    }

    fn whole_notes() -> Vec<i32> {
        vec![WHOLE_NOTE; 11]
    }

    fn half_notes() -> Vec<i32> {
        let mut durs = vec![HALF_NOTE; 20];
        durs.push(WHOLE_NOTE);
        durs
    }

    fn set_line(grid: &mut Grid, v: usize, pitches: &[i32]) {
        for (i, &p) in pitches.iter().enumerate() {
            grid.set_pitch(i + 1, v, p);
        }
    }

    fn ctx<'a>(
        grid: &'a Grid,
        w: &'a PenaltyWeights,
        n: usize,
        cp: i32,
        v: usize,
        species: Species,
    ) -> NoteContext<'a> {
        NoteContext::new(grid, w, Mode::Dorian, n, cp, v, species)
    }

    #[test]
    fn range_penalizes_outside_and_edges() {
        let w = PenaltyWeights::default();
        let grid = dorian_grid(&whole_notes(), 57);
        // Relative 71 is absolute 73, past the top.
        assert_eq!(range(&ctx(&grid, &w, 2, 71, 1, Species::First)), w.out_of_range + w.extreme_range);
        // Absolute 70 is in range but near the edge.
        assert_eq!(range(&ctx(&grid, &w, 2, 68, 1, Species::First)), w.extreme_range);
        assert_eq!(range(&ctx(&grid, &w, 2, 55, 1, Species::First)), 0);
    }

    #[test]
    fn parallel_fifths_are_forbidden() {
        let w = PenaltyWeights::default();
        let evaluator = Evaluator::new(&w, Mode::Dorian);
        // Voice starts a fifth above the cantus (48 + 7).
        let grid = dorian_grid(&whole_notes(), 57);
        let c = ctx(&grid, &w, 2, 51 + FIFTH, 1, Species::First);
        assert_eq!(parallel_perfects(&c), FORBIDDEN);
        assert!(evaluator.check(&grid, 2, 51 + FIFTH, 1, Species::First, u64::MAX) >= FORBIDDEN);
        // A sixth instead is fine.
        let c = ctx(&grid, &w, 2, 51 + MAJOR_SIXTH - 1, 1, Species::First);
        assert_eq!(parallel_perfects(&c), 0);
    }

    #[test]
    fn last_note_must_be_unison_or_octave_in_two_parts() {
        let w = PenaltyWeights::default();
        let grid = dorian_grid(&whole_notes(), 57);
        assert_eq!(end_on_perfect(&ctx(&grid, &w, 11, 48 + FIFTH, 1, Species::First)), FORBIDDEN);
        assert_eq!(end_on_perfect(&ctx(&grid, &w, 11, 60, 1, Species::First)), 0);
        assert_eq!(end_on_perfect(&ctx(&grid, &w, 11, 48, 1, Species::First)), 0);
        // Not the last note: no opinion.
        assert_eq!(end_on_perfect(&ctx(&grid, &w, 10, 55, 1, Species::First)), 0);
    }

    #[test]
    fn cadence_needs_a_raised_leading_tone() {
        let w = PenaltyWeights::default();
        let grid = dorian_grid(&whole_notes(), 57);
        // Note 10 is the penultimate; C# (relative 11) is the leading tone.
        assert_eq!(mode_conformance(&ctx(&grid, &w, 10, 59, 1, Species::First)), 0);
        // Unraised C (relative 10).
        assert_eq!(mode_conformance(&ctx(&grid, &w, 10, 58, 1, Species::First)), w.bad_cadence);
        // Diatonic but no leading tone anywhere below.
        assert_eq!(mode_conformance(&ctx(&grid, &w, 10, 62, 1, Species::First)), w.no_leading_tone);
        // Chromatic elsewhere in the line.
        assert_eq!(mode_conformance(&ctx(&grid, &w, 5, 59, 1, Species::First)), w.out_of_mode);
    }

    #[test]
    fn fourth_species_suspension_must_resolve_down_by_step() {
        let w = PenaltyWeights::default();
        let mut grid = dorian_grid(&half_notes(), 57);
        // Cantus bar 1 = 48, bar 2 = 51. Note 2 (upbeat of bar 1) is a
        // sixth over 48 and is tied into note 3, a tritone over 51.
        set_line(&mut grid, 1, &[55, 57, 57]);

        let tied = ctx(&grid, &w, 3, 57, 1, Species::Fourth);
        assert_eq!(dissonance_legality(&tied), 0, "a tied dissonance is allowed");
        assert_eq!(ligature(&tied), 0);

        // Note 4 is the upbeat of bar 2.
        let resolved = ctx(&grid, &w, 4, 55, 1, Species::Fourth);
        assert_eq!(ligature(&resolved), 0);
        let held = ctx(&grid, &w, 4, 57, 1, Species::Fourth);
        assert!(ligature(&held) >= w.unresolved_ligature);
        let upward = ctx(&grid, &w, 4, 58, 1, Species::Fourth);
        assert!(ligature(&upward) >= w.unresolved_ligature);
    }

    #[test]
    fn untied_fourth_species_downbeat_is_not_a_ligature() {
        let w = PenaltyWeights::default();
        let mut grid = dorian_grid(&half_notes(), 57);
        set_line(&mut grid, 1, &[55, 57]);
        assert_eq!(ligature(&ctx(&grid, &w, 3, 55, 1, Species::Fourth)), w.not_a_ligature);
    }

    #[test]
    fn second_species_allows_stepwise_passing_dissonance() {
        let w = PenaltyWeights::default();
        let mut grid = dorian_grid(&half_notes(), 60);
        set_line(&mut grid, 1, &[60]);
        // Note 2 is the upbeat over 48: 58 is a minor seventh, reached by step.
        assert_eq!(dissonance_legality(&ctx(&grid, &w, 2, 58, 1, Species::Second)), 0);
        // The same dissonance reached by a skip.
        set_line(&mut grid, 1, &[55]);
        assert_eq!(
            dissonance_legality(&ctx(&grid, &w, 2, 58, 1, Species::Second)),
            w.dissonance
        );
        // Never on a downbeat: note 3 over 51, a second above.
        set_line(&mut grid, 1, &[55, 55]);
        assert_eq!(
            dissonance_legality(&ctx(&grid, &w, 3, 53, 1, Species::Second)),
            w.dissonance
        );
    }

    #[test]
    fn limit_cuts_evaluation_short() {
        let w = PenaltyWeights::default();
        let evaluator = Evaluator::new(&w, Mode::Dorian);
        let grid = dorian_grid(&whole_notes(), 57);
        let full = evaluator.check(&grid, 2, 71, 1, Species::First, u64::MAX);
        let cut = evaluator.check(&grid, 2, 71, 1, Species::First, 1);
        assert!(cut >= 1);
        assert!(cut <= full);
        // Under a generous limit the full total comes back.
        assert_eq!(evaluator.check(&grid, 2, 71, 1, Species::First, full + 1), full);
    }

    #[test]
    fn upper_voice_unison_and_crossing() {
        let w = PenaltyWeights::default();
        let mut grid = dorian_grid(&whole_notes(), 45);
        grid.add_voice(&whole_notes(), 57).unwrap();
        set_line(&mut grid, 1, &[43, 45]);
        set_line(&mut grid, 2, &[55]);
        // Voice 2 in unison with voice 1 at note 2.
        let c = ctx(&grid, &w, 2, 45, 2, Species::First);
        let val = other_voices(&c);
        assert!(val >= w.unison);
        // Bass is voice 1 (45 < cantus 51), so 45 is not above it.
        assert!(val >= w.cross_below_bass);
        // Voice 1 has nothing below it but the cantus.
        assert_eq!(other_voices(&ctx(&grid, &w, 2, 45, 1, Species::First)), 0);
    }

    #[test]
    fn chord_tally_buckets() {
        let mut chord = ChordTally::default();
        for iv in [0, 12, 4, 15, 7, 9, 10] {
            chord.add(iv);
        }
        assert_eq!(chord.count(0), 2);
        assert_eq!(chord.count(3), 2);
        assert_eq!(chord.count(5), 1);
        assert_eq!(chord.count(6), 1);
        assert_eq!(chord.count(7), 1);
    }

    #[test]
    fn repeated_pitch_overuse_is_boring() {
        let w = PenaltyWeights::default();
        let mut durs = vec![QUARTER_NOTE; 40];
        durs.push(WHOLE_NOTE);
        let mut grid = dorian_grid(&durs, 57);
        // Eleven notes on one pitch: ten unisons already, one more coming.
        set_line(&mut grid, 1, &[55; 11]);
        assert!(too_much_of_interval(&ctx(&grid, &w, 12, 55, 1, Species::Third)));
        assert!(!too_much_of_interval(&ctx(&grid, &w, 12, 57, 1, Species::Third)));
    }

    #[test]
    fn crossing_count_includes_the_candidate() {
        let w = PenaltyWeights::default();
        let mut grid = dorian_grid(&whole_notes(), 57);
        // Above, below, above, below against 48 51 50 48 53.
        set_line(&mut grid, 1, &[55, 48, 55, 45, 57]);
        // Crossings at notes 4 and 5 are free; a third one at note 6 is not.
        let c = ctx(&grid, &w, 6, 48, 1, Species::First);
        assert_eq!(entanglement(&c), w.entanglement);
        let c = ctx(&grid, &w, 6, 55, 1, Species::First);
        assert_eq!(entanglement(&c), 0);
    }

    #[test]
    fn score_grid_sums_every_note() {
        let w = PenaltyWeights::default();
        let evaluator = Evaluator::new(&w, Mode::Dorian);
        let mut grid = dorian_grid(&whole_notes(), 57);
        let line = [55, 53, 55, 57, 60, 56, 60, 62, 60, 59, 60];
        set_line(&mut grid, 1, &line);
        let by_hand: u64 = (2..=11)
            .map(|n| evaluator.check(&grid, n, line[n - 1], 1, Species::First, u64::MAX))
            .sum();
        assert_eq!(score_grid(&grid, &evaluator, Species::First), by_hand);
    }
}
