// Penalty weights for every part-writing rule the evaluator applies.
//
// A weight of FORBIDDEN marks a rule that must never be broken. It is an
// ordinary number, large enough that no sum of finite penalties reaches it,
// so the evaluator never rejects a pitch outright: it only scores it, and
// the search's bound (which starts at FORBIDDEN) does the rejecting.
//
// The defaults reproduce the classic hand-tuned table. A JSON file may
// override any subset of them; missing fields keep their default.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The "never" weight. Also the initial search ceiling.
pub const FORBIDDEN: u64 = 1_000_000;
pub const BAD: u64 = 100;
pub const REAL_BAD: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    // Placement
    pub out_of_range: u64,
    pub extreme_range: u64,
    pub cross_above_cantus: u64,
    pub out_of_mode: u64,
    pub doubled_leading_tone: u64,
    pub bad_cadence: u64,
    pub no_leading_tone: u64,

    // Dissonance and species idioms
    pub dissonance: u64,
    pub not_a_ligature: u64,
    pub unresolved_ligature: u64,
    pub no_time_for_ligature: u64,
    pub lesser_ligature: u64,
    pub half_untied: u64,
    pub eighth_jump: u64,
    pub unison_upbeat: u64,
    pub unison_on_beat_4: u64,
    pub skip_to_downbeat: u64,
    pub downbeat_unison: u64,
    pub not_a_cambiata: u64,

    // Other voices
    pub cross_below_bass: u64,
    pub augmented_interval: u64,
    pub unison: u64,
    pub upper_voices_too_far_apart: u64,
    pub parallel_unison: u64,
    pub parallel_fifth: u64,
    pub vertical_tritone: u64,
    pub unresolved_six_five: u64,
    pub unprepared_six_five: u64,
    pub inner_voices_direct_to_perfect: u64,
    pub inner_voices_direct_to_tritone: u64,
    pub not_contrary_to_others: u64,
    pub third_doubled: u64,
    pub doubled_sixth: u64,
    pub tripled_bass: u64,
    pub doubled_fifth: u64,
    pub not_triad: u64,
    pub all_voices_skip: u64,
    pub six_five_chord: u64,

    // Voice leading against the reference voice
    pub direct_to_octave: u64,
    pub direct_to_fifth: u64,
    pub no_motion_against_octave: u64,
    pub bad_melody: u64,
    pub end_on_perfect: u64,
    pub direct_motion: u64,
    pub compound: u64,

    // Melodic shape
    pub two_skips: u64,
    pub two_skips_not_in_triad: u64,
    pub skip_to_octave: u64,
    pub skip_from_unison: u64,
    pub skip_preceded_by_same_direction: u64,
    pub fifth_preceded_by_same_direction: u64,
    pub sixth_preceded_by_same_direction: u64,
    pub skip_followed_by_same_direction: u64,
    pub fifth_followed_by_same_direction: u64,
    pub sixth_followed_by_same_direction: u64,
    pub melodic_boredom: u64,
    pub melodic_tritone: u64,
    pub tenth_to_octave: u64,
    pub over_octave: u64,
    pub over_twelfth: u64,

    // Repetition
    pub two_repeated_notes: u64,
    pub three_repeated_notes: u64,
    /// A three-note figure coming back after one intervening note.
    pub spread_three_repeated_notes: u64,
    pub four_repeated_notes: u64,
    pub unresolved_leading_tone: u64,

    // Style
    pub perfect_consonance: u64,
    /// Charged once per two earlier occurrences of the same pitch.
    pub repeated_pitch: u64,
    pub octave_leap: u64,
    pub sixth_leap: u64,
    pub upper_neighbor: u64,
    pub lower_neighbor: u64,
    /// Per semitone by which a leap and its opposite leap exceed a minor sixth.
    pub leap_back: u64,
    pub three_skips: u64,
    pub leap_at_cadence: u64,
    /// Per crossing of the cantus beyond the second.
    pub entanglement: u64,
    pub repetition_on_upbeat: u64,
    pub lydian_cadential_tritone: u64,
    pub unison_downbeat: u64,
    pub dissonance_not_filling_third: u64,
    pub direct_perfect_on_downbeat: u64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        PenaltyWeights {
            out_of_range: REAL_BAD,
            extreme_range: 5,
            cross_above_cantus: FORBIDDEN,
            out_of_mode: FORBIDDEN,
            doubled_leading_tone: FORBIDDEN,
            bad_cadence: FORBIDDEN,
            no_leading_tone: FORBIDDEN,

            dissonance: FORBIDDEN,
            not_a_ligature: 21,
            unresolved_ligature: FORBIDDEN,
            no_time_for_ligature: FORBIDDEN,
            lesser_ligature: 8,
            half_untied: 13,
            eighth_jump: BAD,
            unison_upbeat: 21,
            unison_on_beat_4: 3,
            skip_to_downbeat: 1,
            downbeat_unison: BAD,
            not_a_cambiata: FORBIDDEN,

            cross_below_bass: FORBIDDEN,
            augmented_interval: FORBIDDEN,
            unison: BAD,
            upper_voices_too_far_apart: 1,
            parallel_unison: FORBIDDEN,
            parallel_fifth: FORBIDDEN,
            vertical_tritone: 2,
            unresolved_six_five: BAD,
            unprepared_six_five: BAD,
            inner_voices_direct_to_perfect: 21,
            inner_voices_direct_to_tritone: 13,
            not_contrary_to_others: 1,
            third_doubled: 5,
            doubled_sixth: 5,
            tripled_bass: 3,
            doubled_fifth: 3,
            not_triad: 34,
            all_voices_skip: 8,
            six_five_chord: FORBIDDEN,

            direct_to_octave: REAL_BAD,
            direct_to_fifth: REAL_BAD,
            no_motion_against_octave: 34,
            bad_melody: FORBIDDEN,
            end_on_perfect: FORBIDDEN,
            direct_motion: 1,
            compound: 1,

            two_skips: 1,
            two_skips_not_in_triad: 3,
            skip_to_octave: 8,
            skip_from_unison: 4,
            skip_preceded_by_same_direction: 1,
            fifth_preceded_by_same_direction: 3,
            sixth_preceded_by_same_direction: 8,
            skip_followed_by_same_direction: 3,
            fifth_followed_by_same_direction: 8,
            sixth_followed_by_same_direction: 34,
            melodic_boredom: 1,
            melodic_tritone: 8,
            tenth_to_octave: 8,
            over_octave: BAD,
            over_twelfth: FORBIDDEN,

            two_repeated_notes: 2,
            three_repeated_notes: 4,
            spread_three_repeated_notes: 3,
            four_repeated_notes: 7,
            unresolved_leading_tone: FORBIDDEN,

            perfect_consonance: 2,
            repeated_pitch: 1,
            octave_leap: 5,
            sixth_leap: 2,
            upper_neighbor: 1,
            lower_neighbor: 1,
            leap_back: 1,
            three_skips: 3,
            leap_at_cadence: 13,
            entanglement: 3,
            repetition_on_upbeat: BAD,
            lydian_cadential_tritone: 13,
            unison_downbeat: 3,
            dissonance_not_filling_third: FORBIDDEN,
            direct_perfect_on_downbeat: FORBIDDEN,
        }
    }
}

impl PenaltyWeights {
    /// Load weights from a JSON file. Fields absent from the file keep
    /// their default value.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let weights = serde_json::from_str(&data)?;
        Ok(weights)
    }
}
