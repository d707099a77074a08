// Candidate pitches for a voice's next note.
//
// Every decision tries the same 16 melodic offsets from the voice's previous
// pitch, small and common intervals first. Trying likely winners early fills
// the search's leaderboard with low penalties sooner, which tightens its
// admission bound and prunes more of the remaining offsets.

/// Signed semitone offsets, in trial order.
pub const CANDIDATE_OFFSETS: [i32; 16] = [1, -1, 2, -2, 3, -3, 0, 4, -4, 5, 7, -5, 8, 12, -7, -12];

/// Trial pitches following `last_pitch`, paired with their offset index.
/// The index is what the leaderboard stores; `pitch_for` turns it back into
/// a pitch once the previous note is known again.
pub fn candidates(last_pitch: i32) -> impl Iterator<Item = (usize, i32)> {
    CANDIDATE_OFFSETS
        .iter()
        .enumerate()
        .map(move |(i, &offset)| (i, last_pitch + offset))
}

pub fn pitch_for(last_pitch: i32, choice: usize) -> i32 {
    last_pitch + CANDIDATE_OFFSETS[choice]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_distinct_offsets() {
        let mut sorted = CANDIDATE_OFFSETS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 16);
        assert!(sorted.contains(&0));
        assert_eq!(sorted.first(), Some(&-12));
        assert_eq!(sorted.last(), Some(&12));
    }

    #[test]
    fn steps_are_tried_first() {
        let first_four: Vec<i32> = candidates(60).take(4).map(|(_, p)| p - 60).collect();
        assert_eq!(first_four, vec![1, -1, 2, -2]);
    }

    #[test]
    fn choice_index_recovers_pitch() {
        for (i, pitch) in candidates(45) {
            assert_eq!(pitch_for(45, i), pitch);
        }
    }
}
