// Bounded, sorted list of the best assignments found at one decision point.
//
// An assignment is one candidate choice per voice that needs a note at the
// decision's time, together with its combined penalty. The board keeps at
// most `capacity` of them, best first. A new entry is placed after every
// entry with an equal penalty, so among ties the earlier one wins; once the
// board is full an entry no better than the worst kept one is turned away.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub penalty: u64,
    /// Candidate index per deciding voice, in the order the voices were
    /// enumerated.
    pub choices: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Leaderboard {
    capacity: usize,
    entries: Vec<Entry>,
}

impl Leaderboard {
    pub fn new(capacity: usize) -> Self {
        Leaderboard {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Penalty a new entry must beat to get in, once the board is full.
    pub fn admission_bound(&self) -> Option<u64> {
        if self.is_full() {
            self.entries.last().map(|e| e.penalty)
        } else {
            None
        }
    }

    /// Offer an assignment. Returns whether it was kept.
    pub fn insert(&mut self, penalty: u64, choices: &[usize]) -> bool {
        let pos = self.entries.partition_point(|e| e.penalty <= penalty);
        if pos >= self.capacity {
            return false;
        }
        self.entries.insert(
            pos,
            Entry {
                penalty,
                choices: choices.to_vec(),
            },
        );
        self.entries.truncate(self.capacity);
        true
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
