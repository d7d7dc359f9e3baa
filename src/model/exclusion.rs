//! Per-step exclusion set.
//!
//! Membership is a generation stamp per symbol, so clearing between coding
//! steps is a counter bump instead of a sweep over the alphabet.

/// Symbols ruled out during the current coding step.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    /// `stamps[s] == generation` marks `s` as excluded. Grows on demand.
    stamps: Vec<u32>,
    generation: u32,
    /// Members of the current generation, in insertion order
    members: Vec<u32>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self {
            stamps: Vec::new(),
            generation: 1,
            members: Vec::new(),
        }
    }

    /// Empty the set.
    pub fn clear(&mut self) {
        self.members.clear();
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // Wrapped around - old stamps could alias, so wipe them
            self.generation = 1;
            self.stamps.fill(0);
        }
    }

    /// Add `symbol`. Returns false if it was already present.
    pub fn insert(&mut self, symbol: u32) -> bool {
        let index = symbol as usize;
        if index >= self.stamps.len() {
            self.stamps.resize(index + 1, 0);
        }
        if self.stamps[index] == self.generation {
            return false;
        }
        self.stamps[index] = self.generation;
        self.members.push(symbol);
        true
    }

    #[inline]
    pub fn contains(&self, symbol: u32) -> bool {
        self.stamps
            .get(symbol as usize)
            .is_some_and(|&stamp| stamp == self.generation)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending order.
    pub fn sorted(&mut self) -> &[u32] {
        self.members.sort_unstable();
        &self.members
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new()
    }
}
