//! Generation-scoped memo tables.
//!
//! A generation lasts from one facing-count change to the next. The
//! tables are keyed by stable placement identity and are rebuilt from
//! empty for every generation; nothing survives a mutation.

use std::collections::HashMap;

use super::types::Predicate;
use crate::layout::{BlockKey, PlacementId};

#[derive(Debug, Default)]
pub struct GenerationCache {
    generation: u64,
    scores: HashMap<PlacementId, f64>,
    predicates: HashMap<(PlacementId, Predicate), bool>,
    block_scores: HashMap<BlockKey, f64>,
}

impl GenerationCache {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn score(&self, id: PlacementId) -> Option<f64> {
        self.scores.get(&id).copied()
    }

    pub fn store_score(&mut self, id: PlacementId, score: f64) {
        self.scores.insert(id, score);
    }

    pub fn predicate(&self, id: PlacementId, predicate: Predicate) -> Option<bool> {
        self.predicates.get(&(id, predicate)).copied()
    }

    pub fn store_predicate(&mut self, id: PlacementId, predicate: Predicate, value: bool) {
        self.predicates.insert((id, predicate), value);
    }

    pub fn block_score(&self, key: &BlockKey) -> Option<f64> {
        self.block_scores.get(key).copied()
    }

    pub fn store_block_score(&mut self, key: BlockKey, score: f64) {
        self.block_scores.insert(key, score);
    }

    /// Number of memoized entries of all kinds.
    pub fn len(&self) -> usize {
        self.scores.len() + self.predicates.len() + self.block_scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_generation_is_empty() {
        let mut cache = GenerationCache::new(3);
        cache.store_score(PlacementId(1), 2.0);
        cache.store_predicate(PlacementId(1), Predicate::A, true);
        cache.store_block_score(BlockKey::new("a", "b"), 1.0);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.predicate(PlacementId(1), Predicate::A), Some(true));
        assert_eq!(cache.predicate(PlacementId(1), Predicate::I), None);

        let next = GenerationCache::new(cache.generation() + 1);
        assert!(next.is_empty());
        assert_eq!(next.generation(), 4);
    }
}
