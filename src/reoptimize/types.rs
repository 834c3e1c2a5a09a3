//! Ceiling table and re-optimization results.

use std::collections::BTreeMap;

use crate::allocation::AllocationResult;
use crate::layout::blocks::block_widths;
use crate::layout::{BlockKey, Layout};

/// Maximum consumable width per (larger-block, divider-block).
///
/// Built from a completed first pass and read only by the second pass's
/// space predicate. A block missing from the table is ineligible there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CeilingTable {
    ceilings: BTreeMap<BlockKey, f64>,
}

impl CeilingTable {
    /// Widest per-run consumed width of every block in the layout.
    pub fn from_layout(layout: &Layout) -> Self {
        let ceilings = block_widths(layout)
            .into_iter()
            .map(|(key, width)| {
                let max = width.max_width();
                (key, max)
            })
            .collect();
        Self { ceilings }
    }

    pub fn insert(&mut self, key: BlockKey, ceiling: f64) {
        self.ceilings.insert(key, ceiling);
    }

    pub fn get(&self, key: &BlockKey) -> Option<f64> {
        self.ceilings.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockKey, f64)> {
        self.ceilings.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.ceilings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ceilings.is_empty()
    }
}

/// Result of preparing and running the second pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReoptimizeResult {
    pub ceilings: CeilingTable,
    /// Divider fixtures removed before measuring.
    pub dividers_removed: usize,
    /// Placements whose facings were reset.
    pub reset: usize,
    pub allocation: AllocationResult,
}
