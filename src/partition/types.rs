//! Width table and partition outcome types.

use std::collections::BTreeMap;

use crate::layout::{BlockKey, FixtureId};

/// Allotted extent of one sub-group within its larger-block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpan {
    pub key: BlockKey,
    /// Narrowest per-run consumed width.
    pub min_width: f64,
    /// Widest per-run consumed width; the sub-group's partitioned size.
    pub max_width: f64,
    /// Offset from the larger-block origin.
    pub start: f64,
    /// `start + max_width`.
    pub end: f64,
    /// Leftmost placement position, used for ordering.
    pub min_x: f64,
    /// Runs holding at least one placement of the sub-group.
    pub runs: Vec<FixtureId>,
}

impl BlockSpan {
    pub fn size(&self) -> f64 {
        self.max_width
    }
}

/// Sub-group spans per larger-block, ordered left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidthTable {
    pub groups: BTreeMap<String, Vec<BlockSpan>>,
}

impl WidthTable {
    pub fn get(&self, key: &BlockKey) -> Option<&BlockSpan> {
        self.groups
            .get(&key.larger)?
            .iter()
            .find(|s| &s.key == key)
    }

    /// All spans, larger-block by larger-block.
    pub fn spans(&self) -> impl Iterator<Item = &BlockSpan> {
        self.groups.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Divider offsets of a larger-block: the end of every sub-group but
    /// the last.
    pub fn boundaries(&self, larger: &str) -> Vec<f64> {
        let Some(spans) = self.groups.get(larger) else {
            return Vec::new();
        };
        spans
            .iter()
            .take(spans.len().saturating_sub(1))
            .map(|s| s.end)
            .collect()
    }

    /// Total extent of a larger-block, dividers included.
    pub fn extent(&self, larger: &str) -> f64 {
        self.groups
            .get(larger)
            .and_then(|spans| spans.last())
            .map_or(0.0, |s| s.end)
    }
}

/// Result of a mutating partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionOutcome {
    pub table: WidthTable,
    /// Divider fixtures created, in creation order.
    pub dividers: Vec<FixtureId>,
    /// Runs whose partitioned extent exceeds their capacity.
    pub underflow_runs: Vec<FixtureId>,
    /// Placements re-laid onto their runs.
    pub relaid: usize,
    /// Set when the layout has a single divider-block and was left as is.
    pub skipped: bool,
}
