//! Grouping of placements by classification.
//!
//! A block is not stored anywhere; it is an index over placements keyed
//! by (larger-block, divider-block), rebuilt whenever grouping is needed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use super::types::{FixtureId, Layout, Placement, Product};

/// Grouping key: (larger-block, divider-block).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockKey {
    pub larger: String,
    pub divider: String,
}

impl BlockKey {
    pub fn new(larger: impl Into<String>, divider: impl Into<String>) -> Self {
        Self {
            larger: larger.into(),
            divider: divider.into(),
        }
    }

    /// Key for a product, or `None` when either tag is missing.
    pub fn of(product: &Product) -> Option<Self> {
        let c = &product.classification;
        Some(Self::new(c.larger_block()?, c.divider_block()?))
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.larger, self.divider)
    }
}

/// Per-block consumed width, split by fixture run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockWidth {
    /// Σ merch width × facings on each run.
    pub per_run: BTreeMap<FixtureId, f64>,
    /// Leftmost placement position in the block.
    pub min_x: f64,
}

impl BlockWidth {
    /// The block's minimum partitioned size: its widest run.
    pub fn max_width(&self) -> f64 {
        self.per_run.values().copied().fold(0.0, f64::max)
    }

    pub fn on_run(&self, run: FixtureId) -> f64 {
        self.per_run.get(&run).copied().unwrap_or(0.0)
    }
}

/// Run head of each fixture.
pub fn run_heads(layout: &Layout) -> HashMap<FixtureId, FixtureId> {
    layout.fixtures.iter().map(|f| (f.id, f.leftmost)).collect()
}

/// Products by id.
pub fn product_map(layout: &Layout) -> HashMap<&str, &Product> {
    layout.products.iter().map(|p| (p.id.as_str(), p)).collect()
}

/// Groups non-excluded, fully classified placements by block.
pub fn group_by_block(layout: &Layout) -> BTreeMap<BlockKey, Vec<&Placement>> {
    let products = product_map(layout);
    let mut groups: BTreeMap<BlockKey, Vec<&Placement>> = BTreeMap::new();
    for placement in layout.placements.iter().filter(|p| !p.excluded) {
        let Some(key) = products.get(placement.product.as_str()).and_then(|p| BlockKey::of(p))
        else {
            continue;
        };
        groups.entry(key).or_default().push(placement);
    }
    groups
}

/// Consumed width of every block on every run it touches.
pub fn block_widths(layout: &Layout) -> BTreeMap<BlockKey, BlockWidth> {
    let products = product_map(layout);
    let heads = run_heads(layout);
    let mut widths: BTreeMap<BlockKey, BlockWidth> = BTreeMap::new();

    for (key, members) in group_by_block(layout) {
        let mut entry = BlockWidth {
            per_run: BTreeMap::new(),
            min_x: f64::INFINITY,
        };
        for placement in members {
            let Some(run) = heads.get(&placement.fixture) else {
                continue;
            };
            let Some(product) = products.get(placement.product.as_str()) else {
                continue;
            };
            *entry.per_run.entry(*run).or_insert(0.0) +=
                product.merch_width() * placement.facings as f64;
            entry.min_x = entry.min_x.min(placement.x);
        }
        widths.insert(key, entry);
    }
    widths
}

/// Divider-block keys under each larger-block.
pub fn sub_groups<'a, I>(keys: I) -> BTreeMap<String, BTreeSet<String>>
where
    I: IntoIterator<Item = &'a BlockKey>,
{
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for key in keys {
        out.entry(key.larger.clone())
            .or_default()
            .insert(key.divider.clone());
    }
    out
}

/// Number of distinct divider-blocks held by non-excluded placements.
pub fn distinct_divider_blocks(layout: &Layout) -> usize {
    group_by_block(layout)
        .into_keys()
        .map(|key| key.divider)
        .collect::<BTreeSet<_>>()
        .len()
}
