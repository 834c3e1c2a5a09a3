//! Per-generation aggregate view of a layout.
//!
//! Every derived quantity here depends on current facing counts, so an
//! index is built once per cache generation and dropped with it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::blocks::{block_widths, distinct_divider_blocks, sub_groups, BlockKey, BlockWidth};
use super::types::{FixtureId, Layout, Placement, PlacementId, Product};

/// Resolved view of one placement.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub placement: &'a Placement,
    pub product: &'a Product,
    pub run: FixtureId,
}

impl Resolved<'_> {
    pub fn merch_width(&self) -> f64 {
        self.product.merch_width()
    }

    /// Width currently consumed on the shelf.
    pub fn consumed_width(&self) -> f64 {
        self.product.merch_width() * self.placement.facings as f64
    }

    /// Units currently held.
    pub fn capacity(&self) -> f64 {
        self.product.units_per_facing * self.placement.facings as f64
    }
}

#[derive(Debug)]
pub struct LayoutIndex<'a> {
    layout: &'a Layout,
    resolved: HashMap<PlacementId, Resolved<'a>>,
    run_capacity: BTreeMap<FixtureId, f64>,
    run_consumed: BTreeMap<FixtureId, f64>,
    run_members: BTreeMap<FixtureId, Vec<PlacementId>>,
    block_of: HashMap<PlacementId, BlockKey>,
    block_members: BTreeMap<BlockKey, Vec<PlacementId>>,
    widths: BTreeMap<BlockKey, BlockWidth>,
    subgroups: BTreeMap<String, BTreeSet<String>>,
    multiplicity: HashMap<&'a str, usize>,
    divider_blocks: usize,
}

impl<'a> LayoutIndex<'a> {
    pub fn build(layout: &'a Layout) -> Self {
        let fixtures: HashMap<FixtureId, FixtureId> =
            layout.fixtures.iter().map(|f| (f.id, f.leftmost)).collect();
        let products: HashMap<&str, &Product> =
            layout.products.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut run_capacity: BTreeMap<FixtureId, f64> = BTreeMap::new();
        for fixture in layout.fixtures.iter().filter(|f| !f.is_divider()) {
            *run_capacity.entry(fixture.leftmost).or_insert(0.0) += fixture.width;
        }

        let mut resolved = HashMap::with_capacity(layout.placements.len());
        let mut run_consumed: BTreeMap<FixtureId, f64> = BTreeMap::new();
        let mut run_members: BTreeMap<FixtureId, Vec<PlacementId>> = BTreeMap::new();
        let mut block_of = HashMap::new();
        let mut block_members: BTreeMap<BlockKey, Vec<PlacementId>> = BTreeMap::new();
        let mut multiplicity: HashMap<&str, usize> = HashMap::new();

        for placement in &layout.placements {
            let (Some(run), Some(product)) = (
                fixtures.get(&placement.fixture),
                products.get(placement.product.as_str()),
            ) else {
                continue;
            };
            let product: &'a Product = product;
            let r = Resolved {
                placement,
                product,
                run: *run,
            };
            *run_consumed.entry(r.run).or_insert(0.0) += r.consumed_width();
            *multiplicity.entry(product.id.as_str()).or_insert(0) += 1;
            resolved.insert(placement.id, r);

            if placement.excluded {
                continue;
            }
            run_members.entry(r.run).or_default().push(placement.id);
            if let Some(key) = BlockKey::of(product) {
                block_members
                    .entry(key.clone())
                    .or_default()
                    .push(placement.id);
                block_of.insert(placement.id, key);
            }
        }

        let widths = block_widths(layout);
        let subgroups = sub_groups(widths.keys());

        Self {
            layout,
            resolved,
            run_capacity,
            run_consumed,
            run_members,
            block_of,
            block_members,
            widths,
            subgroups,
            multiplicity,
            divider_blocks: distinct_divider_blocks(layout),
        }
    }

    pub fn layout(&self) -> &'a Layout {
        self.layout
    }

    pub fn resolve(&self, id: PlacementId) -> Option<Resolved<'a>> {
        self.resolved.get(&id).copied()
    }

    /// Non-excluded placements in layout order.
    pub fn candidates(&self) -> impl Iterator<Item = PlacementId> + '_ {
        self.layout
            .placements
            .iter()
            .filter(|p| !p.excluded && self.resolved.contains_key(&p.id))
            .map(|p| p.id)
    }

    pub fn run_capacity(&self, run: FixtureId) -> f64 {
        self.run_capacity.get(&run).copied().unwrap_or(0.0)
    }

    /// Width consumed on a run by every placement, excluded ones included.
    pub fn run_consumed(&self, run: FixtureId) -> f64 {
        self.run_consumed.get(&run).copied().unwrap_or(0.0)
    }

    pub fn runs(&self) -> impl Iterator<Item = FixtureId> + '_ {
        self.run_capacity.keys().copied()
    }

    /// Non-excluded placements on a run.
    pub fn run_members(&self, run: FixtureId) -> &[PlacementId] {
        self.run_members.get(&run).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn block_of(&self, id: PlacementId) -> Option<&BlockKey> {
        self.block_of.get(&id)
    }

    pub fn block_members(&self, key: &BlockKey) -> &[PlacementId] {
        self.block_members
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn block_width(&self, key: &BlockKey) -> Option<&BlockWidth> {
        self.widths.get(key)
    }

    /// Runs holding any placement of the block.
    pub fn block_runs(&self, key: &BlockKey) -> BTreeSet<FixtureId> {
        self.widths
            .get(key)
            .map(|w| w.per_run.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Divider-blocks that share `larger`.
    pub fn siblings(&self, larger: &str) -> impl Iterator<Item = BlockKey> + '_ {
        let larger = larger.to_string();
        self.subgroups
            .get(&larger)
            .into_iter()
            .flatten()
            .map(move |d| BlockKey::new(larger.clone(), d.clone()))
    }

    pub fn sibling_count(&self, larger: &str) -> usize {
        self.subgroups.get(larger).map_or(0, BTreeSet::len)
    }

    /// Number of physical slots showing the same product.
    pub fn multiplicity(&self, product: &str) -> usize {
        self.multiplicity.get(product).copied().unwrap_or(1).max(1)
    }

    pub fn distinct_divider_blocks(&self) -> usize {
        self.divider_blocks
    }
}
