//! Predicate evaluation over one cache generation.
//!
//! [`ConstraintEvaluator`] borrows the layout immutably, so it cannot
//! outlive a facing-count change: the loop drops it, mutates, and builds
//! a fresh one with an empty [`GenerationCache`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::cache::GenerationCache;
use super::types::{Condition, Pass, Phase, Predicate, PredicateKind};
use crate::config::ShelfConfig;
use crate::layout::{BlockKey, FixtureId, Layout, LayoutIndex, PlacementId};
use crate::reoptimize::CeilingTable;
use crate::scoring::{block_score, BlockItem, PlacementScorer};

/// Numeric parameters the predicates read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintSettings {
    /// Slack width subtracted from every run before testing space.
    pub flex_space: f64,
    /// Tolerance for width comparisons.
    pub epsilon: f64,
    /// Divider width plus clearance reserved between sub-groups.
    pub divider_allowance: f64,
    /// Allowance over a ceiling in the second pass.
    pub ceiling_tolerance: f64,
}

impl Default for ConstraintSettings {
    fn default() -> Self {
        Self::from(&ShelfConfig::default())
    }
}

impl From<&ShelfConfig> for ConstraintSettings {
    fn from(config: &ShelfConfig) -> Self {
        Self {
            flex_space: config.allocation.flex_space,
            epsilon: config.allocation.epsilon,
            divider_allowance: config.partition.divider_allowance(),
            ceiling_tolerance: config.reoptimize.ceiling_tolerance,
        }
    }
}

/// Evaluates named predicates with per-generation memoization.
pub struct ConstraintEvaluator<'a> {
    index: LayoutIndex<'a>,
    scorer: &'a dyn PlacementScorer,
    settings: ConstraintSettings,
    ceilings: Option<&'a CeilingTable>,
    cache: GenerationCache,
}

impl<'a> ConstraintEvaluator<'a> {
    pub fn new(
        layout: &'a Layout,
        scorer: &'a dyn PlacementScorer,
        settings: ConstraintSettings,
        ceilings: Option<&'a CeilingTable>,
        generation: u64,
    ) -> Self {
        Self {
            index: LayoutIndex::build(layout),
            scorer,
            settings,
            ceilings,
            cache: GenerationCache::new(generation),
        }
    }

    pub fn index(&self) -> &LayoutIndex<'a> {
        &self.index
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    /// Memoized placement score. Unknown placements score `+∞`.
    pub fn score(&mut self, id: PlacementId) -> f64 {
        if let Some(s) = self.cache.score(id) {
            return s;
        }
        let s = match self.index.resolve(id) {
            Some(r) => self.scorer.score(&r, &self.index),
            None => f64::INFINITY,
        };
        self.cache.store_score(id, s);
        s
    }

    /// Memoized aggregate score of a block's non-excluded members.
    pub fn block_score(&mut self, key: &BlockKey) -> f64 {
        if let Some(s) = self.cache.block_score(key) {
            return s;
        }
        let members = self.index.block_members(key).to_vec();
        let mut items = Vec::with_capacity(members.len());
        for id in members {
            let Some(r) = self.index.resolve(id) else {
                continue;
            };
            items.push(BlockItem {
                score: self.score(id),
                days_of_supply: self.scorer.days_of_supply(&r),
                facings: r.placement.facings,
                outer_block: r.product.tags.outer_block,
                multiplicity: self.index.multiplicity(&r.product.id),
            });
        }
        let s = block_score(items);
        self.cache.store_block_score(key.clone(), s);
        s
    }

    /// Whether every predicate of the (pass, phase) condition holds.
    pub fn condition(&mut self, id: PlacementId, pass: Pass, phase: Phase) -> bool {
        for &predicate in Condition::new(pass, phase).predicates() {
            if !self.check(id, predicate) {
                return false;
            }
        }
        true
    }

    /// Memoized value of one named predicate.
    pub fn check(&mut self, id: PlacementId, predicate: Predicate) -> bool {
        // G carries no pass-specific behaviour; share one cache slot.
        let predicate = if predicate.kind == PredicateKind::OverallSpace {
            Predicate::G
        } else {
            predicate
        };
        if let Some(v) = self.cache.predicate(id, predicate) {
            return v;
        }
        let v = self.evaluate(id, predicate);
        self.cache.store_predicate(id, predicate, v);
        v
    }

    fn evaluate(&mut self, id: PlacementId, predicate: Predicate) -> bool {
        let Some(r) = self.index.resolve(id) else {
            return false;
        };
        if r.placement.excluded {
            return false;
        }
        let width = r.merch_width();
        if !(width.is_finite() && width > 0.0) {
            log::debug!("{id}: merch width {width} is not positive, {predicate} is false");
            return false;
        }
        let Some(key) = self.index.block_of(id).cloned() else {
            log::debug!("{id}: missing block classification, {predicate} is false");
            return false;
        };

        match predicate.kind {
            PredicateKind::OverallSpace => self.overall_space(r.run, &key),
            PredicateKind::SpaceAvailable => {
                self.check(id, Predicate::G) && self.space_available(id, &key, predicate.pass)
            }
            PredicateKind::BalanceFeasible => self.balance_feasible(id, &key),
            PredicateKind::AllShelvesCovered => self.all_shelves_covered(&key, predicate.pass),
            PredicateKind::BestInLocalGroup | PredicateKind::BestExpansionItem => {
                self.best_on_run(id, predicate)
            }
            PredicateKind::BestBlockToExpand => self.best_block(&key, predicate),
        }
    }

    fn usable_capacity(&self, run: FixtureId) -> f64 {
        self.index.run_capacity(run) - self.settings.flex_space
    }

    /// Divider clearance reserved for a larger-block's sub-groups.
    fn divider_reserve(&self, larger: &str) -> f64 {
        if self.index.distinct_divider_blocks() <= 1 {
            return 0.0;
        }
        let groups = self.index.sibling_count(larger);
        groups.saturating_sub(1) as f64 * self.settings.divider_allowance
    }

    fn overall_space(&self, run: FixtureId, key: &BlockKey) -> bool {
        let widest = self
            .index
            .siblings(&key.larger)
            .filter_map(|k| self.index.block_width(&k).map(|w| w.max_width()))
            .fold(0.0, f64::max);
        self.usable_capacity(run) - widest - self.divider_reserve(&key.larger)
            >= -self.settings.epsilon
    }

    fn space_available(&self, id: PlacementId, key: &BlockKey, pass: Pass) -> bool {
        let Some(r) = self.index.resolve(id) else {
            return false;
        };
        let run = r.run;

        let mut reserved = 0.0;
        let mut larger_on_run = 0.0;
        for sibling in self.index.siblings(&key.larger) {
            let Some(width) = self.index.block_width(&sibling) else {
                continue;
            };
            larger_on_run += width.on_run(run);
            if &sibling != key {
                reserved += width.max_width();
            }
        }
        let own_after = self
            .index
            .block_width(key)
            .map_or(0.0, |w| w.on_run(run))
            + r.merch_width();
        let other = self.index.run_consumed(run) - larger_on_run;
        let needed = other + reserved + own_after + self.divider_reserve(&key.larger);

        if needed > self.usable_capacity(run) + self.settings.epsilon {
            return false;
        }

        match pass {
            Pass::First => true,
            Pass::Second => {
                let Some(ceiling) = self.ceilings.and_then(|c| c.get(key)) else {
                    log::debug!("{id}: no ceiling for {key}, ineligible in second pass");
                    return false;
                };
                own_after <= ceiling + self.settings.ceiling_tolerance + self.settings.epsilon
            }
        }
    }

    fn balance_feasible(&self, id: PlacementId, key: &BlockKey) -> bool {
        let (Some(r), Some(width)) = (self.index.resolve(id), self.index.block_width(key)) else {
            return false;
        };
        width.on_run(r.run) + r.merch_width() <= width.max_width() + self.settings.epsilon
    }

    fn all_shelves_covered(&mut self, key: &BlockKey, pass: Pass) -> bool {
        let space = Predicate::space(pass);
        let mut covered = BTreeSet::new();
        for member in self.index.block_members(key).to_vec() {
            if self.check(member, space) {
                if let Some(r) = self.index.resolve(member) {
                    covered.insert(r.run);
                }
            }
        }
        !covered.is_empty() && covered == self.index.block_runs(key)
    }

    fn passes_all(&mut self, id: PlacementId, filter: &[Predicate]) -> bool {
        for &p in filter {
            if !self.check(id, p) {
                return false;
            }
        }
        true
    }

    /// Strict total order: score, then placement id.
    fn rank(&mut self, a: PlacementId, b: PlacementId) -> Ordering {
        let (sa, sb) = (self.score(a), self.score(b));
        sa.total_cmp(&sb).then(a.cmp(&b))
    }

    fn best_on_run(&mut self, id: PlacementId, predicate: Predicate) -> bool {
        let filter = predicate.candidate_filter();
        if !self.passes_all(id, filter) {
            return false;
        }
        let Some(run) = self.index.resolve(id).map(|r| r.run) else {
            return false;
        };
        for other in self.index.run_members(run).to_vec() {
            if other == id || !self.passes_all(other, filter) {
                continue;
            }
            if self.rank(other, id) == Ordering::Less {
                return false;
            }
        }
        true
    }

    /// Whether some member of the block satisfies the filter.
    fn block_eligible(&mut self, key: &BlockKey, filter: &[Predicate]) -> bool {
        for member in self.index.block_members(key).to_vec() {
            if self.passes_all(member, filter) {
                return true;
            }
        }
        false
    }

    fn best_block(&mut self, key: &BlockKey, predicate: Predicate) -> bool {
        let filter = predicate.candidate_filter();
        if !self.block_eligible(key, filter) {
            return false;
        }
        let own = self.block_score(key);
        let siblings: Vec<BlockKey> = self.index.siblings(&key.larger).collect();
        for sibling in siblings {
            if &sibling == key || !self.block_eligible(&sibling, filter) {
                continue;
            }
            let other = self.block_score(&sibling);
            if other.total_cmp(&own).then_with(|| sibling.cmp(key)) == Ordering::Less {
                return false;
            }
        }
        true
    }
}
