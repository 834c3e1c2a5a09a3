//! Balancing/expansion fixed-point loop.
//!
//! [`AllocationLoop`] advances one step per call so a host can stay
//! responsive between steps; [`AllocationRunner`] drives it to a
//! terminal state.
//!
//! # Algorithm
//!
//! 1. **Balancing**: among placements satisfying the pass's balancing
//!    condition, grow the lowest-scored one on each run. Repeat until no
//!    placement qualifies, then move to Expansion.
//! 2. **Expansion**: check cancellation, evaluate the expansion condition
//!    once, grow the winners and return to Balancing; with no winners the
//!    loop is Done.
//!
//! Every growth must pass the space predicate of its run, so consumed
//! width strictly increases inside a bounded capacity and the loop
//! terminates.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::{AllocationResult, LoopState, StepReport};
use crate::config::ShelfConfig;
use crate::constraints::{ConstraintEvaluator, ConstraintSettings, Pass, Phase};
use crate::layout::{FixtureId, Layout, LayoutIndex, PlacementId};
use crate::reoptimize::CeilingTable;
use crate::scoring::{PlacementScorer, UrgencyScorer};

/// Step-wise allocation state machine.
///
/// # Usage
///
/// ```ignore
/// let mut lp = AllocationLoop::new(Pass::First, &config);
/// while !lp.state().is_terminal() {
///     lp.step(&mut layout, None);
///     // host work between steps
/// }
/// ```
pub struct AllocationLoop {
    pass: Pass,
    settings: ConstraintSettings,
    max_steps: usize,
    scorer: Box<dyn PlacementScorer>,
    cancel: Option<Arc<AtomicBool>>,
    state: LoopState,
    generation: u64,
    rounds: usize,
    balancing_iterations: usize,
    expansion_steps: usize,
    facings_added: usize,
    budget_exhausted: bool,
}

impl AllocationLoop {
    /// Creates a loop in the Balancing state with the default scorer.
    pub fn new(pass: Pass, config: &ShelfConfig) -> Self {
        Self {
            pass,
            settings: ConstraintSettings::from(config),
            max_steps: config.allocation.max_steps,
            scorer: Box::new(UrgencyScorer),
            cancel: None,
            state: LoopState::Balancing,
            generation: 0,
            rounds: 0,
            balancing_iterations: 0,
            expansion_steps: 0,
            facings_added: 0,
            budget_exhausted: false,
        }
    }

    /// Replaces the placement scorer.
    pub fn with_scorer<S: PlacementScorer + 'static>(mut self, scorer: S) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Attaches a cancellation flag, observed at each Expansion step.
    pub fn with_cancel(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Adjusts flex-space; takes effect at the next step.
    pub fn set_flex_space(&mut self, flex_space: f64) {
        self.settings.flex_space = flex_space;
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Cache generations opened so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Placements satisfying the phase condition, reduced to the
    /// lowest-ranked one per run when `per_run` is set.
    fn winners(
        &mut self,
        layout: &Layout,
        ceilings: Option<&CeilingTable>,
        phase: Phase,
        per_run: bool,
    ) -> Vec<PlacementId> {
        self.generation += 1;
        let mut ev = ConstraintEvaluator::new(
            layout,
            self.scorer.as_ref(),
            self.settings,
            ceilings,
            self.generation,
        );
        let ids: Vec<PlacementId> = ev.index().candidates().collect();

        let mut best: BTreeMap<FixtureId, (f64, PlacementId)> = BTreeMap::new();
        let mut all = Vec::new();
        for id in ids {
            if !ev.condition(id, self.pass, phase) {
                continue;
            }
            if !per_run {
                all.push(id);
                continue;
            }
            let Some(run) = ev.index().resolve(id).map(|r| r.run) else {
                continue;
            };
            let score = ev.score(id);
            best.entry(run)
                .and_modify(|cur| {
                    if score.total_cmp(&cur.0).then(id.cmp(&cur.1)).is_lt() {
                        *cur = (score, id);
                    }
                })
                .or_insert((score, id));
        }

        if per_run {
            best.into_values().map(|(_, id)| id).collect()
        } else {
            all
        }
    }

    fn grow(&mut self, layout: &mut Layout, winners: &[PlacementId]) {
        for &id in winners {
            if let Some(p) = layout.placement_mut(id) {
                p.facings += 1;
                self.facings_added += 1;
                log::trace!("{:?} pass: {id} -> {} facings", self.pass, p.facings);
            }
        }
        self.rounds += 1;
    }

    fn budget_spent(&self) -> bool {
        self.max_steps > 0 && self.rounds >= self.max_steps
    }

    /// Executes one Balancing sub-iteration or one Expansion step.
    ///
    /// Calling `step` in a terminal state is a no-op.
    pub fn step(&mut self, layout: &mut Layout, ceilings: Option<&CeilingTable>) -> StepReport {
        let phase = self.state;
        if phase.is_terminal() {
            return StepReport {
                phase,
                next: phase,
                grown: Vec::new(),
            };
        }
        if self.budget_spent() {
            log::debug!("{:?} pass: step budget of {} spent", self.pass, self.max_steps);
            self.budget_exhausted = true;
            self.state = LoopState::Done;
            return StepReport {
                phase,
                next: self.state,
                grown: Vec::new(),
            };
        }

        let grown = match phase {
            LoopState::Balancing => {
                let winners = self.winners(layout, ceilings, Phase::Balancing, true);
                if winners.is_empty() {
                    self.state = LoopState::Expansion;
                } else {
                    self.grow(layout, &winners);
                    self.balancing_iterations += 1;
                    log::debug!(
                        "{:?} pass: balancing grew {} placement(s)",
                        self.pass,
                        winners.len()
                    );
                }
                winners
            }
            LoopState::Expansion => {
                if self.cancelled() {
                    log::info!("{:?} pass: cancelled, keeping partial allocation", self.pass);
                    self.state = LoopState::Aborted;
                    Vec::new()
                } else {
                    let per_run = self.pass == Pass::First;
                    let winners = self.winners(layout, ceilings, Phase::Expansion, per_run);
                    if winners.is_empty() {
                        self.state = LoopState::Done;
                    } else {
                        self.grow(layout, &winners);
                        self.expansion_steps += 1;
                        self.state = LoopState::Balancing;
                        log::debug!(
                            "{:?} pass: expansion grew {} placement(s)",
                            self.pass,
                            winners.len()
                        );
                    }
                    winners
                }
            }
            LoopState::Done | LoopState::Aborted => Vec::new(),
        };

        StepReport {
            phase,
            next: self.state,
            grown,
        }
    }

    /// Summarizes the run so far.
    pub fn result(&self, layout: &Layout) -> AllocationResult {
        AllocationResult {
            pass: self.pass,
            state: self.state,
            cancelled: self.state == LoopState::Aborted,
            budget_exhausted: self.budget_exhausted,
            balancing_iterations: self.balancing_iterations,
            expansion_steps: self.expansion_steps,
            facings_added: self.facings_added,
            overallocated_runs: overallocated_runs(layout, self.settings.epsilon),
        }
    }
}

/// Runs whose consumed width exceeds their capacity.
pub fn overallocated_runs(layout: &Layout, epsilon: f64) -> Vec<FixtureId> {
    let index = LayoutIndex::build(layout);
    index
        .runs()
        .filter(|&run| index.run_consumed(run) > index.run_capacity(run) + epsilon)
        .collect()
}

/// Drives an [`AllocationLoop`] to completion.
///
/// # Usage
///
/// ```ignore
/// let result = AllocationRunner::run(&mut layout, Pass::First, &config, None);
/// assert_eq!(result.state, LoopState::Done);
/// ```
pub struct AllocationRunner;

impl AllocationRunner {
    /// Runs one allocation pass.
    pub fn run(
        layout: &mut Layout,
        pass: Pass,
        config: &ShelfConfig,
        ceilings: Option<&CeilingTable>,
    ) -> AllocationResult {
        Self::run_with_cancel(layout, pass, config, ceilings, None)
    }

    /// Runs one allocation pass with an optional cancellation token.
    ///
    /// If `cancel` is `Some` and the flag is set to `true`, the loop
    /// stops at the next Expansion step and the allocation reached so far
    /// is kept as the result.
    pub fn run_with_cancel(
        layout: &mut Layout,
        pass: Pass,
        config: &ShelfConfig,
        ceilings: Option<&CeilingTable>,
        cancel: Option<Arc<AtomicBool>>,
    ) -> AllocationResult {
        Self::run_loop(
            AllocationLoop::new(pass, config).with_cancel(cancel),
            layout,
            ceilings,
        )
    }

    /// Drives a pre-built loop (custom scorer, flag) to a terminal state.
    pub fn run_loop(
        mut lp: AllocationLoop,
        layout: &mut Layout,
        ceilings: Option<&CeilingTable>,
    ) -> AllocationResult {
        log::info!(
            "{:?} pass: allocating {} placement(s) with {} scorer",
            lp.pass,
            layout.placements.len(),
            lp.scorer.name()
        );
        while !lp.state().is_terminal() {
            lp.step(layout, ceilings);
        }

        let result = lp.result(layout);
        if result.is_overallocated() {
            log::warn!(
                "{:?} pass: runs over capacity after allocation: {:?}",
                result.pass,
                result.overallocated_runs
            );
        }
        log::info!(
            "{:?} pass: {:?} after {} balancing iteration(s), {} expansion step(s), {} facing(s) added",
            result.pass,
            result.state,
            result.balancing_iterations,
            result.expansion_steps,
            result.facings_added
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::blocks::block_widths;
    use crate::layout::{Classification, Fixture, Placement, Product};
    use crate::reoptimize::Reoptimizer;
    use proptest::prelude::*;

    fn product(id: &str, width: f64, larger: &str, divider: &str, movement: f64) -> Product {
        Product::new(id, width)
            .with_movement(movement)
            .with_classification(Classification::new(larger, divider))
    }

    /// Three 0.1-wide placements of one block on a 0.5 run.
    fn simple_balancing() -> Layout {
        let mut l = Layout::new("t");
        l.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 0.5));
        for i in 0..3u32 {
            let id = format!("{}", i + 1);
            l.add_product(product(&id, 0.1, "soda", "cola", 10.0));
            l.add_placement(Placement::new(PlacementId(i), FixtureId(0), id).at(i as f64 * 0.1));
        }
        l
    }

    fn consumed(l: &Layout, run: FixtureId) -> f64 {
        LayoutIndex::build(l).run_consumed(run)
    }

    #[test]
    fn test_simple_balancing_scenario() {
        let mut l = simple_balancing();
        let config = ShelfConfig::default();
        let mut lp = AllocationLoop::new(Pass::First, &config);

        let mut grown = Vec::new();
        while !lp.state().is_terminal() {
            grown.extend(lp.step(&mut l, None).grown);
        }

        assert_eq!(lp.state(), LoopState::Done);
        // Lowest score first; never the same placement twice while a
        // sibling lags.
        assert_eq!(grown, vec![PlacementId(0), PlacementId(1)]);
        assert_eq!(
            l.facings(),
            vec![(PlacementId(0), 2), (PlacementId(1), 2), (PlacementId(2), 1)]
        );
        assert!(consumed(&l, FixtureId(0)) <= 0.5 + 1e-9);
    }

    #[test]
    fn test_lagging_run_is_balanced_before_expansion() {
        let mut l = Layout::new("t");
        l.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 1.0));
        l.add_fixture(Fixture::shelf(FixtureId(1), 0.0, 1.0).with_y(1.0));
        l.add_product(product("1", 0.1, "soda", "cola", 10.0));
        l.add_product(product("2", 0.1, "soda", "cola", 10.0));
        l.add_placement(Placement::new(PlacementId(0), FixtureId(0), "1").with_facings(3));
        l.add_placement(Placement::new(PlacementId(1), FixtureId(1), "2"));

        let config = ShelfConfig::default();
        let mut lp = AllocationLoop::new(Pass::First, &config);
        let first = lp.step(&mut l, None);
        assert_eq!(first.phase, LoopState::Balancing);
        assert_eq!(first.grown, vec![PlacementId(1)]);
        let second = lp.step(&mut l, None);
        assert_eq!(second.grown, vec![PlacementId(1)]);
        let third = lp.step(&mut l, None);
        assert!(third.grown.is_empty());
        assert_eq!(third.next, LoopState::Expansion);

        let result = AllocationRunner::run_loop(lp, &mut l, None);
        assert_eq!(result.state, LoopState::Done);
        let f = l.facings();
        assert_eq!(f[0].1, f[1].1);
        assert!(f[0].1 >= 9);
        assert!(!result.is_overallocated());
    }

    #[test]
    fn test_excluded_placements_are_never_grown() {
        let mut l = simple_balancing();
        l.placements[0].excluded = true;
        AllocationRunner::run(&mut l, Pass::First, &ShelfConfig::default(), None);
        assert_eq!(l.placements[0].facings, 1);
        assert!(l.placements[1].facings + l.placements[2].facings > 2);
    }

    #[test]
    fn test_unclassified_placements_are_skipped() {
        let mut l = simple_balancing();
        l.add_product(Product::new("99", 0.05).with_movement(50.0));
        l.add_placement(Placement::new(PlacementId(9), FixtureId(0), "99"));
        let result = AllocationRunner::run(&mut l, Pass::First, &ShelfConfig::default(), None);
        assert_eq!(result.state, LoopState::Done);
        assert_eq!(l.placement(PlacementId(9)).map(|p| p.facings), Some(1));
    }

    #[test]
    fn test_cancellation_keeps_partial_allocation() {
        let mut l = Layout::new("t");
        l.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 1.0));
        l.add_fixture(Fixture::shelf(FixtureId(1), 0.0, 1.0).with_y(1.0));
        l.add_product(product("1", 0.1, "soda", "cola", 10.0));
        l.add_placement(Placement::new(PlacementId(0), FixtureId(0), "1").with_facings(3));
        l.add_placement(Placement::new(PlacementId(1), FixtureId(1), "1"));

        let cancel = Arc::new(AtomicBool::new(true));
        let result = AllocationRunner::run_with_cancel(
            &mut l,
            Pass::First,
            &ShelfConfig::default(),
            None,
            Some(cancel),
        );

        assert!(result.cancelled);
        assert_eq!(result.state, LoopState::Aborted);
        assert_eq!(result.expansion_steps, 0);
        // Balancing still ran up to the first Expansion boundary.
        assert_eq!(l.facings(), vec![(PlacementId(0), 3), (PlacementId(1), 3)]);
    }

    #[test]
    fn test_max_steps_budget() {
        let mut l = simple_balancing();
        let mut config = ShelfConfig::default();
        config.allocation.max_steps = 1;
        let result = AllocationRunner::run(&mut l, Pass::First, &config, None);
        assert!(result.budget_exhausted);
        assert_eq!(result.state, LoopState::Done);
        assert_eq!(result.facings_added, 1);
    }

    #[test]
    fn test_flex_space_is_adjustable_between_steps() {
        let mut l = simple_balancing();
        let mut lp = AllocationLoop::new(Pass::First, &ShelfConfig::default());
        lp.set_flex_space(0.2);
        let result = AllocationRunner::run_loop(lp, &mut l, None);
        assert_eq!(result.facings_added, 0);
    }

    #[test]
    fn test_second_pass_respects_ceilings() {
        let mut l = simple_balancing();
        let mut ceilings = CeilingTable::default();
        ceilings.insert(crate::layout::BlockKey::new("soda", "cola"), 0.3);
        let mut config = ShelfConfig::default();
        config.reoptimize.ceiling_tolerance = 0.1;
        let result = AllocationRunner::run(&mut l, Pass::Second, &config, Some(&ceilings));
        assert_eq!(result.state, LoopState::Done);
        assert_eq!(result.facings_added, 1);
    }

    #[test]
    fn test_zero_width_placement_does_not_stall() {
        let mut l = Layout::new("t");
        l.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 1.0));
        l.add_product(product("1", 0.0, "soda", "cola", 10.0));
        l.add_product(product("2", 0.1, "soda", "cola", 10.0));
        l.add_placement(Placement::new(PlacementId(0), FixtureId(0), "1"));
        l.add_placement(Placement::new(PlacementId(1), FixtureId(0), "2").at(0.1));

        let config = ShelfConfig::default();
        assert_eq!(config.allocation.max_steps, 0);
        let result = AllocationRunner::run(&mut l, Pass::First, &config, None);

        assert_eq!(result.state, LoopState::Done);
        assert!(!result.budget_exhausted);
        assert_eq!(l.placement(PlacementId(0)).map(|p| p.facings), Some(1));
        assert_eq!(l.placement(PlacementId(1)).map(|p| p.facings), Some(10));
        assert!(!result.is_overallocated());
    }

    #[test]
    fn test_terminal_step_is_noop() {
        let mut l = simple_balancing();
        let config = ShelfConfig::default();
        let mut lp = AllocationLoop::new(Pass::First, &config);
        while !lp.state().is_terminal() {
            lp.step(&mut l, None);
        }
        let before = l.facings();
        let report = lp.step(&mut l, None);
        assert!(report.grown.is_empty());
        assert_eq!(report.next, LoopState::Done);
        assert_eq!(l.facings(), before);
    }

    // ---- Properties over generated layouts ----

    #[derive(Debug, Clone)]
    struct Shape {
        capacities: Vec<f64>,
        items: Vec<(usize, f64, usize, usize, f64)>,
    }

    fn shapes() -> impl Strategy<Value = Shape> {
        (
            prop::collection::vec(0.5f64..3.0, 1..4),
            prop::collection::vec((0usize..3, 0.05f64..0.3, 0usize..2, 0usize..2, 0.0f64..20.0), 1..9),
        )
            .prop_map(|(capacities, items)| Shape { capacities, items })
    }

    fn build(shape: &Shape) -> Layout {
        let mut l = Layout::new("gen");
        for (i, cap) in shape.capacities.iter().enumerate() {
            l.add_fixture(Fixture::shelf(FixtureId(i as u32), 0.0, *cap).with_y(i as f64));
        }
        for (i, &(run, width, larger, divider, movement)) in shape.items.iter().enumerate() {
            let id = format!("{}", i + 1);
            let run = run % shape.capacities.len();
            l.add_product(product(
                &id,
                width,
                ["bev", "snack"][larger],
                ["a", "b"][divider],
                movement,
            ));
            l.add_placement(
                Placement::new(PlacementId(i as u32), FixtureId(run as u32), id).at(i as f64 * 0.3),
            );
        }
        l
    }

    fn within_capacity(l: &Layout) -> bool {
        overallocated_runs(l, 1e-9).is_empty()
    }

    proptest! {
        #[test]
        fn prop_first_pass_is_safe_monotone_and_deterministic(shape in shapes()) {
            let initial = build(&shape);
            prop_assume!(within_capacity(&initial));

            let config = ShelfConfig::default();
            let mut a = initial.clone();
            let mut lp = AllocationLoop::new(Pass::First, &config);
            let mut previous = a.facings();
            let mut steps = 0usize;
            while !lp.state().is_terminal() {
                if lp.state() == LoopState::Expansion {
                    // Balance invariant: nothing is balance-eligible here.
                    let scorer = UrgencyScorer;
                    let mut ev = ConstraintEvaluator::new(
                        &a, &scorer, ConstraintSettings::from(&config), None, u64::MAX,
                    );
                    let ids: Vec<_> = ev.index().candidates().collect();
                    for id in ids {
                        prop_assert!(!ev.condition(id, Pass::First, Phase::Balancing));
                    }
                }
                lp.step(&mut a, None);
                let now = a.facings();
                for (before, after) in previous.iter().zip(now.iter()) {
                    prop_assert!(after.1 >= before.1);
                }
                previous = now;
                steps += 1;
            }
            let result = lp.result(&a);
            prop_assert_eq!(result.state, LoopState::Done);
            prop_assert!(!result.is_overallocated());

            let total: f64 = shape.capacities.iter().sum();
            let min_width = shape.items.iter().map(|i| i.1).fold(f64::INFINITY, f64::min);
            prop_assert!(result.facings_added as f64 <= total / min_width + 1.0);
            prop_assert!(steps <= 2 * (result.facings_added + 1) + 1);

            let mut b = initial.clone();
            AllocationRunner::run(&mut b, Pass::First, &config, None);
            prop_assert_eq!(a.facings(), b.facings());
        }

        #[test]
        fn prop_second_pass_is_safe_monotone_and_under_ceilings(shape in shapes()) {
            let mut l = build(&shape);
            prop_assume!(within_capacity(&l));
            let config = ShelfConfig::default();
            AllocationRunner::run(&mut l, Pass::First, &config, None);
            let first = l.clone();

            let (ceilings, _, _) = Reoptimizer::prepare(&mut l, &config.reoptimize);
            prop_assert!(within_capacity(&l));
            let mut lp = AllocationLoop::new(Pass::Second, &config);
            let mut previous = l.facings();
            while !lp.state().is_terminal() {
                if lp.state() == LoopState::Expansion {
                    let scorer = UrgencyScorer;
                    let mut ev = ConstraintEvaluator::new(
                        &l, &scorer, ConstraintSettings::from(&config), Some(&ceilings), u64::MAX,
                    );
                    let ids: Vec<_> = ev.index().candidates().collect();
                    for id in ids {
                        prop_assert!(!ev.condition(id, Pass::Second, Phase::Balancing));
                    }
                }
                lp.step(&mut l, Some(&ceilings));
                let now = l.facings();
                for (before, after) in previous.iter().zip(now.iter()) {
                    prop_assert!(after.1 >= before.1);
                }
                previous = now;
            }
            let result = lp.result(&l);
            prop_assert_eq!(result.state, LoopState::Done);
            prop_assert!(!result.is_overallocated());

            let slack = config.reoptimize.ceiling_tolerance + config.allocation.epsilon + 1e-9;
            for (key, width) in block_widths(&l) {
                let ceiling = ceilings.get(&key);
                prop_assert!(ceiling.is_some());
                let ceiling = ceiling.unwrap_or(0.0);
                for w in width.per_run.values() {
                    prop_assert!(*w <= ceiling + slack);
                }
            }

            let mut again = first.clone();
            let rerun = Reoptimizer::run(&mut again, &config);
            prop_assert_eq!(rerun.allocation.state, LoopState::Done);
            prop_assert_eq!(again.facings(), l.facings());
        }
    }
}
