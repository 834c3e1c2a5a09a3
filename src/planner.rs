//! End-to-end allocation pipeline.
//!
//! 1. Check the companion layout and referential integrity (fatal).
//! 2. First allocation pass.
//! 3. Re-optimization: restore, record ceilings, reset, second pass.
//! 4. Final partition with divider placement.
//!
//! Cancellation during the first pass skips re-optimization; the partial
//! allocation is still partitioned.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::allocation::{AllocationResult, AllocationRunner, LoopState};
use crate::config::ShelfConfig;
use crate::constraints::Pass;
use crate::error::{Result, ShelfError};
use crate::layout::Layout;
use crate::partition::{PartitionOutcome, Partitioner};
use crate::reoptimize::{CeilingTable, ReoptimizeResult, Reoptimizer};

/// Everything a full plan produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanReport {
    pub first: AllocationResult,
    /// `None` when the first pass was cancelled.
    pub second: Option<ReoptimizeResult>,
    pub partition: PartitionOutcome,
}

impl PlanReport {
    pub fn cancelled(&self) -> bool {
        self.first.cancelled || self.second.as_ref().is_some_and(|s| s.allocation.cancelled)
    }

    pub fn ceilings(&self) -> Option<&CeilingTable> {
        self.second.as_ref().map(|s| &s.ceilings)
    }

    /// Final loop state of the last pass that ran.
    pub fn final_state(&self) -> LoopState {
        self.second
            .as_ref()
            .map_or(self.first.state, |s| s.allocation.state)
    }
}

/// Runs the whole pipeline over a target layout.
///
/// # Usage
///
/// ```ignore
/// let report = Planner::run(&mut target, Some(&template), &config, None)?;
/// println!("{} dividers", report.partition.dividers.len());
/// ```
pub struct Planner;

impl Planner {
    /// Fails with [`ShelfError::MissingCompanionInput`] before touching
    /// the target when `companion` is absent or is the target itself.
    pub fn run(
        target: &mut Layout,
        companion: Option<&Layout>,
        config: &ShelfConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<PlanReport> {
        let companion = companion.ok_or_else(|| {
            ShelfError::MissingCompanionInput(format!("no companion for layout {}", target.id))
        })?;
        if companion.id == target.id {
            return Err(ShelfError::MissingCompanionInput(format!(
                "companion is layout {} itself",
                target.id
            )));
        }
        config.validate()?;
        target.validate()?;

        log::info!(
            "layout {}: planning {} placement(s) on {} fixture(s) against {}",
            target.id,
            target.placements.len(),
            target.fixtures.len(),
            companion.id
        );

        let first =
            AllocationRunner::run_with_cancel(target, Pass::First, config, None, cancel.clone());

        let second = if first.cancelled {
            log::info!("layout {}: first pass cancelled, skipping re-optimization", target.id);
            None
        } else {
            Some(Reoptimizer::run_with_cancel(target, config, cancel))
        };

        let partition = Partitioner::apply(target, &config.partition);

        Ok(PlanReport {
            first,
            second,
            partition,
        })
    }
}
