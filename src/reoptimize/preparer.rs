//! Second-pass preparation.
//!
//! Reverses partitioning, captures the block ceilings reached by the
//! first pass, resets facings to a baseline and re-runs allocation with
//! the second-pass predicates.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::config::ReoptimizeConfig;
use super::types::{CeilingTable, ReoptimizeResult};
use crate::allocation::AllocationRunner;
use crate::config::ShelfConfig;
use crate::constraints::Pass;
use crate::layout::Layout;
use crate::partition::Partitioner;

/// Prepares and runs the re-optimization pass.
///
/// # Usage
///
/// ```ignore
/// let result = Reoptimizer::run(&mut layout, &config);
/// println!("{} ceilings, {:?}", result.ceilings.len(), result.allocation.state);
/// ```
pub struct Reoptimizer;

impl Reoptimizer {
    /// Restores the unpartitioned layout, records ceilings and resets
    /// facings. Returns the ceilings, dividers removed and placements reset.
    pub fn prepare(layout: &mut Layout, config: &ReoptimizeConfig) -> (CeilingTable, usize, usize) {
        let removed = Partitioner::restore(layout);
        let ceilings = CeilingTable::from_layout(layout);
        let reset = Self::reset_facings(layout, config);
        log::info!(
            "layout {}: {} ceiling(s) recorded, {} placement(s) reset",
            layout.id,
            ceilings.len(),
            reset
        );
        (ceilings, removed, reset)
    }

    /// Resets non-excluded placements to the base facing count, or the
    /// extra count when tagged. Multi-pack placements keep their facings.
    pub fn reset_facings(layout: &mut Layout, config: &ReoptimizeConfig) -> usize {
        let mut reset = 0;
        for i in 0..layout.placements.len() {
            let placement = &layout.placements[i];
            if placement.excluded {
                continue;
            }
            let Some(tags) = layout.product(&placement.product).map(|p| p.tags) else {
                continue;
            };
            if tags.multi_pack {
                continue;
            }
            layout.placements[i].facings = if tags.extra {
                config.extra_facings
            } else {
                config.base_facings
            };
            reset += 1;
        }
        reset
    }

    pub fn run(layout: &mut Layout, config: &ShelfConfig) -> ReoptimizeResult {
        Self::run_with_cancel(layout, config, None)
    }

    /// Prepares the layout and runs the second pass with an optional
    /// cancellation token.
    pub fn run_with_cancel(
        layout: &mut Layout,
        config: &ShelfConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> ReoptimizeResult {
        let (ceilings, dividers_removed, reset) = Self::prepare(layout, &config.reoptimize);
        let allocation =
            AllocationRunner::run_with_cancel(layout, Pass::Second, config, Some(&ceilings), cancel);
        ReoptimizeResult {
            ceilings,
            dividers_removed,
            reset,
            allocation,
        }
    }
}
