//! Default urgency score.
//!
//! The score is built from the days-of-supply term (possibly replaced by
//! tag overrides), the share of its run a placement consumes, stepped
//! bonuses for thin supply, and two tiny tie-breakers that give a strict
//! total order over otherwise equal placements.

use super::types::PlacementScorer;
use crate::layout::{LayoutIndex, Resolved};

/// Days-of-supply per facing assumed when movement is unknown.
pub const NO_MOVEMENT_DAYS_PER_FACING: f64 = 1000.0;

/// Thresholds below which a placement earns a step bonus.
pub const SUPPLY_THRESHOLDS: [f64; 4] = [2.5, 3.0, 5.0, 7.0];

/// Score reduction per threshold crossed.
pub const STEP_BONUS: f64 = 1.0;

const PARTY_SIZE_BASE: f64 = 1000.0;
const OUTER_SINGLE_FACING_BASE: f64 = 0.85;
const OUTER_UNDER_TWO_DAYS_BASE: f64 = 1.95;
const OUTER_UNDER_THREE_DAYS_BASE: f64 = 2.1;
const OVERRIDE_FRACTION: f64 = 1.0 / 1000.0;

const PRODUCT_TIE_SCALE: f64 = 1e-6;
const POSITION_TIE_SCALE: f64 = 1e-9;

/// Estimated days the current capacity covers.
///
/// `capacity / weekly movement × 7`; with no positive movement the
/// estimate falls back to a large value proportional to facings.
pub fn days_of_supply(placement: &Resolved<'_>) -> f64 {
    let movement = placement.product.movement_rate();
    if movement > 0.0 {
        placement.capacity() / movement * 7.0
    } else {
        NO_MOVEMENT_DAYS_PER_FACING * placement.placement.facings as f64
    }
}

/// Days-of-supply term after tag overrides.
///
/// Each applicable override replaces the estimate with a small constant
/// plus a fraction of it; the smallest applicable override wins.
pub fn supply_term(placement: &Resolved<'_>) -> f64 {
    let dos = days_of_supply(placement);
    let tags = placement.product.tags;
    let frac = dos * OVERRIDE_FRACTION;

    let mut overrides: Vec<f64> = Vec::with_capacity(4);
    if tags.party_size {
        overrides.push(PARTY_SIZE_BASE + frac);
    }
    if tags.outer_block {
        if placement.placement.facings < 2 {
            overrides.push(OUTER_SINGLE_FACING_BASE + frac);
        }
        if dos < 2.0 {
            overrides.push(OUTER_UNDER_TWO_DAYS_BASE + frac);
        }
        if dos < 3.0 {
            overrides.push(OUTER_UNDER_THREE_DAYS_BASE + frac);
        }
    }

    overrides.into_iter().reduce(f64::min).unwrap_or(dos)
}

/// The default scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrgencyScorer;

impl PlacementScorer for UrgencyScorer {
    fn name(&self) -> &str {
        "Urgency"
    }

    fn score(&self, placement: &Resolved<'_>, index: &LayoutIndex<'_>) -> f64 {
        let term = supply_term(placement);

        let run_capacity = index.run_capacity(placement.run);
        let utilization = if run_capacity > 0.0 {
            placement.consumed_width() / run_capacity
        } else {
            1.0
        };

        let bonus = SUPPLY_THRESHOLDS.iter().filter(|&&t| term < t).count() as f64 * STEP_BONUS;

        term + utilization - bonus
            + term * utilization
            + unit_fraction(placement.product.product_number()) * PRODUCT_TIE_SCALE
            + placement.placement.x * POSITION_TIE_SCALE
    }
}

/// Maps a non-negative number into `[0, 1)` by its digit count.
fn unit_fraction(n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let mut scale = 1.0;
    while scale <= n {
        scale *= 10.0;
    }
    n / scale
}
