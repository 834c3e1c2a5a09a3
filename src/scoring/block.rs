//! Aggregate block score.
//!
//! Ranks whole blocks for expansion. Each member contributes a capped
//! score weighted by its share of the logical product, and the block
//! carries the lowest supply floor among its members. Lower is more
//! eligible for expansion.

const FLOOR_CLIP: f64 = 10.0;
const CAP_BASE: f64 = 10.0;
const CAP_DIVISOR: f64 = 250.0;
const MEAN_DIVISOR: f64 = 500.0;

const OUTER_SINGLE_FACING_FLOOR: f64 = 0.85;
const OUTER_UNDER_TWO_DAYS_FLOOR: f64 = 2.0;
const OUTER_UNDER_THREE_DAYS_FLOOR: f64 = 2.1;

/// One member's inputs to the block score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockItem {
    /// Placement score from the active scorer.
    pub score: f64,
    /// Raw days-of-supply estimate (before score overrides).
    pub days_of_supply: f64,
    pub facings: u32,
    pub outer_block: bool,
    /// Number of physical slots showing the same product.
    pub multiplicity: usize,
}

impl BlockItem {
    /// Capped per-item contribution: `min(10 + score/250, score)`.
    pub fn contribution(&self) -> f64 {
        (CAP_BASE + self.score / CAP_DIVISOR).min(self.score)
    }

    /// Share of the logical product this slot represents.
    pub fn weight(&self) -> f64 {
        1.0 / self.multiplicity.max(1) as f64
    }

    /// Clipped supply floor.
    ///
    /// Outer-block members use their own graduated floors; these are
    /// independent of the overrides applied inside the placement score.
    pub fn floor(&self) -> f64 {
        let dos = self.days_of_supply;
        let clipped = dos.min(FLOOR_CLIP);
        if !self.outer_block {
            return clipped;
        }
        let mut floors: Vec<f64> = Vec::with_capacity(3);
        if self.facings < 2 {
            floors.push(OUTER_SINGLE_FACING_FLOOR);
        }
        if dos < 2.0 {
            floors.push(OUTER_UNDER_TWO_DAYS_FLOOR);
        }
        if dos < 3.0 {
            floors.push(OUTER_UNDER_THREE_DAYS_FLOOR);
        }
        floors.into_iter().reduce(f64::min).unwrap_or(clipped)
    }
}

/// Aggregate score for a set of placements.
///
/// `floor + (weighted mean contribution) / 500`. An empty block is never
/// eligible and scores `+∞`.
pub fn block_score<I>(items: I) -> f64
where
    I: IntoIterator<Item = BlockItem>,
{
    let mut total = 0.0;
    let mut length = 0.0;
    let mut floor = f64::INFINITY;

    for item in items {
        let w = item.weight();
        total += item.contribution() * w;
        length += w;
        floor = floor.min(item.floor());
    }

    if length <= 0.0 {
        return f64::INFINITY;
    }
    floor + (total / length) / MEAN_DIVISOR
}
