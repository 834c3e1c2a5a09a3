//! Core trait for placement scoring.

use crate::layout::{LayoutIndex, Resolved};

/// Ranks a placement by allocation urgency.
///
/// Scores are `f64` where **lower is more urgent to grow**. A scorer must
/// be a pure function of the layout state it is handed; the evaluator
/// memoizes results for one cache generation only.
///
/// # Examples
///
/// ```ignore
/// // Grow the narrowest products first.
/// struct Narrowest;
///
/// impl PlacementScorer for Narrowest {
///     fn name(&self) -> &str { "Narrowest" }
///     fn score(&self, p: &Resolved<'_>, _index: &LayoutIndex<'_>) -> f64 {
///         p.merch_width()
///     }
/// }
/// ```
pub trait PlacementScorer: Send + Sync {
    /// Returns the name of this scorer.
    fn name(&self) -> &str;

    /// Computes the priority of one placement. Lower is more urgent.
    fn score(&self, placement: &Resolved<'_>, index: &LayoutIndex<'_>) -> f64;

    /// Days-of-supply estimate used by the aggregate block floor.
    fn days_of_supply(&self, placement: &Resolved<'_>) -> f64 {
        super::urgency::days_of_supply(placement)
    }
}
