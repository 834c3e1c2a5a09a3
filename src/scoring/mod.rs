//! Placement and block scoring.
//!
//! Scores follow the minimization convention used throughout the crate:
//! **lower means more urgent to grow**.
//!
//! - [`PlacementScorer`]: pluggable per-placement priority
//! - [`UrgencyScorer`]: the default supply/utilization score
//! - [`block_score`]: aggregate eligibility of a whole block for expansion

mod block;
mod types;
pub mod urgency;

pub use block::{block_score, BlockItem};
pub use types::PlacementScorer;
pub use urgency::{days_of_supply, supply_term, UrgencyScorer};
