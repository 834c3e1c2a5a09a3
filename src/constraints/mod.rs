//! Layered constraint predicates.
//!
//! The named predicates form a decision table keyed by (pass, phase):
//!
//! | Kind | Pass 1 | Pass 2 |
//! |---|---|---|
//! | Space available | A | I |
//! | Overall space check | G | G |
//! | Balance feasible | B | J |
//! | Best in local group | C | K |
//! | All shelves covered | D | L |
//! | Best expansion item | E | N |
//! | Best block to expand | F | M |
//!
//! | Condition | Pass 1 | Pass 2 |
//! |---|---|---|
//! | Balancing | A ∧ B ∧ C | I ∧ J ∧ N |
//! | Expansion | A ∧ D ∧ E ∧ F | I ∧ L ∧ K ∧ M |
//!
//! Each kind is implemented once and parameterized by [`Pass`], so the
//! two passes cannot drift apart. A placement without both block tags,
//! or one marked excluded, fails every predicate.

mod cache;
mod evaluator;
mod types;

pub use cache::GenerationCache;
pub use evaluator::{ConstraintEvaluator, ConstraintSettings};
pub use types::{Condition, Pass, Phase, Predicate, PredicateKind};
