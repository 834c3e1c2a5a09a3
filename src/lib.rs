//! Greedy shelf-space allocation.
//!
//! Grows the facing counts of product placements one unit at a time
//! under capacity, balance and optimality constraints, then partitions
//! each group of related products into contiguous sub-groups separated
//! by divider fixtures.
//!
//! - **Scoring**: ranks placements by allocation urgency (lower grows first).
//! - **Constraints**: named, memoized predicates (A–G first pass, I–N
//!   second pass) composed into Balancing and Expansion conditions.
//! - **Allocation**: the Balancing ⇄ Expansion fixed-point loop, step-wise
//!   and cancellable.
//! - **Partition**: width tables and divider placement.
//! - **Re-optimization**: ceilings from the first pass bound a second pass.
//! - **Planner**: the full pipeline.
//!
//! The result is a monotone, terminating heuristic, not an exact optimum.
//!
//! # Example
//!
//! ```
//! use u_shelf::allocation::{AllocationRunner, LoopState};
//! use u_shelf::constraints::Pass;
//! use u_shelf::layout::{Classification, Fixture, FixtureId, Layout, Placement, PlacementId, Product};
//! use u_shelf::ShelfConfig;
//!
//! let mut layout = Layout::new("aisle-3");
//! layout.add_fixture(Fixture::shelf(FixtureId(0), 0.0, 0.5));
//! for i in 0..3u32 {
//!     let id = format!("{}", i + 1);
//!     layout.add_product(
//!         Product::new(id.as_str(), 0.1)
//!             .with_movement(10.0)
//!             .with_classification(Classification::new("soda", "cola")),
//!     );
//!     layout.add_placement(Placement::new(PlacementId(i), FixtureId(0), id));
//! }
//!
//! let result = AllocationRunner::run(&mut layout, Pass::First, &ShelfConfig::default(), None);
//! assert_eq!(result.state, LoopState::Done);
//! assert!(!result.is_overallocated());
//! ```

pub mod allocation;
pub mod config;
pub mod constraints;
pub mod diagnostics;
mod error;
pub mod layout;
pub mod partition;
pub mod planner;
pub mod reoptimize;
pub mod scoring;

pub use config::ShelfConfig;
pub use error::{Result, ShelfError};
pub use planner::{PlanReport, Planner};
