//! Facing allocation loop.
//!
//! Grows facing counts one unit at a time under the constraint
//! predicates until no placement can grow, alternating a Balancing phase
//! (equalize a block across its runs) with single Expansion steps.
//!
//! # Key Types
//!
//! - [`AllocationConfig`]: flex-space, step budget, width tolerance
//! - [`AllocationLoop`]: step-wise state machine; one step per call
//! - [`AllocationRunner`]: drives a loop to `Done` or `Aborted`
//! - [`AllocationResult`]: terminal state and statistics
//!
//! # Pass differences
//!
//! | Pass   | Expansion winners                  | Space check          |
//! |--------|------------------------------------|----------------------|
//! | First  | lowest-scored qualifier per run    | run capacity         |
//! | Second | every qualifying placement         | capacity and ceiling |

mod config;
mod runner;
mod types;

pub use config::AllocationConfig;
pub use runner::{overallocated_runs, AllocationLoop, AllocationRunner};
pub use types::{AllocationResult, LoopState, StepReport};
