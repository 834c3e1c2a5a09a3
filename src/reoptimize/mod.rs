//! Re-optimization pass.
//!
//! Reverses partitioning, records each block's widest run as its
//! ceiling, resets facings and re-runs allocation with the second-pass
//! predicates, which also bound each block by its ceiling.
//!
//! # Key Types
//!
//! - [`ReoptimizeConfig`]: ceiling tolerance and reset facing counts
//! - [`CeilingTable`]: per-block width ceilings
//! - [`Reoptimizer`]: `prepare`, `run`, `run_with_cancel`
//! - [`ReoptimizeResult`]: ceilings plus the second-pass result

mod config;
mod preparer;
mod types;

pub use config::ReoptimizeConfig;
pub use preparer::Reoptimizer;
pub use types::{CeilingTable, ReoptimizeResult};
