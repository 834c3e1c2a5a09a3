//! Block partitioning and divider placement.
//!
//! Runs read-only to produce a [`WidthTable`], or mutating to insert
//! divider fixtures between sub-groups and re-lay placements.
//! [`Partitioner::restore`] reverses a mutating run.
//!
//! # Key Types
//!
//! - [`PartitionConfig`]: divider geometry and re-lay step
//! - [`Partitioner`]: `width_table`, `apply`, `restore`
//! - [`WidthTable`] / [`BlockSpan`]: per-sub-group sizes and offsets
//! - [`PartitionOutcome`]: dividers created and underflowing runs

mod config;
mod partitioner;
mod types;

pub use config::PartitionConfig;
pub use partitioner::Partitioner;
pub use types::{BlockSpan, PartitionOutcome, WidthTable};
