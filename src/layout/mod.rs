//! Layout data model.
//!
//! Placements and fixtures pre-exist; allocation only mutates facing
//! counts, and partitioning only changes fixture membership and adds
//! divider fixtures. Nothing here creates or destroys placements.
//!
//! # Key Types
//!
//! - [`Layout`]: the placement/fixture/product graph
//! - [`Fixture`]: a shelf segment; segments aggregate into runs via `leftmost`
//! - [`Placement`]: one product on one fixture with a facing count
//! - [`BlockKey`]: (larger-block, divider-block) grouping key
//! - [`LayoutIndex`]: per-generation aggregates used by the constraints

pub mod blocks;
mod index;
mod types;

pub use blocks::{BlockKey, BlockWidth};
pub use index::{LayoutIndex, Resolved};
pub use types::{
    Classification, Fixture, FixtureId, FixtureKind, Layout, LayoutFlags, Placement, PlacementId,
    Product, ProductTags,
};
