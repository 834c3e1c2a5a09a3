//! Error taxonomy.
//!
//! Only structural problems are errors. Per-placement inconsistencies
//! (missing classification tags, malformed numeric fields, capacity
//! underflow) never surface here: they degrade to neutral values or
//! layout flags so an allocation run always produces a result.

use thiserror::Error;

use crate::layout::{FixtureId, PlacementId};

pub type Result<T> = std::result::Result<T, ShelfError>;

#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("companion layout is missing or identical to the target: {0}")]
    MissingCompanionInput(String),

    #[error("placement {placement} references unknown fixture {fixture}")]
    UnknownFixture {
        placement: PlacementId,
        fixture: FixtureId,
    },

    #[error("fixture {fixture} references unknown leftmost fixture {leftmost}")]
    UnknownRunHead {
        fixture: FixtureId,
        leftmost: FixtureId,
    },

    #[error("placement {placement} references unknown product {product}")]
    UnknownProduct {
        placement: PlacementId,
        product: String,
    },

    #[error("unknown placement: {0}")]
    UnknownPlacement(PlacementId),

    #[error("unknown predicate identifier: {0}")]
    UnknownPredicate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ShelfError {
    fn from(err: toml::de::Error) -> Self {
        ShelfError::Config(format!("TOML parse error: {}", err))
    }
}
