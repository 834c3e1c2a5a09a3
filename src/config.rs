//! Top-level configuration.
//!
//! Every section and field is optional in the TOML source; omitted
//! values take their defaults.
//!
//! ```toml
//! [allocation]
//! flex_space = 0.25
//!
//! [partition]
//! divider_width = 0.6
//! divider_tolerance = 0.01
//!
//! [reoptimize]
//! ceiling_tolerance = 0.05
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::allocation::AllocationConfig;
use crate::error::{Result, ShelfError};
use crate::partition::PartitionConfig;
use crate::reoptimize::ReoptimizeConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub allocation: AllocationConfig,
    pub partition: PartitionConfig,
    pub reoptimize: ReoptimizeConfig,
}

impl ShelfConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ShelfConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_flex_space(mut self, flex_space: f64) -> Self {
        self.allocation.flex_space = flex_space;
        self
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.allocation
            .validate()
            .map_err(|e| ShelfError::Config(format!("allocation: {e}")))?;
        self.partition
            .validate()
            .map_err(|e| ShelfError::Config(format!("partition: {e}")))?;
        self.reoptimize
            .validate()
            .map_err(|e| ShelfError::Config(format!("reoptimize: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = ShelfConfig::from_toml_str("").unwrap();
        assert_eq!(config, ShelfConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ShelfConfig::from_toml_str(
            r#"
            [allocation]
            flex_space = 0.25

            [partition]
            divider_width = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.allocation.flex_space, 0.25);
        assert_eq!(config.allocation.max_steps, 0);
        assert_eq!(config.partition.divider_width, 0.5);
        assert_eq!(config.partition.divider_tolerance, 0.01);
        assert_eq!(config.reoptimize, ReoptimizeConfig::default());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = ShelfConfig::from_toml_str("[allocation]\nflex_space = -1.0\n").unwrap_err();
        assert!(matches!(err, ShelfError::Config(ref m) if m.starts_with("allocation")));

        let err = ShelfConfig::from_toml_str("[allocation]\nflex_space = \"wide\"\n").unwrap_err();
        assert!(matches!(err, ShelfError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ShelfConfig::load_from_file("/nonexistent/shelf.toml").unwrap_err();
        assert!(matches!(err, ShelfError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }
}
