//! Re-optimization configuration.

use serde::{Deserialize, Serialize};

/// Parameters of the second allocation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReoptimizeConfig {
    /// Allowance over a block's width ceiling.
    pub ceiling_tolerance: f64,
    /// Facing count a reset placement restarts from.
    pub base_facings: u32,
    /// Facing count for placements tagged `extra`.
    pub extra_facings: u32,
}

impl Default for ReoptimizeConfig {
    fn default() -> Self {
        Self {
            ceiling_tolerance: 0.05,
            base_facings: 1,
            extra_facings: 2,
        }
    }
}

impl ReoptimizeConfig {
    pub fn with_ceiling_tolerance(mut self, tolerance: f64) -> Self {
        self.ceiling_tolerance = tolerance;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.ceiling_tolerance.is_finite() || self.ceiling_tolerance < 0.0 {
            return Err("ceiling_tolerance must be a non-negative number".into());
        }
        if self.base_facings == 0 || self.extra_facings == 0 {
            return Err("reset facing counts must be at least 1".into());
        }
        Ok(())
    }
}
