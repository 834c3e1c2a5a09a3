//! Divider placement configuration.

use serde::{Deserialize, Serialize};

/// Geometry of divider fixtures and re-laid placements.
///
/// # Examples
///
/// ```
/// use u_shelf::partition::PartitionConfig;
///
/// let config = PartitionConfig::default().with_divider_width(0.5);
/// assert!((config.divider_allowance() - 0.51).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Fixed width of a divider fixture.
    pub divider_width: f64,
    /// Extra clearance added to the divider width between sub-groups.
    pub divider_tolerance: f64,
    /// Fixed height of a divider fixture.
    pub divider_height: f64,
    /// Gap inserted between successive re-laid placements.
    pub position_step: f64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            divider_width: 0.6,
            divider_tolerance: 0.01,
            divider_height: 0.5,
            position_step: 0.01,
        }
    }
}

impl PartitionConfig {
    pub fn with_divider_width(mut self, width: f64) -> Self {
        self.divider_width = width;
        self
    }

    pub fn with_divider_tolerance(mut self, tolerance: f64) -> Self {
        self.divider_tolerance = tolerance;
        self
    }

    pub fn with_divider_height(mut self, height: f64) -> Self {
        self.divider_height = height;
        self
    }

    pub fn with_position_step(mut self, step: f64) -> Self {
        self.position_step = step;
        self
    }

    /// Width reserved between consecutive sub-groups.
    pub fn divider_allowance(&self) -> f64 {
        self.divider_width + self.divider_tolerance
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("divider_width", self.divider_width),
            ("divider_tolerance", self.divider_tolerance),
            ("divider_height", self.divider_height),
            ("position_step", self.position_step),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}
