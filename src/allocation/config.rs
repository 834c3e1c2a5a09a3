//! Allocation loop configuration.
//!
//! [`AllocationConfig`] holds the parameters that control one run of the
//! balancing/expansion loop.

use serde::{Deserialize, Serialize};

/// Configuration for the allocation loop.
///
/// # Defaults
///
/// ```
/// use u_shelf::allocation::AllocationConfig;
///
/// let config = AllocationConfig::default();
/// assert_eq!(config.flex_space, 0.0);
/// assert_eq!(config.max_steps, 0);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_shelf::allocation::AllocationConfig;
///
/// let config = AllocationConfig::default()
///     .with_flex_space(0.25)
///     .with_max_steps(10_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Slack width subtracted from every run before testing space.
    ///
    /// Adjustable between steps through
    /// [`AllocationLoop::set_flex_space`](super::AllocationLoop::set_flex_space).
    pub flex_space: f64,

    /// Maximum growth rounds per allocation pass (hard budget). 0 = no limit.
    ///
    /// The loop terminates on its own; this bound only lets a host cap
    /// work without wiring up cancellation.
    pub max_steps: usize,

    /// Tolerance for width comparisons.
    pub epsilon: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            flex_space: 0.0,
            max_steps: 0,
            epsilon: 1e-9,
        }
    }
}

impl AllocationConfig {
    pub fn with_flex_space(mut self, flex_space: f64) -> Self {
        self.flex_space = flex_space;
        self
    }

    pub fn with_max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }

    pub fn with_epsilon(mut self, eps: f64) -> Self {
        self.epsilon = eps;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.flex_space.is_finite() || self.flex_space < 0.0 {
            return Err("flex_space must be a non-negative number".into());
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err("epsilon must be a non-negative number".into());
        }
        Ok(())
    }
}
