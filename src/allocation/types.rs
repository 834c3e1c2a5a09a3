//! Loop states and run results.

use crate::constraints::Pass;
use crate::layout::{FixtureId, PlacementId};

/// State of the balancing/expansion machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Growing lagging runs until no placement is balance-eligible.
    Balancing,
    /// One round of growth beyond the current balance point.
    Expansion,
    /// No placement can grow further.
    Done,
    /// Cancelled; the partial allocation stands.
    Aborted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopState::Done | LoopState::Aborted)
    }
}

/// Outcome of one call to [`AllocationLoop::step`](super::AllocationLoop::step).
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// State the step executed in.
    pub phase: LoopState,
    /// State after the step.
    pub next: LoopState,
    /// Placements that gained one facing, in run order.
    pub grown: Vec<PlacementId>,
}

/// Result of a full allocation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationResult {
    pub pass: Pass,
    /// Terminal state: `Done` or `Aborted`.
    pub state: LoopState,
    /// Whether the run was cancelled externally.
    pub cancelled: bool,
    /// Whether `max_steps` stopped the run before it reached a fixed point.
    pub budget_exhausted: bool,
    /// Balancing sub-iterations that grew at least one placement.
    pub balancing_iterations: usize,
    /// Expansion steps that grew at least one placement.
    pub expansion_steps: usize,
    /// Total facings added.
    pub facings_added: usize,
    /// Runs whose consumed width exceeds capacity after the run.
    pub overallocated_runs: Vec<FixtureId>,
}

impl AllocationResult {
    pub fn is_overallocated(&self) -> bool {
        !self.overallocated_runs.is_empty()
    }
}
