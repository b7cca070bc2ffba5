//! Workflow state machine for Auto Mode runs.
//!
//! A run moves through planning, optional approval, per-task execution, and
//! post-hoc learning extraction, driven by two inputs only: parsed marker
//! events from agent responses ([`crate::marker`]) and explicit caller
//! actions (approve, reject, resume, abort). The orchestrator never calls
//! the LLM transport; it hands the caller a rendered prompt and waits for
//! the raw response to come back through [`Orchestrator::advance`].
//!
//! # Turn discipline
//!
//! Each run is strictly turn-based: one outstanding prompt at a time, and
//! the machine only moves after the response is fully parsed. Runs are
//! independent; many can be in flight against the same registry and
//! customization store. A live override change affects an in-flight run's
//! *next* slot lookup, never the turn already rendered.

mod engine;
mod run;

#[cfg(test)]
mod tests;

pub use engine::{Orchestrator, PromptRequest, StartedRun, TurnOutcome};
pub use run::{TaskItem, Turn, TurnPrompt, WorkflowRun};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of a workflow run. Exactly one per active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Created but not started.
    Idle,
    /// A planning prompt is outstanding.
    Planning,
    /// Plan produced; waiting for the caller to approve or reject it.
    AwaitingApproval,
    /// Plan/spec in hand; execution has not begun.
    SpecGenerated,
    /// A task execution prompt is outstanding.
    Executing,
    /// An execution turn came back without a marker; a continuation prompt
    /// is outstanding.
    AwaitingContinuation,
    /// Execution was interrupted externally; context persisted for resume.
    Interrupted,
    /// Backlog exhausted; a learning-extraction prompt is outstanding.
    LearningExtraction,
    /// Terminal: run finished.
    Complete,
    /// Terminal: run failed (stalled or aborted).
    Failed,
}

impl WorkflowState {
    /// The snake_case name used for serialization and display.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Planning => "planning",
            WorkflowState::AwaitingApproval => "awaiting_approval",
            WorkflowState::SpecGenerated => "spec_generated",
            WorkflowState::Executing => "executing",
            WorkflowState::AwaitingContinuation => "awaiting_continuation",
            WorkflowState::Interrupted => "interrupted",
            WorkflowState::LearningExtraction => "learning_extraction",
            WorkflowState::Complete => "complete",
            WorkflowState::Failed => "failed",
        }
    }

    /// Whether the run can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Complete | WorkflowState::Failed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Planning mode selected when a run starts.
///
/// The mode picks the planning slot and decides whether the produced plan
/// waits for explicit caller approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanningMode {
    /// Quick outline, no approval gate.
    #[default]
    Lite,
    /// Quick outline, gated on caller approval.
    LiteApproval,
    /// Detailed specification with task breakdown.
    Spec,
    /// Full Software Design Document.
    Full,
}

impl PlanningMode {
    /// The auto_mode slot key for this mode's planning prompt.
    pub fn planning_slot_key(&self) -> &'static str {
        match self {
            PlanningMode::Lite => "planning_lite",
            PlanningMode::LiteApproval => "planning_lite_with_approval",
            PlanningMode::Spec => "planning_spec",
            PlanningMode::Full => "planning_full",
        }
    }

    /// Whether a generated plan waits for explicit caller approval.
    pub fn requires_approval(&self) -> bool {
        matches!(self, PlanningMode::LiteApproval)
    }

    /// Parse a mode from its snake_case name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lite" => Some(Self::Lite),
            "lite_approval" => Some(Self::LiteApproval),
            "spec" => Some(Self::Spec),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Why a run ended in [`WorkflowState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The retry budget was exhausted while planning.
    PlanningStalled,
    /// The retry budget was exhausted during execution.
    ExecutionStalled,
    /// The caller aborted the run.
    Aborted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::PlanningStalled => "planning_stalled",
            FailureReason::ExecutionStalled => "execution_stalled",
            FailureReason::Aborted => "aborted",
        };
        f.write_str(name)
    }
}
