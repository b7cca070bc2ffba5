//! Per-run state and the append-only turn history.
//!
//! Every completed prompt/response exchange becomes a [`Turn`], appended in
//! order and never rewritten. Turns serialize to single-line JSON so a
//! caller can persist the history as NDJSON for audit or replay, in the
//! same spirit as an append-only event log.

use crate::error::{AutoModeError, Result};
use crate::marker::{ParsedEvent, Payload};
use crate::registry::PromptCategory;
use crate::template::VariableContext;
use crate::workflow::{FailureReason, PlanningMode, WorkflowState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The prompt half of a turn: which slot was used and what it rendered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPrompt {
    /// Category of the slot that produced the prompt.
    pub category: PromptCategory,
    /// Key of the slot that produced the prompt.
    pub key: String,
    /// The rendered prompt text that was sent.
    pub text: String,
}

/// One completed prompt/response exchange in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Position in the run's history, starting at 1.
    pub seq: u32,

    /// RFC3339 timestamp when the response was processed.
    pub ts: DateTime<Utc>,

    /// The orchestrating actor (e.g., `user@HOST`).
    pub actor: String,

    /// The prompt this response answered. Absent when the caller advanced
    /// a run that had no outstanding prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<TurnPrompt>,

    /// The raw agent response text.
    pub raw_response: String,

    /// The parsed marker event.
    pub event: ParsedEvent,

    /// The run's state after this turn was applied.
    pub state_after: WorkflowState,
}

impl Turn {
    /// Serialize the turn to a single-line JSON string for NDJSON logs.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AutoModeError::SerializationError(e.to_string()))
    }
}

/// Get the actor string for turn metadata.
pub(super) fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// One unit of work from the plan's task breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Task identifier from the plan payload.
    pub id: String,
    /// What the task covers.
    pub description: String,
    /// Whether a task-complete marker has been seen for it.
    pub completed: bool,
}

/// All state owned by one workflow run.
#[derive(Debug)]
pub struct WorkflowRun {
    /// Unique identifier (e.g., "RUN-001").
    pub run_id: String,

    /// The planning mode the run was started with.
    pub mode: PlanningMode,

    /// Current state.
    pub state: WorkflowState,

    /// Why the run failed, once it has.
    pub failure: Option<FailureReason>,

    /// Marker-less turns seen in the current state.
    pub retries: u32,

    /// Task backlog recovered from the plan payload. Empty when the plan
    /// carried no task breakdown; execution then runs as a single unit.
    pub tasks: Vec<TaskItem>,

    /// Index of the task currently being executed.
    pub task_index: usize,

    /// Variables supplied by the caller at start (featureId, title, ...).
    pub feature_vars: VariableContext,

    /// Accumulating summary carried across turns, bounded by configuration.
    /// Owned by the run; mutated only by the engine after each turn.
    pub previous_context: String,

    /// The rendered anchor prompt continuation and resume prompts refer
    /// back to: the most recent planning or execution prompt.
    pub feature_prompt: String,

    /// The full text of the last response that produced a plan marker.
    pub plan_text: String,

    /// How many plan versions have been produced (revisions increment it).
    pub plan_version: u32,

    /// The prompt currently awaiting a response, if any.
    pub pending: Option<TurnPrompt>,

    /// Append-only exchange history.
    history: Vec<Turn>,
}

impl WorkflowRun {
    /// Create a run in `Idle` with no history.
    pub(super) fn new(run_id: String, mode: PlanningMode, feature_vars: VariableContext) -> Self {
        Self {
            run_id,
            mode,
            state: WorkflowState::Idle,
            failure: None,
            retries: 0,
            tasks: Vec::new(),
            task_index: 0,
            feature_vars,
            previous_context: String::new(),
            feature_prompt: String::new(),
            plan_text: String::new(),
            plan_version: 0,
            pending: None,
            history: Vec::new(),
        }
    }

    /// The completed exchanges, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Record a completed exchange.
    pub(super) fn push_turn(&mut self, response: &str, event: ParsedEvent) {
        let turn = Turn {
            seq: self.history.len() as u32 + 1,
            ts: Utc::now(),
            actor: actor_string(),
            prompt: self.pending.take(),
            raw_response: response.to_string(),
            event,
            state_after: self.state,
        };
        self.history.push(turn);
    }

    /// Fold a response into the carried context, keeping the newest
    /// `carry_chars` characters.
    pub(super) fn absorb_response(&mut self, response: &str, carry_chars: usize) {
        let trimmed = response.trim();
        if trimmed.is_empty() {
            return;
        }

        if !self.previous_context.is_empty() {
            self.previous_context.push_str("\n\n");
        }
        self.previous_context.push_str(trimmed);

        if self.previous_context.chars().count() > carry_chars {
            let excess = self.previous_context.chars().count() - carry_chars;
            let keep_from = self
                .previous_context
                .char_indices()
                .nth(excess)
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.previous_context.drain(..keep_from);
        }
    }

    /// Absorb a plan-bearing response: capture the plan text, bump the
    /// version, and replace the task backlog from the payload if one is
    /// present.
    pub(super) fn absorb_plan(&mut self, response: &str, payload: Option<&Payload>) {
        self.plan_text = response.trim().to_string();
        self.plan_version += 1;

        if let Some(tasks) = payload.and_then(tasks_from_payload) {
            self.tasks = tasks;
            self.task_index = 0;
        }
    }

    /// The task currently being executed, if the backlog has one.
    pub fn current_task(&self) -> Option<&TaskItem> {
        self.tasks.get(self.task_index)
    }

    /// Mark the current task complete and move to the next.
    ///
    /// Returns true while incomplete tasks remain.
    pub(super) fn complete_current_task(&mut self) -> bool {
        if let Some(task) = self.tasks.get_mut(self.task_index) {
            task.completed = true;
            self.task_index += 1;
        }
        self.task_index < self.tasks.len()
    }

    /// Human-readable list of completed tasks for the task prompt.
    pub(super) fn completed_tasks_summary(&self) -> String {
        let done: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| format!("- {}: {}", t.id, t.description))
            .collect();
        if done.is_empty() {
            "(none)".to_string()
        } else {
            done.join("\n")
        }
    }
}

/// Pull a task backlog out of a plan payload.
///
/// Accepts `{"tasks": [{"id": ..., "description": ...}]}` with ids as
/// strings or numbers; entries missing a description fall back to empty.
/// Raw (unparseable) payloads yield no backlog.
fn tasks_from_payload(payload: &Payload) -> Option<Vec<TaskItem>> {
    let value = payload.as_json()?;
    let entries = value.get("tasks")?.as_array()?;

    let mut tasks = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let id = match entry.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => (i + 1).to_string(),
        };
        let description = entry
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string();
        tasks.push(TaskItem {
            id,
            description,
            completed: false,
        });
    }

    if tasks.is_empty() { None } else { Some(tasks) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run() -> WorkflowRun {
        WorkflowRun::new(
            "RUN-001".to_string(),
            PlanningMode::Lite,
            VariableContext::new(),
        )
    }

    #[test]
    fn new_run_is_idle_and_empty() {
        let run = run();
        assert_eq!(run.state, WorkflowState::Idle);
        assert!(run.history().is_empty());
        assert!(run.previous_context.is_empty());
        assert_eq!(run.plan_version, 0);
    }

    #[test]
    fn absorb_response_accumulates() {
        let mut run = run();
        run.absorb_response("first response", 1000);
        run.absorb_response("second response", 1000);
        assert_eq!(run.previous_context, "first response\n\nsecond response");
    }

    #[test]
    fn absorb_response_keeps_newest_within_cap() {
        let mut run = run();
        run.absorb_response("aaaa", 6);
        run.absorb_response("bbbb", 6);
        assert_eq!(run.previous_context.chars().count(), 6);
        assert!(run.previous_context.ends_with("bbbb"));
    }

    #[test]
    fn absorb_response_ignores_blank() {
        let mut run = run();
        run.absorb_response("   \n  ", 1000);
        assert!(run.previous_context.is_empty());
    }

    #[test]
    fn absorb_response_cap_is_char_safe() {
        let mut run = run();
        run.absorb_response("日本語のテキスト", 4);
        assert_eq!(run.previous_context.chars().count(), 4);
        assert_eq!(run.previous_context, "テキスト");
    }

    #[test]
    fn absorb_plan_captures_tasks() {
        let mut run = run();
        let payload = Payload::Json(json!({
            "tasks": [
                {"id": "1", "description": "first"},
                {"id": 2, "description": "second"},
                {"description": "no id"},
            ]
        }));
        run.absorb_plan("the plan body", Some(&payload));

        assert_eq!(run.plan_text, "the plan body");
        assert_eq!(run.plan_version, 1);
        assert_eq!(run.tasks.len(), 3);
        assert_eq!(run.tasks[0].id, "1");
        assert_eq!(run.tasks[1].id, "2");
        assert_eq!(run.tasks[2].id, "3");
        assert_eq!(run.tasks[2].description, "no id");
    }

    #[test]
    fn absorb_plan_without_payload_keeps_backlog_empty() {
        let mut run = run();
        run.absorb_plan("plan", None);
        assert!(run.tasks.is_empty());
        assert_eq!(run.plan_version, 1);

        // A raw payload carries no backlog either.
        run.absorb_plan("plan v2", Some(&Payload::Raw("{broken".to_string())));
        assert!(run.tasks.is_empty());
        assert_eq!(run.plan_version, 2);
    }

    #[test]
    fn revision_replaces_backlog() {
        let mut run = run();
        run.absorb_plan(
            "v1",
            Some(&Payload::Json(json!({"tasks": [{"id": "a", "description": "x"}]}))),
        );
        run.complete_current_task();
        run.absorb_plan(
            "v2",
            Some(&Payload::Json(json!({"tasks": [
                {"id": "a", "description": "x"},
                {"id": "b", "description": "y"},
            ]}))),
        );

        assert_eq!(run.plan_version, 2);
        assert_eq!(run.task_index, 0);
        assert!(!run.tasks[0].completed);
    }

    #[test]
    fn task_progression() {
        let mut run = run();
        run.absorb_plan(
            "plan",
            Some(&Payload::Json(json!({"tasks": [
                {"id": "1", "description": "first"},
                {"id": "2", "description": "second"},
            ]}))),
        );

        assert_eq!(run.current_task().unwrap().id, "1");
        assert!(run.complete_current_task());
        assert_eq!(run.current_task().unwrap().id, "2");
        assert!(!run.complete_current_task());
        assert!(run.current_task().is_none());
    }

    #[test]
    fn completed_tasks_summary_formats() {
        let mut run = run();
        assert_eq!(run.completed_tasks_summary(), "(none)");

        run.absorb_plan(
            "plan",
            Some(&Payload::Json(json!({"tasks": [
                {"id": "1", "description": "first"},
                {"id": "2", "description": "second"},
            ]}))),
        );
        run.complete_current_task();
        assert_eq!(run.completed_tasks_summary(), "- 1: first");
    }

    #[test]
    fn push_turn_consumes_pending_and_numbers_sequentially() {
        let mut run = run();
        run.pending = Some(TurnPrompt {
            category: PromptCategory::AutoMode,
            key: "planning_lite".to_string(),
            text: "prompt text".to_string(),
        });
        run.push_turn("response", ParsedEvent::NoMarker);
        run.push_turn("another", ParsedEvent::NoMarker);

        let history = run.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].seq, 1);
        assert_eq!(history[1].seq, 2);
        assert_eq!(history[0].prompt.as_ref().unwrap().key, "planning_lite");
        assert!(history[1].prompt.is_none());
        assert!(history[0].actor.contains('@'));
    }

    #[test]
    fn turn_ndjson_line_is_single_line() {
        let mut run = run();
        run.push_turn("line one\nline two", ParsedEvent::NoMarker);
        let line = run.history()[0].to_ndjson_line().unwrap();
        assert!(!line.contains('\n'));

        let parsed: Turn = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.raw_response, "line one\nline two");
        assert_eq!(parsed.event, ParsedEvent::NoMarker);
    }
}
