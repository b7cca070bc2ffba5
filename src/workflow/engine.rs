//! The workflow orchestrator.
//!
//! [`Orchestrator`] ties the registry, customization store, renderer, and
//! marker parser together into the run-level state machine. It owns the run
//! table; the registry and store are shared, read-mostly resources with
//! single-writer override semantics.
//!
//! Every operation that moves a run forward returns the next rendered
//! prompt (when there is one) instead of performing any I/O: the caller
//! sends it to the LLM transport and feeds the response back through
//! [`Orchestrator::advance`]. A transport timeout is the caller's concern;
//! feeding the empty string advances the run down the same retry path as a
//! marker-less response.

use crate::config::AutoModeConfig;
use crate::customize::{CustomizationStore, PromptCustomization};
use crate::error::{AutoModeError, Result};
use crate::marker::{
    self, FEATURE_COMPLETE, LEARNINGS_EXTRACTED, PLAN_GENERATED, ParsedEvent, SPEC_GENERATED,
    TASK_COMPLETE,
};
use crate::registry::{PromptCategory, PromptRegistry};
use crate::template::{self, VariableContext};
use crate::workflow::run::{TurnPrompt, WorkflowRun};
use crate::workflow::{FailureReason, PlanningMode, WorkflowState};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

/// A rendered prompt ready to be sent to the LLM transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Category of the slot that produced the prompt.
    pub category: PromptCategory,
    /// Key of the slot that produced the prompt.
    pub key: String,
    /// The rendered text.
    pub text: String,
    /// Placeholder names left unresolved. Usually empty; a non-empty set
    /// points at a caller/catalog mismatch and is logged when rendered.
    pub missing: BTreeSet<String>,
}

/// Result of starting a run: its id and the first prompt to send.
#[derive(Debug, Clone)]
pub struct StartedRun {
    /// The new run's identifier (e.g., "RUN-001").
    pub run_id: String,
    /// The rendered planning prompt.
    pub prompt: PromptRequest,
}

/// Result of advancing a run or applying a caller action.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The run's state after the operation.
    pub state: WorkflowState,
    /// The parsed marker event, for [`Orchestrator::advance`] calls.
    pub event: Option<ParsedEvent>,
    /// The next prompt to send, when the workflow needs another turn.
    pub next_prompt: Option<PromptRequest>,
    /// Why the run failed, when `state` is `Failed`.
    pub failure: Option<FailureReason>,
}

struct RunTable {
    runs: HashMap<String, WorkflowRun>,
    next_run_number: u32,
}

/// The multi-run workflow engine.
pub struct Orchestrator {
    registry: Arc<PromptRegistry>,
    store: RwLock<CustomizationStore>,
    config: AutoModeConfig,
    table: Mutex<RunTable>,
}

impl Orchestrator {
    /// Create an orchestrator over the built-in catalog.
    pub fn new(config: AutoModeConfig) -> Self {
        Self::with_registry(Arc::new(PromptRegistry::builtin()), config)
    }

    /// Create an orchestrator over a caller-provided registry.
    pub fn with_registry(registry: Arc<PromptRegistry>, config: AutoModeConfig) -> Self {
        let store = RwLock::new(CustomizationStore::new(Arc::clone(&registry)));
        Self {
            registry,
            store,
            config,
            table: Mutex::new(RunTable {
                runs: HashMap::new(),
                next_run_number: 1,
            }),
        }
    }

    /// The shared prompt registry.
    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Customization passthroughs (single-writer, visible to all runs on
    // their next slot lookup)
    // ------------------------------------------------------------------

    /// Set or replace the override for a slot.
    pub fn set_override(
        &self,
        category: PromptCategory,
        key: &str,
        text: impl Into<String>,
        enabled: bool,
    ) -> Result<()> {
        self.write_store().set_override(category, key, text, enabled)
    }

    /// Remove the override for a slot.
    pub fn clear_override(&self, category: PromptCategory, key: &str) -> Result<()> {
        self.write_store().clear_override(category, key)
    }

    /// Clear all overrides within one category.
    pub fn reset_category(&self, category: PromptCategory) {
        self.write_store().reset_category(category);
    }

    /// Clear all overrides.
    pub fn reset_all(&self) {
        self.write_store().reset_all();
    }

    /// The effective text for a slot: enabled override, else default.
    pub fn get_effective_text(&self, category: PromptCategory, key: &str) -> Result<String> {
        self.read_store().get_effective_text(category, key)
    }

    /// Snapshot of the override state for persistence.
    pub fn customization(&self) -> PromptCustomization {
        self.read_store().customization().clone()
    }

    /// Replace the override state from a persisted document.
    pub fn load_customization(&self, customization: PromptCustomization) {
        self.write_store().load(customization);
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render a slot with the caller's variable context.
    ///
    /// This is the general entry point for one-shot prompts outside any
    /// run (agent chat, commit messages, enhancements, ...). Unresolved
    /// variables are tolerated but logged: they usually mean the caller's
    /// context disagrees with the catalog.
    pub fn render_slot(
        &self,
        category: PromptCategory,
        key: &str,
        context: &VariableContext,
    ) -> Result<PromptRequest> {
        let text = self.read_store().get_effective_text(category, key)?;
        let rendered = template::render(&text, context);
        if !rendered.missing.is_empty() {
            warn!(
                category = %category,
                key = %key,
                missing = ?rendered.missing,
                "rendered prompt has unresolved variables"
            );
        }
        Ok(PromptRequest {
            category,
            key: key.to_string(),
            text: rendered.text,
            missing: rendered.missing,
        })
    }

    // ------------------------------------------------------------------
    // Run lifecycle
    // ------------------------------------------------------------------

    /// Start a run in the given planning mode.
    ///
    /// Returns the run id and the rendered planning prompt. The caller's
    /// variables should cover the planning slot's declared set
    /// (featureId, title, description).
    pub fn start_run(
        &self,
        mode: PlanningMode,
        initial_vars: VariableContext,
    ) -> Result<StartedRun> {
        let mut table = self.lock_table();
        let run_id = format!("RUN-{:03}", table.next_run_number);
        table.next_run_number += 1;

        let mut run = WorkflowRun::new(run_id.clone(), mode, initial_vars);
        let prompt = self.render_slot(
            PromptCategory::AutoMode,
            mode.planning_slot_key(),
            &run.feature_vars,
        )?;

        run.state = WorkflowState::Planning;
        run.feature_prompt = prompt.text.clone();
        run.pending = Some(prompt_ref(&prompt));

        debug!(run_id = %run_id, mode = ?mode, "workflow run started");
        table.runs.insert(run_id.clone(), run);

        Ok(StartedRun { run_id, prompt })
    }

    /// Start a run in the configured default planning mode.
    pub fn start_run_default(&self, initial_vars: VariableContext) -> Result<StartedRun> {
        self.start_run(self.config.default_mode, initial_vars)
    }

    /// Feed an agent response into a run and take the resulting transition.
    pub fn advance(&self, run_id: &str, response_text: &str) -> Result<TurnOutcome> {
        let mut table = self.lock_table();
        let run = get_run(&mut table, run_id)?;

        if !matches!(
            run.state,
            WorkflowState::Planning
                | WorkflowState::SpecGenerated
                | WorkflowState::Executing
                | WorkflowState::AwaitingContinuation
                | WorkflowState::LearningExtraction
        ) {
            return Err(invalid(run, "advance"));
        }

        let expected = expected_markers(run);
        let event = marker::parse(response_text, &expected);
        run.absorb_response(response_text, self.config.context_carry_chars);

        let next_prompt = match (run.state, event.marker()) {
            (WorkflowState::Planning, Some(m)) if m == PLAN_GENERATED => {
                run.absorb_plan(response_text, event.payload());
                run.retries = 0;
                run.state = if run.mode.requires_approval() {
                    WorkflowState::AwaitingApproval
                } else {
                    WorkflowState::SpecGenerated
                };
                None
            }
            (WorkflowState::Planning | WorkflowState::SpecGenerated, Some(m))
                if m == SPEC_GENERATED =>
            {
                run.absorb_plan(response_text, event.payload());
                run.retries = 0;
                run.state = WorkflowState::Executing;
                Some(self.execution_prompt(run)?)
            }
            (WorkflowState::Executing | WorkflowState::AwaitingContinuation, Some(m))
                if m == TASK_COMPLETE =>
            {
                run.retries = 0;
                if run.complete_current_task() {
                    run.state = WorkflowState::Executing;
                    Some(self.execution_prompt(run)?)
                } else {
                    run.state = WorkflowState::LearningExtraction;
                    Some(self.learning_prompt(run)?)
                }
            }
            (WorkflowState::Executing | WorkflowState::AwaitingContinuation, Some(m))
                if m == FEATURE_COMPLETE =>
            {
                run.retries = 0;
                run.state = WorkflowState::LearningExtraction;
                Some(self.learning_prompt(run)?)
            }
            (WorkflowState::LearningExtraction, Some(m)) if m == LEARNINGS_EXTRACTED => {
                run.retries = 0;
                run.state = WorkflowState::Complete;
                None
            }
            // NoMarker, or a marker that is not actionable in this state.
            _ => self.handle_missing_marker(run)?,
        };

        run.push_turn(response_text, event.clone());
        if let Some(prompt) = &next_prompt {
            run.pending = Some(prompt_ref(prompt));
        }

        debug!(
            run_id = %run.run_id,
            state = %run.state,
            marker = event.marker().unwrap_or("none"),
            "run advanced"
        );

        Ok(TurnOutcome {
            state: run.state,
            event: Some(event),
            next_prompt,
            failure: run.failure,
        })
    }

    /// Approve a run.
    ///
    /// From `AwaitingApproval` this accepts the plan (the run moves to
    /// `SpecGenerated`); from `SpecGenerated` it begins execution and
    /// returns the first execution prompt.
    pub fn approve(&self, run_id: &str) -> Result<TurnOutcome> {
        let mut table = self.lock_table();
        let run = get_run(&mut table, run_id)?;

        match run.state {
            WorkflowState::AwaitingApproval => {
                run.state = WorkflowState::SpecGenerated;
                run.retries = 0;
                run.pending = None;
                debug!(run_id = %run.run_id, "plan approved");
                Ok(outcome(run, None))
            }
            WorkflowState::SpecGenerated => {
                run.state = WorkflowState::Executing;
                run.retries = 0;
                let prompt = self.execution_prompt(run)?;
                run.pending = Some(prompt_ref(&prompt));
                debug!(run_id = %run.run_id, "execution started");
                Ok(outcome(run, Some(prompt)))
            }
            _ => Err(invalid(run, "approve")),
        }
    }

    /// Reject a plan with feedback, sending the run back to planning.
    ///
    /// The feedback is carried as the `userFeedback` variable of the
    /// plan-revision prompt.
    pub fn reject(&self, run_id: &str, feedback: &str) -> Result<TurnOutcome> {
        let mut table = self.lock_table();
        let run = get_run(&mut table, run_id)?;

        if run.state != WorkflowState::AwaitingApproval {
            return Err(invalid(run, "reject"));
        }

        run.feature_vars
            .insert("userFeedback".to_string(), feedback.to_string());

        let vars = template::vars([
            ("planVersion", run.plan_version.to_string()),
            ("previousPlan", run.plan_text.clone()),
            ("userFeedback", feedback.to_string()),
        ]);
        let prompt = self.render_slot(
            PromptCategory::TaskExecution,
            "plan_revision_template",
            &vars,
        )?;

        run.state = WorkflowState::Planning;
        run.retries = 0;
        run.feature_prompt = prompt.text.clone();
        run.pending = Some(prompt_ref(&prompt));
        debug!(run_id = %run.run_id, "plan rejected, revision requested");
        Ok(outcome(run, Some(prompt)))
    }

    /// Mark a run as externally interrupted.
    ///
    /// The run's carried context stays on the run for a later
    /// [`Orchestrator::resume`].
    pub fn interrupt(&self, run_id: &str) -> Result<TurnOutcome> {
        let mut table = self.lock_table();
        let run = get_run(&mut table, run_id)?;

        if !matches!(
            run.state,
            WorkflowState::Executing | WorkflowState::AwaitingContinuation
        ) {
            return Err(invalid(run, "interrupt"));
        }

        run.state = WorkflowState::Interrupted;
        run.pending = None;
        debug!(run_id = %run.run_id, "run interrupted");
        Ok(outcome(run, None))
    }

    /// Resume an interrupted run with the resume-feature prompt.
    pub fn resume(&self, run_id: &str) -> Result<TurnOutcome> {
        let mut table = self.lock_table();
        let run = get_run(&mut table, run_id)?;

        if run.state != WorkflowState::Interrupted {
            return Err(invalid(run, "resume"));
        }

        let vars = template::vars([
            ("featurePrompt", run.feature_prompt.clone()),
            ("previousContext", run.previous_context.clone()),
        ]);
        let prompt = self.render_slot(
            PromptCategory::TaskExecution,
            "resume_feature_template",
            &vars,
        )?;

        run.state = WorkflowState::Executing;
        run.retries = 0;
        run.pending = Some(prompt_ref(&prompt));
        debug!(run_id = %run.run_id, "run resumed");
        Ok(outcome(run, Some(prompt)))
    }

    /// Abort a run. Valid from any non-terminal state.
    pub fn abort(&self, run_id: &str) -> Result<TurnOutcome> {
        let mut table = self.lock_table();
        let run = get_run(&mut table, run_id)?;

        if run.state.is_terminal() {
            return Err(invalid(run, "abort"));
        }

        run.state = WorkflowState::Failed;
        run.failure = Some(FailureReason::Aborted);
        run.pending = None;
        debug!(run_id = %run.run_id, "run aborted");
        Ok(outcome(run, None))
    }

    // ------------------------------------------------------------------
    // Run accessors
    // ------------------------------------------------------------------

    /// A run's current state.
    pub fn run_state(&self, run_id: &str) -> Result<WorkflowState> {
        let mut table = self.lock_table();
        Ok(get_run(&mut table, run_id)?.state)
    }

    /// A run's failure reason, if it failed.
    pub fn failure_reason(&self, run_id: &str) -> Result<Option<FailureReason>> {
        let mut table = self.lock_table();
        Ok(get_run(&mut table, run_id)?.failure)
    }

    /// A run's full turn history, oldest first.
    pub fn history(&self, run_id: &str) -> Result<Vec<crate::workflow::Turn>> {
        let mut table = self.lock_table();
        Ok(get_run(&mut table, run_id)?.history().to_vec())
    }

    /// The carried context summary for a run.
    pub fn previous_context(&self, run_id: &str) -> Result<String> {
        let mut table = self.lock_table();
        Ok(get_run(&mut table, run_id)?.previous_context.clone())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Missing or non-actionable marker: retry within budget, else stall.
    ///
    /// Planning-phase stalls surface as `PlanningStalled`, execution-phase
    /// stalls as `ExecutionStalled`. Learning extraction is best-effort: a
    /// stall there completes the run rather than failing work that already
    /// finished.
    fn handle_missing_marker(&self, run: &mut WorkflowRun) -> Result<Option<PromptRequest>> {
        if run.retries < self.config.retry_limit {
            run.retries += 1;
            if matches!(
                run.state,
                WorkflowState::Executing | WorkflowState::AwaitingContinuation
            ) {
                run.state = WorkflowState::AwaitingContinuation;
            }
            let vars = template::vars([
                ("featurePrompt", run.feature_prompt.clone()),
                ("previousContext", run.previous_context.clone()),
            ]);
            let prompt = self.render_slot(
                PromptCategory::AutoMode,
                "continuation_prompt_template",
                &vars,
            )?;
            return Ok(Some(prompt));
        }

        match run.state {
            WorkflowState::LearningExtraction => {
                warn!(run_id = %run.run_id, "learning extraction stalled, completing run");
                run.state = WorkflowState::Complete;
            }
            WorkflowState::Planning | WorkflowState::SpecGenerated => {
                run.state = WorkflowState::Failed;
                run.failure = Some(FailureReason::PlanningStalled);
            }
            _ => {
                run.state = WorkflowState::Failed;
                run.failure = Some(FailureReason::ExecutionStalled);
            }
        }
        Ok(None)
    }

    /// Render the prompt that enters or continues execution.
    ///
    /// With a task backlog, each task gets the task prompt; without one,
    /// approval-gated runs continue from the approved plan and ungated
    /// runs get the full feature prompt.
    fn execution_prompt(&self, run: &mut WorkflowRun) -> Result<PromptRequest> {
        let prompt = if let Some(task) = run.current_task() {
            let vars = template::vars([
                ("taskId", task.id.clone()),
                ("taskDescription", task.description.clone()),
                ("completedTasks", run.completed_tasks_summary()),
            ]);
            self.render_slot(PromptCategory::TaskExecution, "task_prompt_template", &vars)?
        } else if run.mode.requires_approval() {
            let vars = template::vars([
                (
                    "userFeedback",
                    run.feature_vars
                        .get("userFeedback")
                        .cloned()
                        .unwrap_or_default(),
                ),
                ("approvedPlan", run.plan_text.clone()),
            ]);
            self.render_slot(
                PromptCategory::TaskExecution,
                "continuation_after_approval_template",
                &vars,
            )?
        } else {
            let mut vars = run.feature_vars.clone();
            vars.insert("spec".to_string(), run.plan_text.clone());
            for optional in ["imagePaths", "dependencies", "verificationInstructions"] {
                vars.entry(optional.to_string()).or_default();
            }
            self.render_slot(
                PromptCategory::AutoMode,
                "feature_prompt_template",
                &vars,
            )?
        };

        run.feature_prompt = prompt.text.clone();
        Ok(prompt)
    }

    /// Render the learning-extraction prompt from the run's history.
    fn learning_prompt(&self, run: &WorkflowRun) -> Result<PromptRequest> {
        let feature_title = run
            .feature_vars
            .get("title")
            .or_else(|| run.feature_vars.get("featureId"))
            .cloned()
            .unwrap_or_default();
        let vars = template::vars([
            ("featureTitle", feature_title),
            ("implementationLog", run.previous_context.clone()),
        ]);
        self.render_slot(
            PromptCategory::TaskExecution,
            "learning_extraction_user_prompt_template",
            &vars,
        )
    }

    fn lock_table(&self) -> MutexGuard<'_, RunTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_store(&self) -> std::sync::RwLockReadGuard<'_, CustomizationStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_store(&self) -> std::sync::RwLockWriteGuard<'_, CustomizationStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn get_run<'a>(table: &'a mut RunTable, run_id: &str) -> Result<&'a mut WorkflowRun> {
    table
        .runs
        .get_mut(run_id)
        .ok_or_else(|| AutoModeError::RunNotFound(run_id.to_string()))
}

fn invalid(run: &WorkflowRun, action: &str) -> AutoModeError {
    AutoModeError::InvalidTransition {
        run_id: run.run_id.clone(),
        state: run.state.name().to_string(),
        action: action.to_string(),
    }
}

fn outcome(run: &WorkflowRun, next_prompt: Option<PromptRequest>) -> TurnOutcome {
    TurnOutcome {
        state: run.state,
        event: None,
        next_prompt,
        failure: run.failure,
    }
}

fn prompt_ref(prompt: &PromptRequest) -> TurnPrompt {
    TurnPrompt {
        category: prompt.category,
        key: prompt.key.clone(),
        text: prompt.text.clone(),
    }
}

/// The markers the orchestrator accepts in the run's current state.
fn expected_markers(run: &WorkflowRun) -> BTreeSet<String> {
    match run.state {
        WorkflowState::Planning => match run.mode {
            PlanningMode::Lite | PlanningMode::LiteApproval => marker::expecting([PLAN_GENERATED]),
            PlanningMode::Spec | PlanningMode::Full => {
                marker::expecting([PLAN_GENERATED, SPEC_GENERATED])
            }
        },
        WorkflowState::SpecGenerated => marker::expecting([SPEC_GENERATED]),
        WorkflowState::Executing | WorkflowState::AwaitingContinuation => {
            marker::expecting([TASK_COMPLETE, FEATURE_COMPLETE])
        }
        WorkflowState::LearningExtraction => marker::expecting([LEARNINGS_EXTRACTED]),
        _ => BTreeSet::new(),
    }
}
