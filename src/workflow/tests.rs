use super::*;
use crate::config::AutoModeConfig;
use crate::error::AutoModeError;
use crate::registry::PromptCategory;
use crate::template::{VariableContext, vars};

fn orch() -> Orchestrator {
    Orchestrator::new(AutoModeConfig::default())
}

fn orch_with_limit(retry_limit: u32) -> Orchestrator {
    Orchestrator::new(AutoModeConfig {
        retry_limit,
        ..AutoModeConfig::default()
    })
}

fn feature_vars() -> VariableContext {
    vars([
        ("featureId", "F1"),
        ("title", "Dark mode"),
        ("description", "Add a dark color scheme toggle"),
    ])
}

const PLAN_RESPONSE: &str = "Here is the plan.\n\n[PLAN_GENERATED]";

const SPEC_WITH_TASKS: &str = concat!(
    "Specification follows.\n\n[SPEC_GENERATED]\n",
    "```json\n",
    "{\"tasks\": [",
    "{\"id\": \"1\", \"description\": \"scaffold the toggle\"},",
    "{\"id\": \"2\", \"description\": \"persist the preference\"}",
    "]}\n",
    "```\n",
);

/// Drive a lite-approval run up to `Executing`.
fn executing_run(orch: &Orchestrator) -> String {
    let started = orch.start_run(PlanningMode::LiteApproval, feature_vars()).unwrap();
    orch.advance(&started.run_id, PLAN_RESPONSE).unwrap();
    orch.approve(&started.run_id).unwrap();
    let outcome = orch.approve(&started.run_id).unwrap();
    assert_eq!(outcome.state, WorkflowState::Executing);
    started.run_id
}

#[test]
fn start_run_renders_planning_prompt() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();

    assert_eq!(started.run_id, "RUN-001");
    assert_eq!(orch.run_state(&started.run_id).unwrap(), WorkflowState::Planning);
    assert_eq!(started.prompt.category, PromptCategory::AutoMode);
    assert_eq!(started.prompt.key, "planning_lite");
    assert!(started.prompt.text.contains("Dark mode"));
    assert!(started.prompt.missing.is_empty());
}

#[test]
fn run_ids_increment() {
    let orch = orch();
    assert_eq!(orch.start_run(PlanningMode::Lite, feature_vars()).unwrap().run_id, "RUN-001");
    assert_eq!(orch.start_run(PlanningMode::Lite, feature_vars()).unwrap().run_id, "RUN-002");
}

#[test]
fn default_mode_comes_from_config() {
    let orch = Orchestrator::new(AutoModeConfig {
        default_mode: PlanningMode::Spec,
        ..AutoModeConfig::default()
    });
    let started = orch.start_run_default(feature_vars()).unwrap();
    assert_eq!(started.prompt.key, "planning_spec");
}

#[test]
fn lite_plan_skips_approval_gate() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();

    let outcome = orch.advance(&started.run_id, PLAN_RESPONSE).unwrap();
    assert_eq!(outcome.state, WorkflowState::SpecGenerated);
    assert!(outcome.next_prompt.is_none());
    assert_eq!(
        outcome.event.unwrap().marker(),
        Some(crate::marker::PLAN_GENERATED)
    );
}

#[test]
fn lite_approval_waits_for_caller() {
    let orch = orch();
    let started = orch
        .start_run(PlanningMode::LiteApproval, feature_vars())
        .unwrap();

    let outcome = orch.advance(&started.run_id, PLAN_RESPONSE).unwrap();
    assert_eq!(outcome.state, WorkflowState::AwaitingApproval);

    // No agent response can move the run while it waits on the caller.
    let err = orch.advance(&started.run_id, "[PLAN_GENERATED]").unwrap_err();
    assert!(matches!(err, AutoModeError::InvalidTransition { .. }));
    assert_eq!(
        orch.run_state(&started.run_id).unwrap(),
        WorkflowState::AwaitingApproval
    );

    let outcome = orch.approve(&started.run_id).unwrap();
    assert_eq!(outcome.state, WorkflowState::SpecGenerated);
    assert!(outcome.next_prompt.is_none());

    let outcome = orch.approve(&started.run_id).unwrap();
    assert_eq!(outcome.state, WorkflowState::Executing);
    let prompt = outcome.next_prompt.expect("execution prompt");
    assert_eq!(prompt.key, "continuation_after_approval_template");
    assert!(prompt.text.contains("Here is the plan."));
}

#[test]
fn reject_requests_plan_revision() {
    let orch = orch();
    let started = orch
        .start_run(PlanningMode::LiteApproval, feature_vars())
        .unwrap();
    orch.advance(&started.run_id, PLAN_RESPONSE).unwrap();

    let outcome = orch
        .reject(&started.run_id, "split the toggle work into two steps")
        .unwrap();
    assert_eq!(outcome.state, WorkflowState::Planning);
    let prompt = outcome.next_prompt.expect("revision prompt");
    assert_eq!(prompt.key, "plan_revision_template");
    assert!(prompt.text.contains("split the toggle work into two steps"));
    assert!(prompt.text.contains("Here is the plan."));

    // A revised plan goes back through the approval gate.
    let outcome = orch.advance(&started.run_id, PLAN_RESPONSE).unwrap();
    assert_eq!(outcome.state, WorkflowState::AwaitingApproval);
}

#[test]
fn reject_outside_approval_is_invalid() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    let err = orch.reject(&started.run_id, "no").unwrap_err();
    assert!(matches!(err, AutoModeError::InvalidTransition { .. }));
}

#[test]
fn planning_stall_is_bounded() {
    let orch = orch_with_limit(2);
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();

    for _ in 0..2 {
        let outcome = orch.advance(&started.run_id, "still working on it").unwrap();
        assert_eq!(outcome.state, WorkflowState::Planning);
        assert_eq!(outcome.next_prompt.unwrap().key, "continuation_prompt_template");
    }

    let outcome = orch.advance(&started.run_id, "still working on it").unwrap();
    assert_eq!(outcome.state, WorkflowState::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::PlanningStalled));
    assert!(outcome.next_prompt.is_none());

    // One exchange per attempt: the initial turn plus one per retry.
    assert_eq!(orch.history(&started.run_id).unwrap().len(), 3);
}

#[test]
fn zero_retry_limit_fails_on_first_missing_marker() {
    let orch = orch_with_limit(0);
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    let outcome = orch.advance(&started.run_id, "").unwrap();
    assert_eq!(outcome.state, WorkflowState::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::PlanningStalled));
}

#[test]
fn unexpected_marker_counts_as_retry() {
    let orch = orch_with_limit(0);
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();

    // TASK_COMPLETE is not actionable during planning.
    let outcome = orch.advance(&started.run_id, "[TASK_COMPLETE]").unwrap();
    assert_eq!(outcome.state, WorkflowState::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::PlanningStalled));
}

#[test]
fn execution_stall_reports_execution_stalled() {
    let orch = orch_with_limit(1);
    let run_id = executing_run(&orch);

    let outcome = orch.advance(&run_id, "checkpointing progress").unwrap();
    assert_eq!(outcome.state, WorkflowState::AwaitingContinuation);
    assert_eq!(outcome.next_prompt.unwrap().key, "continuation_prompt_template");

    let outcome = orch.advance(&run_id, "more progress").unwrap();
    assert_eq!(outcome.state, WorkflowState::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::ExecutionStalled));
}

#[test]
fn spec_mode_runs_the_task_loop() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Spec, feature_vars()).unwrap();
    assert_eq!(started.prompt.key, "planning_spec");

    let outcome = orch.advance(&started.run_id, SPEC_WITH_TASKS).unwrap();
    assert_eq!(outcome.state, WorkflowState::Executing);
    let prompt = outcome.next_prompt.expect("first task prompt");
    assert_eq!(prompt.key, "task_prompt_template");
    assert!(prompt.text.contains("scaffold the toggle"));
    assert!(prompt.text.contains("(none)"));

    let outcome = orch.advance(&started.run_id, "done\n[TASK_COMPLETE]").unwrap();
    assert_eq!(outcome.state, WorkflowState::Executing);
    let prompt = outcome.next_prompt.expect("second task prompt");
    assert!(prompt.text.contains("persist the preference"));
    assert!(prompt.text.contains("- 1: scaffold the toggle"));

    let outcome = orch.advance(&started.run_id, "done\n[TASK_COMPLETE]").unwrap();
    assert_eq!(outcome.state, WorkflowState::LearningExtraction);
    let prompt = outcome.next_prompt.expect("learning prompt");
    assert_eq!(prompt.key, "learning_extraction_user_prompt_template");
    assert!(prompt.text.contains("Dark mode"));

    let outcome = orch
        .advance(&started.run_id, "Lessons...\n[LEARNINGS_EXTRACTED]")
        .unwrap();
    assert_eq!(outcome.state, WorkflowState::Complete);
    assert!(outcome.state.is_terminal());
    assert!(outcome.failure.is_none());
}

#[test]
fn plan_then_spec_in_spec_mode() {
    // Spec mode accepts either marker during planning; a plan-only answer
    // parks the run until the spec arrives.
    let orch = orch();
    let started = orch.start_run(PlanningMode::Spec, feature_vars()).unwrap();

    let outcome = orch.advance(&started.run_id, PLAN_RESPONSE).unwrap();
    assert_eq!(outcome.state, WorkflowState::SpecGenerated);

    let outcome = orch.advance(&started.run_id, SPEC_WITH_TASKS).unwrap();
    assert_eq!(outcome.state, WorkflowState::Executing);
}

#[test]
fn ambiguous_markers_resolve_to_last_occurrence() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Spec, feature_vars()).unwrap();

    let text = format!("[PLAN_GENERATED] superseded below.\n\n{}", SPEC_WITH_TASKS);
    let outcome = orch.advance(&started.run_id, &text).unwrap();
    assert_eq!(outcome.state, WorkflowState::Executing);
    assert!(matches!(
        outcome.event,
        Some(crate::marker::ParsedEvent::AmbiguousMarkers { .. })
    ));
}

#[test]
fn feature_complete_ends_execution_without_backlog() {
    let orch = orch();
    let run_id = executing_run(&orch);

    let outcome = orch
        .advance(&run_id, "All done.\n[FEATURE_COMPLETE]")
        .unwrap();
    assert_eq!(outcome.state, WorkflowState::LearningExtraction);
}

#[test]
fn learning_stall_completes_the_run() {
    // Extraction is best-effort: running out of retries there must not fail
    // a feature that already finished.
    let orch = orch_with_limit(0);
    let run_id = executing_run(&orch);
    orch.advance(&run_id, "[FEATURE_COMPLETE]").unwrap();

    let outcome = orch.advance(&run_id, "nothing to report").unwrap();
    assert_eq!(outcome.state, WorkflowState::Complete);
    assert!(outcome.failure.is_none());
}

#[test]
fn interrupt_and_resume() {
    let orch = orch();
    let run_id = executing_run(&orch);
    orch.advance(&run_id, "made some progress on the toggle").unwrap();

    let outcome = orch.interrupt(&run_id).unwrap();
    assert_eq!(outcome.state, WorkflowState::Interrupted);

    let err = orch.advance(&run_id, "[FEATURE_COMPLETE]").unwrap_err();
    assert!(matches!(err, AutoModeError::InvalidTransition { .. }));

    let outcome = orch.resume(&run_id).unwrap();
    assert_eq!(outcome.state, WorkflowState::Executing);
    let prompt = outcome.next_prompt.expect("resume prompt");
    assert_eq!(prompt.key, "resume_feature_template");
    assert!(prompt.text.contains("made some progress on the toggle"));
}

#[test]
fn resume_requires_interrupted_state() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    let err = orch.resume(&started.run_id).unwrap_err();
    match err {
        AutoModeError::InvalidTransition { state, action, .. } => {
            assert_eq!(state, "planning");
            assert_eq!(action, "resume");
        }
        other => panic!("expected InvalidTransition, got {:?}", other),
    }
}

#[test]
fn interrupt_requires_execution_phase() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    let err = orch.interrupt(&started.run_id).unwrap_err();
    assert!(matches!(err, AutoModeError::InvalidTransition { .. }));
}

#[test]
fn abort_from_any_active_state() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();

    let outcome = orch.abort(&started.run_id).unwrap();
    assert_eq!(outcome.state, WorkflowState::Failed);
    assert_eq!(outcome.failure, Some(FailureReason::Aborted));
    assert_eq!(
        orch.failure_reason(&started.run_id).unwrap(),
        Some(FailureReason::Aborted)
    );

    // Terminal runs cannot be aborted again.
    let err = orch.abort(&started.run_id).unwrap_err();
    assert!(matches!(err, AutoModeError::InvalidTransition { .. }));
}

#[test]
fn unknown_run_id() {
    let orch = orch();
    let err = orch.advance("RUN-999", "[PLAN_GENERATED]").unwrap_err();
    assert!(matches!(err, AutoModeError::RunNotFound(id) if id == "RUN-999"));
    assert!(orch.run_state("RUN-999").is_err());
}

#[test]
fn override_takes_effect_on_next_render() {
    let orch = orch();
    orch.set_override(
        PromptCategory::AutoMode,
        "planning_lite",
        "Plan {{title}} my way. End with [PLAN_GENERATED].",
        true,
    )
    .unwrap();

    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    assert_eq!(started.prompt.text, "Plan Dark mode my way. End with [PLAN_GENERATED].");

    orch.clear_override(PromptCategory::AutoMode, "planning_lite").unwrap();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    assert_ne!(started.prompt.text, "Plan Dark mode my way. End with [PLAN_GENERATED].");
}

#[test]
fn override_mid_run_affects_next_turn_only() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    let first = started.prompt.text.clone();

    orch.set_override(
        PromptCategory::AutoMode,
        "continuation_prompt_template",
        "Keep going: {{featurePrompt}}",
        true,
    )
    .unwrap();

    // The already-rendered planning prompt is unaffected; the continuation
    // rendered after this turn uses the override.
    let outcome = orch.advance(&started.run_id, "no marker yet").unwrap();
    let prompt = outcome.next_prompt.unwrap();
    assert_eq!(prompt.text, format!("Keep going: {}", first));
}

#[test]
fn concurrent_runs_are_independent() {
    let orch = orch();
    let a = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    let b = orch
        .start_run(PlanningMode::LiteApproval, feature_vars())
        .unwrap();

    orch.advance(&a.run_id, PLAN_RESPONSE).unwrap();
    orch.advance(&b.run_id, PLAN_RESPONSE).unwrap();

    assert_eq!(orch.run_state(&a.run_id).unwrap(), WorkflowState::SpecGenerated);
    assert_eq!(
        orch.run_state(&b.run_id).unwrap(),
        WorkflowState::AwaitingApproval
    );
}

#[test]
fn history_records_prompts_and_events() {
    let orch = orch();
    let started = orch.start_run(PlanningMode::Lite, feature_vars()).unwrap();
    orch.advance(&started.run_id, PLAN_RESPONSE).unwrap();

    let history = orch.history(&started.run_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].seq, 1);
    assert_eq!(history[0].prompt.as_ref().unwrap().key, "planning_lite");
    assert_eq!(history[0].state_after, WorkflowState::SpecGenerated);
    assert!(history[0].to_ndjson_line().unwrap().contains("marker_found"));
}

#[test]
fn context_carries_across_turns() {
    let orch = orch();
    let run_id = executing_run(&orch);

    orch.advance(&run_id, "wired up the toggle component").unwrap();
    let context = orch.previous_context(&run_id).unwrap();
    assert!(context.contains("wired up the toggle component"));
    // Planning output is carried too.
    assert!(context.contains("Here is the plan."));
}
