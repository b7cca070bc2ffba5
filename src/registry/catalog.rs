//! The built-in prompt catalog.
//!
//! One entry per prompt slot the product ships with, in the order the
//! settings surface presents them. Default texts for workflow-facing slots
//! carry the control markers (`[PLAN_GENERATED]`, `[SPEC_GENERATED]`,
//! `[TASK_COMPLETE]`, ...) the orchestrator scans for, which is why those
//! slots are flagged `critical`.
//!
//! Template slots reference variables with `{{name}}` placeholders; the
//! `variables` list on each slot names what the default text accepts.

use super::{PromptCategory, PromptSlot};

/// Build the full built-in catalog.
pub(super) fn builtin_slots() -> Vec<PromptSlot> {
    let mut slots = Vec::new();
    slots.extend(auto_mode_slots());
    slots.extend(agent_slots());
    slots.extend(backlog_plan_slots());
    slots.extend(enhancement_slots());
    slots.extend(commit_message_slots());
    slots.extend(title_generation_slots());
    slots.extend(issue_validation_slots());
    slots.extend(ideation_slots());
    slots.extend(app_spec_slots());
    slots.extend(context_description_slots());
    slots.extend(suggestions_slots());
    slots.extend(task_execution_slots());
    slots
}

fn auto_mode_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "planning_lite",
            label: "Planning: Lite Mode",
            description: "Quick planning outline without approval requirement",
            default_text: r#"You are planning the implementation of feature {{featureId}}: {{title}}.

{{description}}

Produce a short implementation outline: the files you expect to touch and the
order of changes. Keep it under 20 lines. Do not write any code yet.

When the outline is complete, end your response with the marker
[PLAN_GENERATED] followed by a fenced json block:

```json
{"tasks": [{"id": "1", "description": "..."}]}
```
"#,
            critical: true,
            variables: &["featureId", "title", "description"],
        },
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "planning_lite_with_approval",
            label: "Planning: Lite with Approval",
            description: "Planning outline that waits for user approval",
            default_text: r#"You are planning the implementation of feature {{featureId}}: {{title}}.

{{description}}

Produce a short implementation outline: the files you expect to touch and the
order of changes. Keep it under 20 lines. Do not write any code yet. The user
will review this plan before implementation begins, so make each step
independently understandable.

When the outline is complete, end your response with the marker
[PLAN_GENERATED] followed by a fenced json block:

```json
{"tasks": [{"id": "1", "description": "..."}]}
```
"#,
            critical: true,
            variables: &["featureId", "title", "description"],
        },
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "planning_spec",
            label: "Planning: Spec Mode",
            description: "Detailed specification with task breakdown",
            default_text: r#"You are writing a detailed specification for feature {{featureId}}: {{title}}.

{{description}}

Write a specification covering: goals, non-goals, affected modules, data model
changes, and a numbered task breakdown where each task is independently
completable and verifiable.

When the specification is complete, end your response with the marker
[SPEC_GENERATED] followed by a fenced json block:

```json
{"tasks": [{"id": "1", "description": "..."}]}
```
"#,
            critical: true,
            variables: &["featureId", "title", "description"],
        },
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "planning_full",
            label: "Planning: Full SDD Mode",
            description: "Comprehensive Software Design Document with phased implementation",
            default_text: r#"You are writing a Software Design Document for feature {{featureId}}: {{title}}.

{{description}}

The document must cover: purpose and scope, system context, component design,
data model, error handling, testing strategy, and a phased implementation plan
where each phase lists its tasks.

When the document is complete, end your response with the marker
[SPEC_GENERATED] followed by a fenced json block:

```json
{"tasks": [{"id": "1", "description": "..."}]}
```
"#,
            critical: true,
            variables: &["featureId", "title", "description"],
        },
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "feature_prompt_template",
            label: "Feature Prompt Template",
            description: "Template for building feature implementation prompts. \
                          Variables: featureId, title, description, spec, imagePaths, \
                          dependencies, verificationInstructions",
            default_text: r#"# Feature {{featureId}}: {{title}}

## Description
{{description}}

## Specification
{{spec}}

## Dependencies
{{dependencies}}

## Reference images
{{imagePaths}}

Implement the feature described above. {{verificationInstructions}}

When the implementation is complete and verified, end your response with the
marker [FEATURE_COMPLETE].
"#,
            critical: false,
            variables: &[
                "featureId",
                "title",
                "description",
                "spec",
                "imagePaths",
                "dependencies",
                "verificationInstructions",
            ],
        },
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "follow_up_prompt_template",
            label: "Follow-up Prompt Template",
            description: "Template for follow-up prompts when resuming work. \
                          Variables: featurePrompt, previousContext, followUpInstructions",
            default_text: r#"You previously worked on the following feature:

{{featurePrompt}}

## Previous context
{{previousContext}}

## Follow-up instructions
{{followUpInstructions}}

Continue from where the previous session left off.
"#,
            critical: false,
            variables: &["featurePrompt", "previousContext", "followUpInstructions"],
        },
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "continuation_prompt_template",
            label: "Continuation Prompt Template",
            description: "Template for continuation prompts. \
                          Variables: featurePrompt, previousContext",
            default_text: r#"You are continuing work on the following feature:

{{featurePrompt}}

## Previous context
{{previousContext}}

Your last response did not include the expected completion marker. Continue
the work, and when you reach the requested milestone, restate the marker
exactly as instructed in the original prompt.
"#,
            critical: false,
            variables: &["featurePrompt", "previousContext"],
        },
        PromptSlot {
            category: PromptCategory::AutoMode,
            key: "pipeline_step_prompt_template",
            label: "Pipeline Step Prompt Template",
            description: "Template for pipeline step execution prompts. \
                          Variables: stepName, featurePrompt, previousContext, stepInstructions",
            default_text: r#"# Pipeline step: {{stepName}}

## Feature
{{featurePrompt}}

## Previous context
{{previousContext}}

## Step instructions
{{stepInstructions}}

Complete only this step. Do not start work that belongs to later steps.
"#,
            critical: false,
            variables: &["stepName", "featurePrompt", "previousContext", "stepInstructions"],
        },
    ]
}

fn agent_slots() -> Vec<PromptSlot> {
    vec![PromptSlot {
        category: PromptCategory::Agent,
        key: "system_prompt",
        label: "System Prompt",
        description: "Defines the AI's role and behavior in interactive chat sessions",
        default_text: r#"You are a senior software engineer working inside the user's project.
Answer questions about the codebase directly and concretely, citing files by
path. When asked to make changes, explain what you changed and why. Prefer
small, reviewable edits over sweeping rewrites.
"#,
        critical: false,
        variables: &[],
    }]
}

fn backlog_plan_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::BacklogPlan,
            key: "system_prompt",
            label: "System Prompt",
            description: "Defines how the AI modifies the feature backlog (Plan button on Kanban board)",
            default_text: r#"You modify a feature backlog according to a user request. You will receive
the current features as JSON and a freeform request. Respond with ONLY a
fenced json block containing the operations to apply:

```json
{"operations": [{"op": "add" | "update" | "remove", "feature": {...}}]}
```

Never include prose outside the fenced block. Never invent feature ids: new
features use "id": null and the caller assigns one.
"#,
            critical: true,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::BacklogPlan,
            key: "user_prompt_template",
            label: "User Prompt Template",
            description: "Template for the user prompt sent to the AI. \
                          Variables: currentFeatures, userRequest",
            default_text: r#"## Current features
```json
{{currentFeatures}}
```

## Request
{{userRequest}}
"#,
            critical: true,
            variables: &["currentFeatures", "userRequest"],
        },
    ]
}

fn enhancement_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::Enhancement,
            key: "improve_system_prompt",
            label: "Improve Mode",
            description: "Transform vague requests into clear, actionable tasks",
            default_text: "Rewrite the given feature description as a clear, actionable task. \
                           Keep the user's intent, remove ambiguity, and state the expected \
                           outcome. Respond with only the rewritten description.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Enhancement,
            key: "technical_system_prompt",
            label: "Technical Mode",
            description: "Add implementation details and technical specifications",
            default_text: "Expand the given feature description with implementation details: \
                           likely modules, data shapes, and edge cases. Respond with only the \
                           expanded description.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Enhancement,
            key: "simplify_system_prompt",
            label: "Simplify Mode",
            description: "Make verbose descriptions concise and focused",
            default_text: "Condense the given feature description to its essentials. Cut \
                           repetition and filler; keep every concrete requirement. Respond \
                           with only the condensed description.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Enhancement,
            key: "acceptance_system_prompt",
            label: "Acceptance Criteria Mode",
            description: "Add testable acceptance criteria to descriptions",
            default_text: "Append a short list of testable acceptance criteria to the given \
                           feature description. Each criterion must be observable from the \
                           outside. Respond with the description followed by the criteria.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Enhancement,
            key: "ux_reviewer_system_prompt",
            label: "User Experience Mode",
            description: "Review and enhance from a user experience and design perspective",
            default_text: "Review the given feature description from a user experience \
                           perspective: flows, empty states, error states, accessibility. \
                           Respond with the description amended with UX notes.\n",
            critical: false,
            variables: &[],
        },
    ]
}

fn commit_message_slots() -> Vec<PromptSlot> {
    vec![PromptSlot {
        category: PromptCategory::CommitMessage,
        key: "system_prompt",
        label: "System Prompt",
        description: "Instructions for generating git commit messages from diffs. The AI will \
                      receive the git diff and generate a conventional commit message.",
        default_text: "Generate a conventional commit message for the given diff. One line, \
                       imperative mood, under 72 characters, prefixed with the appropriate \
                       type (feat, fix, refactor, docs, test, chore). Respond with only the \
                       message.\n",
        critical: false,
        variables: &[],
    }]
}

fn title_generation_slots() -> Vec<PromptSlot> {
    vec![PromptSlot {
        category: PromptCategory::TitleGeneration,
        key: "system_prompt",
        label: "System Prompt",
        description: "Instructions for generating concise, descriptive feature titles from \
                      descriptions. Used when auto-generating titles for new features.",
        default_text: "Generate a concise title (at most 8 words) for the given feature \
                       description. No trailing punctuation. Respond with only the title.\n",
        critical: false,
        variables: &[],
    }]
}

fn issue_validation_slots() -> Vec<PromptSlot> {
    vec![PromptSlot {
        category: PromptCategory::IssueValidation,
        key: "system_prompt",
        label: "System Prompt",
        description: "Instructions for validating GitHub issues against the codebase. Guides \
                      the AI to determine if issues are valid, invalid, or need clarification.",
        default_text: r#"You validate a reported issue against the actual codebase. Investigate the
referenced behavior, then respond with ONLY a fenced json block:

```json
{"verdict": "valid" | "invalid" | "needs_clarification", "reasoning": "..."}
```
"#,
        critical: true,
        variables: &[],
    }]
}

fn ideation_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::Ideation,
            key: "ideation_system_prompt",
            label: "Ideation Chat System Prompt",
            description: "System prompt for AI-powered ideation chat conversations. Guides the \
                          AI to brainstorm and suggest feature ideas.",
            default_text: "You are brainstorming product ideas with the user. Build on their \
                           direction, offer concrete alternatives, and keep each idea to a \
                           couple of sentences.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Ideation,
            key: "suggestions_system_prompt",
            label: "Suggestions System Prompt",
            description: "System prompt for generating structured feature suggestions. Used \
                          when generating batch suggestions from prompts.",
            default_text: r#"Generate feature suggestions for the project. Respond with ONLY a fenced
json block:

```json
{"suggestions": [{"title": "...", "description": "..."}]}
```
"#,
            critical: true,
            variables: &[],
        },
    ]
}

fn app_spec_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::AppSpec,
            key: "generate_spec_system_prompt",
            label: "Generate Spec System Prompt",
            description: "System prompt for generating project specifications from overview",
            default_text: "Generate a project specification from the given overview. Cover \
                           purpose, core features, architecture, and technology choices. Write \
                           for a developer joining the project cold.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::AppSpec,
            key: "structured_spec_instructions",
            label: "Structured Spec Instructions",
            description: "Instructions for structured specification output format",
            default_text: r#"Structure the specification as markdown with exactly these top-level
sections, in order: # Overview, # Features, # Architecture, # Data Model,
# Non-goals. Downstream tooling splits on these headings; do not rename or
reorder them.
"#,
            critical: true,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::AppSpec,
            key: "generate_features_from_spec_prompt",
            label: "Generate Features from Spec",
            description: "Prompt for generating features from a project specification",
            default_text: r#"Derive an initial feature backlog from the project specification. Respond
with ONLY a fenced json block:

```json
{"features": [{"title": "...", "description": "...", "priority": 1}]}
```
"#,
            critical: true,
            variables: &[],
        },
    ]
}

fn context_description_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::ContextDescription,
            key: "describe_file_prompt",
            label: "Describe File Prompt",
            description: "Prompt for generating descriptions of text files added as context",
            default_text: "Describe this file in two or three sentences: what it contains and \
                           what a developer would use it for.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::ContextDescription,
            key: "describe_image_prompt",
            label: "Describe Image Prompt",
            description: "Prompt for generating descriptions of images added as context",
            default_text: "Describe this image in two or three sentences, focusing on what it \
                           shows about the product or design intent.\n",
            critical: false,
            variables: &[],
        },
    ]
}

fn suggestions_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::Suggestions,
            key: "features_prompt",
            label: "Features Suggestion Prompt",
            description: "Prompt for analyzing the project and suggesting new features",
            default_text: "Analyze the project and suggest new features that fit its direction. \
                           Favor features that build on existing capabilities.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Suggestions,
            key: "refactoring_prompt",
            label: "Refactoring Suggestion Prompt",
            description: "Prompt for identifying refactoring opportunities",
            default_text: "Analyze the project for refactoring opportunities: duplicated logic, \
                           oversized modules, unclear ownership. Name the files involved.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Suggestions,
            key: "security_prompt",
            label: "Security Suggestion Prompt",
            description: "Prompt for analyzing security vulnerabilities",
            default_text: "Analyze the project for security weaknesses: unvalidated input, \
                           injection risks, secrets in code, missing authorization checks. \
                           Name the files involved.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Suggestions,
            key: "performance_prompt",
            label: "Performance Suggestion Prompt",
            description: "Prompt for identifying performance issues",
            default_text: "Analyze the project for performance issues: unnecessary work in hot \
                           paths, unbounded growth, missing caching. Name the files involved.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::Suggestions,
            key: "base_template",
            label: "Base Template",
            description: "Base template applied to all suggestion types",
            default_text: r#"{{analysisPrompt}}

Present each suggestion with a title, a short rationale, and an estimate of
effort (small / medium / large).
"#,
            critical: false,
            variables: &["analysisPrompt"],
        },
    ]
}

fn task_execution_slots() -> Vec<PromptSlot> {
    vec![
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "task_prompt_template",
            label: "Task Prompt Template",
            description: "Template for building individual task execution prompts",
            default_text: r#"# Task {{taskId}}

{{taskDescription}}

## Already completed
{{completedTasks}}

Complete only this task. When it is done and verified, end your response with
the marker [TASK_COMPLETE].
"#,
            critical: false,
            variables: &["taskId", "taskDescription", "completedTasks"],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "implementation_instructions",
            label: "Implementation Instructions",
            description: "Instructions appended to feature implementation prompts",
            default_text: "Follow the existing code style. Run the project's tests after each \
                           change and fix failures before moving on. Do not leave TODO stubs \
                           in completed work.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "playwright_verification_instructions",
            label: "Playwright Verification Instructions",
            description: "Instructions for automated Playwright verification (when enabled)",
            default_text: "Verify the change in a real browser using Playwright: load the \
                           affected page, exercise the new behavior, and confirm no console \
                           errors. Include the verification steps you ran in your summary.\n",
            critical: false,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "learning_extraction_system_prompt",
            label: "Learning Extraction System Prompt",
            description: "System prompt for extracting learnings/ADRs from implementation output",
            default_text: r#"Extract durable learnings from an implementation log: decisions worth
recording, constraints discovered, approaches that failed. Respond with your
notes followed by the marker [LEARNINGS_EXTRACTED] and a fenced json block:

```json
{"learnings": [{"title": "...", "detail": "..."}]}
```
"#,
            critical: true,
            variables: &[],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "learning_extraction_user_prompt_template",
            label: "Learning Extraction User Template",
            description: "User prompt template for learning extraction. \
                          Variables: featureTitle, implementationLog",
            default_text: r#"## Feature
{{featureTitle}}

## Implementation log
{{implementationLog}}
"#,
            critical: true,
            variables: &["featureTitle", "implementationLog"],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "plan_revision_template",
            label: "Plan Revision Template",
            description: "Template for prompting plan revisions. \
                          Variables: planVersion, previousPlan, userFeedback",
            default_text: r#"The user reviewed plan version {{planVersion}} and requested changes.

## Previous plan
{{previousPlan}}

## User feedback
{{userFeedback}}

Revise the plan to address the feedback. When the revised plan is complete,
end your response with the marker [PLAN_GENERATED] followed by a fenced json
block with the updated task list.
"#,
            critical: false,
            variables: &["planVersion", "previousPlan", "userFeedback"],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "continuation_after_approval_template",
            label: "Continuation After Approval Template",
            description: "Template for continuation after plan approval. \
                          Variables: userFeedback, approvedPlan",
            default_text: r#"The user approved the following plan:

{{approvedPlan}}

## Notes from the user
{{userFeedback}}

Begin implementation following the approved plan.
"#,
            critical: false,
            variables: &["userFeedback", "approvedPlan"],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "resume_feature_template",
            label: "Resume Feature Template",
            description: "Template for resuming interrupted features. \
                          Variables: featurePrompt, previousContext",
            default_text: r#"Work on the following feature was interrupted:

{{featurePrompt}}

## Context from the interrupted session
{{previousContext}}

Assess what was already completed, then continue the remaining work. When the
current task is done, end your response with the marker [TASK_COMPLETE].
"#,
            critical: false,
            variables: &["featurePrompt", "previousContext"],
        },
        PromptSlot {
            category: PromptCategory::TaskExecution,
            key: "project_analysis_prompt",
            label: "Project Analysis Prompt",
            description: "Prompt for AI-powered project analysis",
            default_text: "Analyze the project structure: main components, how they interact, \
                           and where new code for a typical feature would live. Keep it under \
                           30 lines.\n",
            critical: false,
            variables: &[],
        },
    ]
}
