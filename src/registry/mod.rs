//! Prompt registry: the immutable catalog of prompt slots.
//!
//! Every prompt the workflow can send is a *slot*: a named template grouped
//! under a [`PromptCategory`], carrying a built-in default text, a set of
//! `{{variable}}` names it accepts, and a `critical` flag for slots whose
//! rendered output feeds strict downstream parsing (workflow markers or a
//! fixed JSON shape).
//!
//! The registry is built once at process start from the fixed catalog in
//! [`catalog`] and never mutated. Components share it by `Arc`; user
//! overrides live elsewhere (see [`crate::customize`]), so defaults have a
//! single source of truth.

mod catalog;


use crate::error::{AutoModeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Domain grouping for prompt slots.
///
/// The set is fixed at compile time. Serialized names are snake_case and
/// double as the category's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCategory {
    /// Auto Mode planning and template prompts.
    AutoMode,
    /// Interactive agent chat.
    Agent,
    /// Backlog mutation (plan button on the board).
    BacklogPlan,
    /// Description enhancement modes.
    Enhancement,
    /// Commit message generation.
    CommitMessage,
    /// Feature title generation.
    TitleGeneration,
    /// Issue validation against the codebase.
    IssueValidation,
    /// Ideation chat and suggestion generation.
    Ideation,
    /// Project specification generation.
    AppSpec,
    /// Context file/image descriptions.
    ContextDescription,
    /// Project analysis suggestions.
    Suggestions,
    /// Per-task execution and learning extraction.
    TaskExecution,
}

impl PromptCategory {
    /// All categories in catalog-declared order.
    pub const ALL: &'static [PromptCategory] = &[
        PromptCategory::AutoMode,
        PromptCategory::Agent,
        PromptCategory::BacklogPlan,
        PromptCategory::Enhancement,
        PromptCategory::CommitMessage,
        PromptCategory::TitleGeneration,
        PromptCategory::IssueValidation,
        PromptCategory::Ideation,
        PromptCategory::AppSpec,
        PromptCategory::ContextDescription,
        PromptCategory::Suggestions,
        PromptCategory::TaskExecution,
    ];

    /// The snake_case name used for serialization and display.
    pub fn name(&self) -> &'static str {
        match self {
            PromptCategory::AutoMode => "auto_mode",
            PromptCategory::Agent => "agent",
            PromptCategory::BacklogPlan => "backlog_plan",
            PromptCategory::Enhancement => "enhancement",
            PromptCategory::CommitMessage => "commit_message",
            PromptCategory::TitleGeneration => "title_generation",
            PromptCategory::IssueValidation => "issue_validation",
            PromptCategory::Ideation => "ideation",
            PromptCategory::AppSpec => "app_spec",
            PromptCategory::ContextDescription => "context_description",
            PromptCategory::Suggestions => "suggestions",
            PromptCategory::TaskExecution => "task_execution",
        }
    }

    /// Parse a category from its snake_case name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == s)
    }
}

impl fmt::Display for PromptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Definition of a single prompt slot.
///
/// Created once at startup from the fixed catalog; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSlot {
    /// The category this slot belongs to.
    pub category: PromptCategory,
    /// Stable key within the category (e.g., "planning_lite").
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// What the slot is for and which variables it accepts.
    pub description: &'static str,
    /// The built-in default template text.
    pub default_text: &'static str,
    /// Whether the rendered output feeds strict downstream parsing.
    ///
    /// Editing a critical slot does not change parsing behavior; the flag
    /// signals elevated risk to whoever surfaces customization.
    pub critical: bool,
    /// Names of `{{variable}}` placeholders the default text accepts.
    pub variables: &'static [&'static str],
}

/// Static catalog of prompt slots, indexed for lookup.
///
/// `get` fails with [`AutoModeError::UnknownSlot`] for pairs outside the
/// catalog; `list` returns slots in catalog-declared order for deterministic
/// iteration. Read-only after construction.
#[derive(Debug)]
pub struct PromptRegistry {
    slots: Vec<PromptSlot>,
    index: HashMap<PromptCategory, HashMap<&'static str, usize>>,
}

impl PromptRegistry {
    /// Build the registry from the built-in catalog.
    pub fn builtin() -> Self {
        Self::from_slots(catalog::builtin_slots())
    }

    fn from_slots(slots: Vec<PromptSlot>) -> Self {
        let mut index: HashMap<PromptCategory, HashMap<&'static str, usize>> = HashMap::new();
        for (i, slot) in slots.iter().enumerate() {
            let prior = index.entry(slot.category).or_default().insert(slot.key, i);
            debug_assert!(prior.is_none(), "duplicate slot {}/{}", slot.category, slot.key);
        }
        Self { slots, index }
    }

    /// Look up a slot definition by category and key.
    pub fn get(&self, category: PromptCategory, key: &str) -> Result<&PromptSlot> {
        self.index
            .get(&category)
            .and_then(|keys| keys.get(key))
            .map(|&i| &self.slots[i])
            .ok_or_else(|| AutoModeError::UnknownSlot {
                category,
                key: key.to_string(),
            })
    }

    /// Whether the (category, key) pair exists in the catalog.
    pub fn contains(&self, category: PromptCategory, key: &str) -> bool {
        self.index
            .get(&category)
            .is_some_and(|keys| keys.contains_key(key))
    }

    /// All slots in a category, in catalog-declared order.
    pub fn list(&self, category: PromptCategory) -> Vec<&PromptSlot> {
        self.slots.iter().filter(|s| s.category == category).collect()
    }

    /// Iterate over every slot in catalog-declared order.
    pub fn iter(&self) -> impl Iterator<Item = &PromptSlot> {
        self.slots.iter()
    }

    /// Total number of slots in the catalog.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
