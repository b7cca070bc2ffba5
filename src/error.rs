//! Error types for the automode core.
//!
//! Uses thiserror for derive macros. Store-level errors (`UnknownSlot`,
//! `MalformedOverride`) and engine-level errors (`InvalidTransition`,
//! `RunNotFound`) return immediately without mutating any state, so a caller
//! that hits one can retry with corrected input.

use crate::registry::PromptCategory;
use thiserror::Error;

/// Main error type for automode operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutoModeError {
    /// Caller referenced a (category, key) pair absent from the registry.
    ///
    /// This is a programmer error, not a user-facing condition: the catalog
    /// is fixed at process start and slot keys are not user input.
    #[error("unknown prompt slot '{category}/{key}'")]
    UnknownSlot {
        /// The category that was referenced.
        category: PromptCategory,
        /// The slot key that was referenced.
        key: String,
    },

    /// Attempt to enable an override with empty text.
    #[error("override for '{category}/{key}' cannot be enabled with empty text")]
    MalformedOverride {
        /// The category that was referenced.
        category: PromptCategory,
        /// The slot key that was referenced.
        key: String,
    },

    /// A caller action is not valid for the run's current state.
    #[error("cannot {action} run '{run_id}' in state '{state}'")]
    InvalidTransition {
        /// The run the action targeted.
        run_id: String,
        /// The run's current state name.
        state: String,
        /// The action that was attempted (e.g., "approve", "resume").
        action: String,
    },

    /// No run with the given identifier exists.
    #[error("no workflow run with id '{0}'")]
    RunNotFound(String),

    /// Configuration file could not be read, parsed, or validated.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A value could not be serialized for persistence or audit.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

/// Result type alias for automode operations.
pub type Result<T> = std::result::Result<T, AutoModeError>;
