//! Orchestrator configuration.
//!
//! Retry bounds and context-carry length are deliberately configuration
//! rather than constants: the right budget depends on the model and the
//! caller's cost tolerance. Loaded from a YAML file when one exists,
//! otherwise defaults apply.
//!
//! # File Format
//!
//! ```yaml
//! retry_limit: 3
//! default_mode: lite
//! context_carry_chars: 4000
//! ```

use crate::error::{AutoModeError, Result};
use crate::workflow::PlanningMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default number of re-prompts per state before a run is declared stalled.
const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default cap on the accumulated `previousContext` summary, in characters.
const DEFAULT_CONTEXT_CARRY_CHARS: usize = 4000;

/// Configuration for the workflow orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoModeConfig {
    /// Re-prompts allowed per state before the run fails as stalled.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Planning mode used when the caller does not specify one.
    #[serde(default)]
    pub default_mode: PlanningMode,

    /// Maximum length of the carried `previousContext` summary. Older
    /// content is dropped from the front once the cap is exceeded.
    #[serde(default = "default_context_carry_chars")]
    pub context_carry_chars: usize,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for AutoModeConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            default_mode: PlanningMode::default(),
            context_carry_chars: default_context_carry_chars(),
            extra: BTreeMap::new(),
        }
    }
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

fn default_context_carry_chars() -> usize {
    DEFAULT_CONTEXT_CARRY_CHARS
}

impl AutoModeConfig {
    /// Load config from a YAML file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    /// Returns `Err` if the file exists but cannot be parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AutoModeError::ConfigError(format!(
                "failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_yaml(&content)?;
        Ok(Some(config))
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AutoModeConfig = serde_yaml::from_str(yaml)
            .map_err(|e| AutoModeError::ConfigError(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AutoModeError::SerializationError(e.to_string()))
    }

    /// Validate the configuration.
    ///
    /// `retry_limit` of zero is allowed (fail on the first missing marker),
    /// but a zero `context_carry_chars` would silently erase continuity
    /// between turns and is rejected.
    pub fn validate(&self) -> Result<()> {
        if self.context_carry_chars == 0 {
            return Err(AutoModeError::ConfigError(
                "context_carry_chars must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
