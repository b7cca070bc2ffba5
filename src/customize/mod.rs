//! Customization store: sparse user overrides layered over the registry.
//!
//! Overrides are a nested mapping `category -> slot key -> override record`.
//! An absent entry means the registry default applies. A present entry with
//! `enabled: false` is "present but inactive": the default is used but the
//! override text is retained, so a user can toggle their customization back
//! on without losing it.
//!
//! Defaults live only in the registry; the store never copies them in. The
//! persisted document shape mirrors the settings form's nested structure,
//! with the historical `value`/`enabled` field names on the wire.


use crate::error::{AutoModeError, Result};
use crate::registry::{PromptCategory, PromptRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// User-supplied replacement text for a prompt slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOverride {
    /// The override text. Retained even while `enabled` is false.
    #[serde(rename = "value")]
    pub text: String,

    /// Whether the override is active. When false, the default applies.
    pub enabled: bool,
}

/// The entire user-controlled override state.
///
/// Serializable as a nested structured document; this is the persisted-state
/// shape the caller owns.
pub type PromptCustomization = BTreeMap<PromptCategory, BTreeMap<String, PromptOverride>>;

/// Override store bound to a prompt registry.
///
/// Writes are validated against the registry so the store never contains an
/// entry for a pair the catalog does not define. Stale entries arriving via
/// [`CustomizationStore::load`] (from a document written by an older catalog)
/// are dropped with a warning rather than round-tripped back out.
#[derive(Debug)]
pub struct CustomizationStore {
    registry: Arc<PromptRegistry>,
    overrides: PromptCustomization,
}

impl CustomizationStore {
    /// Create an empty store bound to the given registry.
    pub fn new(registry: Arc<PromptRegistry>) -> Self {
        Self {
            registry,
            overrides: PromptCustomization::new(),
        }
    }

    /// Set or replace the override for a slot.
    ///
    /// Fails with `UnknownSlot` if the pair is not in the registry, or with
    /// `MalformedOverride` when enabling an override whose text is empty or
    /// whitespace. On error the previous state is unchanged.
    pub fn set_override(
        &mut self,
        category: PromptCategory,
        key: &str,
        text: impl Into<String>,
        enabled: bool,
    ) -> Result<()> {
        if !self.registry.contains(category, key) {
            return Err(AutoModeError::UnknownSlot {
                category,
                key: key.to_string(),
            });
        }

        let text = text.into();
        if enabled && text.trim().is_empty() {
            return Err(AutoModeError::MalformedOverride {
                category,
                key: key.to_string(),
            });
        }

        self.overrides
            .entry(category)
            .or_default()
            .insert(key.to_string(), PromptOverride { text, enabled });
        Ok(())
    }

    /// Remove the override for a slot entirely, reverting to the default.
    ///
    /// Fails with `UnknownSlot` for pairs outside the registry. Clearing a
    /// slot that has no override is a no-op.
    pub fn clear_override(&mut self, category: PromptCategory, key: &str) -> Result<()> {
        if !self.registry.contains(category, key) {
            return Err(AutoModeError::UnknownSlot {
                category,
                key: key.to_string(),
            });
        }

        if let Some(entries) = self.overrides.get_mut(&category) {
            entries.remove(key);
            if entries.is_empty() {
                self.overrides.remove(&category);
            }
        }
        Ok(())
    }

    /// The effective text for a slot: enabled override, else default.
    ///
    /// Pure with respect to store state: identical calls with no intervening
    /// write return identical strings. Fails only with `UnknownSlot`.
    pub fn get_effective_text(&self, category: PromptCategory, key: &str) -> Result<String> {
        let slot = self.registry.get(category, key)?;

        let active = self
            .overrides
            .get(&category)
            .and_then(|entries| entries.get(key))
            .filter(|o| o.enabled);

        Ok(match active {
            Some(o) => o.text.clone(),
            None => slot.default_text.to_string(),
        })
    }

    /// Get the override record for a slot, if any (enabled or not).
    pub fn get_override(&self, category: PromptCategory, key: &str) -> Option<&PromptOverride> {
        self.overrides.get(&category).and_then(|e| e.get(key))
    }

    /// Whether a slot has an enabled override.
    pub fn has_override(&self, category: PromptCategory, key: &str) -> bool {
        self.get_override(category, key).is_some_and(|o| o.enabled)
    }

    /// Clear all overrides within one category, leaving others untouched.
    pub fn reset_category(&mut self, category: PromptCategory) {
        self.overrides.remove(&category);
    }

    /// Clear the entire customization mapping.
    pub fn reset_all(&mut self) {
        self.overrides.clear();
    }

    /// Snapshot of the current override state for persistence.
    pub fn customization(&self) -> &PromptCustomization {
        &self.overrides
    }

    /// Replace the store's state from a persisted document.
    ///
    /// Entries for (category, key) pairs the registry does not define are
    /// dropped with a warning; everything else is kept verbatim, including
    /// disabled overrides.
    pub fn load(&mut self, customization: PromptCustomization) {
        let mut loaded = PromptCustomization::new();

        for (category, entries) in customization {
            for (key, record) in entries {
                if self.registry.contains(category, &key) {
                    loaded.entry(category).or_default().insert(key, record);
                } else {
                    warn!(
                        category = %category,
                        key = %key,
                        "dropping stale override for unknown slot"
                    );
                }
            }
        }

        self.overrides = loaded;
    }

    /// Total number of override records, enabled or not.
    pub fn override_count(&self) -> usize {
        self.overrides.values().map(BTreeMap::len).sum()
    }
}
