//! Per-person queueing switch.
//!
//! Process-local and not persisted; every roster entry starts enabled.

use std::collections::{BTreeMap, HashMap};

use offhours_core::{CoreError, Roster};
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct ToggleState {
    enabled: RwLock<HashMap<String, bool>>,
}

impl ToggleState {
    pub fn new(roster: &Roster) -> Self {
        Self {
            enabled: RwLock::new(roster.keys().map(|k| (k.to_string(), true)).collect()),
        }
    }

    /// Set the flag for `key`, returning the previous value.
    pub async fn set_enabled(&self, key: &str, enabled: bool) -> Result<bool, CoreError> {
        let mut guard = self.enabled.write().await;
        let slot = guard
            .get_mut(key)
            .ok_or_else(|| CoreError::UnknownPerson(key.to_string()))?;
        let previous = std::mem::replace(slot, enabled);
        tracing::info!(person = key, enabled, previous, "Queueing toggled");
        Ok(previous)
    }

    pub async fn is_enabled(&self, key: &str) -> Result<bool, CoreError> {
        self.enabled
            .read()
            .await
            .get(key)
            .copied()
            .ok_or_else(|| CoreError::UnknownPerson(key.to_string()))
    }

    /// Current flags, ordered by key.
    pub async fn snapshot(&self) -> BTreeMap<String, bool> {
        self.enabled
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}
