use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{SettingValue, SettingsError, SettingsKey, SettingsStore};

/// In-memory settings store.
///
/// Clones share the same underlying map, so a clone handed to a background
/// task observes writes made through the original.
#[derive(Debug, Default, Clone)]
pub struct InMemorySettingsStore {
    values: Arc<RwLock<HashMap<SettingsKey, SettingValue>>>,
}

impl InMemorySettingsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no key has been written.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().expect("lock poisoned").is_empty()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get(&self, key: SettingsKey) -> Result<Option<SettingValue>, SettingsError> {
        let values = self
            .values
            .read()
            .map_err(|_| SettingsError::LockPoisoned)?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: SettingsKey, value: SettingValue) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| SettingsError::LockPoisoned)?;
        values.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let store = InMemorySettingsStore::new();
        let other = store.clone();
        assert!(other.is_empty());

        store.set_bool(SettingsKey::KioskEnabled, true).unwrap();
        assert!(other.get_bool(SettingsKey::KioskEnabled, false).unwrap());
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let store = InMemorySettingsStore::new();
        store.set_string(SettingsKey::KioskName, "Lobby").unwrap();
        store.set_string(SettingsKey::KioskName, "Front Desk").unwrap();
        assert_eq!(
            store.get_string(SettingsKey::KioskName, "").unwrap(),
            "Front Desk"
        );
    }
}
