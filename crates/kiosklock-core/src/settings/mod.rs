//! Persisted settings.
//!
//! The settings store is a durable key-value collaborator and the single
//! source of truth for kiosk policy. Each key is read and written
//! independently; no cross-key transactions are offered or needed.
//!
//! - [`InMemorySettingsStore`]: process-local store for tests and simulation.
//! - [`JsonFileSettingsStore`]: a JSON object on disk, rewritten atomically on
//!   every set.
//! - [`KioskPolicyStore`]: typed view over any store with the kiosk defaults
//!   applied.

mod file;
mod memory;
mod policy;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::JsonFileSettingsStore;
pub use memory::InMemorySettingsStore;
pub use policy::{
    DEFAULT_ADMIN_PASSWORD, DEFAULT_KIOSK_NAME, KioskPolicy, KioskPolicyStore,
};

/// Keys of the persisted kiosk settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingsKey {
    /// Whether kiosk mode is active.
    KioskEnabled,
    /// Admin password required to exit kiosk mode.
    AdminPassword,
    /// Admin-selected package allow list.
    AllowedApps,
    /// Display name shown on the kiosk surface.
    KioskName,
    /// Whether kiosk mode resumes after boot.
    AutoStart,
    /// Background asset reference for the kiosk surface.
    BackgroundAssetPath,
}

impl SettingsKey {
    /// Every key, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::KioskEnabled,
        Self::AdminPassword,
        Self::AllowedApps,
        Self::KioskName,
        Self::AutoStart,
        Self::BackgroundAssetPath,
    ];

    /// Storage name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KioskEnabled => "kiosk_enabled",
            Self::AdminPassword => "admin_password",
            Self::AllowedApps => "allowed_apps",
            Self::KioskName => "kiosk_name",
            Self::AutoStart => "auto_start",
            Self::BackgroundAssetPath => "kiosk_background",
        }
    }
}

impl std::fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored settings value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Boolean flag.
    Bool(bool),
    /// Single string.
    String(String),
    /// Unordered set of strings.
    StringSet(BTreeSet<String>),
}

impl SettingValue {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::StringSet(_) => "string set",
        }
    }
}

/// Errors from settings storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// I/O failure reading or writing the backing file.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be parsed.
    #[error("settings file is corrupt: {0}")]
    Corrupt(String),

    /// The settings could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(String),

    /// The stored value has a different type than requested.
    #[error("settings key {key} holds a {found}, expected a {expected}")]
    TypeMismatch {
        /// Key that was read.
        key: SettingsKey,
        /// Requested type.
        expected: &'static str,
        /// Stored type.
        found: &'static str,
    },

    /// A value was rejected before it was stored.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Key being written.
        key: SettingsKey,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// The internal lock was poisoned.
    #[error("settings lock poisoned")]
    LockPoisoned,
}

/// Durable key-value store holding kiosk settings.
///
/// Implementors provide raw [`get`](Self::get) and [`set`](Self::set); the
/// typed accessors apply defaults for absent keys and reject type mismatches.
/// Each call must be atomic with respect to its key.
pub trait SettingsStore: Send + Sync {
    /// Reads the raw value for `key`, or `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: SettingsKey) -> Result<Option<SettingValue>, SettingsError>;

    /// Writes the raw value for `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&self, key: SettingsKey, value: SettingValue) -> Result<(), SettingsError>;

    /// Reads a boolean, returning `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TypeMismatch`] if the key holds another type.
    fn get_bool(&self, key: SettingsKey, default: bool) -> Result<bool, SettingsError> {
        match self.get(key)? {
            None => Ok(default),
            Some(SettingValue::Bool(value)) => Ok(value),
            Some(other) => Err(mismatch(key, "bool", &other)),
        }
    }

    /// Writes a boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set_bool(&self, key: SettingsKey, value: bool) -> Result<(), SettingsError> {
        self.set(key, SettingValue::Bool(value))
    }

    /// Reads a string, returning `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TypeMismatch`] if the key holds another type.
    fn get_optional_string(&self, key: SettingsKey) -> Result<Option<String>, SettingsError> {
        match self.get(key)? {
            None => Ok(None),
            Some(SettingValue::String(value)) => Ok(Some(value)),
            Some(other) => Err(mismatch(key, "string", &other)),
        }
    }

    /// Reads a string, returning `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TypeMismatch`] if the key holds another type.
    fn get_string(&self, key: SettingsKey, default: &str) -> Result<String, SettingsError> {
        Ok(self
            .get_optional_string(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Writes a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set_string(&self, key: SettingsKey, value: &str) -> Result<(), SettingsError> {
        self.set(key, SettingValue::String(value.to_string()))
    }

    /// Reads a string set, returning `default` when unset.
    ///
    /// A persisted empty set is returned as-is; `default` only applies when
    /// the key was never written.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TypeMismatch`] if the key holds another type.
    fn get_string_set(
        &self,
        key: SettingsKey,
        default: BTreeSet<String>,
    ) -> Result<BTreeSet<String>, SettingsError> {
        match self.get(key)? {
            None => Ok(default),
            Some(SettingValue::StringSet(value)) => Ok(value),
            Some(other) => Err(mismatch(key, "string set", &other)),
        }
    }

    /// Writes a string set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set_string_set(&self, key: SettingsKey, value: BTreeSet<String>) -> Result<(), SettingsError> {
        self.set(key, SettingValue::StringSet(value))
    }
}

fn mismatch(key: SettingsKey, expected: &'static str, found: &SettingValue) -> SettingsError {
    SettingsError::TypeMismatch {
        key,
        expected,
        found: found.kind(),
    }
}
