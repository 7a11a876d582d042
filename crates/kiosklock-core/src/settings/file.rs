//! JSON file backed settings store.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use super::{SettingValue, SettingsError, SettingsKey, SettingsStore};

/// Settings persisted as a single JSON object keyed by [`SettingsKey::as_str`].
///
/// The whole file is loaded at open and rewritten on every `set` through a
/// temp file in the same directory followed by a rename, so a crash leaves
/// either the old or the new contents. Keys this version does not know are
/// carried through unchanged whatever their JSON shape; a known key holding a
/// shape no [`SettingValue`] matches reads as [`SettingsError::TypeMismatch`].
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileSettingsStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file exists but cannot be read and
    /// [`SettingsError::Corrupt`] if it does not hold a JSON object.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| SettingsError::Corrupt(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Settings file absent, starting empty");
                BTreeMap::new()
            },
            Err(e) => return Err(SettingsError::Io(e)),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, values: &BTreeMap<String, Value>) -> Result<(), SettingsError> {
        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.as_file_mut().write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| SettingsError::Io(e.error))?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get(&self, key: SettingsKey) -> Result<Option<SettingValue>, SettingsError> {
        let values = self
            .values
            .read()
            .map_err(|_| SettingsError::LockPoisoned)?;
        values
            .get(key.as_str())
            .map(|raw| {
                serde_json::from_value(raw.clone()).map_err(|_| SettingsError::TypeMismatch {
                    key,
                    expected: "bool, string or string set",
                    found: json_kind(raw),
                })
            })
            .transpose()
    }

    fn set(&self, key: SettingsKey, value: SettingValue) -> Result<(), SettingsError> {
        // The write lock is held across the file write so concurrent setters
        // cannot persist out of order.
        let mut values = self
            .values
            .write()
            .map_err(|_| SettingsError::LockPoisoned)?;

        let raw =
            serde_json::to_value(&value).map_err(|e| SettingsError::Serialize(e.to_string()))?;
        let mut updated = values.clone();
        updated.insert(key.as_str().to_string(), raw);
        self.write_file(&updated)?;
        *values = updated;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
