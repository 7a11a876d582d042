//! Service configuration.
//!
//! Loaded from a TOML file at startup:
//!
//! ```toml
//! [device]
//! package = "uz.isti.kiosklock"
//!
//! [settings]
//! path = "/data/kiosklock/settings.json"
//!
//! [enforcement]
//! surface_interval = "1s"
//! sweep_interval = "5s"
//!
//! [logging]
//! level = "info"
//! file = "/data/kiosklock/kiosklock.log"
//! ```
//!
//! Every section except `[device]` is optional.

use std::path::{Path, PathBuf};

use kiosklock_core::PackageId;
use serde::{Deserialize, Serialize};

use crate::enforcement::EnforcementConfig;
use crate::logging::LogConfig;

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Device identity.
    pub device: DeviceSection,

    /// Settings persistence.
    #[serde(default)]
    pub settings: SettingsSection,

    /// Enforcement loop timing.
    #[serde(default)]
    pub enforcement: EnforcementConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LogConfig,
}

/// `[device]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSection {
    /// This app's package; the only package surface correction leaves alone.
    pub package: PackageId,
}

/// `[settings]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSection {
    /// JSON settings file.
    #[serde(default = "default_settings_path")]
    pub path: PathBuf,
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("kiosklock-settings.json")
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

impl ServiceConfig {
    /// Minimal configuration for `package` with every default applied.
    #[must_use]
    pub fn for_package(package: impl Into<PackageId>) -> Self {
        Self {
            device: DeviceSection {
                package: package.into(),
            },
            settings: SettingsSection::default(),
            enforcement: EnforcementConfig::default(),
            logging: LogConfig::default(),
        }
    }

    /// Loads and validates configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails
    /// [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails
    /// [`validate`](Self::validate).
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the package is blank, the
    /// settings path is empty, or an interval is out of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.package.as_str().trim().is_empty() {
            return Err(ConfigError::Validation(
                "device.package must not be empty".to_string(),
            ));
        }
        if self.settings.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "settings.path must not be empty".to_string(),
            ));
        }
        self.enforcement
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = ServiceConfig::from_toml(
            r#"
            [device]
            package = "uz.isti.kiosklock"
            "#,
        )
        .unwrap();

        assert_eq!(config.device.package.as_str(), "uz.isti.kiosklock");
        assert_eq!(config.settings.path, PathBuf::from("kiosklock-settings.json"));
        assert_eq!(config.enforcement, EnforcementConfig::default());
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = ServiceConfig::from_toml(
            r#"
            [device]
            package = "uz.isti.kiosklock"

            [settings]
            path = "/data/kiosklock/settings.json"

            [enforcement]
            surface_interval = "500ms"
            sweep_interval = "10s"

            [logging]
            level = "debug"
            file = "/data/kiosklock/kiosklock.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.enforcement.surface_interval, Duration::from_millis(500));
        assert_eq!(config.enforcement.sweep_interval, Duration::from_secs(10));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file.as_deref(),
            Some(Path::new("/data/kiosklock/kiosklock.log"))
        );
    }

    #[test]
    fn test_missing_device_section_rejected() {
        assert!(matches!(
            ServiceConfig::from_toml("[settings]\npath = \"s.json\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_blank_package_rejected() {
        let err = ServiceConfig::from_toml("[device]\npackage = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_out_of_bounds_interval_rejected() {
        let err = ServiceConfig::from_toml(
            r#"
            [device]
            package = "uz.isti.kiosklock"

            [enforcement]
            surface_interval = "10ms"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("surface_interval"));
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = ServiceConfig::from_toml(
            r#"
            [device]
            package = "uz.isti.kiosklock"

            [enforcement]
            sweep_interval = "soon"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_toml_output_reparses() {
        let mut config = ServiceConfig::for_package("uz.isti.kiosklock");
        config.enforcement.sweep_interval = Duration::from_secs(30);
        let text = config.to_toml().unwrap();
        assert!(text.contains("sweep_interval = \"30s\""));
        assert_eq!(ServiceConfig::from_toml(&text).unwrap(), config);
    }
}
