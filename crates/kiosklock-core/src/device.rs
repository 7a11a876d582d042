//! Device identity and diagnostics.

use serde::{Deserialize, Serialize};

use crate::integrity::IntegrityReport;
use crate::permissions::{PermissionGate, PermissionStatus};

/// Static description of the device, read once from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Brand, e.g. `samsung`. Selects the default allow list.
    pub brand: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// User-visible device name.
    pub device_name: String,
    /// OS release string, e.g. `14`.
    pub os_version: String,
    /// Platform API level.
    pub api_level: u32,
}

/// Diagnostic snapshot shown on the settings surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// User-visible device name.
    pub device_name: String,
    /// OS release string.
    pub os_version: String,
    /// Platform API level.
    pub api_level: u32,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Brand.
    pub brand: String,
    /// Whether the integrity check found root indicators.
    pub is_rooted: bool,
    /// Device-admin status.
    pub device_admin: PermissionStatus,
    /// Overlay permission status.
    pub overlay: PermissionStatus,
}

impl DeviceInfo {
    /// Assembles the snapshot from the profile, a fresh permission probe and
    /// the startup integrity report.
    #[must_use]
    pub fn collect(
        profile: &DeviceProfile,
        gate: &PermissionGate,
        integrity: &IntegrityReport,
    ) -> Self {
        Self {
            device_name: profile.device_name.clone(),
            os_version: profile.os_version.clone(),
            api_level: profile.api_level,
            manufacturer: profile.manufacturer.clone(),
            model: profile.model.clone(),
            brand: profile.brand.clone(),
            is_rooted: integrity.is_compromised(),
            device_admin: gate.has_device_admin(),
            overlay: gate.has_overlay_permission(),
        }
    }
}
