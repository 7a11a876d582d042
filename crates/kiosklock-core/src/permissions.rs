//! Permission gate.
//!
//! Stateless probes of the device-level preconditions for kiosk mode. The
//! gate holds no cache: callers re-probe after returning from any
//! permission-grant flow.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::apps::PackageId;
use crate::platform::PermissionProbe;

/// API level that introduced the draw-over-other-apps permission.
pub const OVERLAY_PERMISSION_MIN_API: u32 = 23;

/// API level that introduced usage-stats access.
pub const USAGE_ACCESS_MIN_API: u32 = 21;

/// Outcome of a permission probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// The capability is held.
    Granted,
    /// The capability is missing.
    Denied,
    /// The platform predates the capability; it is implicitly held.
    NotApplicable,
}

impl PermissionStatus {
    /// Returns true when the requirement is met (granted or not applicable).
    #[must_use]
    pub const fn is_satisfied(self) -> bool {
        matches!(self, Self::Granted | Self::NotApplicable)
    }
}

impl From<bool> for PermissionStatus {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => f.write_str("granted"),
            Self::Denied => f.write_str("denied"),
            Self::NotApplicable => f.write_str("not applicable"),
        }
    }
}

/// All probes at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReport {
    /// Device-admin receiver status.
    pub device_admin: PermissionStatus,
    /// Overlay permission status.
    pub overlay: PermissionStatus,
    /// Default launcher role status.
    pub default_launcher: PermissionStatus,
    /// Usage access status (diagnostic only).
    pub usage_access: PermissionStatus,
}

impl PermissionReport {
    /// Whether [`KioskController::activate`](crate::KioskController::activate)
    /// would pass its precondition checks.
    #[must_use]
    pub const fn activation_ready(&self) -> bool {
        self.device_admin.is_satisfied() && self.default_launcher.is_satisfied()
    }
}

/// Queries kiosk preconditions against the OS.
#[derive(Clone)]
pub struct PermissionGate {
    probe: Arc<dyn PermissionProbe>,
    own_package: PackageId,
    api_level: u32,
}

impl PermissionGate {
    /// Creates a gate for `own_package` on a device at `api_level`.
    #[must_use]
    pub fn new(probe: Arc<dyn PermissionProbe>, own_package: PackageId, api_level: u32) -> Self {
        Self {
            probe,
            own_package,
            api_level,
        }
    }

    /// This app's package.
    #[must_use]
    pub const fn own_package(&self) -> &PackageId {
        &self.own_package
    }

    /// Device-admin receiver status.
    #[must_use]
    pub fn has_device_admin(&self) -> PermissionStatus {
        self.probe.device_admin_active().into()
    }

    /// Overlay permission status; not applicable before API 23.
    #[must_use]
    pub fn has_overlay_permission(&self) -> PermissionStatus {
        if self.api_level < OVERLAY_PERMISSION_MIN_API {
            return PermissionStatus::NotApplicable;
        }
        self.probe.can_draw_overlays().into()
    }

    /// Whether this app currently resolves as the home handler.
    #[must_use]
    pub fn is_default_launcher(&self) -> PermissionStatus {
        self.probe
            .default_home_package()
            .is_some_and(|home| home.eq_ignore_case(&self.own_package))
            .into()
    }

    /// Usage-stats access. Diagnostic only, never gates activation. Lookup
    /// failures read as denied.
    #[must_use]
    pub fn has_usage_access(&self) -> PermissionStatus {
        if self.api_level < USAGE_ACCESS_MIN_API {
            return PermissionStatus::NotApplicable;
        }
        match self.probe.usage_access_allowed() {
            Ok(granted) => granted.into(),
            Err(e) => {
                warn!(error = %e, "Usage access lookup failed");
                PermissionStatus::Denied
            },
        }
    }

    /// Runs every probe.
    #[must_use]
    pub fn report(&self) -> PermissionReport {
        PermissionReport {
            device_admin: self.has_device_admin(),
            overlay: self.has_overlay_permission(),
            default_launcher: self.is_default_launcher(),
            usage_access: self.has_usage_access(),
        }
    }
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("own_package", &self.own_package)
            .field("api_level", &self.api_level)
            .finish_non_exhaustive()
    }
}
