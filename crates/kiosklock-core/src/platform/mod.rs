//! Operating-system contracts consumed by the control plane.
//!
//! Each trait maps one OS capability. None of them carries kiosk policy; the
//! controller, resolver and enforcement loop decide what to ask for and how
//! to react to refusals.

pub mod simulated;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::apps::{AppIdentity, PackageId};

/// Errors reported by platform calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlatformError {
    /// The OS refused to terminate a process (security exception).
    #[error("termination of {package} refused by the OS")]
    ProcessTerminationRefused {
        /// Package whose process was targeted.
        package: PackageId,
    },

    /// The package is not installed.
    #[error("package {package} could not be resolved")]
    AppResolutionFailed {
        /// Package that failed to resolve.
        package: PackageId,
    },

    /// The package has no launchable entry point.
    #[error("package {package} has no launch entry")]
    NotLaunchable {
        /// Package that could not be launched.
        package: PackageId,
    },

    /// The capability is not available on this device or failed outright.
    #[error("platform call failed: {0}")]
    Unavailable(String),
}

/// OS classification of how visible a process is to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Currently user-visible and interactive.
    Foreground,
    /// Visible but not focused.
    Visible,
    /// Running a service.
    Service,
    /// Cached in the background.
    Cached,
    /// Anything else.
    Other,
}

/// A running process as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Owning package.
    pub package_id: PackageId,
    /// Visibility classification.
    pub importance: Importance,
}

impl ProcessInfo {
    /// Creates a process record.
    #[must_use]
    pub fn new(package_id: impl Into<PackageId>, importance: Importance) -> Self {
        Self {
            package_id: package_id.into(),
            importance,
        }
    }

    /// Returns true for foreground-importance processes.
    #[must_use]
    pub fn is_foreground(&self) -> bool {
        self.importance == Importance::Foreground
    }
}

/// Task-lock capabilities.
///
/// Task locking is only reachable for device-owner installs; every call here
/// is best-effort from the controller's perspective.
pub trait TaskLock: Send + Sync {
    /// Whether `package` is the device owner.
    fn is_device_owner(&self, package: &PackageId) -> bool;

    /// Whether `package` may use task locking.
    fn is_lock_task_permitted(&self, package: &PackageId) -> bool;

    /// Pins the current task.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS rejects the request.
    fn engage(&self) -> Result<(), PlatformError>;

    /// Releases the task pin.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS rejects the request.
    fn disengage(&self) -> Result<(), PlatformError>;

    /// Replaces the set of packages allowed to run while task-locked.
    ///
    /// # Errors
    ///
    /// Returns an error if the app is not device owner or the OS rejects the
    /// list.
    fn set_lock_task_packages(&self, packages: &[PackageId]) -> Result<(), PlatformError>;
}

/// Permission probes backing the [`PermissionGate`](crate::PermissionGate).
pub trait PermissionProbe: Send + Sync {
    /// Whether the app's device-admin receiver is active.
    fn device_admin_active(&self) -> bool;

    /// Whether the app may draw over other apps.
    fn can_draw_overlays(&self) -> bool;

    /// Package currently resolving the home intent, if any.
    fn default_home_package(&self) -> Option<PackageId>;

    /// Whether usage-stats access is granted.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS lookup fails.
    fn usage_access_allowed(&self) -> Result<bool, PlatformError>;
}

/// Inspection and correction of the device's foreground state.
pub trait ForegroundInspector: Send + Sync {
    /// Package owning the top task, or `None` if there is no task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task list cannot be read.
    fn foreground_task(&self) -> Result<Option<PackageId>, PlatformError>;

    /// Running app processes.
    ///
    /// # Errors
    ///
    /// Returns an error if the process list cannot be read.
    fn processes(&self) -> Result<Vec<ProcessInfo>, PlatformError>;

    /// Asks the OS to kill the package's background processes.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::ProcessTerminationRefused`] if the OS refuses.
    fn request_terminate(&self, package: &PackageId) -> Result<(), PlatformError>;
}

/// The OS package catalog.
pub trait PackageCatalog: Send + Sync {
    /// Every app with a launcher entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be queried.
    fn launchable_apps(&self) -> Result<Vec<AppIdentity>, PlatformError>;

    /// Resolves one package to its identity.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::AppResolutionFailed`] if the package is not
    /// installed.
    fn resolve(&self, package: &PackageId) -> Result<AppIdentity, PlatformError>;
}

/// Screens and intents the control plane can bring up.
pub trait SurfaceLauncher: Send + Sync {
    /// Brings the kiosk surface to the top, clearing any competing task
    /// stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be started.
    fn launch_kiosk_surface(&self) -> Result<(), PlatformError>;

    /// Launches an app's main entry point in a new task.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotLaunchable`] if the package has no launch
    /// entry.
    fn launch_app(&self, package: &PackageId) -> Result<(), PlatformError>;

    /// Opens the OS home-app settings so the user can pick the launcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings screen cannot be opened.
    fn open_home_settings(&self) -> Result<(), PlatformError>;
}

/// Every OS capability the control plane consumes, bundled for wiring.
#[derive(Clone)]
pub struct Platform {
    /// Task-lock capabilities.
    pub task_lock: Arc<dyn TaskLock>,
    /// Permission probes.
    pub permissions: Arc<dyn PermissionProbe>,
    /// Foreground inspection.
    pub foreground: Arc<dyn ForegroundInspector>,
    /// Package catalog.
    pub catalog: Arc<dyn PackageCatalog>,
    /// Surface and intent launcher.
    pub launcher: Arc<dyn SurfaceLauncher>,
}

impl Platform {
    /// Bundles a single object that implements every contract.
    #[must_use]
    pub fn from_shared<T>(device: Arc<T>) -> Self
    where
        T: TaskLock + PermissionProbe + ForegroundInspector + PackageCatalog + SurfaceLauncher + 'static,
    {
        Self {
            task_lock: device.clone(),
            permissions: device.clone(),
            foreground: device.clone(),
            catalog: device.clone(),
            launcher: device,
        }
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
