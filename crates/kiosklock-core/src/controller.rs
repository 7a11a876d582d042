//! Kiosk controller.
//!
//! Owns the `Inactive` / `Active` state machine. The state lives only in the
//! settings store, so a restarted process resumes in whatever state was last
//! persisted.
//!
//! # Transitions
//!
//! ```text
//!            activate()  [device admin + default launcher]
//! Inactive ---------------------------------------------> Active
//!          <---------------------------------------------
//!            deactivate()
//! ```
//!
//! Task locking is engaged on activation only for device-owner installs that
//! are permitted to lock; every other install runs a degraded kiosk that
//! relies on the enforcement loop alone.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::apps::PackageId;
use crate::permissions::PermissionGate;
use crate::platform::{PlatformError, SurfaceLauncher, TaskLock};
use crate::settings::{KioskPolicyStore, SettingsError};
use crate::state::KioskState;

/// Errors from kiosk activation and deactivation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KioskError {
    /// The device-admin receiver is not active.
    #[error("device admin permission not granted")]
    PermissionDenied,

    /// This app is not the default home launcher.
    #[error("app is not set as default launcher")]
    NotDefaultLauncher,

    /// The policy could not be read or written.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// A required platform call failed.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// How task locking ended up after activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTaskMode {
    /// The OS pinned the kiosk task.
    Engaged,
    /// The install is not device owner or not permitted to lock.
    Unavailable,
    /// Locking was attempted and the OS rejected it.
    Failed,
}

/// Result of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    /// Task-lock outcome. Anything but `Engaged` is a degraded kiosk.
    pub lock_task: LockTaskMode,
}

/// The kiosk activation state machine.
#[derive(Clone)]
pub struct KioskController {
    policy: KioskPolicyStore,
    gate: PermissionGate,
    task_lock: Arc<dyn TaskLock>,
    launcher: Arc<dyn SurfaceLauncher>,
}

impl KioskController {
    /// Creates a controller.
    #[must_use]
    pub fn new(
        policy: KioskPolicyStore,
        gate: PermissionGate,
        task_lock: Arc<dyn TaskLock>,
        launcher: Arc<dyn SurfaceLauncher>,
    ) -> Self {
        Self {
            policy,
            gate,
            task_lock,
            launcher,
        }
    }

    /// The policy this controller persists to.
    #[must_use]
    pub const fn policy(&self) -> &KioskPolicyStore {
        &self.policy
    }

    /// The permission gate used for preconditions.
    #[must_use]
    pub const fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// Enters kiosk mode.
    ///
    /// Device admin is checked before the launcher role, so a missing device
    /// admin always reports [`KioskError::PermissionDenied`]. Nothing is
    /// persisted when a precondition fails. Calling this while already active
    /// re-checks the preconditions and re-engages task locking.
    ///
    /// # Errors
    ///
    /// - [`KioskError::PermissionDenied`] if device admin is not active
    /// - [`KioskError::NotDefaultLauncher`] if another app handles home
    /// - [`KioskError::Settings`] if the state cannot be persisted
    pub fn activate(&self) -> Result<Activation, KioskError> {
        if !self.gate.has_device_admin().is_satisfied() {
            warn!("Kiosk activation refused: device admin not active");
            return Err(KioskError::PermissionDenied);
        }
        if !self.gate.is_default_launcher().is_satisfied() {
            warn!("Kiosk activation refused: not the default launcher");
            return Err(KioskError::NotDefaultLauncher);
        }

        self.policy.set_state(KioskState::Active)?;

        let lock_task = self.engage_lock_task();
        info!(?lock_task, "Kiosk mode activated");
        Ok(Activation { lock_task })
    }

    fn engage_lock_task(&self) -> LockTaskMode {
        let own = self.gate.own_package();
        if !(self.task_lock.is_device_owner(own) && self.task_lock.is_lock_task_permitted(own)) {
            debug!("Task locking unavailable; relying on enforcement loop");
            return LockTaskMode::Unavailable;
        }

        match self.task_lock.engage() {
            Ok(()) => LockTaskMode::Engaged,
            Err(e) => {
                warn!(error = %e, "Failed to engage task locking");
                LockTaskMode::Failed
            },
        }
    }

    /// Leaves kiosk mode. Returns `true` if the state changed, `false` if
    /// kiosk mode was already inactive.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::Settings`] if the state cannot be read or
    /// persisted. Task-lock release failures are logged, not returned.
    pub fn deactivate(&self) -> Result<bool, KioskError> {
        if !self.policy.state()?.is_active() {
            debug!("Deactivate requested while inactive");
            return Ok(false);
        }

        self.policy.set_state(KioskState::Inactive)?;

        if let Err(e) = self.task_lock.disengage() {
            warn!(error = %e, "Failed to release task locking");
        }

        info!("Kiosk mode deactivated");
        Ok(true)
    }

    /// Current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn state(&self) -> Result<KioskState, KioskError> {
        Ok(self.policy.state()?)
    }

    /// Whether kiosk mode is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn is_active(&self) -> Result<bool, KioskError> {
        Ok(self.state()?.is_active())
    }

    /// Hands the allow list (plus this app) to the OS lock-task list.
    /// Returns `false` without calling the OS when this install is not
    /// device owner.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::Platform`] if the OS rejects the list.
    pub fn restrict_lock_task_packages(
        &self,
        packages: &BTreeSet<PackageId>,
    ) -> Result<bool, KioskError> {
        let own = self.gate.own_package();
        if !self.task_lock.is_device_owner(own) {
            debug!("Not device owner; lock-task package list left unchanged");
            return Ok(false);
        }

        let mut list: Vec<PackageId> = packages.iter().cloned().collect();
        if !packages.contains(own) {
            list.push(own.clone());
        }
        self.task_lock.set_lock_task_packages(&list)?;
        info!(count = list.len(), "Lock-task package list updated");
        Ok(true)
    }

    /// Opens the OS home-app settings so this app can be picked as launcher.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::Platform`] if the settings screen cannot open.
    pub fn request_launcher_role(&self) -> Result<(), KioskError> {
        self.launcher.open_home_settings()?;
        Ok(())
    }
}

impl fmt::Debug for KioskController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KioskController")
            .field("policy", &self.policy)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::SimulatedDevice;
    use crate::settings::InMemorySettingsStore;

    const OWN: &str = "uz.isti.kiosklock";

    fn controller(device: &Arc<SimulatedDevice>) -> KioskController {
        let policy = KioskPolicyStore::new(Arc::new(InMemorySettingsStore::new()), "samsung");
        let gate = PermissionGate::new(device.clone(), PackageId::from(OWN), 34);
        KioskController::new(policy, gate, device.clone(), device.clone())
    }

    #[test]
    fn test_activate_then_deactivate() {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        let controller = controller(&device);

        let activation = controller.activate().unwrap();
        assert_eq!(activation.lock_task, LockTaskMode::Unavailable);
        assert!(controller.is_active().unwrap());

        assert!(controller.deactivate().unwrap());
        assert!(!controller.is_active().unwrap());
    }

    #[test]
    fn test_deactivate_when_inactive_is_noop() {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        device.set_device_owner(true);
        device.set_lock_task_permitted(true);
        device.engage().unwrap();
        let controller = controller(&device);

        assert!(!controller.deactivate().unwrap());
        assert!(!controller.deactivate().unwrap());
        // Nothing was released because nothing transitioned.
        assert!(device.lock_task_engaged());
    }

    #[test]
    fn test_missing_admin_wins_over_launcher() {
        let device = Arc::new(SimulatedDevice::new(OWN));
        let controller = controller(&device);

        let err = controller.activate().unwrap_err();
        assert!(matches!(err, KioskError::PermissionDenied));
        assert!(!controller.is_active().unwrap());
    }

    #[test]
    fn test_not_default_launcher() {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        device.set_default_home(Some(PackageId::from("com.android.launcher3")));
        let controller = controller(&device);

        let err = controller.activate().unwrap_err();
        assert!(matches!(err, KioskError::NotDefaultLauncher));
        assert!(!controller.is_active().unwrap());
    }

    #[test]
    fn test_device_owner_engages_and_releases_lock_task() {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        device.set_device_owner(true);
        device.set_lock_task_permitted(true);
        let controller = controller(&device);

        assert_eq!(controller.activate().unwrap().lock_task, LockTaskMode::Engaged);
        assert!(device.lock_task_engaged());

        controller.deactivate().unwrap();
        assert!(!device.lock_task_engaged());
    }

    #[test]
    fn test_owner_without_permission_is_degraded() {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        device.set_device_owner(true);
        let controller = controller(&device);

        assert_eq!(
            controller.activate().unwrap().lock_task,
            LockTaskMode::Unavailable
        );
        assert!(!device.lock_task_engaged());
    }

    #[test]
    fn test_lock_task_failure_does_not_fail_activation() {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        device.set_device_owner(true);
        device.set_lock_task_permitted(true);
        device.set_fail_lock_task(true);
        let controller = controller(&device);

        assert_eq!(controller.activate().unwrap().lock_task, LockTaskMode::Failed);
        assert!(controller.is_active().unwrap());
        assert!(controller.deactivate().unwrap());
        assert!(!controller.is_active().unwrap());
    }

    #[test]
    fn test_restrict_lock_task_packages_requires_owner() {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        let controller = controller(&device);
        let packages: BTreeSet<PackageId> = [PackageId::from("com.android.settings")].into();

        assert!(!controller.restrict_lock_task_packages(&packages).unwrap());
        assert!(device.lock_task_packages().is_empty());

        device.set_device_owner(true);
        assert!(controller.restrict_lock_task_packages(&packages).unwrap());
        assert_eq!(
            device.lock_task_packages(),
            vec![PackageId::from("com.android.settings"), PackageId::from(OWN)]
        );
    }

    #[test]
    fn test_request_launcher_role_opens_home_settings() {
        let device = Arc::new(SimulatedDevice::new(OWN));
        controller(&device).request_launcher_role().unwrap();
        assert_eq!(device.home_settings_opened(), 1);
    }
}
