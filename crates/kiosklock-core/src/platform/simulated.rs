//! In-process device model.
//!
//! [`SimulatedDevice`] implements every platform contract against plain
//! in-memory state and records every corrective action it is asked to take.
//! It backs the test suites of both crates and desktop dry runs of the
//! enforcement service.
//!
//! Termination requests are recorded but do not remove processes, matching
//! the OS behavior of refusing to kill a process that is still in the
//! foreground. Launching the kiosk surface moves the foreground to the
//! device's own package.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{
    ForegroundInspector, PackageCatalog, PermissionProbe, PlatformError, ProcessInfo,
    SurfaceLauncher, TaskLock,
};
use crate::apps::{AppIdentity, PackageId};

#[derive(Debug, Default)]
struct DeviceState {
    admin_active: bool,
    device_owner: bool,
    lock_task_permitted: bool,
    lock_task_engaged: bool,
    fail_lock_task: bool,
    lock_task_packages: Vec<PackageId>,
    overlay_granted: bool,
    usage_access: bool,
    default_home: Option<PackageId>,
    foreground: Option<PackageId>,
    fail_foreground_read: bool,
    processes: Vec<ProcessInfo>,
    refuse_termination: BTreeSet<PackageId>,
    termination_requests: Vec<PackageId>,
    installed: BTreeMap<PackageId, AppIdentity>,
    not_launchable: BTreeSet<PackageId>,
    surface_launches: usize,
    launched_apps: Vec<PackageId>,
    home_settings_opened: usize,
}

/// A scriptable device implementing every platform trait.
#[derive(Debug)]
pub struct SimulatedDevice {
    own_package: PackageId,
    state: Mutex<DeviceState>,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident, $field:ident: $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self, value: $ty) {
            self.lock().$field = value;
        }
    };
}

impl SimulatedDevice {
    /// Creates a device where nothing is granted and nothing runs.
    #[must_use]
    pub fn new(own_package: impl Into<PackageId>) -> Self {
        Self {
            own_package: own_package.into(),
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// Creates a device where every kiosk precondition already holds: device
    /// admin active, overlay granted, and this app is the default launcher.
    #[must_use]
    pub fn provisioned(own_package: impl Into<PackageId>) -> Self {
        let device = Self::new(own_package);
        {
            let mut state = device.lock();
            state.admin_active = true;
            state.overlay_granted = true;
            state.default_home = Some(device.own_package.clone());
            state.foreground = Some(device.own_package.clone());
        }
        device
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        // A panic while holding the lock only happens inside a failing test;
        // keep serving the state so the original assertion is reported.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// This app's package.
    #[must_use]
    pub fn own_package(&self) -> &PackageId {
        &self.own_package
    }

    setter!(
        /// Activates or deactivates the device-admin receiver.
        set_admin_active, admin_active: bool
    );
    setter!(
        /// Grants or revokes device-owner status.
        set_device_owner, device_owner: bool
    );
    setter!(
        /// Permits or forbids task locking.
        set_lock_task_permitted, lock_task_permitted: bool
    );
    setter!(
        /// Makes task-lock calls fail.
        set_fail_lock_task, fail_lock_task: bool
    );
    setter!(
        /// Grants or revokes the overlay permission.
        set_overlay_granted, overlay_granted: bool
    );
    setter!(
        /// Grants or revokes usage access.
        set_usage_access, usage_access: bool
    );
    setter!(
        /// Sets the package resolving the home intent.
        set_default_home, default_home: Option<PackageId>
    );
    setter!(
        /// Makes foreground-task reads fail.
        set_fail_foreground_read, fail_foreground_read: bool
    );
    setter!(
        /// Replaces the running process list.
        set_processes, processes: Vec<ProcessInfo>
    );

    /// Moves `package` to the foreground.
    pub fn bring_to_front(&self, package: impl Into<PackageId>) {
        self.lock().foreground = Some(package.into());
    }

    /// Clears the task list.
    pub fn clear_tasks(&self) {
        self.lock().foreground = None;
    }

    /// Makes the OS refuse to terminate `package`.
    pub fn refuse_termination_of(&self, package: impl Into<PackageId>) {
        self.lock().refuse_termination.insert(package.into());
    }

    /// Installs an app with a launcher entry.
    pub fn install(&self, app: AppIdentity) {
        self.lock().installed.insert(app.package_id.clone(), app);
    }

    /// Installs an app that has no launcher entry.
    pub fn install_without_launcher(&self, app: AppIdentity) {
        let mut state = self.lock();
        state.not_launchable.insert(app.package_id.clone());
        state.installed.insert(app.package_id.clone(), app);
    }

    /// Removes an installed app.
    pub fn uninstall(&self, package: &PackageId) {
        let mut state = self.lock();
        state.installed.remove(package);
        state.not_launchable.remove(package);
    }

    /// Current foreground package.
    #[must_use]
    pub fn foreground(&self) -> Option<PackageId> {
        self.lock().foreground.clone()
    }

    /// Whether task locking is engaged.
    #[must_use]
    pub fn lock_task_engaged(&self) -> bool {
        self.lock().lock_task_engaged
    }

    /// Packages last handed to the lock-task list.
    #[must_use]
    pub fn lock_task_packages(&self) -> Vec<PackageId> {
        self.lock().lock_task_packages.clone()
    }

    /// Every termination request received, in order.
    #[must_use]
    pub fn termination_requests(&self) -> Vec<PackageId> {
        self.lock().termination_requests.clone()
    }

    /// Number of kiosk surface launches.
    #[must_use]
    pub fn surface_launches(&self) -> usize {
        self.lock().surface_launches
    }

    /// Apps launched from the kiosk surface, in order.
    #[must_use]
    pub fn launched_apps(&self) -> Vec<PackageId> {
        self.lock().launched_apps.clone()
    }

    /// Number of times the home settings were opened.
    #[must_use]
    pub fn home_settings_opened(&self) -> usize {
        self.lock().home_settings_opened
    }
}

impl TaskLock for SimulatedDevice {
    fn is_device_owner(&self, package: &PackageId) -> bool {
        *package == self.own_package && self.lock().device_owner
    }

    fn is_lock_task_permitted(&self, package: &PackageId) -> bool {
        *package == self.own_package && self.lock().lock_task_permitted
    }

    fn engage(&self) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.fail_lock_task {
            return Err(PlatformError::Unavailable("lock task rejected".into()));
        }
        state.lock_task_engaged = true;
        Ok(())
    }

    fn disengage(&self) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.fail_lock_task {
            return Err(PlatformError::Unavailable("lock task rejected".into()));
        }
        state.lock_task_engaged = false;
        Ok(())
    }

    fn set_lock_task_packages(&self, packages: &[PackageId]) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.device_owner {
            return Err(PlatformError::Unavailable("not device owner".into()));
        }
        state.lock_task_packages = packages.to_vec();
        Ok(())
    }
}

impl PermissionProbe for SimulatedDevice {
    fn device_admin_active(&self) -> bool {
        self.lock().admin_active
    }

    fn can_draw_overlays(&self) -> bool {
        self.lock().overlay_granted
    }

    fn default_home_package(&self) -> Option<PackageId> {
        self.lock().default_home.clone()
    }

    fn usage_access_allowed(&self) -> Result<bool, PlatformError> {
        Ok(self.lock().usage_access)
    }
}

impl ForegroundInspector for SimulatedDevice {
    fn foreground_task(&self) -> Result<Option<PackageId>, PlatformError> {
        let state = self.lock();
        if state.fail_foreground_read {
            return Err(PlatformError::Unavailable("task list unavailable".into()));
        }
        Ok(state.foreground.clone())
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>, PlatformError> {
        Ok(self.lock().processes.clone())
    }

    fn request_terminate(&self, package: &PackageId) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.termination_requests.push(package.clone());
        if state.refuse_termination.contains(package) {
            return Err(PlatformError::ProcessTerminationRefused {
                package: package.clone(),
            });
        }
        Ok(())
    }
}

impl PackageCatalog for SimulatedDevice {
    fn launchable_apps(&self) -> Result<Vec<AppIdentity>, PlatformError> {
        let state = self.lock();
        Ok(state
            .installed
            .values()
            .filter(|app| !state.not_launchable.contains(&app.package_id))
            .cloned()
            .collect())
    }

    fn resolve(&self, package: &PackageId) -> Result<AppIdentity, PlatformError> {
        self.lock()
            .installed
            .get(package)
            .cloned()
            .ok_or_else(|| PlatformError::AppResolutionFailed {
                package: package.clone(),
            })
    }
}

impl SurfaceLauncher for SimulatedDevice {
    fn launch_kiosk_surface(&self) -> Result<(), PlatformError> {
        let mut state = self.lock();
        state.surface_launches += 1;
        state.foreground = Some(self.own_package.clone());
        Ok(())
    }

    fn launch_app(&self, package: &PackageId) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if !state.installed.contains_key(package) || state.not_launchable.contains(package) {
            return Err(PlatformError::NotLaunchable {
                package: package.clone(),
            });
        }
        state.launched_apps.push(package.clone());
        state.foreground = Some(package.clone());
        Ok(())
    }

    fn open_home_settings(&self) -> Result<(), PlatformError> {
        self.lock().home_settings_opened += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Importance;

    #[test]
    fn test_provisioned_device_meets_preconditions() {
        let device = SimulatedDevice::provisioned("uz.isti.kiosklock");
        assert!(device.device_admin_active());
        assert_eq!(
            device.default_home_package(),
            Some(PackageId::from("uz.isti.kiosklock"))
        );
        assert!(!device.is_device_owner(device.own_package()));
    }

    #[test]
    fn test_refused_termination_is_still_recorded() {
        let device = SimulatedDevice::new("uz.isti.kiosklock");
        device.set_processes(vec![ProcessInfo::new("com.game", Importance::Foreground)]);
        device.refuse_termination_of("com.game");

        let err = device.request_terminate(&"com.game".into()).unwrap_err();
        assert!(matches!(err, PlatformError::ProcessTerminationRefused { .. }));
        assert_eq!(device.termination_requests(), vec![PackageId::from("com.game")]);
        assert_eq!(device.processes().unwrap().len(), 1);
    }

    #[test]
    fn test_app_without_launcher_is_installed_but_not_launchable() {
        let device = SimulatedDevice::new("uz.isti.kiosklock");
        device.install_without_launcher(AppIdentity::new("com.vendor.service", "Service"));

        let package = PackageId::from("com.vendor.service");
        assert!(device.resolve(&package).is_ok());
        assert!(device.launchable_apps().unwrap().is_empty());
        assert!(matches!(
            device.launch_app(&package),
            Err(PlatformError::NotLaunchable { .. })
        ));
    }
}
