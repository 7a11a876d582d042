//! The kiosk service.
//!
//! [`KioskService`] wires the core controller to the enforcement loop and
//! is the single entry point a host calls from its process start, its
//! settings screen and its broadcast receivers.

use std::sync::{Arc, OnceLock};

use kiosklock_core::device::{DeviceInfo, DeviceProfile};
use kiosklock_core::integrity::{IntegrityProbe, IntegrityReport, check_integrity};
use kiosklock_core::settings::{JsonFileSettingsStore, SettingsStore};
use kiosklock_core::{
    Activation, AdminAuthenticator, AllowedAppResolver, AuthError, KioskController, KioskError,
    KioskPolicyStore, KioskSurface, PermissionGate, PermissionReport, Platform, SettingsError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::enforcement::Enforcer;
use crate::lifecycle::EnforcementLoop;
use crate::signals::SystemSignal;

/// Errors from service entry points.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// Activation or deactivation failed.
    #[error(transparent)]
    Kiosk(#[from] KioskError),

    /// Password check failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The settings store failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// What the service did with a [`SystemSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Boot signal with auto-start on and kiosk active: enforcement resumed.
    EnforcementResumed,
    /// Package change while active; left to the next sweep.
    Logged,
    /// Nothing to do.
    Ignored,
}

/// Host-facing kiosk service.
#[derive(Debug)]
pub struct KioskService {
    profile: DeviceProfile,
    platform: Platform,
    controller: KioskController,
    enforcement: EnforcementLoop,
    integrity: OnceLock<IntegrityReport>,
}

impl KioskService {
    /// Builds the service over an existing settings store.
    #[must_use]
    pub fn new(
        config: &ServiceConfig,
        profile: DeviceProfile,
        platform: Platform,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        let own_package = config.device.package.clone();
        let policy = KioskPolicyStore::new(store, profile.brand.clone());
        let gate = PermissionGate::new(
            Arc::clone(&platform.permissions),
            own_package.clone(),
            profile.api_level,
        );
        let controller = KioskController::new(
            policy.clone(),
            gate,
            Arc::clone(&platform.task_lock),
            Arc::clone(&platform.launcher),
        );
        let enforcer = Enforcer::new(
            policy,
            Arc::clone(&platform.foreground),
            Arc::clone(&platform.launcher),
            own_package,
        );

        Self {
            profile,
            platform,
            controller,
            enforcement: EnforcementLoop::new(enforcer, config.enforcement),
            integrity: OnceLock::new(),
        }
    }

    /// Builds the service with settings persisted at `config.settings.path`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Settings`] if the settings file exists but
    /// cannot be read or parsed.
    pub fn open(
        config: &ServiceConfig,
        profile: DeviceProfile,
        platform: Platform,
    ) -> Result<Self, ServiceError> {
        let store = JsonFileSettingsStore::open(&config.settings.path)?;
        info!(path = %store.path().display(), "Settings store opened");
        Ok(Self::new(config, profile, platform, Arc::new(store)))
    }

    /// Process-start hook: runs the integrity check once and resumes
    /// enforcement if kiosk mode was left active.
    ///
    /// The integrity result is advisory. A compromised device is logged and
    /// reported in [`device_info`](Self::device_info) but nothing is gated
    /// on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the kiosk state cannot be read.
    pub async fn on_process_start(&self, probe: &impl IntegrityProbe) -> Result<bool, ServiceError> {
        let report = self.integrity.get_or_init(|| check_integrity(probe));
        if report.is_compromised() {
            warn!(indicators = ?report.indicators, "Device integrity check found root indicators");
        }

        if self.controller.is_active()? {
            info!("Kiosk mode was active at process start; resuming enforcement");
            return Ok(self.enforcement.start().await);
        }
        Ok(false)
    }

    /// Activates kiosk mode, narrows the lock-task list to the allow list,
    /// starts enforcement and shows the kiosk surface.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::PermissionDenied`] or
    /// [`KioskError::NotDefaultLauncher`] (wrapped) when a precondition is
    /// missing; nothing is persisted or started in that case.
    pub async fn activate(&self) -> Result<Activation, ServiceError> {
        let activation = self.controller.activate()?;

        match self.controller.policy().allowed_apps() {
            Ok(allowed) => {
                if let Err(e) = self.controller.restrict_lock_task_packages(&allowed) {
                    warn!(error = %e, "Failed to update lock-task package list");
                }
            },
            Err(e) => warn!(error = %e, "Could not read allow list for lock-task packages"),
        }

        self.enforcement.start().await;
        self.show_surface();
        Ok(activation)
    }

    /// Deactivates kiosk mode and stops enforcement. Returns `false` if
    /// kiosk mode was already inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub async fn deactivate(&self) -> Result<bool, ServiceError> {
        let changed = self.controller.deactivate()?;
        self.enforcement.stop().await;
        Ok(changed)
    }

    /// Admin exit: checks `password`, then deactivates.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Auth`] with `AuthenticationFailed` on mismatch
    /// - [`ServiceError::Kiosk`] if deactivation fails
    pub async fn exit_with_password(&self, password: &str) -> Result<(), ServiceError> {
        AdminAuthenticator::new(self.controller.policy().clone()).verify(password)?;
        self.deactivate().await?;
        Ok(())
    }

    /// Reacts to an OS broadcast.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy cannot be read.
    pub async fn handle_signal(&self, signal: &SystemSignal) -> Result<SignalOutcome, ServiceError> {
        let policy = self.controller.policy();

        if signal.is_boot() {
            if !policy.auto_start_enabled()? {
                info!(%signal, "Auto-start disabled; ignoring boot signal");
                return Ok(SignalOutcome::Ignored);
            }
            if !policy.state()?.is_active() {
                info!(%signal, "Kiosk mode inactive; ignoring boot signal");
                return Ok(SignalOutcome::Ignored);
            }

            info!(%signal, "Resuming kiosk mode after boot");
            self.enforcement.start().await;
            self.show_surface();
            return Ok(SignalOutcome::EnforcementResumed);
        }

        if policy.state()?.is_active() {
            info!(%signal, "Package change while kiosk mode is active");
            return Ok(SignalOutcome::Logged);
        }
        Ok(SignalOutcome::Ignored)
    }

    /// Stops enforcement without touching the persisted state.
    pub async fn shutdown(&self) {
        if self.enforcement.stop().await {
            info!("Enforcement stopped for shutdown");
        }
    }

    /// Whether the enforcement task is alive.
    pub async fn is_enforcing(&self) -> bool {
        self.enforcement.is_running().await
    }

    /// A fresh kiosk-screen session.
    #[must_use]
    pub fn surface(&self) -> KioskSurface {
        KioskSurface::new(
            self.controller.clone(),
            AllowedAppResolver::new(Arc::clone(&self.platform.catalog)),
            Arc::clone(&self.platform.launcher),
        )
    }

    /// Resolver over the platform catalog, for the settings picker.
    #[must_use]
    pub fn resolver(&self) -> AllowedAppResolver {
        AllowedAppResolver::new(Arc::clone(&self.platform.catalog))
    }

    /// Admin-password management.
    #[must_use]
    pub fn authenticator(&self) -> AdminAuthenticator {
        AdminAuthenticator::new(self.controller.policy().clone())
    }

    /// Current permission status.
    #[must_use]
    pub fn permission_report(&self) -> PermissionReport {
        self.controller.gate().report()
    }

    /// Diagnostic snapshot. Reports a clean device until
    /// [`on_process_start`](Self::on_process_start) has run.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        let integrity = self.integrity.get().cloned().unwrap_or_default();
        DeviceInfo::collect(&self.profile, self.controller.gate(), &integrity)
    }

    /// The kiosk controller.
    #[must_use]
    pub const fn controller(&self) -> &KioskController {
        &self.controller
    }

    /// The persisted kiosk policy.
    #[must_use]
    pub const fn policy(&self) -> &KioskPolicyStore {
        self.controller.policy()
    }

    fn show_surface(&self) {
        if let Err(e) = self.platform.launcher.launch_kiosk_surface() {
            warn!(error = %e, "Failed to show kiosk surface");
        }
    }
}
