//! Enforcement passes.
//!
//! [`Enforcer`] holds the two corrective passes the background loop runs
//! while kiosk mode is active:
//!
//! - **surface correction** brings the kiosk surface back to the front when
//!   anything other than this app owns the top task;
//! - **process sweep** asks the OS to terminate foreground processes that are
//!   neither this app nor on the allow list.
//!
//! Both passes are synchronous and keep no state between runs. Scheduling
//! lives in [`crate::lifecycle`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kiosklock_core::PackageId;
use kiosklock_core::platform::{ForegroundInspector, PlatformError, SurfaceLauncher};
use kiosklock_core::settings::{KioskPolicyStore, SettingsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Smallest accepted loop interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Largest accepted loop interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Errors from the enforcement layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnforcementError {
    /// The enforcement configuration is out of bounds.
    #[error("invalid enforcement configuration: {0}")]
    InvalidConfiguration(String),

    /// The allow list could not be read.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// The process list could not be read.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Timing of the enforcement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnforcementConfig {
    /// How often the foreground task is checked.
    #[serde(default = "default_surface_interval", with = "humantime_serde")]
    pub surface_interval: Duration,

    /// How often foreground processes are swept.
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

const fn default_surface_interval() -> Duration {
    Duration::from_secs(1)
}

const fn default_sweep_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            surface_interval: default_surface_interval(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl EnforcementConfig {
    /// Checks both intervals against [`MIN_INTERVAL`] and [`MAX_INTERVAL`].
    ///
    /// # Errors
    ///
    /// Returns [`EnforcementError::InvalidConfiguration`] naming the first
    /// interval out of bounds.
    pub fn validate(&self) -> Result<(), EnforcementError> {
        for (name, value) in [
            ("surface_interval", self.surface_interval),
            ("sweep_interval", self.sweep_interval),
        ] {
            if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&value) {
                return Err(EnforcementError::InvalidConfiguration(format!(
                    "{name} must be between {} and {}, got {}",
                    humantime::format_duration(MIN_INTERVAL),
                    humantime::format_duration(MAX_INTERVAL),
                    humantime::format_duration(value),
                )));
            }
        }
        Ok(())
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Result of one surface correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceAction {
    /// This app already owns the top task.
    InPlace,
    /// The kiosk surface was relaunched over `foreground`.
    Relaunched {
        /// Package that owned the top task, `None` if there was no task.
        foreground: Option<PackageId>,
    },
    /// The task list could not be read; nothing was done.
    Skipped,
    /// The relaunch itself failed.
    Failed,
}

/// Result of one process sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Foreground-importance processes examined.
    pub inspected: usize,
    /// Packages whose termination the OS accepted.
    pub terminated: Vec<PackageId>,
    /// Packages whose termination was refused or failed.
    pub refused: Vec<PackageId>,
}

/// Runs the corrective passes against the platform.
#[derive(Clone)]
pub struct Enforcer {
    policy: KioskPolicyStore,
    foreground: Arc<dyn ForegroundInspector>,
    launcher: Arc<dyn SurfaceLauncher>,
    own_package: PackageId,
}

impl Enforcer {
    /// Creates an enforcer for `own_package`.
    #[must_use]
    pub fn new(
        policy: KioskPolicyStore,
        foreground: Arc<dyn ForegroundInspector>,
        launcher: Arc<dyn SurfaceLauncher>,
        own_package: PackageId,
    ) -> Self {
        Self {
            policy,
            foreground,
            launcher,
            own_package,
        }
    }

    /// Whether enforcement should continue.
    ///
    /// An unreadable state keeps enforcing; only a persisted `Inactive`
    /// stops the loop.
    #[must_use]
    pub fn should_run(&self) -> bool {
        match self.policy.state() {
            Ok(state) => state.is_active(),
            Err(e) => {
                warn!(error = %e, "Could not read kiosk state; continuing enforcement");
                true
            },
        }
    }

    /// Relaunches the kiosk surface unless this app owns the top task.
    pub fn correct_surface(&self) -> SurfaceAction {
        let foreground = match self.foreground.foreground_task() {
            Ok(foreground) => foreground,
            Err(e) => {
                warn!(error = %e, "Could not read foreground task; skipping surface check");
                return SurfaceAction::Skipped;
            },
        };

        if foreground.as_ref() == Some(&self.own_package) {
            return SurfaceAction::InPlace;
        }

        match self.launcher.launch_kiosk_surface() {
            Ok(()) => {
                info!(
                    foreground = foreground.as_ref().map_or("<none>", PackageId::as_str),
                    "Foreign task in front; kiosk surface relaunched"
                );
                SurfaceAction::Relaunched { foreground }
            },
            Err(e) => {
                warn!(error = %e, "Failed to relaunch kiosk surface");
                SurfaceAction::Failed
            },
        }
    }

    /// Requests termination of every foreground process outside the allow
    /// list. Per-process failures are logged and recorded as refused.
    ///
    /// # Errors
    ///
    /// Returns an error if the allow list or the process list cannot be
    /// read; no termination is requested in that case.
    pub fn sweep_processes(&self) -> Result<SweepReport, EnforcementError> {
        let allowed = self.policy.allowed_apps()?;
        let processes = self.foreground.processes()?;

        let mut report = SweepReport::default();

        for process in processes.iter().filter(|p| p.is_foreground()) {
            report.inspected += 1;
            let package = &process.package_id;
            if *package == self.own_package || allowed.contains(package) {
                continue;
            }

            match self.foreground.request_terminate(package) {
                Ok(()) => {
                    info!(%package, "Terminated foreground process outside the allow list");
                    report.terminated.push(package.clone());
                },
                Err(e @ PlatformError::ProcessTerminationRefused { .. }) => {
                    debug!(%package, error = %e, "Termination refused");
                    report.refused.push(package.clone());
                },
                Err(e) => {
                    warn!(%package, error = %e, "Termination request failed");
                    report.refused.push(package.clone());
                },
            }
        }

        Ok(report)
    }
}

impl fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enforcer")
            .field("own_package", &self.own_package)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use kiosklock_core::KioskState;
    use kiosklock_core::platform::simulated::SimulatedDevice;
    use kiosklock_core::platform::{Importance, ProcessInfo};
    use kiosklock_core::settings::InMemorySettingsStore;

    use super::*;

    const OWN: &str = "uz.isti.kiosklock";

    fn enforcer() -> (Arc<SimulatedDevice>, Enforcer) {
        let device = Arc::new(SimulatedDevice::provisioned(OWN));
        let policy = KioskPolicyStore::new(Arc::new(InMemorySettingsStore::new()), "nokia");
        policy.set_state(KioskState::Active).unwrap();
        let allowed: BTreeSet<PackageId> = [PackageId::from("com.example.pos")].into();
        policy.set_allowed_apps(&allowed).unwrap();
        let enforcer = Enforcer::new(policy, device.clone(), device.clone(), PackageId::from(OWN));
        (device, enforcer)
    }

    #[test]
    fn test_default_intervals() {
        let config = EnforcementConfig::default();
        assert_eq!(config.surface_interval, Duration::from_secs(1));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        config.validate().unwrap();
    }

    #[test]
    fn test_interval_bounds() {
        let too_fast = EnforcementConfig {
            surface_interval: Duration::from_millis(50),
            ..EnforcementConfig::default()
        };
        let err = too_fast.validate().unwrap_err();
        assert!(err.to_string().contains("surface_interval"));

        let too_slow = EnforcementConfig {
            sweep_interval: Duration::from_secs(61),
            ..EnforcementConfig::default()
        };
        assert!(matches!(
            too_slow.validate(),
            Err(EnforcementError::InvalidConfiguration(_))
        ));

        let edges = EnforcementConfig {
            surface_interval: MIN_INTERVAL,
            sweep_interval: MAX_INTERVAL,
        };
        edges.validate().unwrap();
    }

    #[test]
    fn test_surface_in_place() {
        let (device, enforcer) = enforcer();
        assert_eq!(enforcer.correct_surface(), SurfaceAction::InPlace);
        assert_eq!(device.surface_launches(), 0);
    }

    #[test]
    fn test_foreign_task_relaunches_surface() {
        let (device, enforcer) = enforcer();
        device.bring_to_front("com.example.game");
        assert_eq!(
            enforcer.correct_surface(),
            SurfaceAction::Relaunched {
                foreground: Some(PackageId::from("com.example.game")),
            }
        );
        assert_eq!(device.foreground(), Some(PackageId::from(OWN)));
    }

    #[test]
    fn test_empty_task_list_relaunches_surface() {
        let (device, enforcer) = enforcer();
        device.clear_tasks();
        assert_eq!(
            enforcer.correct_surface(),
            SurfaceAction::Relaunched { foreground: None }
        );
        assert_eq!(device.surface_launches(), 1);
    }

    #[test]
    fn test_unreadable_task_list_is_skipped() {
        let (device, enforcer) = enforcer();
        device.set_fail_foreground_read(true);
        assert_eq!(enforcer.correct_surface(), SurfaceAction::Skipped);
        assert_eq!(device.surface_launches(), 0);
    }

    #[test]
    fn test_sweep_spares_own_and_allowed() {
        let (device, enforcer) = enforcer();
        device.set_processes(vec![
            ProcessInfo::new(OWN, Importance::Foreground),
            ProcessInfo::new("com.example.pos", Importance::Foreground),
            ProcessInfo::new("com.example.game", Importance::Foreground),
            ProcessInfo::new("com.example.music", Importance::Service),
        ]);

        let report = enforcer.sweep_processes().unwrap();
        assert_eq!(report.inspected, 3);
        assert_eq!(report.terminated, vec![PackageId::from("com.example.game")]);
        assert!(report.refused.is_empty());
        assert_eq!(
            device.termination_requests(),
            vec![PackageId::from("com.example.game")]
        );
    }

    #[test]
    fn test_background_processes_are_not_inspected() {
        let (device, enforcer) = enforcer();
        device.set_processes(vec![
            ProcessInfo::new("com.example.music", Importance::Service),
            ProcessInfo::new("com.example.cache", Importance::Cached),
        ]);

        assert_eq!(enforcer.sweep_processes().unwrap(), SweepReport::default());
        assert!(device.termination_requests().is_empty());
    }

    #[test]
    fn test_refusal_does_not_stop_sweep() {
        let (device, enforcer) = enforcer();
        device.set_processes(vec![
            ProcessInfo::new("com.example.stubborn", Importance::Foreground),
            ProcessInfo::new("com.example.game", Importance::Foreground),
        ]);
        device.refuse_termination_of("com.example.stubborn");

        let report = enforcer.sweep_processes().unwrap();
        assert_eq!(report.refused, vec![PackageId::from("com.example.stubborn")]);
        assert_eq!(report.terminated, vec![PackageId::from("com.example.game")]);
    }

    #[test]
    fn test_sweeps_are_stateless() {
        let (device, enforcer) = enforcer();
        device.set_processes(vec![ProcessInfo::new(
            "com.example.game",
            Importance::Foreground,
        )]);

        let first = enforcer.sweep_processes().unwrap();
        let second = enforcer.sweep_processes().unwrap();
        assert_eq!(first, second);
        assert_eq!(device.termination_requests().len(), 2);
    }

    #[test]
    fn test_should_run_follows_state() {
        let (_device, enforcer) = enforcer();
        assert!(enforcer.should_run());
        enforcer.policy.set_state(KioskState::Inactive).unwrap();
        assert!(!enforcer.should_run());
    }
}
