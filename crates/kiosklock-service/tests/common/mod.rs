//! Shared fixtures for kiosklock-service integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kiosklock_core::Platform;
use kiosklock_core::device::DeviceProfile;
use kiosklock_core::integrity::IntegrityProbe;
use kiosklock_core::platform::simulated::SimulatedDevice;
use kiosklock_core::settings::InMemorySettingsStore;
use kiosklock_service::{KioskService, ServiceConfig};

pub const OWN_PACKAGE: &str = "uz.isti.kiosklock";

pub struct TestEnv {
    pub device: Arc<SimulatedDevice>,
    pub store: Arc<InMemorySettingsStore>,
    pub service: KioskService,
}

impl TestEnv {
    /// Service over a provisioned device and an empty in-memory store.
    pub fn provisioned() -> Self {
        Self::with_store(Arc::new(InMemorySettingsStore::new()))
    }

    /// Service over a provisioned device sharing `store`, as a restarted
    /// process would.
    pub fn with_store(store: Arc<InMemorySettingsStore>) -> Self {
        Self::build(Arc::new(SimulatedDevice::provisioned(OWN_PACKAGE)), store)
    }

    pub fn build(device: Arc<SimulatedDevice>, store: Arc<InMemorySettingsStore>) -> Self {
        let config = ServiceConfig::for_package(OWN_PACKAGE);
        let service = KioskService::new(
            &config,
            profile("nokia"),
            Platform::from_shared(device.clone()),
            store.clone(),
        );
        Self {
            device,
            store,
            service,
        }
    }
}

pub fn profile(brand: &str) -> DeviceProfile {
    DeviceProfile {
        brand: brand.into(),
        manufacturer: "HMD Global".into(),
        model: "Nokia T20".into(),
        device_name: "Doctor Strange".into(),
        os_version: "13".into(),
        api_level: 33,
    }
}

/// Integrity probe reporting a clean device.
pub struct CleanProbe;

impl IntegrityProbe for CleanProbe {
    fn build_tags(&self) -> Option<String> {
        Some("release-keys".into())
    }

    fn path_exists(&self, _path: &Path) -> bool {
        false
    }

    fn su_on_path(&self) -> bool {
        false
    }
}

/// Integrity probe reporting a rooted device.
pub struct RootedProbe;

impl IntegrityProbe for RootedProbe {
    fn build_tags(&self) -> Option<String> {
        Some("test-keys".into())
    }

    fn path_exists(&self, path: &Path) -> bool {
        path == Path::new("/system/xbin/su")
    }

    fn su_on_path(&self) -> bool {
        true
    }
}

/// Lets the paused clock run forward by `ms`.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
