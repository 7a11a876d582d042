//! Shared fixtures for kiosklock-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use kiosklock_core::apps::{AllowedAppResolver, AppIdentity};
use kiosklock_core::permissions::PermissionGate;
use kiosklock_core::platform::simulated::SimulatedDevice;
use kiosklock_core::settings::{InMemorySettingsStore, KioskPolicyStore};
use kiosklock_core::surface::KioskSurface;
use kiosklock_core::{KioskController, PackageId};

pub const OWN_PACKAGE: &str = "uz.isti.kiosklock";
pub const API_LEVEL: u32 = 34;

/// A provisioned simulated device wired to a fresh in-memory policy.
pub struct Fixture {
    pub device: Arc<SimulatedDevice>,
    pub store: Arc<InMemorySettingsStore>,
    pub policy: KioskPolicyStore,
    pub controller: KioskController,
}

impl Fixture {
    pub fn provisioned(brand: &str) -> Self {
        Self::with_device(SimulatedDevice::provisioned(OWN_PACKAGE), brand)
    }

    pub fn unprovisioned(brand: &str) -> Self {
        Self::with_device(SimulatedDevice::new(OWN_PACKAGE), brand)
    }

    fn with_device(device: SimulatedDevice, brand: &str) -> Self {
        let device = Arc::new(device);
        let store = Arc::new(InMemorySettingsStore::new());
        let policy = KioskPolicyStore::new(store.clone(), brand);
        let gate = PermissionGate::new(device.clone(), PackageId::from(OWN_PACKAGE), API_LEVEL);
        let controller = KioskController::new(policy.clone(), gate, device.clone(), device.clone());
        Self {
            device,
            store,
            policy,
            controller,
        }
    }

    pub fn surface(&self) -> KioskSurface {
        KioskSurface::new(
            self.controller.clone(),
            AllowedAppResolver::new(self.device.clone()),
            self.device.clone(),
        )
    }

    pub fn install(&self, package: &str, name: &str) {
        self.device.install(AppIdentity::new(package, name));
    }
}
