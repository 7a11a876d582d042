//! Configuration and settings files on disk.

use std::sync::Arc;
use std::time::Duration;

use kiosklock_core::device::DeviceProfile;
use kiosklock_core::platform::simulated::SimulatedDevice;
use kiosklock_core::{KioskState, Platform};
use kiosklock_service::{ConfigError, KioskService, ServiceConfig, ServiceError};

fn profile() -> DeviceProfile {
    DeviceProfile {
        brand: "samsung".into(),
        manufacturer: "samsung".into(),
        model: "SM-T500".into(),
        device_name: "gta4lwifi".into(),
        os_version: "12".into(),
        api_level: 31,
    }
}

#[test]
fn config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kiosklock.toml");
    std::fs::write(
        &path,
        r#"
[device]
package = "uz.isti.kiosklock"

[enforcement]
surface_interval = "2s"
"#,
    )
    .unwrap();

    let config = ServiceConfig::from_file(&path).unwrap();
    assert_eq!(config.enforcement.surface_interval, Duration::from_secs(2));
    assert_eq!(config.enforcement.sweep_interval, Duration::from_secs(5));
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ServiceConfig::from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[tokio::test(start_paused = true)]
async fn kiosk_state_persists_across_service_instances() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::for_package("uz.isti.kiosklock");
    config.settings.path = dir.path().join("settings.json");
    let device = Arc::new(SimulatedDevice::provisioned("uz.isti.kiosklock"));

    {
        let service =
            KioskService::open(&config, profile(), Platform::from_shared(device.clone())).unwrap();
        service.activate().await.unwrap();
        service.shutdown().await;
    }

    let service = KioskService::open(&config, profile(), Platform::from_shared(device)).unwrap();
    assert_eq!(service.policy().state().unwrap(), KioskState::Active);
}

#[test]
fn corrupt_settings_file_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::for_package("uz.isti.kiosklock");
    config.settings.path = dir.path().join("settings.json");
    std::fs::write(&config.settings.path, "{ not json").unwrap();

    let device = Arc::new(SimulatedDevice::provisioned("uz.isti.kiosklock"));
    let result = KioskService::open(&config, profile(), Platform::from_shared(device));
    assert!(matches!(result, Err(ServiceError::Settings(_))));
}
