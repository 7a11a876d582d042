//! kiosklock-service - Kiosk Enforcement Service
//!
//! Async host layer over `kiosklock-core`. It owns the background
//! enforcement task, maps OS broadcasts to service actions and loads the
//! service configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use kiosklock_core::Platform;
//! use kiosklock_core::device::DeviceProfile;
//! use kiosklock_core::integrity::HostIntegrityProbe;
//! use kiosklock_core::platform::simulated::SimulatedDevice;
//! use kiosklock_service::{KioskService, ServiceConfig, init_logging};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::from_file(Path::new("/data/kiosklock/kiosklock.toml"))?;
//! init_logging(&config.logging)?;
//!
//! let profile = DeviceProfile {
//!     brand: "samsung".into(),
//!     manufacturer: "samsung".into(),
//!     model: "SM-T500".into(),
//!     device_name: "gta4lwifi".into(),
//!     os_version: "12".into(),
//!     api_level: 31,
//! };
//! let device = Arc::new(SimulatedDevice::provisioned(config.device.package.clone()));
//! let service = KioskService::open(&config, profile, Platform::from_shared(device))?;
//!
//! service.on_process_start(&HostIntegrityProbe).await?;
//! service.activate().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod enforcement;
pub mod lifecycle;
pub mod logging;
pub mod service;
pub mod signals;

pub use config::{ConfigError, ServiceConfig};
pub use enforcement::{EnforcementConfig, EnforcementError, Enforcer, SurfaceAction, SweepReport};
pub use lifecycle::EnforcementLoop;
pub use logging::{LogConfig, LoggingError, init_logging};
pub use service::{KioskService, ServiceError, SignalOutcome};
pub use signals::SystemSignal;
