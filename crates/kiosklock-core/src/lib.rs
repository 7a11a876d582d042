#![allow(clippy::doc_markdown)]

//! kiosklock-core - Kiosk-Mode Control Plane
//!
//! This library holds the decision-making half of the kiosk lock: the
//! persisted kiosk policy, the activation state machine, the allow-list
//! policy, the escape-hatch gesture and the permission gating that makes
//! activation safe. Everything the operating system provides (task locking,
//! foreground inspection, the package catalog, permission probes) is consumed
//! through the traits in [`platform`].
//!
//! # Layout
//!
//! ```text
//! settings  -> key-value store contract + KioskPolicyStore typed view
//! state     -> KioskState (Inactive | Active), backed by the store
//! platform  -> OS contracts (+ SimulatedDevice)
//! permissions, apps, integrity, device
//!           -> stateless probes and resolvers
//! controller, auth, escape_hatch, surface
//!           -> activation state machine and the restricted surface
//! ```
//!
//! The background enforcement loop lives in `kiosklock-service`; it consumes
//! [`settings::KioskPolicyStore`] and the [`platform`] traits from here.

pub mod apps;
pub mod auth;
pub mod controller;
pub mod device;
pub mod escape_hatch;
pub mod integrity;
pub mod permissions;
pub mod platform;
pub mod settings;
pub mod state;
pub mod surface;

pub use apps::{AllowedAppResolver, AppIdentity, PackageId, effective_defaults};
pub use auth::{AdminAuthenticator, AuthError};
pub use controller::{Activation, KioskController, KioskError, LockTaskMode};
pub use escape_hatch::{EscapeHatch, GestureOutcome};
pub use permissions::{PermissionGate, PermissionReport, PermissionStatus};
pub use platform::{Platform, PlatformError};
pub use settings::{KioskPolicy, KioskPolicyStore, SettingsError, SettingsKey, SettingsStore};
pub use state::KioskState;
pub use surface::{KioskSurface, SurfaceError};
