//! Kiosk activation state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two stable states of the kiosk controller.
///
/// The state is persisted as the `kiosk_enabled` flag and read back on every
/// query, so there is no in-memory copy that could drift from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KioskState {
    /// Kiosk mode is off; the device is unrestricted.
    #[default]
    Inactive,
    /// Kiosk mode is on; enforcement must run.
    Active,
}

impl KioskState {
    /// Decodes the persisted flag.
    #[must_use]
    pub const fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    /// Encodes the state as the persisted flag.
    #[must_use]
    pub const fn as_flag(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns true for [`KioskState::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.as_flag()
    }
}

impl fmt::Display for KioskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => f.write_str("inactive"),
            Self::Active => f.write_str("active"),
        }
    }
}
