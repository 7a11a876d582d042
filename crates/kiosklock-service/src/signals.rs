//! OS broadcast signals the service reacts to.

use std::fmt;

use kiosklock_core::PackageId;

/// Boot completed.
pub const ACTION_BOOT_COMPLETED: &str = "android.intent.action.BOOT_COMPLETED";
/// Vendor fast-boot variant of boot completed.
pub const ACTION_QUICKBOOT_POWERON: &str = "android.intent.action.QUICKBOOT_POWERON";
/// A package was installed.
pub const ACTION_PACKAGE_ADDED: &str = "android.intent.action.PACKAGE_ADDED";
/// A package was uninstalled.
pub const ACTION_PACKAGE_REMOVED: &str = "android.intent.action.PACKAGE_REMOVED";
/// A package was updated in place.
pub const ACTION_PACKAGE_REPLACED: &str = "android.intent.action.PACKAGE_REPLACED";

/// A system signal delivered to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemSignal {
    /// Device finished booting.
    BootCompleted,
    /// Device finished a vendor quick boot.
    QuickBootPowerOn,
    /// A package was installed.
    PackageAdded(PackageId),
    /// A package was uninstalled.
    PackageRemoved(PackageId),
    /// A package was updated.
    PackageReplaced(PackageId),
}

impl SystemSignal {
    /// Maps a broadcast action to a signal. Package actions need the
    /// package from the broadcast data; without one they map to `None`, as do
    /// unknown actions.
    #[must_use]
    pub fn from_action(action: &str, package: Option<PackageId>) -> Option<Self> {
        match action {
            ACTION_BOOT_COMPLETED => Some(Self::BootCompleted),
            ACTION_QUICKBOOT_POWERON => Some(Self::QuickBootPowerOn),
            ACTION_PACKAGE_ADDED => package.map(Self::PackageAdded),
            ACTION_PACKAGE_REMOVED => package.map(Self::PackageRemoved),
            ACTION_PACKAGE_REPLACED => package.map(Self::PackageReplaced),
            _ => None,
        }
    }

    /// Whether this is one of the boot signals.
    #[must_use]
    pub const fn is_boot(&self) -> bool {
        matches!(self, Self::BootCompleted | Self::QuickBootPowerOn)
    }

    /// Package the signal refers to, if any.
    #[must_use]
    pub const fn package(&self) -> Option<&PackageId> {
        match self {
            Self::PackageAdded(p) | Self::PackageRemoved(p) | Self::PackageReplaced(p) => Some(p),
            Self::BootCompleted | Self::QuickBootPowerOn => None,
        }
    }
}

impl fmt::Display for SystemSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BootCompleted => f.write_str("boot_completed"),
            Self::QuickBootPowerOn => f.write_str("quickboot_poweron"),
            Self::PackageAdded(p) => write!(f, "package_added({p})"),
            Self::PackageRemoved(p) => write!(f, "package_removed({p})"),
            Self::PackageReplaced(p) => write!(f, "package_replaced({p})"),
        }
    }
}
