//! Allowed-app policy.
//!
//! Computes the brand-aware default allow list and resolves package ids to
//! display identities through the OS package catalog.
//!
//! Uninstalled packages are pruned only here, at resolution time. They stay
//! in the persisted allow list until an admin edits the selection.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::platform::{PackageCatalog, PlatformError};

/// An Android application package name, e.g. `com.android.settings`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Creates a package id from its string form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the package name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, as the OS resolver reports package names.
    #[must_use]
    pub fn eq_ignore_case(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PackageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque reference to an app icon owned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconHandle(String);

impl IconHandle {
    /// Wraps a platform icon reference.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the platform reference.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.0
    }
}

/// A launchable application as reported by the package catalog.
///
/// Identity is `(package_id, display_name)`. `is_system_app` and `icon` can
/// change between catalog reads without affecting set membership.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    /// Package name.
    pub package_id: PackageId,
    /// User-visible label.
    pub display_name: String,
    /// Whether the package is part of the system image.
    pub is_system_app: bool,
    /// Icon handle, if the catalog supplied one.
    pub icon: Option<IconHandle>,
}

impl AppIdentity {
    /// Creates a user app identity without an icon.
    #[must_use]
    pub fn new(package_id: impl Into<PackageId>, display_name: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            display_name: display_name.into(),
            is_system_app: false,
            icon: None,
        }
    }

    /// Marks the identity as a system app.
    #[must_use]
    pub const fn system(mut self) -> Self {
        self.is_system_app = true;
        self
    }

    /// Attaches an icon handle.
    #[must_use]
    pub fn with_icon(mut self, icon: IconHandle) -> Self {
        self.icon = Some(icon);
        self
    }
}

impl PartialEq for AppIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.package_id == other.package_id && self.display_name == other.display_name
    }
}

impl Eq for AppIdentity {}

impl Hash for AppIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.package_id.hash(state);
        self.display_name.hash(state);
    }
}

// =============================================================================
// Brand defaults
// =============================================================================

/// Packages allowed on every device regardless of brand.
pub const UNIVERSAL_PACKAGES: &[&str] = &[
    "com.android.settings",
    "com.android.contacts",
    "com.android.dialer",
    "com.android.browser",
    "com.android.gallery3d",
    "com.android.camera",
    "com.google.android.apps.chrome",
    "com.google.android.apps.maps",
    "com.android.documentsui",
];

/// A family of device brands sharing a vendor app set.
#[derive(Debug, Clone, Copy)]
pub struct BrandFamily {
    /// Family name used in logs.
    pub name: &'static str,
    /// Lowercase substrings that identify the family in the device brand.
    pub markers: &'static [&'static str],
    /// Vendor packages added on top of [`UNIVERSAL_PACKAGES`].
    pub packages: &'static [&'static str],
}

/// Known brand families, matched in order; the first match wins.
pub const BRAND_FAMILIES: &[BrandFamily] = &[
    BrandFamily {
        name: "samsung",
        markers: &["samsung"],
        packages: &[
            "com.sec.android.app.camera",
            "com.sec.android.gallery3d",
            "com.samsung.android.contacts",
            "com.samsung.android.dialer",
            "com.samsung.android.messaging",
            "com.sec.android.app.sbrowser",
            "com.sec.android.app.myfiles",
        ],
    },
    BrandFamily {
        name: "xiaomi",
        markers: &["xiaomi", "redmi", "poco"],
        packages: &[
            "com.miui.camera",
            "com.miui.gallery",
            "com.miui.contacts",
            "com.miui.dialer",
            "com.miui.mms",
            "com.mi.android.globalFileexplorer",
        ],
    },
    BrandFamily {
        name: "huawei",
        markers: &["huawei", "honor"],
        packages: &[
            "com.huawei.camera",
            "com.huawei.photos",
            "com.huawei.contacts",
            "com.huawei.mms",
            "com.huawei.hidisk",
        ],
    },
    BrandFamily {
        name: "oppo",
        markers: &["oppo", "realme"],
        packages: &[
            "com.oppo.camera",
            "com.coloros.gallery3d",
            "com.coloros.contacts",
            "com.coloros.filemanager",
        ],
    },
    BrandFamily {
        name: "vivo",
        markers: &["vivo"],
        packages: &[
            "com.vivo.camera",
            "com.vivo.gallery",
            "com.vivo.contacts",
            "com.vivo.dialer",
            "com.vivo.filemanager",
        ],
    },
    BrandFamily {
        name: "google",
        markers: &["google", "pixel"],
        packages: &[
            "com.google.android.GoogleCamera",
            "com.google.android.contacts",
            "com.google.android.dialer",
            "com.google.android.apps.photos",
            "com.google.android.apps.messaging",
            "com.google.android.apps.maps",
            "com.google.android.apps.chrome",
        ],
    },
];

/// Returns the brand family matching `brand`, if any.
#[must_use]
pub fn brand_family(brand: &str) -> Option<&'static BrandFamily> {
    let brand = brand.to_lowercase();
    BRAND_FAMILIES
        .iter()
        .find(|family| family.markers.iter().any(|marker| brand.contains(marker)))
}

/// Default allow list for a device brand: the universal set plus the
/// matching brand family's packages.
#[must_use]
pub fn effective_defaults(brand: &str) -> BTreeSet<PackageId> {
    let mut packages: BTreeSet<PackageId> =
        UNIVERSAL_PACKAGES.iter().copied().map(PackageId::from).collect();

    if let Some(family) = brand_family(brand) {
        packages.extend(family.packages.iter().copied().map(PackageId::from));
    }

    packages
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves package ids against the OS package catalog.
#[derive(Clone)]
pub struct AllowedAppResolver {
    catalog: Arc<dyn PackageCatalog>,
}

impl AllowedAppResolver {
    /// Creates a resolver over the given catalog.
    #[must_use]
    pub fn new(catalog: Arc<dyn PackageCatalog>) -> Self {
        Self { catalog }
    }

    /// Maps each id to its [`AppIdentity`], sorted by display name.
    ///
    /// Ids the catalog cannot resolve (uninstalled apps) are dropped.
    pub fn resolve_identities<'a, I>(&self, package_ids: I) -> Vec<AppIdentity>
    where
        I: IntoIterator<Item = &'a PackageId>,
    {
        let mut apps: Vec<AppIdentity> = package_ids
            .into_iter()
            .filter_map(|id| match self.catalog.resolve(id) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    debug!(package = %id, error = %e, "Skipping unresolvable allowed package");
                    None
                },
            })
            .collect();

        apps.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        apps
    }

    /// Lists every launchable app, sorted case-insensitively by display name.
    ///
    /// # Errors
    ///
    /// Returns the catalog's error if enumeration fails.
    pub fn launchable_apps(&self) -> Result<Vec<AppIdentity>, PlatformError> {
        let mut apps = self.catalog.launchable_apps()?;
        apps.sort_by_cached_key(|app| app.display_name.to_lowercase());
        Ok(apps)
    }
}

impl fmt::Debug for AllowedAppResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedAppResolver").finish_non_exhaustive()
    }
}
