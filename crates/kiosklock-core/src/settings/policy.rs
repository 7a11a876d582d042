//! Typed kiosk policy over a [`SettingsStore`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::{SettingsError, SettingsKey, SettingsStore};
use crate::apps::{PackageId, effective_defaults};
use crate::state::KioskState;

/// Admin password used until one is set. Weak by construction; the settings
/// surface is expected to replace it.
pub const DEFAULT_ADMIN_PASSWORD: &str = "1234";

/// Kiosk display name used until one is set.
pub const DEFAULT_KIOSK_NAME: &str = "KioskLock";

/// Point-in-time copy of every persisted policy field.
#[derive(Clone, PartialEq, Eq)]
pub struct KioskPolicy {
    /// Kiosk activation state.
    pub state: KioskState,
    /// Admin password (plaintext, as stored).
    pub admin_password: String,
    /// Display name shown on the kiosk surface.
    pub kiosk_name: String,
    /// Whether kiosk mode resumes after boot.
    pub auto_start_enabled: bool,
    /// Packages reachable from the kiosk surface.
    pub allowed_packages: BTreeSet<PackageId>,
    /// Background asset reference, if set.
    pub background_asset: Option<String>,
}

impl fmt::Debug for KioskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KioskPolicy")
            .field("state", &self.state)
            .field("admin_password", &"[REDACTED]")
            .field("kiosk_name", &self.kiosk_name)
            .field("auto_start_enabled", &self.auto_start_enabled)
            .field("allowed_packages", &self.allowed_packages)
            .field("background_asset", &self.background_asset)
            .finish()
    }
}

/// Typed accessors for the kiosk policy with defaults applied.
///
/// Every read goes to the underlying store; nothing is cached, so the
/// controller and the enforcement loop always agree on the current state.
#[derive(Clone)]
pub struct KioskPolicyStore {
    store: Arc<dyn SettingsStore>,
    device_brand: String,
}

impl KioskPolicyStore {
    /// Creates a policy view. `device_brand` selects the default allow list
    /// used before any selection has been persisted.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, device_brand: impl Into<String>) -> Self {
        Self {
            store,
            device_brand: device_brand.into(),
        }
    }

    /// Device brand used for default allow-list selection.
    #[must_use]
    pub fn device_brand(&self) -> &str {
        &self.device_brand
    }

    /// Current kiosk state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn state(&self) -> Result<KioskState, SettingsError> {
        self.store
            .get_bool(SettingsKey::KioskEnabled, false)
            .map(KioskState::from_flag)
    }

    /// Persists the kiosk state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_state(&self, state: KioskState) -> Result<(), SettingsError> {
        debug!(%state, "Persisting kiosk state");
        self.store
            .set_bool(SettingsKey::KioskEnabled, state.as_flag())
    }

    /// Stored admin password, or [`DEFAULT_ADMIN_PASSWORD`] when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn admin_password(&self) -> Result<String, SettingsError> {
        let password = self
            .store
            .get_string(SettingsKey::AdminPassword, DEFAULT_ADMIN_PASSWORD)?;
        if password.is_empty() {
            return Ok(DEFAULT_ADMIN_PASSWORD.to_string());
        }
        Ok(password)
    }

    /// Replaces the admin password.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] for an empty password, or a
    /// storage error.
    pub fn set_admin_password(&self, password: &str) -> Result<(), SettingsError> {
        if password.is_empty() {
            return Err(SettingsError::InvalidValue {
                key: SettingsKey::AdminPassword,
                reason: "password must not be empty",
            });
        }
        self.store.set_string(SettingsKey::AdminPassword, password)?;
        info!("Admin password updated");
        Ok(())
    }

    /// Kiosk display name, or [`DEFAULT_KIOSK_NAME`] when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn kiosk_name(&self) -> Result<String, SettingsError> {
        self.store
            .get_string(SettingsKey::KioskName, DEFAULT_KIOSK_NAME)
    }

    /// Sets the kiosk display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_kiosk_name(&self, name: &str) -> Result<(), SettingsError> {
        self.store.set_string(SettingsKey::KioskName, name)
    }

    /// Whether kiosk mode resumes after boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn auto_start_enabled(&self) -> Result<bool, SettingsError> {
        self.store.get_bool(SettingsKey::AutoStart, false)
    }

    /// Enables or disables resuming kiosk mode after boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_auto_start_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        self.store.set_bool(SettingsKey::AutoStart, enabled)
    }

    /// The allow list. Falls back to the brand defaults only when no
    /// selection has ever been persisted; a persisted empty set stays empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn allowed_apps(&self) -> Result<BTreeSet<PackageId>, SettingsError> {
        let defaults = effective_defaults(&self.device_brand)
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        let stored = self
            .store
            .get_string_set(SettingsKey::AllowedApps, defaults)?;
        Ok(stored.into_iter().map(PackageId::from).collect())
    }

    /// Replaces the allow list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_allowed_apps(&self, packages: &BTreeSet<PackageId>) -> Result<(), SettingsError> {
        let raw = packages.iter().map(|id| id.as_str().to_string()).collect();
        self.store.set_string_set(SettingsKey::AllowedApps, raw)?;
        info!(count = packages.len(), "Allowed app selection updated");
        Ok(())
    }

    /// Background asset reference. An empty stored value reads as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn background_asset(&self) -> Result<Option<String>, SettingsError> {
        Ok(self
            .store
            .get_optional_string(SettingsKey::BackgroundAssetPath)?
            .filter(|path| !path.is_empty()))
    }

    /// Sets or clears the background asset reference. Clearing stores an
    /// empty string; keys are never deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_background_asset(&self, asset: Option<&str>) -> Result<(), SettingsError> {
        self.store
            .set_string(SettingsKey::BackgroundAssetPath, asset.unwrap_or_default())
    }

    /// Reads every field. Fields are read independently, not as a
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub fn snapshot(&self) -> Result<KioskPolicy, SettingsError> {
        Ok(KioskPolicy {
            state: self.state()?,
            admin_password: self.admin_password()?,
            kiosk_name: self.kiosk_name()?,
            auto_start_enabled: self.auto_start_enabled()?,
            allowed_packages: self.allowed_apps()?,
            background_asset: self.background_asset()?,
        })
    }
}

impl fmt::Debug for KioskPolicyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KioskPolicyStore")
            .field("device_brand", &self.device_brand)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::InMemorySettingsStore;

    fn policy(brand: &str) -> KioskPolicyStore {
        KioskPolicyStore::new(Arc::new(InMemorySettingsStore::new()), brand)
    }

    #[test]
    fn test_first_read_defaults() {
        let policy = policy("nokia");
        let snapshot = policy.snapshot().unwrap();

        assert_eq!(snapshot.state, KioskState::Inactive);
        assert_eq!(snapshot.admin_password, DEFAULT_ADMIN_PASSWORD);
        assert_eq!(snapshot.kiosk_name, DEFAULT_KIOSK_NAME);
        assert!(!snapshot.auto_start_enabled);
        assert_eq!(snapshot.allowed_packages, effective_defaults("nokia"));
        assert_eq!(snapshot.background_asset, None);
    }

    #[test]
    fn test_allowed_apps_persisted_set_wins_even_if_empty() {
        let policy = policy("xiaomi");
        assert_eq!(policy.allowed_apps().unwrap(), effective_defaults("xiaomi"));

        policy.set_allowed_apps(&BTreeSet::new()).unwrap();
        assert!(policy.allowed_apps().unwrap().is_empty());

        let selection: BTreeSet<PackageId> = [PackageId::from("com.example.pos")].into();
        policy.set_allowed_apps(&selection).unwrap();
        assert_eq!(policy.allowed_apps().unwrap(), selection);
    }

    #[test]
    fn test_empty_password_rejected_and_never_read() {
        let store = Arc::new(InMemorySettingsStore::new());
        let policy = KioskPolicyStore::new(store.clone(), "samsung");

        let err = policy.set_admin_password("").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));

        // A blank value written by another writer still reads as the default.
        store.set_string(SettingsKey::AdminPassword, "").unwrap();
        assert_eq!(policy.admin_password().unwrap(), DEFAULT_ADMIN_PASSWORD);
    }

    #[test]
    fn test_background_asset_clear() {
        let policy = policy("vivo");
        policy.set_background_asset(Some("bg/lake.jpg")).unwrap();
        assert_eq!(
            policy.background_asset().unwrap().as_deref(),
            Some("bg/lake.jpg")
        );

        policy.set_background_asset(None).unwrap();
        assert_eq!(policy.background_asset().unwrap(), None);
    }

    #[test]
    fn test_state_round_trips_through_flag() {
        let store = Arc::new(InMemorySettingsStore::new());
        let policy = KioskPolicyStore::new(store.clone(), "oppo");

        policy.set_state(KioskState::Active).unwrap();
        assert!(store.get_bool(SettingsKey::KioskEnabled, false).unwrap());
        assert_eq!(policy.state().unwrap(), KioskState::Active);
    }

    #[test]
    fn test_debug_redacts_password() {
        let snapshot = policy("nokia").snapshot().unwrap();
        let rendered = format!("{snapshot:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains(DEFAULT_ADMIN_PASSWORD));
    }
}
