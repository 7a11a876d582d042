//! The restricted surface.
//!
//! [`KioskSurface`] is the control-plane side of the kiosk screen: it owns
//! the escape-hatch gesture, gates exit behind the admin password and only
//! launches packages from the allow list. Rendering is left to the host.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::apps::{AllowedAppResolver, AppIdentity, PackageId};
use crate::auth::{AdminAuthenticator, AuthError};
use crate::controller::{KioskController, KioskError};
use crate::escape_hatch::{EscapeHatch, GestureOutcome};
use crate::platform::{PlatformError, SurfaceLauncher};
use crate::settings::SettingsError;

/// Errors surfaced to the kiosk screen.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SurfaceError {
    /// The package is not on the allow list.
    #[error("package {package} is not allowed in kiosk mode")]
    NotAllowed {
        /// Rejected package.
        package: PackageId,
    },

    /// Password check failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Deactivation failed.
    #[error(transparent)]
    Kiosk(#[from] KioskError),

    /// The platform refused the request.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The policy could not be read.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// What a back press did on the kiosk screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackPressOutcome {
    /// Swallowed; navigation stays on the kiosk screen.
    Ignored,
    /// Show the admin-password prompt.
    PromptRequested,
}

/// Control-plane state of the kiosk screen.
pub struct KioskSurface {
    controller: KioskController,
    auth: AdminAuthenticator,
    resolver: AllowedAppResolver,
    launcher: Arc<dyn SurfaceLauncher>,
    hatch: EscapeHatch,
}

impl KioskSurface {
    /// Creates the surface.
    #[must_use]
    pub fn new(
        controller: KioskController,
        resolver: AllowedAppResolver,
        launcher: Arc<dyn SurfaceLauncher>,
    ) -> Self {
        let auth = AdminAuthenticator::new(controller.policy().clone());
        Self {
            controller,
            auth,
            resolver,
            launcher,
            hatch: EscapeHatch::new(),
        }
    }

    /// Handles a back press at `now_ms`. Back navigation itself is always
    /// swallowed.
    pub fn on_back_pressed(&mut self, now_ms: i64) -> BackPressOutcome {
        match self.hatch.press(now_ms) {
            GestureOutcome::PromptRequested => {
                info!("Escape gesture completed; showing admin prompt");
                BackPressOutcome::PromptRequested
            },
            GestureOutcome::Counting { .. } => BackPressOutcome::Ignored,
        }
    }

    /// Handles a back press stamped with the wall clock.
    pub fn on_back_pressed_now(&mut self) -> BackPressOutcome {
        self.on_back_pressed(chrono::Utc::now().timestamp_millis())
    }

    /// Exits kiosk mode if `password` matches the admin password.
    ///
    /// # Errors
    ///
    /// - [`SurfaceError::Auth`] with `AuthenticationFailed` on mismatch
    /// - [`SurfaceError::Kiosk`] if deactivation fails
    pub fn submit_exit_password(&self, password: &str) -> Result<(), SurfaceError> {
        self.auth.verify(password)?;
        self.controller.deactivate()?;
        Ok(())
    }

    /// Allowed apps that are still installed, sorted by display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the allow list cannot be read.
    pub fn allowed_apps(&self) -> Result<Vec<AppIdentity>, SurfaceError> {
        let allowed = self.controller.policy().allowed_apps()?;
        Ok(self.resolver.resolve_identities(&allowed))
    }

    /// Launches an allowed app.
    ///
    /// # Errors
    ///
    /// - [`SurfaceError::NotAllowed`] if `package` is not on the allow list
    /// - [`SurfaceError::Platform`] if the app has no launch entry
    pub fn launch_app(&self, package: &PackageId) -> Result<(), SurfaceError> {
        let allowed = self.controller.policy().allowed_apps()?;
        if !allowed.contains(package) {
            warn!(%package, "Refusing to launch package outside the allow list");
            return Err(SurfaceError::NotAllowed {
                package: package.clone(),
            });
        }

        self.launcher.launch_app(package)?;
        info!(%package, "Launched allowed app");
        Ok(())
    }

    /// Kiosk display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy cannot be read.
    pub fn display_name(&self) -> Result<String, SurfaceError> {
        Ok(self.controller.policy().kiosk_name()?)
    }

    /// Background asset reference, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy cannot be read.
    pub fn background_asset(&self) -> Result<Option<String>, SurfaceError> {
        Ok(self.controller.policy().background_asset()?)
    }
}

impl fmt::Debug for KioskSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KioskSurface")
            .field("controller", &self.controller)
            .field("hatch", &self.hatch)
            .finish_non_exhaustive()
    }
}
