//! Admin authentication.
//!
//! The admin password is stored and compared in plaintext. Comparison is
//! constant-time over the bytes; there is no lockout, the escape-hatch
//! gesture is the only throttle in front of the prompt.

use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};

use crate::settings::{KioskPolicyStore, SettingsError};

/// Errors from admin authentication.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The supplied password does not match.
    #[error("incorrect password")]
    AuthenticationFailed,

    /// A new password must not be empty.
    #[error("password must not be empty")]
    EmptyPassword,

    /// The stored password could not be read or written.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Validates and changes the admin password.
#[derive(Debug, Clone)]
pub struct AdminAuthenticator {
    policy: KioskPolicyStore,
}

impl AdminAuthenticator {
    /// Creates an authenticator over the kiosk policy.
    #[must_use]
    pub const fn new(policy: KioskPolicyStore) -> Self {
        Self { policy }
    }

    /// Returns true iff `candidate` equals the stored password exactly.
    /// A store read failure counts as a mismatch.
    #[must_use]
    pub fn validate(&self, candidate: &str) -> bool {
        match self.policy.admin_password() {
            Ok(stored) => passwords_match(candidate, &stored),
            Err(e) => {
                warn!(error = %e, "Could not read admin password; rejecting attempt");
                false
            },
        }
    }

    /// Like [`validate`](Self::validate) but reports why.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthenticationFailed`] on mismatch
    /// - [`AuthError::Settings`] if the stored password cannot be read
    pub fn verify(&self, candidate: &str) -> Result<(), AuthError> {
        let stored = self.policy.admin_password()?;
        if passwords_match(candidate, &stored) {
            Ok(())
        } else {
            info!("Admin password rejected");
            Err(AuthError::AuthenticationFailed)
        }
    }

    /// Replaces the stored password. Takes effect for the next validation.
    ///
    /// # Errors
    ///
    /// - [`AuthError::EmptyPassword`] if `new_password` is empty
    /// - [`AuthError::Settings`] if the password cannot be stored
    pub fn change_password(&self, new_password: &str) -> Result<(), AuthError> {
        if new_password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        self.policy.set_admin_password(new_password)?;
        Ok(())
    }
}

fn passwords_match(candidate: &str, stored: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(stored.as_bytes()))
}
