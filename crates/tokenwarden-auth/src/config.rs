//! Authentication and session configuration.
//!
//! Controls the token issuer, session lifetimes and the signing secret.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound accepted for the session lifetime and the renewal extension.
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "tokenwarden"
///
/// [auth.session]
/// token_lifetime = "1h"
/// renewal_extension = "1h"
///
/// [auth.signing]
/// secret = "change-me"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer written into the `iss` claim and required on validation.
    pub issuer: String,

    /// Session lifetime configuration.
    pub session: SessionConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "tokenwarden".to_string(),
            session: SessionConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer is empty or a lifetime is zero or
    /// longer than [`MAX_SESSION_DURATION`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::invalid("auth.issuer must not be empty"));
        }
        if self.session.token_lifetime.is_zero() {
            return Err(ConfigError::invalid(
                "auth.session.token_lifetime must be greater than zero",
            ));
        }
        if self.session.renewal_extension.is_zero() {
            return Err(ConfigError::invalid(
                "auth.session.renewal_extension must be greater than zero",
            ));
        }
        if self.session.token_lifetime > MAX_SESSION_DURATION {
            return Err(ConfigError::invalid(
                "auth.session.token_lifetime must not exceed 365 days",
            ));
        }
        if self.session.renewal_extension > MAX_SESSION_DURATION {
            return Err(ConfigError::invalid(
                "auth.session.renewal_extension must not exceed 365 days",
            ));
        }
        Ok(())
    }
}

/// Session lifetime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of a freshly issued session.
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Amount added to the stored expiry on each renewal.
    /// Renewal extends from the previous expiry, not from the current time.
    #[serde(with = "humantime_serde")]
    pub renewal_extension: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(3600),    // 1 hour
            renewal_extension: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Token signing configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared HS256 secret.
    /// When empty, a random secret is generated at startup and tokens do not
    /// survive a restart.
    pub secret: String,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secret = if self.secret.is_empty() {
            "<generated>"
        } else {
            "[REDACTED]"
        };
        f.debug_struct("SigningConfig")
            .field("secret", &secret)
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of the invalid value.
        message: String,
    },
}

impl ConfigError {
    /// Creates a new `Invalid` error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
