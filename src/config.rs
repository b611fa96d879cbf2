//! Service Configuration
//!
//! All settings come from environment variables; secrets are never hardcoded.
//!
//! - `DRS_NOTIFY_SIGNING_SECRET` (required): shared secret for envelope HMAC signatures
//! - `DRS_NOTIFY_BIND` (optional): listen address (default: `127.0.0.1:3002`)
//! - `DRS_NOTIFY_CONFIRM_TIMEOUT_SECS` (optional): timeout of the subscription
//!   confirmation request (default: 10)
//! - `DRS_NOTIFY_TRUSTED_CERT_HOST_SUFFIX` (optional): when set, envelopes must name a
//!   signing certificate served over https from a host with this suffix

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:3002";

/// Default confirmation timeout in seconds
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 10;

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Missing signing secret
    #[error("DRS_NOTIFY_SIGNING_SECRET environment variable not set")]
    MissingSecret,

    /// Invalid bind address
    #[error("Invalid bind address: {0}")]
    InvalidBind(String),

    /// Invalid timeout
    #[error("Invalid confirmation timeout: {0}")]
    InvalidTimeout(String),
}

/// Runtime configuration for the notification service
#[derive(Clone)]
pub struct NotifyConfig {
    /// Shared secret for [`HmacVerifier`](crate::sns::HmacVerifier); never logged
    pub signing_secret: String,

    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,

    /// Timeout applied to the subscription confirmation request
    pub confirm_timeout: Duration,

    /// Trusted signing-certificate host suffix, if the guard is enabled
    pub trusted_cert_host_suffix: Option<String>,
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("signing_secret", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("trusted_cert_host_suffix", &self.trusted_cert_host_suffix)
            .finish()
    }
}

impl NotifyConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` if `DRS_NOTIFY_SIGNING_SECRET` is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_secret = lookup("DRS_NOTIFY_SIGNING_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        if signing_secret.len() < 32 {
            warn!("SECURITY WARNING: DRS_NOTIFY_SIGNING_SECRET is less than 32 characters");
        }

        let bind_addr = lookup("DRS_NOTIFY_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidBind(e.to_string()))?;

        let timeout_secs = match lookup("DRS_NOTIFY_CONFIRM_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidTimeout(e.to_string()))?,
            None => DEFAULT_CONFIRM_TIMEOUT_SECS,
        };

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(
                "Timeout cannot be 0".to_string(),
            ));
        }

        let trusted_cert_host_suffix =
            lookup("DRS_NOTIFY_TRUSTED_CERT_HOST_SUFFIX").filter(|s| !s.is_empty());

        match &trusted_cert_host_suffix {
            Some(suffix) => info!("Signing certificate hosts restricted to *{}", suffix),
            None => info!("Signing certificate host guard disabled"),
        }

        Ok(Self {
            signing_secret,
            bind_addr,
            confirm_timeout: Duration::from_secs(timeout_secs),
            trusted_cert_host_suffix,
        })
    }

    /// Create a test configuration (for testing only)
    pub fn test_config() -> Self {
        Self {
            signing_secret: "test-secret-for-unit-tests-only".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            confirm_timeout: Duration::from_secs(1),
            trusted_cert_host_suffix: None,
        }
    }

    /// HTTP client for subscription confirmation
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.confirm_timeout)
            .build()
    }
}
