//! Runtime settings loaded via OrthoConfig.
//!
//! [`ServerSettings`] (prefix `STOREFRONT_`) controls the listener and the
//! session cookie. [`PolicySettings`] (prefix `STOREFRONT_POLICY_`) carries
//! the business-rule knobs and converts them into the domain policy types.
//! Unset values fall back to the accessor defaults below.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use actix_web::cookie::Key;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;
use zeroize::Zeroize;

use crate::domain::{
    LoyaltyPolicy, LoyaltyPolicyError, LoyaltyTier, ReturnPolicy, ReviewPolicy,
    SubscriptionPolicy, TierTable,
};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const SESSION_KEY_MIN_LEN: usize = 32;
const RELEASE_SESSION_KEY_MIN_LEN: usize = 64;

/// Build mode used when validating session settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds fall back to an ephemeral session key.
    Debug,
    /// Release builds require a readable, long key file.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    /// ```
    /// use storefront::config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub const fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Errors raised while turning settings into runtime values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Host and port do not resolve to a socket address.
    #[error("invalid bind address {host}:{port}")]
    BindAddress {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Reading the session key file failed.
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        /// Key file location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The session key file is shorter than the build mode allows.
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        /// Key file location.
        path: PathBuf,
        /// Bytes read.
        length: usize,
        /// Bytes required.
        min_len: usize,
    },
    /// Loyalty settings do not form a valid policy.
    #[error("invalid loyalty policy: {0}")]
    Loyalty(#[from] LoyaltyPolicyError),
}

/// Listener and session cookie settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STOREFRONT")]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: Option<String>,
    /// Port to bind.
    pub port: Option<u16>,
    /// File holding the session signing key.
    pub session_key_file: Option<PathBuf>,
    /// Use a random session key when the key file cannot be read.
    #[ortho_config(default = false)]
    pub allow_ephemeral_session_key: bool,
    /// Drop the `Secure` attribute from session cookies for local HTTP.
    #[ortho_config(default = false)]
    pub insecure_cookies: bool,
}

impl ServerSettings {
    /// Configured host, defaulting to all interfaces.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Configured port, defaulting to 8080.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Configured session key location.
    pub fn session_key_file(&self) -> &Path {
        self.session_key_file
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_SESSION_KEY_FILE))
    }

    /// Whether session cookies carry the `Secure` attribute.
    pub const fn cookie_secure(&self) -> bool {
        !self.insecure_cookies
    }

    /// Resolve the configured host and port.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.host();
        let port = self.port();
        (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::BindAddress {
                host: host.to_owned(),
                port,
            })
    }

    /// Load the session signing key.
    ///
    /// Debug builds, and release builds with
    /// `allow_ephemeral_session_key` set, fall back to a random key when the
    /// file is unreadable. A key file that exists but is too short is always
    /// an error.
    pub fn session_key(&self, mode: BuildMode) -> Result<Key, ConfigError> {
        let path = self.session_key_file();
        match std::fs::read(path) {
            Ok(mut bytes) => {
                let length = bytes.len();
                let min_len = match mode {
                    BuildMode::Debug => SESSION_KEY_MIN_LEN,
                    BuildMode::Release => RELEASE_SESSION_KEY_MIN_LEN,
                };
                if length < min_len {
                    bytes.zeroize();
                    return Err(ConfigError::KeyTooShort {
                        path: path.to_path_buf(),
                        length,
                        min_len,
                    });
                }
                let key = Key::derive_from(&bytes);
                bytes.zeroize();
                Ok(key)
            }
            Err(error) => {
                if mode == BuildMode::Debug || self.allow_ephemeral_session_key {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "using temporary session key (dev only)"
                    );
                    Ok(Key::generate())
                } else {
                    Err(ConfigError::KeyRead {
                        path: path.to_path_buf(),
                        source: error,
                    })
                }
            }
        }
    }
}

/// Business-rule settings shared by every organization.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STOREFRONT_POLICY")]
pub struct PolicySettings {
    /// Lifetime points needed for silver.
    pub silver_threshold: Option<u64>,
    /// Lifetime points needed for gold.
    pub gold_threshold: Option<u64>,
    /// Lifetime points needed for platinum.
    pub platinum_threshold: Option<u64>,
    /// Points earned per whole currency unit.
    pub points_per_currency_unit: Option<u64>,
    /// Discount value of one point in minor units.
    pub minor_units_per_point: Option<u64>,
    /// Days after fulfilment a return may be filed.
    pub return_window_days: Option<u32>,
    /// Fee withheld from change-of-mind returns, in basis points.
    pub restocking_fee_bps: Option<u32>,
    /// Failed payments that cancel a subscription.
    pub max_failed_payments: Option<u32>,
    /// Publish reviews from verified buyers without moderation.
    #[ortho_config(default = false)]
    pub auto_approve_verified_reviews: bool,
}

impl PolicySettings {
    /// Loyalty rules with any configured overrides applied.
    pub fn loyalty_policy(&self) -> Result<LoyaltyPolicy, ConfigError> {
        let defaults = LoyaltyPolicy::default();
        let policy = LoyaltyPolicy::new(
            TierTable {
                bronze: 0,
                silver: self
                    .silver_threshold
                    .unwrap_or(defaults.threshold(LoyaltyTier::Silver)),
                gold: self
                    .gold_threshold
                    .unwrap_or(defaults.threshold(LoyaltyTier::Gold)),
                platinum: self
                    .platinum_threshold
                    .unwrap_or(defaults.threshold(LoyaltyTier::Platinum)),
            },
            defaults.multipliers(),
        )?;
        let policy = match self.points_per_currency_unit {
            Some(points) => {
                policy.with_earn_rate(points, defaults.minor_units_per_currency_unit())?
            }
            None => policy,
        };
        let policy = match self.minor_units_per_point {
            Some(value) => policy.with_point_value(value)?,
            None => policy,
        };
        Ok(policy)
    }

    /// Return rules with any configured overrides applied.
    pub fn return_policy(&self) -> ReturnPolicy {
        let defaults = ReturnPolicy::default();
        ReturnPolicy {
            return_window_days: self
                .return_window_days
                .unwrap_or(defaults.return_window_days),
            restocking_fee_bps: self
                .restocking_fee_bps
                .unwrap_or(defaults.restocking_fee_bps),
        }
    }

    /// Dunning rules with any configured overrides applied.
    pub fn subscription_policy(&self) -> SubscriptionPolicy {
        let defaults = SubscriptionPolicy::default();
        match self.max_failed_payments {
            Some(max) => SubscriptionPolicy::new(defaults.retry_schedule_days().to_vec(), max),
            None => defaults,
        }
    }

    /// Review moderation rules.
    pub const fn review_policy(&self) -> ReviewPolicy {
        ReviewPolicy {
            auto_approve_verified: self.auto_approve_verified_reviews,
        }
    }
}
