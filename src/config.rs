// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! The embedding process builds one [`SentinelConfig`] at startup (explicitly
//! or via [`SentinelConfig::from_env`]) and threads it into the engines.
//! There is no hidden global state: the HMAC secret in particular lives only
//! in this struct and in the [`crate::security::SecurityEngine`] constructed
//! from it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SENTINEL_HMAC_SECRET` | Shared secret for request signatures | Required |
//! | `SENTINEL_DATA_DIR` | Directory for the embedded ledger database | `/data` |
//! | `SENTINEL_FRESHNESS_SECS` | Max clock skew for signed requests | `120` |
//! | `SENTINEL_NONCE_TTL_SECS` | Replay-cache retention per nonce | `120` |
//! | `SENTINEL_RATE_PER_ACCOUNT` | Requests per minute per account | `20` |
//! | `SENTINEL_RATE_PER_FINGERPRINT` | Requests per minute per device | `10` |
//! | `SENTINEL_RATE_PER_IP` | Requests per minute per source IP | `50` |
//! | `SENTINEL_DEFAULT_CURRENCY` | Currency assumed by the payment parser | `EUR` |
//! | `SENTINEL_DEFAULT_SOURCE` | Fallback source account for payments | `beryl-operating` |
//! | `SENTINEL_DEFAULT_DESTINATION` | Fallback destination account | `beryl-suspense` |

use std::env;
use std::path::PathBuf;

/// Per-minute request ceilings for the fixed-window rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    /// Ceiling per account id.
    pub per_account: u32,
    /// Ceiling per device fingerprint.
    pub per_fingerprint: u32,
    /// Ceiling per source IP.
    pub per_ip: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_account: 20,
            per_fingerprint: 10,
            per_ip: 50,
        }
    }
}

/// Configuration for the Sentinel core, built once at process start.
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Shared HMAC-SHA-256 secret for request signing and validation.
    pub hmac_secret: String,
    /// Directory holding the embedded ledger database file.
    pub data_dir: PathBuf,
    /// Maximum allowed |now - request timestamp| for signed requests, seconds.
    pub freshness_window_secs: i64,
    /// Retention of registered nonces in the replay cache, seconds.
    pub nonce_ttl_secs: i64,
    /// Rate-limiter ceilings.
    pub rate_limits: RateLimits,
    /// Currency assumed when a payment intent does not name one.
    pub default_currency: String,
    /// Source account used when a payment intent does not name one.
    pub default_source_account: String,
    /// Destination account used when a payment intent does not name one.
    pub default_destination_account: String,
}

impl SentinelConfig {
    /// Build a configuration with the given secret and defaults for
    /// everything else.
    pub fn new(hmac_secret: impl Into<String>) -> Self {
        Self {
            hmac_secret: hmac_secret.into(),
            data_dir: PathBuf::from("/data"),
            freshness_window_secs: 120,
            nonce_ttl_secs: 120,
            rate_limits: RateLimits::default(),
            default_currency: "EUR".to_string(),
            default_source_account: "beryl-operating".to_string(),
            default_destination_account: "beryl-suspense".to_string(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Returns `None` when `SENTINEL_HMAC_SECRET` is unset or blank; the
    /// core refuses to run without a signing secret.
    pub fn from_env() -> Option<Self> {
        let secret = env::var("SENTINEL_HMAC_SECRET").ok()?;
        if secret.trim().is_empty() {
            return None;
        }

        let mut config = Self::new(secret);

        if let Ok(dir) = env::var("SENTINEL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = env_i64("SENTINEL_FRESHNESS_SECS") {
            config.freshness_window_secs = secs;
        }
        if let Some(secs) = env_i64("SENTINEL_NONCE_TTL_SECS") {
            config.nonce_ttl_secs = secs;
        }
        if let Some(n) = env_u32("SENTINEL_RATE_PER_ACCOUNT") {
            config.rate_limits.per_account = n;
        }
        if let Some(n) = env_u32("SENTINEL_RATE_PER_FINGERPRINT") {
            config.rate_limits.per_fingerprint = n;
        }
        if let Some(n) = env_u32("SENTINEL_RATE_PER_IP") {
            config.rate_limits.per_ip = n;
        }
        if let Ok(currency) = env::var("SENTINEL_DEFAULT_CURRENCY") {
            config.default_currency = currency;
        }
        if let Ok(account) = env::var("SENTINEL_DEFAULT_SOURCE") {
            config.default_source_account = account;
        }
        if let Ok(account) = env::var("SENTINEL_DEFAULT_DESTINATION") {
            config.default_destination_account = account;
        }

        Some(config)
    }

    /// Path of the embedded ledger database file under `data_dir`.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("sentinel-ledger.redb")
    }
}

fn env_i64(name: &str) -> Option<i64> {
    env::var(name).ok()?.parse().ok()
}

fn env_u32(name: &str) -> Option<u32> {
    env::var(name).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_reference_defaults() {
        let config = SentinelConfig::new("secret");
        assert_eq!(config.freshness_window_secs, 120);
        assert_eq!(config.nonce_ttl_secs, 120);
        assert_eq!(config.rate_limits.per_account, 20);
        assert_eq!(config.rate_limits.per_fingerprint, 10);
        assert_eq!(config.rate_limits.per_ip, 50);
        assert_eq!(config.default_currency, "EUR");
    }

    #[test]
    fn database_path_is_under_data_dir() {
        let mut config = SentinelConfig::new("secret");
        config.data_dir = PathBuf::from("/tmp/sentinel-test");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/sentinel-test/sentinel-ledger.redb")
        );
    }
}
