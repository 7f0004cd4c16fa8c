// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Security Module
//!
//! Authentication for inbound requests, checked before any ledger operation
//! runs:
//!
//! - [`SecurityEngine`] — HMAC-SHA-256 signatures over
//!   `payload::timestamp::nonce::device_id`, plus a freshness window
//! - [`nonce`] — single-use token store rejecting replays within a TTL
//! - [`rate_limit`] — fixed one-minute window counters per account, device
//!   fingerprint, and source IP
//!
//! The scheme is symmetric (shared secret): it proves the sender holds the
//! secret and the payload was not tampered with or significantly delayed.
//! Replay inside the freshness window is the nonce store's job, volume is
//! the rate limiter's. All three fail closed.

pub mod nonce;
pub mod rate_limit;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SentinelConfig;

pub use nonce::{InMemoryNonceStore, NonceStore};
pub use rate_limit::{InMemoryRateLimiter, RateLimitStore};

type HmacSha256 = Hmac<Sha256>;

/// Delimiter joining the signed fields.
const SIGNATURE_DELIMITER: &str = "::";

/// Computes and validates request signatures with a server-held secret.
pub struct SecurityEngine {
    secret: Vec<u8>,
    freshness_window_secs: i64,
}

impl SecurityEngine {
    pub fn new(config: &SentinelConfig) -> Self {
        Self {
            secret: config.hmac_secret.as_bytes().to_vec(),
            freshness_window_secs: config.freshness_window_secs,
        }
    }

    /// Deterministic HMAC-SHA-256 over
    /// `payload::timestamp::nonce::device_id`, lowercase hex.
    pub fn sign(&self, payload: &str, timestamp: i64, nonce: &str, device_id: &str) -> String {
        let message = [
            payload,
            &timestamp.to_string(),
            nonce,
            device_id,
        ]
        .join(SIGNATURE_DELIMITER);

        // HMAC accepts keys of any length; new_from_slice cannot fail here.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Validate a signed request against the current clock.
    ///
    /// Requires the recomputed signature to match bitwise, a non-blank
    /// device id, and `|now - timestamp| <=` the freshness window. Any
    /// violation yields `false`.
    pub fn validate(
        &self,
        payload: &str,
        timestamp: i64,
        nonce: &str,
        device_id: &str,
        signature: &str,
    ) -> bool {
        self.validate_at(payload, timestamp, nonce, device_id, signature, Utc::now().timestamp())
    }

    /// Validation against an explicit clock; `validate` with `now` injected.
    pub fn validate_at(
        &self,
        payload: &str,
        timestamp: i64,
        nonce: &str,
        device_id: &str,
        signature: &str,
        now: i64,
    ) -> bool {
        if device_id.trim().is_empty() {
            return false;
        }
        if (now - timestamp).abs() > self.freshness_window_secs {
            return false;
        }

        let expected = self.sign(payload, timestamp, nonce, device_id);
        expected == signature
    }
}
