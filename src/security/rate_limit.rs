// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-window rate limiting.
//!
//! Three independent per-minute counters per request: by account id, by
//! device fingerprint, by source IP, each with its own ceiling. A counter
//! resets (count = 1, new window) the first time it is touched after its
//! window has elapsed. This is a fixed-window limiter, not a leaky bucket:
//! bursts at window boundaries are accepted, and that behavior is part of
//! the contract.
//!
//! The in-memory implementation is single-process; a horizontally scaled
//! deployment would substitute a shared store behind [`RateLimitStore`].

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::RateLimits;

/// Window length for all counters.
const WINDOW_SECS: i64 = 60;

/// Admission decision over the three per-request keys.
pub trait RateLimitStore: Send + Sync {
    /// Increment all three counters and return `true` only if every one of
    /// them is still within its ceiling after incrementing.
    fn allow(&self, account_id: &str, fingerprint: &str, ip: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Concurrent in-memory fixed-window limiter.
pub struct InMemoryRateLimiter {
    windows: DashMap<String, Window>,
    limits: RateLimits,
}

impl InMemoryRateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            windows: DashMap::new(),
            limits,
        }
    }

    /// `allow` against an explicit clock.
    pub fn allow_at(
        &self,
        account_id: &str,
        fingerprint: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> bool {
        // Maintenance sweep: drop every window past expiry so the map does
        // not grow with the number of distinct keys ever seen.
        self.windows
            .retain(|_, window| now - window.started_at < Duration::seconds(WINDOW_SECS));

        // All three counters are incremented unconditionally; the decision
        // is the conjunction, so a denied request still consumes budget.
        let account_ok = self.hit(&format!("acct:{account_id}"), self.limits.per_account, now);
        let device_ok = self.hit(
            &format!("fp:{fingerprint}"),
            self.limits.per_fingerprint,
            now,
        );
        let ip_ok = self.hit(&format!("ip:{ip}"), self.limits.per_ip, now);

        let allowed = account_ok && device_ok && ip_ok;
        if !allowed {
            tracing::warn!(
                account = account_id,
                fingerprint,
                ip,
                "rate limit exceeded"
            );
        }
        allowed
    }

    /// Number of live windows currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn hit(&self, key: &str, ceiling: u32, now: DateTime<Utc>) -> bool {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - window.started_at >= Duration::seconds(WINDOW_SECS) {
            // First touch after expiry starts a fresh window.
            window.started_at = now;
            window.count = 1;
        } else {
            window.count += 1;
        }

        window.count <= ceiling
    }
}

impl RateLimitStore for InMemoryRateLimiter {
    fn allow(&self, account_id: &str, fingerprint: &str, ip: &str) -> bool {
        self.allow_at(account_id, fingerprint, ip, Utc::now())
    }
}
