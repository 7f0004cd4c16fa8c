// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use nonce store for replay protection.
//!
//! A nonce may be registered exactly once within its TTL; a second
//! registration is a replay and is rejected. The in-memory implementation
//! is single-process; a horizontally scaled deployment would substitute a
//! shared store behind [`NonceStore`].

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Store of spent nonces. Implementations must make concurrent
/// registrations of the same nonce produce exactly one winner.
pub trait NonceStore: Send + Sync {
    /// Record a nonce. Returns `true` when the nonce was not previously
    /// present (within its TTL) and is now recorded, `false` for a replay
    /// or a blank nonce.
    fn register(&self, nonce: &str) -> bool;
}

/// Concurrent in-memory nonce store with a fixed TTL.
pub struct InMemoryNonceStore {
    entries: DashMap<String, DateTime<Utc>>,
    ttl: Duration,
}

impl InMemoryNonceStore {
    /// Reference TTL: 2 minutes.
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// `register` against an explicit clock.
    pub fn register_at(&self, nonce: &str, now: DateTime<Utc>) -> bool {
        let trimmed = nonce.trim();
        if trimmed.is_empty() {
            return false;
        }

        // Maintenance sweep: drop every expired entry on each call.
        self.entries.retain(|_, expires_at| *expires_at > now);

        let expires_at = now + self.ttl;
        match self.entries.entry(trimmed.to_string()) {
            Entry::Occupied(mut occupied) => {
                // The sweep can race another shard insert; an expired
                // leftover is still reusable.
                if *occupied.get() <= now {
                    occupied.insert(expires_at);
                    true
                } else {
                    tracing::warn!(nonce = trimmed, "nonce replay rejected");
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(expires_at);
                true
            }
        }
    }

    /// Number of live (unexpired) nonces currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NonceStore for InMemoryNonceStore {
    fn register(&self, nonce: &str) -> bool {
        self.register_at(nonce, Utc::now())
    }
}
