// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sentinel Core
//!
//! Ledger-and-security core for the Beryl super-app backend: an immutable
//! double-entry money ledger over an embedded ACID database, HMAC-based
//! request authentication with replay and rate-limit protection, and a
//! keyword-driven intent orchestrator that routes free-text requests to
//! domain actions and records every outcome to an append-only operation log.
//!
//! ## Architecture
//!
//! ```text
//!  InboundRequest
//!       │
//!       ▼
//!  ┌───────────────────────────────────────────┐
//!  │ pipeline::Sentinel                        │
//!  │   signature → nonce → rate limit (gates)  │
//!  └───────────────┬───────────────────────────┘
//!                  ▼
//!  intent::IntentEngine ──► orchestrator::Orchestrator
//!                                  │
//!                  ┌───────────────┴──────────────┐
//!                  ▼                              ▼
//!          ledger::LedgerEngine          operation log (append-only)
//!                  │
//!                  ▼
//!          storage::LedgerDatabase (redb)
//! ```
//!
//! The crate is transport-agnostic: it exposes plain synchronous APIs and
//! leaves HTTP, serialization of envelopes, and key distribution to the
//! embedding process.

pub mod config;
pub mod error;
pub mod intent;
pub mod ledger;
pub mod models;
pub mod money;
pub mod orchestrator;
pub mod pipeline;
pub mod security;
pub mod storage;

pub use config::{RateLimits, SentinelConfig};
pub use error::{SentinelError, SentinelResult};
pub use intent::{IntentEngine, KeywordTable};
pub use ledger::LedgerEngine;
pub use models::{
    Account, AccountId, AuditContext, EntryClass, Intent, IntentKind, LedgerEntry,
    LedgerEntryType, OperationLogEntry, OperationStatus, SavedBeneficiary, TopUpReceipt,
    TopUpRequest, TransferReceipt, TransferRequest,
};
pub use orchestrator::{OperationOutcome, Orchestrator};
pub use pipeline::{InboundRequest, Sentinel};
pub use security::{
    InMemoryNonceStore, InMemoryRateLimiter, NonceStore, RateLimitStore, SecurityEngine,
};
pub use storage::{LedgerDatabase, LedgerDbError};
