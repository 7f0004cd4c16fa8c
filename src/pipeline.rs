// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Pipeline
//!
//! The front door of the core: every inbound request passes signature
//! validation, nonce registration, and rate limiting — in that order — before
//! intent detection and orchestration run. Each gate fails closed with
//! [`SentinelError::Unauthorized`] and stops the pipeline, so a request
//! rejected at the signature gate never consumes its nonce and a replayed
//! nonce never reaches the ledger.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SentinelConfig;
use crate::error::{SentinelError, SentinelResult};
use crate::intent::IntentEngine;
use crate::ledger::LedgerEngine;
use crate::models::AuditContext;
use crate::orchestrator::{OperationOutcome, Orchestrator};
use crate::security::{
    InMemoryNonceStore, InMemoryRateLimiter, NonceStore, RateLimitStore, SecurityEngine,
};
use crate::storage::LedgerDatabase;

/// A signed inbound request, as decoded by a transport adapter.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Free-text message the intent engine classifies.
    pub payload: String,
    /// Unix timestamp (seconds) the client signed with.
    pub timestamp: i64,
    /// Single-use token; consumed only after the signature checks out.
    pub nonce: String,
    /// Client device identifier; part of the signed message.
    pub device_id: String,
    /// Lowercase-hex HMAC over `payload::timestamp::nonce::device_id`.
    pub signature: String,
    /// Structured hints for the orchestrator (`amount`, `fromAccount`, ...).
    pub metadata: HashMap<String, String>,
    /// Authenticated principal on whose behalf the request runs.
    pub requester: String,
    /// Device fingerprint used for rate limiting.
    pub fingerprint: String,
    /// Source IP used for rate limiting.
    pub source_ip: String,
}

/// Fully wired core: security gates in front, orchestrator behind.
pub struct Sentinel {
    security: SecurityEngine,
    nonces: Arc<dyn NonceStore>,
    limiter: Arc<dyn RateLimitStore>,
    intents: IntentEngine,
    orchestrator: Orchestrator,
    ledger: LedgerEngine,
}

impl Sentinel {
    /// Open (or create) the ledger database at the configured path and wire
    /// the full pipeline with in-memory nonce and rate-limit stores.
    pub fn open(config: &SentinelConfig) -> SentinelResult<Self> {
        let db = Arc::new(LedgerDatabase::open(&config.database_path())?);
        Ok(Self::with_database(config, db))
    }

    /// Wire the pipeline over an already-open database.
    pub fn with_database(config: &SentinelConfig, db: Arc<LedgerDatabase>) -> Self {
        let ledger = LedgerEngine::new(Arc::clone(&db));
        Self {
            security: SecurityEngine::new(config),
            nonces: Arc::new(InMemoryNonceStore::new(config.nonce_ttl_secs)),
            limiter: Arc::new(InMemoryRateLimiter::new(config.rate_limits)),
            intents: IntentEngine::default(),
            orchestrator: Orchestrator::new(config, ledger.clone(), db),
            ledger,
        }
    }

    /// Direct access to the money-movement service, for callers that expose
    /// balances, transactions, or beneficiaries without a signed envelope.
    pub fn ledger(&self) -> &LedgerEngine {
        &self.ledger
    }

    /// Run one request through the full pipeline.
    ///
    /// Gate order is part of the contract: signature, then nonce, then rate
    /// limit. A failure at any gate returns `Unauthorized` and leaves the
    /// later gates (and the ledger) untouched.
    pub fn handle(&self, request: &InboundRequest) -> SentinelResult<OperationOutcome> {
        if !self.security.validate(
            &request.payload,
            request.timestamp,
            &request.nonce,
            &request.device_id,
            &request.signature,
        ) {
            tracing::warn!(device = %request.device_id, "signature rejected");
            return Err(SentinelError::Unauthorized(
                "invalid or stale signature".to_string(),
            ));
        }

        if !self.nonces.register(&request.nonce) {
            return Err(SentinelError::Unauthorized(
                "nonce already used".to_string(),
            ));
        }

        if !self
            .limiter
            .allow(&request.requester, &request.fingerprint, &request.source_ip)
        {
            return Err(SentinelError::Unauthorized(
                "rate limit exceeded".to_string(),
            ));
        }

        let intent = self.intents.detect_intent(&request.payload);

        let audit = AuditContext {
            correlation_id: String::new(),
            nonce: Some(request.nonce.clone()),
            requester: request.requester.clone(),
        };
        self.orchestrator
            .orchestrate(&intent, &request.metadata, &audit)
    }
}

// =============================================================================
// Tests
// =============================================================================
