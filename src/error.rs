// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the core returns [`SentinelResult`]. The
//! variants map one-to-one onto the externally visible failure classes:
//!
//! - `InvalidArgument` — malformed input, surfaced directly, never retried
//! - `InsufficientFunds` — business rule violation, surfaced as a client error
//! - `NotFound` — a referenced entity is absent where presence was required
//! - `Unauthorized` — signature, replay, freshness, or rate-limit failure;
//!   always fails closed
//! - `Storage` — embedded database failure
//!
//! Orchestration failures are deliberately *not* an error variant: the
//! orchestrator catches dispatch errors and records a rolled-back outcome
//! instead of propagating them (see [`crate::orchestrator`]).

use rust_decimal::Decimal;

use crate::storage::LedgerDbError;

/// Result alias used throughout the crate.
pub type SentinelResult<T> = Result<T, SentinelError>;

#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// Malformed input: non-positive amount, self-transfer, bad pagination.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The source account cannot cover the requested debit.
    #[error("insufficient funds: account {account} holds {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: Decimal,
        requested: Decimal,
    },

    /// A referenced account or beneficiary does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Signature invalid, nonce replayed, request stale, or rate exceeded.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Embedded database failure.
    #[error("storage error: {0}")]
    Storage(#[from] LedgerDbError),
}

impl SentinelError {
    /// True when the failure was produced by the authentication pipeline
    /// rather than the ledger itself.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SentinelError::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_includes_context() {
        let err = SentinelError::InsufficientFunds {
            account: "acct-1".into(),
            balance: dec!(10.00),
            requested: dec!(25.00),
        };
        let msg = err.to_string();
        assert!(msg.contains("acct-1"));
        assert!(msg.contains("10.00"));
        assert!(msg.contains("25.00"));
    }

    #[test]
    fn unauthorized_is_flagged() {
        assert!(SentinelError::Unauthorized("bad signature".into()).is_unauthorized());
        assert!(!SentinelError::NotFound("acct".into()).is_unauthorized());
    }
}
