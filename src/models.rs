// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Data Models
//!
//! Core types shared across the ledger, security, and orchestration layers.
//! All persisted types derive `Serialize`/`Deserialize`; monetary amounts are
//! [`rust_decimal::Decimal`] values normalized to a 2-digit scale before they
//! are stored or returned (see [`crate::money`]).
//!
//! ## Model Categories
//!
//! - **Accounts & ledger**: [`Account`], [`LedgerEntry`], [`LedgerEntryType`]
//! - **Beneficiaries**: [`SavedBeneficiary`]
//! - **Requests & receipts**: [`TransferRequest`], [`TopUpRequest`],
//!   [`TransferReceipt`], [`TopUpReceipt`]
//! - **Orchestration**: [`Intent`], [`IntentKind`], [`OperationStatus`],
//!   [`OperationLogEntry`]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Account Identifier
// =============================================================================

/// Globally unique account identifier.
///
/// A plain string on the wire; the newtype keeps account ids from being
/// confused with request ids, nonces, and other free-form strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        AccountId(value)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        AccountId(value.to_string())
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Accounts & Ledger
// =============================================================================

/// Persisted account balance, the source of truth for funds.
///
/// The balance is never negative after a committed operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Current balance, 2-digit scale.
    pub balance: Decimal,
    /// ISO currency code (e.g. "EUR").
    pub currency: String,
    /// When the account was first created.
    pub created_at: DateTime<Utc>,
    /// When the balance was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Operation type of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    /// Debit side of a transfer (negative amount on the source account).
    TransferDebit,
    /// Credit side of a transfer (positive amount on the destination).
    TransferCredit,
    /// Single-account credit.
    Topup,
}

impl LedgerEntryType {
    /// Wire name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::TransferDebit => "TRANSFER_DEBIT",
            LedgerEntryType::TransferCredit => "TRANSFER_CREDIT",
            LedgerEntryType::Topup => "TOPUP",
        }
    }

    /// Credit/debit class of this entry type.
    pub fn class(&self) -> EntryClass {
        match self {
            LedgerEntryType::TransferDebit => EntryClass::Debit,
            LedgerEntryType::TransferCredit | LedgerEntryType::Topup => EntryClass::Credit,
        }
    }
}

impl std::fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credit/debit class used to filter transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryClass {
    Credit,
    Debit,
}

/// One immutable row recording a single signed balance change.
///
/// Entries are never updated or deleted once written; the storage layer
/// rejects any attempt to do so. `integrity_hash` is a deterministic digest
/// of the entry's own fields and is deliberately not chained to any previous
/// entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    /// Unique entry id.
    pub id: String,
    /// Account whose balance this entry changed.
    pub account_id: AccountId,
    /// Operation type.
    pub entry_type: LedgerEntryType,
    /// Signed amount: negative for debits, positive for credits.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// Request id shared by all entries of one ledger operation.
    pub request_id: String,
    /// Correlation id supplied by the caller's audit context.
    pub correlation_id: String,
    /// Nonce of the originating signed request, when one existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// SHA-256 over (account id, type, amount, currency, request id,
    /// timestamp), lowercase hex.
    pub integrity_hash: String,
}

// =============================================================================
// Beneficiaries
// =============================================================================

/// A saved transfer destination, unique per (owner, beneficiary) pair.
///
/// Saving the same pair again refreshes the nickname and `last_used_at`
/// instead of duplicating the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedBeneficiary {
    /// Owner user id.
    pub owner_id: String,
    /// The beneficiary's account id.
    pub beneficiary_account_id: AccountId,
    /// Optional friendly label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Last time this beneficiary was saved or refreshed.
    pub last_used_at: DateTime<Utc>,
}

// =============================================================================
// Requests & Receipts
// =============================================================================

/// Ephemeral transfer request; validated and transformed into a ledger entry
/// pair, never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: Decimal,
    pub currency: String,
}

/// Ephemeral top-up request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub currency: String,
}

/// Outcome of a committed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Trace id correlating this transfer with its audit trail.
    pub trace_id: String,
    pub from_account: AccountId,
    pub to_account: AccountId,
    /// Normalized transferred amount.
    pub amount: Decimal,
    pub currency: String,
    /// Source balance after commit.
    pub from_balance: Decimal,
    /// Destination balance after commit.
    pub to_balance: Decimal,
}

/// Outcome of a committed top-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpReceipt {
    pub trace_id: String,
    pub account_id: AccountId,
    pub currency: String,
    /// Account balance after commit.
    pub balance: Decimal,
}

/// Audit metadata threaded from the request pipeline into ledger writes.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    /// Correlation id tying ledger rows back to the orchestration trace.
    pub correlation_id: String,
    /// Nonce of the originating signed request, if any.
    pub nonce: Option<String>,
    /// Authenticated principal on whose behalf the operation runs.
    pub requester: String,
}

// =============================================================================
// Intents & Orchestration
// =============================================================================

/// Coarse intent category inferred from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Payment,
    Mobility,
    Esg,
    Profile,
    Chat,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Payment => "payment",
            IntentKind::Mobility => "mobility",
            IntentKind::Esg => "esg",
            IntentKind::Profile => "profile",
            IntentKind::Chat => "chat",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified intent produced per inbound message. Never persisted beyond
/// the operation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    /// Matched category.
    pub kind: IntentKind,
    /// Confidence score in [0.1, 0.99].
    pub confidence: f64,
    /// Entities extracted from the text (e.g. "amount").
    pub entities: HashMap<String, String>,
    /// Raw source text as received.
    pub source_text: String,
}

/// Terminal status of one orchestrated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Committed,
    RolledBack,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Committed => "committed",
            OperationStatus::RolledBack => "rolled_back",
        }
    }
}

/// Append-only record of one orchestrated request. Distinct from the
/// immutable ledger: this is the audit trail of the orchestrator, written
/// exactly once per request regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationLogEntry {
    /// Trace id generated for the orchestration attempt.
    pub trace_id: String,
    /// Name of the dispatched intent.
    pub intent: String,
    /// Confidence the classifier reported for the intent.
    pub confidence: f64,
    /// Terminal status.
    pub status: OperationStatus,
    /// Labels of the actions taken (or the rollback reason).
    pub actions: Vec<String>,
    /// Authenticated requester.
    pub requester: String,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}
