// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Engine (BerylPay)
//!
//! Business rules over the [`LedgerDatabase`]: transfer and top-up
//! invariants, pagination bounds, beneficiary upserts, and the per-entry
//! integrity hash. Balance mutations and ledger appends are delegated to
//! the storage layer, which applies them in a single write transaction.
//!
//! All amounts are normalized to a 2-digit scale with banker's rounding
//! before validation and persistence; see [`crate::money`].

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{SentinelError, SentinelResult};
use crate::models::{
    Account, AccountId, AuditContext, EntryClass, LedgerEntry, LedgerEntryType, SavedBeneficiary,
    TopUpReceipt, TopUpRequest, TransferReceipt, TransferRequest,
};
use crate::money;
use crate::storage::{LedgerDatabase, LedgerDbError, TransferPlan};

/// Largest page size accepted by [`LedgerEngine::transactions`].
pub const MAX_PAGE_SIZE: u32 = 50;

/// The money-movement service: enforces ledger invariants and writes
/// through the embedded database atomically.
#[derive(Clone)]
pub struct LedgerEngine {
    db: Arc<LedgerDatabase>,
}

impl LedgerEngine {
    pub fn new(db: Arc<LedgerDatabase>) -> Self {
        Self { db }
    }

    /// Idempotent account provisioning: inserts the account with the given
    /// opening balance unless it already exists, in which case nothing
    /// changes. Emits no ledger entry.
    pub fn seed(
        &self,
        account_id: impl Into<AccountId>,
        initial_balance: Decimal,
        currency: &str,
    ) -> SentinelResult<Account> {
        let account_id = account_id.into();
        validate_id("account id", account_id.as_str())?;

        let balance = money::normalize(initial_balance);
        if balance < Decimal::ZERO {
            return Err(SentinelError::InvalidArgument(
                "initial balance must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let account = Account {
            id: account_id,
            balance,
            currency: currency.to_string(),
            created_at: now,
            updated_at: now,
        };

        let inserted = self.db.insert_account_if_absent(&account)?;
        if inserted {
            tracing::info!(account = %account.id, balance = %account.balance, "account seeded");
            Ok(account)
        } else {
            // Existing row wins; return it untouched.
            self.balance(account.id.as_str())
        }
    }

    /// Move funds between two accounts.
    ///
    /// Debits the source, credits (creating if absent) the destination, and
    /// appends a TRANSFER_DEBIT/TRANSFER_CREDIT entry pair sharing one
    /// request id — all in one atomic storage transaction. Fails with
    /// `InvalidArgument` for self-transfers or non-positive amounts and
    /// `InsufficientFunds` when the source cannot cover the amount.
    pub fn transfer(
        &self,
        request: &TransferRequest,
        audit: &AuditContext,
    ) -> SentinelResult<TransferReceipt> {
        validate_id("source account id", request.from_account.as_str())?;
        validate_id("destination account id", request.to_account.as_str())?;

        let amount = money::normalize(request.amount);
        if amount <= Decimal::ZERO {
            return Err(SentinelError::InvalidArgument(
                "transfer amount must be positive".to_string(),
            ));
        }
        if request.from_account == request.to_account {
            return Err(SentinelError::InvalidArgument(
                "source and destination accounts must differ".to_string(),
            ));
        }

        let now = Utc::now();
        let trace_id = Uuid::new_v4().to_string();
        let request_id = Uuid::new_v4().to_string();
        let correlation_id = if audit.correlation_id.is_empty() {
            trace_id.clone()
        } else {
            audit.correlation_id.clone()
        };

        let debit = build_entry(
            &request.from_account,
            LedgerEntryType::TransferDebit,
            -amount,
            &request.currency,
            &request_id,
            &correlation_id,
            audit.nonce.clone(),
            now,
        );
        let credit = build_entry(
            &request.to_account,
            LedgerEntryType::TransferCredit,
            amount,
            &request.currency,
            &request_id,
            &correlation_id,
            audit.nonce.clone(),
            now,
        );

        let plan = TransferPlan {
            from: request.from_account.clone(),
            to: request.to_account.clone(),
            amount,
            currency: request.currency.clone(),
            debit,
            credit,
            now,
        };

        let (from_balance, to_balance) =
            self.db.apply_transfer(&plan).map_err(map_storage_error)?;

        tracing::info!(
            trace_id = %trace_id,
            from = %request.from_account,
            to = %request.to_account,
            amount = %amount,
            "transfer committed"
        );

        Ok(TransferReceipt {
            trace_id,
            from_account: request.from_account.clone(),
            to_account: request.to_account.clone(),
            amount,
            currency: request.currency.clone(),
            from_balance,
            to_balance,
        })
    }

    /// Credit a single account, creating it if absent, and append one TOPUP
    /// ledger entry atomically.
    pub fn topup(
        &self,
        request: &TopUpRequest,
        audit: &AuditContext,
    ) -> SentinelResult<TopUpReceipt> {
        validate_id("account id", request.account_id.as_str())?;

        let amount = money::normalize(request.amount);
        if amount <= Decimal::ZERO {
            return Err(SentinelError::InvalidArgument(
                "top-up amount must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let trace_id = Uuid::new_v4().to_string();
        let request_id = Uuid::new_v4().to_string();
        let correlation_id = if audit.correlation_id.is_empty() {
            trace_id.clone()
        } else {
            audit.correlation_id.clone()
        };

        let entry = build_entry(
            &request.account_id,
            LedgerEntryType::Topup,
            amount,
            &request.currency,
            &request_id,
            &correlation_id,
            audit.nonce.clone(),
            now,
        );

        let balance = self.db.apply_topup(&entry, now).map_err(map_storage_error)?;

        tracing::info!(
            trace_id = %trace_id,
            account = %request.account_id,
            amount = %amount,
            "top-up committed"
        );

        Ok(TopUpReceipt {
            trace_id,
            account_id: request.account_id.clone(),
            currency: request.currency.clone(),
            balance,
        })
    }

    /// Read-only balance query; fails with `NotFound` for unknown accounts.
    pub fn balance(&self, account_id: &str) -> SentinelResult<Account> {
        self.db
            .get_account(account_id)?
            .ok_or_else(|| SentinelError::NotFound(format!("account {account_id}")))
    }

    /// Page through an account's ledger entries, newest first, optionally
    /// filtered to credits or debits. `size` must be in [1, 50].
    pub fn transactions(
        &self,
        owner_id: &str,
        page: u32,
        size: u32,
        class: Option<EntryClass>,
    ) -> SentinelResult<Vec<LedgerEntry>> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(SentinelError::InvalidArgument(format!(
                "page size must be in [1, {MAX_PAGE_SIZE}]"
            )));
        }

        let offset = page as usize * size as usize;
        Ok(self
            .db
            .entries_for_account(owner_id, class, offset, size as usize)?)
    }

    /// Save (or refresh) a beneficiary. The (owner, beneficiary) pair is
    /// unique: a second save updates the nickname and `last_used_at` instead
    /// of adding a row. A `None` nickname keeps the existing one.
    pub fn save_beneficiary(
        &self,
        owner_id: &str,
        beneficiary_account_id: impl Into<AccountId>,
        nickname: Option<String>,
    ) -> SentinelResult<SavedBeneficiary> {
        let beneficiary_account_id = beneficiary_account_id.into();
        validate_id("owner id", owner_id)?;
        validate_id("beneficiary account id", beneficiary_account_id.as_str())?;

        let existing = self
            .db
            .get_beneficiary(owner_id, beneficiary_account_id.as_str())?;

        let beneficiary = SavedBeneficiary {
            owner_id: owner_id.to_string(),
            beneficiary_account_id,
            nickname: nickname.or(existing.and_then(|b| b.nickname)),
            last_used_at: Utc::now(),
        };

        self.db.put_beneficiary(&beneficiary)?;
        Ok(beneficiary)
    }

    /// An owner's saved beneficiaries, most recently used first.
    pub fn list_beneficiaries(&self, owner_id: &str) -> SentinelResult<Vec<SavedBeneficiary>> {
        Ok(self.db.list_beneficiaries(owner_id)?)
    }
}

/// Account and owner ids flow into `|`-delimited composite index keys
/// (see [`crate::storage::keys`]), so the delimiter is not allowed inside
/// them. An id containing `|` would produce an index row whose entry id can
/// no longer be parsed back out, hiding the entry from history scans.
fn validate_id(label: &str, id: &str) -> SentinelResult<()> {
    if id.trim().is_empty() {
        return Err(SentinelError::InvalidArgument(format!(
            "{label} must not be blank"
        )));
    }
    if id.contains('|') {
        return Err(SentinelError::InvalidArgument(format!(
            "{label} must not contain '|'"
        )));
    }
    Ok(())
}

/// Build one immutable ledger entry, integrity hash included.
#[allow(clippy::too_many_arguments)]
fn build_entry(
    account_id: &AccountId,
    entry_type: LedgerEntryType,
    amount: Decimal,
    currency: &str,
    request_id: &str,
    correlation_id: &str,
    nonce: Option<String>,
    created_at: chrono::DateTime<Utc>,
) -> LedgerEntry {
    let integrity_hash = integrity_hash(
        account_id.as_str(),
        entry_type,
        amount,
        currency,
        request_id,
        created_at.timestamp_millis(),
    );

    LedgerEntry {
        id: Uuid::new_v4().to_string(),
        account_id: account_id.clone(),
        entry_type,
        amount,
        currency: currency.to_string(),
        request_id: request_id.to_string(),
        correlation_id: correlation_id.to_string(),
        nonce,
        created_at,
        integrity_hash,
    }
}

/// Deterministic per-entry digest: SHA-256 over the entry's own fields,
/// lowercase hex. Deliberately not chained to any previous entry.
fn integrity_hash(
    account_id: &str,
    entry_type: LedgerEntryType,
    amount: Decimal,
    currency: &str,
    request_id: &str,
    timestamp_millis: i64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update(b"|");
    hasher.update(entry_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(amount.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(currency.as_bytes());
    hasher.update(b"|");
    hasher.update(request_id.as_bytes());
    hasher.update(b"|");
    hasher.update(timestamp_millis.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn map_storage_error(err: LedgerDbError) -> SentinelError {
    match err {
        LedgerDbError::InsufficientFunds {
            account,
            balance,
            requested,
        } => SentinelError::InsufficientFunds {
            account,
            balance,
            requested,
        },
        LedgerDbError::NotFound(what) => SentinelError::NotFound(what),
        other => SentinelError::Storage(other),
    }
}

// =============================================================================
// Tests
// =============================================================================
