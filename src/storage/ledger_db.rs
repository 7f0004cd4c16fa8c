// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account
//! - `ledger`: entry_id → serialized LedgerEntry (append-only)
//! - `ledger_account_index`: composite key (account|!timestamp|entry_id) →
//!   entry type, for newest-first history scans
//! - `saved_beneficiaries`: composite key (owner|beneficiary) → serialized
//!   SavedBeneficiary
//! - `operation_log`: trace_id → serialized OperationLogEntry (append-only)
//! - `operation_log_index`: (!timestamp|trace_id) → trace_id
//!
//! ## Immutability
//!
//! The `ledger` and `operation_log` tables are append-only at this layer:
//! inserts against an existing key fail with
//! [`LedgerDbError::AppendOnlyViolation`] and no update or delete surface
//! exists for either table.
//!
//! ## Concurrency
//!
//! redb admits a single write transaction at a time. [`apply_transfer`]
//! reads the source balance inside its write transaction, which serializes
//! concurrent debits against the same account the way a select-for-update
//! row lock would; the transaction commits balance mutations and ledger
//! inserts as one atomic unit or not at all.
//!
//! [`apply_transfer`]: LedgerDatabase::apply_transfer

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition};
use rust_decimal::Decimal;

use crate::models::{Account, AccountId, EntryClass, LedgerEntry, OperationLogEntry, SavedBeneficiary};

use super::keys;

// =============================================================================
// Table Definitions
// =============================================================================

/// Account balances: account_id → serialized Account (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Immutable ledger: entry_id → serialized LedgerEntry (JSON bytes).
const LEDGER: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger");

/// History index: composite key → entry type wire name.
/// Key format: `account_id|!timestamp_be|entry_id` for descending-time scans.
const LEDGER_ACCOUNT_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("ledger_account_index");

/// Saved beneficiaries: composite key (owner|beneficiary) → JSON bytes.
const SAVED_BENEFICIARIES: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("saved_beneficiaries");

/// Orchestration audit trail: trace_id → serialized OperationLogEntry.
const OPERATION_LOG: TableDefinition<&str, &[u8]> = TableDefinition::new("operation_log");

/// Time index over the operation log: (!timestamp_be|trace_id) → trace_id.
const OPERATION_LOG_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("operation_log_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("append-only violation: {0} already exists")]
    AppendOnlyViolation(String),

    #[error("insufficient funds: account {account} holds {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: Decimal,
        requested: Decimal,
    },
}

pub type LedgerDbResult<T> = Result<T, LedgerDbError>;

// =============================================================================
// Transfer Plan
// =============================================================================

/// Fully validated transfer, ready to be applied atomically.
///
/// Built by the ledger engine: both entries are pre-constructed with the
/// shared request id, correlation id, and integrity hashes. The database
/// only re-checks the funds invariant under its write lock and applies the
/// mutations.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub from: AccountId,
    pub to: AccountId,
    /// Positive, normalized amount being moved.
    pub amount: Decimal,
    pub currency: String,
    /// TRANSFER_DEBIT entry for the source account (negative amount).
    pub debit: LedgerEntry,
    /// TRANSFER_CREDIT entry for the destination account (positive amount).
    pub credit: LedgerEntry,
    pub now: DateTime<Utc>,
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID store for accounts, the immutable ledger, saved
/// beneficiaries, and the operation log.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(LEDGER)?;
            let _ = write_txn.open_table(LEDGER_ACCOUNT_INDEX)?;
            let _ = write_txn.open_table(SAVED_BENEFICIARIES)?;
            let _ = write_txn.open_table(OPERATION_LOG)?;
            let _ = write_txn.open_table(OPERATION_LOG_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Look up an account by id.
    pub fn get_account(&self, account_id: &str) -> LedgerDbResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(account_id)? {
            Some(value) => {
                let account: Account = serde_json::from_slice(value.value())?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Insert an account only if it does not already exist.
    ///
    /// Returns `true` when the account was inserted, `false` when an account
    /// with the same id was already present (the existing row is untouched).
    pub fn insert_account_if_absent(&self, account: &Account) -> LedgerDbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(ACCOUNTS)?;
            if table.get(account.id.as_str())?.is_some() {
                false
            } else {
                let json = serde_json::to_vec(account)?;
                table.insert(account.id.as_str(), json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    // =========================================================================
    // Atomic Ledger Operations
    // =========================================================================

    /// Apply a transfer atomically: debit source, credit (or create) the
    /// destination, and append both ledger entries plus their index rows in
    /// one write transaction.
    ///
    /// The source balance is read under the write lock; a shortfall aborts
    /// the transaction with [`LedgerDbError::InsufficientFunds`] leaving no
    /// partial state. Returns the post-commit (source, destination) balances.
    pub fn apply_transfer(&self, plan: &TransferPlan) -> LedgerDbResult<(Decimal, Decimal)> {
        let write_txn = self.db.begin_write()?;
        let (from_balance, to_balance) = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;

            // Exclusive read of the source row; serialized with all other
            // writers by redb's single write transaction.
            let mut source = match accounts.get(plan.from.as_str())? {
                Some(value) => serde_json::from_slice::<Account>(value.value())?,
                None => {
                    return Err(LedgerDbError::NotFound(format!(
                        "account {}",
                        plan.from
                    )))
                }
            };

            if source.balance < plan.amount {
                return Err(LedgerDbError::InsufficientFunds {
                    account: plan.from.to_string(),
                    balance: source.balance,
                    requested: plan.amount,
                });
            }

            source.balance -= plan.amount;
            source.updated_at = plan.now;

            // Destination is created implicitly on first credit.
            let mut destination = match accounts.get(plan.to.as_str())? {
                Some(value) => serde_json::from_slice::<Account>(value.value())?,
                None => Account {
                    id: plan.to.clone(),
                    balance: Decimal::ZERO,
                    currency: plan.currency.clone(),
                    created_at: plan.now,
                    updated_at: plan.now,
                },
            };
            destination.balance += plan.amount;
            destination.updated_at = plan.now;

            let source_json = serde_json::to_vec(&source)?;
            accounts.insert(source.id.as_str(), source_json.as_slice())?;
            let dest_json = serde_json::to_vec(&destination)?;
            accounts.insert(destination.id.as_str(), dest_json.as_slice())?;

            let mut ledger = write_txn.open_table(LEDGER)?;
            let mut index = write_txn.open_table(LEDGER_ACCOUNT_INDEX)?;
            append_entry(&mut ledger, &mut index, &plan.debit)?;
            append_entry(&mut ledger, &mut index, &plan.credit)?;

            (source.balance, destination.balance)
        };
        write_txn.commit()?;
        Ok((from_balance, to_balance))
    }

    /// Apply a top-up atomically: credit (or create) the account and append
    /// the TOPUP ledger entry in one write transaction.
    ///
    /// Returns the post-commit balance.
    pub fn apply_topup(&self, entry: &LedgerEntry, now: DateTime<Utc>) -> LedgerDbResult<Decimal> {
        let write_txn = self.db.begin_write()?;
        let balance = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;

            let mut account = match accounts.get(entry.account_id.as_str())? {
                Some(value) => serde_json::from_slice::<Account>(value.value())?,
                None => Account {
                    id: entry.account_id.clone(),
                    balance: Decimal::ZERO,
                    currency: entry.currency.clone(),
                    created_at: now,
                    updated_at: now,
                },
            };
            account.balance += entry.amount;
            account.updated_at = now;

            let json = serde_json::to_vec(&account)?;
            accounts.insert(account.id.as_str(), json.as_slice())?;

            let mut ledger = write_txn.open_table(LEDGER)?;
            let mut index = write_txn.open_table(LEDGER_ACCOUNT_INDEX)?;
            append_entry(&mut ledger, &mut index, entry)?;

            account.balance
        };
        write_txn.commit()?;
        Ok(balance)
    }

    // =========================================================================
    // Ledger Reads
    // =========================================================================

    /// Look up a single ledger entry by id.
    pub fn ledger_entry(&self, entry_id: &str) -> LedgerDbResult<Option<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LEDGER)?;
        match table.get(entry_id)? {
            Some(value) => {
                let entry: LedgerEntry = serde_json::from_slice(value.value())?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Page through an account's ledger entries, newest first.
    ///
    /// `class` filters to credit or debit entries before pagination is
    /// applied; `offset`/`limit` are row counts over the filtered stream.
    pub fn entries_for_account(
        &self,
        account_id: &str,
        class: Option<EntryClass>,
        offset: usize,
        limit: usize,
    ) -> LedgerDbResult<Vec<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(LEDGER_ACCOUNT_INDEX)?;
        let ledger = read_txn.open_table(LEDGER)?;

        let lo = keys::ledger_index_prefix(account_id);
        let hi = keys::ledger_index_prefix_end(account_id);

        let mut matched = 0usize;
        let mut results = Vec::with_capacity(limit);

        for item in index.range(lo.as_slice()..hi.as_slice())? {
            if results.len() >= limit {
                break;
            }

            let item = item?;
            let key_bytes = item.0.value().to_vec();
            let type_name = item.1.value();

            if let Some(wanted) = class {
                let entry_class = match type_name {
                    "TRANSFER_DEBIT" => EntryClass::Debit,
                    _ => EntryClass::Credit,
                };
                if entry_class != wanted {
                    continue;
                }
            }

            if matched < offset {
                matched += 1;
                continue;
            }
            matched += 1;

            if let Some(entry_id) = keys::entry_id_from_index_key(&key_bytes) {
                if let Some(value) = ledger.get(entry_id.as_str())? {
                    let entry: LedgerEntry = serde_json::from_slice(value.value())?;
                    results.push(entry);
                }
            }
        }

        Ok(results)
    }

    // =========================================================================
    // Saved Beneficiaries
    // =========================================================================

    /// Look up a beneficiary by its unique (owner, beneficiary) pair.
    pub fn get_beneficiary(
        &self,
        owner_id: &str,
        beneficiary_account_id: &str,
    ) -> LedgerDbResult<Option<SavedBeneficiary>> {
        let key = keys::beneficiary_key(owner_id, beneficiary_account_id);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SAVED_BENEFICIARIES)?;
        match table.get(key.as_slice())? {
            Some(value) => {
                let beneficiary: SavedBeneficiary = serde_json::from_slice(value.value())?;
                Ok(Some(beneficiary))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a beneficiary row. The composite key keeps the
    /// (owner, beneficiary) pair unique; a second save overwrites in place
    /// rather than duplicating.
    pub fn put_beneficiary(&self, beneficiary: &SavedBeneficiary) -> LedgerDbResult<()> {
        let key = keys::beneficiary_key(
            &beneficiary.owner_id,
            beneficiary.beneficiary_account_id.as_str(),
        );
        let json = serde_json::to_vec(beneficiary)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SAVED_BENEFICIARIES)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List an owner's beneficiaries, most recently used first.
    pub fn list_beneficiaries(&self, owner_id: &str) -> LedgerDbResult<Vec<SavedBeneficiary>> {
        let lo = keys::beneficiary_prefix(owner_id);
        let hi = keys::beneficiary_prefix_end(owner_id);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SAVED_BENEFICIARIES)?;

        let mut results = Vec::new();
        for item in table.range(lo.as_slice()..hi.as_slice())? {
            let item = item?;
            let beneficiary: SavedBeneficiary = serde_json::from_slice(item.1.value())?;
            results.push(beneficiary);
        }

        results.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(results)
    }

    // =========================================================================
    // Operation Log
    // =========================================================================

    /// Append one operation-log record. Exactly one record may exist per
    /// trace id; re-appending fails with
    /// [`LedgerDbError::AppendOnlyViolation`].
    pub fn append_operation(&self, record: &OperationLogEntry) -> LedgerDbResult<()> {
        let json = serde_json::to_vec(record)?;
        let index_key =
            keys::oplog_index_key(record.recorded_at.timestamp_millis(), &record.trace_id);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(OPERATION_LOG)?;
            if table.get(record.trace_id.as_str())?.is_some() {
                return Err(LedgerDbError::AppendOnlyViolation(format!(
                    "operation {}",
                    record.trace_id
                )));
            }
            table.insert(record.trace_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(OPERATION_LOG_INDEX)?;
            index.insert(index_key.as_slice(), record.trace_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up the operation-log record for a trace id.
    pub fn operation_by_trace(&self, trace_id: &str) -> LedgerDbResult<Option<OperationLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OPERATION_LOG)?;
        match table.get(trace_id)? {
            Some(value) => {
                let record: OperationLogEntry = serde_json::from_slice(value.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// The most recent operation-log records, newest first.
    pub fn recent_operations(&self, limit: usize) -> LedgerDbResult<Vec<OperationLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OPERATION_LOG_INDEX)?;
        let table = read_txn.open_table(OPERATION_LOG)?;

        let mut results = Vec::with_capacity(limit);
        for item in index.iter()? {
            let item = item?;
            let trace_id = item.1.value();
            if let Some(value) = table.get(trace_id)? {
                let record: OperationLogEntry = serde_json::from_slice(value.value())?;
                results.push(record);
            }
            if results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }
}

/// Insert one ledger entry plus its history-index row.
///
/// The ledger table is append-only: an existing entry id is a hard error,
/// and no update or delete path exists anywhere in this module.
fn append_entry(
    ledger: &mut Table<&str, &[u8]>,
    index: &mut Table<&[u8], &str>,
    entry: &LedgerEntry,
) -> LedgerDbResult<()> {
    if ledger.get(entry.id.as_str())?.is_some() {
        return Err(LedgerDbError::AppendOnlyViolation(format!(
            "ledger entry {}",
            entry.id
        )));
    }

    let json = serde_json::to_vec(entry)?;
    ledger.insert(entry.id.as_str(), json.as_slice())?;

    let key = keys::ledger_index_key(
        entry.account_id.as_str(),
        entry.created_at.timestamp_millis(),
        &entry.id,
    );
    index.insert(key.as_slice(), entry.entry_type.as_str())?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LedgerEntryType, OperationStatus};
    use rust_decimal_macros::dec;

    fn temp_db() -> (LedgerDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = LedgerDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn account(id: &str, balance: Decimal) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::from(id),
            balance,
            currency: "EUR".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(
        id: &str,
        account_id: &str,
        entry_type: LedgerEntryType,
        amount: Decimal,
        request_id: &str,
    ) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            account_id: AccountId::from(account_id),
            entry_type,
            amount,
            currency: "EUR".to_string(),
            request_id: request_id.to_string(),
            correlation_id: "corr-1".to_string(),
            nonce: None,
            created_at: Utc::now(),
            integrity_hash: "test-hash".to_string(),
        }
    }

    fn plan(from: &str, to: &str, amount: Decimal, request_id: &str) -> TransferPlan {
        TransferPlan {
            from: AccountId::from(from),
            to: AccountId::from(to),
            amount,
            currency: "EUR".to_string(),
            debit: entry(
                &format!("{request_id}-debit"),
                from,
                LedgerEntryType::TransferDebit,
                -amount,
                request_id,
            ),
            credit: entry(
                &format!("{request_id}-credit"),
                to,
                LedgerEntryType::TransferCredit,
                amount,
                request_id,
            ),
            now: Utc::now(),
        }
    }

    #[test]
    fn insert_account_if_absent_is_idempotent() {
        let (db, _dir) = temp_db();

        assert!(db.insert_account_if_absent(&account("a", dec!(500.00))).unwrap());
        // Second insert leaves the original balance untouched.
        assert!(!db.insert_account_if_absent(&account("a", dec!(999.00))).unwrap());

        let stored = db.get_account("a").unwrap().unwrap();
        assert_eq!(stored.balance, dec!(500.00));
    }

    #[test]
    fn apply_transfer_moves_funds_and_writes_entries() {
        let (db, _dir) = temp_db();
        db.insert_account_if_absent(&account("a", dec!(500.00))).unwrap();
        db.insert_account_if_absent(&account("b", dec!(0.00))).unwrap();

        let (from_balance, to_balance) =
            db.apply_transfer(&plan("a", "b", dec!(120.00), "req-1")).unwrap();

        assert_eq!(from_balance, dec!(380.00));
        assert_eq!(to_balance, dec!(120.00));

        let debit = db.ledger_entry("req-1-debit").unwrap().unwrap();
        let credit = db.ledger_entry("req-1-credit").unwrap().unwrap();
        assert_eq!(debit.amount, dec!(-120.00));
        assert_eq!(credit.amount, dec!(120.00));
        assert_eq!(debit.request_id, credit.request_id);
        assert_eq!(debit.amount + credit.amount, Decimal::ZERO);
    }

    #[test]
    fn apply_transfer_creates_missing_destination() {
        let (db, _dir) = temp_db();
        db.insert_account_if_absent(&account("a", dec!(100.00))).unwrap();

        let (_, to_balance) = db.apply_transfer(&plan("a", "new", dec!(40.00), "req-2")).unwrap();
        assert_eq!(to_balance, dec!(40.00));

        let created = db.get_account("new").unwrap().unwrap();
        assert_eq!(created.balance, dec!(40.00));
        assert_eq!(created.currency, "EUR");
    }

    #[test]
    fn insufficient_funds_aborts_without_partial_state() {
        let (db, _dir) = temp_db();
        db.insert_account_if_absent(&account("a", dec!(50.00))).unwrap();
        db.insert_account_if_absent(&account("b", dec!(10.00))).unwrap();

        let err = db.apply_transfer(&plan("a", "b", dec!(80.00), "req-3")).unwrap_err();
        assert!(matches!(err, LedgerDbError::InsufficientFunds { .. }));

        // Atomicity: neither balance moved and no ledger rows exist.
        assert_eq!(db.get_account("a").unwrap().unwrap().balance, dec!(50.00));
        assert_eq!(db.get_account("b").unwrap().unwrap().balance, dec!(10.00));
        assert!(db.ledger_entry("req-3-debit").unwrap().is_none());
        assert!(db.ledger_entry("req-3-credit").unwrap().is_none());
    }

    #[test]
    fn transfer_from_missing_source_is_not_found() {
        let (db, _dir) = temp_db();
        let err = db.apply_transfer(&plan("ghost", "b", dec!(5.00), "req-4")).unwrap_err();
        assert!(matches!(err, LedgerDbError::NotFound(_)));
    }

    #[test]
    fn apply_topup_credits_and_creates() {
        let (db, _dir) = temp_db();

        let topup = entry("t-1", "fresh", LedgerEntryType::Topup, dec!(25.00), "req-5");
        let balance = db.apply_topup(&topup, Utc::now()).unwrap();
        assert_eq!(balance, dec!(25.00));

        let topup2 = entry("t-2", "fresh", LedgerEntryType::Topup, dec!(5.00), "req-6");
        let balance = db.apply_topup(&topup2, Utc::now()).unwrap();
        assert_eq!(balance, dec!(30.00));
    }

    #[test]
    fn ledger_rejects_duplicate_entry_ids() {
        let (db, _dir) = temp_db();

        let topup = entry("dup", "a", LedgerEntryType::Topup, dec!(1.00), "req-7");
        db.apply_topup(&topup, Utc::now()).unwrap();

        // Same entry id again: the storage layer refuses the rewrite and the
        // whole transaction aborts, leaving the balance unchanged.
        let err = db.apply_topup(&topup, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerDbError::AppendOnlyViolation(_)));
        assert_eq!(db.get_account("a").unwrap().unwrap().balance, dec!(1.00));
    }

    #[test]
    fn entries_for_account_pages_newest_first() {
        let (db, _dir) = temp_db();

        for i in 0..5u32 {
            let mut e = entry(
                &format!("e-{i}"),
                "acct",
                LedgerEntryType::Topup,
                dec!(1.00),
                &format!("req-{i}"),
            );
            e.created_at = Utc::now() - chrono::Duration::seconds(i64::from(5 - i));
            db.apply_topup(&e, e.created_at).unwrap();
        }

        let page1 = db.entries_for_account("acct", None, 0, 2).unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].id, "e-4"); // newest
        assert_eq!(page1[1].id, "e-3");

        let page2 = db.entries_for_account("acct", None, 2, 2).unwrap();
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[0].id, "e-2");

        let page3 = db.entries_for_account("acct", None, 4, 2).unwrap();
        assert_eq!(page3.len(), 1);
    }

    #[test]
    fn entries_for_account_honors_zero_limit() {
        let (db, _dir) = temp_db();

        let topup = entry("z-1", "acct", LedgerEntryType::Topup, dec!(1.00), "req-z");
        db.apply_topup(&topup, Utc::now()).unwrap();

        assert!(db.entries_for_account("acct", None, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn entries_for_account_filters_by_class() {
        let (db, _dir) = temp_db();
        db.insert_account_if_absent(&account("x", dec!(100.00))).unwrap();

        db.apply_transfer(&plan("x", "y", dec!(10.00), "req-a")).unwrap();
        let topup = entry("t-x", "x", LedgerEntryType::Topup, dec!(3.00), "req-b");
        db.apply_topup(&topup, Utc::now()).unwrap();

        let debits = db.entries_for_account("x", Some(EntryClass::Debit), 0, 10).unwrap();
        assert_eq!(debits.len(), 1);
        assert_eq!(debits[0].entry_type, LedgerEntryType::TransferDebit);

        let credits = db.entries_for_account("x", Some(EntryClass::Credit), 0, 10).unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].entry_type, LedgerEntryType::Topup);
    }

    #[test]
    fn beneficiary_pair_stays_unique() {
        let (db, _dir) = temp_db();

        let first = SavedBeneficiary {
            owner_id: "owner".to_string(),
            beneficiary_account_id: AccountId::from("acct"),
            nickname: Some("Rent".to_string()),
            last_used_at: Utc::now(),
        };
        db.put_beneficiary(&first).unwrap();

        let mut second = first.clone();
        second.nickname = Some("Landlord".to_string());
        second.last_used_at = Utc::now() + chrono::Duration::seconds(10);
        db.put_beneficiary(&second).unwrap();

        let listed = db.list_beneficiaries("owner").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].nickname.as_deref(), Some("Landlord"));
    }

    #[test]
    fn list_beneficiaries_orders_by_recency() {
        let (db, _dir) = temp_db();
        let base = Utc::now();

        for (i, acct) in ["b1", "b2", "b3"].iter().enumerate() {
            db.put_beneficiary(&SavedBeneficiary {
                owner_id: "owner".to_string(),
                beneficiary_account_id: AccountId::from(*acct),
                nickname: None,
                last_used_at: base + chrono::Duration::seconds(i as i64),
            })
            .unwrap();
        }

        let listed = db.list_beneficiaries("owner").unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].beneficiary_account_id.as_str(), "b3");
        assert_eq!(listed[2].beneficiary_account_id.as_str(), "b1");

        // Another owner sees nothing.
        assert!(db.list_beneficiaries("stranger").unwrap().is_empty());
    }

    #[test]
    fn operation_log_is_append_only() {
        let (db, _dir) = temp_db();

        let record = OperationLogEntry {
            trace_id: "trace-1".to_string(),
            intent: "payment".to_string(),
            confidence: 0.5,
            status: OperationStatus::Committed,
            actions: vec!["BerylPay:a->b:10.00".to_string()],
            requester: "user-1".to_string(),
            recorded_at: Utc::now(),
        };
        db.append_operation(&record).unwrap();

        let err = db.append_operation(&record).unwrap_err();
        assert!(matches!(err, LedgerDbError::AppendOnlyViolation(_)));

        let loaded = db.operation_by_trace("trace-1").unwrap().unwrap();
        assert_eq!(loaded.actions, record.actions);
    }

    #[test]
    fn recent_operations_newest_first() {
        let (db, _dir) = temp_db();
        let base = Utc::now();

        for i in 0..3 {
            db.append_operation(&OperationLogEntry {
                trace_id: format!("trace-{i}"),
                intent: "chat".to_string(),
                confidence: 0.1,
                status: OperationStatus::Committed,
                actions: vec![],
                requester: "user".to_string(),
                recorded_at: base + chrono::Duration::seconds(i),
            })
            .unwrap();
        }

        let recent = db.recent_operations(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].trace_id, "trace-2");
        assert_eq!(recent[1].trace_id, "trace-1");
    }
}
