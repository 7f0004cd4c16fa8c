// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Composite key builders for the embedded database indexes.
//!
//! The account-history index key is `account_id | !timestamp_be | entry_id`:
//! the bitwise-inverted big-endian timestamp makes a forward range scan
//! return entries newest-first. The beneficiary key is
//! `owner_id | beneficiary_account_id`, which makes the (owner, beneficiary)
//! pair unique by construction.
//!
//! Field values must not contain the `|` delimiter; the ledger engine
//! rejects such ids before anything reaches this layer.

/// Build a composite key for the account-history index.
pub fn ledger_index_key(account_id: &str, timestamp_millis: i64, entry_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(account_id.len() + 1 + 8 + 1 + entry_id.len());
    key.extend_from_slice(account_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!(timestamp_millis as u64)).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(entry_id.as_bytes());
    key
}

/// Lower bound for a range scan over one account's history.
pub fn ledger_index_prefix(account_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(account_id.len() + 1);
    prefix.extend_from_slice(account_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a range scan over one account's history.
pub fn ledger_index_prefix_end(account_id: &str) -> Vec<u8> {
    let mut end = ledger_index_prefix(account_id);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the entry id from a composite history-index key.
pub fn entry_id_from_index_key(key: &[u8]) -> Option<String> {
    let mut pipe_count = 0;
    for (i, &b) in key.iter().enumerate() {
        if b == b'|' {
            pipe_count += 1;
            if pipe_count == 2 {
                return String::from_utf8(key[i + 1..].to_vec()).ok();
            }
        }
    }
    None
}

/// Unique key for a saved beneficiary: `owner_id | beneficiary_account_id`.
pub fn beneficiary_key(owner_id: &str, beneficiary_account_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner_id.len() + 1 + beneficiary_account_id.len());
    key.extend_from_slice(owner_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(beneficiary_account_id.as_bytes());
    key
}

/// Lower bound for a range scan over one owner's beneficiaries.
pub fn beneficiary_prefix(owner_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner_id.len() + 1);
    prefix.extend_from_slice(owner_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a range scan over one owner's beneficiaries.
pub fn beneficiary_prefix_end(owner_id: &str) -> Vec<u8> {
    let mut end = beneficiary_prefix(owner_id);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Time-ordered key for the operation-log index: `!timestamp_be | trace_id`.
pub fn oplog_index_key(timestamp_millis: i64, trace_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + 1 + trace_id.len());
    key.extend_from_slice(&(!(timestamp_millis as u64)).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(trace_id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_index_key_orders_newest_first() {
        let key_old = ledger_index_key("acct", 1_000, "e1");
        let key_new = ledger_index_key("acct", 2_000, "e2");
        assert!(key_new < key_old, "newer timestamps must sort first");
    }

    #[test]
    fn ledger_index_prefix_bounds_contain_keys() {
        let key = ledger_index_key("acct", 1_700_000_000_000, "entry-1");
        let lo = ledger_index_prefix("acct");
        let hi = ledger_index_prefix_end("acct");
        assert!(key > lo && key < hi);

        // Keys for a different account fall outside the bounds.
        let other = ledger_index_key("acct2", 1_700_000_000_000, "entry-1");
        assert!(other > hi || other < lo);
    }

    #[test]
    fn entry_id_round_trips_through_key() {
        let key = ledger_index_key("acct", 42, "entry-abc");
        assert_eq!(entry_id_from_index_key(&key).as_deref(), Some("entry-abc"));
    }

    #[test]
    fn beneficiary_key_is_pair_unique() {
        assert_eq!(
            beneficiary_key("owner", "acct"),
            beneficiary_key("owner", "acct")
        );
        assert_ne!(
            beneficiary_key("owner", "acct"),
            beneficiary_key("owner", "acct2")
        );
    }

    #[test]
    fn oplog_index_orders_newest_first() {
        let older = oplog_index_key(1_000, "t1");
        let newer = oplog_index_key(2_000, "t2");
        assert!(newer < older);
    }
}
