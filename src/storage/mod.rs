// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Embedded Storage Module
//!
//! Persistence for the Sentinel core, backed by redb (pure Rust, ACID).
//! One [`LedgerDatabase`] file holds the account store, the immutable
//! ledger and its history index, saved beneficiaries, and the operation
//! log.
//!
//! The ledger and operation-log tables are append-only at this layer, not
//! just by application convention: inserts against existing keys fail and
//! no update/delete surface exists for them.

pub mod keys;
pub mod ledger_db;

pub use ledger_db::{LedgerDatabase, LedgerDbError, LedgerDbResult, TransferPlan};
