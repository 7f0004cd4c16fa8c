// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Intent Engine
//!
//! Heuristic free-text classifier: deterministic, keyword-driven,
//! first-match-wins. Not a trained model — the keyword table is injectable
//! so tests can exercise mixed-intent edge cases exactly.
//!
//! Normalization lowercases the text and folds diacritics (NFD
//! decomposition, combining marks stripped), so "trànsfér" matches
//! "transfer". Confidence is a fixed function of the normalized length:
//! `min(len/512, 1.0)` clamped to [0.1, 0.99].

use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Intent, IntentKind};
use crate::money;

/// Ordered category → keyword set table. Categories are tested in order
/// and the first one with any keyword present in the normalized text wins;
/// no category matching falls through to chat.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    categories: Vec<(IntentKind, Vec<String>)>,
}

impl KeywordTable {
    pub fn new(categories: Vec<(IntentKind, Vec<String>)>) -> Self {
        Self { categories }
    }

    /// Reference keyword sets, ordered payment → mobility → esg → profile.
    pub fn default_table() -> Self {
        let keywords = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self::new(vec![
            (
                IntentKind::Payment,
                keywords(&[
                    "pay", "send", "transfer", "topup", "top up", "money", "balance", "iban",
                    "beneficiary",
                ]),
            ),
            (
                IntentKind::Mobility,
                keywords(&["ride", "taxi", "scooter", "bus", "metro", "train", "ticket"]),
            ),
            (
                IntentKind::Esg,
                keywords(&["carbon", "footprint", "recycle", "green", "sustainab", "emission"]),
            ),
            (
                IntentKind::Profile,
                keywords(&["profile", "settings", "password", "account", "email"]),
            ),
        ])
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::default_table()
    }
}

/// Pure keyword classifier over an injectable table.
#[derive(Debug, Clone, Default)]
pub struct IntentEngine {
    table: KeywordTable,
}

impl IntentEngine {
    pub fn new(table: KeywordTable) -> Self {
        Self { table }
    }

    /// Classify a free-text message into a coarse intent.
    pub fn detect_intent(&self, message: &str) -> Intent {
        let normalized = normalize(message);

        let kind = self
            .table
            .categories
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k.as_str())))
            .map(|(kind, _)| *kind)
            .unwrap_or(IntentKind::Chat);

        let confidence = confidence_for(normalized.len());

        let mut entities = HashMap::new();
        if let Some(amount) = money::extract_amount(&normalized) {
            entities.insert("amount".to_string(), amount.to_string());
        }

        tracing::debug!(intent = %kind, confidence, "intent classified");

        Intent {
            kind,
            confidence,
            entities,
            source_text: message.to_string(),
        }
    }
}

/// Lowercase and fold diacritics: NFD decomposition with combining marks
/// stripped.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// `min(len/512, 1.0)` clamped to [0.1, 0.99].
fn confidence_for(normalized_len: usize) -> f64 {
    (normalized_len as f64 / 512.0).min(1.0).clamp(0.1, 0.99)
}
