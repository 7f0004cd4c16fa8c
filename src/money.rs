// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point money helpers.
//!
//! All monetary arithmetic in the crate uses [`rust_decimal::Decimal`];
//! floating point never touches an amount. Every stored or returned amount
//! passes through [`normalize`] first: 2-digit scale, banker's rounding
//! (round-half-to-even).

use rust_decimal::{Decimal, RoundingStrategy};

/// Scale used for all stored and returned amounts.
pub const MONEY_SCALE: u32 = 2;

/// Re-scale an amount to 2 decimal places with round-half-to-even.
pub fn normalize(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    // round_dp never widens the scale, so "5" would stay "5"; force 2dp.
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Parse a decimal amount from a string, normalized to money scale.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    text.trim().parse::<Decimal>().ok().map(normalize)
}

/// Extract the first decimal quantity embedded in free text.
///
/// Scans for the first maximal run of digits with at most one interior
/// decimal point, e.g. `"send 50.25 euros to bob"` yields `50.25`. Returns
/// `None` when the text contains no digits.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            let mut seen_dot = false;
            while i < bytes.len() {
                let b = bytes[i];
                if b.is_ascii_digit() {
                    i += 1;
                } else if b == b'.'
                    && !seen_dot
                    && i + 1 < bytes.len()
                    && bytes[i + 1].is_ascii_digit()
                {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            if let Some(amount) = parse_amount(&text[start..i]) {
                return Some(amount);
            }
        } else {
            i += 1;
        }
    }

    None
}
