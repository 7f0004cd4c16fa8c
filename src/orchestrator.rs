// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # AOQ Orchestrator
//!
//! Routes a classified intent to its domain action and records the outcome
//! to the operation log exactly once. A single orchestration moves
//! received → dispatching → {committed | rolled_back} and is terminal
//! either way: dispatch errors are caught, converted into a `rolled_back`
//! status with a `rollback:<message>` action label, and never retried.
//!
//! Only the payment path has real side effects (via the ledger engine);
//! mobility, ESG, and profile record fixed workflow labels, and anything
//! else falls back to chat.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::SentinelConfig;
use crate::error::{SentinelError, SentinelResult};
use crate::ledger::LedgerEngine;
use crate::models::{
    AccountId, AuditContext, Intent, IntentKind, OperationLogEntry, OperationStatus,
    TransferRequest,
};
use crate::money;
use crate::storage::LedgerDatabase;

/// Terminal outcome of one orchestrated request.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    /// Trace id correlating this outcome with its operation-log record.
    pub trace_id: String,
    /// The dispatched intent.
    pub intent: Intent,
    /// `committed` or `rolled_back`.
    pub status: OperationStatus,
    /// Labels of the actions taken, or the rollback reason.
    pub actions: Vec<String>,
}

/// Defaults applied when a payment intent leaves fields unspecified.
#[derive(Debug, Clone)]
struct PaymentDefaults {
    currency: String,
    source_account: String,
    destination_account: String,
}

/// A parsed, ready-to-execute payment.
#[derive(Debug, Clone, PartialEq)]
struct PaymentIntent {
    from_account: String,
    to_account: String,
    amount: Decimal,
    currency: String,
}

/// Intent dispatcher with an append-only audit trail.
pub struct Orchestrator {
    ledger: LedgerEngine,
    db: Arc<LedgerDatabase>,
    defaults: PaymentDefaults,
}

impl Orchestrator {
    pub fn new(config: &SentinelConfig, ledger: LedgerEngine, db: Arc<LedgerDatabase>) -> Self {
        Self {
            ledger,
            db,
            defaults: PaymentDefaults {
                currency: config.default_currency.clone(),
                source_account: config.default_source_account.clone(),
                destination_account: config.default_destination_account.clone(),
            },
        }
    }

    /// Dispatch one intent and record its outcome.
    ///
    /// Dispatch failures are swallowed into a `rolled_back` outcome; the
    /// only error this method surfaces is a failure to write the
    /// operation-log record itself.
    pub fn orchestrate(
        &self,
        intent: &Intent,
        metadata: &HashMap<String, String>,
        audit: &AuditContext,
    ) -> SentinelResult<OperationOutcome> {
        let trace_id = Uuid::new_v4().to_string();

        let (status, actions) = match self.dispatch(intent, metadata, audit, &trace_id) {
            Ok(actions) => (OperationStatus::Committed, actions),
            Err(err) => {
                tracing::warn!(trace_id = %trace_id, intent = %intent.kind, error = %err, "orchestration rolled back");
                (
                    OperationStatus::RolledBack,
                    vec![format!("rollback:{err}")],
                )
            }
        };

        let record = OperationLogEntry {
            trace_id: trace_id.clone(),
            intent: intent.kind.as_str().to_string(),
            confidence: intent.confidence,
            status,
            actions: actions.clone(),
            requester: audit.requester.clone(),
            recorded_at: Utc::now(),
        };
        self.db.append_operation(&record)?;

        tracing::info!(
            trace_id = %trace_id,
            intent = %intent.kind,
            status = status.as_str(),
            "orchestration recorded"
        );

        Ok(OperationOutcome {
            trace_id,
            intent: intent.clone(),
            status,
            actions,
        })
    }

    fn dispatch(
        &self,
        intent: &Intent,
        metadata: &HashMap<String, String>,
        audit: &AuditContext,
        trace_id: &str,
    ) -> SentinelResult<Vec<String>> {
        match intent.kind {
            IntentKind::Payment => {
                let payment = self.parse_payment(intent, metadata)?;

                let ledger_audit = AuditContext {
                    correlation_id: trace_id.to_string(),
                    nonce: audit.nonce.clone(),
                    requester: audit.requester.clone(),
                };
                let receipt = self.ledger.transfer(
                    &TransferRequest {
                        from_account: AccountId::from(payment.from_account.as_str()),
                        to_account: AccountId::from(payment.to_account.as_str()),
                        amount: payment.amount,
                        currency: payment.currency.clone(),
                    },
                    &ledger_audit,
                )?;

                Ok(vec![format!(
                    "BerylPay:{}->{}:{}",
                    receipt.from_account, receipt.to_account, receipt.amount
                )])
            }
            IntentKind::Mobility => Ok(vec!["mobility:route-workflow".to_string()]),
            IntentKind::Esg => Ok(vec!["esg:impact-workflow".to_string()]),
            IntentKind::Profile => Ok(vec!["profile:preferences-workflow".to_string()]),
            IntentKind::Chat => Ok(vec!["chat:fallback".to_string()]),
        }
    }

    /// Build a payment from metadata and intent text.
    ///
    /// Explicit metadata keys (`amount`, `fromAccount`, `toAccount`,
    /// `currency`) take precedence; a missing amount falls back to the
    /// first decimal quantity in the raw message, and missing accounts or
    /// currency fall back to the configured defaults.
    fn parse_payment(
        &self,
        intent: &Intent,
        metadata: &HashMap<String, String>,
    ) -> SentinelResult<PaymentIntent> {
        let amount = metadata
            .get("amount")
            .and_then(|raw| money::parse_amount(raw))
            .or_else(|| money::extract_amount(&intent.source_text))
            .ok_or_else(|| {
                SentinelError::InvalidArgument("payment intent carries no amount".to_string())
            })?;

        Ok(PaymentIntent {
            from_account: metadata
                .get("fromAccount")
                .cloned()
                .unwrap_or_else(|| self.defaults.source_account.clone()),
            to_account: metadata
                .get("toAccount")
                .cloned()
                .unwrap_or_else(|| self.defaults.destination_account.clone()),
            amount,
            currency: metadata
                .get("currency")
                .cloned()
                .unwrap_or_else(|| self.defaults.currency.clone()),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntentKind;
    use rust_decimal_macros::dec;

    fn setup() -> (Orchestrator, LedgerEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(LedgerDatabase::open(&dir.path().join("test.redb")).unwrap());
        let ledger = LedgerEngine::new(Arc::clone(&db));
        let config = SentinelConfig::new("secret");
        let orchestrator = Orchestrator::new(&config, ledger.clone(), Arc::clone(&db));
        (orchestrator, ledger, dir)
    }

    fn intent(kind: IntentKind, text: &str) -> Intent {
        Intent {
            kind,
            confidence: 0.5,
            entities: HashMap::new(),
            source_text: text.to_string(),
        }
    }

    fn audit(requester: &str) -> AuditContext {
        AuditContext {
            correlation_id: String::new(),
            nonce: Some("nonce-1".to_string()),
            requester: requester.to_string(),
        }
    }

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn payment_with_explicit_metadata_commits() {
        let (orchestrator, ledger, _dir) = setup();
        ledger.seed("A", dec!(500.00), "EUR").unwrap();

        let outcome = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "send money"),
                &metadata(&[("amount", "50.00"), ("fromAccount", "A"), ("toAccount", "B")]),
                &audit("user-1"),
            )
            .unwrap();

        assert_eq!(outcome.status, OperationStatus::Committed);
        assert_eq!(outcome.actions.len(), 1);
        assert!(outcome.actions[0].contains("BerylPay:A->B:50.00"));

        assert_eq!(ledger.balance("A").unwrap().balance, dec!(450.00));
        assert_eq!(ledger.balance("B").unwrap().balance, dec!(50.00));
    }

    #[test]
    fn payment_amount_falls_back_to_message_text() {
        let (orchestrator, ledger, _dir) = setup();
        ledger.seed("A", dec!(100.00), "EUR").unwrap();

        let outcome = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "please send 25.50 to my landlord"),
                &metadata(&[("fromAccount", "A"), ("toAccount", "B")]),
                &audit("user-1"),
            )
            .unwrap();

        assert_eq!(outcome.status, OperationStatus::Committed);
        assert!(outcome.actions[0].contains(":25.50"));
    }

    #[test]
    fn payment_defaults_fill_missing_accounts_and_currency() {
        let (orchestrator, ledger, _dir) = setup();
        ledger.seed("beryl-operating", dec!(1000.00), "EUR").unwrap();

        let outcome = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "transfer 10"),
                &HashMap::new(),
                &audit("user-1"),
            )
            .unwrap();

        assert_eq!(outcome.status, OperationStatus::Committed);
        assert!(outcome.actions[0].contains("beryl-operating->beryl-suspense:10.00"));

        let dest = ledger.balance("beryl-suspense").unwrap();
        assert_eq!(dest.currency, "EUR");
    }

    #[test]
    fn failed_payment_rolls_back_with_reason() {
        let (orchestrator, ledger, _dir) = setup();
        ledger.seed("A", dec!(5.00), "EUR").unwrap();

        let outcome = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "send money"),
                &metadata(&[("amount", "50.00"), ("fromAccount", "A"), ("toAccount", "B")]),
                &audit("user-1"),
            )
            .unwrap();

        assert_eq!(outcome.status, OperationStatus::RolledBack);
        assert_eq!(outcome.actions.len(), 1);
        assert!(outcome.actions[0].starts_with("rollback:"));
        assert!(outcome.actions[0].contains("insufficient funds"));

        // Atomicity: the failed dispatch left the ledger untouched.
        assert_eq!(ledger.balance("A").unwrap().balance, dec!(5.00));
        assert!(ledger.balance("B").is_err());
    }

    #[test]
    fn payment_without_any_amount_rolls_back() {
        let (orchestrator, _ledger, _dir) = setup();

        let outcome = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "send money to bob"),
                &HashMap::new(),
                &audit("user-1"),
            )
            .unwrap();

        assert_eq!(outcome.status, OperationStatus::RolledBack);
        assert!(outcome.actions[0].contains("no amount"));
    }

    #[test]
    fn stub_intents_record_workflow_labels_without_side_effects() {
        let (orchestrator, ledger, _dir) = setup();

        for (kind, label) in [
            (IntentKind::Mobility, "mobility:route-workflow"),
            (IntentKind::Esg, "esg:impact-workflow"),
            (IntentKind::Profile, "profile:preferences-workflow"),
            (IntentKind::Chat, "chat:fallback"),
        ] {
            let outcome = orchestrator
                .orchestrate(&intent(kind, "whatever"), &HashMap::new(), &audit("user-1"))
                .unwrap();
            assert_eq!(outcome.status, OperationStatus::Committed);
            assert_eq!(outcome.actions, vec![label.to_string()]);
        }

        // No accounts were touched by the stubs.
        assert!(ledger.balance("beryl-operating").is_err());
    }

    #[test]
    fn every_outcome_is_logged_exactly_once() {
        let (orchestrator, ledger, _dir) = setup();
        ledger.seed("A", dec!(100.00), "EUR").unwrap();

        let committed = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "x"),
                &metadata(&[("amount", "10.00"), ("fromAccount", "A"), ("toAccount", "B")]),
                &audit("user-1"),
            )
            .unwrap();
        let rolled_back = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "x"),
                &metadata(&[("amount", "9999.00"), ("fromAccount", "A"), ("toAccount", "B")]),
                &audit("user-2"),
            )
            .unwrap();

        let first = orchestrator
            .db
            .operation_by_trace(&committed.trace_id)
            .unwrap()
            .unwrap();
        assert_eq!(first.status, OperationStatus::Committed);
        assert_eq!(first.requester, "user-1");
        assert_eq!(first.intent, "payment");

        let second = orchestrator
            .db
            .operation_by_trace(&rolled_back.trace_id)
            .unwrap()
            .unwrap();
        assert_eq!(second.status, OperationStatus::RolledBack);

        assert_eq!(orchestrator.db.recent_operations(10).unwrap().len(), 2);
    }

    #[test]
    fn ledger_rows_carry_the_trace_as_correlation() {
        let (orchestrator, ledger, _dir) = setup();
        ledger.seed("A", dec!(100.00), "EUR").unwrap();

        let outcome = orchestrator
            .orchestrate(
                &intent(IntentKind::Payment, "x"),
                &metadata(&[("amount", "10.00"), ("fromAccount", "A"), ("toAccount", "B")]),
                &audit("user-1"),
            )
            .unwrap();

        let rows = ledger.transactions("A", 0, 10, None).unwrap();
        assert_eq!(rows[0].correlation_id, outcome.trace_id);
        assert_eq!(rows[0].nonce.as_deref(), Some("nonce-1"));
    }
}
