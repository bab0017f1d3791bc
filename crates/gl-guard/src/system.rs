//! The composed guard system: prevention + transaction log + error log.

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use gl_intent::intent::ParamMap;
use gl_intent::{GlResult, Intent, ValidationIssue};

use crate::error_log::{ErrorLog, ErrorStatistics};
use crate::prevention::RiskEngine;
use crate::transaction::{TransactionLog, TransactionRecord};

/// Outcome of validating a command: whether it may run, the issue list,
/// and remediation suggestions for whatever was found.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
}

/// Integrated safety net wrapping operation execution.
///
/// Explicitly constructed and passed by reference — never a process
/// singleton — so tests get isolated instances with their own log
/// directories.
pub struct GuardSystem {
    error_log: Arc<ErrorLog>,
    transactions: TransactionLog,
    prevention: RiskEngine,
}

impl GuardSystem {
    /// Open a guard system over a log directory.
    pub fn open(log_dir: &Path, max_snapshots: usize) -> GlResult<Self> {
        let error_log = Arc::new(ErrorLog::open(log_dir)?);
        let transactions = TransactionLog::open(log_dir, max_snapshots)?;
        let prevention = RiskEngine::with_default_rules(error_log.clone());
        Ok(Self {
            error_log,
            transactions,
            prevention,
        })
    }

    pub fn prevention(&self) -> &RiskEngine {
        &self.prevention
    }

    pub fn transactions(&self) -> &TransactionLog {
        &self.transactions
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Log an operation attempt: risk-check it, record the transaction
    /// (optionally with a state snapshot), and append a correlated
    /// action record to the error timeline. Returns the transaction id.
    pub fn log_operation(
        &self,
        operation_type: &str,
        parameters: ParamMap,
        result: Option<Value>,
        state_data: Option<&Value>,
    ) -> String {
        let operation = operation_type.parse().unwrap_or_default();
        let risks = self.prevention.check_operation_risks(operation, &parameters);

        let transaction_id =
            self.transactions
                .log_operation(operation_type, parameters.clone(), result, state_data);

        self.error_log.log_action(
            operation_type,
            json!({
                "parameters": parameters,
                "transaction_id": transaction_id,
                "risks_detected": risks,
            }),
        );

        transaction_id
    }

    /// Log an error, attaching recent transactions (and the operation
    /// that preceded the error) for pattern correlation.
    pub fn log_error(
        &self,
        error_type: &str,
        error_message: &str,
        traceback: Option<String>,
        mut context: ParamMap,
    ) {
        if !context.contains_key("recent_transactions") {
            let recent: Vec<TransactionRecord> = self.transactions.recent_operations(5);
            if let Ok(value) = serde_json::to_value(&recent) {
                context.insert("recent_transactions".into(), value);
            }
        }
        if !context.contains_key("preceding_operation") {
            let last = self.transactions.recent_operations(1);
            if let Some(last) = last.first() {
                context.insert(
                    "preceding_operation".into(),
                    last.operation_type.clone().into(),
                );
            }
        }

        self.error_log
            .log_error(error_type, error_message, traceback, context);
    }

    /// Validate an interpreted command before execution.
    pub fn validate_nlp_command(
        &self,
        intent: &Intent,
        available_layers: &[String],
    ) -> ValidationOutcome {
        let issues = self.prevention.validate_nlp_command(intent);
        let suggestions = if issues.is_empty() {
            Vec::new()
        } else {
            self.prevention
                .get_alternative_suggestions(intent, &issues, available_layers)
        };
        let is_valid = !self.prevention.should_prevent_execution(&issues);

        ValidationOutcome {
            is_valid,
            issues,
            suggestions,
        }
    }

    /// Capture a full state snapshot as its own transaction.
    pub fn capture_state(&self, state: &Value) -> String {
        self.transactions
            .log_operation("state_snapshot", ParamMap::new(), None, Some(state))
    }

    /// Roll back to the latest loadable state snapshot. The rollback
    /// itself is logged as an operation.
    pub fn rollback_to_last_state(&self) -> Option<(String, Value)> {
        let (transaction_id, state) = self.transactions.get_latest_state_snapshot()?;

        let mut params = ParamMap::new();
        params.insert("target_transaction".into(), transaction_id.clone().into());
        self.log_operation("rollback", params, None, None);

        Some((transaction_id, state))
    }

    /// State for rolling back to a specific transaction.
    pub fn rollback_to_transaction(&self, transaction_id: &str) -> Option<Value> {
        self.transactions.rollback_to_transaction(transaction_id)
    }

    pub fn error_statistics(&self) -> ErrorStatistics {
        self.error_log.statistics()
    }
}
