//! Proactive risk detection and command validation.
//!
//! A pure rule evaluator: pluggable predicates flag structurally
//! invalid or historically error-prone operations before execution, and
//! `should_prevent_execution` decides whether the aggregate issue list
//! blocks the command.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use gl_intent::intent::ParamMap;
use gl_intent::{Intent, IssueKind, Operation, Severity, ValidationIssue};

use crate::error_log::ErrorLog;

/// Buffer distance (meters) above which the default rule flags risk.
pub const RISKY_BUFFER_DISTANCE: f64 = 10_000.0;
/// Feature count above which heavy-layer operations are flagged.
pub const RISKY_FEATURE_COUNT: f64 = 10_000.0;
/// Confidence below which validation attaches a warning.
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Which operations a risk rule applies to.
#[derive(Debug, Clone)]
pub enum Applicability {
    All,
    Only(HashSet<Operation>),
}

impl Applicability {
    pub fn only(operations: &[Operation]) -> Self {
        Self::Only(operations.iter().copied().collect())
    }

    fn applies_to(&self, operation: Operation) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(&operation),
        }
    }
}

type Predicate = Box<dyn Fn(Operation, &ParamMap) -> bool + Send + Sync>;

/// One registered risk detection rule.
pub struct RiskRule {
    pub rule_id: String,
    pub message: String,
    pub applicability: Applicability,
    predicate: Predicate,
}

impl RiskRule {
    pub fn new(
        rule_id: impl Into<String>,
        message: impl Into<String>,
        applicability: Applicability,
        predicate: impl Fn(Operation, &ParamMap) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            applicability,
            predicate: Box::new(predicate),
        }
    }
}

/// Required parameters per operation, as seen in the risk-parameter map.
pub fn required_parameters(operation: Operation) -> &'static [&'static str] {
    match operation {
        Operation::Buffer => &["input_layer", "distance"],
        Operation::Clip | Operation::Intersection | Operation::Union => {
            &["input_layer", "overlay_layer"]
        }
        Operation::Select => &["input_layer", "expression"],
        _ => &[],
    }
}

/// Rule-based risk evaluator.
pub struct RiskEngine {
    rules: Mutex<Vec<RiskRule>>,
}

impl RiskEngine {
    /// An engine pre-loaded with the default rules. The error log feeds
    /// the "historically error-prone operation" heuristic.
    pub fn with_default_rules(error_log: Arc<ErrorLog>) -> Self {
        let engine = Self {
            rules: Mutex::new(Vec::new()),
        };

        engine.add_risk_rule(RiskRule::new(
            "buffer_distance_too_large",
            "Buffer distance is very large (>10km), which may cause performance issues or memory errors.",
            Applicability::only(&[Operation::Buffer]),
            |operation, params| {
                operation == Operation::Buffer
                    && params
                        .get("distance")
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0)
                        > RISKY_BUFFER_DISTANCE
            },
        ));

        engine.add_risk_rule(RiskRule::new(
            "complex_geometry",
            "Operation on a layer with more than 10,000 features may be slow or cause memory issues.",
            Applicability::only(&[
                Operation::Clip,
                Operation::Intersection,
                Operation::Union,
                Operation::Buffer,
            ]),
            |_, params| {
                params.contains_key("input_layer")
                    && params
                        .get("input_layer_feature_count")
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0)
                        > RISKY_FEATURE_COUNT
            },
        ));

        engine.add_risk_rule(RiskRule::new(
            "missing_required_parameters",
            "Operation is missing required parameters.",
            Applicability::All,
            |operation, params| {
                required_parameters(operation)
                    .iter()
                    .any(|name| !params.contains_key(*name))
            },
        ));

        engine.add_risk_rule(RiskRule::new(
            "error_prone_operation",
            "This operation has frequently caused errors in the past.",
            Applicability::All,
            move |operation, _| {
                let stats = error_log.statistics();
                stats.error_types.values().any(|type_stats| {
                    type_stats.most_common_preceding_operation.as_deref()
                        == Some(operation.as_str())
                })
            },
        ));

        engine
    }

    /// An engine with no rules registered (for tests and custom setups).
    pub fn empty() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
        }
    }

    /// Register an additional risk rule. Rules are independent — new
    /// detectors never require modifying existing ones.
    pub fn add_risk_rule(&self, rule: RiskRule) {
        self.rules.lock().expect("risk rules mutex poisoned").push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.lock().expect("risk rules mutex poisoned").len()
    }

    /// Remove all rules (setup/cleanup only).
    pub fn clear_rules(&self) {
        self.rules.lock().expect("risk rules mutex poisoned").clear();
    }

    /// Evaluate every applicable rule against an operation. A panicking
    /// predicate is isolated and skipped so one bad rule cannot prevent
    /// the others from running.
    pub fn check_operation_risks(
        &self,
        operation: Operation,
        parameters: &ParamMap,
    ) -> Vec<ValidationIssue> {
        let rules = self.rules.lock().expect("risk rules mutex poisoned");
        let mut risks = Vec::new();

        for rule in rules.iter() {
            if !rule.applicability.applies_to(operation) {
                continue;
            }
            let fired = catch_unwind(AssertUnwindSafe(|| (rule.predicate)(operation, parameters)));
            match fired {
                Ok(true) => risks.push(ValidationIssue::warning(
                    IssueKind::Risk(rule.rule_id.clone()),
                    rule.message.clone(),
                )),
                Ok(false) => {}
                Err(_) => {
                    tracing::error!(rule_id = %rule.rule_id, "risk rule panicked, skipping");
                }
            }
        }
        risks
    }

    /// Validate an interpreted command before execution: structural
    /// checks plus every applicable risk rule.
    pub fn validate_nlp_command(&self, intent: &Intent) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if !intent.operation.is_known() {
            issues.push(ValidationIssue::error(
                IssueKind::UnrecognizedOperation,
                "The operation type was not recognized.",
            ));
            return issues;
        }

        if intent.confidence < LOW_CONFIDENCE_THRESHOLD {
            issues.push(ValidationIssue::warning(
                IssueKind::LowConfidence,
                format!(
                    "Low confidence in command interpretation ({:.2}).",
                    intent.confidence
                ),
            ));
        }

        if intent.input_layer.is_none() {
            issues.push(ValidationIssue::error(
                IssueKind::MissingInputLayer,
                "No input layer was identified in the command.",
            ));
        }

        match intent.operation {
            Operation::Buffer => {
                if !intent.parameters.contains_key("distance") {
                    issues.push(ValidationIssue::error(
                        IssueKind::MissingParameter,
                        "No buffer distance specified.",
                    ));
                }
            }
            Operation::Clip | Operation::Intersection | Operation::Union => {
                if intent.secondary_layer.is_none() {
                    issues.push(ValidationIssue::error(
                        IssueKind::MissingSecondaryLayer,
                        format!(
                            "No overlay layer specified for {} operation.",
                            intent.operation
                        ),
                    ));
                }
            }
            Operation::Select => {
                if intent.spatial_relationship.is_none()
                    && !intent.parameters.contains_key("expression")
                {
                    issues.push(ValidationIssue::warning(
                        IssueKind::MissingSelectionCriteria,
                        "No selection criteria specified.",
                    ));
                }
            }
            _ => {}
        }

        let risks = self.check_operation_risks(intent.operation, &intent.risk_parameters());
        issues.extend(risks);
        issues
    }

    /// True iff at least one issue is an error; warnings never block.
    pub fn should_prevent_execution(&self, issues: &[ValidationIssue]) -> bool {
        issues.iter().any(|issue| issue.severity == Severity::Error)
    }

    /// Template-based remediation text for each issue.
    pub fn get_alternative_suggestions(
        &self,
        intent: &Intent,
        issues: &[ValidationIssue],
        available_layers: &[String],
    ) -> Vec<String> {
        let mut suggestions = Vec::new();
        let operation = intent.operation;
        let layer_list = available_layers
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        for issue in issues {
            match &issue.kind {
                IssueKind::UnrecognizedOperation => {
                    suggestions.push(
                        "Try specifying an operation like 'buffer', 'clip', 'select', or 'intersection'"
                            .into(),
                    );
                }
                IssueKind::MissingInputLayer => {
                    if layer_list.is_empty() {
                        suggestions.push("Try specifying a layer name for the operation".into());
                    } else {
                        suggestions.push(format!(
                            "Try specifying a layer name, such as: '{operation} {layer_list}'"
                        ));
                    }
                }
                IssueKind::MissingSecondaryLayer if operation.requires_overlay() => {
                    if layer_list.is_empty() {
                        suggestions.push(format!(
                            "Try specifying both input and overlay layers for the {operation} operation"
                        ));
                    } else {
                        suggestions.push(format!(
                            "Try specifying which layer to use with {operation}, such as: '{operation} [input] with {layer_list}'"
                        ));
                    }
                }
                IssueKind::MissingParameter if operation == Operation::Buffer => {
                    suggestions.push(
                        "Try specifying a buffer distance, such as: 'buffer by 100 meters'".into(),
                    );
                }
                IssueKind::Risk(rule_id) if rule_id == "buffer_distance_too_large" => {
                    let current = intent.param_f64("distance").unwrap_or(0.0);
                    suggestions.push(format!(
                        "Try using a smaller buffer distance (current: {current}), such as: 'buffer by 1000 meters'"
                    ));
                }
                _ => {}
            }
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> (RiskEngine, TempDir) {
        let dir = TempDir::new().unwrap();
        let error_log = Arc::new(ErrorLog::open(dir.path()).unwrap());
        (RiskEngine::with_default_rules(error_log), dir)
    }

    fn params(pairs: &[(&str, serde_json::Value)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn default_rules_registered() {
        let (engine, _dir) = engine();
        assert_eq!(engine.rule_count(), 4);
    }

    #[test]
    fn large_buffer_distance_flagged() {
        let (engine, _dir) = engine();
        let risks = engine.check_operation_risks(
            Operation::Buffer,
            &params(&[
                ("input_layer", json!("roads")),
                ("distance", json!(50_000.0)),
            ]),
        );
        assert!(risks
            .iter()
            .any(|r| r.kind == IssueKind::Risk("buffer_distance_too_large".into())));
    }

    #[test]
    fn small_buffer_not_flagged() {
        let (engine, _dir) = engine();
        let risks = engine.check_operation_risks(
            Operation::Buffer,
            &params(&[("input_layer", json!("roads")), ("distance", json!(500.0))]),
        );
        assert!(risks
            .iter()
            .all(|r| r.kind != IssueKind::Risk("buffer_distance_too_large".into())));
    }

    #[test]
    fn heavy_layer_flagged_for_overlays_only() {
        let (engine, _dir) = engine();
        let heavy = params(&[
            ("input_layer", json!("parcels")),
            ("overlay_layer", json!("zones")),
            ("input_layer_feature_count", json!(60_000)),
        ]);
        let risks = engine.check_operation_risks(Operation::Clip, &heavy);
        assert!(risks
            .iter()
            .any(|r| r.kind == IssueKind::Risk("complex_geometry".into())));

        // Select is outside this rule's applicability.
        let risks = engine.check_operation_risks(Operation::Select, &heavy);
        assert!(risks
            .iter()
            .all(|r| r.kind != IssueKind::Risk("complex_geometry".into())));
    }

    #[test]
    fn missing_required_parameters_flagged() {
        let (engine, _dir) = engine();
        let risks =
            engine.check_operation_risks(Operation::Buffer, &params(&[("distance", json!(100))]));
        assert!(risks
            .iter()
            .any(|r| r.kind == IssueKind::Risk("missing_required_parameters".into())));
    }

    #[test]
    fn error_prone_operation_flagged_from_statistics() {
        let dir = TempDir::new().unwrap();
        let error_log = Arc::new(ErrorLog::open(dir.path()).unwrap());
        for _ in 0..3 {
            error_log.log_error(
                "geometry_error",
                "boom",
                None,
                params(&[("preceding_operation", json!("union"))]),
            );
        }
        let engine = RiskEngine::with_default_rules(error_log);

        let complete = params(&[
            ("input_layer", json!("a")),
            ("overlay_layer", json!("b")),
        ]);
        let risks = engine.check_operation_risks(Operation::Union, &complete);
        assert!(risks
            .iter()
            .any(|r| r.kind == IssueKind::Risk("error_prone_operation".into())));

        let risks = engine.check_operation_risks(Operation::Buffer, &params(&[
            ("input_layer", json!("a")),
            ("distance", json!(10)),
        ]));
        assert!(risks
            .iter()
            .all(|r| r.kind != IssueKind::Risk("error_prone_operation".into())));
    }

    #[test]
    fn panicking_rule_does_not_suppress_others() {
        let (engine, _dir) = engine();
        engine.add_risk_rule(RiskRule::new(
            "bad_rule",
            "never seen",
            Applicability::All,
            |_, _| panic!("malformed predicate"),
        ));
        let risks =
            engine.check_operation_risks(Operation::Buffer, &params(&[("distance", json!(1))]));
        // missing_required_parameters still fired despite the panic.
        assert!(risks
            .iter()
            .any(|r| r.kind == IssueKind::Risk("missing_required_parameters".into())));
    }

    #[test]
    fn pluggable_rule_fires() {
        let (engine, _dir) = engine();
        engine.add_risk_rule(RiskRule::new(
            "no_friday_deploys",
            "Not today.",
            Applicability::only(&[Operation::Union]),
            |_, _| true,
        ));
        let risks = engine.check_operation_risks(
            Operation::Union,
            &params(&[("input_layer", json!("a")), ("overlay_layer", json!("b"))]),
        );
        assert!(risks
            .iter()
            .any(|r| r.kind == IssueKind::Risk("no_friday_deploys".into())));
    }

    // ── validate_nlp_command ────────────────────────────────────

    fn buffer_intent(distance: Option<f64>) -> Intent {
        let mut intent = Intent::unknown("buffer roads");
        intent.operation = Operation::Buffer;
        intent.input_layer = Some("roads".into());
        intent.confidence = 0.8;
        if let Some(d) = distance {
            intent.set_param("distance", d);
        }
        intent
    }

    #[test]
    fn unknown_operation_is_immediate_error() {
        let (engine, _dir) = engine();
        let issues = engine.validate_nlp_command(&Intent::unknown("gibberish"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(engine.should_prevent_execution(&issues));
    }

    #[test]
    fn missing_distance_prevents_execution() {
        let (engine, _dir) = engine();
        let issues = engine.validate_nlp_command(&buffer_intent(None));
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::MissingParameter && i.severity == Severity::Error));
        assert!(engine.should_prevent_execution(&issues));
    }

    #[test]
    fn warnings_alone_do_not_prevent() {
        let (engine, _dir) = engine();
        let mut intent = buffer_intent(Some(50_000.0));
        intent.confidence = 0.5;
        let issues = engine.validate_nlp_command(&intent);
        assert!(!issues.is_empty());
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert!(!engine.should_prevent_execution(&issues));
    }

    #[test]
    fn overlay_missing_secondary_suggestions_name_layers() {
        let (engine, _dir) = engine();
        let mut intent = Intent::unknown("clip the roads layer");
        intent.operation = Operation::Clip;
        intent.input_layer = Some("roads".into());
        intent.confidence = 0.8;

        let issues = engine.validate_nlp_command(&intent);
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::MissingSecondaryLayer));
        assert!(engine.should_prevent_execution(&issues));

        let suggestions = engine.get_alternative_suggestions(
            &intent,
            &issues,
            &["parcels".to_string(), "zones".to_string()],
        );
        assert!(suggestions.iter().any(|s| s.contains("clip") && s.contains("parcels")));
    }

    #[test]
    fn oversized_buffer_suggestion_cites_current_distance() {
        let (engine, _dir) = engine();
        let intent = buffer_intent(Some(50_000.0));
        let issues = engine.validate_nlp_command(&intent);
        let suggestions = engine.get_alternative_suggestions(&intent, &issues, &[]);
        assert!(suggestions.iter().any(|s| s.contains("50000")));
    }
}
