//! Query parsing — re-validate and enrich interpretations.
//!
//! With an NLP engine available, delegates interpretation to it and then
//! patches what the NLP path missed: regex re-enhancement (only below the
//! confidence gate, to avoid overriding a confident result) and context
//! fill for missing layers and distances. Without an engine, falls back
//! to pattern-only parsing. Every auto-filled field is tagged
//! `auto_completed_<field>` so consumers can tell inferred from stated.

use regex::Regex;
use std::sync::LazyLock;

use gl_intent::{GisContext, Intent, IssueKind, Operation, ProcessingMethod, ValidationIssue};
use gl_nlp::recognizer::{clean_layer_phrase, PatternRecognizer};
use gl_nlp::vocab::{
    DISTANCE_RE, ENHANCE_DELTA, ENHANCE_THRESHOLD, NO_MATCH_CONF, PATTERN_MATCH_CONF,
    SELECT_PATTERN_CONF,
};
use gl_nlp::NlpEngine;

/// Buffer distance above which validation attaches a performance
/// warning (meters).
pub const LARGE_BUFFER_WARNING_METERS: f64 = 10_000.0;

/// "with Y" / "and Y" — secondary layer mentioned after a connective.
static SECONDARY_LAYER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:with|and|using|by|over|against)\s+(?:the|a)?\s*([\w\s]+)").unwrap()
});

/// "where X > Y" style trailing criteria.
static WHERE_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:where|that|which|with)\s+([\w\s]+\s*(?:>|<|=|is|equals|contains|in)\s*[\w\s\.]+)")
        .unwrap()
});

/// Query parser — the pipeline's second interpretation pass.
#[derive(Debug, Default)]
pub struct QueryParser {
    recognizer: PatternRecognizer,
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a command into a structured (possibly incomplete) intent.
    pub async fn parse_query(
        &self,
        text: &str,
        context: &GisContext,
        nlp: Option<&NlpEngine>,
    ) -> Intent {
        let mut intent = match nlp {
            Some(engine) => engine.process_command(text, context).await,
            None => self.parse_with_patterns(text),
        };
        self.enhance_with_patterns(&mut intent, text);
        self.fill_missing_parameters(&mut intent, context);
        intent
    }

    /// Pattern-only fallback used when no NLP engine collaborator is
    /// configured. Degrades gracefully — an unmatched command yields an
    /// Unknown intent at floor confidence.
    fn parse_with_patterns(&self, text: &str) -> Intent {
        let extraction = self.recognizer.extract(text);
        let mut intent = Intent::unknown(text);

        let operation = match extraction.action.as_deref() {
            Some(action) if extraction.processing_method == ProcessingMethod::PatternFallback => {
                action.parse().unwrap_or(Operation::Unknown)
            }
            _ => Operation::Unknown,
        };

        if !operation.is_known() {
            intent.confidence = NO_MATCH_CONF;
            return intent;
        }

        intent.operation = operation;
        intent.input_layer = extraction.primary_target;
        intent.secondary_layer = extraction.secondary_target;
        intent.parameters = extraction.parameters;
        intent.processing_method = ProcessingMethod::PatternFallback;
        intent.confidence = if operation == Operation::Select {
            SELECT_PATTERN_CONF
        } else {
            PATTERN_MATCH_CONF
        };
        intent
    }

    /// Re-apply regex matching for parameters the first pass missed.
    /// Skipped entirely above the confidence gate.
    fn enhance_with_patterns(&self, intent: &mut Intent, text: &str) {
        if intent.confidence > ENHANCE_THRESHOLD {
            return;
        }

        match intent.operation {
            Operation::Buffer => {
                if !intent.parameters.contains_key("distance")
                    && let Some(caps) = DISTANCE_RE.captures(text)
                    && let Some(distance) = gl_intent::units::parse_distance(&caps[1], &caps[2])
                {
                    intent.set_param("distance", distance);
                    intent.set_param("unit", "meters");
                    intent.raise_confidence(ENHANCE_DELTA);
                }
            }
            Operation::Clip | Operation::Intersection | Operation::Union => {
                if intent.secondary_layer.is_none()
                    && let Some(caps) = SECONDARY_LAYER_RE.captures(text)
                {
                    let layer = clean_layer_phrase(&caps[1]);
                    if !layer.is_empty() {
                        intent.secondary_layer = Some(layer);
                        intent.raise_confidence(ENHANCE_DELTA);
                    }
                }
            }
            Operation::Select => {
                if !intent.parameters.contains_key("expression")
                    && let Some(caps) = WHERE_CLAUSE_RE.captures(text)
                {
                    intent.set_param("expression", caps[1].trim());
                    intent.raise_confidence(ENHANCE_DELTA);
                }
            }
            _ => {}
        }
    }

    /// Fill missing fields from session context, tagging each fill.
    fn fill_missing_parameters(&self, intent: &mut Intent, context: &GisContext) {
        if intent.input_layer.is_none() {
            let fallback = context
                .selected_layer
                .clone()
                .or_else(|| context.first_visible_layer().map(String::from));
            if let Some(layer) = fallback {
                tracing::debug!(%layer, "auto-completed input layer from context");
                intent.input_layer = Some(layer);
                intent.set_param("auto_completed_input", true);
            }
        }

        match intent.operation {
            Operation::Buffer => {
                if !intent.parameters.contains_key("distance")
                    && let Some(extent) = context.extent
                {
                    // Default buffer: 1% of the average view dimension.
                    let distance = extent.avg_dimension() * 0.01;
                    intent.set_param("distance", distance);
                    intent.set_param("unit", "meters");
                    intent.set_param("auto_completed_distance", true);
                }
            }
            Operation::Clip | Operation::Intersection | Operation::Union => {
                if intent.secondary_layer.is_none() {
                    let input = intent.input_layer.clone();
                    let other = context
                        .active_layers
                        .iter()
                        .map(|l| l.name.clone())
                        .find(|name| Some(name) != input.as_ref());
                    if let Some(layer) = other {
                        intent.secondary_layer = Some(layer);
                        intent.set_param("auto_completed_secondary", true);
                    }
                }
            }
            _ => {}
        }
    }

    /// Validate an intent for completeness. An unknown operation is an
    /// immediate error that short-circuits the remaining checks.
    pub fn validate_query(&self, intent: &Intent) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if !intent.operation.is_known() {
            issues.push(ValidationIssue::error(
                IssueKind::UnrecognizedOperation,
                "The operation type was not recognized.",
            ));
            return issues;
        }

        if intent.input_layer.is_none() {
            issues.push(ValidationIssue::error(
                IssueKind::MissingInputLayer,
                format!(
                    "No input layer specified for {} operation.",
                    intent.operation
                ),
            ));
        }

        match intent.operation {
            Operation::Buffer => match intent.param_f64("distance") {
                None => issues.push(ValidationIssue::error(
                    IssueKind::MissingParameter,
                    "No buffer distance specified.",
                )),
                Some(d) if d <= 0.0 => issues.push(ValidationIssue::warning(
                    IssueKind::InvalidParameter,
                    "Buffer distance must be greater than zero.",
                )),
                Some(d) if d > LARGE_BUFFER_WARNING_METERS => {
                    issues.push(ValidationIssue::warning(
                        IssueKind::PerformanceRisk,
                        "Very large buffer distance may cause performance issues.",
                    ))
                }
                Some(_) => {}
            },
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
                if !intent.parameters.contains_key("expression")
                    && intent.spatial_relationship.is_none()
                {
                    issues.push(ValidationIssue::error(
                        IssueKind::MissingSelectionCriteria,
                        "No selection criteria specified.",
                    ));
                }
            }
            _ => {}
        }

        if intent.confidence < gl_nlp::vocab::DISAMBIGUATION_THRESHOLD {
            issues.push(ValidationIssue::warning(
                IssueKind::LowConfidence,
                format!(
                    "Low confidence in query interpretation ({:.2}). Please clarify the command.",
                    intent.confidence
                ),
            ));
        }

        issues
    }

    /// Suggest ways to complete a partial query.
    pub fn suggest_completion(&self, intent: &Intent) -> Vec<String> {
        let mut suggestions = Vec::new();
        let operation = intent.operation;

        if !operation.is_known() {
            suggestions.push(
                "Try specifying an operation like 'buffer', 'clip', 'select', or 'intersection'"
                    .to_string(),
            );
            return suggestions;
        }

        if intent.input_layer.is_none() {
            suggestions.push(format!(
                "Specify the input layer for {operation}, e.g., '{operation} the roads layer'"
            ));
        }

        match operation {
            Operation::Buffer => {
                if !intent.parameters.contains_key("distance") {
                    suggestions
                        .push("Specify a buffer distance, e.g., 'buffer by 500 meters'".to_string());
                }
            }
            Operation::Clip | Operation::Intersection | Operation::Union => {
                if intent.secondary_layer.is_none() {
                    suggestions.push(format!(
                        "Specify the overlay layer, e.g., '{operation} with city boundaries'"
                    ));
                }
            }
            Operation::Select => {
                if !intent.parameters.contains_key("expression") {
                    suggestions.push(
                        "Specify selection criteria, e.g., 'where area > 1000' or 'within 500m of rivers'"
                            .to_string(),
                    );
                }
            }
            _ => {}
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gl_intent::{Extent, Severity};

    fn parser() -> QueryParser {
        QueryParser::new()
    }

    #[tokio::test]
    async fn pattern_only_buffer_parse() {
        let ctx = GisContext::with_layers(["rivers"]);
        let intent = parser()
            .parse_query("buffer the rivers layer by 500 meters", &ctx, None)
            .await;
        assert_eq!(intent.operation, Operation::Buffer);
        assert_eq!(intent.input_layer.as_deref(), Some("rivers"));
        assert_eq!(intent.param_f64("distance"), Some(500.0));
        assert_eq!(intent.confidence, PATTERN_MATCH_CONF);
    }

    #[tokio::test]
    async fn pattern_only_unmatched_is_unknown() {
        let ctx = GisContext::default();
        let intent = parser().parse_query("hello there", &ctx, None).await;
        assert_eq!(intent.operation, Operation::Unknown);
        assert_eq!(intent.confidence, NO_MATCH_CONF);
    }

    #[tokio::test]
    async fn nlp_path_is_enhanced_and_filled() {
        let nlp = NlpEngine::new();
        let mut ctx = GisContext::with_layers(["roads", "parcels"]);
        ctx.selected_layer = Some("roads".into());
        let intent = parser()
            .parse_query("clip the roads", &ctx, Some(&nlp))
            .await;
        assert_eq!(intent.operation, Operation::Clip);
        // Secondary auto-completed from the other active layer.
        assert_eq!(intent.secondary_layer.as_deref(), Some("parcels"));
        assert!(intent.param_flag("auto_completed_secondary"));
    }

    #[tokio::test]
    async fn missing_input_filled_from_selected_layer() {
        let nlp = NlpEngine::new();
        let mut ctx = GisContext::default();
        ctx.selected_layer = Some("wetlands".into());
        let intent = parser()
            .parse_query("buffer by 250 meters", &ctx, Some(&nlp))
            .await;
        assert_eq!(intent.input_layer.as_deref(), Some("wetlands"));
    }

    #[tokio::test]
    async fn default_distance_from_extent() {
        let nlp = NlpEngine::new();
        let mut ctx = GisContext::with_layers(["parcels"]);
        ctx.extent = Some(Extent {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 10_000.0,
            ymax: 10_000.0,
        });
        let intent = parser()
            .parse_query("buffer the parcels", &ctx, Some(&nlp))
            .await;
        assert_eq!(intent.param_f64("distance"), Some(100.0)); // 1% of 10k
        assert!(intent.param_flag("auto_completed_distance"));
    }

    #[tokio::test]
    async fn confident_result_not_overridden() {
        let nlp = NlpEngine::new();
        let ctx = GisContext::with_layers(["rivers", "roads"]);
        let intent = parser()
            .parse_query("Buffer the rivers layer by 2 kilometers", &ctx, Some(&nlp))
            .await;
        // Distance came from the first pass, not re-enhancement.
        assert_eq!(intent.param_f64("distance"), Some(2000.0));
        assert_eq!(intent.param_str("unit"), Some("meters"));
    }

    // ── Validation ──────────────────────────────────────────────

    #[test]
    fn unknown_operation_short_circuits() {
        let intent = Intent::unknown("gibberish");
        let issues = parser().validate_query(&intent);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UnrecognizedOperation);
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn buffer_missing_distance_is_error() {
        let mut intent = Intent::unknown("buffer roads");
        intent.operation = Operation::Buffer;
        intent.input_layer = Some("roads".into());
        intent.confidence = 0.7;
        let issues = parser().validate_query(&intent);
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::MissingParameter && i.severity == Severity::Error));
    }

    #[test]
    fn huge_buffer_distance_is_warning_not_error() {
        let mut intent = Intent::unknown("buffer roads by 50 km");
        intent.operation = Operation::Buffer;
        intent.input_layer = Some("roads".into());
        intent.set_param("distance", 50_000.0);
        intent.confidence = 0.8;
        let issues = parser().validate_query(&intent);
        assert!(issues
            .iter()
            .all(|i| i.severity != Severity::Error));
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::PerformanceRisk));
    }

    #[test]
    fn overlay_missing_secondary_is_error() {
        let mut intent = Intent::unknown("clip the roads layer");
        intent.operation = Operation::Clip;
        intent.input_layer = Some("roads".into());
        intent.confidence = 0.8;
        let issues = parser().validate_query(&intent);
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::MissingSecondaryLayer && i.severity == Severity::Error));
    }

    #[test]
    fn select_needs_expression_or_relationship() {
        let mut intent = Intent::unknown("select roads");
        intent.operation = Operation::Select;
        intent.input_layer = Some("roads".into());
        intent.confidence = 0.8;
        let issues = parser().validate_query(&intent);
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::MissingSelectionCriteria));

        intent.spatial_relationship = Some("near".into());
        let issues = parser().validate_query(&intent);
        assert!(issues
            .iter()
            .all(|i| i.kind != IssueKind::MissingSelectionCriteria));
    }

    #[test]
    fn low_confidence_always_warns() {
        let mut intent = Intent::unknown("buffer roads by 100 meters");
        intent.operation = Operation::Buffer;
        intent.input_layer = Some("roads".into());
        intent.set_param("distance", 100.0);
        intent.confidence = 0.5;
        let issues = parser().validate_query(&intent);
        assert!(issues.iter().any(|i| i.kind == IssueKind::LowConfidence));
    }

    // ── Suggestions ─────────────────────────────────────────────

    #[test]
    fn suggestions_for_unknown_operation() {
        let intent = Intent::unknown("gibberish");
        let suggestions = parser().suggest_completion(&intent);
        assert!(suggestions[0].contains("buffer"));
    }

    #[test]
    fn suggestions_for_missing_distance() {
        let mut intent = Intent::unknown("buffer roads");
        intent.operation = Operation::Buffer;
        intent.input_layer = Some("roads".into());
        let suggestions = parser().suggest_completion(&intent);
        assert!(suggestions.iter().any(|s| s.contains("buffer distance")));
    }
}
