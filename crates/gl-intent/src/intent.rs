use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::issue::{ValidationIssue, Warning};
use crate::operation::Operation;

/// Operation parameters as a JSON object (distances, units, expressions,
/// style flags, auto-completion markers).
pub type ParamMap = serde_json::Map<String, Value>;

/// Which stage produced the final interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    /// Trained entity model collaborator.
    ModelBacked,
    /// Ordered regex template match.
    #[default]
    PatternFallback,
    /// Vocabulary-substring scan (lowest-confidence path).
    VocabularyScan,
    /// Merge of entity extraction and context parse.
    ContextMerge,
}

/// The central record flowing through the pipeline: one interpreted
/// command, progressively enriched by each stage.
///
/// `confidence` only ever rises as the record passes through the
/// merge/enhance/disambiguate stages, capped at 1.0. A fresh record is
/// created per command submission; cache hits are value copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_layer: Option<String>,
    #[serde(default)]
    pub parameters: ParamMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_relationship: Option<String>,
    /// Heuristic certainty score, 0.0–1.0.
    pub confidence: f64,
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_issues: Vec<ValidationIssue>,
    #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
    pub optimizations: ParamMap,
    #[serde(default)]
    pub processing_method: ProcessingMethod,
}

impl Intent {
    /// A fresh record for unrecognized input.
    pub fn unknown(text: impl Into<String>) -> Self {
        Self {
            operation: Operation::Unknown,
            input_layer: None,
            secondary_layer: None,
            parameters: ParamMap::new(),
            spatial_relationship: None,
            confidence: 0.0,
            original_text: text.into(),
            warnings: Vec::new(),
            validation_issues: Vec::new(),
            optimizations: ParamMap::new(),
            processing_method: ProcessingMethod::default(),
        }
    }

    /// Raise confidence by `delta`, capped at 1.0. Never lowers it.
    pub fn raise_confidence(&mut self, delta: f64) {
        self.confidence = (self.confidence + delta.max(0.0)).min(1.0);
    }

    /// Fetch a numeric parameter (accepts integer or float JSON values).
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).and_then(Value::as_f64)
    }

    /// Fetch a string parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// True if the given boolean parameter is set.
    pub fn param_flag(&self, key: &str) -> bool {
        self.parameters
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(key.into(), value.into());
    }

    /// The parameter map the risk engine sees: operation parameters plus
    /// the layer fields, so layer-presence rules can fire uniformly.
    pub fn risk_parameters(&self) -> ParamMap {
        let mut params = self.parameters.clone();
        if let Some(ref layer) = self.input_layer {
            params.insert("input_layer".into(), Value::String(layer.clone()));
        }
        if let Some(ref layer) = self.secondary_layer {
            params.insert("overlay_layer".into(), Value::String(layer.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intent_roundtrip() {
        let mut intent = Intent::unknown("buffer rivers by 500 meters");
        intent.operation = Operation::Buffer;
        intent.input_layer = Some("rivers".into());
        intent.set_param("distance", 500.0);
        intent.confidence = 0.8;

        let json = serde_json::to_string(&intent).unwrap();
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.operation, Operation::Buffer);
        assert_eq!(back.input_layer.as_deref(), Some("rivers"));
        assert_eq!(back.param_f64("distance"), Some(500.0));
    }

    #[test]
    fn raise_confidence_caps_at_one() {
        let mut intent = Intent::unknown("x");
        intent.confidence = 0.95;
        intent.raise_confidence(0.2);
        assert_eq!(intent.confidence, 1.0);
    }

    #[test]
    fn raise_confidence_never_lowers() {
        let mut intent = Intent::unknown("x");
        intent.confidence = 0.5;
        intent.raise_confidence(-0.3);
        assert_eq!(intent.confidence, 0.5);
    }

    #[test]
    fn param_accessors() {
        let mut intent = Intent::unknown("x");
        intent.set_param("distance", json!(250));
        intent.set_param("unit", "meters");
        intent.set_param("dissolve", true);
        assert_eq!(intent.param_f64("distance"), Some(250.0));
        assert_eq!(intent.param_str("unit"), Some("meters"));
        assert!(intent.param_flag("dissolve"));
        assert!(!intent.param_flag("missing"));
    }

    #[test]
    fn risk_parameters_include_layers() {
        let mut intent = Intent::unknown("clip roads with parcels");
        intent.operation = Operation::Clip;
        intent.input_layer = Some("roads".into());
        intent.secondary_layer = Some("parcels".into());
        let params = intent.risk_parameters();
        assert_eq!(params["input_layer"], "roads");
        assert_eq!(params["overlay_layer"], "parcels");
    }
}
