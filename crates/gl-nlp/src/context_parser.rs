//! Context-aware command parsing.
//!
//! Independent of the entity recognizer: maps raw text to a coarse
//! operation tag and matches layer-name mentions against the session's
//! active layers.

use serde::{Deserialize, Serialize};

use gl_intent::intent::ParamMap;
use gl_intent::{units, GisContext, Operation};

use crate::vocab::{
    self, CONTEXT_OP_CONF, CONTEXT_UNKNOWN_CONF, ENTITY_FOUND_DELTA,
};

/// Intent fragment produced from context alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFragment {
    pub operation: Operation,
    /// All active layers mentioned in the text, in mention order.
    pub layers: Vec<String>,
    /// First mentioned layer (input-before-output heuristic).
    pub input_layer: Option<String>,
    /// Second mentioned layer, if any.
    pub secondary_layer: Option<String>,
    pub parameters: ParamMap,
    pub spatial_relationship: Option<String>,
    pub confidence: f64,
    pub original_text: String,
}

/// Identify active layers mentioned in the text.
///
/// Priority order: exact substring match on the full layer name first;
/// only if none match, token-based matching on `_`/`-`/whitespace-split
/// name tokens longer than 3 characters. Mention order is preserved:
/// the first candidate becomes the input layer, the second the
/// secondary layer.
pub fn identify_layers(text: &str, active_layers: &[String]) -> Vec<String> {
    let mut identified: Vec<(usize, String)> = Vec::new();

    for layer in active_layers {
        if let Some(pos) = text.find(layer.as_str()) {
            identified.push((pos, layer.clone()));
        }
    }

    if identified.is_empty() {
        let lower = text.to_lowercase();
        for layer in active_layers {
            let name = layer.to_lowercase();
            let token_pos = name
                .split(['_', '-', ' '])
                .filter(|t| t.len() > 3)
                .filter_map(|t| lower.find(t))
                .min();
            if let Some(pos) = token_pos {
                identified.push((pos, layer.clone()));
            }
        }
    }

    identified.sort_by_key(|(pos, _)| *pos);
    identified.into_iter().map(|(_, layer)| layer).collect()
}

/// Extract numeric parameters (currently distances) from text,
/// canonicalized to meters.
pub fn extract_numeric_parameters(text: &str) -> ParamMap {
    let mut parameters = ParamMap::new();
    if let Some(caps) = vocab::DISTANCE_RE.captures(text)
        && let Some(distance) = units::parse_distance(&caps[1], &caps[2])
    {
        parameters.insert("distance".into(), distance.into());
        parameters.insert("unit".into(), "meters".into());
    }
    parameters
}

/// Parse a command into a context fragment against the session state.
pub fn parse_command(text: &str, context: &GisContext) -> ContextFragment {
    let active: Vec<String> = context
        .active_layers
        .iter()
        .map(|l| l.name.clone())
        .collect();

    let operation = vocab::identify_operation(text);
    let layers = identify_layers(text, &active);

    let mut confidence = if operation.is_known() {
        CONTEXT_OP_CONF
    } else {
        CONTEXT_UNKNOWN_CONF
    };
    if !layers.is_empty() {
        confidence = (confidence + ENTITY_FOUND_DELTA).min(1.0);
    }

    ContextFragment {
        operation,
        input_layer: layers.first().cloned(),
        secondary_layer: layers.get(1).cloned(),
        layers,
        parameters: extract_numeric_parameters(text),
        spatial_relationship: vocab::identify_spatial_relationship(text).map(String::from),
        confidence,
        original_text: text.to_string(),
    }
}
