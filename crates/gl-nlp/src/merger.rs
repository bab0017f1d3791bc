//! Interpretation merging and disambiguation.
//!
//! Combines the entity recognizer's extraction with the context parser's
//! fragment into one `Intent`, resolving conflicts by confidence, then
//! applies heuristic fallback inference when confidence stays low.

use gl_intent::{GisContext, Intent, Operation, ProcessingMethod};

use crate::context_parser::ContextFragment;
use crate::recognizer::EntityExtraction;
use crate::vocab::{
    self, DISAMBIGUATION_THRESHOLD, INPUT_LAYER_MATCH_DELTA, SECONDARY_LAYER_MATCH_DELTA,
};

/// Verb/keyword co-occurrence hints for low-confidence inference.
/// Only these four operations may be guessed.
const DISAMBIGUATION_HINTS: &[(Operation, &[&str], &[&str])] = &[
    (
        Operation::Buffer,
        &["buffer", "create", "make"],
        &["buffer", "around", "zone", "distance"],
    ),
    (
        Operation::Clip,
        &["clip", "cut", "extract"],
        &["clip", "with", "from", "boundary"],
    ),
    (
        Operation::Select,
        &["select", "find", "show", "choose"],
        &["select", "where", "that", "which"],
    ),
    (
        Operation::Intersection,
        &["intersect", "find", "compute"],
        &["intersection", "overlap", "between"],
    ),
];

/// Resolve a mentioned layer phrase against the active layers.
///
/// Returns the canonical active-layer name when the phrase matches one
/// (exactly, case-insensitively, or by containment either way), plus a
/// flag saying whether the match was confirmed.
fn resolve_layer(phrase: &str, context: &GisContext) -> (String, bool) {
    let lower = phrase.to_lowercase();
    for layer in &context.active_layers {
        let name_lower = layer.name.to_lowercase();
        if lower == name_lower || lower.contains(&name_lower) || name_lower.contains(&lower) {
            return (layer.name.clone(), true);
        }
    }
    (phrase.to_string(), false)
}

/// Merge an entity extraction and a context fragment into one intent.
///
/// Operation comes from the context parser unless it reports Unknown and
/// the entity recognizer identified an action. Targets prefer the entity
/// recognizer, falling back to the context parser. Parameters are a
/// shallow merge with entity values winning. Confidence is the max of
/// both sources, raised when layer mentions are confirmed against the
/// active layers — never lowered.
pub fn merge(
    entity: &EntityExtraction,
    fragment: &ContextFragment,
    text: &str,
    context: &GisContext,
) -> Intent {
    let mut intent = Intent::unknown(text);

    // Operation: context parser first, entity action as tie-break.
    if fragment.operation.is_known() {
        intent.operation = fragment.operation;
        intent.processing_method = ProcessingMethod::ContextMerge;
    } else if let Some(ref action) = entity.action {
        intent.operation = vocab::identify_operation(action);
        intent.processing_method = entity.processing_method;
    }

    // Parameters: context values overridden by entity values.
    intent.parameters = fragment.parameters.clone();
    for (key, value) in &entity.parameters {
        intent.parameters.insert(key.clone(), value.clone());
    }

    intent.spatial_relationship = fragment.spatial_relationship.clone();
    intent.confidence = entity.confidence.max(fragment.confidence);

    // Targets: entity extraction first, context fallback; confirmed
    // mentions are snapped to the canonical active-layer name.
    let input = entity
        .primary_target
        .clone()
        .or_else(|| fragment.input_layer.clone());
    if let Some(phrase) = input {
        let (name, confirmed) = resolve_layer(&phrase, context);
        intent.input_layer = Some(name);
        if confirmed {
            intent.raise_confidence(INPUT_LAYER_MATCH_DELTA);
        }
    }

    let secondary = entity
        .secondary_target
        .clone()
        .or_else(|| fragment.secondary_layer.clone());
    if let Some(phrase) = secondary {
        let (name, confirmed) = resolve_layer(&phrase, context);
        intent.secondary_layer = Some(name);
        if confirmed {
            intent.raise_confidence(SECONDARY_LAYER_MATCH_DELTA);
        }
    }

    intent
}

/// Fallback inference for low-confidence interpretations.
///
/// Infers an operation from verb/keyword co-occurrence (closed set) and
/// defaults the input layer to the first active layer when none was
/// identified. Always stamps `disambiguation_applied` and preserves the
/// pre-disambiguation confidence for audit. Returns whether it ran.
pub fn disambiguate(intent: &mut Intent, context: &GisContext) -> bool {
    if intent.confidence >= DISAMBIGUATION_THRESHOLD {
        return false;
    }

    intent.set_param("original_confidence", intent.confidence);

    if !intent.operation.is_known() {
        let lower = intent.original_text.to_lowercase();
        for (operation, verbs, keywords) in DISAMBIGUATION_HINTS {
            let verb_hit = verbs.iter().any(|v| lower.contains(v));
            let keyword_hit = keywords.iter().any(|k| lower.contains(k));
            if verb_hit && keyword_hit {
                tracing::debug!(operation = %operation, "disambiguation inferred operation");
                intent.operation = *operation;
                break;
            }
        }
    }

    if intent.input_layer.is_none()
        && let Some(first) = context.active_layers.first()
    {
        tracing::debug!(layer = %first.name, "disambiguation defaulted input layer");
        intent.input_layer = Some(first.name.clone());
        intent.set_param("auto_inferred_layer", true);
    }

    intent.set_param("disambiguation_applied", true);
    true
}
