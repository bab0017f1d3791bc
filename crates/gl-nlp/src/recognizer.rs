//! Entity recognition — extract action, targets, and parameters from text.
//!
//! Two variants behind one output shape: a trained model collaborator
//! (`EntityModel`, may be absent) and the always-available
//! `PatternRecognizer` built on ordered regex templates. Neither ever
//! fails: the worst case is a record with `action: None`.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use gl_intent::intent::ParamMap;
use gl_intent::units;
use gl_intent::ProcessingMethod;

use crate::vocab::{
    self, ENTITY_FOUND_DELTA, OP_FOUND_DELTA, PATTERN_BASE_CONF, UNIT_WORDS, VOCAB_SCAN_BASE_CONF,
};

/// What the recognizer pulled out of raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityExtraction {
    /// The GIS action term ("buffer", "clip", ...), None if unidentified.
    pub action: Option<String>,
    /// Main layer or data the command operates on.
    pub primary_target: Option<String>,
    /// Overlay/second layer for two-layer operations.
    pub secondary_target: Option<String>,
    /// Extracted parameters (distance in meters, expression, ...).
    pub parameters: ParamMap,
    /// Extraction certainty, 0.0–1.0.
    pub confidence: f64,
    pub processing_method: ProcessingMethod,
}

impl EntityExtraction {
    fn empty() -> Self {
        Self {
            action: None,
            primary_target: None,
            secondary_target: None,
            parameters: ParamMap::new(),
            confidence: 0.0,
            processing_method: ProcessingMethod::PatternFallback,
        }
    }
}

/// Trait for the trained entity-tagger collaborator.
///
/// Returns None when the model cannot produce an extraction; the caller
/// falls back to the pattern recognizer. The model may be entirely
/// absent — the pipeline degrades gracefully, never hard-fails.
#[async_trait]
pub trait EntityModel: Send + Sync {
    /// Extract entities from natural-language text.
    async fn extract(
        &self,
        text: &str,
        active_layers: &[String],
        crs: Option<&str>,
    ) -> Option<EntityExtraction>;

    /// Name of this model (for logging/audit).
    fn name(&self) -> &str;
}

// ── Pattern templates ─────────────────────────────────────────

/// "create a 500 meter buffer around the rivers layer"
static BUFFER_VALUE_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:create|make)\s+(?:a|the)?\s*(\d+\.?\d*)\s*({UNIT_WORDS})\s+buffer\s+(?:of|around|for)\s+(?:the|a)?\s*([\w\s]+)"
    ))
    .unwrap()
});

/// "buffer the rivers layer by 500 meters"
static BUFFER_TARGET_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)buffer\s+(?:the|a)?\s*([\w\s]+?)\s+(?:by|of|with)\s+(\d+\.?\d*)\s*({UNIT_WORDS})\b"
    ))
    .unwrap()
});

/// "make a buffer around rivers by 500 meters"
static BUFFER_SPELLED_OUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:create|make)\s+(?:a|the)?\s*buffer\s+(?:of|around|for)\s+(?:the|a)?\s*([\w\s]+?)\s+(?:by|of|with)\s+(\d+\.?\d*)\s*({UNIT_WORDS})\b"
    ))
    .unwrap()
});

/// "clip the roads layer with the city boundary"
static CLIP_WITH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)clip\s+(?:the|a)?\s*([\w\s]+?)\s+(?:with|using|by)\s+(?:the|a)?\s*([\w\s]+)")
        .unwrap()
});

/// "extract the buildings from the flood zone"
static CLIP_EXTRACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)extract\s+(?:the|a)?\s*([\w\s]+?)\s+from\s+(?:the|a)?\s*([\w\s]+)").unwrap()
});

/// "find the intersection of parcels and flood zones"
static INTERSECTION_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:find|get|compute|calculate)\s+(?:the\s+)?intersection\s+(?:of|between)\s+(?:the|a)?\s*([\w\s]+?)\s+(?:and|with)\s+(?:the|a)?\s*([\w\s]+)",
    )
    .unwrap()
});

/// "intersect roads with parcels"
static INTERSECT_WITH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)intersect\s+(?:the|a)?\s*([\w\s]+?)\s+(?:with|and)\s+(?:the|a)?\s*([\w\s]+)")
        .unwrap()
});

/// "union of parcels and easements"
static UNION_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)union\s+(?:of\s+)?(?:the|a)?\s*([\w\s]+?)\s+(?:and|with)\s+(?:the|a)?\s*([\w\s]+)")
        .unwrap()
});

/// "select from roads where type = highway"
static SELECT_WHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)select\s+(?:from|in)?\s*(?:the|a)?\s*([\w\s]+?)\s+where\s+(.*)").unwrap()
});

/// "find all parcels where area > 1000"
static FIND_WHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)find\s+(?:all\s+)?([\w\s]+?)\s+where\s+(.*)").unwrap()
});

/// "show me all buildings that are taller than 20"
static SHOW_THAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)show\s+(?:me\s+)?(?:all\s+)?([\w\s]+?)\s+(?:that|which)\s+(.*)").unwrap()
});

/// Strip articles and trailing "layer(s)" noise from a captured phrase.
pub fn clean_layer_phrase(phrase: &str) -> String {
    let mut tokens: Vec<&str> = phrase.split_whitespace().collect();
    while tokens
        .first()
        .is_some_and(|t| matches!(t.to_lowercase().as_str(), "the" | "a" | "an"))
    {
        tokens.remove(0);
    }
    while tokens
        .last()
        .is_some_and(|t| matches!(t.to_lowercase().as_str(), "layer" | "layers"))
    {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Pattern-based entity recognizer — the always-available fallback tier.
#[derive(Debug, Default)]
pub struct PatternRecognizer;

impl PatternRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Extract a best-effort entity record from text. Never fails;
    /// `action: None` means no operation was identified.
    pub fn extract(&self, text: &str) -> EntityExtraction {
        if let Some(result) = try_buffer(text) {
            return result;
        }
        if let Some(result) = try_overlay(text) {
            return result;
        }
        if let Some(result) = try_select(text) {
            return result;
        }
        vocabulary_scan(text)
    }
}

fn template_extraction(action: &str) -> EntityExtraction {
    EntityExtraction {
        action: Some(action.to_string()),
        confidence: PATTERN_BASE_CONF + OP_FOUND_DELTA,
        processing_method: ProcessingMethod::PatternFallback,
        ..EntityExtraction::empty()
    }
}

fn try_buffer(text: &str) -> Option<EntityExtraction> {
    let (target, value, unit) = if let Some(caps) = BUFFER_VALUE_FIRST.captures(text) {
        (
            caps[3].to_string(),
            caps[1].to_string(),
            caps[2].to_string(),
        )
    } else if let Some(caps) = BUFFER_SPELLED_OUT.captures(text) {
        (
            caps[1].to_string(),
            caps[2].to_string(),
            caps[3].to_string(),
        )
    } else if let Some(caps) = BUFFER_TARGET_FIRST.captures(text) {
        (
            caps[1].to_string(),
            caps[2].to_string(),
            caps[3].to_string(),
        )
    } else {
        return None;
    };

    let mut result = template_extraction("buffer");
    let target = clean_layer_phrase(&target);
    if !target.is_empty() {
        result.primary_target = Some(target);
        result.confidence += ENTITY_FOUND_DELTA;
    }
    if let Some(distance) = units::parse_distance(&value, &unit) {
        result.parameters.insert("distance".into(), distance.into());
        result.parameters.insert("unit".into(), "meters".into());
        result.confidence += ENTITY_FOUND_DELTA;
    }
    result.confidence = result.confidence.min(1.0);
    Some(result)
}

fn try_overlay(text: &str) -> Option<EntityExtraction> {
    let overlay_templates: &[(&str, &LazyLock<Regex>)] = &[
        ("intersection", &INTERSECTION_OF),
        ("intersection", &INTERSECT_WITH),
        ("clip", &CLIP_WITH),
        ("clip", &CLIP_EXTRACT),
        ("union", &UNION_OF),
    ];

    for (action, template) in overlay_templates {
        if let Some(caps) = template.captures(text) {
            let mut result = template_extraction(action);
            let primary = clean_layer_phrase(&caps[1]);
            let secondary = clean_layer_phrase(&caps[2]);
            if !primary.is_empty() {
                result.primary_target = Some(primary);
                result.confidence += ENTITY_FOUND_DELTA;
            }
            if !secondary.is_empty() {
                result.secondary_target = Some(secondary);
                result.confidence += ENTITY_FOUND_DELTA;
            }
            result.confidence = result.confidence.min(1.0);
            return Some(result);
        }
    }
    None
}

fn try_select(text: &str) -> Option<EntityExtraction> {
    for template in [&SELECT_WHERE, &FIND_WHERE, &SHOW_THAT] {
        if let Some(caps) = template.captures(text) {
            let mut result = template_extraction("select");
            let target = clean_layer_phrase(&caps[1]);
            let expression = caps[2].trim().to_string();
            if !target.is_empty() {
                result.primary_target = Some(target);
                result.confidence += ENTITY_FOUND_DELTA;
            }
            if !expression.is_empty() {
                result
                    .parameters
                    .insert("expression".into(), expression.into());
                result.confidence += ENTITY_FOUND_DELTA;
            }
            result.confidence = result.confidence.min(1.0);
            return Some(result);
        }
    }
    None
}

/// Last-resort scan: look for any operation synonym as a substring.
/// Capped at a low baseline — this path identifies the action only.
fn vocabulary_scan(text: &str) -> EntityExtraction {
    let mut result = EntityExtraction {
        processing_method: ProcessingMethod::VocabularyScan,
        ..EntityExtraction::empty()
    };

    let operation = vocab::identify_operation(text);
    if operation.is_known() {
        result.action = Some(operation.as_str().to_string());
        result.confidence = VOCAB_SCAN_BASE_CONF + OP_FOUND_DELTA;
    }

    if let Some(caps) = vocab::DISTANCE_RE.captures(text)
        && let Some(distance) = units::parse_distance(&caps[1], &caps[2])
    {
        result.parameters.insert("distance".into(), distance.into());
        result.parameters.insert("unit".into(), "meters".into());
        result.confidence += ENTITY_FOUND_DELTA;
    }

    // Scan tier never exceeds its baseline ceiling.
    result.confidence = result.confidence.min(VOCAB_SCAN_BASE_CONF + OP_FOUND_DELTA);
    result
}
