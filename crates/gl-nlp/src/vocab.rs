//! GIS vocabulary and pattern tables.
//!
//! Pure data: operation synonyms, spatial relationship terms, the shared
//! distance regex, and the confidence constants every stage agrees on.
//! Thresholds and deltas live here as named constants because validation
//! behavior depends on their exact values.

use regex::Regex;
use std::sync::LazyLock;

use gl_intent::Operation;

// ── Confidence constants ──────────────────────────────────────

/// Base confidence for a regex template match in the entity recognizer.
pub const PATTERN_BASE_CONF: f64 = 0.3;
/// Base confidence for the vocabulary-substring fallback scan.
pub const VOCAB_SCAN_BASE_CONF: f64 = 0.1;
/// Added when an operation term is identified.
pub const OP_FOUND_DELTA: f64 = 0.2;
/// Added per extracted entity (target layer, distance, expression).
pub const ENTITY_FOUND_DELTA: f64 = 0.1;
/// Added when the merged input layer matches an active layer.
pub const INPUT_LAYER_MATCH_DELTA: f64 = 0.1;
/// Added when the merged secondary layer matches an active layer.
pub const SECONDARY_LAYER_MATCH_DELTA: f64 = 0.05;
/// Below this, the disambiguation stage runs.
pub const DISAMBIGUATION_THRESHOLD: f64 = 0.6;
/// Above this, regex re-enhancement leaves the interpretation alone.
pub const ENHANCE_THRESHOLD: f64 = 0.8;
/// Added per parameter recovered by regex re-enhancement.
pub const ENHANCE_DELTA: f64 = 0.1;
/// Confidence for a direct pattern-only parse (buffer/overlay forms).
pub const PATTERN_MATCH_CONF: f64 = 0.8;
/// Confidence for a pattern-only select parse (expressions are fuzzier).
pub const SELECT_PATTERN_CONF: f64 = 0.7;
/// Confidence when nothing matched at all.
pub const NO_MATCH_CONF: f64 = 0.1;
/// Base confidence for a context parse with a recognized operation.
pub const CONTEXT_OP_CONF: f64 = 0.5;
/// Base confidence for a context parse with no recognized operation.
pub const CONTEXT_UNKNOWN_CONF: f64 = 0.2;

// ── Operation synonyms ────────────────────────────────────────

/// Natural-language phrases for each operation, checked in order.
/// First phrase hit wins, so more specific operations come first.
pub const OPERATION_SYNONYMS: &[(Operation, &[&str])] = &[
    (
        Operation::Buffer,
        &["buffer", "create buffer", "make buffer", "buffering"],
    ),
    (
        Operation::Intersection,
        &[
            "intersect",
            "intersection",
            "overlapping",
            "overlap",
            "overlaps with",
        ],
    ),
    (Operation::Clip, &["clip", "cut", "extract", "trim"]),
    (Operation::Merge, &["merge", "combine", "join", "dissolve"]),
    (Operation::Union, &["union", "unite"]),
    (Operation::Split, &["split", "divide", "separate"]),
    (
        Operation::Select,
        &["select", "choose", "pick", "filter", "find", "get"],
    ),
    (Operation::Query, &["query", "search", "where"]),
    (
        Operation::Proximity,
        &["near", "close to", "within", "distance", "proximity"],
    ),
    (
        Operation::Density,
        &["density", "concentration", "hotspot", "cluster"],
    ),
    (
        Operation::Statistics,
        &[
            "statistics",
            "calculate",
            "compute",
            "stats",
            "mean",
            "average",
            "sum",
        ],
    ),
];

/// Spatial relationship terms recognized in command text.
pub const SPATIAL_RELATIONSHIPS: &[&str] = &[
    "near",
    "close to",
    "far from",
    "adjacent to",
    "within",
    "contains",
    "inside",
    "outside",
    "intersects",
    "overlaps",
    "crosses",
    "touches",
];

/// Unit suffix alternation shared by every distance pattern.
pub const UNIT_WORDS: &str =
    "meter|meters|m|kilometer|kilometers|km|feet|foot|ft|mile|miles|mi";

/// "<number> <unit>" — the canonical distance phrase.
pub static DISTANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)(\d+\.?\d*)\s*({UNIT_WORDS})\b")).unwrap()
});

/// Identify the operation a text most likely refers to, or `Unknown`.
pub fn identify_operation(text: &str) -> Operation {
    let lower = text.to_lowercase();
    for (operation, phrases) in OPERATION_SYNONYMS {
        if phrases.iter().any(|p| lower.contains(p)) {
            return *operation;
        }
    }
    Operation::Unknown
}

/// Identify a spatial relationship term in the text, if any.
pub fn identify_spatial_relationship(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    SPATIAL_RELATIONSHIPS
        .iter()
        .find(|rel| lower.contains(*rel))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_buffer() {
        assert_eq!(identify_operation("buffer the rivers"), Operation::Buffer);
        assert_eq!(identify_operation("Create Buffer zones"), Operation::Buffer);
    }

    #[test]
    fn identify_overlay_operations() {
        assert_eq!(
            identify_operation("find the intersection of A and B"),
            Operation::Intersection
        );
        assert_eq!(identify_operation("clip roads to the city"), Operation::Clip);
        assert_eq!(identify_operation("union of parcels"), Operation::Union);
    }

    #[test]
    fn intersect_beats_clip_when_both_present() {
        // "intersect" is checked before "clip"/"cut"
        assert_eq!(
            identify_operation("cut where they intersect"),
            Operation::Intersection
        );
    }

    #[test]
    fn unrecognized_is_unknown() {
        assert_eq!(identify_operation("hello world"), Operation::Unknown);
    }

    #[test]
    fn spatial_relationship_detection() {
        assert_eq!(
            identify_spatial_relationship("schools near the river"),
            Some("near")
        );
        assert_eq!(
            identify_spatial_relationship("parcels adjacent to the park"),
            Some("adjacent to")
        );
        assert_eq!(identify_spatial_relationship("buffer roads"), None);
    }

    #[test]
    fn distance_regex_captures_value_and_unit() {
        let caps = DISTANCE_RE.captures("buffer by 2.5 km please").unwrap();
        assert_eq!(&caps[1], "2.5");
        assert_eq!(&caps[2], "km");
    }

    #[test]
    fn thresholds_are_what_validation_depends_on() {
        assert_eq!(DISAMBIGUATION_THRESHOLD, 0.6);
        assert_eq!(ENHANCE_THRESHOLD, 0.8);
    }
}
