//! Parameter resolution — defaults, style translation, and
//! natural-language-to-expression-syntax conversion.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

use gl_intent::intent::ParamMap;
use gl_intent::{units, GisContext, Operation};

/// Discrete scale → default buffer distance lookup (map units).
/// Larger buffers at smaller scales (zoomed out).
const SCALE_DISTANCE_TABLE: &[(f64, f64)] = &[
    (1_000_000.0, 5000.0),
    (100_000.0, 1000.0),
    (10_000.0, 200.0),
    (1_000.0, 50.0),
];

/// Cap style words → numeric codes.
const CAP_STYLES: &[(&str, i64)] = &[("round", 0), ("flat", 1), ("square", 2)];

/// Join style words → numeric codes.
const JOIN_STYLES: &[(&str, i64)] = &[("round", 0), ("miter", 1), ("bevel", 2)];

/// Natural-language comparison phrases → symbolic operators, ordered
/// longest/most-specific first so partial matches cannot corrupt a
/// longer phrase ("greater than or equal to" before "greater than").
static COMPARISON_PHRASES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bgreater than or equal to\b", ">="),
        (r"\bless than or equal to\b", "<="),
        (r"\bnot equal to\b", "!="),
        (r"\bdoes not equal\b", "!="),
        (r"\bis equal to\b", "="),
        (r"\bgreater than\b", ">"),
        (r"\bless than\b", "<"),
        (r"\bequals\b", "="),
        (r"\bis\b", "="),
    ]
    .into_iter()
    .map(|(phrase, op)| (Regex::new(&format!("(?i){phrase}")).unwrap(), op))
    .collect()
});

/// "field contains value" → LIKE with wildcards.
static CONTAINS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\w+)\s+contains\s+(\w+)").unwrap());
static STARTS_WITH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\w+)\s+starts with\s+(\w+)").unwrap());
static ENDS_WITH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\w+)\s+ends with\s+(\w+)").unwrap());

static CAP_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:with|using)\s+(\w+)\s+caps?").unwrap());
static JOIN_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:with|using)\s+(\w+)\s+joins?").unwrap());
static SEGMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+segments").unwrap());
static DISSOLVE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bdissolve\b").unwrap());

/// Resolver for missing and natural-language-shaped parameters.
#[derive(Debug, Default)]
pub struct ParameterResolver;

impl ParameterResolver {
    pub fn new() -> Self {
        Self
    }

    /// Defaults applied for each operation before execution.
    fn defaults(operation: Operation) -> ParamMap {
        let value = match operation {
            Operation::Buffer => json!({
                "distance": 100.0,
                "segments": 5,
                "end_cap_style": 0,
                "join_style": 0,
                "miter_limit": 2,
                "dissolve": false,
            }),
            Operation::Intersection => json!({
                "input_fields": [],
                "overlay_fields": [],
            }),
            _ => json!({}),
        };
        match value {
            Value::Object(map) => map,
            _ => ParamMap::new(),
        }
    }

    /// Resolve and complete parameters for an operation: run the
    /// operation-specific hook over the parsed parameters, then fill
    /// anything still absent from the defaults table.
    pub fn resolve(
        &self,
        operation: Operation,
        parsed: &ParamMap,
        context: &GisContext,
    ) -> ParamMap {
        let mut params = parsed.clone();

        match operation {
            Operation::Buffer => self.resolve_buffer(&mut params, context),
            Operation::Select => self.resolve_select(&mut params),
            _ => {}
        }

        for (key, value) in Self::defaults(operation) {
            params.entry(key).or_insert(value);
        }
        params
    }

    /// Buffer-specific inference: distance from map scale (discrete
    /// lookup) or from 1% of the current extent, plus style-word
    /// translation to numeric codes.
    fn resolve_buffer(&self, params: &mut ParamMap, context: &GisContext) {
        if !params.contains_key("distance") {
            if let Some(scale) = context.scale {
                let distance = SCALE_DISTANCE_TABLE
                    .iter()
                    .find(|(threshold, _)| scale > *threshold)
                    .map(|(_, d)| *d)
                    .unwrap_or(10.0);
                params.insert("distance".into(), distance.into());
            } else if let Some(extent) = context.extent {
                params.insert("distance".into(), (extent.avg_dimension() * 0.01).into());
            }
        }

        if let Some(Value::String(style)) = params.get("cap_style").cloned() {
            let code = lookup_style(CAP_STYLES, &style).unwrap_or(0);
            params.insert("end_cap_style".into(), code.into());
        }
        if let Some(Value::String(style)) = params.get("join_style").cloned() {
            let code = lookup_style(JOIN_STYLES, &style).unwrap_or(0);
            params.insert("join_style".into(), code.into());
        }
    }

    /// Select-specific inference: translate natural-language comparison
    /// phrases into expression syntax.
    fn resolve_select(&self, params: &mut ParamMap) {
        if let Some(Value::String(expression)) = params.get("expression").cloned() {
            let translated = translate_expression(&expression);
            params.insert("expression".into(), translated.into());
        }
    }

    /// Resolve parameters for a spatial relationship query into a
    /// concrete spatial operation tag (plus a default distance for
    /// proximity phrasings).
    pub fn resolve_spatial(
        &self,
        relation: &str,
        params: &ParamMap,
        context: &GisContext,
    ) -> ParamMap {
        let mut resolved = params.clone();
        let relation = relation.to_lowercase();

        let operation = match relation.as_str() {
            "within" | "inside" => {
                if params.contains_key("distance") {
                    "within_distance"
                } else {
                    "within"
                }
            }
            "contains" | "cover" => "contains",
            "intersects" | "overlaps" | "crosses" => "intersects",
            "near" | "close to" | "nearby" => {
                if !resolved.contains_key("distance") {
                    let distance = match context.scale {
                        Some(s) if s > 100_000.0 => 1000.0,
                        Some(s) if s > 10_000.0 => 200.0,
                        Some(_) => 50.0,
                        None => 100.0,
                    };
                    resolved.insert("distance".into(), distance.into());
                }
                "within_distance"
            }
            "touches" | "adjacent to" => "touches",
            _ => return resolved,
        };

        resolved.insert("spatial_operation".into(), operation.into());
        resolved
    }

    /// Extract operation-specific parameters straight from text
    /// (distances, buffer cap/join styles, segments, dissolve flag).
    pub fn extract_from_text(&self, text: &str, operation: Operation) -> ParamMap {
        let mut params = ParamMap::new();

        if let Some(caps) = gl_nlp::vocab::DISTANCE_RE.captures(text)
            && let Some(distance) = units::parse_distance(&caps[1], &caps[2])
        {
            params.insert("distance".into(), distance.into());
            params.insert("unit".into(), "meters".into());
        }

        if operation == Operation::Buffer {
            if let Some(caps) = CAP_STYLE_RE.captures(text) {
                params.insert("cap_style".into(), caps[1].to_lowercase().into());
            }
            if let Some(caps) = JOIN_STYLE_RE.captures(text) {
                params.insert("join_style".into(), caps[1].to_lowercase().into());
            }
            if let Some(caps) = SEGMENTS_RE.captures(text)
                && let Ok(segments) = caps[1].parse::<i64>()
            {
                params.insert("segments".into(), segments.into());
            }
            if DISSOLVE_RE.is_match(text) {
                params.insert("dissolve".into(), true.into());
            }
        }

        params
    }
}

fn lookup_style(table: &[(&str, i64)], word: &str) -> Option<i64> {
    let word = word.to_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, code)| *code)
}

/// Translate natural-language comparison phrases to expression syntax.
fn translate_expression(expression: &str) -> String {
    // Substring-match phrasings become LIKE with wildcards first, so
    // the generic phrase table below cannot mangle them.
    let mut result = CONTAINS_RE
        .replace_all(expression, r#"$1 LIKE "%$2%""#)
        .into_owned();
    result = STARTS_WITH_RE
        .replace_all(&result, r#"$1 LIKE "$2%""#)
        .into_owned();
    result = ENDS_WITH_RE
        .replace_all(&result, r#"$1 LIKE "%$2""#)
        .into_owned();

    for (re, operator) in COMPARISON_PHRASES.iter() {
        result = re.replace_all(&result, *operator).into_owned();
    }
    result
}
