//! The composed NLP engine — recognizer tiers + context parse + merge.

use gl_intent::{GisContext, Intent};

use crate::cache::{InterpretationCache, DEFAULT_CACHE_CAPACITY};
use crate::context_parser;
use crate::merger;
use crate::recognizer::{EntityModel, PatternRecognizer};

/// Main interpretation engine for GIS commands.
///
/// Tries the trained model collaborator first (when configured), falls
/// back to the pattern recognizer on a miss, merges with the context
/// parse, disambiguates low-confidence results, and caches per
/// (text, active layers, crs).
pub struct NlpEngine {
    model: Option<Box<dyn EntityModel>>,
    recognizer: PatternRecognizer,
    cache: InterpretationCache,
}

impl NlpEngine {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            model: None,
            recognizer: PatternRecognizer::new(),
            cache: InterpretationCache::new(capacity),
        }
    }

    /// Attach a trained entity model collaborator.
    pub fn with_model(mut self, model: Box<dyn EntityModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Interpret a natural-language command against the session context.
    ///
    /// Never fails — unrecognized input yields an `Unknown` intent for
    /// validation to reject downstream.
    pub async fn process_command(&self, text: &str, context: &GisContext) -> Intent {
        if let Some(hit) = self.cache.get(text, context) {
            tracing::debug!(text, "interpretation served from cache");
            return hit;
        }

        let active: Vec<String> = context
            .active_layers
            .iter()
            .map(|l| l.name.clone())
            .collect();

        // Model tier first, pattern fallback on miss or absence.
        let entity = match &self.model {
            Some(model) => {
                match model
                    .extract(
                        text,
                        &active,
                        (!context.crs.is_empty()).then_some(context.crs.as_str()),
                    )
                    .await
                {
                    Some(extraction) => extraction,
                    None => {
                        tracing::debug!(model = model.name(), "model missed, using patterns");
                        self.recognizer.extract(text)
                    }
                }
            }
            None => self.recognizer.extract(text),
        };

        let fragment = context_parser::parse_command(text, context);
        let mut intent = merger::merge(&entity, &fragment, text, context);
        merger::disambiguate(&mut intent, context);

        self.cache.insert(text, context, intent.clone());
        intent
    }
}

impl Default for NlpEngine {
    fn default() -> Self {
        Self::new()
    }
}
