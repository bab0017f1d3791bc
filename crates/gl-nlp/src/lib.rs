//! Natural-language interpretation for GIS commands.
//!
//! Converts operator text ("buffer the rivers layer by 500 meters") into
//! a structured `Intent` with operation, target layers, parameters, and
//! a confidence score.
//!
//! Two recognition tiers:
//! - **Model-backed** (optional collaborator): a trained entity tagger
//!   behind the `EntityModel` trait.
//! - **Pattern fallback** (always available): ordered regex templates
//!   plus a vocabulary-substring scan for anything the templates miss.
//!
//! Both feed the context-aware merge/disambiguation stage, whose results
//! are cached per (text, active layers, crs).

pub mod cache;
pub mod context_parser;
pub mod engine;
pub mod merger;
pub mod mock;
pub mod recognizer;
pub mod vocab;

// Re-export key types for convenience
pub use cache::InterpretationCache;
pub use context_parser::ContextFragment;
pub use engine::NlpEngine;
pub use mock::MockEntityModel;
pub use recognizer::{EntityExtraction, EntityModel, PatternRecognizer};
