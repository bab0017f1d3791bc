//! GeoLingua command pipeline.
//!
//! Wires the interpretation engine, query pipeline, and transactional
//! safety net into one entry point: raw text + session context in,
//! structured outcome out. The actual geometry work is delegated to a
//! `GeoProcessor` collaborator; this crate never inspects geometry.

pub mod config;
pub mod executor;
pub mod mock;
pub mod pipeline;

// Re-export key types for convenience
pub use config::PipelineConfig;
pub use executor::{ExecutionOutcome, GeoProcessor};
pub use mock::MockGeoProcessor;
pub use pipeline::{CommandOutcome, CommandPipeline};
