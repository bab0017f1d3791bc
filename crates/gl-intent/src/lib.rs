//! Shared types for GeoLingua.
//!
//! Everything that crosses a crate boundary lives here: the `Operation`
//! enum, the `Intent` record that flows through the interpretation
//! pipeline, validation issues and warnings, the read-only GIS context
//! snapshot, per-layer statistics, and distance unit conversion.

pub mod context;
pub mod error;
pub mod intent;
pub mod issue;
pub mod operation;
pub mod stats;
pub mod units;

// Re-export key types for convenience
pub use context::{Extent, GeometryKind, GisContext, LayerInfo};
pub use error::{GlError, GlResult};
pub use intent::{Intent, ParamMap, ProcessingMethod};
pub use issue::{IssueKind, Severity, ValidationIssue, Warning};
pub use operation::Operation;
pub use stats::LayerStats;
pub use units::Unit;
