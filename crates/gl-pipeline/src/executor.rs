//! The geoprocessing execution seam.
//!
//! The pipeline hands a resolved, optimized operation to this
//! collaborator and records the outcome; the result handle is opaque
//! and only logged, never inspected.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gl_intent::intent::ParamMap;
use gl_intent::Operation;

/// What the geoprocessing engine reports back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
    /// Opaque handle to the produced result (layer id, dataset ref, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_handle: Option<Value>,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, result_handle: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            result_handle,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            result_handle: None,
        }
    }
}

/// Trait for the external geoprocessing engine.
#[async_trait]
pub trait GeoProcessor: Send + Sync {
    /// Execute an operation with fully resolved parameters.
    async fn execute(&self, operation: Operation, parameters: &ParamMap) -> ExecutionOutcome;

    /// Name of this engine (for logging/audit).
    fn name(&self) -> &str;
}
