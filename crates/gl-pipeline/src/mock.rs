//! Mock geoprocessing engine for testing.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;

use gl_intent::intent::ParamMap;
use gl_intent::Operation;

use crate::executor::{ExecutionOutcome, GeoProcessor};

/// A mock geoprocessing engine with scriptable failures.
///
/// Records every call so tests can assert on what reached execution.
pub struct MockGeoProcessor {
    fail_operations: Vec<Operation>,
    calls: Mutex<Vec<(Operation, ParamMap)>>,
}

impl MockGeoProcessor {
    /// An engine where every operation succeeds.
    pub fn new() -> Self {
        Self {
            fail_operations: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// An engine that fails the given operations.
    pub fn failing_on(operations: &[Operation]) -> Self {
        Self {
            fail_operations: operations.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every (operation, parameters) pair that reached execution.
    pub fn calls(&self) -> Vec<(Operation, ParamMap)> {
        self.calls.lock().expect("mock mutex poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock mutex poisoned").len()
    }
}

impl Default for MockGeoProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeoProcessor for MockGeoProcessor {
    async fn execute(&self, operation: Operation, parameters: &ParamMap) -> ExecutionOutcome {
        self.calls
            .lock()
            .expect("mock mutex poisoned")
            .push((operation, parameters.clone()));

        if self.fail_operations.contains(&operation) {
            return ExecutionOutcome::failure(format!("{operation} failed: engine error"));
        }
        ExecutionOutcome::success(
            format!("{operation} completed"),
            Some(json!({"output_layer": format!("{operation}_result")})),
        )
    }

    fn name(&self) -> &str {
        "mock-geoprocessor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_execution_records_call() {
        let mock = MockGeoProcessor::new();
        let outcome = mock.execute(Operation::Buffer, &ParamMap::new()).await;
        assert!(outcome.success);
        assert!(outcome.result_handle.is_some());
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.calls()[0].0, Operation::Buffer);
    }

    #[tokio::test]
    async fn scripted_failure() {
        let mock = MockGeoProcessor::failing_on(&[Operation::Union]);
        let outcome = mock.execute(Operation::Union, &ParamMap::new()).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("union"));
    }
}
