//! Mock entity model for testing — returns a fixed extraction or misses.

use async_trait::async_trait;

use gl_intent::intent::ParamMap;
use gl_intent::ProcessingMethod;

use crate::recognizer::{EntityExtraction, EntityModel};

/// A mock trained-model collaborator with a scripted result.
pub struct MockEntityModel {
    name: String,
    result: Option<EntityExtraction>,
}

impl MockEntityModel {
    /// A model that always returns an extraction for the given action.
    pub fn hit(name: impl Into<String>, action: &str, primary_target: Option<&str>) -> Self {
        Self {
            name: name.into(),
            result: Some(EntityExtraction {
                action: Some(action.to_string()),
                primary_target: primary_target.map(String::from),
                secondary_target: None,
                parameters: ParamMap::new(),
                confidence: 0.9,
                processing_method: ProcessingMethod::ModelBacked,
            }),
        }
    }

    /// A model that never matches, forcing the pattern fallback.
    pub fn miss(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: None,
        }
    }

    /// A model returning an arbitrary scripted extraction.
    pub fn with_result(name: impl Into<String>, result: EntityExtraction) -> Self {
        Self {
            name: name.into(),
            result: Some(result),
        }
    }
}

#[async_trait]
impl EntityModel for MockEntityModel {
    async fn extract(
        &self,
        _text: &str,
        _active_layers: &[String],
        _crs: Option<&str>,
    ) -> Option<EntityExtraction> {
        self.result.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_returns_scripted_extraction() {
        let model = MockEntityModel::hit("m", "clip", Some("roads"));
        let result = model.extract("anything", &[], None).await.unwrap();
        assert_eq!(result.action.as_deref(), Some("clip"));
        assert_eq!(result.primary_target.as_deref(), Some("roads"));
        assert_eq!(result.processing_method, ProcessingMethod::ModelBacked);
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let model = MockEntityModel::miss("m");
        assert!(model.extract("anything", &[], None).await.is_none());
    }
}
