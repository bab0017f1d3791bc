//! The command pipeline: interpret → validate → execute → log.

use serde_json::Value;

use gl_guard::GuardSystem;
use gl_intent::{GisContext, GlResult, Intent, ValidationIssue};
use gl_nlp::NlpEngine;
use gl_query::{QueryEngine, StatsProvider};

use crate::config::PipelineConfig;
use crate::executor::GeoProcessor;

/// Structured outcome of one command submission. This is the only
/// shape a caller ever sees — failures arrive here, not as panics.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
    /// The final interpreted operation (absent only if nothing parsed).
    pub intent: Option<Intent>,
    pub issues: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
    /// Transaction id when the attempt was logged.
    pub transaction_id: Option<String>,
}

/// End-to-end command pipeline.
///
/// Services are injected at construction and owned here — no process
/// globals — so every test can run an isolated pipeline over its own
/// log directory.
pub struct CommandPipeline {
    query: QueryEngine,
    guard: GuardSystem,
    processor: Box<dyn GeoProcessor>,
}

impl CommandPipeline {
    /// Build a pipeline from a config, a statistics provider, and the
    /// execution collaborator. The NLP engine runs pattern-only unless
    /// a model is attached via [`CommandPipeline::with_engines`].
    pub fn open(
        config: &PipelineConfig,
        stats: Box<dyn StatsProvider>,
        processor: Box<dyn GeoProcessor>,
    ) -> GlResult<Self> {
        let nlp = NlpEngine::with_cache_capacity(config.cache_capacity);
        let query = QueryEngine::with_optimizer_config(stats, config.optimizer.clone())
            .with_nlp(nlp);
        let guard = GuardSystem::open(&config.log_dir, config.max_snapshots)?;
        Ok(Self {
            query,
            guard,
            processor,
        })
    }

    /// Build from pre-assembled engines (used to attach a trained
    /// entity model or custom risk rules before wiring).
    pub fn with_engines(
        query: QueryEngine,
        guard: GuardSystem,
        processor: Box<dyn GeoProcessor>,
    ) -> Self {
        Self {
            query,
            guard,
            processor,
        }
    }

    pub fn guard(&self) -> &GuardSystem {
        &self.guard
    }

    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    /// Run one command through the full pipeline.
    ///
    /// `state_data`, when provided, is snapshotted alongside the
    /// transaction so the host can roll back after a bad operation.
    pub async fn run_command(
        &self,
        text: &str,
        context: &GisContext,
        state_data: Option<&Value>,
    ) -> CommandOutcome {
        let intent = self.query.process_query(text, context).await;
        tracing::info!(
            operation = %intent.operation,
            confidence = intent.confidence,
            "command interpreted"
        );

        let layer_names: Vec<String> = context
            .active_layers
            .iter()
            .map(|l| l.name.clone())
            .collect();

        // Validation issues were attached by the parser before parameter
        // resolution filled in defaults; prevention adds risk-rule hits
        // on the resolved parameters. An error in the combined list
        // blocks execution.
        let mut issues = intent.validation_issues.clone();
        issues.extend(
            self.guard
                .prevention()
                .check_operation_risks(intent.operation, &intent.risk_parameters()),
        );

        if self.guard.prevention().should_prevent_execution(&issues) {
            tracing::warn!(issues = issues.len(), "command blocked by validation");
            let suggestions =
                self.guard
                    .prevention()
                    .get_alternative_suggestions(&intent, &issues, &layer_names);
            return CommandOutcome {
                success: false,
                message: "Command validation failed.".into(),
                intent: Some(intent),
                issues,
                suggestions,
                transaction_id: None,
            };
        }

        // The intent is frozen from here on; the collaborator sees the
        // resolved parameters and nothing else.
        let execution = self
            .processor
            .execute(intent.operation, &intent.parameters)
            .await;

        let transaction_id = self.guard.log_operation(
            intent.operation.as_str(),
            intent.risk_parameters(),
            execution.result_handle.clone(),
            state_data,
        );

        if !execution.success {
            let mut error_context = gl_intent::intent::ParamMap::new();
            error_context.insert("command".into(), text.into());
            error_context.insert(
                "operation".into(),
                intent.operation.as_str().into(),
            );
            self.guard.log_error(
                "execution_error",
                &execution.message,
                None,
                error_context,
            );

            return CommandOutcome {
                success: false,
                message: execution.message,
                suggestions: self.query.suggest_completions(&intent),
                issues,
                intent: Some(intent),
                transaction_id: Some(transaction_id),
            };
        }

        CommandOutcome {
            success: true,
            message: execution.message,
            intent: Some(intent),
            issues,
            suggestions: Vec::new(),
            transaction_id: Some(transaction_id),
        }
    }

    /// Roll back to the latest recoverable state snapshot.
    pub fn rollback_to_last_state(&self) -> Option<(String, Value)> {
        self.guard.rollback_to_last_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGeoProcessor;
    use gl_query::MockStatsProvider;
    use tempfile::TempDir;

    fn pipeline(dir: &TempDir) -> CommandPipeline {
        let config = PipelineConfig {
            log_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        CommandPipeline::open(
            &config,
            Box::new(MockStatsProvider::with_sample_layers()),
            Box::new(MockGeoProcessor::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_buffer_runs_and_logs() {
        let dir = TempDir::new().unwrap();
        let pipe = pipeline(&dir);
        let ctx = GisContext::with_layers(["rivers", "roads"]);

        let outcome = pipe
            .run_command("Buffer the rivers layer by 2 kilometers", &ctx, None)
            .await;
        assert!(outcome.success, "{}", outcome.message);
        assert!(outcome.transaction_id.is_some());
        let intent = outcome.intent.unwrap();
        assert_eq!(intent.param_f64("distance"), Some(2000.0));
        assert_eq!(pipe.guard().transactions().len(), 1);
    }

    #[tokio::test]
    async fn invalid_command_blocked_before_execution() {
        let dir = TempDir::new().unwrap();
        let pipe = pipeline(&dir);
        let ctx = GisContext::default();

        let outcome = pipe.run_command("buffer roads", &ctx, None).await;
        assert!(!outcome.success);
        assert!(outcome.transaction_id.is_none());
        assert!(!outcome.issues.is_empty());
        assert_eq!(pipe.guard().transactions().len(), 0);
    }
}
