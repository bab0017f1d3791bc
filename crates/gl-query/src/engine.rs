//! The composed query engine — parse, validate, resolve, optimize.

use gl_intent::{GisContext, Intent};
use gl_nlp::NlpEngine;

use crate::optimizer::{OptimizerConfig, QueryOptimizer, StatsProvider};
use crate::parser::QueryParser;
use crate::resolver::ParameterResolver;

/// Main query translation engine integrating all query components.
pub struct QueryEngine {
    nlp: Option<NlpEngine>,
    parser: QueryParser,
    resolver: ParameterResolver,
    optimizer: QueryOptimizer,
}

impl QueryEngine {
    pub fn new(stats: Box<dyn StatsProvider>) -> Self {
        Self {
            nlp: None,
            parser: QueryParser::new(),
            resolver: ParameterResolver::new(),
            optimizer: QueryOptimizer::new(stats),
        }
    }

    pub fn with_optimizer_config(
        stats: Box<dyn StatsProvider>,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            nlp: None,
            parser: QueryParser::new(),
            resolver: ParameterResolver::new(),
            optimizer: QueryOptimizer::with_config(stats, config),
        }
    }

    /// Attach an NLP engine; without one, only pattern parsing runs.
    pub fn with_nlp(mut self, nlp: NlpEngine) -> Self {
        self.nlp = Some(nlp);
        self
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    pub fn optimizer(&self) -> &QueryOptimizer {
        &self.optimizer
    }

    /// Process a natural-language query into an optimized operation.
    ///
    /// Validation issues are attached rather than returned as errors;
    /// the caller (the guard system) decides whether to block.
    pub async fn process_query(&self, text: &str, context: &GisContext) -> Intent {
        let mut intent = self
            .parser
            .parse_query(text, context, self.nlp.as_ref())
            .await;

        let issues = self.parser.validate_query(&intent);
        if !issues.is_empty() {
            tracing::debug!(count = issues.len(), "validation issues attached");
            intent.validation_issues = issues;
        }

        if intent.operation.is_known() {
            intent.parameters =
                self.resolver
                    .resolve(intent.operation, &intent.parameters, context);
        }

        self.optimizer.optimize(&mut intent);
        self.optimizer.attach_warnings(&mut intent);
        intent
    }

    /// Process a batch of queries with optimized sequencing.
    pub async fn batch_process(&self, queries: &[&str], context: &GisContext) -> Vec<Intent> {
        let mut processed = Vec::with_capacity(queries.len());
        for query in queries {
            processed.push(self.process_query(query, context).await);
        }
        self.optimizer.optimize_sequence(processed)
    }

    /// Completion suggestions for a partial query.
    pub fn suggest_completions(&self, intent: &Intent) -> Vec<String> {
        self.parser.suggest_completion(intent)
    }
}
