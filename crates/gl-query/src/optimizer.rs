//! Query optimization — layer-statistics-driven execution tuning.
//!
//! Hints are attached to the intent's `optimizations` map and warnings
//! to its `warnings` list; nothing here blocks execution.

use serde::{Deserialize, Serialize};
use serde_json::json;

use gl_intent::{Intent, LayerStats, Operation, Warning};

/// Optimizer thresholds. These are heuristic configuration defaults,
/// not calibrated physical limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Feature count above which a dataset warning is attached.
    pub large_dataset_threshold: u64,
    /// Estimated in-memory size above which a memory warning is attached.
    pub memory_limit_mb: f64,
    /// Feature count above which per-operation tuning kicks in.
    pub heavy_layer_threshold: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            large_dataset_threshold: 50_000,
            memory_limit_mb: 512.0,
            heavy_layer_threshold: 10_000,
        }
    }
}

/// Provider of per-layer statistics.
///
/// A name with no backing layer yields zeroed statistics, not an error —
/// the optimizer then degrades to no-op tuning.
pub trait StatsProvider: Send + Sync {
    fn layer_stats(&self, layer: &str) -> LayerStats;
}

/// Statistics-driven optimizer for parsed operations.
pub struct QueryOptimizer {
    stats: Box<dyn StatsProvider>,
    config: OptimizerConfig,
}

impl QueryOptimizer {
    pub fn new(stats: Box<dyn StatsProvider>) -> Self {
        Self::with_config(stats, OptimizerConfig::default())
    }

    pub fn with_config(stats: Box<dyn StatsProvider>, config: OptimizerConfig) -> Self {
        Self { stats, config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn input_stats(&self, intent: &Intent) -> LayerStats {
        intent
            .input_layer
            .as_deref()
            .map(|l| self.stats.layer_stats(l))
            .unwrap_or_default()
    }

    fn secondary_stats(&self, intent: &Intent) -> LayerStats {
        intent
            .secondary_layer
            .as_deref()
            .map(|l| self.stats.layer_stats(l))
            .unwrap_or_default()
    }

    /// Tune execution parameters for one intent and attach hints.
    pub fn optimize(&self, intent: &mut Intent) {
        let input_stats = self.input_stats(intent);
        let secondary_stats = self.secondary_stats(intent);

        match intent.operation {
            Operation::Buffer => self.optimize_buffer(intent, &input_stats),
            Operation::Clip | Operation::Intersection | Operation::Union => {
                self.optimize_overlay(intent, &input_stats, &secondary_stats)
            }
            Operation::Select => self.optimize_select(intent, &input_stats),
            _ => {}
        }

        intent.optimizations.insert(
            "use_spatial_index".into(),
            input_stats.has_spatial_index.into(),
        );
        intent.optimizations.insert(
            "estimated_processing_time".into(),
            self.estimate_processing_time(intent.operation, &input_stats, &secondary_stats)
                .into(),
        );
    }

    fn optimize_buffer(&self, intent: &mut Intent, stats: &LayerStats) {
        if stats.feature_count > self.config.heavy_layer_threshold {
            // Reduce segmentation and skip dissolve on heavy layers.
            let segments = intent.param_f64("segments").unwrap_or(f64::MAX);
            if segments > 5.0 {
                intent.set_param("segments", 5);
            }
            if intent.param_flag("dissolve") {
                intent.set_param("dissolve", false);
            }
            intent.optimizations.insert("reduced_segments".into(), true.into());
            intent.optimizations.insert("disable_dissolve".into(), true.into());
            intent
                .optimizations
                .insert("reason".into(), "Large dataset optimization".into());
        }

        // Tiny buffers don't need fine segmentation.
        if intent.param_f64("distance").unwrap_or(0.0) < 10.0 {
            let segments = intent.param_f64("segments").unwrap_or(8.0).min(4.0) as i64;
            intent.set_param("segments", segments);
            intent
                .optimizations
                .insert("reduced_segments_small_buffer".into(), true.into());
        }
    }

    fn optimize_overlay(
        &self,
        intent: &mut Intent,
        input_stats: &LayerStats,
        overlay_stats: &LayerStats,
    ) {
        let input_count = input_stats.feature_count;
        let overlay_count = overlay_stats.feature_count;

        if intent.operation == Operation::Union && (input_count > 5_000 || overlay_count > 5_000) {
            intent.optimizations.insert("memory_efficient".into(), true.into());
            intent
                .optimizations
                .insert("reason".into(), "Large dataset union optimization".into());
        }

        if intent.operation == Operation::Intersection && input_count.min(overlay_count) > 0 {
            let ratio = input_count.max(overlay_count) as f64 / input_count.min(overlay_count) as f64;
            if ratio > 10.0 && input_count > overlay_count {
                // Process the smaller layer first.
                intent.optimizations.insert("swap_inputs".into(), true.into());
                intent
                    .optimizations
                    .insert("reason".into(), "Size difference optimization".into());
            }
        }

        if intent.operation == Operation::Clip && overlay_count > input_count * 5 {
            intent
                .optimizations
                .insert("spatial_index_critical".into(), true.into());
        }

        if input_count + overlay_count > 100_000 {
            intent
                .optimizations
                .insert("high_memory_operation".into(), true.into());
            intent
                .optimizations
                .insert("suggested_batch_size".into(), json!(10_000));
        }
    }

    fn optimize_select(&self, intent: &mut Intent, stats: &LayerStats) {
        if stats.feature_count > self.config.heavy_layer_threshold {
            intent.optimizations.insert("use_spatial_index".into(), true.into());

            let expression = intent.param_str("expression").unwrap_or("").to_lowercase();
            if ["intersects", "contains", "within", "distance"]
                .iter()
                .any(|kw| expression.contains(kw))
            {
                intent.optimizations.insert("spatial_first".into(), true.into());
                intent
                    .optimizations
                    .insert("reason".into(), "Spatial query on large dataset".into());
            }
        }

        let expression = intent.param_str("expression").unwrap_or("");
        let operator_count: usize = ["AND", "OR", ">", "<", "=", "LIKE"]
            .iter()
            .map(|op| expression.matches(op).count())
            .sum();
        if operator_count > 5 {
            intent
                .optimizations
                .insert("complex_expression".into(), true.into());
        }
    }

    /// Coarse, advisory processing-time bucket for an operation.
    pub fn estimate_processing_time(
        &self,
        operation: Operation,
        input_stats: &LayerStats,
        secondary_stats: &LayerStats,
    ) -> &'static str {
        let input_count = input_stats.feature_count;
        let secondary_count = secondary_stats.feature_count;

        match operation {
            Operation::Buffer => {
                if input_count < 1_000 {
                    "< 5 seconds"
                } else if input_count < 10_000 {
                    "5-30 seconds"
                } else {
                    "30+ seconds"
                }
            }
            Operation::Clip | Operation::Intersection => {
                let complexity = input_count as f64 * (secondary_count as f64 / 1000.0 + 1.0);
                if complexity < 10_000.0 {
                    "< 10 seconds"
                } else if complexity < 100_000.0 {
                    "10-60 seconds"
                } else {
                    "1+ minutes"
                }
            }
            Operation::Select => {
                if input_count < 5_000 {
                    "< 2 seconds"
                } else if input_count < 50_000 {
                    "2-10 seconds"
                } else {
                    "10+ seconds"
                }
            }
            _ => "Unknown",
        }
    }

    /// Attach warnings for potentially expensive operations. Advisory
    /// only — never blocks execution.
    pub fn attach_warnings(&self, intent: &mut Intent) {
        let stats = self.input_stats(intent);

        if stats.feature_count > self.config.large_dataset_threshold {
            intent.warnings.push(Warning::new(
                "performance",
                format!(
                    "Large dataset detected ({} features). Operation may take several minutes.",
                    stats.feature_count
                ),
            ));
        }

        if intent.operation == Operation::Buffer {
            let distance = intent.param_f64("distance").unwrap_or(0.0);
            if distance > 0.0 && stats.extent_area > 0.0 {
                let buffer_area_ratio =
                    (std::f64::consts::PI * distance * distance) / stats.extent_area;
                if buffer_area_ratio > 0.5 {
                    intent.warnings.push(Warning::new(
                        "geometry",
                        "Buffer distance is very large relative to layer extent. \
                         This may create overlapping geometries.",
                    ));
                }
            }
        }

        let estimated_memory = stats.estimated_size_mb();
        if matches!(intent.operation, Operation::Union | Operation::Intersection)
            && estimated_memory > self.config.memory_limit_mb
        {
            intent.warnings.push(Warning::new(
                "memory",
                format!(
                    "Operation may require significant memory ({estimated_memory:.1} MB). \
                     Consider processing in smaller batches."
                ),
            ));
        }
    }

    /// Reorder a batch so cheaper, size-reducing operations run first,
    /// then tune each intent individually. The original position is
    /// preserved on every intent for traceability.
    pub fn optimize_sequence(&self, intents: Vec<Intent>) -> Vec<Intent> {
        let mut indexed: Vec<(usize, Intent)> = intents.into_iter().enumerate().collect();
        indexed.sort_by_key(|(_, intent)| intent.operation.sequence_priority());

        indexed
            .into_iter()
            .map(|(original_index, mut intent)| {
                intent
                    .optimizations
                    .insert("original_sequence_index".into(), json!(original_index));
                self.optimize(&mut intent);
                intent
            })
            .collect()
    }

    /// Human-readable tuning suggestions for a query.
    pub fn suggestions(&self, intent: &Intent) -> Vec<String> {
        let mut suggestions = Vec::new();
        let Some(input_layer) = intent.input_layer.as_deref() else {
            return suggestions;
        };
        let stats = self.stats.layer_stats(input_layer);

        if !stats.has_spatial_index && stats.feature_count > 1_000 {
            suggestions.push(
                "Consider creating a spatial index on the input layer for better performance"
                    .to_string(),
            );
        }
        if stats.feature_count > self.config.large_dataset_threshold {
            suggestions.push(
                "For large datasets, consider filtering data first to reduce processing time"
                    .to_string(),
            );
        }

        match intent.operation {
            Operation::Buffer => {
                if intent.param_f64("distance").unwrap_or(0.0) > 1_000.0 {
                    suggestions.push(
                        "Large buffer distances may benefit from lower segment counts".to_string(),
                    );
                }
            }
            Operation::Clip | Operation::Intersection | Operation::Union => {
                if let Some(secondary) = intent.secondary_layer.as_deref() {
                    let secondary_stats = self.stats.layer_stats(secondary);
                    if stats.feature_count > self.config.heavy_layer_threshold
                        && secondary_stats.feature_count > self.config.heavy_layer_threshold
                    {
                        suggestions.push(
                            "Both layers are large - consider spatial filtering before overlay operations"
                                .to_string(),
                        );
                    }
                }
            }
            _ => {}
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStatsProvider;
    use gl_intent::Severity;

    fn intent_for(operation: Operation, input: &str) -> Intent {
        let mut intent = Intent::unknown("test");
        intent.operation = operation;
        intent.input_layer = Some(input.into());
        intent.confidence = 0.9;
        intent
    }

    fn optimizer_with(layers: &[(&str, u64)]) -> QueryOptimizer {
        let mut mock = MockStatsProvider::new();
        for (name, count) in layers {
            mock.add_layer(
                *name,
                LayerStats {
                    feature_count: *count,
                    ..Default::default()
                },
            );
        }
        QueryOptimizer::new(Box::new(mock))
    }

    #[test]
    fn heavy_buffer_reduces_segments_and_dissolve() {
        let optimizer = optimizer_with(&[("roads", 20_000)]);
        let mut intent = intent_for(Operation::Buffer, "roads");
        intent.set_param("distance", 500.0);
        intent.set_param("segments", 12);
        intent.set_param("dissolve", true);

        optimizer.optimize(&mut intent);
        assert_eq!(intent.param_f64("segments"), Some(5.0));
        assert!(!intent.param_flag("dissolve"));
        assert_eq!(intent.optimizations["reduced_segments"], true);
    }

    #[test]
    fn tiny_buffer_caps_segments_at_four() {
        let optimizer = optimizer_with(&[("roads", 100)]);
        let mut intent = intent_for(Operation::Buffer, "roads");
        intent.set_param("distance", 5.0);
        intent.set_param("segments", 8);

        optimizer.optimize(&mut intent);
        assert_eq!(intent.param_f64("segments"), Some(4.0));
        assert_eq!(intent.optimizations["reduced_segments_small_buffer"], true);
    }

    #[test]
    fn skewed_intersection_swaps_inputs() {
        let optimizer = optimizer_with(&[("big", 50_000), ("small", 100)]);
        let mut intent = intent_for(Operation::Intersection, "big");
        intent.secondary_layer = Some("small".into());

        optimizer.optimize(&mut intent);
        assert_eq!(intent.optimizations["swap_inputs"], true);
    }

    #[test]
    fn balanced_intersection_does_not_swap() {
        let optimizer = optimizer_with(&[("a", 5_000), ("b", 4_000)]);
        let mut intent = intent_for(Operation::Intersection, "a");
        intent.secondary_layer = Some("b".into());

        optimizer.optimize(&mut intent);
        assert!(!intent.optimizations.contains_key("swap_inputs"));
    }

    #[test]
    fn large_union_flags_memory_efficient() {
        let optimizer = optimizer_with(&[("a", 8_000), ("b", 100)]);
        let mut intent = intent_for(Operation::Union, "a");
        intent.secondary_layer = Some("b".into());

        optimizer.optimize(&mut intent);
        assert_eq!(intent.optimizations["memory_efficient"], true);
    }

    #[test]
    fn huge_overlay_suggests_batching() {
        let optimizer = optimizer_with(&[("a", 80_000), ("b", 30_000)]);
        let mut intent = intent_for(Operation::Clip, "a");
        intent.secondary_layer = Some("b".into());

        optimizer.optimize(&mut intent);
        assert_eq!(intent.optimizations["high_memory_operation"], true);
        assert_eq!(intent.optimizations["suggested_batch_size"], 10_000);
    }

    #[test]
    fn unknown_layer_yields_noop_tuning() {
        let optimizer = optimizer_with(&[]);
        let mut intent = intent_for(Operation::Buffer, "ghost");
        intent.set_param("distance", 500.0);
        intent.set_param("segments", 8);

        optimizer.optimize(&mut intent);
        // Zeroed stats: no heavy-layer tuning fires.
        assert_eq!(intent.param_f64("segments"), Some(8.0));
        assert!(!intent.optimizations.contains_key("reduced_segments"));
    }

    #[test]
    fn processing_time_buckets() {
        let optimizer = optimizer_with(&[]);
        let small = LayerStats {
            feature_count: 500,
            ..Default::default()
        };
        let large = LayerStats {
            feature_count: 80_000,
            ..Default::default()
        };
        assert_eq!(
            optimizer.estimate_processing_time(Operation::Buffer, &small, &LayerStats::default()),
            "< 5 seconds"
        );
        assert_eq!(
            optimizer.estimate_processing_time(Operation::Buffer, &large, &LayerStats::default()),
            "30+ seconds"
        );
        assert_eq!(
            optimizer.estimate_processing_time(Operation::Merge, &small, &LayerStats::default()),
            "Unknown"
        );
    }

    #[test]
    fn large_dataset_warning_attached() {
        let optimizer = optimizer_with(&[("roads", 60_000)]);
        let mut intent = intent_for(Operation::Select, "roads");
        optimizer.attach_warnings(&mut intent);
        assert!(intent.warnings.iter().any(|w| w.kind == "performance"));
        assert!(intent.warnings.iter().all(|w| w.severity == Severity::Warning));
    }

    #[test]
    fn buffer_extent_ratio_warning() {
        let mut mock = MockStatsProvider::new();
        mock.add_layer(
            "parcels",
            LayerStats {
                feature_count: 100,
                extent_area: 1_000_000.0,
                ..Default::default()
            },
        );
        let optimizer = QueryOptimizer::new(Box::new(mock));
        let mut intent = intent_for(Operation::Buffer, "parcels");
        intent.set_param("distance", 1_000.0); // pi * 1e6 >> 0.5 * extent

        optimizer.attach_warnings(&mut intent);
        assert!(intent.warnings.iter().any(|w| w.kind == "geometry"));
    }

    #[test]
    fn sequence_reordered_by_priority() {
        let optimizer = optimizer_with(&[]);
        let batch = vec![
            intent_for(Operation::Union, "a"),
            intent_for(Operation::Select, "b"),
            intent_for(Operation::Buffer, "c"),
        ];
        let ordered = optimizer.optimize_sequence(batch);
        let operations: Vec<Operation> = ordered.iter().map(|i| i.operation).collect();
        assert_eq!(
            operations,
            vec![Operation::Select, Operation::Buffer, Operation::Union]
        );
        assert_eq!(ordered[0].optimizations["original_sequence_index"], 1);
        assert_eq!(ordered[2].optimizations["original_sequence_index"], 0);
    }

    #[test]
    fn suggestions_for_unindexed_large_layer() {
        let optimizer = optimizer_with(&[("roads", 5_000)]);
        let intent = intent_for(Operation::Buffer, "roads");
        let suggestions = optimizer.suggestions(&intent);
        assert!(suggestions.iter().any(|s| s.contains("spatial index")));
    }
}
