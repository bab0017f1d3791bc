//! Mock layer-statistics provider for testing.

use std::collections::HashMap;

use gl_intent::LayerStats;

use crate::optimizer::StatsProvider;

/// A mock statistics provider serving pre-loaded stats by layer name.
#[derive(Debug, Default)]
pub struct MockStatsProvider {
    layers: HashMap<String, LayerStats>,
}

impl MockStatsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register statistics for a layer.
    pub fn add_layer(&mut self, name: impl Into<String>, stats: LayerStats) {
        self.layers.insert(name.into(), stats);
    }

    /// A provider with one indexed mid-sized layer ("roads", 5000
    /// features) and one heavy unindexed layer ("parcels", 60000).
    pub fn with_sample_layers() -> Self {
        let mut provider = Self::new();
        provider.add_layer(
            "roads",
            LayerStats {
                feature_count: 5_000,
                has_spatial_index: true,
                field_count: 12,
                extent_area: 1.0e8,
                ..Default::default()
            },
        );
        provider.add_layer(
            "parcels",
            LayerStats {
                feature_count: 60_000,
                has_spatial_index: false,
                field_count: 30,
                extent_area: 5.0e7,
                ..Default::default()
            },
        );
        provider
    }
}

impl StatsProvider for MockStatsProvider {
    fn layer_stats(&self, layer: &str) -> LayerStats {
        self.layers.get(layer).cloned().unwrap_or_default()
    }
}
