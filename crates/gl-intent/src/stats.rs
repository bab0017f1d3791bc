use serde::{Deserialize, Serialize};

use crate::context::GeometryKind;

/// Per-layer statistics used by the query optimizer.
///
/// An unknown layer yields `LayerStats::default()` (all zeroes) rather
/// than an error — the optimizer degrades to no-op tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStats {
    pub feature_count: u64,
    pub has_spatial_index: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryKind>,
    pub field_count: u32,
    /// Width × height of the layer extent in map units.
    pub extent_area: f64,
}

impl LayerStats {
    pub fn is_large_dataset(&self, threshold: u64) -> bool {
        self.feature_count > threshold
    }

    /// Rough in-memory size estimate: 100 bytes per feature baseline,
    /// plus 20 per attribute field, plus a geometry surcharge.
    pub fn estimated_size_mb(&self) -> f64 {
        let mut per_feature = 100.0 + f64::from(self.field_count) * 20.0;
        match self.geometry {
            Some(GeometryKind::Polygon) => per_feature += 500.0,
            Some(GeometryKind::Line) => per_feature += 200.0,
            Some(GeometryKind::Point) | None => {}
        }
        (self.feature_count as f64 * per_feature) / (1024.0 * 1024.0)
    }
}
