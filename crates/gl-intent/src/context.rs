use serde::{Deserialize, Serialize};

/// Geometry class of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

/// One entry from the host's layer panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryKind>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl LayerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: None,
            visible: true,
        }
    }
}

/// Current map view rectangle in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Average of width and height — the basis for the "1% of view"
    /// default buffer distance heuristic.
    pub fn avg_dimension(&self) -> f64 {
        (self.width() + self.height()) / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Read-only snapshot of host session state, valid for one command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GisContext {
    #[serde(default)]
    pub active_layers: Vec<LayerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_layer: Option<String>,
    #[serde(default)]
    pub crs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl GisContext {
    /// Convenience constructor for a context of named, visible layers.
    pub fn with_layers<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active_layers: layers.into_iter().map(LayerInfo::new).collect(),
            ..Default::default()
        }
    }

    /// Names of all active layers, in panel order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.active_layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// First visible layer name, if any.
    pub fn first_visible_layer(&self) -> Option<&str> {
        self.active_layers
            .iter()
            .find(|l| l.visible)
            .map(|l| l.name.as_str())
    }
}
