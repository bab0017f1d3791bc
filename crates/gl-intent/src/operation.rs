use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A GIS operation tag.
///
/// Closed set — every pipeline stage matches on it exhaustively, so adding
/// a variant forces each component to decide how to handle it. The five
/// core operations (Buffer/Clip/Intersection/Union/Select) carry
/// operation-specific parameter resolution; the remaining tags are
/// recognized vocabulary that flows through the pipeline unparameterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Buffer,
    Clip,
    Intersection,
    Union,
    Select,
    Merge,
    Split,
    Query,
    Proximity,
    Density,
    Statistics,
    #[default]
    Unknown,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::Clip => "clip",
            Self::Intersection => "intersection",
            Self::Union => "union",
            Self::Select => "select",
            Self::Merge => "merge",
            Self::Split => "split",
            Self::Query => "query",
            Self::Proximity => "proximity",
            Self::Density => "density",
            Self::Statistics => "statistics",
            Self::Unknown => "unknown",
        }
    }

    /// Overlay operations need a secondary layer to run against.
    pub fn requires_overlay(&self) -> bool {
        matches!(self, Self::Clip | Self::Intersection | Self::Union)
    }

    /// Whether this tag is a recognized operation (anything but Unknown).
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Fixed execution-priority key used when reordering a batch:
    /// size-reducing operations first, expensive overlays last.
    pub fn sequence_priority(&self) -> u8 {
        match self {
            Self::Select => 1,
            Self::Buffer => 2,
            Self::Clip => 3,
            Self::Intersection => 4,
            Self::Union => 5,
            _ => 99,
        }
    }
}

impl FromStr for Operation {
    type Err = ();

    /// Parse an operation tag. Unrecognized strings map to `Unknown`
    /// rather than failing — the pipeline treats them identically.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "buffer" => Self::Buffer,
            "clip" => Self::Clip,
            "intersection" | "intersect" => Self::Intersection,
            "union" => Self::Union,
            "select" => Self::Select,
            "merge" => Self::Merge,
            "split" => Self::Split,
            "query" => Self::Query,
            "proximity" => Self::Proximity,
            "density" => Self::Density,
            "statistics" => Self::Statistics,
            _ => Self::Unknown,
        })
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
