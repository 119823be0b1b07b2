//! Configuration values consumed by the heatmap pipeline.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cluster::{Clusterer, ClustererKind};
use crate::error::Result;
use crate::geo_utils::MAX_GAP;
use crate::projection::{Projection, ProjectionKind};
use crate::timeseries::GroupMode;

/// Configuration for heatmap generation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeatmapConfig {
    /// Map projection (default: web-mercator)
    pub projection: ProjectionKind,
    /// Projection scale in meters per pixel (default: 30)
    pub scale: f64,
    /// Maximum gap between consecutive points before a track is split, in meters (default: 700)
    pub max_gap: f64,
    /// Heatmap clusterer (default: gaussian)
    pub clusterer: ClustererKind,
    /// Reduction factor for the scaled clusterers (default: 3)
    pub cluster_scale: f64,
    /// Radius for the linear and gaussian clusterers, in pixels (default: 5)
    pub cluster_radius: u32,
    /// Groupings to produce layers for
    pub groups: Vec<GroupMode>,
    /// Margin around the tracks' extent, in pixels (default: 100)
    pub extent_margin: i64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionKind::WebMercator,
            scale: 30.0,
            max_gap: MAX_GAP,
            clusterer: ClustererKind::Gaussian,
            cluster_scale: 3.0,
            cluster_radius: 5,
            groups: Vec::new(),
            extent_margin: 100,
        }
    }
}

impl HeatmapConfig {
    /// Build the configured projection.
    pub fn projection(&self) -> Result<Projection> {
        Projection::new(self.projection, self.scale)
    }

    /// Build the configured clusterer.
    pub fn clusterer(&self) -> Result<Clusterer> {
        Clusterer::from_kind(self.clusterer, self.cluster_scale, self.cluster_radius)
    }
}
