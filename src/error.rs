//! Error types shared by every stage of the heatmap pipeline.

use thiserror::Error;

/// Errors raised while configuring or evaluating the heatmap pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeatmapError {
    #[error("unknown projection: {0}")]
    UnknownProjection(String),
    #[error("unknown clusterer: {0}")]
    UnknownClusterer(String),
    #[error("unknown grouping: {0}")]
    UnknownGrouping(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Min/max/normalize requested on a heatmap without any cells.
    #[error("heatmap is empty")]
    EmptyHeatmap,
    #[error("cannot normalize against non-positive maximum {0}")]
    DegenerateMaximum(f64),
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
