//! # GPS Heatmap
//!
//! Turns GPS tracks into density heatmaps and groups them by calendar period.
//!
//! This library provides:
//! - Projection of latitude/longitude onto a pixel grid (equirectangular, web-mercator)
//! - Track segmentation on recording gaps
//! - Visit-count heatmaps with scaled or kernel (linear, gaussian) clustering
//! - Date-sorted timeseries with yearly, quarterly, monthly, weekly and daily views
//!
//! Loading track files, color mapping and drawing are left to the caller; this
//! crate produces the polylines, normalized heatmaps and extents they consume.
//!
//! ## Features
//!
//! - **`parallel`** - Build heatmaps with rayon
//! - **`serde`** - (De)serialize [`HeatmapConfig`]
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use gps_heatmap::{Activity, ActivityType, Clusterer, GroupMode, LatLon, Projection};
//!
//! let date = Utc.with_ymd_and_hms(2021, 5, 1, 8, 0, 0).unwrap();
//! let activity = Activity::new(None, date, ActivityType::Run).with_points(vec![
//!     LatLon::new(60.1699, 24.9384),
//!     LatLon::new(60.1702, 24.9390),
//!     LatLon::new(60.1706, 24.9398),
//! ]);
//!
//! let projection = Projection::web_mercator(10.0).unwrap();
//! let lines = gps_heatmap::load_lines([&activity], &projection, gps_heatmap::MAX_GAP);
//!
//! let clusterer = Clusterer::gaussian(5).unwrap();
//! let mode: GroupMode = "yearly".parse().unwrap();
//! let layers = gps_heatmap::build_layers(&lines, mode, &clusterer).unwrap();
//!
//! assert_eq!(layers.len(), 1);
//! assert_eq!(layers[0].key.unwrap().to_string(), "2021");
//! assert!((layers[0].heatmap.max_value().unwrap() - 1.0).abs() < 1e-9);
//! ```

use std::borrow::Borrow;
use std::time::Instant;

use chrono::{DateTime, Datelike, Utc};
use geo::Coord;
use log::{debug, info, warn};

pub mod error;
pub use error::{HeatmapError, Result};

pub mod geo_utils;
pub use geo_utils::{Extent, MAX_GAP};

pub mod projection;
pub use projection::{Projection, ProjectionKind};

pub mod tracks;
pub use tracks::{split_track, GapSplit, Polyline, TrackSegmenter};

pub mod cluster;
pub use cluster::{Clusterer, ClustererKind, CountMode, Kernel, KernelClusterer, ScaledClusterer};

pub mod heatmap;
pub use heatmap::{segments_by_value, Heatmap};

pub mod timeseries;
pub use timeseries::{GroupKey, GroupMode, Grouping, Timeseries};

pub mod activity;
pub use activity::{Activity, ActivityType};

pub mod config;
pub use config::HeatmapConfig;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in degrees.
///
/// # Example
/// ```
/// use gps_heatmap::LatLon;
/// let point = LatLon::new(60.1699, 24.9384); // Helsinki
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Approximate distance in meters to `other`.
    ///
    /// See [`geo_utils::equirectangular_distance`].
    #[inline]
    pub fn distance_to(&self, other: &LatLon) -> f64 {
        geo_utils::equirectangular_distance(self, other)
    }
}

/// A pixel coordinate on the projected plane.
///
/// Heatmaps are keyed by discrete cells, so planar coordinates are always
/// integers; constructing one from floating values rounds to the nearest pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Round floating coordinates to the nearest pixel.
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(x.round() as i64, y.round() as i64)
    }

    #[inline]
    pub fn offset(&self, dx: i64, dy: i64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<Coord<f64>> for Point {
    fn from(coord: Coord<f64>) -> Self {
        Point::from_f64(coord.x, coord.y)
    }
}

impl From<Point> for Coord<f64> {
    fn from(point: Point) -> Self {
        Coord { x: point.x as f64, y: point.y as f64 }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Segment every activity into polylines filed under the activity's date.
pub fn load_lines<I, A>(
    activities: I,
    projection: &Projection,
    max_gap: f64,
) -> Timeseries<DateTime<Utc>, Polyline>
where
    I: IntoIterator<Item = A>,
    A: Borrow<Activity>,
{
    let mut lines = Timeseries::new();
    let mut count = 0;

    for activity in activities {
        let activity = activity.borrow();
        info!("Parsing: {}", activity);
        if let Some(avg_distance) = activity.avg_distance() {
            debug!("avg_distance: {:.2}", avg_distance);
        }

        let mut segmenter = activity.lines(projection, max_gap);
        for line in segmenter.by_ref() {
            lines.add(activity.date, line);
        }
        if !segmenter.splits().is_empty() {
            debug!("Split into {} polylines on gaps", segmenter.splits().len() + 1);
        }
        count += 1;
    }

    info!("Loaded {} polylines from {} activities", lines.len(), count);
    lines
}

/// One rendering layer: a calendar group with its lines and normalized heatmap.
#[derive(Debug, Clone)]
pub struct Layer<'a> {
    /// Group key, `None` for the all-in-one group
    pub key: Option<GroupKey>,
    pub lines: Vec<&'a Polyline>,
    /// Log-normalized heatmap, values in `(0, 1]`
    pub heatmap: Heatmap,
}

impl Layer<'_> {
    /// Bounding box of this layer's lines grown by `margin`.
    pub fn extent(&self, margin: i64) -> Option<Extent> {
        Extent::from_lines(self.lines.iter().copied(), margin)
    }
}

/// Build one layer per calendar group.
///
/// Cumulative modes grow a single heatmap group by group, so each layer contains
/// everything up to and including its period. Groups without any points are
/// skipped.
pub fn build_layers<'a, D>(
    lines: &'a Timeseries<D, Polyline>,
    mode: GroupMode,
    clusterer: &Clusterer,
) -> Result<Vec<Layer<'a>>>
where
    D: Ord + Datelike + 'a,
{
    let start = Instant::now();
    let mut layers = Vec::new();

    let grouped = lines.grouped_by(mode.grouping);
    let groups: Box<dyn Iterator<Item = (Option<GroupKey>, Vec<&'a Polyline>)> + 'a> =
        if mode.cumulative {
            Box::new(grouped.cumulative())
        } else {
            Box::new(grouped)
        };

    // Cumulative groups extend the previous one; only the new tail is counted
    let mut running = Heatmap::new(clusterer.clone());
    let mut counted = 0;

    for (key, group_lines) in groups {
        let label = key.map_or_else(|| "all".to_string(), |k| k.to_string());

        let heatmap = if mode.cumulative {
            for line in &group_lines[counted..] {
                running.update(line);
            }
            counted = group_lines.len();
            running.clone()
        } else {
            Heatmap::from_lines(clusterer.clone(), group_lines.iter().copied())
        };

        if heatmap.is_empty() {
            warn!("Skipping group {}: no points in {} lines", label, group_lines.len());
            continue;
        }

        info!(
            "Heatmap for {} - {} lines, {} cells, min={}, max={}",
            label,
            group_lines.len(),
            heatmap.len(),
            heatmap.min_value()?,
            heatmap.max_value()?
        );

        layers.push(Layer {
            key,
            lines: group_lines,
            heatmap: heatmap.normalize_log()?,
        });
    }

    info!(
        "Built {} {} layers with {} clusterer in {:?}",
        layers.len(),
        mode,
        clusterer,
        start.elapsed()
    );
    Ok(layers)
}

// ============================================================================
// Unit Tests
// ============================================================================
