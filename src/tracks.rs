//! # Track Segmentation
//!
//! Turns a raw, ordered sequence of GPS points into projected [`Polyline`]s.
//!
//! Whenever two consecutive points are farther apart than the gap threshold the
//! current polyline is closed and a new one started. This removes the long straight
//! artifacts drawn across the map when a recording was paused and resumed
//! somewhere else.
//!
//! ## Example
//!
//! ```rust
//! use gps_heatmap::{LatLon, Projection, TrackSegmenter};
//!
//! let projection = Projection::equirectangular(1.0).unwrap();
//! let points = vec![
//!     LatLon::new(0.0, 0.0),
//!     LatLon::new(0.0, 0.001),
//!     LatLon::new(10.0, 10.0), // far away: starts a new polyline
//! ];
//!
//! let lines: Vec<_> = TrackSegmenter::new(points, &projection, 700.0).collect();
//! assert_eq!(lines.len(), 2);
//! assert_eq!(lines[0].len(), 2);
//! assert_eq!(lines[1].len(), 1);
//! ```

use std::mem;

use geo::{Coord, LineString};
use log::debug;

use crate::geo_utils::Extent;
use crate::projection::Projection;
use crate::{LatLon, Point};

// =============================================================================
// Polyline
// =============================================================================

/// Ordered sequence of pixel coordinates without consecutive duplicates.
///
/// Non-consecutive repeats are kept: a track passing the same cell twice visits
/// it twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point unless it equals the last one.
    pub fn push(&mut self, point: Point) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Bounding box of the line, `None` when empty.
    pub fn extent(&self) -> Option<Extent> {
        Extent::from_points(self.points.iter().copied())
    }
}

impl Extend<Point> for Polyline {
    fn extend<T: IntoIterator<Item = Point>>(&mut self, iter: T) {
        for point in iter {
            self.push(point);
        }
    }
}

impl FromIterator<Point> for Polyline {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        let mut line = Polyline::new();
        line.extend(iter);
        line
    }
}

impl<'a> IntoIterator for &'a Polyline {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl From<&Polyline> for LineString<f64> {
    fn from(line: &Polyline) -> Self {
        line.points.iter().map(|&p| Coord::<f64>::from(p)).collect()
    }
}

// =============================================================================
// Segmenter
// =============================================================================

/// A gap that caused the segmenter to start a new polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapSplit {
    /// Index of the input point that starts the new polyline
    pub index: usize,
    /// Distance in meters to the previous input point
    pub distance: f64,
}

/// Lazily splits a GPS track into projected polylines on gaps.
///
/// Yields at least one polyline: an empty input produces a single empty polyline,
/// and the final polyline is always emitted even if it is empty. Downstream
/// consumers treat empty polylines as no-ops.
pub struct TrackSegmenter<'a, I> {
    points: I,
    projection: &'a Projection,
    max_gap: f64,
    prev: Option<LatLon>,
    index: usize,
    line: Polyline,
    splits: Vec<GapSplit>,
    finished: bool,
}

impl<'a, I> TrackSegmenter<'a, I>
where
    I: Iterator<Item = LatLon>,
{
    /// Create a segmenter over `points` splitting on gaps larger than `max_gap` meters.
    pub fn new<T>(points: T, projection: &'a Projection, max_gap: f64) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            points: points.into_iter(),
            projection,
            max_gap,
            prev: None,
            index: 0,
            line: Polyline::new(),
            splits: Vec::new(),
            finished: false,
        }
    }

    /// Gap splits encountered so far.
    pub fn splits(&self) -> &[GapSplit] {
        &self.splits
    }
}

impl<I> Iterator for TrackSegmenter<'_, I>
where
    I: Iterator<Item = LatLon>,
{
    type Item = Polyline;

    fn next(&mut self) -> Option<Polyline> {
        if self.finished {
            return None;
        }

        for latlon in self.points.by_ref() {
            let index = self.index;
            self.index += 1;

            let gap = self
                .prev
                .map(|prev| latlon.distance_to(&prev))
                .filter(|&distance| distance > self.max_gap);
            self.prev = Some(latlon);

            let point = self.projection.project_point(&latlon);

            if let Some(distance) = gap {
                debug!(
                    "Splitting track at point {}: {:.0}m gap > {:.0}m max gap",
                    index, distance, self.max_gap
                );
                self.splits.push(GapSplit { index, distance });

                let finished = mem::take(&mut self.line);
                self.line.push(point);
                if !finished.is_empty() {
                    return Some(finished);
                }
                continue;
            }

            self.line.push(point);
        }

        self.finished = true;
        Some(mem::take(&mut self.line))
    }
}

/// Split a GPS track into polylines, collecting them eagerly.
pub fn split_track(points: &[LatLon], projection: &Projection, max_gap: f64) -> Vec<Polyline> {
    TrackSegmenter::new(points.iter().copied(), projection, max_gap).collect()
}
