//! # Geographic Utilities
//!
//! Distance approximations, earth constants and planar bounding boxes used by the
//! projection, segmentation and rendering-support code.
//!
//! ## Overview
//!
//! | Item | Description |
//! |------|-------------|
//! | [`equirectangular_distance`] | Fast small-angle distance between two GPS points |
//! | [`haversine_distance`] | Great-circle distance, for checking the approximation |
//! | [`track_length`] | Total length of a GPS track in meters |
//! | [`Extent`] | Axis-aligned bounding box over pixel coordinates |
//!
//! ## Example
//!
//! ```rust
//! use gps_heatmap::{LatLon, geo_utils};
//!
//! let a = LatLon::new(60.1699, 24.9384); // Helsinki
//! let b = LatLon::new(60.1710, 24.9410);
//!
//! let fast = geo_utils::equirectangular_distance(&a, &b);
//! let exact = geo_utils::haversine_distance(&a, &b);
//! assert!((fast - exact).abs() < 1.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Equirectangular approximation
//!
//! The longitude delta is scaled by `cos(latitude)` to account for meridian
//! convergence, combined with the latitude delta as a Euclidean norm and scaled by
//! the meters-per-degree constant of the mean earth radius. Within a few kilometers
//! the error against the haversine formula stays well below GPS noise, which is all
//! the gap detection needs.
//!
//! Reference: [Equirectangular approximation](https://www.movable-type.co.uk/scripts/latlong.html)

use std::f64::consts::PI;

use geo::{Distance, Haversine};

use crate::{LatLon, Point, Polyline};

// =============================================================================
// Constants
// =============================================================================

/// Mean earth radius in meters.
pub const AVG_EARTH_RADIUS: f64 = 6_371_000.0;

/// Earth radius in meters used by the Web-Mercator (EPSG:3857) definition.
pub const WEB_MERCATOR_EARTH_RADIUS: f64 = 6_378_137.0;

/// Meters per degree of arc on a sphere with [`AVG_EARTH_RADIUS`].
pub const METERS_PER_DEGREE: f64 = 2.0 * PI * AVG_EARTH_RADIUS / 360.0;

/// Default maximum gap between consecutive track points, in meters.
pub const MAX_GAP: f64 = 700.0;

/// Meters per degree of arc on a sphere of the given radius.
#[inline]
pub fn meters_per_degree(earth_radius: f64) -> f64 {
    2.0 * PI * earth_radius / 360.0
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Approximate distance in meters from `from` to `to`.
///
/// Uses the equirectangular small-angle approximation with the longitude delta
/// scaled by the cosine of `from`'s latitude. Not symmetric in general, though the
/// asymmetry is negligible at the distances this is meant for.
///
/// # Arguments
///
/// * `from` - Point whose latitude sets the longitude scale
/// * `to` - Second point
///
/// # Returns
///
/// Distance in meters between the two points.
///
/// # Example
///
/// ```rust
/// use gps_heatmap::{LatLon, geo_utils};
///
/// let a = LatLon::new(0.0, 0.0);
/// let b = LatLon::new(1.0, 0.0);
/// let d = geo_utils::equirectangular_distance(&a, &b);
/// assert!((d - geo_utils::METERS_PER_DEGREE).abs() < 1e-6);
/// ```
#[inline]
pub fn equirectangular_distance(from: &LatLon, to: &LatLon) -> f64 {
    let coef = from.latitude.to_radians().cos();
    let dlat = from.latitude - to.latitude;
    let dlon = (from.longitude - to.longitude) * coef;
    dlat.hypot(dlon) * METERS_PER_DEGREE
}

/// Great-circle distance in meters between two GPS points (haversine formula).
///
/// Slower than [`equirectangular_distance`]; kept for callers that need exact
/// distances over long spans.
///
/// # Arguments
///
/// * `p1` - First GPS point
/// * `p2` - Second GPS point
///
/// # Returns
///
/// Distance in meters between the two points.
///
/// # Example
///
/// ```rust
/// use gps_heatmap::{LatLon, geo_utils};
///
/// let london = LatLon::new(51.5074, -0.1278);
/// let paris = LatLon::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &LatLon, p2: &LatLon) -> f64 {
    let point1 = geo::Point::new(p1.longitude, p1.latitude);
    let point2 = geo::Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a GPS track in meters using the equirectangular approximation.
///
/// Empty or single-point tracks return 0.0.
///
/// # Arguments
///
/// * `points` - Slice of GPS points forming the track
///
/// # Returns
///
/// Total track length in meters.
pub fn track_length(points: &[LatLon]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| equirectangular_distance(&w[1], &w[0]))
        .sum()
}

// =============================================================================
// Extent
// =============================================================================

/// Axis-aligned bounding box over pixel coordinates.
///
/// A constructed extent always satisfies `min.x <= max.x` and `min.y <= max.y`;
/// the "empty" extent is represented by the `None` returned from
/// [`Extent::from_points`] and [`Extent::from_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    min: Point,
    max: Point,
}

impl Extent {
    /// Extent covering exactly one point.
    pub fn from_point(point: Point) -> Self {
        Self { min: point, max: point }
    }

    /// Extent covering all given points, or `None` for an empty input.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gps_heatmap::{Point, geo_utils::Extent};
    ///
    /// let extent = Extent::from_points([Point::new(3, 1), Point::new(-2, 5)]).unwrap();
    /// assert_eq!(extent.min(), Point::new(-2, 1));
    /// assert_eq!(extent.max(), Point::new(3, 5));
    /// assert_eq!(extent.size(), (6, 5));
    /// ```
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut points = points.into_iter();
        let mut extent = Self::from_point(points.next()?);
        for point in points {
            extent.extend(point);
        }
        Some(extent)
    }

    /// Extent covering every point of every line, grown by `margin` on each side.
    ///
    /// Returns `None` when no line contains a point.
    pub fn from_lines<'a, I>(lines: I, margin: i64) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Polyline>,
    {
        let extent = Self::from_points(lines.into_iter().flat_map(|line| line.iter().copied()))?;
        if margin != 0 {
            Some(extent.resize(margin))
        } else {
            Some(extent)
        }
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    /// Grow the extent to include `point`. Never shrinks.
    pub fn extend(&mut self, point: Point) {
        self.min = Point::new(self.min.x.min(point.x), self.min.y.min(point.y));
        self.max = Point::new(self.max.x.max(point.x), self.max.y.max(point.y));
    }

    /// Include another extent.
    pub fn union(&mut self, other: &Extent) {
        self.extend(other.min);
        self.extend(other.max);
    }

    /// New extent grown by `margin` pixels on every side.
    ///
    /// A negative margin larger than half the size swaps the corners, which are
    /// re-ordered so the result is still a valid extent.
    pub fn resize(&self, margin: i64) -> Self {
        let mut resized = Self::from_point(Point::new(self.min.x - margin, self.min.y - margin));
        resized.extend(Point::new(self.max.x + margin, self.max.y + margin));
        resized
    }

    /// Width in pixels, both edges inclusive.
    pub fn width(&self) -> i64 {
        self.max.x - self.min.x + 1
    }

    /// Height in pixels, both edges inclusive.
    pub fn height(&self) -> i64 {
        self.max.y - self.min.y + 1
    }

    pub fn size(&self) -> (i64, i64) {
        (self.width(), self.height())
    }

    /// Check whether `point` lies inside the extent (edges inclusive).
    pub fn contains(&self, point: &Point) -> bool {
        self.min.x <= point.x
            && point.x <= self.max.x
            && self.min.y <= point.y
            && point.y <= self.max.y
    }

    /// Point relative to `min`, i.e. in canvas space.
    pub fn translate(&self, point: &Point) -> Point {
        Point::new(point.x - self.min.x, point.y - self.min.y)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_equirectangular_distance_same_point() {
        let p = LatLon::new(60.1699, 24.9384);
        assert_eq!(equirectangular_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_equirectangular_distance_along_equator() {
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0, 0.001);
        let d = equirectangular_distance(&b, &a);
        assert!(approx_eq(d, 111.19, 0.01));
    }

    #[test]
    fn test_equirectangular_close_to_haversine() {
        let a = LatLon::new(51.5074, -0.1278);
        let b = LatLon::new(51.5120, -0.1200);
        let fast = equirectangular_distance(&b, &a);
        let exact = haversine_distance(&a, &b);
        assert!(approx_eq(fast, exact, 1.0));
    }

    #[test]
    fn test_equirectangular_monotonic_with_ground_distance() {
        let origin = LatLon::new(45.0, 10.0);
        let mut prev_fast = 0.0;
        let mut prev_exact = 0.0;
        for step in 1..20 {
            let p = LatLon::new(45.0 + step as f64 * 0.0007, 10.0 + step as f64 * 0.0011);
            let fast = equirectangular_distance(&p, &origin);
            let exact = haversine_distance(&origin, &p);
            assert!(fast > prev_fast);
            assert!(exact > prev_exact);
            prev_fast = fast;
            prev_exact = exact;
        }
    }

    #[test]
    fn test_track_length() {
        assert_eq!(track_length(&[]), 0.0);
        assert_eq!(track_length(&[LatLon::new(1.0, 1.0)]), 0.0);

        let track = vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 0.001),
            LatLon::new(0.0, 0.002),
        ];
        assert!(approx_eq(track_length(&track), 222.39, 0.01));
    }

    #[test]
    fn test_meters_per_degree_matches_constant() {
        assert!(approx_eq(meters_per_degree(AVG_EARTH_RADIUS), METERS_PER_DEGREE, 1e-9));
        assert!(meters_per_degree(WEB_MERCATOR_EARTH_RADIUS) > METERS_PER_DEGREE);
    }

    #[test]
    fn test_extent_from_points_empty() {
        assert!(Extent::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_extent_extend_is_monotonic() {
        let mut extent = Extent::from_point(Point::new(0, 0));
        extent.extend(Point::new(5, -3));
        extent.extend(Point::new(1, 1));
        assert_eq!(extent.min(), Point::new(0, -3));
        assert_eq!(extent.max(), Point::new(5, 1));
    }

    #[test]
    fn test_extent_resize_and_size() {
        let extent = Extent::from_points([Point::new(10, 20), Point::new(30, 25)]).unwrap();
        assert_eq!(extent.size(), (21, 6));

        let grown = extent.resize(5);
        assert_eq!(grown.min(), Point::new(5, 15));
        assert_eq!(grown.max(), Point::new(35, 30));
        // Source extent untouched
        assert_eq!(extent.min(), Point::new(10, 20));
    }

    #[test]
    fn test_extent_contains_and_translate() {
        let extent = Extent::from_points([Point::new(-5, -5), Point::new(5, 5)]).unwrap();
        assert!(extent.contains(&Point::new(5, -5)));
        assert!(extent.contains(&Point::new(0, 0)));
        assert!(!extent.contains(&Point::new(6, 0)));
        assert_eq!(extent.translate(&Point::new(0, 0)), Point::new(5, 5));
    }

    #[test]
    fn test_extent_from_lines_with_margin() {
        let a: Polyline = [Point::new(0, 0), Point::new(10, 0)].into_iter().collect();
        let b: Polyline = [Point::new(3, 7)].into_iter().collect();
        let empty = Polyline::new();

        let extent = Extent::from_lines([&a, &empty, &b], 100).unwrap();
        assert_eq!(extent.min(), Point::new(-100, -100));
        assert_eq!(extent.max(), Point::new(110, 107));

        assert!(Extent::from_lines([&empty], 100).is_none());
    }
}
