//! # Map Projections
//!
//! Converts geographic coordinates into planar pixel coordinates at a configurable
//! scale (meters per pixel).
//!
//! Two algorithms share the same scale API so callers can swap them freely:
//!
//! - [`ProjectionKind::Equirectangular`]: `x = lon * ppd`, `y = lat * ppd`. Linear,
//!   no singularities.
//! - [`ProjectionKind::WebMercator`]: `x = lon * ppd`,
//!   `y = ppr * ln(tan(π/4 + lat/2))`. Uses the EPSG:3857 earth radius so the
//!   output lines up with common web map tiles. Diverges towards the poles; callers
//!   must not feed polar coordinates.
//!
//! `ppd` is pixels per degree and `ppr` pixels per radian.

use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::str::FromStr;

use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};
use crate::geo_utils::{meters_per_degree, AVG_EARTH_RADIUS, WEB_MERCATOR_EARTH_RADIUS};
use crate::{LatLon, Point};

/// Projection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ProjectionKind {
    Equirectangular,
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "mercator"))]
    WebMercator,
}

impl ProjectionKind {
    /// Earth radius in meters the projection is defined on.
    pub fn earth_radius(self) -> f64 {
        match self {
            ProjectionKind::Equirectangular => AVG_EARTH_RADIUS,
            ProjectionKind::WebMercator => WEB_MERCATOR_EARTH_RADIUS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProjectionKind::Equirectangular => "equirectangular",
            ProjectionKind::WebMercator => "web-mercator",
        }
    }
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectionKind {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equirectangular" => Ok(ProjectionKind::Equirectangular),
            "mercator" | "web-mercator" | "webmercator" => Ok(ProjectionKind::WebMercator),
            _ => Err(HeatmapError::UnknownProjection(s.to_string())),
        }
    }
}

/// A configured projection: algorithm plus scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    kind: ProjectionKind,
    meters_per_degree: f64,
    pixels_per_degree: f64,
    pixels_per_radian: f64,
}

impl Projection {
    /// Create a projection with the given scale in meters per pixel.
    ///
    /// # Example
    /// ```
    /// use gps_heatmap::{LatLon, Point, Projection, ProjectionKind};
    ///
    /// let projection = Projection::new(ProjectionKind::Equirectangular, 1.0).unwrap();
    /// let point = projection.project_point(&LatLon::new(0.0, 0.001));
    /// assert_eq!(point, Point::new(111, 0));
    /// ```
    pub fn new(kind: ProjectionKind, meters_per_pixel: f64) -> Result<Self> {
        let meters_per_degree = meters_per_degree(kind.earth_radius());
        let mut projection = Self {
            kind,
            meters_per_degree,
            pixels_per_degree: 0.0,
            pixels_per_radian: 0.0,
        };
        projection.set_meters_per_pixel(meters_per_pixel)?;
        Ok(projection)
    }

    pub fn equirectangular(meters_per_pixel: f64) -> Result<Self> {
        Self::new(ProjectionKind::Equirectangular, meters_per_pixel)
    }

    pub fn web_mercator(meters_per_pixel: f64) -> Result<Self> {
        Self::new(ProjectionKind::WebMercator, meters_per_pixel)
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    pub fn meters_per_degree(&self) -> f64 {
        self.meters_per_degree
    }

    pub fn pixels_per_degree(&self) -> f64 {
        self.pixels_per_degree
    }

    pub fn pixels_per_radian(&self) -> f64 {
        self.pixels_per_radian
    }

    pub fn meters_per_pixel(&self) -> f64 {
        self.meters_per_degree / self.pixels_per_degree
    }

    /// Set the scale directly in pixels per degree.
    pub fn set_pixels_per_degree(&mut self, pixels_per_degree: f64) -> Result<()> {
        if !pixels_per_degree.is_finite() || pixels_per_degree <= 0.0 {
            return Err(HeatmapError::InvalidParameter(format!(
                "pixels per degree must be positive, got {}",
                pixels_per_degree
            )));
        }
        self.pixels_per_degree = pixels_per_degree;
        self.pixels_per_radian = pixels_per_degree.to_degrees();
        Ok(())
    }

    /// Set the scale in meters per pixel.
    pub fn set_meters_per_pixel(&mut self, meters_per_pixel: f64) -> Result<()> {
        if !meters_per_pixel.is_finite() || meters_per_pixel <= 0.0 {
            return Err(HeatmapError::InvalidParameter(format!(
                "scale must be a positive number of meters per pixel, got {}",
                meters_per_pixel
            )));
        }
        self.set_pixels_per_degree(self.meters_per_degree / meters_per_pixel)
    }

    /// Project to unrounded planar pixel coordinates.
    pub fn project(&self, latlon: &LatLon) -> Coord<f64> {
        let x = latlon.longitude * self.pixels_per_degree;
        let y = match self.kind {
            ProjectionKind::Equirectangular => latlon.latitude * self.pixels_per_degree,
            ProjectionKind::WebMercator => {
                let lat = latlon.latitude.to_radians();
                self.pixels_per_radian * (FRAC_PI_4 + lat / 2.0).tan().ln()
            }
        };
        Coord { x, y }
    }

    /// Project to the nearest integer pixel.
    #[inline]
    pub fn project_point(&self, latlon: &LatLon) -> Point {
        Point::from(self.project(latlon))
    }

    /// Project and convert the result back to meters.
    pub fn project_meters(&self, latlon: &LatLon) -> Coord<f64> {
        let coord = self.project(latlon);
        let scale = self.meters_per_pixel();
        Coord { x: coord.x * scale, y: coord.y * scale }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_parse_projection_kind() {
        assert_eq!("equirectangular".parse::<ProjectionKind>().unwrap(), ProjectionKind::Equirectangular);
        assert_eq!("mercator".parse::<ProjectionKind>().unwrap(), ProjectionKind::WebMercator);
        assert_eq!("Web-Mercator".parse::<ProjectionKind>().unwrap(), ProjectionKind::WebMercator);
        assert_eq!(
            "robinson".parse::<ProjectionKind>(),
            Err(HeatmapError::UnknownProjection("robinson".to_string()))
        );
    }

    #[test]
    fn test_invalid_scale_rejected() {
        assert!(Projection::equirectangular(0.0).is_err());
        assert!(Projection::equirectangular(-3.0).is_err());
        assert!(Projection::web_mercator(f64::NAN).is_err());
    }

    #[test]
    fn test_scale_conversions() {
        let projection = Projection::equirectangular(30.0).unwrap();
        assert!(approx_eq(projection.meters_per_pixel(), 30.0, 1e-9));
        assert!(approx_eq(projection.pixels_per_degree(), 111_194.926_644_558_7 / 30.0, 1e-6));
        assert!(approx_eq(
            projection.pixels_per_radian(),
            projection.pixels_per_degree() * 180.0 / std::f64::consts::PI,
            1e-6
        ));
    }

    #[test]
    fn test_set_meters_per_pixel_keeps_kind() {
        let mut projection = Projection::web_mercator(30.0).unwrap();
        projection.set_meters_per_pixel(10.0).unwrap();
        assert_eq!(projection.kind(), ProjectionKind::WebMercator);
        assert!(approx_eq(projection.meters_per_pixel(), 10.0, 1e-9));
        assert!(projection.set_meters_per_pixel(0.0).is_err());
        assert!(approx_eq(projection.meters_per_pixel(), 10.0, 1e-9));
    }

    #[test]
    fn test_equirectangular_projection() {
        let projection = Projection::equirectangular(1.0).unwrap();
        let coord = projection.project(&LatLon::new(1.0, 2.0));
        assert!(approx_eq(coord.x, 2.0 * projection.pixels_per_degree(), 1e-6));
        assert!(approx_eq(coord.y, projection.pixels_per_degree(), 1e-6));
    }

    #[test]
    fn test_mercator_origin_and_equator() {
        let projection = Projection::web_mercator(1.0).unwrap();
        let origin = projection.project(&LatLon::new(0.0, 0.0));
        assert!(approx_eq(origin.x, 0.0, 1e-9));
        assert!(approx_eq(origin.y, 0.0, 1e-6));

        // At 1 m/px the x axis is EPSG:3857 meters
        let east = projection.project(&LatLon::new(0.0, 180.0));
        assert!(approx_eq(east.x, 20_037_508.342_789_244, 1e-3));
    }

    #[test]
    fn test_mercator_matches_epsg_3857() {
        let projection = Projection::web_mercator(1.0).unwrap();
        // 45°N 90°E in EPSG:3857 meters
        let coord = projection.project(&LatLon::new(45.0, 90.0));
        assert!(approx_eq(coord.x, 10_018_754.171, 1e-2));
        assert!(approx_eq(coord.y, 5_621_521.486, 1e-2));
    }

    #[test]
    fn test_mercator_stretches_north() {
        let projection = Projection::web_mercator(1.0).unwrap();
        let equirect = Projection::equirectangular(1.0).unwrap();
        let p = LatLon::new(60.0, 0.0);
        assert!(projection.project(&p).y > equirect.project(&p).y);
    }

    #[test]
    fn test_project_point_rounds() {
        let projection = Projection::equirectangular(1.0).unwrap();
        assert_eq!(projection.project_point(&LatLon::new(0.0, 0.001)), Point::new(111, 0));
        assert_eq!(projection.project_point(&LatLon::new(-0.001, 0.0)), Point::new(0, -111));
    }

    #[test]
    fn test_project_meters() {
        let projection = Projection::equirectangular(25.0).unwrap();
        let meters = projection.project_meters(&LatLon::new(0.0, 0.01));
        assert!(approx_eq(meters.x, 1111.949, 0.001));
        assert!(approx_eq(meters.y, 0.0, 1e-9));
    }

    #[test]
    fn test_planar_distance_grows_with_ground_distance() {
        use crate::geo_utils::haversine_distance;

        let origin = LatLon::new(45.0, 7.0);
        let headings = [(1.0, 0.0), (0.0, 1.0), (-1.0, 1.0), (-0.5, -1.0)];

        for projection in [
            Projection::equirectangular(1.0).unwrap(),
            Projection::web_mercator(1.0).unwrap(),
        ] {
            let from = projection.project(&origin);
            for &(dlat, dlon) in &headings {
                let mut last_ground = 0.0;
                let mut last_planar = 0.0;
                for step in 1..=20 {
                    let point = LatLon::new(
                        origin.latitude + dlat * step as f64 * 0.005,
                        origin.longitude + dlon * step as f64 * 0.005,
                    );
                    let to = projection.project(&point);
                    let planar = (to.x - from.x).hypot(to.y - from.y);
                    let ground = haversine_distance(&origin, &point);

                    assert!(ground > last_ground);
                    assert!(
                        planar > last_planar,
                        "{} step {}: {} <= {}",
                        projection.kind(),
                        step,
                        planar,
                        last_planar
                    );
                    last_ground = ground;
                    last_planar = planar;
                }
            }
        }
    }
}
