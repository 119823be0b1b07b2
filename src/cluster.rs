//! # Clusterers
//!
//! Strategies that coarsen or smooth heatmap data.
//!
//! A [`Clusterer`] acts on both sides of a [`Heatmap`]:
//!
//! - **write path**: [`Clusterer::cluster_points`] decides which cell a visited
//!   point increments, and whether repeated visits to a cell count again;
//! - **read path**: [`Clusterer::cluster_point`] maps a lookup to its cell, and
//!   [`Clusterer::cluster_heatmap`] smooths the whole map before normalization.
//!
//! | Variant | Write path | Read path |
//! |---------|------------|-----------|
//! | [`Clusterer::Identity`] | pass-through | pass-through |
//! | [`Clusterer::Scaled`] | downsample to a coarse grid | lookups downsampled, no smoothing |
//! | [`Clusterer::Kernel`] | pass-through | weighted neighborhood sum |

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};
use crate::heatmap::Heatmap;
use crate::Point;

/// Clusterer identifier as used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ClustererKind {
    None,
    /// Scaled, each coarse cell counted once per consecutive run
    Scaled,
    /// Scaled, every point counted
    ScaledEvery,
    Linear,
    #[default]
    Gaussian,
}

impl ClustererKind {
    pub fn name(self) -> &'static str {
        match self {
            ClustererKind::None => "none",
            ClustererKind::Scaled => "scaled",
            ClustererKind::ScaledEvery => "scaled-every",
            ClustererKind::Linear => "linear",
            ClustererKind::Gaussian => "gaussian",
        }
    }
}

impl fmt::Display for ClustererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClustererKind {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ClustererKind::None),
            "scaled" => Ok(ClustererKind::Scaled),
            "scaled-every" => Ok(ClustererKind::ScaledEvery),
            "linear" => Ok(ClustererKind::Linear),
            "gaussian" => Ok(ClustererKind::Gaussian),
            _ => Err(HeatmapError::UnknownClusterer(s.to_string())),
        }
    }
}

// =============================================================================
// Scaled
// =============================================================================

/// How the scaled clusterer counts repeated visits to the same coarse cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    /// Consecutive points in the same cell count once (idle stretches don't pile up)
    #[default]
    Once,
    /// Every point counts (weights dwell time)
    Every,
}

/// Downsamples pixel coordinates onto a coarser grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledClusterer {
    scale: f64,
    mode: CountMode,
}

impl ScaledClusterer {
    /// Create a scaled clusterer.
    ///
    /// `cluster_scale` may be given either as a reduction factor (`0.25`) or as a
    /// magnification (`4.0`); values above 1 are inverted, so both mean one output
    /// cell per 4x4 block of input cells.
    pub fn new(cluster_scale: f64, mode: CountMode) -> Result<Self> {
        if !cluster_scale.is_finite() || cluster_scale <= 0.0 {
            return Err(HeatmapError::InvalidParameter(format!(
                "cluster scale must be positive, got {}",
                cluster_scale
            )));
        }
        let scale = if cluster_scale > 1.0 { 1.0 / cluster_scale } else { cluster_scale };
        Ok(Self { scale, mode })
    }

    /// Reduction factor, always in `(0, 1]`.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mode(&self) -> CountMode {
        self.mode
    }

    #[inline]
    pub fn cluster_point(&self, point: Point) -> Point {
        Point::from_f64(point.x as f64 * self.scale, point.y as f64 * self.scale)
    }
}

// =============================================================================
// Kernel
// =============================================================================

/// Kernel weight function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// `1 - d/r`
    Linear,
    /// `e^(-d * ln(256)/r)`, decaying to about 1/256 at the radius
    Gaussian,
}

impl Kernel {
    /// Weight at `distance` for a kernel of `radius`; zero at and beyond the radius.
    pub fn weight(self, distance: f64, radius: u32) -> f64 {
        let radius = radius as f64;
        if distance >= radius {
            return 0.0;
        }
        match self {
            Kernel::Linear => 1.0 - distance / radius,
            Kernel::Gaussian => {
                let scale = 256f64.ln() / radius;
                (-distance * scale).exp()
            }
        }
    }
}

/// One entry of a kernel's weights table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelWeight {
    pub dx: i64,
    pub dy: i64,
    pub weight: f64,
}

/// Smooths a heatmap by summing weighted neighbor values.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelClusterer {
    kernel: Kernel,
    radius: u32,
    weights: Vec<KernelWeight>,
}

impl KernelClusterer {
    /// Create a kernel clusterer and precompute its weights table.
    pub fn new(kernel: Kernel, radius: u32) -> Result<Self> {
        if radius == 0 {
            return Err(HeatmapError::InvalidParameter(
                "kernel radius must be at least 1".to_string(),
            ));
        }

        let r = radius as i64;
        let mut weights = Vec::new();
        for dx in -r..=r {
            for dy in -r..=r {
                let distance = (dx as f64).hypot(dy as f64);
                let weight = kernel.weight(distance, radius);
                if weight > 0.0 {
                    weights.push(KernelWeight { dx, dy, weight });
                }
            }
        }

        Ok(Self { kernel, radius, weights })
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn weights(&self) -> &[KernelWeight] {
        &self.weights
    }

    pub fn weight(&self, distance: f64) -> f64 {
        self.kernel.weight(distance, self.radius)
    }

    /// New heatmap where every existing cell holds the weighted sum of the source
    /// values around it. Cells absent from the source are never created.
    pub fn convolve(&self, heatmap: &Heatmap) -> Heatmap {
        let cells = heatmap.iter().map(|(point, _)| {
            let value = self
                .weights
                .iter()
                .map(|w| w.weight * heatmap.get_raw(point.offset(w.dx, w.dy)))
                .sum::<f64>();
            (point, value)
        });
        Heatmap::from_cells(heatmap.clusterer().clone(), cells)
    }
}

// =============================================================================
// Clusterer
// =============================================================================

/// Heatmap clustering strategy.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Clusterer {
    /// No clustering
    #[default]
    Identity,
    Scaled(ScaledClusterer),
    Kernel(KernelClusterer),
}

impl Clusterer {
    /// Build a clusterer from its configuration identifier.
    ///
    /// `cluster_scale` is used by the scaled variants, `radius` by the kernel ones.
    ///
    /// # Example
    /// ```
    /// use gps_heatmap::{Clusterer, ClustererKind};
    ///
    /// let clusterer = Clusterer::from_kind(ClustererKind::Gaussian, 3.0, 5).unwrap();
    /// assert_eq!(clusterer.name(), "gaussian");
    /// ```
    pub fn from_kind(kind: ClustererKind, cluster_scale: f64, radius: u32) -> Result<Self> {
        match kind {
            ClustererKind::None => Ok(Clusterer::Identity),
            ClustererKind::Scaled => Self::scaled(cluster_scale, CountMode::Once),
            ClustererKind::ScaledEvery => Self::scaled(cluster_scale, CountMode::Every),
            ClustererKind::Linear => Self::linear(radius),
            ClustererKind::Gaussian => Self::gaussian(radius),
        }
    }

    pub fn scaled(cluster_scale: f64, mode: CountMode) -> Result<Self> {
        ScaledClusterer::new(cluster_scale, mode).map(Clusterer::Scaled)
    }

    pub fn linear(radius: u32) -> Result<Self> {
        KernelClusterer::new(Kernel::Linear, radius).map(Clusterer::Kernel)
    }

    pub fn gaussian(radius: u32) -> Result<Self> {
        KernelClusterer::new(Kernel::Gaussian, radius).map(Clusterer::Kernel)
    }

    pub fn kind(&self) -> ClustererKind {
        match self {
            Clusterer::Identity => ClustererKind::None,
            Clusterer::Scaled(s) => match s.mode {
                CountMode::Once => ClustererKind::Scaled,
                CountMode::Every => ClustererKind::ScaledEvery,
            },
            Clusterer::Kernel(k) => match k.kernel {
                Kernel::Linear => ClustererKind::Linear,
                Kernel::Gaussian => ClustererKind::Gaussian,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Cell a single point belongs to.
    #[inline]
    pub fn cluster_point(&self, point: Point) -> Point {
        match self {
            Clusterer::Scaled(s) => s.cluster_point(point),
            Clusterer::Identity | Clusterer::Kernel(_) => point,
        }
    }

    /// Lazily map a point sequence to the cells it increments.
    pub fn cluster_points<I>(&self, points: I) -> ClusterPoints<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Point>,
    {
        ClusterPoints {
            clusterer: self,
            points: points.into_iter(),
            prev: None,
        }
    }

    /// Smoothed copy of `heatmap`; only kernel clusterers change values.
    pub fn cluster_heatmap(&self, heatmap: &Heatmap) -> Heatmap {
        match self {
            Clusterer::Kernel(k) => k.convolve(heatmap),
            Clusterer::Identity | Clusterer::Scaled(_) => heatmap.clone(),
        }
    }
}

impl fmt::Display for Clusterer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clusterer::Identity => write!(f, "none"),
            Clusterer::Scaled(s) => write!(f, "{} (scale={})", self.name(), s.scale),
            Clusterer::Kernel(k) => write!(f, "{} (radius={})", self.name(), k.radius),
        }
    }
}

/// Iterator returned by [`Clusterer::cluster_points`].
pub struct ClusterPoints<'a, I> {
    clusterer: &'a Clusterer,
    points: I,
    prev: Option<Point>,
}

impl<I> Iterator for ClusterPoints<'_, I>
where
    I: Iterator<Item = Point>,
{
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        loop {
            let point = self.clusterer.cluster_point(self.points.next()?);
            if let Clusterer::Scaled(scaled) = self.clusterer {
                let repeated = self.prev == Some(point);
                self.prev = Some(point);
                if repeated && scaled.mode == CountMode::Once {
                    continue;
                }
            }
            return Some(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("gaussian".parse::<ClustererKind>().unwrap(), ClustererKind::Gaussian);
        assert_eq!("none".parse::<ClustererKind>().unwrap(), ClustererKind::None);
        assert_eq!("scaled-every".parse::<ClustererKind>().unwrap(), ClustererKind::ScaledEvery);
        assert_eq!(
            "median".parse::<ClustererKind>(),
            Err(HeatmapError::UnknownClusterer("median".to_string()))
        );
    }

    #[test]
    fn test_from_kind_round_trips_kind() {
        for kind in [
            ClustererKind::None,
            ClustererKind::Scaled,
            ClustererKind::ScaledEvery,
            ClustererKind::Linear,
            ClustererKind::Gaussian,
        ] {
            assert_eq!(Clusterer::from_kind(kind, 3.0, 5).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Clusterer::scaled(0.0, CountMode::Once).is_err());
        assert!(Clusterer::scaled(-2.0, CountMode::Once).is_err());
        assert!(Clusterer::gaussian(0).is_err());
        assert!(Clusterer::from_kind(ClustererKind::Linear, 3.0, 0).is_err());
        // Radius is irrelevant for scaled clusterers
        assert!(Clusterer::from_kind(ClustererKind::Scaled, 3.0, 0).is_ok());
    }

    #[test]
    fn test_identity_is_pass_through() {
        let clusterer = Clusterer::Identity;
        let p = Point::new(7, -3);
        assert_eq!(clusterer.cluster_point(p), p);

        let points = vec![p, p, Point::new(1, 1)];
        let clustered: Vec<Point> = clusterer.cluster_points(points.clone()).collect();
        assert_eq!(clustered, points);
    }

    #[test]
    fn test_scaled_inverts_magnification() {
        let a = ScaledClusterer::new(3.0, CountMode::Once).unwrap();
        let b = ScaledClusterer::new(1.0 / 3.0, CountMode::Once).unwrap();
        assert!(approx_eq(a.scale(), b.scale(), 1e-12));
        assert_eq!(a.cluster_point(Point::new(9, -9)), Point::new(3, -3));
        assert_eq!(a.cluster_point(Point::new(10, 4)), Point::new(3, 1));
    }

    #[test]
    fn test_scaled_count_once_collapses_runs() {
        let clusterer = Clusterer::scaled(3.0, CountMode::Once).unwrap();
        let points = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(3, 0),
            Point::new(4, 0),
            Point::new(0, 0),
        ];
        let clustered: Vec<Point> = clusterer.cluster_points(points).collect();
        assert_eq!(clustered, vec![Point::new(0, 0), Point::new(1, 0), Point::new(0, 0)]);
    }

    #[test]
    fn test_scaled_count_every_keeps_all() {
        let clusterer = Clusterer::scaled(3.0, CountMode::Every).unwrap();
        let points = vec![Point::new(0, 0), Point::new(1, 0), Point::new(3, 0)];
        let clustered: Vec<Point> = clusterer.cluster_points(points).collect();
        assert_eq!(clustered, vec![Point::new(0, 0), Point::new(0, 0), Point::new(1, 0)]);
    }

    #[test]
    fn test_scaled_idempotent_on_coarse_grid() {
        let clusterer = ScaledClusterer::new(1.0, CountMode::Once).unwrap();
        let p = Point::new(12, -7);
        assert_eq!(clusterer.cluster_point(clusterer.cluster_point(p)), clusterer.cluster_point(p));

        // With a real reduction the scale is lossy; re-applying keeps shrinking
        let coarse = ScaledClusterer::new(2.0, CountMode::Once).unwrap();
        let once = coarse.cluster_point(Point::new(40, 40));
        assert_eq!(once, Point::new(20, 20));
        assert_ne!(coarse.cluster_point(once), once);
    }

    #[test]
    fn test_linear_weights() {
        assert!(approx_eq(Kernel::Linear.weight(0.0, 4), 1.0, 1e-12));
        assert!(approx_eq(Kernel::Linear.weight(1.0, 4), 0.75, 1e-12));
        assert_eq!(Kernel::Linear.weight(4.0, 4), 0.0);
        assert_eq!(Kernel::Linear.weight(5.0, 4), 0.0);
    }

    #[test]
    fn test_gaussian_weights() {
        assert!(approx_eq(Kernel::Gaussian.weight(0.0, 5), 1.0, 1e-12));
        // Decays to about 1/256 just inside the radius
        let near_edge = Kernel::Gaussian.weight(4.999_999, 5);
        assert!(approx_eq(near_edge, 1.0 / 256.0, 1e-6));
        assert_eq!(Kernel::Gaussian.weight(5.0, 5), 0.0);
    }

    #[test]
    fn test_weights_table_within_radius() {
        let kernel = KernelClusterer::new(Kernel::Linear, 2).unwrap();
        // Origin, 4 axis neighbors, 4 diagonals
        assert_eq!(kernel.weights().len(), 9);
        for w in kernel.weights() {
            assert!(((w.dx * w.dx + w.dy * w.dy) as f64).sqrt() < 2.0);
            assert!(w.weight > 0.0);
        }

        let tiny = KernelClusterer::new(Kernel::Gaussian, 1).unwrap();
        assert_eq!(tiny.weights(), &[KernelWeight { dx: 0, dy: 0, weight: 1.0 }]);
    }

    #[test]
    fn test_kernel_single_point() {
        let clusterer = Clusterer::gaussian(5).unwrap();
        let mut heatmap = Heatmap::new(clusterer.clone());
        heatmap.insert(Point::new(10, 10), 4.0);

        let clustered = clusterer.cluster_heatmap(&heatmap);
        assert_eq!(clustered.len(), 1);
        assert!(approx_eq(clustered.get_raw(Point::new(10, 10)), 4.0, 1e-12));
    }

    #[test]
    fn test_kernel_neighbors_contribute() {
        let clusterer = Clusterer::linear(3).unwrap();
        let mut heatmap = Heatmap::new(clusterer.clone());
        heatmap.insert(Point::new(0, 0), 3.0);
        heatmap.insert(Point::new(1, 0), 1.0);
        heatmap.insert(Point::new(10, 0), 1.0);

        let clustered = clusterer.cluster_heatmap(&heatmap);
        // No cells synthesized
        assert_eq!(clustered.len(), 3);
        let w1 = 1.0 - 1.0 / 3.0;
        assert!(approx_eq(clustered.get_raw(Point::new(0, 0)), 3.0 + w1, 1e-12));
        assert!(approx_eq(clustered.get_raw(Point::new(1, 0)), 1.0 + 3.0 * w1, 1e-12));
        assert!(approx_eq(clustered.get_raw(Point::new(10, 0)), 1.0, 1e-12));
        // Source untouched
        assert_eq!(heatmap.get_raw(Point::new(0, 0)), 3.0);
    }

    #[test]
    fn test_non_kernel_cluster_heatmap_is_copy() {
        let clusterer = Clusterer::scaled(3.0, CountMode::Once).unwrap();
        let mut heatmap = Heatmap::new(clusterer.clone());
        heatmap.insert(Point::new(1, 1), 2.0);
        assert_eq!(clusterer.cluster_heatmap(&heatmap), heatmap);
    }

    #[test]
    fn test_display() {
        assert_eq!(Clusterer::Identity.to_string(), "none");
        assert_eq!(Clusterer::linear(3).unwrap().to_string(), "linear (radius=3)");
    }
}
