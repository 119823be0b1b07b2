//! Density heatmap over pixel cells.
//!
//! Counts how often tracks visit each cell, as decided by the active
//! [`Clusterer`], and normalizes the counts into `(0, 1]` for color mapping.
//!
//! Reads go through the clusterer as well: [`Heatmap::get`] maps the queried pixel
//! to its cell first, so a map built with a scaled clusterer can be sampled at full
//! resolution without touching the stored counts.

use std::collections::HashMap;

use log::debug;

use crate::cluster::Clusterer;
use crate::error::{HeatmapError, Result};
use crate::geo_utils::Extent;
use crate::tracks::Polyline;
use crate::Point;

/// Sparse map from cell to accumulated value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Heatmap {
    clusterer: Clusterer,
    cells: HashMap<Point, f64>,
}

impl Heatmap {
    pub fn new(clusterer: Clusterer) -> Self {
        Self {
            clusterer,
            cells: HashMap::new(),
        }
    }

    /// Heatmap with the given cell values, stored as-is.
    pub fn from_cells<I>(clusterer: Clusterer, cells: I) -> Self
    where
        I: IntoIterator<Item = (Point, f64)>,
    {
        Self {
            clusterer,
            cells: cells.into_iter().collect(),
        }
    }

    /// Build a heatmap from polylines.
    ///
    /// # Example
    /// ```
    /// use gps_heatmap::{Clusterer, Heatmap, Point, Polyline};
    ///
    /// let line: Polyline = [Point::new(0, 0), Point::new(1, 0)].into_iter().collect();
    /// let heatmap = Heatmap::from_lines(Clusterer::Identity, [&line, &line]);
    /// assert_eq!(heatmap.get(Point::new(1, 0)), 2.0);
    /// ```
    pub fn from_lines<'a, I>(clusterer: Clusterer, lines: I) -> Self
    where
        I: IntoIterator<Item = &'a Polyline>,
    {
        let mut heatmap = Heatmap::new(clusterer);
        for line in lines {
            heatmap.update(line);
        }
        heatmap
    }

    /// Build a heatmap using all cores.
    ///
    /// Every worker fills its own partial heatmap over a chunk of the lines; the
    /// partials are summed at the end.
    #[cfg(feature = "parallel")]
    pub fn from_lines_parallel(clusterer: &Clusterer, lines: &[Polyline]) -> Self {
        use rayon::prelude::*;

        lines
            .par_iter()
            .fold(
                || Heatmap::new(clusterer.clone()),
                |mut heatmap, line| {
                    heatmap.update(line);
                    heatmap
                },
            )
            .reduce(
                || Heatmap::new(clusterer.clone()),
                |mut a, b| {
                    a.merge(b);
                    a
                },
            )
    }

    pub fn clusterer(&self) -> &Clusterer {
        &self.clusterer
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Point, f64)> + '_ {
        self.cells.iter().map(|(&point, &value)| (point, value))
    }

    /// Value of the cell `point` belongs to under the clusterer, 0 if unvisited.
    pub fn get(&self, point: Point) -> f64 {
        self.get_raw(self.clusterer.cluster_point(point))
    }

    /// Value stored for exactly this cell, 0 if unvisited.
    pub fn get_raw(&self, point: Point) -> f64 {
        self.cells.get(&point).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, point: Point, value: f64) {
        self.cells.insert(point, value);
    }

    /// Count one visit for every cell the clusterer maps the line to.
    pub fn update(&mut self, line: &Polyline) {
        for point in self.clusterer.cluster_points(line.iter().copied()) {
            *self.cells.entry(point).or_insert(0.0) += 1.0;
        }
    }

    /// Add another heatmap's values cell by cell.
    ///
    /// Both maps must use the same clusterer; cells of differently clustered maps
    /// live on different grids.
    pub fn merge(&mut self, other: Heatmap) {
        debug_assert_eq!(
            self.clusterer, other.clusterer,
            "merging heatmaps built with different clusterers"
        );
        for (point, value) in other.cells {
            *self.cells.entry(point).or_insert(0.0) += value;
        }
    }

    pub fn min_value(&self) -> Result<f64> {
        self.cells
            .values()
            .copied()
            .reduce(f64::min)
            .ok_or(HeatmapError::EmptyHeatmap)
    }

    pub fn max_value(&self) -> Result<f64> {
        self.cells
            .values()
            .copied()
            .reduce(f64::max)
            .ok_or(HeatmapError::EmptyHeatmap)
    }

    /// Clustered copy scaled so the maximum becomes 1.0.
    pub fn normalize(&self) -> Result<Heatmap> {
        self.normalize_with(|value, _| value)
    }

    /// Clustered copy, log-compressed with `ln(value + 1)` before scaling.
    ///
    /// Keeps rarely visited cells visible next to a few very hot ones.
    pub fn normalize_log(&self) -> Result<Heatmap> {
        self.normalize_with(|value, _| value.ln_1p())
    }

    /// Clustered copy with every value passed through `transform(value, max)` and
    /// divided by the transformed maximum.
    ///
    /// The maximum itself is transformed as `transform(max, max)`. The source is
    /// left untouched.
    pub fn normalize_with<F>(&self, transform: F) -> Result<Heatmap>
    where
        F: Fn(f64, f64) -> f64,
    {
        let clustered = self.clusterer.cluster_heatmap(self);
        let max_value = clustered.max_value()?;
        let max_value = transform(max_value, max_value);
        if !max_value.is_finite() || max_value <= 0.0 {
            return Err(HeatmapError::DegenerateMaximum(max_value));
        }
        debug!(
            "Normalizing {} cells against max {:.3}",
            clustered.len(),
            max_value
        );

        let cells = clustered
            .cells
            .into_iter()
            .map(|(point, value)| (point, transform(value, max_value) / max_value));
        Ok(Heatmap::from_cells(self.clusterer.clone(), cells))
    }

    /// Number of cells per distinct value, ascending by value.
    pub fn histogram(&self) -> Vec<(f64, usize)> {
        let mut values: Vec<f64> = self.cells.values().copied().collect();
        values.sort_by(f64::total_cmp);

        let mut histogram: Vec<(f64, usize)> = Vec::new();
        for value in values {
            if let Some((last, count)) = histogram.last_mut() {
                if *last == value {
                    *count += 1;
                    continue;
                }
            }
            histogram.push((value, 1));
        }
        histogram
    }
}

/// Split a line into runs sharing the same heat value, for drawing each run in a
/// single color.
///
/// The point where the value changes closes one run and opens the next, so the
/// drawn runs stay connected. With an `extent`, points outside it end the current
/// run and are dropped, and kept points are translated into extent space.
pub fn segments_by_value(
    line: &Polyline,
    heatmap: &Heatmap,
    extent: Option<&Extent>,
) -> Vec<(f64, Polyline)> {
    let mut segments = Vec::new();
    let mut segment = Polyline::new();
    let mut prev_value: Option<f64> = None;

    for &point in line {
        if let Some(extent) = extent {
            if !extent.contains(&point) {
                if let Some(value) = prev_value.take() {
                    if !segment.is_empty() {
                        segments.push((value, std::mem::take(&mut segment)));
                    }
                }
                segment = Polyline::new();
                continue;
            }
        }

        let value = heatmap.get(point);
        let point = match extent {
            Some(extent) => extent.translate(&point),
            None => point,
        };
        segment.push(point);

        if let Some(prev) = prev_value {
            if prev != value {
                let finished = std::mem::take(&mut segment);
                segment.push(point);
                segments.push((prev, finished));
            }
        }
        prev_value = Some(value);
    }

    if let Some(value) = prev_value {
        if !segment.is_empty() {
            segments.push((value, segment));
        }
    }
    segments
}
