//! Activities: date-tagged GPS tracks as delivered by a track loader.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::geo_utils;
use crate::projection::Projection;
use crate::tracks::TrackSegmenter;
use crate::LatLon;

/// Sport of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActivityType {
    Run,
    Ride,
    #[default]
    Unknown,
}

impl ActivityType {
    /// Guess the type from a file name stem such as `2021-05-01-Morning-Run`.
    pub fn from_file_stem(stem: &str) -> Self {
        if stem.ends_with("-Run") || stem.ends_with("-Running") {
            ActivityType::Run
        } else if stem.ends_with("-Ride") || stem.ends_with("-Cycling") {
            ActivityType::Ride
        } else {
            ActivityType::Unknown
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Run => write!(f, "Run"),
            ActivityType::Ride => write!(f, "Ride"),
            ActivityType::Unknown => write!(f, "N/A"),
        }
    }
}

/// A single recorded track.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub name: Option<String>,
    /// Recording date, or the source file's modification time when the track has none
    pub date: DateTime<Utc>,
    pub activity_type: ActivityType,
    pub points: Vec<LatLon>,
}

impl Activity {
    pub fn new(name: Option<String>, date: DateTime<Utc>, activity_type: ActivityType) -> Self {
        Self {
            name,
            date,
            activity_type,
            points: Vec::new(),
        }
    }

    pub fn with_points(mut self, points: Vec<LatLon>) -> Self {
        self.points = points;
        self
    }

    pub fn push(&mut self, point: LatLon) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Track length in meters.
    pub fn distance(&self) -> f64 {
        geo_utils::track_length(&self.points)
    }

    /// Mean distance between recorded points, `None` for an empty track.
    pub fn avg_distance(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.distance() / self.points.len() as f64)
    }

    /// Projected polylines of this track, split on gaps larger than `max_gap` meters.
    pub fn lines<'a>(
        &'a self,
        projection: &'a Projection,
        max_gap: f64,
    ) -> TrackSegmenter<'a, std::iter::Copied<std::slice::Iter<'a, LatLon>>> {
        TrackSegmenter::new(self.points.iter().copied(), projection, max_gap)
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} activity {:?} from {} ({} points)",
            self.activity_type,
            self.name.as_deref().unwrap_or(""),
            self.date.format("%Y-%m-%d"),
            self.points.len()
        )
    }
}
