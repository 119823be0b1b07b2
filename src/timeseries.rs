//! Date-ordered values with grouping by calendar period.
//!
//! Values are kept sorted by date as they are added; grouped views scan the dates
//! in order and yield one group per run of dates sharing a key (year, quarter,
//! month, ISO week or day).
//!
//! ```rust
//! use chrono::NaiveDate;
//! use gps_heatmap::{GroupKey, Grouping, Timeseries};
//!
//! let mut ts = Timeseries::new();
//! ts.add(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), "c");
//! ts.add(NaiveDate::from_ymd_opt(2021, 1, 5).unwrap(), "a");
//! ts.add(NaiveDate::from_ymd_opt(2021, 2, 10).unwrap(), "b");
//!
//! let groups: Vec<_> = ts.grouped_by(Grouping::Yearly).collect();
//! assert_eq!(groups[0], (Some(GroupKey::Year(2021)), vec![&"a", &"b"]));
//! assert_eq!(groups[1], (Some(GroupKey::Year(2022)), vec![&"c"]));
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};

// =============================================================================
// Group keys
// =============================================================================

/// Calendar period a date belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Year(i32),
    /// Year and quarter (1-4)
    Quarter(i32, u32),
    Month(i32, u32),
    /// ISO week-numbering year and week
    Week(i32, u32),
    Day(i32, u32, u32),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GroupKey::Year(year) => write!(f, "{}", year),
            GroupKey::Quarter(year, quarter) => write!(f, "{}-{}", year, quarter),
            GroupKey::Month(year, month) => write!(f, "{}-{:02}", year, month),
            GroupKey::Week(year, week) => write!(f, "{}-W{:02}", year, week),
            GroupKey::Day(year, month, day) => write!(f, "{}-{:02}-{:02}", year, month, day),
        }
    }
}

/// Calendar grouping of a timeseries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Grouping {
    /// Everything in one group
    #[default]
    All,
    Yearly,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl Grouping {
    /// Key of `date` under this grouping; `None` for [`Grouping::All`].
    pub fn key<D: Datelike>(self, date: &D) -> Option<GroupKey> {
        match self {
            Grouping::All => None,
            Grouping::Yearly => Some(GroupKey::Year(date.year())),
            Grouping::Quarterly => Some(GroupKey::Quarter(date.year(), (date.month() - 1) / 3 + 1)),
            Grouping::Monthly => Some(GroupKey::Month(date.year(), date.month())),
            Grouping::Weekly => {
                let week = date.iso_week();
                Some(GroupKey::Week(week.year(), week.week()))
            }
            Grouping::Daily => Some(GroupKey::Day(date.year(), date.month(), date.day())),
        }
    }
}

/// Grouping plus whether each group also contains all earlier groups.
///
/// Parses from `all`, the cumulative `yearly`, `quarterly`, `monthly`, `weekly`,
/// `daily` and the per-period `years`, `quarters`, `months`, `weeks`, `days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct GroupMode {
    pub grouping: Grouping,
    pub cumulative: bool,
}

impl GroupMode {
    pub fn new(grouping: Grouping, cumulative: bool) -> Self {
        Self { grouping, cumulative }
    }

    pub fn name(&self) -> &'static str {
        match (self.grouping, self.cumulative) {
            (Grouping::All, _) => "all",
            (Grouping::Yearly, true) => "yearly",
            (Grouping::Yearly, false) => "years",
            (Grouping::Quarterly, true) => "quarterly",
            (Grouping::Quarterly, false) => "quarters",
            (Grouping::Monthly, true) => "monthly",
            (Grouping::Monthly, false) => "months",
            (Grouping::Weekly, true) => "weekly",
            (Grouping::Weekly, false) => "weeks",
            (Grouping::Daily, true) => "daily",
            (Grouping::Daily, false) => "days",
        }
    }
}

impl fmt::Display for GroupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupMode {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self> {
        let (grouping, cumulative) = match s.trim().to_ascii_lowercase().as_str() {
            "all" => (Grouping::All, false),
            "yearly" => (Grouping::Yearly, true),
            "years" => (Grouping::Yearly, false),
            "quarterly" => (Grouping::Quarterly, true),
            "quarters" => (Grouping::Quarterly, false),
            "monthly" => (Grouping::Monthly, true),
            "months" => (Grouping::Monthly, false),
            "weekly" => (Grouping::Weekly, true),
            "weeks" => (Grouping::Weekly, false),
            "daily" => (Grouping::Daily, true),
            "days" => (Grouping::Daily, false),
            _ => return Err(HeatmapError::UnknownGrouping(s.to_string())),
        };
        Ok(Self { grouping, cumulative })
    }
}

impl TryFrom<String> for GroupMode {
    type Error = HeatmapError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<GroupMode> for String {
    fn from(mode: GroupMode) -> Self {
        mode.name().to_string()
    }
}

// =============================================================================
// Timeseries
// =============================================================================

/// Values kept sorted by an associated date.
///
/// Dates need not be unique; values sharing a date keep their insertion order.
#[derive(Debug, Clone)]
pub struct Timeseries<D, V> {
    /// Distinct dates, ascending
    dates: Vec<D>,
    /// Values per entry of `dates`
    values: Vec<Vec<V>>,
}

impl<D, V> Default for Timeseries<D, V> {
    fn default() -> Self {
        Self {
            dates: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<D: Ord, V> Timeseries<D, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `date`.
    pub fn add(&mut self, date: D, value: V) {
        match self.dates.binary_search(&date) {
            Ok(index) => self.values[index].push(value),
            Err(index) => {
                self.dates.insert(index, date);
                self.values.insert(index, vec![value]);
            }
        }
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Distinct dates in ascending order.
    pub fn dates(&self) -> &[D] {
        &self.dates
    }

    /// Values in date order.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        self.values.iter().flatten()
    }

    /// `(date, value)` pairs in date order.
    pub fn entries(&self) -> impl Iterator<Item = (&D, &V)> + '_ {
        self.dates
            .iter()
            .zip(&self.values)
            .flat_map(|(date, values)| values.iter().map(move |value| (date, value)))
    }

    /// Group values by `key_fn`, flushing a group whenever the key changes.
    ///
    /// Keys are compared only between neighboring dates, so `key_fn` should be
    /// monotonic in the date for every key to appear once. A key type with a
    /// single value (`()`, or `None` for every date) puts everything in one group.
    pub fn grouped<K, F>(&self, key_fn: F) -> Grouped<'_, D, V, F, K>
    where
        F: FnMut(&D) -> K,
        K: PartialEq,
    {
        Grouped {
            series: self,
            key_fn,
            index: 0,
            current: None,
        }
    }
}

impl<D: Ord + Datelike, V> Timeseries<D, V> {
    /// Group values by calendar period.
    pub fn grouped_by(
        &self,
        grouping: Grouping,
    ) -> Grouped<'_, D, V, impl FnMut(&D) -> Option<GroupKey>, Option<GroupKey>> {
        self.grouped(move |date: &D| grouping.key(date))
    }
}

impl<D, V> FromIterator<(D, V)> for Timeseries<D, V>
where
    D: Ord,
{
    fn from_iter<T: IntoIterator<Item = (D, V)>>(iter: T) -> Self {
        let mut series = Timeseries::new();
        for (date, value) in iter {
            series.add(date, value);
        }
        series
    }
}

/// Iterator returned by [`Timeseries::grouped`].
pub struct Grouped<'a, D, V, F, K> {
    series: &'a Timeseries<D, V>,
    key_fn: F,
    index: usize,
    /// Group being collected; `None` until the first date has been seen
    current: Option<(K, Vec<&'a V>)>,
}

impl<'a, D, V, F, K> Grouped<'a, D, V, F, K>
where
    F: FnMut(&D) -> K,
    K: PartialEq,
{
    /// Turn per-period groups into running totals: each group also contains the
    /// values of every group before it.
    pub fn cumulative(self) -> Cumulative<'a, Self, V> {
        Cumulative {
            groups: self,
            running: Vec::new(),
        }
    }
}

impl<'a, D, V, F, K> Iterator for Grouped<'a, D, V, F, K>
where
    F: FnMut(&D) -> K,
    K: PartialEq,
{
    type Item = (K, Vec<&'a V>);

    fn next(&mut self) -> Option<Self::Item> {
        let series = self.series;
        while let Some(date) = series.dates.get(self.index) {
            let values = &series.values[self.index];
            self.index += 1;

            let key = (self.key_fn)(date);
            match self.current.take() {
                Some((current_key, group)) if current_key != key => {
                    self.current = Some((key, values.iter().collect()));
                    return Some((current_key, group));
                }
                Some((current_key, mut group)) => {
                    group.extend(values.iter());
                    self.current = Some((current_key, group));
                }
                None => self.current = Some((key, values.iter().collect())),
            }
        }
        self.current.take()
    }
}

/// Iterator returned by [`Grouped::cumulative`].
pub struct Cumulative<'a, I, V> {
    groups: I,
    running: Vec<&'a V>,
}

impl<'a, I, K, V> Iterator for Cumulative<'a, I, V>
where
    I: Iterator<Item = (K, Vec<&'a V>)>,
{
    type Item = (K, Vec<&'a V>);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, group) = self.groups.next()?;
        self.running.extend(group);
        Some((key, self.running.clone()))
    }
}
