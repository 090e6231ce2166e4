//! Range queries over stored track summaries.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use track_common::{GeekError, GeekResult, ValueRange};
use track_library::BoundsOverrides;

/// Queryable columns of the `tracks` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackField {
    Length2d,
    Length3d,
    MinElevation,
    MaxElevation,
    MinLatitude,
    MaxLatitude,
    MinLongitude,
    MaxLongitude,
    MinSpeed,
    MaxSpeed,
    /// Unix milliseconds.
    MinTime,
    /// Unix milliseconds.
    MaxTime,
}

impl TrackField {
    pub const ALL: [TrackField; 12] = [
        TrackField::Length2d,
        TrackField::Length3d,
        TrackField::MinElevation,
        TrackField::MaxElevation,
        TrackField::MinLatitude,
        TrackField::MaxLatitude,
        TrackField::MinLongitude,
        TrackField::MaxLongitude,
        TrackField::MinSpeed,
        TrackField::MaxSpeed,
        TrackField::MinTime,
        TrackField::MaxTime,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            TrackField::Length2d => "length_2d",
            TrackField::Length3d => "length_3d",
            TrackField::MinElevation => "min_elevation",
            TrackField::MaxElevation => "max_elevation",
            TrackField::MinLatitude => "min_latitude",
            TrackField::MaxLatitude => "max_latitude",
            TrackField::MinLongitude => "min_longitude",
            TrackField::MaxLongitude => "max_longitude",
            TrackField::MinSpeed => "min_speed",
            TrackField::MaxSpeed => "max_speed",
            TrackField::MinTime => "min_time",
            TrackField::MaxTime => "max_time",
        }
    }
}

/// Inclusive range with either end optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

impl From<ValueRange> for FieldRange {
    fn from(range: ValueRange) -> Self {
        Self::new(Some(range.min), Some(range.max))
    }
}

/// Conditions ANDed together when selecting stored tracks.
#[derive(Debug, Clone, Default)]
pub struct TrackQuery {
    ranges: Vec<(TrackField, FieldRange)>,
    path_contains: Option<String>,
    path_regex: Option<Regex>,
}

impl TrackQuery {
    /// A query matching every stored track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to lie within `range`.
    pub fn range(mut self, field: TrackField, range: impl Into<FieldRange>) -> Self {
        let range = range.into();
        if !range.is_open() {
            self.ranges.push((field, range));
        }
        self
    }

    /// Require the vault-relative path to contain `needle`.
    pub fn path_contains(mut self, needle: impl Into<String>) -> Self {
        self.path_contains = Some(needle.into());
        self
    }

    /// Require the vault-relative path to match `pattern`.
    pub fn path_matches(mut self, pattern: &str) -> GeekResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| GeekError::config(format!("Invalid path pattern '{}': {}", pattern, e)))?;
        self.path_regex = Some(regex);
        Ok(self)
    }

    /// Tracks that could pass the acceptance filter for `overrides`.
    ///
    /// A track matches an area override when its extent overlaps it, and a
    /// date override when any part of it falls on or between the dates.
    /// Elevation and speed overrides only rescale styling, so they select
    /// nothing.
    pub fn for_overrides(overrides: &BoundsOverrides) -> Self {
        let mut query = Self::new();
        if let Some(latitude) = overrides.latitude {
            query = query
                .range(TrackField::MaxLatitude, FieldRange::new(Some(latitude.min), None))
                .range(TrackField::MinLatitude, FieldRange::new(None, Some(latitude.max)));
        }
        if let Some(longitude) = overrides.longitude {
            query = query
                .range(TrackField::MaxLongitude, FieldRange::new(Some(longitude.min), None))
                .range(TrackField::MinLongitude, FieldRange::new(None, Some(longitude.max)));
        }
        if let Some(min_date) = overrides.dates.min {
            query = query.range(
                TrackField::MaxTime,
                FieldRange::new(Some(day_start(min_date) as f64), None),
            );
        }
        if let Some(max_date) = overrides.dates.max {
            // Last millisecond of the day
            query = query.range(
                TrackField::MinTime,
                FieldRange::new(None, Some((day_start(max_date) + MILLIS_PER_DAY - 1) as f64)),
            );
        }
        query
    }

    pub fn ranges(&self) -> &[(TrackField, FieldRange)] {
        &self.ranges
    }

    pub fn substring(&self) -> Option<&str> {
        self.path_contains.as_deref()
    }

    /// Whether `path` passes the regex condition, if any.
    pub fn matches_path(&self, path: &str) -> bool {
        self.path_regex
            .as_ref()
            .map_or(true, |regex| regex.is_match(path))
    }
}

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Unix milliseconds at 00:00 UTC on `date`.
fn day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use track_common::DateRange;

    #[test]
    fn test_columns_are_distinct() {
        let mut columns: Vec<&str> = TrackField::ALL.iter().map(|f| f.column()).collect();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), TrackField::ALL.len());
    }

    #[test]
    fn test_open_ranges_dropped() {
        let query = TrackQuery::new()
            .range(TrackField::Length2d, FieldRange::default())
            .range(TrackField::MinElevation, ValueRange::new(0.0, 100.0));
        assert_eq!(
            query.ranges(),
            &[(TrackField::MinElevation, FieldRange::new(Some(0.0), Some(100.0)))]
        );
    }

    #[test]
    fn test_path_regex() {
        let query = TrackQuery::new().path_matches(r"^ab[0-9]/").unwrap();
        assert!(query.matches_path("ab1/cdef.gpx"));
        assert!(!query.matches_path("abc/def.gpx"));
        assert!(TrackQuery::new().matches_path("anything"));
        assert!(TrackQuery::new().path_matches("(").is_err());
    }

    #[test]
    fn test_for_overrides() {
        let day = NaiveDate::from_ymd_opt(2012, 6, 1).unwrap();
        let overrides = BoundsOverrides {
            latitude: Some(ValueRange::new(10.0, 20.0)),
            elevation: Some(ValueRange::new(0.0, 500.0)),
            dates: DateRange::new(Some(day), Some(day)),
            ..Default::default()
        };
        let query = TrackQuery::for_overrides(&overrides);
        let start = 1_338_508_800_000.0; // 2012-06-01T00:00:00Z
        assert_eq!(
            query.ranges(),
            &[
                (TrackField::MaxLatitude, FieldRange::new(Some(10.0), None)),
                (TrackField::MinLatitude, FieldRange::new(None, Some(20.0))),
                (TrackField::MaxTime, FieldRange::new(Some(start), None)),
                (TrackField::MinTime, FieldRange::new(None, Some(start + 86_399_999.0))),
            ]
        );
        assert!(TrackQuery::for_overrides(&BoundsOverrides::default())
            .ranges()
            .is_empty());
    }
}
