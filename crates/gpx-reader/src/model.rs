//! Parsed track model and summary queries.

use chrono::{DateTime, Utc};
use track_common::{GeoBounds, TimeSpan, ValueRange};

use crate::geodesy::{distance_3d, haversine_distance, mps_to_kmh};

/// A single recorded position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub time: Option<DateTime<Utc>>,
}

impl TrackPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            time: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Surface distance to `other` in meters.
    pub fn distance_2d(&self, other: &TrackPoint) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Distance to `other` in meters, including the elevation change when
    /// both points carry a finite one.
    pub fn distance_3d(&self, other: &TrackPoint) -> f64 {
        let flat = self.distance_2d(other);
        match (self.elevation, other.elevation) {
            (Some(a), Some(b)) if (b - a).is_finite() => distance_3d(flat, b - a),
            _ => flat,
        }
    }

    /// Average speed in km/h between `previous` and this point.
    ///
    /// `None` unless both points are timestamped and time moves forward.
    pub fn speed_between(&self, previous: &TrackPoint) -> Option<f64> {
        let (t0, t1) = (previous.time?, self.time?);
        let seconds = (t1 - t0).num_milliseconds() as f64 / 1000.0;
        if seconds <= 0.0 {
            return None;
        }
        Some(mps_to_kmh(self.distance_3d(previous) / seconds))
    }
}

/// A contiguous run of points with no recording gap. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    points: Vec<TrackPoint>,
}

impl Segment {
    /// Returns `None` for an empty point list.
    pub fn new(points: Vec<TrackPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Consecutive `(previous, current)` point pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&TrackPoint, &TrackPoint)> {
        self.points.windows(2).map(|w| (&w[0], &w[1]))
    }
}

/// A whole recorded track, as produced by a [`crate::TrackParser`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTrack {
    segments: Vec<Segment>,
}

impl ParsedTrack {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.segments.iter().flat_map(|s| s.points().iter())
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// Latitude/longitude extent, `None` for a track with no points.
    pub fn bounds(&self) -> Option<GeoBounds> {
        let mut points = self.points();
        let first = points.next()?;
        let seed = GeoBounds::new(first.latitude, first.latitude, first.longitude, first.longitude);
        Some(points.fold(seed, |b, p| {
            GeoBounds::new(
                b.min_latitude.min(p.latitude),
                b.max_latitude.max(p.latitude),
                b.min_longitude.min(p.longitude),
                b.max_longitude.max(p.longitude),
            )
        }))
    }

    /// Lowest and highest recorded elevation. Non-finite readings are skipped.
    pub fn elevation_extremes(&self) -> Option<ValueRange> {
        self.points()
            .filter_map(|p| p.elevation)
            .filter(|e| e.is_finite())
            .fold(None, |acc: Option<ValueRange>, e| match acc {
                None => Some(ValueRange::new(e, e)),
                Some(r) => Some(ValueRange::new(r.min.min(e), r.max.max(e))),
            })
    }

    /// Earliest and latest timestamp.
    pub fn time_bounds(&self) -> Option<TimeSpan> {
        self.points()
            .filter_map(|p| p.time)
            .fold(None, |acc: Option<TimeSpan>, t| match acc {
                None => Some(TimeSpan::new(t, t)),
                Some(span) => Some(TimeSpan::new(span.start.min(t), span.end.max(t))),
            })
    }

    /// Flat length in meters, summed within segments.
    pub fn length_2d(&self) -> f64 {
        self.segments
            .iter()
            .flat_map(Segment::edges)
            .map(|(a, b)| a.distance_2d(b))
            .sum()
    }

    /// Elevation-aware length in meters, summed within segments.
    pub fn length_3d(&self) -> f64 {
        self.segments
            .iter()
            .flat_map(Segment::edges)
            .map(|(a, b)| a.distance_3d(b))
            .sum()
    }

    /// Highest instantaneous speed in km/h between consecutive points.
    pub fn max_speed(&self) -> Option<f64> {
        self.segments
            .iter()
            .flat_map(Segment::edges)
            .filter_map(|(prev, cur)| cur.speed_between(prev))
            .filter(|s| s.is_finite())
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_340_000_000 + seconds, 0).unwrap()
    }

    fn sample() -> ParsedTrack {
        let first = Segment::new(vec![
            TrackPoint::new(51.0, -1.0).with_elevation(10.0).with_time(at(0)),
            TrackPoint::new(51.001, -1.0).with_elevation(30.0).with_time(at(60)),
        ])
        .unwrap();
        let second = Segment::new(vec![
            TrackPoint::new(50.5, -1.5).with_time(at(600)),
            TrackPoint::new(50.501, -1.5).with_time(at(610)),
        ])
        .unwrap();
        ParsedTrack::new(vec![first, second])
    }

    #[test]
    fn test_bounds() {
        let b = sample().bounds().unwrap();
        assert_eq!(b, GeoBounds::new(50.5, 51.001, -1.5, -1.0));
        assert!(ParsedTrack::default().bounds().is_none());
    }

    #[test]
    fn test_elevation_extremes_ignore_missing() {
        assert_eq!(sample().elevation_extremes(), Some(ValueRange::new(10.0, 30.0)));
    }

    #[test]
    fn test_time_bounds() {
        let span = sample().time_bounds().unwrap();
        assert_eq!(span.start, at(0));
        assert_eq!(span.end, at(610));
    }

    #[test]
    fn test_lengths_do_not_bridge_segments() {
        let track = sample();
        // Two ~111 m edges; the 50 km jump between segments is not counted
        assert!(track.length_2d() > 200.0 && track.length_2d() < 250.0);
        assert!(track.length_3d() > track.length_2d());
    }

    #[test]
    fn test_max_speed() {
        // 111 m in 10 s is ~40 km/h, faster than 111 m in 60 s
        let speed = sample().max_speed().unwrap();
        assert!((speed - 40.03).abs() < 0.1, "got {}", speed);
    }

    #[test]
    fn test_speed_requires_forward_time() {
        let a = TrackPoint::new(0.0, 0.0).with_time(at(10));
        let b = TrackPoint::new(0.001, 0.0).with_time(at(10));
        let c = TrackPoint::new(0.001, 0.0);
        assert!(b.speed_between(&a).is_none());
        assert!(c.speed_between(&a).is_none());
    }

    #[test]
    fn test_non_finite_elevation_ignored() {
        let track = ParsedTrack::new(vec![Segment::new(vec![
            TrackPoint::new(51.0, -1.0).with_elevation(10.0).with_time(at(0)),
            TrackPoint::new(51.001, -1.0).with_elevation(f64::NAN).with_time(at(60)),
            TrackPoint::new(51.002, -1.0).with_elevation(40.0).with_time(at(120)),
        ])
        .unwrap()]);
        assert_eq!(track.elevation_extremes(), Some(ValueRange::new(10.0, 40.0)));
        assert!(track.length_3d().is_finite());
        assert!(track.max_speed().unwrap().is_finite());
    }

    #[test]
    fn test_empty_segment_rejected() {
        assert!(Segment::new(Vec::new()).is_none());
    }
}
