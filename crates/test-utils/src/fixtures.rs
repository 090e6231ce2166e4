//! GPX document builders and canned tracks.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::generators::{line_track, reference_time};
use crate::paths::write_file;

/// One `<trkpt>` of a fixture document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixturePoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<DateTime<Utc>>,
}

/// Shorthand for an untimed point without elevation.
pub fn point(lat: f64, lon: f64) -> FixturePoint {
    FixturePoint {
        lat,
        lon,
        ele: None,
        time: None,
    }
}

impl FixturePoint {
    pub fn ele(mut self, ele: f64) -> Self {
        self.ele = Some(ele);
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// Builds GPX 1.1 documents for tests.
///
/// ```ignore
/// let xml = GpxBuilder::new()
///     .segment([point(51.0, -1.0).at(reference_time())])
///     .to_xml();
/// ```
#[derive(Debug, Clone, Default)]
pub struct GpxBuilder {
    name: Option<String>,
    segments: Vec<Vec<FixturePoint>>,
}

impl GpxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn segment(mut self, points: impl IntoIterator<Item = FixturePoint>) -> Self {
        self.segments.push(points.into_iter().collect());
        self
    }

    pub fn segments(&self) -> &[Vec<FixturePoint>] {
        &self.segments
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <gpx version=\"1.1\" creator=\"test-utils\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n  <trk>\n",
        );
        if let Some(name) = &self.name {
            let _ = writeln!(xml, "    <name>{}</name>", name);
        }
        for segment in &self.segments {
            xml.push_str("    <trkseg>\n");
            for p in segment {
                let _ = write!(xml, "      <trkpt lat=\"{}\" lon=\"{}\">", p.lat, p.lon);
                if let Some(ele) = p.ele {
                    let _ = write!(xml, "<ele>{}</ele>", ele);
                }
                if let Some(time) = p.time {
                    let _ = write!(
                        xml,
                        "<time>{}</time>",
                        time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
                    );
                }
                xml.push_str("</trkpt>\n");
            }
            xml.push_str("    </trkseg>\n");
        }
        xml.push_str("  </trk>\n</gpx>\n");
        xml
    }

    /// Writes the document to `dir/name` and returns the full path.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        write_file(dir, name, self.to_xml())
    }
}

/// A timed two-corner track spanning `(min_lat, min_lon)` to `(max_lat, max_lon)`.
pub fn corner_track(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> GpxBuilder {
    let t0 = reference_time();
    GpxBuilder::new().segment([
        point(min_lat, min_lon).at(t0),
        point(max_lat, max_lon).at(t0 + chrono::Duration::hours(1)),
    ])
}

/// A short timed track whose elevation runs from `low` to `high`.
pub fn elevation_track(low: f64, high: f64) -> GpxBuilder {
    line_track((51.0, -1.0), (51.01, -1.0), 5, Some((low, high)))
}

/// A track with coordinates but no timestamps.
pub fn untimed_track() -> GpxBuilder {
    GpxBuilder::new().segment([point(51.0, -1.0), point(51.001, -1.001)])
}
