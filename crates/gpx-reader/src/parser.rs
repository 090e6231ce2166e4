//! Parser seam between raw GPX bytes and [`ParsedTrack`].

use std::io::Cursor;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{GpxError, GpxResult};
use crate::model::{ParsedTrack, Segment, TrackPoint};

/// Turns a track document into segments of points.
///
/// Implementations must be usable from several threads at once; track
/// summaries are computed in parallel.
pub trait TrackParser: Send + Sync {
    fn parse(&self, data: &[u8]) -> GpxResult<ParsedTrack>;

    fn parse_file(&self, path: &Path) -> GpxResult<ParsedTrack> {
        let data = std::fs::read(path)?;
        self.parse(&data)
    }
}

/// [`TrackParser`] for GPX 1.0/1.1 documents.
///
/// Every `<trkseg>` of every `<trk>` becomes one [`Segment`]; empty segments
/// are dropped. Routes and waypoints are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpxParser;

impl GpxParser {
    pub fn new() -> Self {
        Self
    }
}

impl TrackParser for GpxParser {
    fn parse(&self, data: &[u8]) -> GpxResult<ParsedTrack> {
        let mut cursor = Cursor::new(data);
        let document = gpx::read(&mut cursor).map_err(|e| GpxError::Parse(e.to_string()))?;

        let mut segments = Vec::new();
        for track in document.tracks {
            for segment in track.segments {
                let mut points = Vec::with_capacity(segment.points.len());
                for waypoint in segment.points {
                    let geo = waypoint.point();
                    let time = match waypoint.time {
                        Some(time) => Some(to_utc(time)?),
                        None => None,
                    };
                    points.push(TrackPoint {
                        latitude: geo.y(),
                        longitude: geo.x(),
                        elevation: waypoint.elevation,
                        time,
                    });
                }
                if let Some(segment) = Segment::new(points) {
                    segments.push(segment);
                }
            }
        }

        debug!(segments = segments.len(), "Parsed GPX document");
        Ok(ParsedTrack::new(segments))
    }
}

fn to_utc(time: gpx::Time) -> GpxResult<DateTime<Utc>> {
    let iso = time
        .format()
        .map_err(|e| GpxError::InvalidTime(e.to_string()))?;
    let parsed =
        DateTime::parse_from_rfc3339(&iso).map_err(|e| GpxError::InvalidTime(e.to_string()))?;
    Ok(parsed.with_timezone(&Utc))
}
