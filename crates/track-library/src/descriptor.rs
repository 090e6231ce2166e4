//! Lazily computed per-track summaries.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use gpx_reader::{GpxParser, ParsedTrack, TrackParser};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use track_common::{GeekError, GeekResult, GeoBounds, TimeSpan, ValueRange};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Where a track's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackSource {
    /// A file anywhere on disk.
    File(PathBuf),
    /// A file inside a track store vault, addressed relative to its root.
    Vault { root: PathBuf, relative: PathBuf },
}

impl TrackSource {
    /// Absolute (or caller-relative) path of the track file.
    pub fn path(&self) -> PathBuf {
        match self {
            TrackSource::File(path) => path.clone(),
            TrackSource::Vault { root, relative } => root.join(relative),
        }
    }
}

/// Whether parsed points are kept after the first parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Re-parse the file every time the points are needed.
    Streaming,
    /// Parse once and keep the points in memory.
    #[default]
    Retained,
}

/// Extents of one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub bounds: GeoBounds,
    pub elevation: Option<ValueRange>,
    /// Highest instantaneous speed in km/h.
    pub max_speed: Option<f64>,
    pub time: TimeSpan,
    pub length_2d: f64,
    pub length_3d: f64,
}

impl TrackSummary {
    /// Extract a summary from parsed points.
    pub fn from_parsed(path: &Path, track: &ParsedTrack) -> GeekResult<Self> {
        let bounds = track
            .bounds()
            .ok_or_else(|| GeekError::track(path, "Track contains no points"))?;
        let time = track
            .time_bounds()
            .ok_or_else(|| GeekError::track(path, "Track has no timestamps"))?;
        Ok(Self {
            bounds,
            elevation: track.elevation_extremes(),
            max_speed: track.max_speed(),
            time,
            length_2d: track.length_2d(),
            length_3d: track.length_3d(),
        })
    }

    /// `0..=max_speed`, when any timed edge exists.
    pub fn speed(&self) -> Option<ValueRange> {
        self.max_speed.map(|max| ValueRange::new(0.0, max))
    }

    pub fn min_date(&self) -> NaiveDate {
        self.time.start_date()
    }

    pub fn max_date(&self) -> NaiveDate {
        self.time.end_date()
    }
}

/// One track file plus its memoized summary and content hash.
///
/// Summary and hash are computed at most once per instance.
pub struct TrackDescriptor {
    source: TrackSource,
    mode: ParseMode,
    parser: Arc<dyn TrackParser>,
    summary: OnceCell<TrackSummary>,
    content_hash: OnceCell<String>,
    retained: OnceCell<Arc<ParsedTrack>>,
}

impl std::fmt::Debug for TrackDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackDescriptor")
            .field("source", &self.source)
            .field("mode", &self.mode)
            .field("summary", &self.summary.get())
            .field("content_hash", &self.content_hash.get())
            .finish()
    }
}

impl TrackDescriptor {
    /// Describe a GPX file on disk.
    pub fn open(path: impl Into<PathBuf>, mode: ParseMode) -> GeekResult<Self> {
        Self::open_source(TrackSource::File(path.into()), mode)
    }

    /// Describe a GPX file at any [`TrackSource`].
    pub fn open_source(source: TrackSource, mode: ParseMode) -> GeekResult<Self> {
        Self::with_parser(source, mode, Arc::new(GpxParser::new()))
    }

    /// Describe a track read through a custom parser.
    pub fn with_parser(
        source: TrackSource,
        mode: ParseMode,
        parser: Arc<dyn TrackParser>,
    ) -> GeekResult<Self> {
        let path = source.path();
        if !path.is_file() {
            return Err(GeekError::track(path, "Track file does not exist"));
        }
        Ok(Self {
            source,
            mode,
            parser,
            summary: OnceCell::new(),
            content_hash: OnceCell::new(),
            retained: OnceCell::new(),
        })
    }

    /// A descriptor whose summary and hash come from a track store row.
    ///
    /// The file is only touched if the points are requested.
    pub fn from_stored(source: TrackSource, content_hash: String, summary: TrackSummary) -> Self {
        Self {
            source,
            mode: ParseMode::Streaming,
            parser: Arc::new(GpxParser::new()),
            summary: OnceCell::with_value(summary),
            content_hash: OnceCell::with_value(content_hash),
            retained: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    pub fn path(&self) -> PathBuf {
        self.source.path()
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Track extents; parses the file on first call.
    pub fn summary(&self) -> GeekResult<&TrackSummary> {
        self.summary.get_or_try_init(|| {
            let track = self.parsed()?;
            let summary = TrackSummary::from_parsed(&self.path(), &track)?;
            debug!(
                path = %self.path().display(),
                points = track.point_count(),
                length_2d = summary.length_2d,
                "Summarized track"
            );
            Ok(summary)
        })
    }

    /// Lowercase hex SHA-256 of the file bytes.
    pub fn content_hash(&self) -> GeekResult<&str> {
        self.content_hash
            .get_or_try_init(|| hash_file(&self.path()))
            .map(String::as_str)
    }

    /// The track's points.
    pub fn parsed(&self) -> GeekResult<Arc<ParsedTrack>> {
        match self.mode {
            ParseMode::Retained => self.retained.get_or_try_init(|| self.load()).cloned(),
            ParseMode::Streaming => self.load(),
        }
    }

    fn load(&self) -> GeekResult<Arc<ParsedTrack>> {
        let path = self.path();
        self.parser
            .parse_file(&path)
            .map(Arc::new)
            .map_err(|e| GeekError::track(path, e.to_string()))
    }
}

/// Lowercase hex SHA-256 of a file, streamed in 64 KiB chunks.
pub fn hash_file(path: &Path) -> GeekResult<String> {
    let mut file = File::open(path).map_err(|e| GeekError::track(path, e.to_string()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| GeekError::track(path, e.to_string()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_utils::{corner_track, temp_test_dir, untimed_track, write_file};

    struct CountingParser {
        calls: AtomicUsize,
    }

    impl TrackParser for CountingParser {
        fn parse(&self, data: &[u8]) -> gpx_reader::GpxResult<ParsedTrack> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            GpxParser::new().parse(data)
        }
    }

    #[test]
    fn test_open_missing_file() {
        let err = TrackDescriptor::open("/nonexistent/ride.gpx", ParseMode::Retained).unwrap_err();
        assert!(err.is_per_track());
    }

    #[test]
    fn test_summary_memoized() {
        let dir = temp_test_dir();
        let path = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "a.gpx");
        let parser = Arc::new(CountingParser {
            calls: AtomicUsize::new(0),
        });
        let descriptor =
            TrackDescriptor::with_parser(TrackSource::File(path), ParseMode::Retained, parser.clone())
                .unwrap();

        let first = descriptor.summary().unwrap().clone();
        let second = descriptor.summary().unwrap();
        assert_eq!(&first, second);
        descriptor.parsed().unwrap();
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.bounds, GeoBounds::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_streaming_reparses() {
        let dir = temp_test_dir();
        let path = corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "a.gpx");
        let parser = Arc::new(CountingParser {
            calls: AtomicUsize::new(0),
        });
        let descriptor =
            TrackDescriptor::with_parser(TrackSource::File(path), ParseMode::Streaming, parser.clone())
                .unwrap();
        descriptor.parsed().unwrap();
        descriptor.parsed().unwrap();
        assert_eq!(parser.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_time_is_track_error() {
        let dir = temp_test_dir();
        let path = untimed_track().write_to(dir.path(), "untimed.gpx");
        let descriptor = TrackDescriptor::open(path, ParseMode::Retained).unwrap();
        let err = descriptor.summary().unwrap_err();
        assert!(err.is_per_track());
        assert!(err.to_string().contains("timestamps"));
    }

    #[test]
    fn test_parse_error_is_track_error() {
        let dir = temp_test_dir();
        let path = write_file(dir.path(), "broken.gpx", "<gpx><trk>");
        let descriptor = TrackDescriptor::open(path, ParseMode::Streaming).unwrap();
        assert!(descriptor.summary().unwrap_err().is_per_track());
    }

    #[test]
    fn test_content_hash_known_value() {
        let dir = temp_test_dir();
        let path = write_file(dir.path(), "abc.gpx", "abc");
        assert_eq!(
            hash_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let descriptor = TrackDescriptor::open(path, ParseMode::Streaming).unwrap();
        assert_eq!(descriptor.content_hash().unwrap().len(), 64);
    }

    #[test]
    fn test_from_stored_skips_parse() {
        let summary = TrackSummary {
            bounds: GeoBounds::new(0.0, 1.0, 0.0, 1.0),
            elevation: None,
            max_speed: Some(12.0),
            time: TimeSpan::new(
                test_utils::reference_time(),
                test_utils::reference_time(),
            ),
            length_2d: 0.0,
            length_3d: 0.0,
        };
        let descriptor = TrackDescriptor::from_stored(
            TrackSource::Vault {
                root: PathBuf::from("/nonexistent"),
                relative: PathBuf::from("abc/def.gpx"),
            },
            "abcdef".to_string(),
            summary.clone(),
        );
        assert_eq!(descriptor.summary().unwrap(), &summary);
        assert_eq!(descriptor.content_hash().unwrap(), "abcdef");
        assert_eq!(descriptor.path(), PathBuf::from("/nonexistent/abc/def.gpx"));
        assert_eq!(summary.speed(), Some(ValueRange::new(0.0, 12.0)));
    }
}
