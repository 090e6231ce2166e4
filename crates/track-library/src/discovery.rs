//! Finding track files under an input path.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use track_common::{GeekError, GeekResult};

const TRACK_EXTENSION: &str = "gpx";

/// Whether `path` names a GPX file (extension compared case-insensitively).
pub fn is_track_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TRACK_EXTENSION))
        .unwrap_or(false)
}

/// All track files at or below `root`, sorted by path.
///
/// A file given directly is returned as-is whatever its extension.
/// Unreadable directory entries are logged and skipped.
pub fn discover_tracks(root: &Path) -> GeekResult<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(GeekError::track(root, "Input path does not exist"));
    }

    let mut tracks = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_track_file(entry.path()) {
            tracks.push(entry.into_path());
        }
    }
    tracks.sort();

    debug!(root = %root.display(), count = tracks.len(), "Discovered track files");
    Ok(tracks)
}
