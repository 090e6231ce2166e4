//! The set of tracks selected for one rendering.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};
use track_common::GeekResult;

use crate::aggregate::{AcceptanceFilter, AggregateBounds, BoundsOverrides, EffectiveBounds, Rejection};
use crate::descriptor::{ParseMode, TrackDescriptor};
use crate::discovery::discover_tracks;

/// Tracks between progress log lines.
pub const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Outside the requested area or date window.
    Rejected(Rejection),
    /// The same path, or a file with identical contents, was already added.
    AlreadyAdded,
    /// Missing, unparseable or without timestamps.
    Invalid(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Rejected(rejection) => write!(f, "{}", rejection),
            SkipReason::AlreadyAdded => f.write_str("already added"),
            SkipReason::Invalid(message) => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTrack {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Accepted tracks plus the bounds folded from them.
///
/// Descriptors are cached by path, so adding a path twice never re-parses it.
/// Acceptance is keyed on content hash: byte-identical files are drawn once.
#[derive(Debug)]
pub struct TrackLibrary {
    mode: ParseMode,
    overrides: BoundsOverrides,
    filter: AcceptanceFilter,
    cache: HashMap<PathBuf, Arc<TrackDescriptor>>,
    accepted: Vec<Arc<TrackDescriptor>>,
    accepted_hashes: HashSet<String>,
    bounds: AggregateBounds,
    skipped: Vec<SkippedTrack>,
}

impl TrackLibrary {
    pub fn new(overrides: BoundsOverrides, mode: ParseMode) -> Self {
        Self {
            mode,
            overrides,
            filter: AcceptanceFilter::new(overrides),
            cache: HashMap::new(),
            accepted: Vec::new(),
            accepted_hashes: HashSet::new(),
            bounds: AggregateBounds::new(),
            skipped: Vec::new(),
        }
    }

    /// Add one track file. Returns whether it was accepted.
    pub fn add_track(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.cache.contains_key(path) {
            self.record_skip(path.to_path_buf(), SkipReason::AlreadyAdded);
            return false;
        }
        match TrackDescriptor::open(path, self.mode) {
            Ok(descriptor) => self.add_descriptor(descriptor),
            Err(e) => {
                self.record_skip(path.to_path_buf(), SkipReason::Invalid(e.to_string()));
                false
            }
        }
    }

    /// Add an already-built descriptor, such as one loaded from a track store.
    pub fn add_descriptor(&mut self, descriptor: TrackDescriptor) -> bool {
        let path = descriptor.path();
        if self.cache.contains_key(&path) {
            self.record_skip(path, SkipReason::AlreadyAdded);
            return false;
        }

        let descriptor = Arc::new(descriptor);
        self.cache.insert(path.clone(), descriptor.clone());

        let hash = match descriptor.content_hash() {
            Ok(hash) => hash.to_string(),
            Err(e) => {
                self.record_skip(path, SkipReason::Invalid(e.to_string()));
                return false;
            }
        };
        if self.accepted_hashes.contains(&hash) {
            self.record_skip(path, SkipReason::AlreadyAdded);
            return false;
        }

        let summary = match descriptor.summary() {
            Ok(summary) => summary,
            Err(e) => {
                self.record_skip(path, SkipReason::Invalid(e.to_string()));
                return false;
            }
        };
        if let Err(rejection) = self.filter.check(summary) {
            self.record_skip(path, SkipReason::Rejected(rejection));
            return false;
        }

        self.bounds.fold(summary);
        self.accepted_hashes.insert(hash);
        self.accepted.push(descriptor);
        debug!(path = %path.display(), accepted = self.accepted.len(), "Accepted track");
        true
    }

    /// Add every track file at or below `root`. Returns the number accepted.
    ///
    /// Summaries are computed in parallel; folding happens afterwards in
    /// path order.
    pub fn add_path(&mut self, root: &Path) -> GeekResult<usize> {
        let paths: Vec<PathBuf> = discover_tracks(root)?;
        let (known, paths): (Vec<PathBuf>, Vec<PathBuf>) =
            paths.into_iter().partition(|path| self.cache.contains_key(path));
        for path in known {
            self.record_skip(path, SkipReason::AlreadyAdded);
        }
        let total = paths.len();
        info!(root = %root.display(), tracks = total, "Reading tracks");

        let mode = self.mode;
        let parsed = AtomicUsize::new(0);
        let prepared: Vec<(PathBuf, GeekResult<TrackDescriptor>)> = paths
            .into_par_iter()
            .map(|path| {
                let descriptor = TrackDescriptor::open(&path, mode).and_then(|d| {
                    d.summary()?;
                    d.content_hash()?;
                    Ok(d)
                });
                let done = parsed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % PROGRESS_INTERVAL == 0 {
                    info!(done, total, "Parsing tracks");
                }
                (path, descriptor)
            })
            .collect();

        let mut accepted = 0;
        for (path, descriptor) in prepared {
            let added = match descriptor {
                Ok(descriptor) => self.add_descriptor(descriptor),
                Err(e) => {
                    self.record_skip(path, SkipReason::Invalid(e.to_string()));
                    false
                }
            };
            if added {
                accepted += 1;
            }
        }

        info!(
            root = %root.display(),
            accepted,
            skipped = self.skipped.len(),
            "Finished reading tracks"
        );
        Ok(accepted)
    }

    fn record_skip(&mut self, path: PathBuf, reason: SkipReason) {
        match &reason {
            SkipReason::Invalid(_) => {
                warn!(path = %path.display(), reason = %reason, "Skipping track")
            }
            _ => info!(path = %path.display(), reason = %reason, "Skipping track"),
        }
        self.skipped.push(SkippedTrack { path, reason });
    }

    /// Accepted tracks in the order they were added.
    pub fn tracks(&self) -> &[Arc<TrackDescriptor>] {
        &self.accepted
    }

    /// Accepted tracks ordered by start time, ties broken by path.
    pub fn tracks_by_time(&self) -> Vec<Arc<TrackDescriptor>> {
        let mut keyed: Vec<_> = self
            .accepted
            .iter()
            .filter_map(|d| d.summary().ok().map(|s| (s.time.start, d.path(), d.clone())))
            .collect();
        keyed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        keyed.into_iter().map(|(_, _, d)| d).collect()
    }

    pub fn bounds(&self) -> &AggregateBounds {
        &self.bounds
    }

    pub fn overrides(&self) -> &BoundsOverrides {
        &self.overrides
    }

    /// Effective bounds from the accepted tracks and this library's overrides.
    pub fn finalize(&self) -> GeekResult<EffectiveBounds> {
        self.bounds.finalize(&self.overrides)
    }

    pub fn skipped(&self) -> &[SkippedTrack] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}
