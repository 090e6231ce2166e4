//! Track collection and bounds aggregation.
//!
//! A [`TrackLibrary`] holds the tracks selected for one rendering. Each track
//! is described by a [`TrackDescriptor`] whose summary (extents, lengths,
//! content hash) is computed lazily and at most once. Accepted summaries are
//! folded into [`AggregateBounds`], which [`AggregateBounds::finalize`] turns
//! into the [`EffectiveBounds`] used for layout and styling.

pub mod aggregate;
pub mod descriptor;
pub mod discovery;
pub mod library;

pub use aggregate::{
    AcceptanceFilter, AggregateBounds, BoundsOverrides, EffectiveBounds, Rejection, SPEED_FALLBACK,
};
pub use descriptor::{hash_file, ParseMode, TrackDescriptor, TrackSource, TrackSummary};
pub use discovery::{discover_tracks, is_track_file};
pub use library::{SkipReason, SkippedTrack, TrackLibrary, PROGRESS_INTERVAL};
