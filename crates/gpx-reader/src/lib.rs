//! GPX track reading.
//!
//! Turns raw GPX documents into [`ParsedTrack`]s: segments of timestamped
//! points plus the summary queries the aggregation pipeline needs (bounds,
//! elevation extremes, time bounds, lengths and speeds).

pub mod error;
pub mod geodesy;
pub mod model;
pub mod parser;

pub use error::{GpxError, GpxResult};
pub use model::{ParsedTrack, Segment, TrackPoint};
pub use parser::{GpxParser, TrackParser};
