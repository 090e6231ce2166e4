//! Mercator latitude warp.
//!
//! Longitudes map linearly; latitudes are stretched so that shapes keep
//! their proportions at small scales:
//!
//! ```text
//! merc(lat) = (180 / π) · ln(tan(π/4 + lat·π/360))
//! ```
//!
//! The result is in "degree-equivalent" units, so `merc(lat) ≈ lat` near the
//! equator and the warp can be compared directly with longitude spans.

use std::f64::consts::PI;

/// Latitude beyond which the warp is not useful for drawing (Web Mercator cut-off).
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Mercator-warped latitude in degree-equivalent units.
///
/// Grows without bound towards the poles; layouts only accept latitudes
/// within [`MAX_LATITUDE`].
pub fn merc(latitude: f64) -> f64 {
    (180.0 / PI) * (PI / 4.0 + latitude * PI / 360.0).tan().ln()
}
