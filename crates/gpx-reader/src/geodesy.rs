//! Distances on the Earth's surface.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon points in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Combine a surface distance with an elevation change.
pub fn distance_3d(distance_2d: f64, elevation_delta: f64) -> f64 {
    (distance_2d * distance_2d + elevation_delta * elevation_delta).sqrt()
}

/// Convert meters per second to kilometers per hour.
pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * 3.6
}
