//! Geographic bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::range::ValueRange;

/// A latitude/longitude box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl GeoBounds {
    pub fn new(min_latitude: f64, max_latitude: f64, min_longitude: f64, max_longitude: f64) -> Self {
        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    /// Build from separate latitude and longitude ranges.
    pub fn from_ranges(latitude: ValueRange, longitude: ValueRange) -> Self {
        Self::new(latitude.min, latitude.max, longitude.min, longitude.max)
    }

    pub fn latitude(&self) -> ValueRange {
        ValueRange::new(self.min_latitude, self.max_latitude)
    }

    pub fn longitude(&self) -> ValueRange {
        ValueRange::new(self.min_longitude, self.max_longitude)
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.max_latitude - self.min_latitude
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }

    /// Inclusive intersection test: boxes sharing an edge intersect.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.latitude().overlaps(&other.latitude()) && self.longitude().overlaps(&other.longitude())
    }

    /// Check if a point is contained within this box (edges included).
    pub fn contains_point(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds::from_ranges(
            self.latitude().widen(&other.latitude()),
            self.longitude().widen(&other.longitude()),
        )
    }
}
