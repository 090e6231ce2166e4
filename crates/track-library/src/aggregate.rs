//! Running bounds over many tracks and the override-else-auto policy.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use track_common::{DateRange, GeekError, GeekResult, GeoBounds, Metric, TimeSpan, ValueRange};

use crate::descriptor::TrackSummary;

/// Speed range (km/h) used when no track carried timed edges and no
/// override was given.
pub const SPEED_FALLBACK: ValueRange = ValueRange {
    min: 1.0,
    max: 100.0,
};

/// User-specified ranges. Any axis left `None` is auto-detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundsOverrides {
    pub latitude: Option<ValueRange>,
    pub longitude: Option<ValueRange>,
    pub elevation: Option<ValueRange>,
    pub speed: Option<ValueRange>,
    #[serde(default)]
    pub dates: DateRange,
}

/// Auto-detected extents folded from every accepted track.
///
/// Each axis only ever widens, so the result does not depend on fold order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateBounds {
    latitude: Option<ValueRange>,
    longitude: Option<ValueRange>,
    elevation: Option<ValueRange>,
    speed: Option<ValueRange>,
    time: Option<TimeSpan>,
    count: usize,
}

fn widen(current: Option<ValueRange>, next: Option<ValueRange>) -> Option<ValueRange> {
    match (current, next) {
        (Some(a), Some(b)) => Some(a.widen(&b)),
        (a, b) => a.or(b),
    }
}

impl AggregateBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen every axis to cover `summary`. The first fold seeds the bounds.
    pub fn fold(&mut self, summary: &TrackSummary) {
        self.latitude = widen(self.latitude, Some(summary.bounds.latitude()));
        self.longitude = widen(self.longitude, Some(summary.bounds.longitude()));
        self.elevation = widen(self.elevation, summary.elevation);
        self.speed = widen(self.speed, summary.speed());
        self.time = Some(match self.time {
            Some(t) => t.widen(&summary.time),
            None => summary.time,
        });
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn latitude(&self) -> Option<ValueRange> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<ValueRange> {
        self.longitude
    }

    pub fn elevation(&self) -> Option<ValueRange> {
        self.elevation
    }

    pub fn speed(&self) -> Option<ValueRange> {
        self.speed
    }

    pub fn time(&self) -> Option<TimeSpan> {
        self.time
    }

    /// Resolve each axis: override if given, else the auto-detected range.
    pub fn finalize(&self, overrides: &BoundsOverrides) -> GeekResult<EffectiveBounds> {
        let latitude = overrides.latitude.or(self.latitude).ok_or_else(|| {
            GeekError::config("No latitude range: no tracks were accepted and none was given")
        })?;
        let longitude = overrides.longitude.or(self.longitude).ok_or_else(|| {
            GeekError::config("No longitude range: no tracks were accepted and none was given")
        })?;
        let elevation = overrides.elevation.or(self.elevation);
        let speed = match overrides.speed.or(self.speed) {
            Some(speed) => speed,
            None => {
                info!(
                    min = SPEED_FALLBACK.min,
                    max = SPEED_FALLBACK.max,
                    "No speed data found, using fallback speed range"
                );
                SPEED_FALLBACK
            }
        };

        let effective = EffectiveBounds {
            geo: GeoBounds::from_ranges(latitude, longitude),
            elevation,
            speed,
            time: self.time,
        };
        debug!(bounds = ?effective, tracks = self.count, "Finalized bounds");
        Ok(effective)
    }
}

/// Final ranges used for layout and style normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveBounds {
    pub geo: GeoBounds,
    pub elevation: Option<ValueRange>,
    pub speed: ValueRange,
    pub time: Option<TimeSpan>,
}

impl EffectiveBounds {
    /// Range against which `metric` is normalized, if known.
    pub fn range_for(&self, metric: Metric) -> Option<ValueRange> {
        match metric {
            Metric::Elevation => self.elevation,
            Metric::Speed => Some(self.speed),
        }
    }
}

/// Why a track was left out of the rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    LatitudeOutOfRange,
    LongitudeOutOfRange,
    EndsBeforeMinDate,
    StartsAfterMaxDate,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::LatitudeOutOfRange => "outside latitude range",
            Rejection::LongitudeOutOfRange => "outside longitude range",
            Rejection::EndsBeforeMinDate => "ends before minimum date",
            Rejection::StartsAfterMaxDate => "starts after maximum date",
        };
        f.write_str(reason)
    }
}

/// Screens track summaries against the user's overrides before folding.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptanceFilter {
    overrides: BoundsOverrides,
}

impl AcceptanceFilter {
    pub fn new(overrides: BoundsOverrides) -> Self {
        Self { overrides }
    }

    /// `Ok` if the track touches every override; touching ranges count.
    pub fn check(&self, summary: &TrackSummary) -> Result<(), Rejection> {
        if let Some(latitude) = self.overrides.latitude {
            if !latitude.overlaps(&summary.bounds.latitude()) {
                return Err(Rejection::LatitudeOutOfRange);
            }
        }
        if let Some(longitude) = self.overrides.longitude {
            if !longitude.overlaps(&summary.bounds.longitude()) {
                return Err(Rejection::LongitudeOutOfRange);
            }
        }
        let dates = self.overrides.dates;
        if let Some(min) = dates.min {
            if summary.max_date() < min {
                return Err(Rejection::EndsBeforeMinDate);
            }
        }
        if let Some(max) = dates.max {
            if summary.min_date() > max {
                return Err(Rejection::StartsAfterMaxDate);
            }
        }
        Ok(())
    }
}
