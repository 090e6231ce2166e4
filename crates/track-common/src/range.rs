//! Numeric, time and date ranges.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GeekError;

/// An inclusive `[min, max]` range of a scalar quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Create a range, rejecting inverted or non-finite ends.
    pub fn try_new(min: f64, max: f64) -> Result<Self, GeekError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(GeekError::config(format!(
                "Range ends must be finite, got {}..{}",
                min, max
            )));
        }
        if min > max {
            return Err(GeekError::config(format!(
                "Range minimum {} is greater than maximum {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Inclusive overlap test: touching ranges overlap.
    pub fn overlaps(&self, other: &ValueRange) -> bool {
        self.min <= other.max && self.max >= other.min
    }

    /// Smallest range covering both `self` and `other`.
    pub fn widen(&self, other: &ValueRange) -> ValueRange {
        ValueRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Position of `value` within the range, clamped to `[0, 1]`.
    ///
    /// A degenerate range maps everything to 0. `None` when `value` or
    /// either end is not finite.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || !self.min.is_finite() || !self.max.is_finite() {
            return None;
        }
        if value >= self.max {
            return Some(if self.span() > 0.0 { 1.0 } else { 0.0 });
        }
        if value <= self.min {
            return Some(0.0);
        }
        Some(((value - self.min) / self.span()).clamp(0.0, 1.0))
    }

    /// Linear interpolation between the ends.
    pub fn lerp(&self, fraction: f64) -> f64 {
        self.min + fraction * (self.max - self.min)
    }
}

/// Parses `"a,b"` or `"axb"`.
impl FromStr for ValueRange {
    type Err = GeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('x', ",");
        let parts: Vec<&str> = normalized.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(GeekError::config(format!(
                "Invalid range '{}'. Expected 'min,max'",
                s
            )));
        }
        let parse = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| GeekError::config(format!("Invalid number in range: {}", part)))
        };
        ValueRange::try_new(parse(parts[0])?, parse(parts[1])?)
    }
}

/// The instants spanned by a recorded track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSpan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    pub fn widen(&self, other: &TimeSpan) -> TimeSpan {
        TimeSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A calendar date window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        Self { min, max }
    }

    /// Whether the inclusive date window `[start, end]` touches this range.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if let Some(min) = self.min {
            if end < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if start > max {
                return false;
            }
        }
        true
    }
}
