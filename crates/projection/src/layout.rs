//! Canvas sizing and geographic → canvas coordinate mapping.

use serde::{Deserialize, Serialize};
use tracing::debug;
use track_common::{GeekError, GeekResult, GeoBounds};

use crate::mercator::{merc, MAX_LATITUDE};

/// Default pixel size of the longer canvas side.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// How the output resolution is chosen from the bounds' aspect ratio.
///
/// All but [`SizePolicy::Exact`] pin one side and derive the other from the
/// aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    Exact { width: u32, height: u32 },
    Width(u32),
    Height(u32),
    /// Pin the longer side.
    Max(u32),
    /// Pin the shorter side.
    Min(u32),
}

impl Default for SizePolicy {
    fn default() -> Self {
        SizePolicy::Max(DEFAULT_MAX_DIMENSION)
    }
}

impl SizePolicy {
    /// Build a policy from `width`/`height`/`max`/`min` entries.
    ///
    /// An empty map gives the default. When several keys are present the
    /// first match wins in the order: width+height, width, height, max, min.
    pub fn from_entries<K, I>(entries: I) -> GeekResult<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, u32)>,
    {
        let (mut width, mut height, mut max, mut min) = (None, None, None, None);
        let mut seen = 0usize;
        for (key, value) in entries {
            seen += 1;
            let key = key.as_ref();
            if value == 0 {
                return Err(GeekError::config(format!(
                    "Resolution entry '{}' must be positive",
                    key
                )));
            }
            match key {
                "width" => width = Some(value),
                "height" => height = Some(value),
                "max" => max = Some(value),
                "min" => min = Some(value),
                other => {
                    return Err(GeekError::config(format!(
                        "Unknown resolution key '{}'. Expected width, height, max or min",
                        other
                    )))
                }
            }
        }

        if seen == 0 {
            return Ok(SizePolicy::default());
        }

        let policy = match (width, height, max, min) {
            (Some(width), Some(height), _, _) => SizePolicy::Exact { width, height },
            (Some(width), None, _, _) => SizePolicy::Width(width),
            (None, Some(height), _, _) => SizePolicy::Height(height),
            (None, None, Some(max), _) => SizePolicy::Max(max),
            (None, None, None, Some(min)) => SizePolicy::Min(min),
            (None, None, None, None) => {
                return Err(GeekError::config("No usable resolution entry"));
            }
        };
        Ok(policy)
    }

    /// Pixel `(width, height)` for an aspect ratio (`width / height`).
    pub fn resolve(&self, aspect_ratio: f64) -> GeekResult<(u32, u32)> {
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return Err(GeekError::config(format!(
                "Cannot size a canvas with aspect ratio {}",
                aspect_ratio
            )));
        }
        let derive = |pinned: u32, factor: f64| -> u32 {
            let value = (pinned as f64 * factor).round();
            if value < 1.0 {
                1
            } else if value > u32::MAX as f64 {
                u32::MAX
            } else {
                value as u32
            }
        };
        let pin_width = |w: u32| (w, derive(w, 1.0 / aspect_ratio));
        let pin_height = |h: u32| (derive(h, aspect_ratio), h);

        let dims = match *self {
            SizePolicy::Exact { width, height } => (width, height),
            SizePolicy::Width(w) => pin_width(w),
            SizePolicy::Height(h) => pin_height(h),
            SizePolicy::Max(m) if aspect_ratio > 1.0 => pin_width(m),
            SizePolicy::Max(m) => pin_height(m),
            SizePolicy::Min(m) if aspect_ratio < 1.0 => pin_width(m),
            SizePolicy::Min(m) => pin_height(m),
        };
        Ok(dims)
    }
}

/// Where the `[0, 1]` fraction range lands inside the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelInset {
    /// Bound edges land on the centers of the outermost pixels.
    #[default]
    HalfPixel,
    /// Bound edges land on the canvas border.
    None,
}

/// Resolution and geographic frame of one rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasLayout {
    pixel_width: u32,
    pixel_height: u32,
    geo_bounds: GeoBounds,
    aspect_ratio: f64,
}

impl CanvasLayout {
    /// Compute the layout for `bounds` under `policy`.
    ///
    /// Fails on a zero, negative or non-finite latitude/longitude span, or a
    /// latitude beyond [`MAX_LATITUDE`], whatever the policy.
    pub fn compute(bounds: &GeoBounds, policy: SizePolicy) -> GeekResult<Self> {
        let lon_span = bounds.width();
        let merc_span = merc(bounds.max_latitude) - merc(bounds.min_latitude);

        if !lon_span.is_finite() || lon_span <= 0.0 {
            return Err(GeekError::config(format!(
                "Longitude span must be positive, got {}..{}",
                bounds.min_longitude, bounds.max_longitude
            )));
        }
        let polar = bounds.min_latitude < -MAX_LATITUDE || bounds.max_latitude > MAX_LATITUDE;
        if !bounds.height().is_finite() || bounds.height() <= 0.0 || polar || !merc_span.is_finite() {
            return Err(GeekError::config(format!(
                "Latitude span must be positive and away from the poles, got {}..{}",
                bounds.min_latitude, bounds.max_latitude
            )));
        }

        let aspect_ratio = lon_span / merc_span;
        let (pixel_width, pixel_height) = policy.resolve(aspect_ratio)?;

        debug!(
            pixel_width,
            pixel_height,
            aspect_ratio,
            policy = ?policy,
            "Computed canvas layout"
        );

        Ok(Self {
            pixel_width,
            pixel_height,
            geo_bounds: *bounds,
            aspect_ratio,
        })
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    pub fn geo_bounds(&self) -> &GeoBounds {
        &self.geo_bounds
    }

    /// `lon_span / merc_span`.
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn projector(&self, inset: PixelInset) -> Projector {
        Projector::new(self, inset)
    }
}

/// Maps latitude/longitude to canvas fractions for one [`CanvasLayout`].
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    bounds: GeoBounds,
    merc_min: f64,
    merc_span: f64,
    width: f64,
    height: f64,
    inset: PixelInset,
}

impl Projector {
    pub fn new(layout: &CanvasLayout, inset: PixelInset) -> Self {
        let bounds = layout.geo_bounds;
        let merc_min = merc(bounds.min_latitude);
        Self {
            bounds,
            merc_min,
            merc_span: merc(bounds.max_latitude) - merc_min,
            width: layout.pixel_width as f64,
            height: layout.pixel_height as f64,
            inset,
        }
    }

    /// Canvas fractions `(x, y)` for a point, `y` growing downwards.
    ///
    /// `None` when the point lies outside the bounds on either axis.
    pub fn project(&self, latitude: f64, longitude: f64) -> Option<(f64, f64)> {
        if !self.bounds.contains_point(latitude, longitude) {
            return None;
        }
        let x = (longitude - self.bounds.min_longitude) / self.bounds.width();
        let y = 1.0 - (merc(latitude) - self.merc_min) / self.merc_span;
        Some(match self.inset {
            PixelInset::None => (x, y),
            PixelInset::HalfPixel => (inset(x, self.width), inset(y, self.height)),
        })
    }

    /// Canvas pixel coordinates for a point: fraction × pixel dimension.
    pub fn project_pixels(&self, latitude: f64, longitude: f64) -> Option<(f64, f64)> {
        self.project(latitude, longitude)
            .map(|(x, y)| (x * self.width, y * self.height))
    }
}

fn inset(fraction: f64, dimension: f64) -> f64 {
    let half = 0.5 / dimension;
    half + fraction * (1.0 - 2.0 * half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_xy_approx_eq};

    fn equatorial(lat_half: f64, lon_span: f64) -> GeoBounds {
        GeoBounds::new(-lat_half, lat_half, 0.0, lon_span)
    }

    #[test]
    fn test_from_entries_precedence() {
        let p = SizePolicy::from_entries([("min", 10), ("height", 20), ("width", 30)]).unwrap();
        assert_eq!(p, SizePolicy::Exact { width: 30, height: 20 });
        let p = SizePolicy::from_entries([("min", 10), ("max", 20)]).unwrap();
        assert_eq!(p, SizePolicy::Max(20));
        let p = SizePolicy::from_entries([("min", 10), ("height", 20)]).unwrap();
        assert_eq!(p, SizePolicy::Height(20));
    }

    #[test]
    fn test_from_entries_empty_and_unknown() {
        let empty: [(&str, u32); 0] = [];
        assert_eq!(SizePolicy::from_entries(empty).unwrap(), SizePolicy::Max(1024));
        assert!(SizePolicy::from_entries([("depth", 10)]).is_err());
        assert!(SizePolicy::from_entries([("width", 0)]).is_err());
    }

    #[test]
    fn test_width_pins_and_derives_height() {
        assert_eq!(SizePolicy::Width(800).resolve(2.0).unwrap(), (800, 400));
        assert_eq!(SizePolicy::Height(300).resolve(2.0).unwrap(), (600, 300));
    }

    #[test]
    fn test_max_and_min_pick_sides() {
        assert_eq!(SizePolicy::Max(1000).resolve(2.0).unwrap(), (1000, 500));
        assert_eq!(SizePolicy::Max(1000).resolve(0.5).unwrap(), (500, 1000));
        assert_eq!(SizePolicy::Min(100).resolve(2.0).unwrap(), (200, 100));
        assert_eq!(SizePolicy::Min(100).resolve(0.5).unwrap(), (100, 200));
    }

    #[test]
    fn test_derived_dimension_at_least_one() {
        assert_eq!(SizePolicy::Width(10).resolve(1000.0).unwrap(), (10, 1));
    }

    #[test]
    fn test_default_layout_pins_longer_side() {
        let layout = CanvasLayout::compute(&equatorial(1.0, 4.0), SizePolicy::default()).unwrap();
        assert_eq!(layout.pixel_width(), 1024);
        assert!(layout.aspect_ratio() > 1.0);
        assert!(layout.pixel_height() < 1024);
        assert!(layout.pixel_height() >= 1);
    }

    #[test]
    fn test_max_policy_keeps_aspect_ratio() {
        let cases = [
            ("wide", equatorial(1.0, 4.0), true),
            ("tall", GeoBounds::new(-2.0, 2.0, 0.0, 1.0), false),
            ("near square", GeoBounds::new(-1.0, 1.0, 0.0, 2.0), false),
            ("mid latitude", GeoBounds::new(50.0, 52.0, -1.0, 3.0), true),
        ];
        for (name, bounds, wide) in cases {
            let layout = CanvasLayout::compute(&bounds, SizePolicy::Max(1024)).unwrap();
            let (w, h) = (layout.pixel_width() as f64, layout.pixel_height() as f64);
            let aspect = layout.aspect_ratio();
            assert_eq!(aspect > 1.0, wide, "{}", name);

            // The longer side is pinned; the other is within a pixel of the ratio
            if wide {
                assert_eq!(layout.pixel_width(), 1024, "{}", name);
                assert!((h - w / aspect).abs() < 1.0, "{}: {}x{} vs {}", name, w, h, aspect);
            } else {
                assert_eq!(layout.pixel_height(), 1024, "{}", name);
                assert!((w - h * aspect).abs() < 1.0, "{}: {}x{} vs {}", name, w, h, aspect);
            }
        }
    }

    #[test]
    fn test_polar_latitudes_rejected() {
        let near_pole = GeoBounds::new(80.0, 86.0, 0.0, 10.0);
        assert!(CanvasLayout::compute(&near_pole, SizePolicy::default()).is_err());
        let arctic = GeoBounds::new(70.0, 80.0, 0.0, 10.0);
        assert!(CanvasLayout::compute(&arctic, SizePolicy::default()).is_ok());
    }

    #[test]
    fn test_width_policy_on_real_bounds() {
        // Longitude span chosen so the aspect ratio is exactly 2
        let merc_span = merc(10.0) - merc(-10.0);
        let bounds = GeoBounds::new(-10.0, 10.0, 0.0, 2.0 * merc_span);
        let layout = CanvasLayout::compute(&bounds, SizePolicy::Width(800)).unwrap();
        assert_approx_eq!(layout.aspect_ratio(), 2.0, 1e-12);
        assert_eq!(layout.pixel_height(), 400);
    }

    #[test]
    fn test_zero_span_rejected_for_every_policy() {
        let flat = GeoBounds::new(5.0, 5.0, 0.0, 1.0);
        let thin = GeoBounds::new(0.0, 1.0, 3.0, 3.0);
        for policy in [
            SizePolicy::default(),
            SizePolicy::Exact { width: 10, height: 10 },
            SizePolicy::Width(10),
        ] {
            assert!(CanvasLayout::compute(&flat, policy).is_err());
            assert!(CanvasLayout::compute(&thin, policy).is_err());
        }
        let polar = GeoBounds::new(0.0, 90.0, 0.0, 1.0);
        assert!(CanvasLayout::compute(&polar, SizePolicy::default()).is_err());
    }

    #[test]
    fn test_project_corners_without_inset() {
        let layout =
            CanvasLayout::compute(&equatorial(1.0, 2.0), SizePolicy::Exact { width: 10, height: 10 })
                .unwrap();
        let projector = layout.projector(PixelInset::None);
        assert_xy_approx_eq!(projector.project(1.0, 0.0).unwrap(), (0.0, 0.0), 1e-12);
        assert_xy_approx_eq!(projector.project(-1.0, 2.0).unwrap(), (1.0, 1.0), 1e-12);
        assert_xy_approx_eq!(projector.project(0.0, 1.0).unwrap(), (0.5, 0.5), 1e-12);
    }

    #[test]
    fn test_half_pixel_inset() {
        let layout =
            CanvasLayout::compute(&equatorial(1.0, 2.0), SizePolicy::Exact { width: 10, height: 4 })
                .unwrap();
        let projector = layout.projector(PixelInset::HalfPixel);
        assert_xy_approx_eq!(projector.project(1.0, 0.0).unwrap(), (0.05, 0.125), 1e-12);
        assert_xy_approx_eq!(projector.project(-1.0, 2.0).unwrap(), (0.95, 0.875), 1e-12);
        assert_xy_approx_eq!(projector.project_pixels(-1.0, 2.0).unwrap(), (9.5, 3.5), 1e-9);
    }

    #[test]
    fn test_outside_points_dropped() {
        let layout = CanvasLayout::compute(&equatorial(1.0, 2.0), SizePolicy::default()).unwrap();
        let projector = layout.projector(PixelInset::default());
        assert!(projector.project(1.5, 1.0).is_none());
        assert!(projector.project(0.0, -0.1).is_none());
        assert!(projector.project(0.0, 2.0).is_some());
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&SizePolicy::Max(512)).unwrap();
        assert_eq!(json, r#"{"max":512}"#);
    }
}
