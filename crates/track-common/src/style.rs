//! Drawing style for rendered tracks.
//!
//! Colour and line width are each either constant or driven by a per-point
//! metric (elevation or instantaneous speed).

use serde::{Deserialize, Serialize};

use crate::color::{Rgb, Rgba};
use crate::error::{GeekError, GeekResult};
use crate::palette::Palette;

/// Colour used when nothing else applies.
pub const DEFAULT_BASE_COLOUR: Rgb = Rgb::new(0.3, 0.2, 0.5);

/// Line width in pixels used when nothing else applies.
pub const DEFAULT_WIDTH: f64 = 1.0;

/// Per-point quantity driving a variable style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Elevation,
    Speed,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Elevation => "elevation",
            Metric::Speed => "speed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColourMode {
    Constant { colour: Rgb },
    Elevation,
    Speed,
}

impl ColourMode {
    pub fn metric(&self) -> Option<Metric> {
        match self {
            ColourMode::Constant { .. } => None,
            ColourMode::Elevation => Some(Metric::Elevation),
            ColourMode::Speed => Some(Metric::Speed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WidthMode {
    Constant { width: f64 },
    Elevation { min: f64, max: f64 },
    Speed { min: f64, max: f64 },
}

impl WidthMode {
    pub fn metric(&self) -> Option<Metric> {
        match self {
            WidthMode::Constant { .. } => None,
            WidthMode::Elevation { .. } => Some(Metric::Elevation),
            WidthMode::Speed { .. } => Some(Metric::Speed),
        }
    }

    /// Width at a normalized metric position; constant widths ignore it.
    pub fn width_at(&self, fraction: f64) -> f64 {
        match *self {
            WidthMode::Constant { width } => width,
            WidthMode::Elevation { min, max } | WidthMode::Speed { min, max } => {
                min + fraction * (max - min)
            }
        }
    }
}

/// Everything the renderer needs to pick a colour and width per edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub colour_mode: ColourMode,
    pub width_mode: WidthMode,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub background: Option<Rgba>,
    #[serde(default = "default_base_colour")]
    pub base_colour: Rgb,
    #[serde(default = "default_width")]
    pub default_width: f64,
}

fn default_base_colour() -> Rgb {
    DEFAULT_BASE_COLOUR
}

fn default_width() -> f64 {
    DEFAULT_WIDTH
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            colour_mode: ColourMode::Constant {
                colour: DEFAULT_BASE_COLOUR,
            },
            width_mode: WidthMode::Constant {
                width: DEFAULT_WIDTH,
            },
            palette: Palette::default(),
            background: None,
            base_colour: DEFAULT_BASE_COLOUR,
            default_width: DEFAULT_WIDTH,
        }
    }
}

impl RenderConfig {
    /// True when neither colour nor width varies along a track.
    pub fn is_constant(&self) -> bool {
        self.colour_mode.metric().is_none() && self.width_mode.metric().is_none()
    }

    /// Metrics that must be available for a track to be drawn with this style.
    pub fn required_metrics(&self) -> Vec<Metric> {
        let mut metrics = Vec::with_capacity(2);
        for metric in [self.colour_mode.metric(), self.width_mode.metric()]
            .into_iter()
            .flatten()
        {
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        metrics
    }

    pub fn validate(&self) -> GeekResult<()> {
        if self.colour_mode.metric().is_some() && self.palette.is_empty() {
            return Err(GeekError::config(
                "A variable colour mode needs a palette with at least one entry",
            ));
        }
        let widths = match self.width_mode {
            WidthMode::Constant { width } => vec![width],
            WidthMode::Elevation { min, max } | WidthMode::Speed { min, max } => vec![min, max],
        };
        if widths
            .iter()
            .chain(std::iter::once(&self.default_width))
            .any(|w| !w.is_finite() || *w <= 0.0)
        {
            return Err(GeekError::config("Line widths must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_constant() {
        let config = RenderConfig::default();
        assert!(config.is_constant());
        assert!(config.required_metrics().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_required_metrics_deduplicated() {
        let config = RenderConfig {
            colour_mode: ColourMode::Speed,
            width_mode: WidthMode::Speed { min: 1.0, max: 4.0 },
            ..RenderConfig::default()
        };
        assert_eq!(config.required_metrics(), vec![Metric::Speed]);
        assert!(!config.is_constant());
    }

    #[test]
    fn test_width_lerp() {
        let mode = WidthMode::Elevation { min: 1.0, max: 5.0 };
        assert_eq!(mode.width_at(0.0), 1.0);
        assert_eq!(mode.width_at(0.5), 3.0);
        assert_eq!(mode.width_at(1.0), 5.0);
        assert_eq!(WidthMode::Constant { width: 2.0 }.width_at(0.9), 2.0);
    }

    #[test]
    fn test_validate_rejects_empty_palette_for_variable_colour() {
        let config = RenderConfig {
            colour_mode: ColourMode::Elevation,
            palette: Palette::new(Vec::new()).unwrap(),
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let config = RenderConfig {
            width_mode: WidthMode::Constant { width: 0.0 },
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
