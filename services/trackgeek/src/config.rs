//! Configuration loading.
//!
//! Settings come from an optional YAML file with `input`, `map`, `drawing`
//! and `output` sections. Any value also given on the command line is
//! replaced by the command-line value.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use projection::{PixelInset, SizePolicy};
use serde::Deserialize;
use tracing::{debug, info};
use track_common::{
    ColourMode, DateRange, GeekError, GeekResult, Palette, RenderConfig, Rgb, Rgba, ValueRange,
    WidthMode,
};
use track_library::{BoundsOverrides, ParseMode};

/// Root of the YAML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub input: InputSection,
    pub map: MapSection,
    pub drawing: DrawingSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSection {
    /// A GPX file or a directory searched recursively.
    pub path: Option<PathBuf>,
    /// Track store root.
    pub library: Option<PathBuf>,
    /// Copy `path` into the track store before rendering.
    pub import: bool,
    /// Re-parse tracks while drawing instead of keeping points in memory.
    pub save_memory: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapSection {
    /// `"min,max"` in degrees.
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrawingSection {
    /// `elevation`, `speed`, or a constant colour.
    pub colour: Option<String>,
    /// Colours spread evenly over the metric range, or a map of keys in
    /// `[0, 1]` to colours.
    pub palette: PaletteSpec,
    pub base_colour: Option<String>,
    pub background: Option<String>,
    /// A width in pixels, `elevation` or `speed`.
    pub linewidth: Option<Scalar>,
    pub linewidth_min: Option<f64>,
    pub linewidth_max: Option<f64>,
    /// Elevation range (m) mapped onto the palette and widths.
    pub elevation: Option<String>,
    /// Speed range (km/h) mapped onto the palette and widths.
    pub speed: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub png: Option<PathBuf>,
    pub svg: Option<PathBuf>,
    /// `"WxH"` or `"W,H"`.
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max: Option<u32>,
    pub min: Option<u32>,
    pub inset: Option<PixelInset>,
    /// Where to write a JSON run summary.
    pub summary: Option<PathBuf>,
}

/// `drawing.palette`, written as a colour list or a keyed map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PaletteSpec {
    Colours(Vec<String>),
    Keyed(serde_yaml::Mapping),
}

impl Default for PaletteSpec {
    fn default() -> Self {
        PaletteSpec::Colours(Vec::new())
    }
}

impl PaletteSpec {
    fn to_palette(&self) -> GeekResult<Palette> {
        match self {
            PaletteSpec::Colours(colours) if colours.is_empty() => Ok(Palette::default()),
            PaletteSpec::Colours(colours) => {
                let colours = colours
                    .iter()
                    .map(|c| c.parse::<Rgb>())
                    .collect::<GeekResult<Vec<_>>>()?;
                Palette::evenly_spaced(&colours)
            }
            PaletteSpec::Keyed(entries) => {
                let stops = entries
                    .iter()
                    .map(|(key, colour)| -> GeekResult<(f64, Rgb)> {
                        Ok((palette_key(key)?, palette_colour(colour)?))
                    })
                    .collect::<GeekResult<Vec<_>>>()?;
                if stops.is_empty() {
                    return Err(GeekError::config("Palette needs at least one colour"));
                }
                Palette::new(stops)
            }
        }
    }
}

fn palette_key(key: &serde_yaml::Value) -> GeekResult<f64> {
    let parsed = match key {
        serde_yaml::Value::Number(n) => n.as_f64(),
        serde_yaml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| GeekError::config(format!("Invalid palette key {:?}", key)))
}

fn palette_colour(colour: &serde_yaml::Value) -> GeekResult<Rgb> {
    match colour.as_str() {
        Some(text) => text.parse(),
        None => Err(GeekError::config(format!(
            "Invalid palette colour {:?}",
            colour
        ))),
    }
}

/// A YAML value that may be written as a number or a word.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl FileConfig {
    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub import: bool,
    pub save_memory: bool,
    pub out_png: Option<PathBuf>,
    pub out_svg: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub resolution: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max: Option<u32>,
    pub min: Option<u32>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

impl CliOverrides {
    fn size_entries(&self) -> Result<Vec<(&'static str, u32)>> {
        size_entries(self.resolution.as_deref(), self.width, self.height, self.max, self.min)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub import: bool,
    pub parse_mode: ParseMode,
    pub overrides: BoundsOverrides,
    pub render: RenderConfig,
    pub size: SizePolicy,
    pub inset: PixelInset,
    pub out_png: Option<PathBuf>,
    pub out_svg: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

impl Settings {
    /// Merge the file config with command-line overrides.
    pub fn resolve(file: &FileConfig, cli: &CliOverrides) -> Result<Self> {
        let input = cli.input.clone().or_else(|| file.input.path.clone());
        let library = cli.library.clone().or_else(|| file.input.library.clone());
        let import = cli.import || file.input.import;
        if input.is_none() && library.is_none() {
            bail!("No tracks to draw: give an input path or a track library");
        }
        if import && (input.is_none() || library.is_none()) {
            bail!("Importing needs both an input path and a track library");
        }

        let out_png = cli.out_png.clone().or_else(|| file.output.png.clone());
        let out_svg = cli.out_svg.clone().or_else(|| file.output.svg.clone());
        if out_png.is_none() && out_svg.is_none() {
            bail!("Nothing to write: give a PNG or SVG output path");
        }

        let parse_mode = if cli.save_memory || file.input.save_memory {
            ParseMode::Streaming
        } else {
            ParseMode::Retained
        };

        // Command-line sizing replaces the file's sizing as a whole.
        let mut entries = cli.size_entries()?;
        if entries.is_empty() {
            let output = &file.output;
            entries = size_entries(
                output.resolution.as_deref(),
                output.width,
                output.height,
                output.max,
                output.min,
            )?;
        }
        let size = SizePolicy::from_entries(entries)?;

        let overrides = BoundsOverrides {
            latitude: parse_range(cli.latitude.as_deref().or(file.map.latitude.as_deref()))?,
            longitude: parse_range(cli.longitude.as_deref().or(file.map.longitude.as_deref()))?,
            elevation: parse_range(file.drawing.elevation.as_deref())?,
            speed: parse_range(file.drawing.speed.as_deref())?,
            dates: DateRange::new(
                cli.min_date.or(file.map.min_date),
                cli.max_date.or(file.map.max_date),
            ),
        };
        if let (Some(min), Some(max)) = (overrides.dates.min, overrides.dates.max) {
            if min > max {
                bail!("Minimum date {} is after maximum date {}", min, max);
            }
        }

        let render = render_config(&file.drawing)?;
        render.validate()?;

        let settings = Self {
            input,
            library,
            import,
            parse_mode,
            overrides,
            render,
            size,
            inset: file.output.inset.unwrap_or_default(),
            out_png,
            out_svg,
            summary: cli.summary.clone().or_else(|| file.output.summary.clone()),
        };
        debug!(settings = ?settings, "Resolved settings");
        Ok(settings)
    }
}

fn parse_range(value: Option<&str>) -> GeekResult<Option<ValueRange>> {
    value.map(str::parse::<ValueRange>).transpose()
}

/// Parse `"WxH"` or `"W,H"` into pixel dimensions.
pub fn parse_resolution(value: &str) -> GeekResult<(u32, u32)> {
    let normalized = value.replace('x', ",");
    let parts: Vec<&str> = normalized.split(',').map(str::trim).collect();
    let parse = |part: &str| {
        part.parse::<u32>()
            .map_err(|_| GeekError::config(format!("Invalid resolution '{}'. Expected WxH", value)))
    };
    match parts.as_slice() {
        [w, h] => Ok((parse(w)?, parse(h)?)),
        _ => Err(GeekError::config(format!(
            "Invalid resolution '{}'. Expected WxH",
            value
        ))),
    }
}

fn size_entries(
    resolution: Option<&str>,
    width: Option<u32>,
    height: Option<u32>,
    max: Option<u32>,
    min: Option<u32>,
) -> Result<Vec<(&'static str, u32)>> {
    let mut entries = Vec::new();
    if let Some(resolution) = resolution {
        let (w, h) = parse_resolution(resolution)?;
        entries.push(("width", w));
        entries.push(("height", h));
    } else {
        entries.extend(width.map(|w| ("width", w)));
        entries.extend(height.map(|h| ("height", h)));
    }
    entries.extend(max.map(|m| ("max", m)));
    entries.extend(min.map(|m| ("min", m)));
    Ok(entries)
}

/// Build the drawing style from the `drawing` section.
pub fn render_config(drawing: &DrawingSection) -> GeekResult<RenderConfig> {
    let defaults = RenderConfig::default();
    let base_colour = match &drawing.base_colour {
        Some(colour) => colour.parse::<Rgb>()?,
        None => defaults.base_colour,
    };

    let colour_mode = match drawing.colour.as_deref().map(str::trim) {
        None => ColourMode::Constant {
            colour: base_colour,
        },
        Some("elevation") => ColourMode::Elevation,
        Some("speed") => ColourMode::Speed,
        Some(colour) => ColourMode::Constant {
            colour: colour.parse()?,
        },
    };

    let width_mode = match &drawing.linewidth {
        None => defaults.width_mode,
        Some(Scalar::Number(width)) => WidthMode::Constant { width: *width },
        Some(Scalar::Text(text)) => match text.trim() {
            "elevation" => {
                let (min, max) = width_limits(drawing)?;
                WidthMode::Elevation { min, max }
            }
            "speed" => {
                let (min, max) = width_limits(drawing)?;
                WidthMode::Speed { min, max }
            }
            other => WidthMode::Constant {
                width: other.parse().map_err(|_| {
                    GeekError::config(format!(
                        "Invalid linewidth '{}'. Expected a number, elevation or speed",
                        other
                    ))
                })?,
            },
        },
    };

    let palette = drawing.palette.to_palette()?;

    let background = drawing
        .background
        .as_deref()
        .map(str::parse::<Rgba>)
        .transpose()?;

    Ok(RenderConfig {
        colour_mode,
        width_mode,
        palette,
        background,
        base_colour,
        default_width: defaults.default_width,
    })
}

fn width_limits(drawing: &DrawingSection) -> GeekResult<(f64, f64)> {
    match (drawing.linewidth_min, drawing.linewidth_max) {
        (Some(min), Some(max)) => Ok((min, max)),
        _ => Err(GeekError::config(
            "A variable linewidth needs linewidth_min and linewidth_max",
        )),
    }
}
