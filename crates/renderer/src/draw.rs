//! Walks tracks and issues canvas commands.

use std::path::PathBuf;
use std::sync::Arc;

use gpx_reader::{ParsedTrack, TrackPoint};
use projection::{CanvasLayout, PixelInset, Projector};
use tracing::{debug, info, warn};
use track_common::{ColourMode, GeekResult, Metric, RenderConfig, Rgb, ValueRange, WidthMode};
use track_library::{EffectiveBounds, TrackDescriptor, PROGRESS_INTERVAL};

use crate::canvas::Canvas;

/// What happened during one [`TrackRenderer::render`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub tracks_drawn: usize,
    /// Tracks drawn with the base colour and default width because a
    /// required metric was unavailable.
    pub fallback_tracks: Vec<PathBuf>,
    /// Tracks whose points could not be reloaded.
    pub failed_tracks: Vec<(PathBuf, String)>,
    /// Points outside the bounds.
    pub points_dropped: usize,
    pub strokes: usize,
}

/// Per-track drawing outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackDraw {
    pub points_dropped: usize,
    pub strokes: usize,
}

/// Colour and width picked for a whole track or one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StrokeStyle {
    colour: Rgb,
    width: f64,
}

/// Draws tracks for one layout, style and set of effective bounds.
#[derive(Debug)]
pub struct TrackRenderer<'a> {
    config: &'a RenderConfig,
    bounds: &'a EffectiveBounds,
    projector: Projector,
}

impl<'a> TrackRenderer<'a> {
    pub fn new(
        layout: &CanvasLayout,
        config: &'a RenderConfig,
        bounds: &'a EffectiveBounds,
        inset: PixelInset,
    ) -> Self {
        Self {
            config,
            bounds,
            projector: layout.projector(inset),
        }
    }

    /// Paint the background (if any) and then every track, in order.
    ///
    /// A track that cannot be reloaded is recorded and skipped. Canvas
    /// failures abort.
    pub fn render<C: Canvas>(
        &self,
        tracks: &[Arc<TrackDescriptor>],
        canvas: &mut C,
    ) -> GeekResult<RenderReport> {
        let mut report = RenderReport::default();
        if let Some(background) = self.config.background {
            canvas.paint_background(background);
        }

        for (i, descriptor) in tracks.iter().enumerate() {
            let path = descriptor.path();
            let track = match descriptor.parsed() {
                Ok(track) => track,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping track while drawing");
                    report.failed_tracks.push((path, e.to_string()));
                    continue;
                }
            };

            if let Some(missing) = self.missing_metric(&track) {
                warn!(
                    path = %path.display(),
                    metric = missing.as_str(),
                    "Metric unavailable, drawing track with base colour"
                );
                report.fallback_tracks.push(path.clone());
            }

            let drawn = self.draw_track(&track, canvas)?;
            report.tracks_drawn += 1;
            report.points_dropped += drawn.points_dropped;
            report.strokes += drawn.strokes;

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                info!(done = i + 1, total = tracks.len(), "Drawing tracks");
            }
        }

        debug!(
            drawn = report.tracks_drawn,
            fallback = report.fallback_tracks.len(),
            failed = report.failed_tracks.len(),
            dropped = report.points_dropped,
            "Rendered tracks"
        );
        Ok(report)
    }

    /// Draw one track's segments.
    pub fn draw_track<C: Canvas>(&self, track: &ParsedTrack, canvas: &mut C) -> GeekResult<TrackDraw> {
        let fallback = self.missing_metric(track).is_some();
        if self.config.is_constant() || fallback {
            let style = if fallback {
                StrokeStyle {
                    colour: self.config.base_colour,
                    width: self.config.default_width,
                }
            } else {
                self.constant_style()
            };
            self.draw_constant(track, style, canvas)
        } else {
            self.draw_variable(track, canvas)
        }
    }

    /// The first required metric this track cannot supply, if any.
    fn missing_metric(&self, track: &ParsedTrack) -> Option<Metric> {
        self.config.required_metrics().into_iter().find(|&metric| {
            let has_range = self.bounds.range_for(metric).is_some();
            let has_data = match metric {
                Metric::Elevation => track.elevation_extremes().is_some(),
                Metric::Speed => track.max_speed().is_some(),
            };
            !(has_range && has_data)
        })
    }

    fn constant_style(&self) -> StrokeStyle {
        let colour = match self.config.colour_mode {
            ColourMode::Constant { colour } => colour,
            _ => self.config.base_colour,
        };
        let width = match self.config.width_mode {
            WidthMode::Constant { width } => width,
            _ => self.config.default_width,
        };
        StrokeStyle { colour, width }
    }

    /// One stroke per segment. A dropped point lifts the pen.
    fn draw_constant<C: Canvas>(
        &self,
        track: &ParsedTrack,
        style: StrokeStyle,
        canvas: &mut C,
    ) -> GeekResult<TrackDraw> {
        let mut drawn = TrackDraw::default();
        for segment in track.segments() {
            canvas.set_stroke(style.colour, style.width);
            let mut pen_down = false;
            for point in segment.points() {
                match self.projector.project_pixels(point.latitude, point.longitude) {
                    Some((x, y)) if pen_down => canvas.line_to(x, y),
                    Some((x, y)) => {
                        canvas.move_to(x, y);
                        pen_down = true;
                    }
                    None => {
                        drawn.points_dropped += 1;
                        pen_down = false;
                    }
                }
            }
            canvas.stroke()?;
            drawn.strokes += 1;
        }
        Ok(drawn)
    }

    /// Every edge stroked on its own with a style from the metric.
    fn draw_variable<C: Canvas>(&self, track: &ParsedTrack, canvas: &mut C) -> GeekResult<TrackDraw> {
        let mut drawn = TrackDraw::default();
        for segment in track.segments() {
            let mut previous: Option<&TrackPoint> = None;
            for point in segment.points() {
                let Some((x, y)) = self.projector.project_pixels(point.latitude, point.longitude)
                else {
                    drawn.points_dropped += 1;
                    previous = None;
                    continue;
                };
                if let Some(prev) = previous {
                    let style = self.edge_style(prev, point)?;
                    canvas.set_stroke(style.colour, style.width);
                    canvas.line_to(x, y);
                    canvas.stroke()?;
                    drawn.strokes += 1;
                }
                canvas.move_to(x, y);
                previous = Some(point);
            }
        }
        Ok(drawn)
    }

    fn edge_style(&self, previous: &TrackPoint, current: &TrackPoint) -> GeekResult<StrokeStyle> {
        let fraction = |metric: Metric| -> Option<f64> {
            let value = match metric {
                Metric::Elevation => current.elevation,
                Metric::Speed => current.speed_between(previous),
            }?;
            let range: ValueRange = self.bounds.range_for(metric)?;
            range.normalize(value)
        };

        let colour = match self.config.colour_mode {
            ColourMode::Constant { colour } => colour,
            mode => match mode.metric().and_then(fraction) {
                Some(f) => self.config.palette.interpolate(f)?,
                None => self.config.base_colour,
            },
        };
        let width = match self.config.width_mode {
            WidthMode::Constant { width } => width,
            mode => match mode.metric().and_then(fraction) {
                Some(f) => mode.width_at(f),
                None => self.config.default_width,
            },
        };
        Ok(StrokeStyle { colour, width })
    }
}
