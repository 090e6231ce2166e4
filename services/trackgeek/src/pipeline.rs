//! One rendering run: gather tracks, lay out the canvas, write outputs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use projection::CanvasLayout;
use renderer::{Canvas, RasterCanvas, RenderReport, SvgCanvas, TrackRenderer};
use serde::Serialize;
use storage::{ImportOutcome, TrackQuery, TrackStore};
use tracing::{info, warn};
use track_common::GeoBounds;
use track_library::{discover_tracks, EffectiveBounds, TrackLibrary};

use crate::config::Settings;

/// A track left out of the rendering, as reported in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub tracks_drawn: usize,
    pub imported: usize,
    pub skipped: Vec<SkippedEntry>,
    pub width: u32,
    pub height: u32,
    pub bounds: Option<GeoBounds>,
    pub points_dropped: usize,
    pub fallback_tracks: usize,
    pub outputs: Vec<PathBuf>,
}

/// Run the whole pipeline for `settings`.
///
/// Tracks that fail to parse or fall outside the overrides are skipped and
/// reported; configuration, store and output errors abort.
pub async fn run(settings: &Settings) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut library = TrackLibrary::new(settings.overrides, settings.parse_mode);

    if let Some(root) = &settings.library {
        let store = TrackStore::open(root)
            .await
            .with_context(|| format!("Failed to open track library at {}", root.display()))?;

        if settings.import {
            if let Some(input) = &settings.input {
                summary.imported = import_tracks(&store, input, &mut summary.skipped).await?;
            }
        }

        let query = TrackQuery::for_overrides(&settings.overrides);
        let stored = store.query(&query).await?;
        info!(root = %root.display(), tracks = stored.len(), "Loaded tracks from library");
        for descriptor in stored {
            library.add_descriptor(descriptor);
        }
    }

    // Imported tracks are drawn from their vault copies only.
    if let Some(input) = &settings.input {
        if !(settings.import && settings.library.is_some()) {
            library.add_path(input)?;
        }
    }

    summary.skipped.extend(library.skipped().iter().map(|s| SkippedEntry {
        path: s.path.clone(),
        reason: s.reason.to_string(),
    }));

    let bounds = library
        .finalize()
        .context("Cannot determine map bounds")?;
    let layout = CanvasLayout::compute(&bounds.geo, settings.size)?;
    summary.width = layout.pixel_width();
    summary.height = layout.pixel_height();
    summary.bounds = Some(bounds.geo);
    info!(
        tracks = library.len(),
        width = summary.width,
        height = summary.height,
        "Laid out canvas"
    );

    let tracks = library.tracks_by_time();
    let renderer = TrackRenderer::new(&layout, &settings.render, &bounds, settings.inset);

    if let Some(path) = &settings.out_png {
        let mut canvas = RasterCanvas::new(layout.pixel_width(), layout.pixel_height())?;
        let report = renderer.render(&tracks, &mut canvas)?;
        write_output(path, canvas, "PNG").await?;
        record(&mut summary, &report, path);
    }
    if let Some(path) = &settings.out_svg {
        let mut canvas = SvgCanvas::new(layout.pixel_width(), layout.pixel_height());
        let report = renderer.render(&tracks, &mut canvas)?;
        write_output(path, canvas, "SVG").await?;
        record(&mut summary, &report, path);
    }

    log_skipped(&summary.skipped);
    log_bounds(&bounds);

    if let Some(path) = &settings.summary {
        let json = serde_json::to_vec_pretty(&summary)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    }

    Ok(summary)
}

/// Import every track under `input` into `store`. Returns how many were new.
async fn import_tracks(
    store: &TrackStore,
    input: &Path,
    skipped: &mut Vec<SkippedEntry>,
) -> Result<usize> {
    let paths = discover_tracks(input)?;
    let mut imported = 0;
    for path in paths {
        match store.import(&path).await {
            Ok(ImportOutcome::Imported(_)) => imported += 1,
            Ok(ImportOutcome::AlreadyStored(_)) => {}
            Err(e) if e.is_per_track() => {
                warn!(path = %path.display(), error = %e, "Skipping track during import");
                skipped.push(SkippedEntry {
                    path,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(input = %input.display(), imported, total = store.count().await?, "Imported tracks");
    Ok(imported)
}

async fn write_output<C: Canvas>(path: &Path, canvas: C, kind: &str) -> Result<()> {
    let bytes = canvas.finish()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("Failed to write {} to {}", kind, path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Wrote {}", kind);
    Ok(())
}

fn record(summary: &mut RunSummary, report: &RenderReport, path: &Path) {
    // Each output draws the same tracks; keep the largest counts.
    summary.tracks_drawn = summary.tracks_drawn.max(report.tracks_drawn);
    summary.points_dropped = summary.points_dropped.max(report.points_dropped);
    summary.fallback_tracks = summary.fallback_tracks.max(report.fallback_tracks.len());
    for (failed, reason) in &report.failed_tracks {
        let entry = SkippedEntry {
            path: failed.clone(),
            reason: reason.clone(),
        };
        if !summary.skipped.contains(&entry) {
            summary.skipped.push(entry);
        }
    }
    summary.outputs.push(path.to_path_buf());
}

fn log_skipped(skipped: &[SkippedEntry]) {
    if skipped.is_empty() {
        return;
    }
    warn!(count = skipped.len(), "Some tracks were skipped");
    for entry in skipped {
        info!(path = %entry.path.display(), reason = %entry.reason, "Skipped track");
    }
}

fn log_bounds(bounds: &EffectiveBounds) {
    info!(
        min_latitude = bounds.geo.min_latitude,
        max_latitude = bounds.geo.max_latitude,
        min_longitude = bounds.geo.min_longitude,
        max_longitude = bounds.geo.max_longitude,
        min_speed = bounds.speed.min,
        max_speed = bounds.speed.max,
        "Effective bounds"
    );
    if let Some(elevation) = bounds.elevation {
        info!(min = elevation.min, max = elevation.max, "Elevation range");
    }
}
