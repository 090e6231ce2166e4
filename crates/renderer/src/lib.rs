//! Track rendering.
//!
//! [`TrackRenderer`] walks every segment of every track, projects points
//! through a [`projection::Projector`] and issues stroke commands to a
//! [`Canvas`]. Two canvases are provided:
//! - [`RasterCanvas`]: anti-aliased tiny-skia pixmap, finished as PNG
//! - [`SvgCanvas`]: SVG text

pub mod canvas;
pub mod draw;
pub mod png;
pub mod raster;
pub mod svg;

pub use canvas::Canvas;
pub use draw::{RenderReport, TrackDraw, TrackRenderer};
pub use raster::RasterCanvas;
pub use svg::SvgCanvas;
