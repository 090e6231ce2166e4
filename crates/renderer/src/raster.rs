//! Raster canvas on tiny-skia, finished as PNG.

use tiny_skia::{
    Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform,
};
use track_common::{GeekError, GeekResult, Rgb, Rgba};

use crate::canvas::Canvas;
use crate::png::encode_png;

/// Anti-aliased raster surface.
pub struct RasterCanvas {
    pixmap: Pixmap,
    path: PathBuilder,
    has_point: bool,
    paint: Paint<'static>,
    stroke: Stroke,
}

impl std::fmt::Debug for RasterCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterCanvas")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish()
    }
}

fn to_color(colour: Rgba) -> Color {
    let (r, g, b, a) = colour.to_u8();
    Color::from_rgba8(r, g, b, a)
}

impl RasterCanvas {
    /// A transparent canvas of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> GeekResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            GeekError::Render(format!("Cannot allocate a {}x{} canvas", width, height))
        })?;

        let mut paint = Paint::default();
        paint.anti_alias = true;
        let stroke = Stroke {
            width: 1.0,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        Ok(Self {
            pixmap,
            path: PathBuilder::new(),
            has_point: false,
            paint,
            stroke,
        })
    }

    /// Straight-alpha RGBA bytes, row-major.
    pub fn rgba_pixels(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.pixels().len() * 4);
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn paint_background(&mut self, colour: Rgba) {
        self.pixmap.fill(to_color(colour));
    }

    fn set_stroke(&mut self, colour: Rgb, width: f64) {
        self.paint.set_color(to_color(colour.into()));
        self.stroke.width = width as f32;
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to(x as f32, y as f32);
        self.has_point = true;
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if self.has_point {
            self.path.line_to(x as f32, y as f32);
        } else {
            self.move_to(x, y);
        }
    }

    fn stroke(&mut self) -> GeekResult<()> {
        let builder = std::mem::replace(&mut self.path, PathBuilder::new());
        self.has_point = false;
        // A path with no line segments yields None and draws nothing
        if let Some(path) = builder.finish() {
            self.pixmap
                .stroke_path(&path, &self.paint, &self.stroke, Transform::identity(), None);
        }
        Ok(())
    }

    fn finish(self) -> GeekResult<Vec<u8>> {
        encode_png(&self.rgba_pixels(), self.pixmap.width(), self.pixmap.height())
    }
}
