//! Drawing surface abstraction.

use track_common::{GeekResult, Rgb, Rgba};

/// A surface the track renderer draws on.
///
/// Coordinates are in pixels with the origin at the top-left corner. Paths
/// are built with [`Canvas::move_to`] and [`Canvas::line_to`] and drawn by
/// [`Canvas::stroke`], which uses the most recent [`Canvas::set_stroke`]
/// settings and then clears the path. Lines have round caps and joins.
pub trait Canvas {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fill the whole surface, replacing anything drawn so far.
    fn paint_background(&mut self, colour: Rgba);

    fn set_stroke(&mut self, colour: Rgb, width: f64);

    /// Start a new subpath at `(x, y)`.
    fn move_to(&mut self, x: f64, y: f64);

    /// Extend the current subpath. Without a current point this acts as
    /// [`Canvas::move_to`].
    fn line_to(&mut self, x: f64, y: f64);

    fn stroke(&mut self) -> GeekResult<()>;

    /// Encoded output (PNG or SVG bytes).
    fn finish(self) -> GeekResult<Vec<u8>>
    where
        Self: Sized;
}
