//! Vector canvas writing SVG text.

use std::fmt::Write as _;

use track_common::{GeekResult, Rgb, Rgba};

use crate::canvas::Canvas;

/// Collects strokes as `<path>` elements.
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: u32,
    height: u32,
    background: Option<String>,
    body: String,
    path: String,
    has_point: bool,
    colour: Rgb,
    line_width: f64,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: None,
            body: String::new(),
            path: String::new(),
            has_point: false,
            colour: Rgb::BLACK,
            line_width: 1.0,
        }
    }

    /// The document as it would be written now.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.width,
            h = self.height
        );
        if let Some(background) = &self.background {
            svg.push_str(background);
        }
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

impl Canvas for SvgCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn paint_background(&mut self, colour: Rgba) {
        self.body.clear();
        self.background = Some(format!(
            "  <rect width=\"100%\" height=\"100%\" fill=\"{}\" fill-opacity=\"{}\"/>\n",
            colour.rgb().to_hex(),
            colour.a
        ));
    }

    fn set_stroke(&mut self, colour: Rgb, width: f64) {
        self.colour = colour;
        self.line_width = width;
    }

    fn move_to(&mut self, x: f64, y: f64) {
        let _ = write!(self.path, "M{:.2} {:.2} ", x, y);
        self.has_point = true;
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if !self.has_point {
            self.move_to(x, y);
            return;
        }
        let _ = write!(self.path, "L{:.2} {:.2} ", x, y);
    }

    fn stroke(&mut self) -> GeekResult<()> {
        let path = std::mem::take(&mut self.path);
        self.has_point = false;
        if !path.contains('L') {
            return Ok(());
        }
        let _ = writeln!(
            self.body,
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
            path.trim_end(),
            self.colour.to_hex(),
            self.line_width
        );
        Ok(())
    }

    fn finish(self) -> GeekResult<Vec<u8>> {
        Ok(self.to_svg().into_bytes())
    }
}
