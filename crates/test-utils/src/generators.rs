//! Synthetic track and pixel generators.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::fixtures::{point, GpxBuilder};

/// A fixed reference time for tests (2012-06-01T10:00:00Z).
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2012, 6, 1, 10, 0, 0).unwrap()
}

/// A single-segment track of `count` points evenly spaced from `start` to
/// `end`, one point every 10 seconds from [`reference_time`].
///
/// With `elevation = Some((a, b))` the elevation runs linearly from `a` to `b`.
///
/// # Example
///
/// ```
/// use test_utils::line_track;
///
/// let track = line_track((0.0, 0.0), (1.0, 1.0), 3, None);
/// assert_eq!(track.segments()[0].len(), 3);
/// assert_eq!(track.segments()[0][1].lat, 0.5);
/// ```
pub fn line_track(
    start: (f64, f64),
    end: (f64, f64),
    count: usize,
    elevation: Option<(f64, f64)>,
) -> GpxBuilder {
    let t0 = reference_time();
    let steps = count.saturating_sub(1).max(1) as f64;
    let points = (0..count).map(|i| {
        let f = i as f64 / steps;
        let mut p = point(
            start.0 + f * (end.0 - start.0),
            start.1 + f * (end.1 - start.1),
        )
        .at(t0 + Duration::seconds(10 * i as i64));
        if let Some((a, b)) = elevation {
            p = p.ele(a + f * (b - a));
        }
        p
    });
    GpxBuilder::new().segment(points)
}

/// Creates RGBA pixel data with a horizontal red and vertical green gradient.
pub fn create_test_rgba_pixels(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let r = ((x as f32 / width as f32) * 255.0) as u8;
            let g = ((y as f32 / height as f32) * 255.0) as u8;
            pixels.extend_from_slice(&[r, g, 128, 255]);
        }
    }
    pixels
}

/// Creates RGBA pixel data using only `colours`, cycling per pixel.
pub fn create_few_colour_pixels(width: usize, height: usize, colours: &[[u8; 4]]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for i in 0..width * height {
        pixels.extend_from_slice(&colours[i % colours.len()]);
    }
    pixels
}
