//! Helpers shared by the trackgeek test suites.
//!
//! - [`GpxBuilder`] writes small GPX documents to disk
//! - `fixtures` holds canned tracks with known bounds
//! - `generators` produces synthetic point sequences and pixel buffers
//! - `paths` creates scratch directories that clean up after themselves
//!
//! Pull it in as a dev-dependency with a path entry pointing at
//! `crates/test-utils`.

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Fails the test when two numbers differ by more than `tolerance`.
///
/// Both sides are widened to `f64`, so integer and `f32` operands work too.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let tolerance = $tolerance as f64;
        let delta = (actual - expected).abs();
        assert!(
            delta <= tolerance,
            "values not within tolerance: actual {} expected {} (delta {} > {})",
            actual,
            expected,
            delta,
            tolerance
        );
    }};
}

/// [`assert_approx_eq!`] applied to both halves of a canvas coordinate.
#[macro_export]
macro_rules! assert_xy_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (ax, ay) = $actual;
        let (ex, ey) = $expected;
        $crate::assert_approx_eq!(ax, ex, $tolerance);
        $crate::assert_approx_eq!(ay, ey, $tolerance);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_close_values_pass() {
        assert_approx_eq!(51.50001, 51.5, 1e-4);
        assert_approx_eq!(0, 0.0, 0.0);
        assert_approx_eq!(-0.1278_f32, -0.1278, 1e-6);
    }

    #[test]
    #[should_panic(expected = "not within tolerance")]
    fn test_distant_values_fail() {
        assert_approx_eq!(12.0, 11.0, 0.5);
    }

    #[test]
    fn test_canvas_points_compare_per_axis() {
        assert_xy_approx_eq!((63.9999, 128.0), (64.0, 128.0001), 0.001);
    }
}
