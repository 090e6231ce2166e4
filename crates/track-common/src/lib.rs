//! Common types and utilities shared across all trackgeek crates.

pub mod bbox;
pub mod color;
pub mod error;
pub mod palette;
pub mod range;
pub mod style;

pub use bbox::GeoBounds;
pub use color::{Rgb, Rgba};
pub use error::{GeekError, GeekResult};
pub use palette::Palette;
pub use range::{DateRange, TimeSpan, ValueRange};
pub use style::{ColourMode, Metric, RenderConfig, WidthMode};
