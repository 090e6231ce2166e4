//! Geographic bounds → canvas layout.
//!
//! Chooses a raster resolution for a set of bounds under a [`SizePolicy`]
//! and maps latitude/longitude points onto the canvas, with latitudes warped
//! by the Mercator formula in [`mercator`].

pub mod layout;
pub mod mercator;

pub use layout::{CanvasLayout, PixelInset, Projector, SizePolicy, DEFAULT_MAX_DIMENSION};
pub use mercator::{merc, MAX_LATITUDE};
