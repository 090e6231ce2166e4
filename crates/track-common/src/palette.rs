//! Piecewise-linear colour palettes over the normalized `[0, 1]` domain.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{GeekError, GeekResult};

/// A colour stop within a palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteStop {
    pub key: f64,
    pub colour: Rgb,
}

/// Colour palette keyed by fractions in `[0, 1]`.
///
/// Stops are kept sorted by key. Queries below the smallest key or above the
/// largest clamp to that endpoint's colour. Serialized as the list of stops;
/// deserializing goes through [`Palette::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PaletteStop>", into = "Vec<PaletteStop>")]
pub struct Palette {
    stops: Vec<PaletteStop>,
}

impl Palette {
    /// Build a palette from `(key, colour)` pairs in any order.
    pub fn new(entries: impl IntoIterator<Item = (f64, Rgb)>) -> GeekResult<Self> {
        let mut stops: Vec<PaletteStop> = entries
            .into_iter()
            .map(|(key, colour)| PaletteStop { key, colour })
            .collect();

        for stop in &stops {
            if !stop.key.is_finite() || !(0.0..=1.0).contains(&stop.key) {
                return Err(GeekError::config(format!(
                    "Palette key {} is outside 0-1",
                    stop.key
                )));
            }
        }

        stops.sort_by(|a, b| a.key.total_cmp(&b.key));

        if stops.windows(2).any(|w| w[0].key == w[1].key) {
            return Err(GeekError::config("Palette keys must be unique"));
        }

        Ok(Self { stops })
    }

    /// Spread colours evenly from 0 to 1, first colour at 0 and last at 1.
    pub fn evenly_spaced(colours: &[Rgb]) -> GeekResult<Self> {
        match colours {
            [] => Err(GeekError::config("Palette needs at least one colour")),
            [only] => Self::new([(0.0, *only)]),
            _ => {
                let step = 1.0 / (colours.len() - 1) as f64;
                let last = colours.len() - 1;
                Self::new(colours.iter().enumerate().map(|(i, c)| {
                    // Pin the final key so float drift never pushes it past 1
                    let key = if i == last { 1.0 } else { i as f64 * step };
                    (key, *c)
                }))
            }
        }
    }

    pub fn stops(&self) -> &[PaletteStop] {
        &self.stops
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Colour at `fraction`. A non-finite fraction is an error.
    pub fn interpolate(&self, fraction: f64) -> GeekResult<Rgb> {
        if !fraction.is_finite() {
            return Err(GeekError::config(format!(
                "Cannot interpolate a palette at {}",
                fraction
            )));
        }
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(GeekError::config("Cannot interpolate an empty palette")),
        };

        if fraction <= first.key {
            return Ok(first.colour);
        }
        if fraction >= last.key {
            return Ok(last.colour);
        }

        // first.key < fraction < last.key, so `hi` exists and is not the first stop
        let hi_idx = self.stops.partition_point(|s| s.key <= fraction);
        let lo = &self.stops[hi_idx - 1];
        if lo.key == fraction {
            return Ok(lo.colour);
        }
        let hi = &self.stops[hi_idx];

        let t = (fraction - lo.key) / (hi.key - lo.key);
        Ok(lo.colour.lerp(&hi.colour, t))
    }
}

impl TryFrom<Vec<PaletteStop>> for Palette {
    type Error = GeekError;

    fn try_from(stops: Vec<PaletteStop>) -> GeekResult<Self> {
        Self::new(stops.into_iter().map(|s| (s.key, s.colour)))
    }
}

impl From<Palette> for Vec<PaletteStop> {
    fn from(palette: Palette) -> Self {
        palette.stops
    }
}

impl Default for Palette {
    /// Black to white.
    fn default() -> Self {
        Self {
            stops: vec![
                PaletteStop {
                    key: 0.0,
                    colour: Rgb::BLACK,
                },
                PaletteStop {
                    key: 1.0,
                    colour: Rgb::WHITE,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rainbow() -> Palette {
        Palette::new([
            (1.0, Rgb::new(1.0, 0.0, 0.0)),
            (0.0, Rgb::new(0.0, 0.0, 1.0)),
            (0.3, Rgb::new(0.0, 1.0, 0.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_quarter_grey() {
        let c = Palette::default().interpolate(0.25).unwrap();
        assert_eq!(c, Rgb::new(0.25, 0.25, 0.25));
    }

    #[test]
    fn test_exact_keys_return_stored_colour() {
        let p = rainbow();
        for stop in p.stops() {
            assert_eq!(p.interpolate(stop.key).unwrap(), stop.colour);
        }
    }

    #[test]
    fn test_clamps_outside_keys() {
        let p = Palette::new([(0.2, Rgb::new(0.1, 0.2, 0.3)), (0.8, Rgb::new(0.9, 0.8, 0.7))]).unwrap();
        assert_eq!(p.interpolate(-5.0).unwrap(), p.interpolate(0.2).unwrap());
        assert_eq!(p.interpolate(0.1).unwrap(), Rgb::new(0.1, 0.2, 0.3));
        assert_eq!(p.interpolate(5.0).unwrap(), p.interpolate(0.8).unwrap());
    }

    #[test]
    fn test_interpolates_between_neighbours() {
        let p = rainbow();
        // Halfway between 0.3 (green) and 1.0 (red)
        let c = p.interpolate(0.65).unwrap();
        assert!((c.r - 0.5).abs() < 1e-9);
        assert!((c.g - 0.5).abs() < 1e-9);
        assert!(c.b.abs() < 1e-9);
    }

    #[test]
    fn test_empty_palette_errors() {
        let p = Palette::new(Vec::new()).unwrap();
        assert!(matches!(p.interpolate(0.5), Err(GeekError::Configuration(_))));
    }

    #[test]
    fn test_deserialize_sorts_stops() {
        let unsorted = vec![
            PaletteStop { key: 1.0, colour: Rgb::WHITE },
            PaletteStop { key: 0.0, colour: Rgb::BLACK },
        ];
        let json = serde_json::to_string(&unsorted).unwrap();
        let palette: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(palette, Palette::default());
        assert_eq!(palette.interpolate(0.0).unwrap(), Rgb::BLACK);
    }

    #[test]
    fn test_deserialize_rejects_bad_keys() {
        for stops in [
            vec![PaletteStop { key: 1.5, colour: Rgb::WHITE }],
            vec![
                PaletteStop { key: 0.5, colour: Rgb::WHITE },
                PaletteStop { key: 0.5, colour: Rgb::BLACK },
            ],
        ] {
            let json = serde_json::to_string(&stops).unwrap();
            assert!(serde_json::from_str::<Palette>(&json).is_err());
        }
    }

    #[test]
    fn test_non_finite_fraction_is_an_error() {
        let p = rainbow();
        for fraction in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                p.interpolate(fraction),
                Err(GeekError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(Palette::new([(1.5, Rgb::BLACK)]).is_err());
        assert!(Palette::new([(f64::NAN, Rgb::BLACK)]).is_err());
        assert!(Palette::new([(0.5, Rgb::BLACK), (0.5, Rgb::WHITE)]).is_err());
    }

    #[test]
    fn test_single_stop_palette_is_constant() {
        let p = Palette::new([(0.4, Rgb::new(0.2, 0.2, 0.2))]).unwrap();
        assert_eq!(p.interpolate(0.0).unwrap(), Rgb::new(0.2, 0.2, 0.2));
        assert_eq!(p.interpolate(1.0).unwrap(), Rgb::new(0.2, 0.2, 0.2));
    }

    #[test]
    fn test_evenly_spaced() {
        let p = Palette::evenly_spaced(&[Rgb::BLACK, Rgb::new(0.5, 0.0, 0.0), Rgb::WHITE]).unwrap();
        let keys: Vec<f64> = p.stops().iter().map(|s| s.key).collect();
        assert_eq!(keys, vec![0.0, 0.5, 1.0]);
        assert!(Palette::evenly_spaced(&[]).is_err());
    }
}
