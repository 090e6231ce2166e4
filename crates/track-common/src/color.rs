//! Colour representation for track drawing.
//!
//! Channels are floats in `[0, 1]`. Text forms accepted by [`FromStr`]:
//! - `"r,g,b"` or `"r,g,b,a"` with float channels
//! - `"#RRGGBB"` or `"#RRGGBBAA"`

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeekError;

/// An opaque colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Per-channel linear interpolation. `t` is not clamped.
    pub fn lerp(&self, other: &Rgb, t: f64) -> Rgb {
        Rgb {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }

    pub fn with_alpha(&self, a: f64) -> Rgba {
        Rgba::new(self.r, self.g, self.b, a)
    }

    /// Convert to 8-bit channels.
    pub fn to_u8(&self) -> (u8, u8, u8) {
        (channel_to_u8(self.r), channel_to_u8(self.g), channel_to_u8(self.b))
    }

    /// `#rrggbb` form, as used by SVG output.
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_u8();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl From<[f64; 3]> for Rgb {
    fn from(c: [f64; 3]) -> Self {
        Rgb::new(c[0], c[1], c[2])
    }
}

impl From<Rgb> for [f64; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

impl FromStr for Rgb {
    type Err = GeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rgba: Rgba = s.parse()?;
        if rgba.a < 1.0 {
            return Err(GeekError::config(format!(
                "Colour '{}' has an alpha channel where an opaque colour is required",
                s
            )));
        }
        Ok(rgba.rgb())
    }
}

/// A colour with an alpha channel, used for backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    pub fn to_u8(&self) -> (u8, u8, u8, u8) {
        let (r, g, b) = self.rgb().to_u8();
        (r, g, b, channel_to_u8(self.a))
    }
}

impl From<Rgb> for Rgba {
    fn from(c: Rgb) -> Self {
        c.with_alpha(1.0)
    }
}

impl FromStr for Rgba {
    type Err = GeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| GeekError::config(format!("Invalid hex colour: {}", s)));
        }

        let channels = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| GeekError::config(format!("Invalid colour: {}", s)))?;

        if channels.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(GeekError::config(format!(
                "Colour channels must be within 0-1: {}",
                s
            )));
        }

        match channels.as_slice() {
            [r, g, b] => Ok(Rgba::new(*r, *g, *b, 1.0)),
            [r, g, b, a] => Ok(Rgba::new(*r, *g, *b, *a)),
            _ => Err(GeekError::config(format!(
                "Colour must have 3 or 4 channels: {}",
                s
            ))),
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| -> Option<f64> {
        u8::from_str_radix(hex.get(i..i + 2)?, 16)
            .ok()
            .map(|v| v as f64 / 255.0)
    };
    match hex.len() {
        6 => Some(Rgba::new(channel(0)?, channel(2)?, channel(4)?, 1.0)),
        8 => Some(Rgba::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => None,
    }
}

fn channel_to_u8(c: f64) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float_triplet() {
        let c: Rgb = "0.3,0.2,0.5".parse().unwrap();
        assert_eq!(c, Rgb::new(0.3, 0.2, 0.5));
    }

    #[test]
    fn test_parse_hex() {
        let c: Rgba = "#ff000080".parse().unwrap();
        assert_eq!(c.to_u8(), (255, 0, 0, 128));
        let opaque: Rgb = "#00ff00".parse().unwrap();
        assert_eq!(opaque.to_u8(), (0, 255, 0));
    }

    #[test]
    fn test_parse_rejects_out_of_range_channels() {
        assert!("1.5,0,0".parse::<Rgba>().is_err());
        assert!("0,0".parse::<Rgba>().is_err());
        assert!("#12345".parse::<Rgba>().is_err());
    }

    #[test]
    fn test_rgb_rejects_translucent() {
        assert!("0,0,0,0.5".parse::<Rgb>().is_err());
        assert!("0,0,0,1".parse::<Rgb>().is_ok());
    }

    #[test]
    fn test_lerp_and_hex() {
        let mid = Rgb::BLACK.lerp(&Rgb::WHITE, 0.5);
        assert_eq!(mid, Rgb::new(0.5, 0.5, 0.5));
        assert_eq!(Rgb::new(1.0, 0.0, 0.0).to_hex(), "#ff0000");
    }
}
