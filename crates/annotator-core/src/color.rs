//! Color conversion for the PDF drawing layer

use serde::{Deserialize, Serialize};

/// RGB color with components in the 0-1 range, as PDF `rg` operators expect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    pub fn gray(level: f32) -> Self {
        Self::new(level, level, level)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

/// Parse a hex color string ("#RGB" or "#RRGGBB") to RGB floats (0-1 range).
///
/// The leading `#` is required rather than skipped, so "xFF0000" or "FF0000"
/// is not read as red. Anything else, including a bad digit, is black.
pub fn hex_to_rgb(color: &str) -> Rgb {
    match parse_channels(color) {
        Some([r, g, b]) => Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0),
        None => Rgb::BLACK,
    }
}

fn parse_channels(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        // 3 digits
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..=i].repeat(2), 16).ok();
            Some([digit(0)?, digit(1)?, digit(2)?])
        }
        // 6 digits
        6 => {
            let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some([pair(0)?, pair(2)?, pair(4)?])
        }
        _ => None,
    }
}

/// Darken (factor < 1) or keep a color to tint a blur overlay.
///
/// PDF has no blur primitive; a blur region is drawn as a translucent
/// rectangle in this color.
pub fn simulate_blur_color(color: &str, factor: f32) -> Rgb {
    let base = hex_to_rgb(color);
    let factor = factor.clamp(0.0, 1.0);
    Rgb::new(base.r * factor, base.g * factor, base.b * factor)
}
