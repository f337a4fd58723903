//! Trace colour sequence.
//!
//! Colours are picked in YUV space. Luminance runs evenly from 0 to
//! [`MAX_Y`] so lines stay distinguishable in greyscale, while the chroma
//! point walks a circle by a golden-ratio turn per trace, keeping each hue
//! far from all earlier ones.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Hue of the first trace (radians).
const START_ANGLE: f64 = 1.5;

/// Chroma radius; 0 gives greyscale.
const COLOR_STRENGTH: f64 = 0.5;

/// Brightest luminance used.
pub const MAX_Y: f64 = 0.7;

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// CSS `rgb(r,g,b)` form.
    pub fn to_css(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Convert a YUV triple to RGB.
pub fn yuv_to_rgb(y: f64, u: f64, v: f64) -> Rgb {
    let r = y + 1.370705 * v;
    let g = y - 0.698001 * v - 0.337633 * u;
    let b = y + 1.732446 * u;
    Rgb {
        r: to_byte(r),
        g: to_byte(g),
        b: to_byte(b),
    }
}

fn to_byte(component: f64) -> u8 {
    (component * 256.0).round().clamp(0.0, 255.0) as u8
}

/// Generate `n` well-separated trace colours.
pub fn make_colors(n: usize) -> Vec<Rgb> {
    let phi = (1.0 + 5f64.sqrt()) / 2.0;
    (0..n)
        .map(|i| {
            let y = if n > 1 {
                i as f64 * MAX_Y / (n - 1) as f64
            } else {
                0.0
            };
            let angle = START_ANGLE - 2.0 * PI * i as f64 * phi;
            let u = COLOR_STRENGTH * angle.sin();
            let v = COLOR_STRENGTH * angle.cos();
            yuv_to_rgb(y, u, v)
        })
        .collect()
}
