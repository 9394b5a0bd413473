//! Color ramps for continuous data.
//!
//! A ramp is a list of evenly spaced color stops; values between stops
//! are interpolated linearly per channel.

use serde::Serialize;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    /// Neutral gray used for unmapped class values.
    pub const fn unmapped() -> Self {
        Self::rgb(128, 128, 128)
    }

    /// Parse `#RRGGBB` or `RRGGBB`, with an optional trailing alpha byte.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 && hex.len() != 8 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

/// Linear color interpolation, `t` clamped to 0..=1.
pub fn interpolate_color(color1: Color, color2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t).round() as u8;
    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// Evenly spaced color stops.
#[derive(Debug, Clone, Copy)]
pub struct ColorRamp {
    pub name: &'static str,
    stops: &'static [Color],
}

/// Terrain: lowland green through tan and brown to snow white.
pub const ELEVATION: ColorRamp = ColorRamp {
    name: "elevation",
    stops: &[
        Color::rgb(0, 97, 71),
        Color::rgb(16, 122, 47),
        Color::rgb(120, 170, 80),
        Color::rgb(232, 215, 125),
        Color::rgb(210, 170, 110),
        Color::rgb(161, 67, 0),
        Color::rgb(130, 90, 70),
        Color::rgb(255, 255, 255),
    ],
};

/// Diverging blue to red, warm values high.
pub const TEMPERATURE: ColorRamp = ColorRamp {
    name: "temperature",
    stops: &[
        Color::rgb(49, 54, 149),
        Color::rgb(69, 117, 180),
        Color::rgb(116, 173, 209),
        Color::rgb(171, 217, 233),
        Color::rgb(255, 255, 191),
        Color::rgb(253, 174, 97),
        Color::rgb(244, 109, 67),
        Color::rgb(215, 48, 39),
        Color::rgb(165, 0, 38),
    ],
};

/// Sequential white to dark blue.
pub const PRECIPITATION: ColorRamp = ColorRamp {
    name: "precipitation",
    stops: &[
        Color::rgb(247, 251, 255),
        Color::rgb(198, 219, 239),
        Color::rgb(107, 174, 214),
        Color::rgb(33, 113, 181),
        Color::rgb(8, 48, 107),
    ],
};

/// Perceptually ordered default.
pub const VIRIDIS: ColorRamp = ColorRamp {
    name: "viridis",
    stops: &[
        Color::rgb(68, 1, 84),
        Color::rgb(59, 82, 139),
        Color::rgb(33, 145, 140),
        Color::rgb(94, 201, 98),
        Color::rgb(253, 231, 37),
    ],
};

impl ColorRamp {
    pub fn stops(&self) -> &'static [Color] {
        self.stops
    }

    /// Color at normalized position `t` (clamped to 0..=1).
    pub fn color_at(&self, t: f64) -> Color {
        let n = self.stops.len();
        match n {
            0 => return Color::transparent(),
            1 => return self.stops[0],
            _ => {}
        }
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let pos = t * (n - 1) as f64;
        let lower = (pos.floor() as usize).min(n - 2);
        interpolate_color(self.stops[lower], self.stops[lower + 1], pos - lower as f64)
    }

    /// Color of `value` scaled from `min..=max`. A zero-width range maps
    /// every value to the first stop.
    pub fn color_for(&self, value: f64, min: f64, max: f64) -> Color {
        let range = max - min;
        if range.abs() < f64::EPSILON {
            return self.color_at(0.0);
        }
        self.color_at((value - min) / range)
    }

    /// Pick a ramp from a variable name.
    pub fn for_variable(name: &str) -> ColorRamp {
        let lower = name.to_lowercase();
        if ["temp", "tmax", "tmin", "tas", "t2m"].iter().any(|k| lower.contains(k)) {
            TEMPERATURE
        } else if ["prcp", "precip", "ppt", "rain"].iter().any(|k| lower.contains(k)) {
            PRECIPITATION
        } else {
            VIRIDIS
        }
    }
}

/// Render grid values as RGBA pixels through `ramp`.
///
/// Non-finite values become transparent.
pub fn render_grid(values: &[f64], min: f64, max: f64, ramp: &ColorRamp) -> Vec<Color> {
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                ramp.color_for(v, min, max)
            } else {
                Color::transparent()
            }
        })
        .collect()
}
