use std::ops::Mul;

use crate::num::{Float, Range};

/// Linear RGB color, each channel in `0..1`.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK:   Self = Self::rgb(0.0,   0.0,   0.0);
    pub const WHITE:   Self = Self::rgb(1.0,   1.0,   1.0);

    pub const RED:     Self = Self::rgb(1.0,   0.0,   0.0);
    pub const ORANGE:  Self = Self::rgb(1.0,   0.251, 0.0);
    pub const YELLOW:  Self = Self::rgb(1.0,   1.0,   0.0);
    pub const GREEN:   Self = Self::rgb(0.0,   1.0,   0.0);
    pub const CYAN:    Self = Self::rgb(0.0,   0.8,   1.0);
    pub const BLUE:    Self = Self::rgb(0.0,   0.0,   1.0);
    pub const PURPLE:  Self = Self::rgb(0.533, 0.0,   1.0);
    pub const MAGENTA: Self = Self::rgb(1.0,   0.0,   1.0);
    pub const PINK:    Self = Self::rgb(1.0,   0.38,  0.8);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self { Self { r, g, b } }

    pub fn hsv(h: f64, s: f64, v: f64) -> Self {
        let r = v * s.lerp(1.0..(((h + 1.0      ).fract() * 6.0 - 3.0).abs() - 1.0).clamp(0.0, 1.0));
        let g = v * s.lerp(1.0..(((h + 0.6666666).fract() * 6.0 - 3.0).abs() - 1.0).clamp(0.0, 1.0));
        let b = v * s.lerp(1.0..(((h + 0.3333333).fract() * 6.0 - 3.0).abs() - 1.0).clamp(0.0, 1.0));
        Self::rgb(r, g, b)
    }
}

impl Color {
    pub fn lerp(self, other: Color, fr: f64) -> Self {
        let fr = fr.clamp01();
        Self {
            r: fr.lerp(Range::new(self.r, other.r)),
            g: fr.lerp(Range::new(self.g, other.g)),
            b: fr.lerp(Range::new(self.b, other.b)),
        }
    }

    /// Channel-wise product, used for tinting.
    pub fn filter(self, other: Color) -> Self {
        Self::rgb(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    pub fn clamped(self) -> Self {
        Self::rgb(self.r.clamp01(), self.g.clamp01(), self.b.clamp01())
    }

    pub fn is_black(&self) -> bool {
        self.r <= 0.0 && self.g <= 0.0 && self.b <= 0.0
    }
}

impl Mul<f64> for Color {
    type Output = Self;
    fn mul(self, fr: f64) -> Self {
        Self::rgb(self.r * fr, self.g * fr, self.b * fr)
    }
}
