use std::f64::consts::TAU;

/// A closed interval used as the target of [`Float::lerp`].
///
/// `lo` may be greater than `hi`, in which case lerping runs backwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
    pub lo: f64,
    pub hi: f64,
}

impl Range {
    pub const UNIT: Self = Self::new(0.0, 1.0);

    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn min(&self) -> f64 {
        self.lo.min(self.hi)
    }
    pub fn max(&self) -> f64 {
        self.lo.max(self.hi)
    }
}

impl From<std::ops::Range<f64>> for Range {
    fn from(r: std::ops::Range<f64>) -> Self {
        Self::new(r.start, r.end)
    }
}

/// Waveform and phase helpers over `f64`.
///
/// Periodic functions take the period `pd` in the same unit as `self` (usually
/// seconds of elapsed show time) and return values in `0..1`.
pub trait Float: Sized + Copy {
    /// Euclidean modulo, always in `0..m`.
    fn fmod(self, m: f64) -> f64;
    /// Fraction `0..1` through the current period.
    fn fmod_div(self, pd: f64) -> f64;
    /// Shift by `offset` periods.
    fn phase(self, pd: f64, offset: f64) -> f64;

    fn ramp(self, pd: f64) -> f64;
    fn tri(self, pd: f64) -> f64;
    fn square(self, pd: f64, duty: f64) -> f64;
    /// Sine over the period, `-1..1`.
    fn ssin(self, pd: f64) -> f64;

    fn lerp<R: Into<Range>>(self, r: R) -> f64;
    fn inv(self) -> f64;
    fn in_quad(self) -> f64;
    fn clamp01(self) -> f64;
}

impl Float for f64 {
    fn fmod(self, m: f64) -> f64 {
        if m == 0.0 {
            return 0.0;
        }
        self.rem_euclid(m)
    }

    fn fmod_div(self, pd: f64) -> f64 {
        if pd == 0.0 {
            return 0.0;
        }
        self.fmod(pd) / pd
    }

    fn phase(self, pd: f64, offset: f64) -> f64 {
        (self + offset * pd).fmod(pd)
    }

    fn ramp(self, pd: f64) -> f64 {
        self.fmod_div(pd)
    }

    fn tri(self, pd: f64) -> f64 {
        let fr = self.fmod_div(pd);
        if fr < 0.5 {
            fr * 2.0
        } else {
            2.0 - fr * 2.0
        }
    }

    fn square(self, pd: f64, duty: f64) -> f64 {
        if self.fmod_div(pd) < duty {
            1.0
        } else {
            0.0
        }
    }

    fn ssin(self, pd: f64) -> f64 {
        (self.fmod_div(pd) * TAU).sin()
    }

    fn lerp<R: Into<Range>>(self, r: R) -> f64 {
        let r = r.into();
        r.lo + (r.hi - r.lo) * self
    }

    fn inv(self) -> f64 {
        1.0 - self
    }

    fn in_quad(self) -> f64 {
        self * self
    }

    /// NaN maps to `0.0` so the result is always a legal fraction.
    fn clamp01(self) -> f64 {
        if self.is_nan() {
            0.0
        } else {
            self.clamp(0.0, 1.0)
        }
    }
}
