use crate::color::Color;
use crate::state::ColorScheme;

/// Latch
///
/// Hysteresis switch: turns on once the input rises above `on`, and only turns
/// off again once it drops below `off`. `rising()` reports the tick it turned on,
/// which is what chases and color cycles count as a "pulse".
#[derive(Clone, Copy, Debug)]
pub struct Latch {
    pub on: f64,
    pub off: f64,
    held: bool,
    rose: bool,
}

impl Latch {
    pub fn new(on: f64, off: f64) -> Self {
        Self { on, off: off.min(on), held: false, rose: false }
    }

    /// Trigger at `threshold` with a small release band below it.
    pub fn at(threshold: f64) -> Self {
        Self::new(threshold, threshold - 0.1)
    }

    pub fn update(&mut self, value: f64) -> bool {
        self.rose = false;
        if !self.held && value > self.on {
            self.held = true;
            self.rose = true;
        } else if self.held && value < self.off {
            self.held = false;
        }
        self.held
    }

    pub fn held(&self) -> bool {
        self.held
    }

    pub fn rising(&self) -> bool {
        self.rose
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new(0.6, 0.4)
    }
}

/// Values that can be blended for a [`Fade`].
pub trait Lerp: Clone {
    fn lerp(&self, other: &Self, fr: f64) -> Self;
}

impl Lerp for Color {
    fn lerp(&self, other: &Self, fr: f64) -> Self {
        Color::lerp(*self, *other, fr)
    }
}

impl Lerp for ColorScheme {
    fn lerp(&self, other: &Self, fr: f64) -> Self {
        ColorScheme {
            fg: self.fg.lerp(other.fg, fr),
            bg: self.bg.lerp(other.bg, fr),
            bg_contrast: self.bg_contrast.lerp(other.bg_contrast, fr),
        }
    }
}

/// Fade
///
/// Cross-fades from the current value to a pushed target over `duration` seconds
/// of show time. Once the fade completes the target becomes the current value.
#[derive(Clone, Debug)]
pub struct Fade<T> {
    current: T,
    target: Option<(T, f64)>,
    duration: f64,
}

impl<T: Lerp> Fade<T> {
    pub fn new(value: T, duration: f64) -> Self {
        Self { current: value, target: None, duration: duration.max(0.0) }
    }

    /// Start fading towards `value` from time `t`. A fade already in progress
    /// is frozen at its current mix first so there is no jump.
    pub fn push(&mut self, value: T, t: f64) {
        self.current = self.render(t);
        self.target = Some((value, t));
    }

    pub fn render(&self, t: f64) -> T {
        match &self.target {
            None => self.current.clone(),
            Some((target, t0)) => {
                let fr = if self.duration == 0.0 { 1.0 } else { (t - t0) / self.duration };
                if fr >= 1.0 {
                    target.clone()
                } else {
                    self.current.lerp(target, fr)
                }
            }
        }
    }

    /// Collapse a finished fade so later renders are a plain clone.
    pub fn settle(&mut self, t: f64) {
        if let Some((target, t0)) = &self.target {
            if self.duration == 0.0 || t - t0 >= self.duration {
                self.current = target.clone();
                self.target = None;
            }
        }
    }

    pub fn is_fading(&self) -> bool {
        self.target.is_some()
    }

    /// The value being faded to, or the current value when idle.
    pub fn destination(&self) -> &T {
        self.target.as_ref().map(|(t, _)| t).unwrap_or(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_rises_once() {
        let mut l = Latch::default();
        assert!(!l.update(0.5));
        assert!(l.update(0.7));
        assert!(l.rising());
        assert!(l.update(0.5));
        assert!(!l.rising());
        assert!(!l.update(0.3));
        assert!(l.update(0.9));
        assert!(l.rising());
    }

    #[test]
    fn fade_is_continuous() {
        let mut f = Fade::new(Color::BLACK, 2.0);
        f.push(Color::WHITE, 10.0);
        assert_eq!(f.render(10.0), Color::BLACK);
        assert_eq!(f.render(11.0), Color::rgb(0.5, 0.5, 0.5));
        assert_eq!(f.render(12.5), Color::WHITE);

        // Retarget mid-fade starts from the blended value.
        f.push(Color::RED, 11.0);
        assert_eq!(f.render(11.0), Color::rgb(0.5, 0.5, 0.5));
        f.settle(13.0);
        assert!(!f.is_fading());
        assert_eq!(f.render(20.0), Color::RED);
    }
}
