use crate::error::ConfigError;
use crate::lights::{FixtureKind, Rig};
use crate::state::{ColorScheme, Mode};

/// Fixtures to build the rig from, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct RigConfig {
    pub groups: Vec<(FixtureKind, usize)>,
}

impl RigConfig {
    pub fn build(&self) -> Result<Rig, ConfigError> {
        let mut rig = Rig::new();
        for &(kind, count) in &self.groups {
            rig.add_group(kind, count)?;
        }
        Ok(rig)
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self { groups: vec![(FixtureKind::Par, 8), (FixtureKind::Mover, 4), (FixtureKind::Strobe, 2)] }
    }
}

#[derive(Debug, Clone)]
pub struct ShowConfig {
    /// Tick rate of the director loop
    pub fps: f64,
    /// Seconds over which signals ramp in after startup, `0` to disable
    pub warmup_secs: f64,
    /// Seconds between automatic shifts
    pub shift_after_secs: f64,
    pub auto_shift_fraction: f64,
    pub scheme_fade_secs: f64,
    /// Visual canvas size in pixels
    pub canvas: (u32, u32),
    /// Render targets the renderer may hand out at once
    pub pool_capacity: usize,
    /// Seed for every random choice, `None` for entropy
    pub seed: Option<u64>,
    pub mode: Mode,
    pub scheme: ColorScheme,
    /// Whether rainbow color ops may be picked
    pub allow_rainbows: bool,
    pub rig: RigConfig,
}

impl ShowConfig {
    fn default_fps() -> f64 {
        60.0
    }
    fn default_warmup_secs() -> f64 {
        10.0
    }
    fn default_shift_after_secs() -> f64 {
        60.0
    }
    fn default_auto_shift_fraction() -> f64 {
        0.3
    }
    fn default_scheme_fade_secs() -> f64 {
        2.0
    }

    /// Reject values the director cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |what: &str| Err(ConfigError::Invalid(what.to_string()));
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return invalid("fps must be positive");
        }
        if !(0.0..=1.0).contains(&self.auto_shift_fraction) {
            return invalid("auto shift fraction must be within 0..=1");
        }
        let durations = [self.warmup_secs, self.shift_after_secs, self.scheme_fade_secs];
        if !durations.iter().all(|d| d.is_finite() && *d >= 0.0) {
            return invalid("durations must be finite and not negative");
        }
        if self.canvas.0 == 0 || self.canvas.1 == 0 {
            return invalid("canvas must not be empty");
        }
        if self.pool_capacity == 0 {
            return invalid("pool capacity must be at least 1");
        }
        Ok(())
    }
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            fps: Self::default_fps(),
            warmup_secs: Self::default_warmup_secs(),
            shift_after_secs: Self::default_shift_after_secs(),
            auto_shift_fraction: Self::default_auto_shift_fraction(),
            scheme_fade_secs: Self::default_scheme_fade_secs(),
            canvas: (64, 36),
            pool_capacity: 16,
            seed: None,
            mode: Mode::default(),
            scheme: ColorScheme::default(),
            allow_rainbows: true,
            rig: RigConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ShowConfig::default();
        config.validate().unwrap();
        assert_eq!(config.rig.build().unwrap().len(), 14);
    }

    #[test]
    fn rejects_bad_values() {
        let config = ShowConfig { fps: 0.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        let config = ShowConfig { auto_shift_fraction: 1.5, ..Default::default() };
        assert!(config.validate().is_err());
        for config in [
            ShowConfig { warmup_secs: f64::NAN, ..Default::default() },
            ShowConfig { shift_after_secs: f64::NAN, ..Default::default() },
            ShowConfig { scheme_fade_secs: f64::INFINITY, ..Default::default() },
            ShowConfig { warmup_secs: -1.0, ..Default::default() },
        ] {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{config:?}");
        }
        let rig = RigConfig { groups: vec![(FixtureKind::Laser, 0)] };
        assert_eq!(rig.build().unwrap_err(), ConfigError::EmptyGroup("laser".into()));
    }
}
