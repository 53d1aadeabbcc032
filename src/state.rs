use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::color::Color;
use crate::error::ConfigError;

///////////////////////// MODE /////////////////////////

/// Which family of node trees drives the show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Everything dark
    Blackout,
    /// Slow fades, no strobes
    Chill,
    /// Soft pulsing to the music
    #[default]
    Gentle,
    /// Everything allowed
    Rave,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Blackout, Mode::Chill, Mode::Gentle, Mode::Rave];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Blackout => "blackout",
            Mode::Chill => "chill",
            Mode::Gentle => "gentle",
            Mode::Rave => "rave",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == lower)
            .ok_or_else(|| ConfigError::UnknownMode(s.to_string()))
    }
}

/// Passed to every `generate` call so nodes can bias their random choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vibe {
    pub mode: Mode,
    /// How wild the show may get, `0..=100`. Candidates hyped above this are skipped.
    pub hype: u8,
    pub allow_rainbows: bool,
}

impl Vibe {
    pub fn new(mode: Mode) -> Self {
        let hype = match mode {
            Mode::Blackout => 0,
            Mode::Chill => 20,
            Mode::Gentle => 50,
            Mode::Rave => 90,
        };
        Self { mode, hype, allow_rainbows: true }
    }

    pub fn with_rainbows(self, allow_rainbows: bool) -> Self {
        Self { allow_rainbows, ..self }
    }

    /// Rough energy level of the mode, `0..1`.
    pub fn energy(&self) -> f64 {
        match self.mode {
            Mode::Blackout => 0.0,
            Mode::Chill => 0.25,
            Mode::Gentle => 0.5,
            Mode::Rave => 1.0,
        }
    }
}

///////////////////////// COLOR SCHEME /////////////////////////

/// Addresses one member of a [`ColorScheme`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Fg,
    Bg,
    BgContrast,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Fg, Role::Bg, Role::BgContrast];
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScheme {
    pub fg: Color,
    pub bg: Color,
    pub bg_contrast: Color,
}

impl ColorScheme {
    pub const fn new(fg: Color, bg: Color, bg_contrast: Color) -> Self {
        Self { fg, bg, bg_contrast }
    }

    pub fn get(&self, role: Role) -> Color {
        match role {
            Role::Fg => self.fg,
            Role::Bg => self.bg,
            Role::BgContrast => self.bg_contrast,
        }
    }

    /// Members in order: fg, bg, bg_contrast.
    pub fn colors(&self) -> [Color; 3] {
        [self.fg, self.bg, self.bg_contrast]
    }

    /// Find a preset by name, e.g. `standard-3` or `tropical-1`.
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        SCHEMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| *s)
            .ok_or_else(|| ConfigError::UnknownScheme(name.to_string()))
    }

    /// Any preset other than this one.
    pub fn next_preset(&self, rng: &mut impl Rng) -> Self {
        let others = SCHEMES.iter().filter(|(_, s)| s != self).map(|(_, s)| *s).collect::<Vec<_>>();
        others.choose(rng).copied().unwrap_or(*self)
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        SCHEMES[0].1
    }
}

use Color as C;

pub const SCHEMES: [(&str, ColorScheme); 10] = [
    ("standard-1", ColorScheme::new(C::GREEN, C::BLUE, C::BLUE)),
    ("standard-2", ColorScheme::new(C::WHITE, C::BLUE, C::PURPLE)),
    ("standard-3", ColorScheme::new(C::WHITE, C::RED, C::RED)),
    ("standard-4", ColorScheme::new(C::WHITE, C::RED, C::PURPLE)),
    ("standard-5", ColorScheme::new(C::RED, C::BLUE, C::BLUE)),
    ("standard-6", ColorScheme::new(C::MAGENTA, C::BLUE, C::PURPLE)),
    ("standard-7", ColorScheme::new(C::BLUE, C::PURPLE, C::PURPLE)),
    ("tropical-1", ColorScheme::new(C::WHITE, C::GREEN, C::PURPLE)),
    ("tropical-2", ColorScheme::new(C::WHITE, C::GREEN, C::YELLOW)),
    ("tropical-3", ColorScheme::new(C::CYAN, C::PINK, C::ORANGE)),
];
