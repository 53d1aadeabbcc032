use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::num::Float;

/// One kind of audio-derived (or manually held) intensity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// Energy across the whole spectrum
    FreqAll,
    /// Bass energy
    FreqLow,
    /// Drum/hat energy
    FreqHigh,
    /// Bass held over a longer window
    SustainedLow,
    /// Highs held over a longer window
    SustainedHigh,
    /// Beat-shaped pulse
    Pulse,
    /// Strobe button
    Strobe,
    /// Blinder buttons
    BigBlinder,
    SmallBlinder,
}

impl Signal {
    pub const COUNT: usize = 9;

    pub const ALL: [Signal; Self::COUNT] = [
        Signal::FreqAll,
        Signal::FreqLow,
        Signal::FreqHigh,
        Signal::SustainedLow,
        Signal::SustainedHigh,
        Signal::Pulse,
        Signal::Strobe,
        Signal::BigBlinder,
        Signal::SmallBlinder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Signal::FreqAll => "freq_all",
            Signal::FreqLow => "freq_low",
            Signal::FreqHigh => "freq_high",
            Signal::SustainedLow => "sustained_low",
            Signal::SustainedHigh => "sustained_high",
            Signal::Pulse => "pulse",
            Signal::Strobe => "strobe",
            Signal::BigBlinder => "big_blinder",
            Signal::SmallBlinder => "small_blinder",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Signal {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signal::ALL
            .into_iter()
            .find(|sig| sig.name() == s)
            .ok_or_else(|| ConfigError::UnknownSignal(s.to_string()))
    }
}

/// SignalFrame
///
/// Snapshot of every signal for one tick, plus the show time it was taken at.
/// Values are always in `0..1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalFrame {
    /// Show time in seconds
    pub t: f64,
    values: [f64; Signal::COUNT],
}

impl SignalFrame {
    pub fn new(t: f64) -> Self {
        Self { t, values: [0.0; Signal::COUNT] }
    }

    pub fn with(mut self, signal: Signal, value: f64) -> Self {
        self.set(signal, value);
        self
    }

    /// Every signal at the same level.
    pub fn uniform(t: f64, value: f64) -> Self {
        Signal::ALL.into_iter().fold(Self::new(t), |f, sig| f.with(sig, value))
    }

    pub fn set(&mut self, signal: Signal, value: f64) {
        self.values[signal.index()] = value.clamp01();
    }

    pub fn get(&self, signal: Signal) -> f64 {
        self.values[signal.index()]
    }

    pub fn at(mut self, t: f64) -> Self {
        self.t = t;
        self
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        let factor = factor.clamp01();
        self.values.iter_mut().for_each(|v| *v *= factor);
        self
    }

    /// Per-signal maximum with manually held signals.
    pub fn merged(mut self, manual: &ManualSignals) -> Self {
        for (v, m) in self.values.iter_mut().zip(manual.values.iter()) {
            *v = v.max(*m);
        }
        self
    }
}

impl fmt::Display for SignalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame(all={}, high={}, low={})",
            (self.get(Signal::FreqAll) * 100.0) as u32,
            (self.get(Signal::FreqHigh) * 100.0) as u32,
            (self.get(Signal::FreqLow) * 100.0) as u32,
        )
    }
}

/// Signals held from the control surface (strobe/blinder/pulse buttons).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ManualSignals {
    values: [f64; Signal::COUNT],
}

impl ManualSignals {
    pub fn set(&mut self, signal: Signal, value: f64) {
        self.values[signal.index()] = value.clamp01();
    }

    pub fn get(&self, signal: Signal) -> f64 {
        self.values[signal.index()]
    }
}
