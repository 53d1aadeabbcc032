use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::color::Color;
use crate::frame::{Signal, SignalFrame};
use crate::lights::{for_each, map_colors, Fixture, MAX_STROBE_HZ};
use crate::node::Generate;
use crate::num::Float;
use crate::state::{ColorScheme, Mode, Role, Vibe};
use crate::utils::Latch;

/// Signals an operation may pick to react to.
const REACTIVE: [Signal; 4] = [Signal::FreqAll, Signal::FreqLow, Signal::FreqHigh, Signal::Pulse];

/// What advances a chase by one fixture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChaseDriver {
    /// One step per rising edge of the signal
    Signal(Signal),
    /// One step every `n` seconds of show time
    Period(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovePattern {
    Circles,
    Nod,
}

/// LightOp
///
/// A transform applied to the fixtures below it after they have been stepped.
/// Dimmer ops overwrite the dimmer, color ops overwrite the color, and movement
/// ops overwrite pan/tilt, so any pipeline order is well defined.
#[derive(Clone, Debug)]
pub enum LightOp {
    /// Constant brightness.
    Dimmer { level: f64 },
    /// Brightness follows a signal, never dropping below `floor`.
    Pulse { signal: Signal, floor: f64 },
    /// Jumps up with the signal, then decays by `decay` per second.
    SlowDecay { signal: Signal, decay: f64, memory: f64, last_t: Option<f64> },
    /// Full on while the signal is latched, off otherwise.
    Latched { signal: Signal, latch: Latch },
    /// One hot fixture at a time, the rest at `floor`.
    Chase { driver: ChaseDriver, floor: f64, latch: Latch, steps: usize },
    /// Random fixtures sparkle, re-rolled `rate` times a second.
    Twinkle { rate: f64, density: f64, seed: u64 },
    /// Pan spread widens with the signal.
    Fan { signal: Signal, narrow: f64, wide: f64 },
    Move { pattern: MovePattern, speed: f64, phase: f64 },
    /// Every fixture in one scheme color.
    Paint { role: Role },
    /// Even fixtures bg, odd fixtures bg_contrast.
    Alternate,
    Rainbow { speed: f64, spread: f64 },
    /// Steps through the scheme colors on each pulse.
    ColorCycle { signal: Signal, latch: Latch, index: usize },
    /// Strobes at `rate` Hz while the signal is above `threshold`.
    Strobe { signal: Signal, threshold: f64, rate: f64 },
    /// Reacts to the strobe, big blinder and small blinder buttons, in that order.
    SignalSwitch { responds: [bool; 3] },
}

impl LightOp {
    pub fn pulse(signal: Signal) -> Self {
        LightOp::Pulse { signal, floor: 0.1 }
    }

    pub fn slow_decay(signal: Signal) -> Self {
        LightOp::SlowDecay { signal, decay: 1.0, memory: 0.0, last_t: None }
    }

    pub fn latched(signal: Signal) -> Self {
        LightOp::Latched { signal, latch: Latch::default() }
    }

    pub fn chase(driver: ChaseDriver) -> Self {
        LightOp::Chase { driver, floor: 0.1, latch: Latch::default(), steps: 0 }
    }

    pub fn twinkle() -> Self {
        LightOp::Twinkle { rate: 4.0, density: 0.3, seed: 0 }
    }

    pub fn fan(signal: Signal) -> Self {
        LightOp::Fan { signal, narrow: 0.05, wide: 0.5 }
    }

    pub fn movement(pattern: MovePattern) -> Self {
        LightOp::Move { pattern, speed: 0.25, phase: 0.0 }
    }

    pub fn rainbow() -> Self {
        LightOp::Rainbow { speed: 0.1, spread: 0.5 }
    }

    pub fn color_cycle(signal: Signal) -> Self {
        LightOp::ColorCycle { signal, latch: Latch::default(), index: 0 }
    }

    pub fn strobe(signal: Signal) -> Self {
        LightOp::Strobe { signal, threshold: 0.8, rate: 12.0 }
    }

    pub fn signal_switch() -> Self {
        LightOp::SignalSwitch { responds: [true; 3] }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LightOp::Dimmer { .. } => "Dimmer",
            LightOp::Pulse { .. } => "Pulse",
            LightOp::SlowDecay { .. } => "SlowDecay",
            LightOp::Latched { .. } => "Latched",
            LightOp::Chase { .. } => "Chase",
            LightOp::Twinkle { .. } => "Twinkle",
            LightOp::Fan { .. } => "Fan",
            LightOp::Move { .. } => "Move",
            LightOp::Paint { .. } => "Paint",
            LightOp::Alternate => "Alternate",
            LightOp::Rainbow { .. } => "Rainbow",
            LightOp::ColorCycle { .. } => "ColorCycle",
            LightOp::Strobe { .. } => "Strobe",
            LightOp::SignalSwitch { .. } => "SignalSwitch",
        }
    }

    /// Transform `fixtures` for the current tick.
    pub fn apply(&mut self, fixtures: &mut [Fixture], frame: &SignalFrame, scheme: &ColorScheme) {
        let t = frame.t;
        match self {
            LightOp::Dimmer { level } => {
                let level = *level;
                for_each(fixtures, |f, _, _| f.set_dimmer(level));
            }
            LightOp::Pulse { signal, floor } => {
                let v = frame.get(*signal).lerp(*floor..1.0);
                for_each(fixtures, |f, _, _| f.set_dimmer(v));
            }
            LightOp::SlowDecay { signal, decay, memory, last_t } => {
                let dt = last_t.map_or(0.0, |last| (t - last).max(0.0));
                *last_t = Some(t);
                *memory = (*memory - *decay * dt).max(frame.get(*signal)).clamp01();
                let v = *memory;
                for_each(fixtures, |f, _, _| f.set_dimmer(v));
            }
            LightOp::Latched { signal, latch } => {
                let v = if latch.update(frame.get(*signal)) { 1.0 } else { 0.0 };
                for_each(fixtures, |f, _, _| f.set_dimmer(v));
            }
            LightOp::Chase { driver, floor, latch, steps } => {
                let hot = match *driver {
                    ChaseDriver::Signal(signal) => {
                        latch.update(frame.get(signal));
                        if latch.rising() {
                            *steps += 1;
                        }
                        *steps
                    }
                    ChaseDriver::Period(pd) => (t / pd).floor().max(0.0) as usize,
                };
                let n = fixtures.len().max(1);
                let floor = *floor;
                for_each(fixtures, |f, i, _| f.set_dimmer(if i == hot % n { 1.0 } else { floor }));
            }
            LightOp::Twinkle { rate, density, seed } => {
                let bucket = (t * *rate).floor().max(0.0) as u64;
                let (density, seed) = (*density, *seed);
                for_each(fixtures, |f, i, _| {
                    let roll = hash01(seed, i as u64, bucket);
                    f.set_dimmer(if roll < density { 1.0 } else { 0.1 });
                });
            }
            LightOp::Fan { signal, narrow, wide } => {
                let spread = frame.get(*signal).lerp(*narrow..*wide);
                let n = fixtures.len();
                for_each(fixtures, |f, i, _| {
                    let offset = if n > 1 { i as f64 / (n - 1) as f64 - 0.5 } else { 0.0 };
                    f.set_pan(0.5 + offset * spread);
                });
            }
            LightOp::Move { pattern, speed, phase } => {
                let x = t * *speed;
                let (pattern, phase) = (*pattern, *phase);
                for_each(fixtures, |f, _, fr| {
                    let off = phase + fr;
                    match pattern {
                        MovePattern::Circles => {
                            f.set_pan(0.5 + 0.25 * x.phase(1.0, off).ssin(1.0));
                            f.set_tilt(0.5 + 0.25 * x.phase(1.0, off + 0.25).ssin(1.0));
                        }
                        MovePattern::Nod => {
                            f.set_pan(0.5);
                            f.set_tilt(x.phase(1.0, off).tri(1.0).lerp(0.2..0.8));
                        }
                    }
                });
            }
            LightOp::Paint { role } => {
                let color = scheme.get(*role);
                map_colors(fixtures, |_| color);
            }
            LightOp::Alternate => {
                for_each(fixtures, |f, i, _| f.set_color(if i % 2 == 0 { scheme.bg } else { scheme.bg_contrast }));
            }
            LightOp::Rainbow { speed, spread } => {
                let (speed, spread) = (*speed, *spread);
                for_each(fixtures, |f, _, fr| f.set_color(Color::hsv((t * speed + fr * spread).fmod(1.0), 1.0, 1.0)));
            }
            LightOp::ColorCycle { signal, latch, index } => {
                latch.update(frame.get(*signal));
                if latch.rising() {
                    *index += 1;
                }
                let color = scheme.colors()[*index % 3];
                map_colors(fixtures, |_| color);
            }
            LightOp::Strobe { signal, threshold, rate } => {
                if frame.get(*signal) > *threshold {
                    let rate = *rate;
                    for_each(fixtures, |f, _, _| {
                        f.set_strobe(rate);
                        f.set_dimmer(1.0);
                    });
                }
            }
            LightOp::SignalSwitch { responds } => {
                let [strobe, big, small] = *responds;
                if strobe && frame.get(Signal::Strobe) > 0.5 {
                    for_each(fixtures, |f, _, _| {
                        f.set_strobe(MAX_STROBE_HZ * 0.8);
                        f.set_dimmer(1.0);
                    });
                }
                if big && frame.get(Signal::BigBlinder) > 0.5 {
                    for_each(fixtures, |f, _, _| {
                        f.set_color(Color::WHITE);
                        f.set_dimmer(1.0);
                    });
                } else if small && frame.get(Signal::SmallBlinder) > 0.5 {
                    for_each(fixtures, |f, i, _| {
                        if i % 2 == 0 {
                            f.set_color(Color::WHITE);
                            f.set_dimmer(1.0);
                        }
                    });
                }
            }
        }
    }
}

impl Generate for LightOp {
    fn generate(&mut self, rng: &mut StdRng, vibe: &Vibe) {
        let energy = vibe.energy();
        let signal = |rng: &mut StdRng| *REACTIVE.choose(rng).unwrap_or(&Signal::FreqAll);
        match self {
            LightOp::Dimmer { level } => *level = rng.gen_range(0.4..=1.0),
            LightOp::Pulse { signal: s, floor } => {
                *s = signal(rng);
                *floor = rng.gen_range(0.05..0.3);
            }
            LightOp::SlowDecay { signal: s, decay, memory, last_t } => {
                *s = signal(rng);
                *decay = rng.gen_range(0.3..1.5) * (0.5 + energy);
                *memory = 0.0;
                *last_t = None;
            }
            LightOp::Latched { signal: s, latch } => {
                *s = signal(rng);
                *latch = Latch::at(rng.gen_range(0.4..0.8));
            }
            LightOp::Chase { driver, floor, latch, steps } => {
                *driver = if rng.gen_bool(0.5) {
                    ChaseDriver::Signal(*[Signal::Pulse, Signal::FreqLow].choose(rng).unwrap_or(&Signal::Pulse))
                } else {
                    ChaseDriver::Period(rng.gen_range(0.15..0.6) / (0.5 + energy))
                };
                *floor = rng.gen_range(0.05..0.2);
                *latch = Latch::default();
                *steps = 0;
            }
            LightOp::Twinkle { rate, density, seed } => {
                *rate = rng.gen_range(2.0..6.0) * (0.5 + energy);
                *density = rng.gen_range(0.15..0.5);
                *seed = rng.gen();
            }
            LightOp::Fan { signal: s, narrow, wide } => {
                *s = signal(rng);
                *narrow = rng.gen_range(0.0..0.2);
                *wide = rng.gen_range(0.4..1.0);
            }
            LightOp::Move { pattern, speed, phase } => {
                *pattern = if rng.gen_bool(0.5) { MovePattern::Circles } else { MovePattern::Nod };
                *speed = rng.gen_range(0.05..0.2) * (1.0 + 2.0 * energy);
                *phase = rng.gen();
            }
            LightOp::Paint { role } => *role = *Role::ALL.choose(rng).unwrap_or(&Role::Fg),
            LightOp::Alternate => {}
            LightOp::Rainbow { speed, spread } => {
                *speed = rng.gen_range(0.02..0.2);
                *spread = rng.gen_range(0.0..1.0);
            }
            LightOp::ColorCycle { signal: s, latch, index } => {
                *s = signal(rng);
                *latch = Latch::default();
                *index = rng.gen_range(0..3);
            }
            LightOp::Strobe { signal: s, threshold, rate } => {
                *s = *[Signal::Strobe, Signal::FreqHigh].choose(rng).unwrap_or(&Signal::Strobe);
                *threshold = rng.gen_range(0.7..0.95);
                *rate = match vibe.mode {
                    Mode::Rave => rng.gen_range(10.0..MAX_STROBE_HZ),
                    _ => rng.gen_range(4.0..10.0),
                };
            }
            LightOp::SignalSwitch { responds } => {
                // Strobe response is the one the control surface relies on most
                responds[0] = rng.gen_bool(0.8);
                responds[1] = rng.gen_bool(0.5);
                responds[2] = rng.gen_bool(0.5);
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            LightOp::Dimmer { level } => format!("Dimmer({level:.2})"),
            LightOp::Pulse { signal, floor } => format!("Pulse({signal}, floor {floor:.2})"),
            LightOp::SlowDecay { signal, decay, .. } => format!("SlowDecay({signal}, {decay:.2}/s)"),
            LightOp::Latched { signal, latch } => format!("Latched({signal} > {:.2})", latch.on),
            LightOp::Chase { driver: ChaseDriver::Signal(s), .. } => format!("Chase(on {s})"),
            LightOp::Chase { driver: ChaseDriver::Period(pd), .. } => format!("Chase(every {pd:.2}s)"),
            LightOp::Twinkle { rate, density, .. } => format!("Twinkle({rate:.1}Hz, {density:.2})"),
            LightOp::Fan { signal, narrow, wide } => format!("Fan({signal}, {narrow:.2}..{wide:.2})"),
            LightOp::Move { pattern, speed, .. } => format!("Move({pattern:?}, {speed:.2})"),
            LightOp::Paint { role } => format!("Paint({role:?})"),
            LightOp::Strobe { signal, rate, .. } => format!("Strobe({signal}, {rate:.1}Hz)"),
            LightOp::ColorCycle { signal, .. } => format!("ColorCycle({signal})"),
            op => op.name().to_string(),
        }
    }

    fn hype(&self) -> u8 {
        match self {
            LightOp::Dimmer { .. } | LightOp::Paint { .. } | LightOp::SignalSwitch { .. } => 0,
            LightOp::SlowDecay { .. } | LightOp::Alternate => 10,
            LightOp::Pulse { .. } | LightOp::Move { .. } => 20,
            LightOp::Twinkle { .. } | LightOp::Rainbow { .. } => 30,
            LightOp::Latched { .. } | LightOp::ColorCycle { .. } => 40,
            LightOp::Chase { .. } => 50,
            LightOp::Fan { .. } => 60,
            LightOp::Strobe { .. } => 90,
        }
    }

    fn has_rainbow(&self) -> bool {
        matches!(self, LightOp::Rainbow { .. })
    }
}

/// Stateless hash of `(seed, i, bucket)` to `0..1`.
fn hash01(seed: u64, i: u64, bucket: u64) -> f64 {
    // splitmix64 finalizer
    let mut z = seed ^ i.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ bucket.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}
