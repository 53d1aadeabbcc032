//! The tick loop's state: active trees, pending control input and published output.
//!
//! Producers (analysis, control surface) talk to the director only through a
//! [`ControlHandle`]; consumers read the last completed tick through
//! [`Outputs`]. Everything that restructures a tree happens at the start of
//! [`Director::tick`], never in the middle of a step or render.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::canvas::{FrameBuffer, RenderContext};
use crate::config::ShowConfig;
use crate::content::ContentLibrary;
use crate::error::{ConfigError, ShiftError};
use crate::frame::{ManualSignals, Signal, SignalFrame};
use crate::generate::Fraction;
use crate::interpretations::{build_layers, build_lights};
use crate::layers::LayerTree;
use crate::lighting::LightTree;
use crate::lights::FixtureState;
use crate::mailbox::Mailbox;
use crate::state::{ColorScheme, Mode, Vibe};
use crate::utils::Fade;

/// Below this sustained bass level the music is quiet enough to shift.
const QUIET: f64 = 0.3;

///////////////////////// CONTROL /////////////////////////

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Shift(#[from] ShiftError),
}

/// A parsed text command from the control surface.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Mode(Mode),
    Scheme(ColorScheme),
    Shift(Fraction),
    Signal(Signal, f64),
    /// Let go of every held signal
    Release,
}

impl FromStr for Command {
    type Err = ControlError;

    /// `mode rave`, `scheme tropical-2`, `shift 0.5`, `shift`, `signal strobe 1`, `release`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::UnknownCommand(s.trim().to_string());
        let words = s.split_whitespace().collect::<Vec<_>>();
        let command = match words.as_slice() {
            ["mode", mode] => Command::Mode(mode.parse()?),
            ["scheme", name] => Command::Scheme(ColorScheme::named(name)?),
            ["shift"] => Command::Shift(Fraction::ALL),
            ["shift", fr] => {
                let fr = fr.parse::<f64>().map_err(|_| unknown())?;
                Command::Shift(Fraction::new(fr)?)
            }
            ["signal", signal] => Command::Signal(signal.parse()?, 1.0),
            ["signal", signal, v] => Command::Signal(signal.parse()?, v.parse().map_err(|_| unknown())?),
            ["release"] => Command::Release,
            _ => return Err(unknown().into()),
        };
        Ok(command)
    }
}

/// ControlHandle
///
/// Cloneable sender side of every director input. Each input is a single
/// latest-value slot, so a slow tick never builds up a backlog.
#[derive(Clone, Debug, Default)]
pub struct ControlHandle {
    frames: Mailbox<SignalFrame>,
    modes: Mailbox<Mode>,
    schemes: Mailbox<ColorScheme>,
    shifts: Mailbox<Fraction>,
    manual: Mailbox<ManualSignals>,
    held: Arc<Mutex<ManualSignals>>,
}

impl ControlHandle {
    pub fn publish_frame(&self, frame: SignalFrame) {
        self.frames.publish(frame);
    }

    pub fn set_mode(&self, mode: Mode) {
        self.modes.publish(mode);
    }

    pub fn set_scheme(&self, scheme: ColorScheme) {
        self.schemes.publish(scheme);
    }

    /// Request regeneration of `fraction` of both trees at the next tick.
    pub fn shift(&self, fraction: f64) -> Result<(), ShiftError> {
        self.shifts.publish(Fraction::new(fraction)?);
        Ok(())
    }

    /// Hold a signal at `value` until changed, as a control surface button does.
    pub fn set_manual(&self, signal: Signal, value: f64) {
        let mut held = self.held.lock();
        held.set(signal, value);
        self.manual.publish(*held);
    }

    pub fn release_manual(&self) {
        let mut held = self.held.lock();
        *held = ManualSignals::default();
        self.manual.publish(*held);
    }

    pub fn apply(&self, command: Command) {
        match command {
            Command::Mode(mode) => self.set_mode(mode),
            Command::Scheme(scheme) => self.set_scheme(scheme),
            Command::Shift(fr) => {
                self.shifts.publish(fr);
            }
            Command::Signal(signal, v) => self.set_manual(signal, v),
            Command::Release => self.release_manual(),
        }
    }

    /// Parse and apply one line of text.
    pub fn command(&self, line: &str) -> Result<(), ControlError> {
        let command = line.parse::<Command>()?;
        log::info!("command: {command:?}");
        self.apply(command);
        Ok(())
    }
}

///////////////////////// OUTPUT /////////////////////////

#[derive(Debug, Default)]
struct Published {
    tick: u64,
    fixtures: Arc<Vec<FixtureState>>,
    frame: Option<Arc<FrameBuffer>>,
}

/// Outputs
///
/// The last completed tick. Readers get `Arc`s to finished results, so they
/// never see a tick that is still being computed.
#[derive(Clone, Debug, Default)]
pub struct Outputs {
    inner: Arc<Mutex<Published>>,
}

impl Outputs {
    fn publish(&self, tick: u64, fixtures: Vec<FixtureState>, frame: Option<Arc<FrameBuffer>>) {
        let mut inner = self.inner.lock();
        inner.tick = tick;
        inner.fixtures = Arc::new(fixtures);
        if frame.is_some() {
            inner.frame = frame;
        }
    }

    pub fn tick(&self) -> u64 {
        self.inner.lock().tick
    }

    pub fn fixtures(&self) -> Arc<Vec<FixtureState>> {
        Arc::clone(&self.inner.lock().fixtures)
    }

    pub fn frame(&self) -> Option<Arc<FrameBuffer>> {
        self.inner.lock().frame.clone()
    }
}

///////////////////////// DIRECTOR /////////////////////////

/// What happened during one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub mode: Mode,
    /// Both trees were replaced by a mode change
    pub rebuilt: bool,
    /// Nodes regenerated by a shift, across both trees
    pub regenerated: usize,
    /// The visual tree rendered this tick
    pub visual_ok: bool,
}

pub struct Director<R: RenderContext> {
    config: ShowConfig,
    library: ContentLibrary,
    renderer: R,
    rng: StdRng,

    mode: Mode,
    lights: LightTree,
    layers: LayerTree,
    scheme: Fade<ColorScheme>,

    handle: ControlHandle,
    outputs: Outputs,

    frame: SignalFrame,
    manual: ManualSignals,
    last_shift: f64,
    queued_shift: Option<Fraction>,
    ticks: u64,
}

impl<R: RenderContext> Director<R> {
    /// Validate the config and build trees for every mode up front, so a
    /// mode change can never fail mid-show.
    pub fn new(config: ShowConfig, library: ContentLibrary, renderer: R) -> Result<Self, ConfigError> {
        config.validate()?;
        for mode in Mode::ALL {
            build_lights(mode, &config.rig)?;
            build_layers(mode, &library)?;
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mode = config.mode;
        let mut lights = build_lights(mode, &config.rig)?;
        let mut layers = build_layers(mode, &library)?;
        let vibe = Vibe::new(mode).with_rainbows(config.allow_rainbows);
        lights.generate(Fraction::ALL, &mut rng, &vibe);
        layers.generate(Fraction::ALL, &mut rng, &vibe);
        debug_assert!(lights.tree().is_configured() && layers.tree().is_configured());
        log::info!("starting in {mode} with {} fixtures", lights.rig().len());
        log::debug!("lights:\n{}", lights.describe());
        log::debug!("layers:\n{}", layers.describe());

        Ok(Self {
            scheme: Fade::new(config.scheme, config.scheme_fade_secs),
            config,
            library,
            renderer,
            rng,
            mode,
            lights,
            layers,
            handle: ControlHandle::default(),
            outputs: Outputs::default(),
            frame: SignalFrame::new(0.0),
            manual: ManualSignals::default(),
            last_shift: 0.0,
            queued_shift: None,
            ticks: 0,
        })
    }

    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn outputs(&self) -> Outputs {
        self.outputs.clone()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn lights(&self) -> &LightTree {
        &self.lights
    }

    pub fn layers(&self) -> &LayerTree {
        &self.layers
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The scheme at its fade destination.
    pub fn scheme(&self) -> ColorScheme {
        *self.scheme.destination()
    }

    /// Run one tick at show time `t` seconds.
    pub fn tick(&mut self, t: f64) -> TickReport {
        let (rebuilt, regenerated) = self.apply_pending(t);

        if let Some(frame) = self.handle.frames.take() {
            self.frame = frame;
        }
        if let Some(manual) = self.handle.manual.take() {
            self.manual = manual;
        }
        let frame = self.show_frame(t);

        if t - self.last_shift > self.config.shift_after_secs && frame.get(Signal::SustainedLow) < QUIET {
            log::debug!("quiet for a while, shifting");
            self.queued_shift = Some(Fraction::new(self.config.auto_shift_fraction).unwrap_or(Fraction::NONE));
            self.last_shift = t;
        }

        let scheme = self.scheme.render(t);
        self.scheme.settle(t);

        self.lights.step(&frame, &scheme);
        let fixtures = self.lights.render();

        self.layers.step(&frame, &scheme);
        let visual = match self.layers.render(&frame, &scheme, &mut self.renderer) {
            Ok(buffer) => {
                let published = Arc::new(buffer.clone());
                self.renderer.release(buffer);
                Some(published)
            }
            Err(e) => {
                log::warn!("visual tick skipped: {e}");
                None
            }
        };

        self.ticks += 1;
        let visual_ok = visual.is_some();
        self.outputs.publish(self.ticks, fixtures, visual);
        TickReport { tick: self.ticks, mode: self.mode, rebuilt, regenerated, visual_ok }
    }

    /// The latest frame at `t`, scaled by warmup. Manual signals are held
    /// at full strength.
    fn show_frame(&self, t: f64) -> SignalFrame {
        let warmup = match self.config.warmup_secs {
            w if w <= 0.0 => 1.0,
            w => (t / w).min(1.0),
        };
        self.frame.at(t).scaled(warmup).merged(&self.manual)
    }

    /// Apply a pending mode change or shift, then any pending scheme.
    fn apply_pending(&mut self, t: f64) -> (bool, usize) {
        let mut rebuilt = false;
        let mut regenerated = 0;

        let requested = self.handle.shifts.take();
        if let Some(mode) = self.handle.modes.take() {
            rebuilt = self.rebuild(mode);
            self.queued_shift = None;
            self.last_shift = t;
        } else if let Some(fraction) = requested.or_else(|| self.queued_shift.take()) {
            regenerated = self.shift(fraction);
            if fraction.is_total() {
                let next = self.scheme.destination().next_preset(&mut self.rng);
                self.scheme.push(next, t);
            }
            self.last_shift = t;
        }

        if let Some(scheme) = self.handle.schemes.take() {
            self.scheme.push(scheme, t);
        }
        (rebuilt, regenerated)
    }

    fn rebuild(&mut self, mode: Mode) -> bool {
        let built = build_lights(mode, &self.config.rig).and_then(|l| Ok((l, build_layers(mode, &self.library)?)));
        match built {
            Ok((mut lights, mut layers)) => {
                let vibe = self.vibe(mode);
                lights.generate(Fraction::ALL, &mut self.rng, &vibe);
                layers.generate(Fraction::ALL, &mut self.rng, &vibe);
                debug_assert!(lights.tree().is_configured() && layers.tree().is_configured());
                log::info!("mode {} -> {mode}", self.mode);
                log::debug!("lights:\n{}", lights.describe());
                self.lights = lights;
                self.layers = layers;
                self.mode = mode;
                true
            }
            Err(e) => {
                log::error!("could not build {mode}: {e}");
                false
            }
        }
    }

    fn vibe(&self, mode: Mode) -> Vibe {
        Vibe::new(mode).with_rainbows(self.config.allow_rainbows)
    }

    fn shift(&mut self, fraction: Fraction) -> usize {
        let vibe = self.vibe(self.mode);
        let n = self.lights.generate(fraction, &mut self.rng, &vibe).len()
            + self.layers.generate(fraction, &mut self.rng, &vibe).len();
        log::info!("shift {:.2}: regenerated {n} nodes", fraction.get());
        log::debug!("lights:\n{}", self.lights.describe());
        n
    }
}
