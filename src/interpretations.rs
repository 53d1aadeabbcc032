//! Which trees each mode builds.
//!
//! Every fixture group gets one pipeline: a color op, a dimmer op and any
//! movement, capped by a signal switch so the blinder and strobe buttons
//! always work. Positions with more than one candidate are picked by shifts.

use crate::canvas::{Blend, BlendMode};
use crate::config::RigConfig;
use crate::content::{ContentCycle, ContentLibrary};
use crate::error::ConfigError;
use crate::frame::Signal;
use crate::fx::{ChaseDriver, LightOp, MovePattern};
use crate::generate::{Choice, Slot};
use crate::layers::{LayerOp, LayerTree};
use crate::lighting::LightTree;
use crate::lights::{FixtureKind, Span};
use crate::state::{Mode, Role};

fn one(op: LightOp) -> Slot<LightOp> {
    Slot::fixed(op)
}

fn any(ops: Vec<LightOp>) -> Result<Slot<LightOp>, ConfigError> {
    Ok(Slot::new(Choice::uniform(ops)?))
}

fn weighted(ops: Vec<(f64, LightOp)>) -> Result<Slot<LightOp>, ConfigError> {
    Ok(Slot::new(Choice::weighted(ops)?))
}

/// Dimmer candidates that stay lit whenever the music is playing.
fn rave_dimmers() -> Vec<LightOp> {
    vec![
        LightOp::chase(ChaseDriver::Signal(Signal::Pulse)),
        LightOp::chase(ChaseDriver::Period(0.25)),
        LightOp::pulse(Signal::FreqAll),
        LightOp::slow_decay(Signal::FreqLow),
        LightOp::twinkle(),
    ]
}

fn gentle_dimmers() -> Vec<LightOp> {
    vec![LightOp::pulse(Signal::FreqAll), LightOp::twinkle()]
}

/// Ops for one fixture group, bottom to top.
fn pipeline(mode: Mode, kind: FixtureKind) -> Result<Vec<Slot<LightOp>>, ConfigError> {
    use FixtureKind::*;
    use LightOp::{Alternate, Paint};

    let switch = || one(LightOp::signal_switch());
    let ops = match (mode, kind) {
        (Mode::Blackout, _) => vec![],

        (Mode::Chill, Par) => vec![
            any(vec![Paint { role: Role::Bg }, Alternate])?,
            any(vec![LightOp::Dimmer { level: 0.6 }, LightOp::slow_decay(Signal::SustainedLow)])?,
        ],
        (Mode::Chill, Mover) => vec![
            one(Paint { role: Role::Bg }),
            one(LightOp::Dimmer { level: 0.5 }),
            one(LightOp::movement(MovePattern::Nod)),
        ],
        (Mode::Chill, Strobe | Laser) => vec![],

        (Mode::Gentle, Par) => vec![one(Paint { role: Role::Bg }), any(gentle_dimmers())?, switch()],
        (Mode::Gentle, Mover) => vec![
            one(Paint { role: Role::Bg }),
            any(gentle_dimmers())?,
            one(LightOp::movement(MovePattern::Circles)),
            switch(),
        ],
        (Mode::Gentle, Strobe | Laser) => vec![switch()],

        (Mode::Rave, Par) => vec![
            any(vec![Alternate, Paint { role: Role::Bg }, LightOp::rainbow(), LightOp::color_cycle(Signal::Pulse)])?,
            any(rave_dimmers())?,
            switch(),
        ],
        (Mode::Rave, Mover) => vec![
            weighted(vec![(95.0, Paint { role: Role::Fg }), (5.0, LightOp::rainbow())])?,
            any(rave_dimmers())?,
            any(vec![LightOp::movement(MovePattern::Circles), LightOp::movement(MovePattern::Nod), LightOp::fan(Signal::FreqAll)])?,
            switch(),
        ],
        (Mode::Rave, Strobe) => vec![
            one(Paint { role: Role::Fg }),
            one(LightOp::pulse(Signal::FreqHigh)),
            one(LightOp::strobe(Signal::FreqHigh)),
            switch(),
        ],
        (Mode::Rave, Laser) => vec![
            one(Paint { role: Role::Fg }),
            any(vec![LightOp::pulse(Signal::FreqLow), LightOp::chase(ChaseDriver::Signal(Signal::Pulse))])?,
            switch(),
        ],
    };
    Ok(ops)
}

/// Build the lighting tree for `mode`: one pipeline per fixture group, side by side.
pub fn build_lights(mode: Mode, rig: &RigConfig) -> Result<LightTree, ConfigError> {
    let rig = rig.build()?;
    let groups: Vec<(FixtureKind, Span)> = rig.groups().iter().map(|g| (g.kind, g.span)).collect();
    let mut tree = LightTree::new(rig);

    let mut branches = vec![];
    for (kind, span) in groups {
        branches.push(tree.pipeline(span, pipeline(mode, kind)?)?);
    }
    if !branches.is_empty() {
        let root = tree.split(branches)?;
        tree.set_root(root)?;
    }
    Ok(tree)
}

/// Build the visual tree for `mode` from clips in `library`.
pub fn build_layers(mode: Mode, library: &ContentLibrary) -> Result<LayerTree, ConfigError> {
    let mut tree = LayerTree::new();
    let root = match mode {
        Mode::Blackout => tree.black(),
        Mode::Chill => {
            let clip = tree.content(ContentCycle::new(library, "calm", None)?);
            let look = Slot::new(Choice::uniform(vec![
                LayerOp::Tint { role: Role::Bg, amount: 0.5 },
                LayerOp::Opacity { level: 0.7 },
            ])?);
            let clip = tree.op(look, clip)?;
            let wash = tree.solid(Role::Bg, 0.2);
            tree.compose(vec![clip, wash])?
        }
        Mode::Gentle => {
            let clip = tree.content(ContentCycle::new(library, "bg", None)?);
            let pulse = Slot::fixed(LayerOp::BrightnessPulse { signal: Signal::FreqAll, floor: 0.4 });
            let clip = tree.op(pulse, clip)?;
            let wash = tree.solid(Role::BgContrast, 0.15);
            tree.compose(vec![clip, wash])?
        }
        Mode::Rave => {
            let base = tree.black();
            let clip = tree.content(ContentCycle::new(library, "hype", Some(Signal::Pulse))?);
            let look = Slot::new(Choice::uniform(vec![
                LayerOp::BrightnessPulse { signal: Signal::FreqLow, floor: 0.2 },
                LayerOp::Tint { role: Role::Fg, amount: 0.4 },
            ])?);
            let clip = tree.op(look, clip)?;
            let flash = tree.solid(Role::Fg, 0.0);
            let flash = tree.op(Slot::fixed(LayerOp::Flash { signal: Signal::Strobe, threshold: 0.7 }), flash)?;
            tree.compose_with(vec![
                (base, Blend::NORMAL),
                (clip, Blend::NORMAL),
                (flash, Blend::new(BlendMode::Add, 1.0)),
            ])?
        }
    };
    tree.set_root(root)?;
    Ok(tree)
}
