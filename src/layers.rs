//! The visual interpretation tree.
//!
//! Layer nodes render into frame buffers borrowed from the renderer. A compose
//! node draws its children in order, each blended onto the ones before it.

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::canvas::{Blend, FrameBuffer, RenderContext, Rgba};
use crate::color::Color;
use crate::content::ContentCycle;
use crate::error::{ConfigError, RenderError};
use crate::frame::{Signal, SignalFrame};
use crate::generate::{recursive_generate, Fraction, Slot};
use crate::node::{Generate, NodeId, Tree};
use crate::num::Float;
use crate::state::{ColorScheme, Role, Vibe};

///////////////////////// OPERATIONS /////////////////////////

#[derive(Clone, Debug, PartialEq)]
pub enum LayerOp {
    /// Brightness follows a signal, never below `floor`
    BrightnessPulse { signal: Signal, floor: f64 },
    /// Pull colors towards a scheme color
    Tint { role: Role, amount: f64 },
    Opacity { level: f64 },
    /// White flash while the signal is above `threshold`
    Flash { signal: Signal, threshold: f64 },
}

impl LayerOp {
    pub fn apply(&self, buffer: &mut FrameBuffer, frame: &SignalFrame, scheme: &ColorScheme) {
        match *self {
            LayerOp::BrightnessPulse { signal, floor } => {
                let fr = frame.get(signal).lerp(floor..1.0) as f32;
                buffer.map(|px| px.brightness(fr));
            }
            LayerOp::Tint { role, amount } => {
                let tint = Color::WHITE.lerp(scheme.get(role), amount);
                let (r, g, b) = (tint.r as f32, tint.g as f32, tint.b as f32);
                buffer.map(|px| Rgba { r: px.r * r, g: px.g * g, b: px.b * b, a: px.a });
            }
            LayerOp::Opacity { level } => {
                let level = level as f32;
                buffer.map(|px| px.fade(level));
            }
            LayerOp::Flash { signal, threshold } => {
                let v = frame.get(signal);
                if v > threshold {
                    let flash = Rgba::new(Color::WHITE, (v - threshold) / (1.0 - threshold));
                    buffer.map(|px| flash.over(px));
                }
            }
        }
    }
}

impl Generate for LayerOp {
    fn generate(&mut self, rng: &mut StdRng, vibe: &Vibe) {
        let reactive = [Signal::FreqAll, Signal::FreqLow, Signal::Pulse];
        match self {
            LayerOp::BrightnessPulse { signal, floor } => {
                *signal = *reactive.choose(rng).unwrap_or(&Signal::FreqAll);
                *floor = rng.gen_range(0.2..0.6) * (1.0 - 0.5 * vibe.energy());
            }
            LayerOp::Tint { role, amount } => {
                *role = *Role::ALL.choose(rng).unwrap_or(&Role::Fg);
                *amount = rng.gen_range(0.2..0.8);
            }
            LayerOp::Opacity { level } => *level = rng.gen_range(0.4..1.0),
            LayerOp::Flash { signal, threshold } => {
                *signal = *[Signal::Strobe, Signal::BigBlinder, Signal::FreqHigh].choose(rng).unwrap_or(&Signal::Strobe);
                *threshold = rng.gen_range(0.6..0.9);
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            LayerOp::BrightnessPulse { signal, floor } => format!("BrightnessPulse({signal}, floor {floor:.2})"),
            LayerOp::Tint { role, amount } => format!("Tint({role:?}, {amount:.2})"),
            LayerOp::Opacity { level } => format!("Opacity({level:.2})"),
            LayerOp::Flash { signal, threshold } => format!("Flash({signal} > {threshold:.2})"),
        }
    }
}

///////////////////////// NODES /////////////////////////

#[derive(Clone, Debug)]
pub enum LayerNode {
    Black,
    Solid { role: Role, alpha: f64 },
    Content(ContentCycle),
    /// Children drawn in order, each blended onto the previous with the
    /// blend at its position
    Compose(Vec<Blend>),
    /// Transform of its single child
    Op(Slot<LayerOp>),
}

impl Generate for LayerNode {
    fn generate(&mut self, rng: &mut StdRng, vibe: &Vibe) {
        match self {
            LayerNode::Solid { role, .. } => *role = *Role::ALL.choose(rng).unwrap_or(&Role::Bg),
            LayerNode::Content(cycle) => cycle.generate(rng, vibe),
            LayerNode::Op(slot) => slot.generate(rng, vibe),
            LayerNode::Black | LayerNode::Compose(_) => {}
        }
    }

    fn describe(&self) -> String {
        match self {
            LayerNode::Black => "Black".to_string(),
            LayerNode::Solid { role, alpha } => format!("Solid({role:?}, {alpha:.2})"),
            LayerNode::Content(cycle) => cycle.describe(),
            LayerNode::Compose(blends) if blends.iter().all(|b| *b == Blend::NORMAL) => "Compose".to_string(),
            LayerNode::Compose(blends) => {
                let blends = blends.iter().map(|b| format!("{:?} {:.2}", b.mode, b.opacity)).join(", ");
                format!("Compose({blends})")
            }
            LayerNode::Op(slot) => slot.describe(),
        }
    }
}

/// LayerTree
///
/// A visual node tree. Rendering borrows targets from the [`RenderContext`]
/// and returns every one except the result, even when a child fails.
#[derive(Debug, Default)]
pub struct LayerTree {
    tree: Tree<LayerNode>,
}

impl LayerTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn black(&mut self) -> NodeId {
        self.tree.leaf(LayerNode::Black)
    }

    pub fn solid(&mut self, role: Role, alpha: f64) -> NodeId {
        self.tree.leaf(LayerNode::Solid { role, alpha: alpha.clamp01() })
    }

    pub fn content(&mut self, cycle: ContentCycle) -> NodeId {
        self.tree.leaf(LayerNode::Content(cycle))
    }

    /// Children drawn in order with normal blending.
    pub fn compose(&mut self, children: Vec<NodeId>) -> Result<NodeId, ConfigError> {
        self.compose_with(children.into_iter().map(|id| (id, Blend::NORMAL)).collect())
    }

    pub fn compose_with(&mut self, children: Vec<(NodeId, Blend)>) -> Result<NodeId, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::ChildCount { node: "Compose", expected: "at least 1", got: 0 });
        }
        let (ids, blends): (Vec<_>, Vec<_>) = children.into_iter().unzip();
        self.tree.add(LayerNode::Compose(blends), ids)
    }

    pub fn op(&mut self, slot: Slot<LayerOp>, child: NodeId) -> Result<NodeId, ConfigError> {
        self.tree.add(LayerNode::Op(slot), vec![child])
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<(), ConfigError> {
        self.tree.set_root(id)
    }

    pub fn step(&mut self, frame: &SignalFrame, scheme: &ColorScheme) {
        if let Some(root) = self.tree.root() {
            self.step_node(root, frame, scheme);
        }
    }

    fn step_node(&mut self, id: NodeId, frame: &SignalFrame, scheme: &ColorScheme) {
        for child in self.tree.children(id) {
            self.step_node(child, frame, scheme);
        }
        if let Some(LayerNode::Content(cycle)) = self.tree.kind_mut(id) {
            cycle.step(frame);
        }
    }

    /// Composite the whole tree. An empty tree renders black.
    pub fn render(
        &self,
        frame: &SignalFrame,
        scheme: &ColorScheme,
        ctx: &mut dyn RenderContext,
    ) -> Result<FrameBuffer, RenderError> {
        match self.tree.root() {
            Some(root) => self.render_node(root, frame, scheme, ctx),
            None => {
                let mut buffer = ctx.acquire()?;
                buffer.fill(Rgba::BLACK);
                Ok(buffer)
            }
        }
    }

    fn render_node(
        &self,
        id: NodeId,
        frame: &SignalFrame,
        scheme: &ColorScheme,
        ctx: &mut dyn RenderContext,
    ) -> Result<FrameBuffer, RenderError> {
        let Some(node) = self.tree.get(id) else {
            return ctx.acquire();
        };
        match &node.kind {
            LayerNode::Black => {
                let mut buffer = ctx.acquire()?;
                buffer.fill(Rgba::BLACK);
                Ok(buffer)
            }
            LayerNode::Solid { role, alpha } => {
                let mut buffer = ctx.acquire()?;
                buffer.fill(Rgba::new(scheme.get(*role), *alpha));
                Ok(buffer)
            }
            LayerNode::Content(cycle) => {
                let mut buffer = ctx.acquire()?;
                match ctx.draw_content(cycle.current(), cycle.offset(frame.t), &mut buffer) {
                    Ok(()) => Ok(buffer),
                    Err(e) => {
                        ctx.release(buffer);
                        Err(e)
                    }
                }
            }
            LayerNode::Compose(blends) => {
                let mut target = ctx.acquire()?;
                for (i, &child) in node.children().iter().enumerate() {
                    let blend = blends.get(i).copied().unwrap_or_default();
                    let drawn = self.render_node(child, frame, scheme, ctx).and_then(|layer| {
                        let result = target.blend(&layer, blend);
                        ctx.release(layer);
                        result
                    });
                    if let Err(e) = drawn {
                        ctx.release(target);
                        return Err(e);
                    }
                }
                Ok(target)
            }
            LayerNode::Op(slot) => {
                let child = node.children().first().copied();
                let mut buffer = match child {
                    Some(child) => self.render_node(child, frame, scheme, ctx)?,
                    None => ctx.acquire()?,
                };
                slot.current().apply(&mut buffer, frame, scheme);
                Ok(buffer)
            }
        }
    }

    pub fn generate(&mut self, fraction: Fraction, rng: &mut StdRng, vibe: &Vibe) -> Vec<NodeId> {
        recursive_generate(&mut self.tree, fraction, rng, vibe)
    }

    pub fn tree(&self) -> &Tree<LayerNode> {
        &self.tree
    }

    pub fn describe(&self) -> String {
        self.tree.describe()
    }
}
