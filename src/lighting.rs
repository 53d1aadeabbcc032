//! The lighting interpretation tree.
//!
//! Leaves select a span of the rig, operations transform whatever their
//! children produced, and splits run independent sub-trees side by side on
//! disjoint spans. The tree owns the rig, so nothing else can write fixture
//! state while a tick is in progress.

use rand::rngs::StdRng;
use slotmap::SecondaryMap;

use crate::error::ConfigError;
use crate::frame::SignalFrame;
use crate::fx::LightOp;
use crate::generate::{recursive_generate, Fraction, Slot};
use crate::lights::{FixtureState, Rig, Span};
use crate::node::{Generate, NodeId, Tree};
use crate::state::{ColorScheme, Vibe};

#[derive(Clone, Debug)]
pub enum LightNode {
    /// Leaf over a contiguous span of the rig
    Group { span: Span },
    /// Transform of the fixtures of its children, which must be contiguous
    Op(Slot<LightOp>),
    /// Children own disjoint spans and run independently
    Split,
}

impl Generate for LightNode {
    fn generate(&mut self, rng: &mut StdRng, vibe: &Vibe) {
        if let LightNode::Op(slot) = self {
            slot.generate(rng, vibe);
        }
    }

    fn describe(&self) -> String {
        match self {
            LightNode::Group { span } => format!("Group[{}..{}]", span.start, span.end()),
            LightNode::Op(slot) => slot.describe(),
            LightNode::Split => "Split".to_string(),
        }
    }
}

/// LightTree
///
/// A lighting node tree together with the rig it drives.
#[derive(Debug)]
pub struct LightTree {
    tree: Tree<LightNode>,
    /// Fixtures covered by each node's subtree, as sorted disjoint runs
    coverage: SecondaryMap<NodeId, Vec<Span>>,
    rig: Rig,
}

impl LightTree {
    pub fn new(rig: Rig) -> Self {
        Self { tree: Tree::new(), coverage: SecondaryMap::new(), rig }
    }

    pub fn group(&mut self, span: Span) -> Result<NodeId, ConfigError> {
        if span.len == 0 {
            return Err(ConfigError::EmptyGroup(format!("{}..{}", span.start, span.end())));
        }
        if !self.rig.contains(span) {
            return Err(ConfigError::SpanOutOfRange(span.start, span.end()));
        }
        let id = self.tree.leaf(LightNode::Group { span });
        self.coverage.insert(id, vec![span]);
        Ok(id)
    }

    /// An op over `children`, whose fixtures together must form one unbroken span.
    pub fn op(&mut self, slot: Slot<LightOp>, children: Vec<NodeId>) -> Result<NodeId, ConfigError> {
        let runs = self.covering("Op", &children)?;
        if let [a, b, ..] = runs.as_slice() {
            return Err(ConfigError::UncoveredSpan(a.end(), b.start));
        }
        let id = self.tree.add(LightNode::Op(slot), children)?;
        self.coverage.insert(id, runs);
        Ok(id)
    }

    pub fn split(&mut self, children: Vec<NodeId>) -> Result<NodeId, ConfigError> {
        let runs = self.covering("Split", &children)?;
        let mut taken = vec![false; self.rig.len()];
        for child in &children {
            for i in self.coverage[*child].iter().flat_map(Span::range) {
                if std::mem::replace(&mut taken[i], true) {
                    return Err(ConfigError::OverlappingSpans(i));
                }
            }
        }
        let id = self.tree.add(LightNode::Split, children)?;
        self.coverage.insert(id, runs);
        Ok(id)
    }

    /// Group `span`, then each op in turn on top of the previous one.
    pub fn pipeline(&mut self, span: Span, ops: Vec<Slot<LightOp>>) -> Result<NodeId, ConfigError> {
        let mut id = self.group(span)?;
        for op in ops {
            id = self.op(op, vec![id])?;
        }
        Ok(id)
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<(), ConfigError> {
        self.tree.set_root(id)
    }

    /// Merged runs of fixtures covered by `children`.
    fn covering(&self, node: &'static str, children: &[NodeId]) -> Result<Vec<Span>, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::ChildCount { node, expected: "at least 1", got: 0 });
        }
        let mut spans = vec![];
        for child in children {
            spans.extend(self.coverage.get(*child).ok_or(ConfigError::ChildUnavailable)?.iter().copied());
        }
        spans.sort_by_key(|s| s.start);

        let mut runs: Vec<Span> = vec![];
        for span in spans {
            match runs.last_mut() {
                Some(last) if span.start <= last.end() => *last = last.union(&span),
                _ => runs.push(span),
            }
        }
        Ok(runs)
    }

    /// Advance every node once: the rig starts dark, children run before their parent.
    pub fn step(&mut self, frame: &SignalFrame, scheme: &ColorScheme) {
        self.rig.reset();
        if let Some(root) = self.tree.root() {
            self.step_node(root, frame, scheme);
        }
    }

    fn step_node(&mut self, id: NodeId, frame: &SignalFrame, scheme: &ColorScheme) {
        for child in self.tree.children(id) {
            self.step_node(child, frame, scheme);
        }
        let Some(span) = self.span(id) else { return };
        if let Some(LightNode::Op(slot)) = self.tree.kind_mut(id) {
            slot.current_mut().apply(self.rig.slice_mut(span), frame, scheme);
        }
    }

    /// Fixture states produced by the last `step`, in rig order.
    pub fn render(&self) -> Vec<FixtureState> {
        self.rig.snapshot()
    }

    pub fn generate(&mut self, fraction: Fraction, rng: &mut StdRng, vibe: &Vibe) -> Vec<NodeId> {
        recursive_generate(&mut self.tree, fraction, rng, vibe)
    }

    pub fn tree(&self) -> &Tree<LightNode> {
        &self.tree
    }

    pub fn rig(&self) -> &Rig {
        &self.rig
    }

    /// The fixtures under `id`, if they form one unbroken span.
    pub fn span(&self, id: NodeId) -> Option<Span> {
        match self.coverage.get(id)?.as_slice() {
            [span] => Some(*span),
            _ => None,
        }
    }

    pub fn coverage(&self, id: NodeId) -> &[Span] {
        self.coverage.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn describe(&self) -> String {
        self.tree.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::color::Color;
    use crate::frame::Signal;
    use crate::fx::ChaseDriver;
    use crate::generate::Choice;
    use crate::lights::FixtureKind;
    use crate::state::{Mode, Role};

    fn rig() -> (Rig, Span, Span) {
        let mut rig = Rig::new();
        let pars = rig.add_group(FixtureKind::Par, 4).unwrap();
        let movers = rig.add_group(FixtureKind::Mover, 2).unwrap();
        (rig, pars, movers)
    }

    #[test]
    fn construction_is_validated() {
        let (rig, pars, _) = rig();
        let mut lt = LightTree::new(rig);
        assert!(matches!(lt.group(Span::new(0, 0)), Err(ConfigError::EmptyGroup(_))));
        assert_eq!(lt.group(Span::new(4, 10)).unwrap_err(), ConfigError::SpanOutOfRange(4, 14));
        assert_eq!(
            lt.op(Slot::fixed(LightOp::Alternate), vec![]).unwrap_err(),
            ConfigError::ChildCount { node: "Op", expected: "at least 1", got: 0 }
        );

        let a = lt.group(pars).unwrap();
        let b = lt.group(Span::new(2, 2)).unwrap();
        assert_eq!(lt.split(vec![a, b]).unwrap_err(), ConfigError::OverlappingSpans(2));
    }

    #[test]
    fn children_step_before_parents() {
        let (rig, pars, movers) = rig();
        let mut lt = LightTree::new(rig);
        let left = lt
            .pipeline(pars, vec![Slot::fixed(LightOp::Paint { role: Role::Fg }), Slot::fixed(LightOp::Dimmer { level: 0.5 })])
            .unwrap();
        let right = lt.pipeline(movers, vec![Slot::fixed(LightOp::Alternate)]).unwrap();
        let split = lt.split(vec![left, right]).unwrap();
        // Overrides the paint below it
        let top = lt.op(Slot::fixed(LightOp::Paint { role: Role::Bg }), vec![split]).unwrap();
        lt.set_root(top).unwrap();
        assert_eq!(lt.span(top), Some(Span::new(0, 6)));

        let scheme = ColorScheme::named("standard-3").unwrap();
        lt.step(&SignalFrame::new(0.0), &scheme);
        let out = lt.render();
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|s| s.color == Color::RED));
        assert!(out[..4].iter().all(|s| s.dimmer == 0.5));
        assert!(out[4..].iter().all(|s| s.dimmer == 0.0));
    }

    #[test]
    fn uncovered_fixtures_stay_dark() {
        let (rig, pars, _) = rig();
        let mut lt = LightTree::new(rig);
        let root = lt.pipeline(pars, vec![Slot::fixed(LightOp::Dimmer { level: 1.0 })]).unwrap();
        lt.set_root(root).unwrap();
        lt.step(&SignalFrame::uniform(1.0, 1.0), &ColorScheme::default());
        let dimmers = lt.render().iter().map(|s| s.dimmer).collect::<Vec<_>>();
        assert_eq!(dimmers, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn ops_only_touch_their_children() {
        let mut rig = Rig::new();
        let pars = rig.add_group(FixtureKind::Par, 6).unwrap();
        let mut lt = LightTree::new(rig);
        let left = lt.group(Span::new(pars.start, 2)).unwrap();
        let right = lt.group(Span::new(pars.start + 4, 2)).unwrap();
        let split = lt.split(vec![left, right]).unwrap();
        assert_eq!(lt.coverage(split), &[Span::new(0, 2), Span::new(4, 2)]);
        assert_eq!(lt.span(split), None);
        assert_eq!(
            lt.op(Slot::fixed(LightOp::Dimmer { level: 1.0 }), vec![split]).unwrap_err(),
            ConfigError::UncoveredSpan(2, 4)
        );

        // Each half gets its own op instead
        let mut lt = LightTree::new(lt.rig().clone());
        let halves = [Span::new(0, 2), Span::new(4, 2)]
            .map(|span| lt.pipeline(span, vec![Slot::fixed(LightOp::Dimmer { level: 1.0 })]).unwrap());
        let root = lt.split(halves.to_vec()).unwrap();
        lt.set_root(root).unwrap();
        lt.step(&SignalFrame::uniform(0.0, 1.0), &ColorScheme::default());
        let dimmers = lt.render().iter().map(|s| s.dimmer).collect::<Vec<_>>();
        assert_eq!(dimmers, vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn render_is_deterministic() {
        let (rig, pars, movers) = rig();
        let mut lt = LightTree::new(rig);
        let a = lt
            .pipeline(pars, vec![Slot::fixed(LightOp::twinkle()), Slot::fixed(LightOp::rainbow())])
            .unwrap();
        let b = lt
            .pipeline(movers, vec![Slot::fixed(LightOp::fan(Signal::FreqAll)), Slot::fixed(LightOp::pulse(Signal::FreqLow))])
            .unwrap();
        let root = lt.split(vec![a, b]).unwrap();
        lt.set_root(root).unwrap();
        lt.generate(Fraction::ALL, &mut StdRng::seed_from_u64(9), &Vibe::new(Mode::Rave));

        let frame = SignalFrame::uniform(12.5, 0.7);
        let scheme = ColorScheme::default();
        lt.step(&frame, &scheme);
        let first = lt.render();
        lt.step(&frame, &scheme);
        assert_eq!(lt.render(), first);
    }

    #[test]
    fn shift_swaps_ops_in_place() {
        let (rig, pars, _) = rig();
        let mut lt = LightTree::new(rig);
        let candidates = Choice::uniform(vec![
            LightOp::chase(ChaseDriver::Period(0.5)),
            LightOp::pulse(Signal::FreqAll),
            LightOp::twinkle(),
        ])
        .unwrap();
        let root = lt.pipeline(pars, vec![Slot::new(candidates)]).unwrap();
        lt.set_root(root).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let vibe = Vibe::new(Mode::Rave);
        let before = lt.tree().depth_first();
        for _ in 0..10 {
            lt.generate(Fraction::ALL, &mut rng, &vibe);
            assert_eq!(lt.tree().depth_first(), before);
            lt.step(&SignalFrame::uniform(1.0, 0.5), &ColorScheme::default());
            assert!(lt.render()[..4].iter().all(|s| s.dimmer > 0.0), "{}", lt.describe());
        }
    }
}
