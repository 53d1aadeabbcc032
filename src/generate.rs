//! The "shift": randomized regeneration of a live tree.
//!
//! [`recursive_generate`] walks a tree depth-first and flips an independent
//! biased coin at every node. Nodes that come up heads reselect their
//! configuration; every node's children are visited either way. A fraction of
//! `0` therefore leaves the tree untouched and `1` reshuffles all of it.

use itertools::Itertools;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{ConfigError, ShiftError};
use crate::node::{Generate, NodeId, Tree};
use crate::state::Vibe;

/// Share of nodes to regenerate, validated to `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Fraction(f64);

impl Fraction {
    pub const NONE: Self = Self(0.0);
    pub const ALL: Self = Self(1.0);

    pub fn new(fr: f64) -> Result<Self, ShiftError> {
        if (0.0..=1.0).contains(&fr) {
            Ok(Self(fr))
        } else {
            Err(ShiftError::InvalidFraction(fr))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn is_total(self) -> bool {
        self.0 >= 1.0
    }
}

impl TryFrom<f64> for Fraction {
    type Error = ShiftError;
    fn try_from(fr: f64) -> Result<Self, Self::Error> {
        Self::new(fr)
    }
}

/// Regenerate roughly `fraction` of the nodes of `tree`, returning the ids that
/// were regenerated in visit order. The same seed, fraction and tree shape always
/// select the same nodes.
pub fn recursive_generate<N: Generate>(
    tree: &mut Tree<N>,
    fraction: Fraction,
    rng: &mut StdRng,
    vibe: &Vibe,
) -> Vec<NodeId> {
    let mut regenerated = vec![];
    for id in tree.depth_first() {
        if rng.gen_bool(fraction.get()) {
            tree.generate_node(id, rng, vibe);
            regenerated.push(id);
        }
    }
    regenerated
}

///////////////////////// CANDIDATES /////////////////////////

/// Choice
///
/// The set of values that may occupy one tree position, with an explicit
/// weight each (all equal for a uniform choice). Validated when the tree is
/// built.
#[derive(Clone, Debug)]
pub struct Choice<T> {
    options: Vec<T>,
    weights: Vec<f64>,
}

impl<T> Choice<T> {
    pub fn uniform(options: Vec<T>) -> Result<Self, ConfigError> {
        if options.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        let weights = vec![1.0; options.len()];
        Ok(Self { options, weights })
    }

    pub fn weighted(table: Vec<(f64, T)>) -> Result<Self, ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        if let Some((w, _)) = table.iter().find(|(w, _)| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::MalformedWeights(format!("weight {w} is not a finite non-negative number")));
        }
        let (weights, options): (Vec<f64>, Vec<T>) = table.into_iter().unzip();
        if let Err(e) = WeightedIndex::<f64>::new(&weights) {
            return Err(ConfigError::MalformedWeights(format!("[{}]: {e}", weights.iter().join(", "))));
        }
        Ok(Self { options, weights })
    }

    /// A single fixed option.
    pub fn only(option: T) -> Self {
        Self { options: vec![option], weights: vec![1.0] }
    }

    /// Pick by the configured weights alone.
    pub fn pick(&self, rng: &mut StdRng) -> &T {
        if self.options.len() == 1 {
            return &self.options[0];
        }
        let i = match WeightedIndex::<f64>::new(&self.weights) {
            Ok(index) => index.sample(rng),
            Err(_) => rng.gen_range(0..self.options.len()),
        };
        &self.options[i]
    }

    pub fn options(&self) -> &[T] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Weight of a candidate by how close its hype is to the vibe's.
fn hype_weight(hype: u8, vibe: &Vibe) -> f64 {
    let distance = (f64::from(hype) - f64::from(vibe.hype)).abs().min(100.0);
    (101.0 - distance).powf(1.6)
}

impl<T: Generate> Choice<T> {
    /// Pick among the candidates acceptable under `vibe`, favoring those whose
    /// hype is nearest to it on top of the configured weights. When nothing is
    /// acceptable the configured weights decide alone.
    pub fn pick_for(&self, rng: &mut StdRng, vibe: &Vibe) -> &T {
        if self.options.len() == 1 {
            return &self.options[0];
        }
        let weights = self.options.iter().zip(&self.weights).map(|(option, w)| {
            if option.acceptable(vibe) {
                w * hype_weight(option.hype(), vibe)
            } else {
                0.0
            }
        });
        match WeightedIndex::<f64>::new(weights) {
            Ok(index) => &self.options[index.sample(rng)],
            Err(_) => self.pick(rng),
        }
    }
}

/// Slot
///
/// A tree position whose concrete operation can be swapped by a shift. The
/// current operation is a fresh copy of the chosen template, then regenerated
/// for its own random parameters.
#[derive(Clone, Debug)]
pub struct Slot<T> {
    choice: Choice<T>,
    current: T,
}

impl<T: Clone + Generate> Slot<T> {
    pub fn new(choice: Choice<T>) -> Self {
        let current = choice.options[0].clone();
        Self { choice, current }
    }

    pub fn fixed(op: T) -> Self {
        Self::new(Choice::only(op))
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }
}

impl<T: Clone + Generate> Generate for Slot<T> {
    fn generate(&mut self, rng: &mut StdRng, vibe: &Vibe) {
        self.current = self.choice.pick_for(rng, vibe).clone();
        self.current.generate(rng, vibe);
    }

    fn describe(&self) -> String {
        match self.choice.len() {
            1 => self.current.describe(),
            n => format!("{} (1 of {n})", self.current.describe()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    use crate::state::Mode;

    #[derive(Clone, Debug, PartialEq)]
    struct Param(u32);

    impl Generate for Param {
        fn generate(&mut self, rng: &mut StdRng, _: &Vibe) {
            self.0 = rng.gen_range(0..1000);
        }
        fn describe(&self) -> String {
            format!("Param({})", self.0)
        }
    }

    /// Binary tree of `n` nodes, root at index 0.
    fn tree_of(n: usize) -> (Tree<Param>, Vec<NodeId>) {
        let mut tree = Tree::new();
        let mut ids: Vec<Option<NodeId>> = vec![None; n];
        for i in (0..n).rev() {
            let children = [2 * i + 1, 2 * i + 2].into_iter().filter(|&c| c < n).filter_map(|c| ids[c]).collect();
            ids[i] = Some(tree.add(Param(0), children).unwrap());
        }
        let ids = ids.into_iter().flatten().collect::<Vec<_>>();
        tree.set_root(ids[0]).unwrap();
        (tree, ids)
    }

    fn snapshot(tree: &Tree<Param>) -> Vec<(u32, u32)> {
        tree.depth_first().into_iter().map(|id| (tree.kind(id).unwrap().0, tree.revision(id))).collect()
    }

    #[test]
    fn fraction_bounds() {
        assert!(Fraction::new(0.0).is_ok());
        assert!(Fraction::new(1.0).is_ok());
        assert_eq!(Fraction::new(1.5), Err(ShiftError::InvalidFraction(1.5)));
        assert!(Fraction::new(-0.1).is_err());
        assert!(Fraction::new(f64::NAN).is_err());
    }

    #[test]
    fn zero_and_total() {
        let vibe = Vibe::new(Mode::Rave);
        let (mut tree, ids) = tree_of(10);
        let mut rng = StdRng::seed_from_u64(7);
        recursive_generate(&mut tree, Fraction::ALL, &mut rng, &vibe);
        let before = snapshot(&tree);
        assert!(before.iter().all(|&(_, rev)| rev == 1));

        assert!(recursive_generate(&mut tree, Fraction::NONE, &mut rng, &vibe).is_empty());
        assert_eq!(snapshot(&tree), before);

        let all = recursive_generate(&mut tree, Fraction::ALL, &mut rng, &vibe);
        assert_eq!(all.len(), ids.len());
        assert!(snapshot(&tree).iter().all(|&(_, rev)| rev == 2));
    }

    #[test]
    fn partial_shift_is_reproducible() {
        let vibe = Vibe::new(Mode::Gentle);
        let run = || {
            let (mut tree, ids) = tree_of(10);
            let mut rng = StdRng::seed_from_u64(42);
            let picked = recursive_generate(&mut tree, Fraction::new(0.5).unwrap(), &mut rng, &vibe);
            for id in &ids {
                assert_eq!(tree.revision(*id), u32::from(picked.contains(id)));
            }
            picked.iter().map(|id| ids.iter().position(|x| x == id).unwrap()).collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
    }

    #[test]
    fn weights_validated() {
        assert_eq!(Choice::<u8>::uniform(vec![]).unwrap_err(), ConfigError::NoCandidates);
        assert!(matches!(Choice::weighted(vec![(-1.0, 1u8)]), Err(ConfigError::MalformedWeights(_))));
        assert!(matches!(Choice::weighted(vec![(0.0, 1u8), (0.0, 2)]), Err(ConfigError::MalformedWeights(_))));
        assert!(matches!(Choice::weighted(vec![(f64::NAN, 1u8)]), Err(ConfigError::MalformedWeights(_))));
    }

    #[test]
    fn weighted_pick_respects_zero_weight() {
        let choice = Choice::weighted(vec![(0.0, 'a'), (1.0, 'b'), (3.0, 'c')]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let picks = (0..400).map(|_| *choice.pick(&mut rng)).collect::<Vec<_>>();
        assert!(!picks.contains(&'a'));
        let c = picks.iter().filter(|&&p| p == 'c').count();
        assert!(c > 240, "c picked {c} times");
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Hyped(u8, bool);

    impl Generate for Hyped {
        fn generate(&mut self, _: &mut StdRng, _: &Vibe) {}
        fn describe(&self) -> String {
            format!("Hyped({})", self.0)
        }
        fn hype(&self) -> u8 {
            self.0
        }
        fn has_rainbow(&self) -> bool {
            self.1
        }
    }

    #[test]
    fn hype_steers_candidates() {
        let choice = Choice::uniform(vec![Hyped(90, false), Hyped(10, false), Hyped(50, false)]).unwrap();
        let vibe = Vibe::new(Mode::Gentle);
        let mut rng = StdRng::seed_from_u64(5);
        let picks = (0..1000).map(|_| choice.pick_for(&mut rng, &vibe).0).collect::<Vec<_>>();
        assert!(!picks.contains(&90));
        let near = picks.iter().filter(|&&h| h == 50).count();
        let far = picks.iter().filter(|&&h| h == 10).count();
        assert!(near > far, "{near} vs {far}");
    }

    #[test]
    fn rainbows_can_be_ruled_out() {
        let choice = Choice::uniform(vec![Hyped(0, true), Hyped(0, false)]).unwrap();
        let vibe = Vibe::new(Mode::Rave).with_rainbows(false);
        let mut rng = StdRng::seed_from_u64(8);
        assert!((0..200).all(|_| !choice.pick_for(&mut rng, &vibe).1));
    }

    #[test]
    fn nothing_acceptable_falls_back_to_weights() {
        let choice = Choice::weighted(vec![(1.0, Hyped(100, false)), (0.0, Hyped(95, false))]).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(choice.pick_for(&mut rng, &Vibe::new(Mode::Chill)), &Hyped(100, false));
    }

    #[test]
    fn slot_swaps_operation() {
        let mut slot = Slot::new(Choice::uniform(vec![Param(1), Param(2)]).unwrap());
        assert_eq!(slot.current(), &Param(1));
        let mut rng = StdRng::seed_from_u64(11);
        slot.generate(&mut rng, &Vibe::new(Mode::Rave));
        assert!(slot.describe().ends_with("(1 of 2)"));
    }

    proptest! {
        #[test]
        fn regenerated_share_tracks_fraction(seed in any::<u64>(), fr in 0.0f64..=1.0) {
            let vibe = Vibe::new(Mode::Rave);
            let (mut tree, _) = tree_of(64);
            let mut rng = StdRng::seed_from_u64(seed);
            let n = recursive_generate(&mut tree, Fraction::new(fr).unwrap(), &mut rng, &vibe).len();
            // Loose binomial bound: 64 draws, ±5 sigma max is 20.
            let expected = fr * 64.0;
            prop_assert!((n as f64 - expected).abs() <= 20.0, "{n} vs {expected}");
        }
    }
}
