//! Arena-backed interpretation trees.
//!
//! A [`Tree`] owns every node of one output domain in a slot map and records
//! child order per node. Each node has at most one parent, which [`Tree::add`]
//! enforces, so the structure is a strict tree by construction and traversal
//! only ever runs parent to child.

use rand::rngs::StdRng;
use slotmap::SlotMap;

use crate::error::ConfigError;
use crate::state::Vibe;

slotmap::new_key_type! {
    /// Identity of a node within its tree. Stable for the lifetime of the tree.
    pub struct NodeId;
}

/// Node-local randomized configuration.
pub trait Generate {
    /// Reselect this node's random parameters. Must not touch children.
    fn generate(&mut self, rng: &mut StdRng, vibe: &Vibe);

    /// One-line label for tree dumps.
    fn describe(&self) -> String;

    /// How intense this is as a candidate, `0..=100`.
    fn hype(&self) -> u8 {
        0
    }

    fn has_rainbow(&self) -> bool {
        false
    }

    /// Whether a shift under `vibe` may pick this.
    fn acceptable(&self, vibe: &Vibe) -> bool {
        self.hype() <= vibe.hype && (vibe.allow_rainbows || !self.has_rainbow())
    }
}

/// Lifecycle of a node within one generation of the show.
///
/// Nodes start `Unconfigured` and become `Active` on their first `generate`.
/// A superseded node is simply dropped with its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Unconfigured,
    Active,
}

#[derive(Debug)]
pub struct Node<N> {
    pub kind: N,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    /// Incremented every time the node is regenerated
    revision: u32,
}

impl<N> Node<N> {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.revision {
            0 => Lifecycle::Unconfigured,
            _ => Lifecycle::Active,
        }
    }
}

#[derive(Debug)]
pub struct Tree<N> {
    nodes: SlotMap<NodeId, Node<N>>,
    root: Option<NodeId>,
}

impl<N> Default for Tree<N> {
    fn default() -> Self {
        Self { nodes: SlotMap::with_key(), root: None }
    }
}

impl<N> Tree<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node owning `children`, in order. Each child must already be in this
    /// tree and must not have a parent yet.
    pub fn add(&mut self, kind: N, children: Vec<NodeId>) -> Result<NodeId, ConfigError> {
        for (i, &child) in children.iter().enumerate() {
            let taken = match self.nodes.get(child) {
                Some(node) => node.parent.is_some() || Some(child) == self.root,
                None => true,
            };
            if taken || children[..i].contains(&child) {
                return Err(ConfigError::ChildUnavailable);
            }
        }

        let id = self.nodes.insert(Node { kind, children, parent: None, revision: 0 });
        for child in self.nodes[id].children.clone() {
            self.nodes[child].parent = Some(id);
        }
        Ok(id)
    }

    pub fn leaf(&mut self, kind: N) -> NodeId {
        self.nodes.insert(Node { kind, children: vec![], parent: None, revision: 0 })
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<(), ConfigError> {
        match self.nodes.get(id) {
            Some(node) if node.parent.is_none() => {
                self.root = Some(id);
                Ok(())
            }
            _ => Err(ConfigError::ChildUnavailable),
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<N>> {
        self.nodes.get(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&N> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.nodes.get_mut(id).map(|n| &mut n.kind)
    }

    /// Child ids of `id`, cloned so the caller can recurse while mutating the tree.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn revision(&self, id: NodeId) -> u32 {
        self.nodes.get(id).map_or(0, |n| n.revision)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk from the root: parent first, then children in order.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    /// Nodes not reachable from the root. A finished tree has none.
    pub fn detached(&self) -> usize {
        self.nodes.len() - self.depth_first().len()
    }
}

impl<N: Generate> Tree<N> {
    /// Regenerate a single node, bumping its revision.
    pub fn generate_node(&mut self, id: NodeId, rng: &mut StdRng, vibe: &Vibe) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.kind.generate(rng, vibe);
            node.revision += 1;
        }
    }

    /// Every node reachable from the root has been generated at least once.
    pub fn is_configured(&self) -> bool {
        self.depth_first()
            .into_iter()
            .all(|id| self.nodes.get(id).map_or(false, |n| n.lifecycle() == Lifecycle::Active))
    }

    /// Box-drawing dump of the tree, for logs.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.root {
            self.describe_node(root, "", true, &mut out);
        }
        out
    }

    fn describe_node(&self, id: NodeId, indent: &str, last: bool, out: &mut String) {
        let Some(node) = self.nodes.get(id) else { return };
        let connector = if last { "└── " } else { "├── " };
        out.push_str(&format!("{indent}{connector}{}\n", node.kind.describe()));

        let child_indent = format!("{indent}{}", if last { "    " } else { "│   " });
        let n = node.children.len();
        for (i, &child) in node.children.iter().enumerate() {
            self.describe_node(child, &child_indent, i + 1 == n, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::state::Mode;

    #[derive(Debug)]
    struct Counter(u32);

    impl Generate for Counter {
        fn generate(&mut self, _: &mut StdRng, _: &Vibe) {
            self.0 += 1;
        }
        fn describe(&self) -> String {
            format!("Counter({})", self.0)
        }
    }

    fn sample() -> (Tree<Counter>, [NodeId; 4]) {
        let mut tree = Tree::new();
        let a = tree.leaf(Counter(0));
        let b = tree.leaf(Counter(0));
        let mid = tree.add(Counter(0), vec![a, b]).unwrap();
        let root = tree.add(Counter(0), vec![mid]).unwrap();
        tree.set_root(root).unwrap();
        (tree, [root, mid, a, b])
    }

    #[test]
    fn children_have_one_parent() {
        let (mut tree, [root, mid, a, _]) = sample();
        assert_eq!(tree.add(Counter(0), vec![a]).unwrap_err(), ConfigError::ChildUnavailable);
        assert_eq!(tree.add(Counter(0), vec![root]).unwrap_err(), ConfigError::ChildUnavailable);
        let c = tree.leaf(Counter(0));
        assert_eq!(tree.add(Counter(0), vec![c, c]).unwrap_err(), ConfigError::ChildUnavailable);
        assert_eq!(tree.get(a).unwrap().parent(), Some(mid));
        assert_eq!(tree.detached(), 1);
    }

    #[test]
    fn depth_first_is_preorder() {
        let (tree, [root, mid, a, b]) = sample();
        assert_eq!(tree.depth_first(), vec![root, mid, a, b]);
    }

    #[test]
    fn lifecycle_and_describe() {
        let (mut tree, [root, mid, a, b]) = sample();
        assert!(!tree.is_configured());
        assert_eq!(tree.get(a).unwrap().lifecycle(), Lifecycle::Unconfigured);

        let mut rng = StdRng::seed_from_u64(0);
        let vibe = Vibe::new(Mode::Rave);
        for id in [root, mid, a, b] {
            tree.generate_node(id, &mut rng, &vibe);
        }
        assert!(tree.is_configured());
        assert_eq!(tree.get(a).unwrap().lifecycle(), Lifecycle::Active);
        assert_eq!(
            tree.describe(),
            "└── Counter(1)\n    └── Counter(1)\n        ├── Counter(1)\n        └── Counter(1)\n"
        );
    }
}
