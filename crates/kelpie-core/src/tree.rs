use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Text substituted when an edit leaves a label empty after trimming.
pub const PLACEHOLDER_TEXT: &str = "Node";

/// Opaque node identifier. Ids are allocated from a monotonically increasing
/// counter and never reused within a session, so a stale id from a deleted
/// subtree can never alias a live node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeColor {
    Blue,
    Green,
    Yellow,
    Red,
    Purple,
}

impl NodeColor {
    /// Default tag for every freshly created non-root node.
    pub const BASE: NodeColor = NodeColor::Blue;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub text: String,
    /// Depth from the root; always `level(parent) + 1`, maintained by
    /// construction and never mutated independently.
    pub level: u32,
    pub parent: Option<NodeId>,
    /// Insertion order here is the sibling display order.
    pub children: Vec<NodeId>,
    pub x: f64,
    pub y: f64,
    /// `None` only for the root.
    pub color: Option<NodeColor>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The node table: a single rooted tree over an insertion-ordered map.
///
/// Iteration order (and therefore layout pair order) is the order nodes were
/// created in; removals use `shift_remove` so surviving nodes keep it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MindTree {
    nodes: IndexMap<NodeId, Node>,
    /// Last allocated id value.
    next_id: u64,
}

impl MindTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the bootstrap path: a tree holding only a
    /// root with the given label.
    pub fn with_root(text: &str) -> Self {
        let mut tree = Self::new();
        // Infallible on an empty tree.
        let _ = tree.create_root(text);
        tree
    }

    fn alloc_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.is_root())
    }

    /// Value of the id counter (the highest id handed out so far).
    pub fn node_counter(&self) -> u64 {
        self.next_id
    }

    pub fn create_root(&mut self, text: &str) -> Result<NodeId> {
        if !self.nodes.is_empty() {
            return Err(Error::invalid("there can be only one root"));
        }
        let id = self.alloc_id();
        self.nodes.insert(
            id,
            Node {
                id,
                text: normalize_text(text),
                level: 0,
                parent: None,
                children: Vec::new(),
                x: 0.0,
                y: 0.0,
                color: None,
            },
        );
        Ok(id)
    }

    pub fn add_child(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        let (level, x, y) = {
            let parent = self
                .nodes
                .get(&parent)
                .ok_or(Error::NotFound { id: parent })?;
            (parent.level + 1, parent.x, parent.y)
        };
        let id = self.alloc_id();
        self.nodes.insert(
            id,
            Node {
                id,
                text: normalize_text(text),
                level,
                parent: Some(parent),
                children: Vec::new(),
                // Seeded at the parent; the layout engine owns real placement.
                x,
                y,
                color: Some(NodeColor::BASE),
            },
        );
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Adds a node sharing `node`'s parent and level, appended after the
    /// parent's existing children.
    pub fn add_sibling(&mut self, node: NodeId, text: &str) -> Result<NodeId> {
        let target = self.nodes.get(&node).ok_or(Error::NotFound { id: node })?;
        let Some(parent) = target.parent else {
            return Err(Error::invalid("the root node cannot have siblings"));
        };
        self.add_child(parent, text)
    }

    /// Removes `node` and every descendant. Returns the former parent's id —
    /// the node that should become selected afterwards.
    ///
    /// The subtree is unlinked from the parent first and then removed deepest
    /// first, so no intermediate state has a node pointing at a dead parent.
    pub fn delete_subtree(&mut self, node: NodeId) -> Result<Option<NodeId>> {
        let target = self.nodes.get(&node).ok_or(Error::NotFound { id: node })?;
        let Some(parent) = target.parent else {
            return Err(Error::invalid("the root node cannot be deleted"));
        };

        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        for victim in self.post_order(node) {
            self.nodes.shift_remove(&victim);
        }
        Ok(Some(parent))
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        let n = self
            .nodes
            .get_mut(&node)
            .ok_or(Error::NotFound { id: node })?;
        n.text = normalize_text(text);
        Ok(())
    }

    pub fn set_color(&mut self, node: NodeId, color: NodeColor) -> Result<()> {
        let n = self
            .nodes
            .get_mut(&node)
            .ok_or(Error::NotFound { id: node })?;
        if n.is_root() {
            return Err(Error::invalid("the root node has no color tag"));
        }
        n.color = Some(color);
        Ok(())
    }

    /// Applies a drag delta to a node's stored coordinates.
    pub fn move_by(&mut self, node: NodeId, dx: f64, dy: f64) -> Result<()> {
        let n = self
            .nodes
            .get_mut(&node)
            .ok_or(Error::NotFound { id: node })?;
        n.x += dx;
        n.y += dy;
        Ok(())
    }

    /// Writes a computed position. Missing ids are ignored; the layout engine
    /// only hands back ids it read from this tree.
    pub fn set_position(&mut self, node: NodeId, x: f64, y: f64) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.x = x;
            n.y = y;
        }
    }

    /// The subtree rooted at `node`, pre-order. Empty if `node` is absent.
    pub fn subtree_ids(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.visit_pre_order(node, &mut out);
        out
    }

    fn visit_pre_order(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(n) = self.nodes.get(&node) else {
            return;
        };
        out.push(node);
        for child in &n.children {
            self.visit_pre_order(*child, out);
        }
    }

    /// Deepest-first order for deletion.
    fn post_order(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = self.subtree_ids(node);
        out.reverse();
        out
    }

    /// Snapshot of all nodes in insertion order, for the persistence blob.
    pub fn to_nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    /// Rebuilds a tree from a persisted node list, enforcing the structural
    /// invariants. Any violation is `CorruptData`; callers fall back to a
    /// fresh single-root tree.
    pub fn from_parts(nodes: Vec<Node>, node_counter: u64) -> Result<Self> {
        let mut table: IndexMap<NodeId, Node> = IndexMap::with_capacity(nodes.len());
        let mut max_id = 0u64;
        for node in nodes {
            max_id = max_id.max(node.id.0);
            if table.insert(node.id, node).is_some() {
                return Err(Error::corrupt("duplicate node id"));
            }
        }
        let tree = Self {
            nodes: table,
            next_id: node_counter.max(max_id),
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Structural invariant check: exactly one root, every parent link
    /// resolves, levels are parent level + 1, and child lists agree with the
    /// parent links.
    pub fn validate(&self) -> Result<()> {
        let mut roots = 0usize;
        for node in self.nodes.values() {
            match node.parent {
                None => {
                    if node.level != 0 {
                        return Err(Error::corrupt("parentless node with non-zero level"));
                    }
                    roots += 1;
                }
                Some(parent_id) => {
                    let Some(parent) = self.nodes.get(&parent_id) else {
                        return Err(Error::corrupt(format!(
                            "node {} references missing parent {parent_id}",
                            node.id
                        )));
                    };
                    if node.level != parent.level + 1 {
                        return Err(Error::corrupt(format!(
                            "node {} has level {} under a level-{} parent",
                            node.id, node.level, parent.level
                        )));
                    }
                    if parent.children.iter().filter(|c| **c == node.id).count() != 1 {
                        return Err(Error::corrupt(format!(
                            "node {} is not linked exactly once from its parent",
                            node.id
                        )));
                    }
                }
            }
            for child in &node.children {
                match self.nodes.get(child) {
                    Some(c) if c.parent == Some(node.id) => {}
                    _ => {
                        return Err(Error::corrupt(format!(
                            "node {} lists a child {child} that does not point back",
                            node.id
                        )));
                    }
                }
            }
        }
        if self.nodes.is_empty() {
            return Ok(());
        }
        if roots != 1 {
            return Err(Error::corrupt(format!("expected one root, found {roots}")));
        }
        Ok(())
    }
}

fn normalize_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        PLACEHOLDER_TEXT.to_string()
    } else {
        trimmed.to_string()
    }
}
