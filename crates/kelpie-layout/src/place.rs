use kelpie_core::{MapConfig, MindTree, NodeId};

/// Which side of the root a branch renders on.
///
/// A branch keeps every descendant on its own side; that is what prevents
/// connectors from distant branches crossing each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Right => 1.0,
            Side::Left => -1.0,
        }
    }
}

/// The side `node`'s branch was assigned, derived from the creation order of
/// the root's direct children (1st right, 2nd left, ...). `None` for the root.
pub fn side_of(tree: &MindTree, node: NodeId) -> Option<Side> {
    let root = tree.root()?;
    if node == root.id {
        return None;
    }
    let mut current = tree.node(node)?;
    while let Some(parent) = current.parent {
        if parent == root.id {
            break;
        }
        current = tree.node(parent)?;
    }
    let index = root.children.iter().position(|c| *c == current.id)?;
    Some(if index % 2 == 0 {
        Side::Right
    } else {
        Side::Left
    })
}

/// Phase A: directional placement, top-down.
///
/// The root is pinned at the origin; its children alternate right/left by
/// creation order and every deeper level steps further out on the inherited
/// side. Strictly pre-order, so a child is always placed against its parent's
/// final position.
pub(crate) fn place(tree: &mut MindTree, config: &MapConfig) {
    let Some(root) = tree.root() else {
        return;
    };
    let root_id = root.id;
    let children = root.children.clone();
    tree.set_position(root_id, 0.0, 0.0);

    let right: Vec<NodeId> = children.iter().copied().step_by(2).collect();
    let left: Vec<NodeId> = children.iter().copied().skip(1).step_by(2).collect();
    stack(
        tree,
        root_id,
        &right,
        Side::Right,
        config.base_distance,
        config.sibling_spacing(),
        config,
    );
    stack(
        tree,
        root_id,
        &left,
        Side::Left,
        config.base_distance,
        config.sibling_spacing(),
        config,
    );
}

/// Places `ids` as a vertical stack centered on the parent's y, one
/// horizontal step out on `side`, then recurses into each subtree.
fn stack(
    tree: &mut MindTree,
    parent: NodeId,
    ids: &[NodeId],
    side: Side,
    distance: f64,
    spacing: f64,
    config: &MapConfig,
) {
    if ids.is_empty() {
        return;
    }
    let Some(p) = tree.node(parent) else {
        return;
    };
    let x = p.x + side.sign() * distance;
    let parent_y = p.y;
    let count = ids.len() as f64;
    for (i, id) in ids.iter().enumerate() {
        let y = parent_y + (i as f64 - (count - 1.0) / 2.0) * spacing;
        tree.set_position(*id, x, y);
    }
    for id in ids {
        descend(tree, *id, side, config);
    }
}

fn descend(tree: &mut MindTree, parent: NodeId, side: Side, config: &MapConfig) {
    let Some(children) = tree.node(parent).map(|n| n.children.clone()) else {
        return;
    };
    if children.is_empty() {
        return;
    }
    let spacing = widened_spacing(tree, &children, config);
    stack(
        tree,
        parent,
        &children,
        side,
        config.branch_distance,
        spacing,
        config,
    );
}

/// Sibling spacing widened in proportion to the largest fan-out in the set,
/// reserving vertical room for deeper branches before they are placed.
fn widened_spacing(tree: &MindTree, ids: &[NodeId], config: &MapConfig) -> f64 {
    let max_fanout = ids
        .iter()
        .filter_map(|id| tree.node(*id))
        .map(|n| n.children.len())
        .max()
        .unwrap_or(0);
    config.sibling_spacing() * (1.0 + config.fanout_spacing_factor * max_fanout as f64)
}
