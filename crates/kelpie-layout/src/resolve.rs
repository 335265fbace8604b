use std::cmp::Ordering;
use std::collections::BTreeMap;

use kelpie_core::{MapConfig, MindTree, NodeId};

use crate::metrics::NodeMetrics;

/// Iteration bound for the per-level resolution stage.
const MAX_LEVEL_PASSES: usize = 15;
/// Iteration bound for the global resolution stage.
const MAX_GLOBAL_PASSES: usize = 20;
/// Fixed slack added on top of the remaining overlap when pushing.
const PUSH_SLACK: f64 = 10.0;

/// Outcome of an overlap-resolution run.
///
/// `residual_overlaps` being non-zero is not an error: dense pathological
/// trees can exhaust the pass budget, and the result is still usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub per_level_passes: usize,
    pub global_passes: usize,
    pub residual_overlaps: usize,
}

/// Phase B: overlap resolution across the whole tree.
///
/// Every node pair is a collision candidate, not just siblings — Phase A is a
/// local heuristic and unrelated branches can still meet. Same-level
/// collisions (sibling stacks included) are resolved per colliding column as
/// one ordered re-space around the column's midpoint; a pairwise pull-apart
/// would undo one neighbor while fixing the other and oscillate in stacks of
/// three or more. Cross-level collisions are resolved pairwise by
/// relationship class. Every stage visits nodes in the insertion order of the
/// node table, which makes the outcome reproducible for a fixed tree shape.
pub(crate) fn resolve(
    tree: &mut MindTree,
    metrics: NodeMetrics,
    config: &MapConfig,
) -> LayoutReport {
    let mut resolver = Resolver {
        tree,
        need_x: metrics.half_width() + config.horizontal_gap,
        need_y: metrics.height() + config.vertical_gap,
    };
    let groups = resolver.level_groups();

    let mut report = LayoutReport {
        per_level_passes: resolver.run_per_level(&groups),
        global_passes: resolver.run_global(&groups),
        residual_overlaps: 0,
    };
    report.residual_overlaps = resolver.count_residuals();
    if report.residual_overlaps > 0 {
        tracing::warn!(
            residual_overlaps = report.residual_overlaps,
            "overlap resolution exhausted its pass budget"
        );
    }
    report
}

/// Relationship class of a cross-level colliding pair. Same-level pairs
/// never reach classification; the level re-spacer owns them.
enum Relation {
    ParentChild { parent: NodeId, child: NodeId },
    Distant { deeper: NodeId },
    General,
}

struct Resolver<'a> {
    tree: &'a mut MindTree,
    /// Required center distance horizontally: half a node width plus the gap.
    need_x: f64,
    /// Required center distance vertically: a node height plus the gap.
    need_y: f64,
}

impl Resolver<'_> {
    fn position(&self, id: NodeId) -> (f64, f64) {
        self.tree.node(id).map(|n| (n.x, n.y)).unwrap_or((0.0, 0.0))
    }

    fn collides(&self, a: NodeId, b: NodeId) -> bool {
        let (ax, ay) = self.position(a);
        let (bx, by) = self.position(b);
        (ax - bx).abs() < self.need_x && (ay - by).abs() < self.need_y
    }

    /// Ids grouped by depth, insertion order within each group.
    fn level_groups(&self) -> Vec<Vec<NodeId>> {
        let mut by_level: BTreeMap<u32, Vec<NodeId>> = BTreeMap::new();
        for node in self.tree.nodes() {
            by_level.entry(node.level).or_default().push(node.id);
        }
        by_level.into_values().collect()
    }

    fn classify(&self, a: NodeId, b: NodeId) -> Relation {
        let (Some(na), Some(nb)) = (self.tree.node(a), self.tree.node(b)) else {
            return Relation::General;
        };
        if na.parent == Some(b) {
            return Relation::ParentChild {
                parent: b,
                child: a,
            };
        }
        if nb.parent == Some(a) {
            return Relation::ParentChild {
                parent: a,
                child: b,
            };
        }
        if na.level.abs_diff(nb.level) > 1 {
            return Relation::Distant {
                deeper: if na.level >= nb.level { a } else { b },
            };
        }
        Relation::General
    }

    /// Separates one colliding cross-level pair. All adjustments are
    /// vertical; the horizontal column structure from Phase A stays intact,
    /// which also keeps every branch on its assigned side.
    fn separate(&mut self, a: NodeId, b: NodeId) {
        let (_, ay) = self.position(a);
        let (_, by) = self.position(b);
        let overlap_y = self.need_y - (ay - by).abs();

        match self.classify(a, b) {
            Relation::ParentChild { parent, child } => {
                // Push the child clear of the parent, on whichever vertical
                // side the child already occupies, with headroom.
                let (_, py) = self.position(parent);
                let (cx, cy) = self.position(child);
                let dir = sign_or(cy - py, 1.0);
                self.tree
                    .set_position(child, cx, py + dir * self.need_y * 1.5);
            }
            Relation::Distant { deeper } => {
                // Only the deeper node moves, outward along its existing
                // sign of y, so settled shallow structure is not disturbed.
                let (nx, ny) = self.position(deeper);
                let dir = sign_or(ny, 1.0);
                self.tree
                    .set_position(deeper, nx, ny + dir * (overlap_y + PUSH_SLACK));
            }
            Relation::General => {
                let delta = overlap_y / 2.0 + PUSH_SLACK;
                let (dir_a, dir_b) = if ay <= by { (-1.0, 1.0) } else { (1.0, -1.0) };
                let (ax, ay) = self.position(a);
                let (bx, by) = self.position(b);
                self.tree.set_position(a, ax, ay + dir_a * delta);
                self.tree.set_position(b, bx, by + dir_b * delta);
            }
        }
    }

    /// Re-spaces every colliding x-cluster within one depth group. Returns
    /// whether any collision was found.
    ///
    /// Clustering walks the group in x order and splits wherever the gap to
    /// the previous member reaches `need_x`, so members of different clusters
    /// can never collide with each other.
    fn respace_level(&mut self, ids: &[NodeId]) -> bool {
        if ids.len() < 2 {
            return false;
        }
        let mut members: Vec<(NodeId, f64, f64)> = ids
            .iter()
            .map(|id| {
                let (x, y) = self.position(*id);
                (*id, x, y)
            })
            .collect();
        // Stable, so equal x keeps insertion order.
        members.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let mut collided = false;
        let mut start = 0;
        for end in 1..=members.len() {
            let boundary =
                end == members.len() || members[end].1 - members[end - 1].1 >= self.need_x;
            if boundary {
                collided |= self.respace_cluster(&members[start..end]);
                start = end;
            }
        }
        collided
    }

    /// Re-spaces one cluster as a unit: members keep their current vertical
    /// order and spread to exactly `need_y` apart around the cluster's mean
    /// y. One step per cluster — fixing a pair can never push a member back
    /// into an already-separated neighbor.
    fn respace_cluster(&mut self, cluster: &[(NodeId, f64, f64)]) -> bool {
        let mut colliding = false;
        'scan: for i in 0..cluster.len() {
            for j in (i + 1)..cluster.len() {
                let (_, ax, ay) = cluster[i];
                let (_, bx, by) = cluster[j];
                if (ax - bx).abs() < self.need_x && (ay - by).abs() < self.need_y {
                    colliding = true;
                    break 'scan;
                }
            }
        }
        if !colliding {
            return false;
        }

        let mut ordered = cluster.to_vec();
        // Stable, so equal y keeps the x-sorted (and thus insertion) order.
        ordered.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal));
        let mid = ordered.iter().map(|m| m.2).sum::<f64>() / ordered.len() as f64;
        let count = ordered.len() as f64;
        for (i, (id, x, _)) in ordered.iter().enumerate() {
            let y = mid + (i as f64 - (count - 1.0) / 2.0) * self.need_y;
            self.tree.set_position(*id, *x, y);
        }
        true
    }

    /// Resolves collisions within each depth group. Returns the number of
    /// passes performed (a pass that finds no collision ends the stage).
    fn run_per_level(&mut self, groups: &[Vec<NodeId>]) -> usize {
        let mut passes = 0;
        while passes < MAX_LEVEL_PASSES {
            passes += 1;
            let mut collided = false;
            for group in groups {
                collided |= self.respace_level(group);
            }
            if !collided {
                break;
            }
        }
        passes
    }

    /// Resolves cross-level pairs, re-spacing levels after each pass to
    /// clean up any same-level collisions the pushes reintroduced.
    fn run_global(&mut self, groups: &[Vec<NodeId>]) -> usize {
        let ids: Vec<(NodeId, u32)> = self.tree.nodes().map(|n| (n.id, n.level)).collect();
        let mut passes = 0;
        while passes < MAX_GLOBAL_PASSES {
            passes += 1;
            let mut collided = self.sweep(&ids);
            for group in groups {
                collided |= self.respace_level(group);
            }
            if !collided {
                break;
            }
        }
        passes
    }

    /// One pairwise pass over cross-level pairs; returns whether any
    /// collision was found. Same-level pairs belong to the level re-spacer.
    fn sweep(&mut self, ids: &[(NodeId, u32)]) -> bool {
        let mut collided = false;
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, level_a) = ids[i];
                let (b, level_b) = ids[j];
                if level_a == level_b {
                    continue;
                }
                if self.collides(a, b) {
                    collided = true;
                    self.separate(a, b);
                }
            }
        }
        collided
    }

    /// Final validation scan; overlaps left here are reported, not fixed.
    fn count_residuals(&self) -> usize {
        let ids: Vec<NodeId> = self.tree.ids().collect();
        let mut residuals = 0;
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if self.collides(ids[i], ids[j]) {
                    residuals += 1;
                    tracing::debug!(a = %ids[i], b = %ids[j], "residual overlap");
                }
            }
        }
        residuals
    }
}

fn sign_or(value: f64, default: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        default
    }
}
