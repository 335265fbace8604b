#![forbid(unsafe_code)]

//! Deterministic mind map layout (headless).
//!
//! Two phases over the tree shape:
//! - Phase A: recursive directional placement — root at the origin, branches
//!   alternating right/left, descendants inheriting their branch's side.
//! - Phase B: iterative pairwise overlap resolution with fixed pass budgets,
//!   best-effort by design.
//!
//! Coordinates are written back into the tree; for a fixed tree shape the
//! output is reproducible across runs.

pub mod geom;
pub mod metrics;
mod place;
mod resolve;
pub mod viewport;

pub use metrics::NodeMetrics;
pub use place::{Side, side_of};
pub use resolve::LayoutReport;
pub use viewport::Viewport;

use kelpie_core::{MapConfig, MindTree};

/// Assigns every node a conflict-free `(x, y)`.
///
/// Existing coordinates are only used as tie-break hints; structure alone
/// drives the result.
pub fn layout(tree: &mut MindTree, metrics: NodeMetrics, config: &MapConfig) -> LayoutReport {
    place::place(tree, config);
    resolve::resolve(tree, metrics, config)
}
