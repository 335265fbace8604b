use std::time::Duration;

/// Tuning knobs shared by the store, layout engine, and editor session.
///
/// One explicit value threaded through all operations; there is no ambient
/// global configuration.
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Horizontal offset of the root's direct children.
    pub base_distance: f64,
    /// Horizontal step per further level, along the branch's side.
    pub branch_distance: f64,
    /// Minimum vertical distance between stacked siblings.
    pub min_vertical_spacing: f64,
    /// Estimated rendered node height, used when stacking siblings.
    pub node_height_estimate: f64,
    /// Margin added to the height estimate before comparing against
    /// `min_vertical_spacing`.
    pub vertical_margin: f64,
    /// Sibling spacing grows by this fraction of the base spacing per unit of
    /// maximum sibling fan-out, reserving room for deeper branches.
    pub fanout_spacing_factor: f64,
    /// Horizontal clearance required between node centers (on top of half a
    /// node width) before two nodes count as colliding.
    pub horizontal_gap: f64,
    /// Vertical clearance required between node centers (on top of a node
    /// height) before two nodes count as colliding.
    pub vertical_gap: f64,
    /// Bound on retained undo snapshots.
    pub history_capacity: usize,
    /// Cadence of the timer-driven autosave.
    pub autosave_interval: Duration,
    /// Multiplier applied per zoom-delta event.
    pub zoom_step: f64,
    /// Screen pixels moved per directional pan step.
    pub pan_step: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            base_distance: 320.0,
            branch_distance: 250.0,
            min_vertical_spacing: 100.0,
            node_height_estimate: 60.0,
            vertical_margin: 40.0,
            fanout_spacing_factor: 0.5,
            horizontal_gap: 40.0,
            vertical_gap: 20.0,
            history_capacity: crate::history::DEFAULT_CAPACITY,
            autosave_interval: Duration::from_secs(30),
            zoom_step: 1.1,
            pan_step: 50.0,
        }
    }
}

impl MapConfig {
    /// Vertical spacing for a plain sibling stack.
    pub fn sibling_spacing(&self) -> f64 {
        self.min_vertical_spacing
            .max(self.node_height_estimate + self.vertical_margin)
    }
}
