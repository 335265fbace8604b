/// Floor for a measured node width; guards unmeasured or zero-sized samples.
pub const MIN_WIDTH: f64 = 60.0;
/// Floor for a measured node height.
pub const MIN_HEIGHT: f64 = 30.0;

/// Dimensions of one rendered node sample.
///
/// The overlap resolver treats every node as a box of this size. The
/// embedding view measures a single rendered node at resolution time and
/// passes it in; the floors keep a missing measurement from collapsing the
/// collision test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMetrics {
    width: f64,
    height: f64,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new(160.0, 40.0)
    }
}

impl NodeMetrics {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            // `f64::max` also maps NaN input to the floor.
            width: width.max(MIN_WIDTH),
            height: height.max(MIN_HEIGHT),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }
}
