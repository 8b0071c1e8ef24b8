//! Mouse-delta-to-stick value mapping logic
//!
//! Converts raw relative motion deltas into absolute stick coordinates and
//! keeps the last coordinate of each axis.

/// Fixed scale applied on top of `sensitivity × axis_max`
///
/// With the default axis range a sensitivity of 1.0 maps one mouse count to
/// roughly 1310 stick units, so a 25-count flick reaches full deflection.
pub const SCALE: f64 = 1.0 / 25.0;

/// Left stick axes driven by the mouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Per-count multiplier derived from a sensitivity factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity {
    factor: f64,
    multiplier: f64,
}

impl Sensitivity {
    /// Build the multiplier for a device advertising `[-axis_max, axis_max]`
    ///
    /// `factor` is clamped to `[0, 1]`; NaN counts as 0.
    pub fn new(factor: f64, axis_max: i32) -> Self {
        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        Self {
            factor,
            multiplier: factor * f64::from(axis_max) * SCALE,
        }
    }

    /// Clamped sensitivity factor
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Stick units per mouse count
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

/// Map a raw relative delta to a stick coordinate
///
/// Truncates toward zero. Sub-unit motion is dropped per event rather than
/// carried into the next one. The result is not clamped.
pub fn transform(raw_delta: i32, sensitivity: &Sensitivity) -> i64 {
    (f64::from(raw_delta) * sensitivity.multiplier).trunc() as i64
}

/// Current stick coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StickPosition {
    pub x: i64,
    pub y: i64,
}

/// Holds the last stick position between events
#[derive(Debug, Default)]
pub struct StickState {
    position: StickPosition,
}

impl StickState {
    /// Start centered
    pub fn new() -> Self {
        Self::default()
    }

    /// Update one axis, carrying the other forward, and return both
    pub fn apply_motion(&mut self, axis: Axis, value: i64) -> StickPosition {
        match axis {
            Axis::X => self.position.x = value,
            Axis::Y => self.position.y = value,
        }
        self.position
    }

    pub fn position(&self) -> StickPosition {
        self.position
    }
}
