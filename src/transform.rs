//! Grid-index to device-voltage coordinate pipeline.
//!
//! Two pure stages: grid index → mechanical angle (one linear step size per
//! index), then angle → output voltage (one linear scale per axis). Both
//! axes share the same parameters, so a single [`TransformParams`] covers
//! the pair.
//!
//! `angle_range` being non-zero is a configuration invariant checked by
//! `Settings::validate` at startup; these functions assume it.

use serde::{Deserialize, Serialize};

/// Parameters of the grid → voltage pipeline, shared by both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    /// Angular step per grid index, in degrees.
    pub step_size_deg: f64,
    /// Symmetric device output range in volts.
    pub voltage_range_v: f64,
    /// Symmetric mechanical deflection range in degrees. Must be non-zero.
    pub angle_range_deg: f64,
}

impl TransformParams {
    /// Convert a pair of grid indices into the output voltage pair.
    pub fn grid_to_voltage(&self, grid_x: i32, grid_y: i32) -> (f64, f64) {
        let angle_x = index_to_angle(grid_x, self.step_size_deg);
        let angle_y = index_to_angle(grid_y, self.step_size_deg);
        (
            angle_to_voltage(angle_x, self.voltage_range_v, self.angle_range_deg),
            angle_to_voltage(angle_y, self.voltage_range_v, self.angle_range_deg),
        )
    }
}

/// Mechanical angle commanded by a grid index. No bounds checking.
pub fn index_to_angle(index: i32, step_size_deg: f64) -> f64 {
    f64::from(index) * step_size_deg
}

/// Output voltage for a target angle: `voltage_range * angle / angle_range`.
pub fn angle_to_voltage(angle_deg: f64, voltage_range_v: f64, angle_range_deg: f64) -> f64 {
    voltage_range_v * angle_deg / angle_range_deg
}
