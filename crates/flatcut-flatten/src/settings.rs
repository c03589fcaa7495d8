//! Tolerances that steer axis detection and projection.

use serde::{Deserialize, Serialize};

/// Projection settings. Lengths are in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Closure and containment tolerance for projected loops (ε).
    pub tolerance: f64,
    /// Relative difference below which two axis extents count as tied.
    pub axis_tolerance: f64,
    /// Maximum angle between a face normal and an axis for the face to
    /// count as orthogonal to that axis, in degrees.
    pub angular_tolerance_deg: f64,
    /// Ignore axes whose best face is a bare rectangle when another axis
    /// shows a real profile.
    pub skip_rectangular_profiles: bool,
    /// Maximum distance between a curve and its polygonal approximation.
    pub chord_tolerance: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            axis_tolerance: 0.05,
            angular_tolerance_deg: 2.5,
            skip_rectangular_profiles: true,
            chord_tolerance: 0.01,
        }
    }
}

impl ProjectionSettings {
    /// Minimum `|n · axis|` for a normal to count as parallel to an axis.
    pub fn parallel_cos(&self) -> f64 {
        self.angular_tolerance_deg.to_radians().cos()
    }

    /// Segments per full turn that keep a circle of `radius` within the
    /// chord tolerance.
    pub fn segments_per_turn(&self, radius: f64) -> usize {
        const MIN: usize = 8;
        const MAX: usize = 1024;
        if radius <= self.chord_tolerance || self.chord_tolerance <= 0.0 {
            return MIN;
        }
        let half_angle = (1.0 - self.chord_tolerance / radius).acos();
        if half_angle <= 0.0 {
            return MAX;
        }
        ((std::f64::consts::PI / half_angle).ceil() as usize).clamp(MIN, MAX)
    }
}
