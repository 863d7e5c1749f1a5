//! Head pose to servo setpoint mapping.
//!
//! Maps the tracker angles onto the head's hardware range, leads the
//! motion with a displacement-proportional boost, low-passes the result
//! and clamps to the mechanical limits. Filter state lives across calls,
//! so one mapper serves one head.

use crate::protocol::servo::PoseTarget;
use crate::types::config::MovementRange;
use crate::types::geometry::{
    self, AzimuthElevation, Quaternion, ELEVATION_TRIM_RAD,
};

/// Fixed bias added to the elevation displacement before the speed
/// boost. Hardware calibration constant of the deployed head.
pub const ELEVATION_BOOST_BIAS: i64 = 200_000_000;

/// Low-pass weight of a new setpoint.
pub const FILTER_BETA: f64 = 0.20;

/// Stateful pose-to-setpoint mapper.
#[derive(Debug, Clone)]
pub struct PoseMapper {
    azimuth_filtered: f64,
    elevation_filtered: f64,
    elevation_trim: f64,
}

impl Default for PoseMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseMapper {
    /// Create with the default elevation trim.
    #[must_use]
    pub fn new() -> Self {
        Self::with_elevation_trim(ELEVATION_TRIM_RAD)
    }

    /// Create with an explicit elevation trim for re-calibration.
    #[must_use]
    pub fn with_elevation_trim(elevation_trim: f64) -> Self {
        Self {
            azimuth_filtered: 0.0,
            elevation_filtered: 0.0,
            elevation_trim,
        }
    }

    /// Filtered angles currently held, hardware units.
    #[must_use]
    pub fn filtered(&self) -> (f64, f64) {
        (self.azimuth_filtered, self.elevation_filtered)
    }

    /// Map a head orientation to the next servo setpoint.
    #[must_use]
    pub fn target(&mut self, pose: Quaternion, range: &MovementRange) -> PoseTarget {
        let angles =
            geometry::servo_azimuth_elevation_with_trim(pose, self.elevation_trim);
        self.target_from_angles(angles, range)
    }

    /// Same mapping from already-extracted angles.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn target_from_angles(
        &mut self,
        angles: AzimuthElevation,
        range: &MovementRange,
    ) -> PoseTarget {
        let azimuth_half = f64::from(range.azimuth_max) - f64::from(range.azimuth_min);
        let azimuth_half = azimuth_half / 2.0;
        let azimuth_center = f64::from(range.azimuth_max) - azimuth_half;

        let elevation_half = f64::from(range.elevation_max) - f64::from(range.elevation_min);
        let elevation_half = elevation_half / 2.0;
        let elevation_center = f64::from(range.elevation_max) - elevation_half;

        // [-π/2, π/2] maps linearly onto the hardware span; elevation is
        // sign-flipped to match the head's drive direction.
        let mut azimuth = (angles.azimuth * 2.0 / std::f64::consts::PI) * azimuth_half
            + azimuth_center;
        let mut elevation = (-angles.elevation * 2.0 / std::f64::consts::PI) * elevation_half
            + elevation_center;

        // Lead the motion proportionally to displacement from center.
        let gain = f64::from(range.speed_multiplier);
        azimuth += (azimuth - azimuth_center) * gain;
        #[allow(clippy::cast_precision_loss)]
        {
            elevation += (elevation - elevation_center + ELEVATION_BOOST_BIAS as f64) * gain;
        }

        self.azimuth_filtered =
            self.azimuth_filtered * (1.0 - FILTER_BETA) + azimuth * FILTER_BETA;
        self.elevation_filtered =
            self.elevation_filtered * (1.0 - FILTER_BETA) + elevation * FILTER_BETA;

        self.azimuth_filtered = self
            .azimuth_filtered
            .clamp(f64::from(range.azimuth_min), f64::from(range.azimuth_max));
        self.elevation_filtered = self
            .elevation_filtered
            .clamp(f64::from(range.elevation_min), f64::from(range.elevation_max));

        let azimuth = self.azimuth_filtered.round() as i32;
        let elevation = self.elevation_filtered.round() as i32;

        PoseTarget {
            azimuth,
            azimuth_revol: if azimuth < 0 { -1 } else { 0 },
            elevation,
            elevation_revol: if elevation < 0 { -1 } else { 0 },
        }
    }
}
