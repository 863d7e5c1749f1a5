//! Head-pose geometry.
//!
//! Converts the tracker's orientation quaternion into the azimuth and
//! elevation angles the camera head understands. Two variants exist: the
//! servo path reproduces the calibration the head was tuned with
//! (including a fixed elevation trim), while the datagram path uses a
//! gimbal-lock-safe extraction for downstream consumers that want plain
//! yaw/pitch.

use std::f64::consts::PI;

/// Fixed elevation trim of the servo conversion, radians.
///
/// Calibration constant carried over from the deployed head; override via
/// [`servo_azimuth_elevation_with_trim`] when re-calibrating.
pub const ELEVATION_TRIM_RAD: f64 = 0.5;

/// Orientation quaternion, `x,y,z` vector part and `w` scalar part.
///
/// Convention: Y up, -Z forward, right-handed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quaternion {
    /// Vector x.
    pub x: f64,
    /// Vector y.
    pub y: f64,
    /// Vector z.
    pub z: f64,
    /// Scalar part.
    pub w: f64,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Create from components.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }
}

/// Horizontal and vertical camera-head angles, radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AzimuthElevation {
    /// Horizontal angle.
    pub azimuth: f64,
    /// Vertical angle.
    pub elevation: f64,
}

/// Servo-path conversion with the default elevation trim.
#[must_use]
pub fn servo_azimuth_elevation(q: Quaternion) -> AzimuthElevation {
    servo_azimuth_elevation_with_trim(q, ELEVATION_TRIM_RAD)
}

/// Servo-path conversion with an explicit elevation trim.
///
/// Near the poles (`|x·y + z·w| > 0.499`) elevation collapses to zero and
/// azimuth degenerates to a single rotation, matching the head's
/// behavior when looking straight up or down.
#[must_use]
pub fn servo_azimuth_elevation_with_trim(q: Quaternion, trim: f64) -> AzimuthElevation {
    let test = q.x * q.y + q.z * q.w;
    if test > 0.499 {
        // Singularity at north pole
        return AzimuthElevation {
            azimuth: 2.0 * q.x.atan2(q.w),
            elevation: 0.0,
        };
    }
    if test < -0.499 {
        // Singularity at south pole
        return AzimuthElevation {
            azimuth: -2.0 * q.x.atan2(q.w),
            elevation: 0.0,
        };
    }

    let sqx = q.x * q.x;
    let sqy = q.y * q.y;
    let sqz = q.z * q.z;
    let azimuth = (2.0 * q.y * q.w - 2.0 * q.x * q.z).atan2(1.0 - 2.0 * sqy - 2.0 * sqz);
    let elevation = (2.0 * q.x * q.w - 2.0 * q.y * q.z).atan2(1.0 - 2.0 * sqx - 2.0 * sqz);

    AzimuthElevation { azimuth, elevation: elevation + trim }
}

/// Gimbal-lock-safe conversion used for the robot-control datagrams.
///
/// At gimbal lock (`|sin(pitch)| >= 1`) elevation saturates to ±π/2 and
/// azimuth falls back to the remaining free rotation. Both angles are
/// normalized to `[-π, π]`.
#[must_use]
pub fn gimbal_safe_azimuth_elevation(q: Quaternion) -> AzimuthElevation {
    let sinp = 2.0 * (q.w * q.x - q.z * q.y);

    let (azimuth, elevation) = if sinp.abs() >= 1.0 {
        (
            (-2.0 * q.x * q.z).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y)),
            (PI / 2.0).copysign(sinp),
        )
    } else {
        (
            (2.0 * (q.w * q.y + q.z * q.x)).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y)),
            sinp.asin(),
        )
    };

    AzimuthElevation {
        azimuth: normalize_angle(azimuth),
        elevation: normalize_angle(elevation),
    }
}

/// Wrap an angle into `[-π, π]`.
#[must_use]
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}
