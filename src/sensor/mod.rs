// src/sensor/mod.rs
// Sensor shape model: a tagged union of aperture shapes, each answering one
// question — is a given sensor-local direction inside my field of view.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use glam::DVec3;

use crate::error::{SightlineError, SightlineResult};
use crate::geodesy::{rotation_from_hpr, EnuFrame};

/// Tolerance applied to aperture comparisons so boundary rays are not
/// excluded by floating-point error.
pub const FOV_EPSILON: f64 = 1e-6;

/// Predicate for data-driven / non-convex coverage envelopes.
pub type FovPredicate = Arc<dyn Fn(DVec3) -> bool + Send + Sync>;

/// Aperture shape of a directional sensor.
///
/// Directions are tested in the sensor-local frame (+X forward, +Y left,
/// +Z up), before any rotation into world space.
#[derive(Clone)]
pub enum SensorShape {
    /// Circular cone: inside iff the angle off forward is at most `fov / 2`.
    Cone { fov: f64 },
    /// Rectangular frustum: yaw and pitch bounds tested independently.
    Rectangle { fov_h: f64, fov_v: f64 },
    /// Dome: angle off forward up to `max_polar`. The only shape allowed to
    /// exceed 180° of total coverage (up to a full hemisphere-plus).
    Dome { max_polar: f64 },
    /// Arbitrary coverage predicate over the local direction.
    Custom { predicate: FovPredicate },
}

impl fmt::Debug for SensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorShape::Cone { fov } => f.debug_struct("Cone").field("fov", fov).finish(),
            SensorShape::Rectangle { fov_h, fov_v } => f
                .debug_struct("Rectangle")
                .field("fov_h", fov_h)
                .field("fov_v", fov_v)
                .finish(),
            SensorShape::Dome { max_polar } => {
                f.debug_struct("Dome").field("max_polar", max_polar).finish()
            }
            SensorShape::Custom { .. } => f.write_str("Custom { .. }"),
        }
    }
}

impl SensorShape {
    /// Test whether a sensor-local direction falls inside the aperture.
    ///
    /// `local_dir` need not be normalized; zero or non-finite directions are
    /// outside every aperture.
    pub fn inside_fov(&self, local_dir: DVec3) -> bool {
        if !local_dir.is_finite() || local_dir.length_squared() < 1e-24 {
            return false;
        }
        let dir = local_dir.normalize();

        match self {
            SensorShape::Cone { fov } => {
                let off_axis = dir.x.clamp(-1.0, 1.0).acos();
                off_axis <= fov / 2.0 + FOV_EPSILON
            }
            SensorShape::Rectangle { fov_h, fov_v } => {
                let yaw = dir.y.atan2(dir.x);
                let pitch = dir.z.clamp(-1.0, 1.0).asin();
                yaw.abs() <= fov_h / 2.0 + FOV_EPSILON && pitch.abs() <= fov_v / 2.0 + FOV_EPSILON
            }
            SensorShape::Dome { max_polar } => {
                let off_axis = dir.x.clamp(-1.0, 1.0).acos();
                off_axis <= max_polar + FOV_EPSILON
            }
            SensorShape::Custom { predicate } => predicate(dir),
        }
    }

    fn validate(&self) -> SightlineResult<()> {
        let check = |name: &str, angle: f64| -> SightlineResult<()> {
            if !(angle > 0.0 && angle <= PI + FOV_EPSILON) {
                return Err(SightlineError::invalid_sensor(format!(
                    "{name} must be in (0, pi], got {angle}"
                )));
            }
            Ok(())
        };
        match self {
            SensorShape::Cone { fov } => check("fov", *fov),
            SensorShape::Rectangle { fov_h, fov_v } => {
                check("fov_h", *fov_h)?;
                check("fov_v", *fov_v)
            }
            SensorShape::Dome { max_polar } => check("max_polar", *max_polar),
            SensorShape::Custom { .. } => Ok(()),
        }
    }
}

/// A directional sensor placed in the scene.
///
/// Immutable per computation: callers replace the whole struct rather than
/// mutating fields between analyses. `id` weakly references the placed
/// object owning the sensor; the engine does not manage object lifetime.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: u64,
    /// Sensor origin in ECEF meters.
    pub origin: DVec3,
    /// Orientation in radians, applied heading → pitch → roll.
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Maximum sensing range in meters.
    pub range: f64,
    pub shape: SensorShape,
}

impl Sensor {
    /// Create a sensor, validating the model invariants: aperture angles in
    /// `(0, pi]`, positive finite range, finite nonzero origin.
    pub fn new(
        id: u64,
        origin: DVec3,
        heading: f64,
        pitch: f64,
        roll: f64,
        range: f64,
        shape: SensorShape,
    ) -> SightlineResult<Self> {
        if !origin.is_finite() || origin.length_squared() < 1e-12 {
            return Err(SightlineError::invalid_sensor("origin must be finite and nonzero"));
        }
        if !(range > 0.0 && range.is_finite()) {
            return Err(SightlineError::invalid_sensor(format!(
                "range must be positive and finite, got {range}"
            )));
        }
        if !(heading.is_finite() && pitch.is_finite() && roll.is_finite()) {
            return Err(SightlineError::invalid_sensor("orientation angles must be finite"));
        }
        shape.validate()?;
        Ok(Self { id, origin, heading, pitch, roll, range, shape })
    }

    /// Test a sensor-local direction against the aperture.
    pub fn inside_fov(&self, local_dir: DVec3) -> bool {
        self.shape.inside_fov(local_dir)
    }

    /// Rotate a sensor-local direction into ECEF, composing the ENU frame at
    /// the sensor origin with the heading/pitch/roll rotation.
    pub fn local_dir_to_world(&self, frame: &EnuFrame, local_dir: DVec3) -> DVec3 {
        frame.basis() * (rotation_from_hpr(self.heading, self.pitch, self.roll) * local_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_cone_containment() {
        let cone = SensorShape::Cone { fov: FRAC_PI_2 };
        assert!(cone.inside_fov(DVec3::X));
        // Exactly on the half-angle boundary: inside within epsilon
        let boundary = unit_at(FRAC_PI_4);
        assert!(cone.inside_fov(boundary));
        // Past the boundary: outside
        assert!(!cone.inside_fov(unit_at(FRAC_PI_4 + 0.01)));
    }

    #[test]
    fn test_rectangle_yaw_pitch_independent() {
        let rect = SensorShape::Rectangle { fov_h: 1.0, fov_v: 0.4 };
        // Yaw in bounds, pitch out of bounds
        assert!(!rect.inside_fov(crate::geodesy::unit_from_az_el(0.3, 0.5)));
        // Pitch in bounds, yaw out of bounds
        assert!(!rect.inside_fov(crate::geodesy::unit_from_az_el(0.8, 0.1)));
        // Both in bounds
        assert!(rect.inside_fov(crate::geodesy::unit_from_az_el(0.3, 0.1)));
    }

    #[test]
    fn test_dome_exceeds_hemisphere() {
        let dome = SensorShape::Dome { max_polar: 2.0 };
        // 100 degrees off forward is inside a 2 rad dome
        assert!(dome.inside_fov(unit_at(1.8)));
        assert!(!dome.inside_fov(unit_at(2.2)));
    }

    #[test]
    fn test_custom_predicate() {
        let shape = SensorShape::Custom {
            predicate: Arc::new(|d: DVec3| d.z > 0.5),
        };
        assert!(shape.inside_fov(DVec3::Z));
        assert!(!shape.inside_fov(DVec3::X));
    }

    #[test]
    fn test_degenerate_direction_outside() {
        let cone = SensorShape::Cone { fov: PI };
        assert!(!cone.inside_fov(DVec3::ZERO));
        assert!(!cone.inside_fov(DVec3::new(f64::NAN, 0.0, 0.0)));
    }

    #[test]
    fn test_sensor_validation() {
        let origin = DVec3::new(6_378_137.0, 0.0, 0.0);
        assert!(Sensor::new(1, origin, 0.0, 0.0, 0.0, 1000.0, SensorShape::Cone { fov: 1.0 })
            .is_ok());
        assert!(Sensor::new(1, origin, 0.0, 0.0, 0.0, -5.0, SensorShape::Cone { fov: 1.0 })
            .is_err());
        assert!(Sensor::new(1, origin, 0.0, 0.0, 0.0, 10.0, SensorShape::Cone { fov: 0.0 })
            .is_err());
        assert!(Sensor::new(1, origin, 0.0, 0.0, 0.0, 10.0, SensorShape::Cone { fov: 4.0 })
            .is_err());
        assert!(Sensor::new(1, DVec3::ZERO, 0.0, 0.0, 0.0, 10.0, SensorShape::Cone { fov: 1.0 })
            .is_err());
    }

    fn unit_at(off_axis: f64) -> DVec3 {
        DVec3::new(off_axis.cos(), off_axis.sin(), 0.0)
    }
}
