// src/geodesy/horizon.rs
// Horizon occlusion test against the reference ellipsoid, used as a cheap
// pre-filter before ray marching in the viewshed analyzer.

use glam::DVec3;

use crate::services::HorizonOccluder;

/// Horizon occluder derived from an observer position and a spherical
/// approximation of the reference ellipsoid.
///
/// A point is reported visible iff it lies on the observer's side of the
/// horizon tangent cone. The test is conservative for points near the
/// surface; an observer inside the sphere sees everything (degenerate but
/// harmless, the march handles actual terrain).
#[derive(Debug, Clone)]
pub struct EllipsoidHorizon {
    observer: DVec3,
    center: DVec3,
    observer_distance: f64,
    /// cos of the horizon half-angle seen from the sphere center: r / d.
    cos_horizon: f64,
}

impl EllipsoidHorizon {
    /// Build the occluder for an observer in ECEF and an occluding sphere.
    pub fn new(observer: DVec3, center: DVec3, radius: f64) -> Self {
        let observer_distance = (observer - center).length();
        let cos_horizon = if observer_distance > radius {
            radius / observer_distance
        } else {
            0.0
        };
        Self { observer, center, observer_distance, cos_horizon }
    }

    /// Straight-line distance from the observer to the horizon tangent point.
    pub fn horizon_distance(&self, radius: f64) -> f64 {
        if self.observer_distance <= radius {
            return 0.0;
        }
        (self.observer_distance * self.observer_distance - radius * radius).sqrt()
    }
}

impl HorizonOccluder for EllipsoidHorizon {
    fn is_visible(&self, point: DVec3) -> bool {
        if self.cos_horizon <= 0.0 {
            return true;
        }

        let center_to_point = point - self.center;
        let point_distance = center_to_point.length();
        if point_distance < 1e-10 {
            return false;
        }

        let center_to_observer = self.observer - self.center;

        // Point is above the horizon iff the angle between center→point and
        // center→observer stays below the horizon half-angle:
        //   dot(P−C, E−C) / (|P−C|·|E−C|) >= r / d
        let cos_angle =
            center_to_point.dot(center_to_observer) / (point_distance * self.observer_distance);
        cos_angle >= self.cos_horizon
    }
}
