// src/picking/mod.rs
// Screen-to-world positioning: pick rays, camera projection, ray/ellipsoid
// intersection, and the multi-strategy positioning resolver.

mod resolver;

pub use resolver::{
    optimal_strategy, Accuracy, PickStrategy, PositioningOptions, PositioningResolver,
    PositioningResult, SurfaceType,
};

use glam::{DMat4, DVec3};

use crate::geodesy::{WGS84_A, WGS84_F};

/// A ray in ECEF space defined by an origin and a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    /// Create a ray; the direction is normalized. Returns `None` for zero or
    /// non-finite directions rather than letting NaN reach downstream math.
    pub fn new(origin: DVec3, direction: DVec3) -> Option<Self> {
        if !origin.is_finite() || !direction.is_finite() {
            return None;
        }
        if direction.length_squared() < 1e-24 {
            return None;
        }
        Some(Self { origin, direction: direction.normalize() })
    }

    /// Point along the ray at parameter `t` (meters).
    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// Camera model used to unproject screen picks into ECEF rays and to
/// project world points back onto the screen.
#[derive(Debug, Clone, Copy)]
pub struct CameraModel {
    view_proj: DMat4,
    inv_view_proj: DMat4,
    width: f64,
    height: f64,
    position: DVec3,
}

impl CameraModel {
    /// Build from a combined view-projection matrix, the camera's ECEF
    /// position, and the viewport size in pixels.
    pub fn new(view_proj: DMat4, position: DVec3, width: u32, height: u32) -> Self {
        Self {
            view_proj,
            inv_view_proj: view_proj.inverse(),
            width: width as f64,
            height: height as f64,
            position,
        }
    }

    /// Camera position in ECEF meters.
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Camera height above the ellipsoid, in meters.
    pub fn height_above_ellipsoid(&self) -> f64 {
        crate::geodesy::ecef_to_geodetic(self.position).height_m
    }

    /// Unproject a screen coordinate (pixels, origin top-left) into a world
    /// ray through that pixel.
    pub fn unproject(&self, screen: (f64, f64)) -> Option<Ray> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        // Normalized device coordinates, Y flipped
        let ndc_x = 2.0 * screen.0 / self.width - 1.0;
        let ndc_y = 1.0 - 2.0 * screen.1 / self.height;

        let near = self.inv_view_proj.project_point3(DVec3::new(ndc_x, ndc_y, 0.0));
        let far = self.inv_view_proj.project_point3(DVec3::new(ndc_x, ndc_y, 1.0));

        Ray::new(near, far - near)
    }

    /// Project an ECEF point onto the screen. Returns `None` for points
    /// behind the camera or outside the viewport.
    pub fn project(&self, world: DVec3) -> Option<(f64, f64)> {
        if !world.is_finite() {
            return None;
        }
        let clip = self.view_proj * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = DVec3::new(clip.x, clip.y, clip.z) / clip.w;
        if !ndc.is_finite() || ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
            return None;
        }
        Some((
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        ))
    }
}

/// Intersect a ray with the WGS84 reference ellipsoid.
///
/// Returns the smallest non-negative ray parameter, or `None` when the ray
/// misses. Solved in a scaled space where the ellipsoid is the unit sphere.
pub fn ray_ellipsoid_intersection(ray: &Ray) -> Option<f64> {
    let b_axis = WGS84_A * (1.0 - WGS84_F);
    let inv_radii = DVec3::new(1.0 / WGS84_A, 1.0 / WGS84_A, 1.0 / b_axis);

    let o = ray.origin * inv_radii;
    let d = ray.direction * inv_radii;

    let a = d.length_squared();
    let b = 2.0 * o.dot(d);
    let c = o.length_squared() - 1.0;

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || a < 1e-24 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = (-b - sqrt_disc) / (2.0 * a);
    let t1 = (-b + sqrt_disc) / (2.0 * a);

    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        // Origin inside the ellipsoid
        Some(t1)
    } else {
        None
    }
}
