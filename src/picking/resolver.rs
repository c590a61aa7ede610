// src/picking/resolver.rs
// Multi-strategy screen-to-world positioning: mesh pick, terrain heightfield
// raycast with a distance guard, and reference-ellipsoid fallback, each with
// a confidence/accuracy tier.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::{ray_ellipsoid_intersection, CameraModel, Ray};
use crate::geodesy::{ecef_to_geodetic, geodetic_to_ecef, Geodetic};
use crate::services::{SurfaceKind, SurfacePicker, TerrainSource};

/// One positioning strategy, tried in the order configured in
/// [`PositioningOptions::strategies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickStrategy {
    /// Depth/ray hit against rendered 3D geometry.
    Mesh,
    /// Raycast against the terrain heightfield.
    Terrain,
    /// Ray intersection with the reference ellipsoid, last resort.
    Ellipsoid,
}

/// Accuracy tier of a resolved position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accuracy {
    High,
    Medium,
    Low,
}

/// Which surface a pick resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceType {
    Mesh,
    Terrain,
    Ellipsoid,
    None,
}

/// Result of a resolved screen pick. One per pick, immutable, discarded
/// after use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositioningResult {
    /// Resolved surface position (degrees / degrees / meters).
    pub position: Geodetic,
    pub surface_type: SurfaceType,
    pub accuracy: Accuracy,
    /// Confidence in [0, 1]: 0.95 mesh, 0.9 terrain, 0.6 ellipsoid.
    pub confidence: f64,
}

/// Configuration for the positioning resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositioningOptions {
    /// Strategies in the order they are attempted.
    pub strategies: Vec<PickStrategy>,
    /// Hard ceiling for accepted terrain-hit travel distance (meters); the
    /// effective guard is `max(max_terrain_distance, 0.1 * camera-to-surface
    /// distance)` so distant views don't over-reject valid hits.
    pub max_terrain_distance: f64,
    /// Number of linear march samples for the terrain raycast.
    pub terrain_march_steps: u32,
    /// Binary-refinement rounds once a terrain crossing is bracketed.
    pub refinement_iterations: u32,
}

impl Default for PositioningOptions {
    fn default() -> Self {
        Self {
            strategies: vec![PickStrategy::Mesh, PickStrategy::Terrain, PickStrategy::Ellipsoid],
            max_terrain_distance: 5000.0,
            terrain_march_steps: 256,
            refinement_iterations: 8,
        }
    }
}

/// Scale the terrain distance guard with camera altitude so close-up views
/// stay tight while high-altitude views don't reject valid distant hits.
pub fn optimal_strategy(camera_height: f64) -> PositioningOptions {
    PositioningOptions {
        max_terrain_distance: (camera_height * 0.5).max(2000.0),
        ..PositioningOptions::default()
    }
}

/// Multi-strategy screen-to-world resolver.
///
/// Strategies run in configured order; the first hit wins. All strategies
/// failing yields `None` — the user clicked the sky, a caller no-op rather
/// than an error.
#[derive(Debug, Clone, Default)]
pub struct PositioningResolver {
    options: PositioningOptions,
}

impl PositioningResolver {
    pub fn new(options: PositioningOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PositioningOptions {
        &self.options
    }

    /// Resolve a screen pick into a surface position.
    pub fn resolve(
        &self,
        camera: &CameraModel,
        screen: (f64, f64),
        terrain: &dyn TerrainSource,
        picker: &dyn SurfacePicker,
    ) -> Option<PositioningResult> {
        for strategy in &self.options.strategies {
            let result = match strategy {
                PickStrategy::Mesh => self.try_mesh(screen, picker),
                PickStrategy::Terrain => self.try_terrain(camera, screen, terrain),
                PickStrategy::Ellipsoid => self.try_ellipsoid(camera, screen),
            };
            if result.is_some() {
                return result;
            }
        }
        None
    }

    fn try_mesh(&self, screen: (f64, f64), picker: &dyn SurfacePicker) -> Option<PositioningResult> {
        let hit = picker.pick_nearest(screen)?;
        if hit.kind != SurfaceKind::Mesh || !hit.position.is_finite() {
            return None;
        }
        Some(PositioningResult {
            position: ecef_to_geodetic(hit.position),
            surface_type: SurfaceType::Mesh,
            accuracy: Accuracy::High,
            confidence: 0.95,
        })
    }

    fn try_terrain(
        &self,
        camera: &CameraModel,
        screen: (f64, f64),
        terrain: &dyn TerrainSource,
    ) -> Option<PositioningResult> {
        let ray = camera.unproject(screen)?;

        // Guard reference: where the bare ellipsoid puts the ground along
        // this ray. A terrain hit far from that reference is a hit on some
        // unrelated part of the globe, not the surface under the cursor.
        let t_reference = ray_ellipsoid_intersection(&ray);
        let camera_surface_distance =
            t_reference.unwrap_or_else(|| camera.height_above_ellipsoid().abs());
        let guard = self.options.max_terrain_distance.max(0.1 * camera_surface_distance);
        let max_t = t_reference.map_or(guard, |t| t + guard);

        let (point, t) = self.terrain_raycast(&ray, max_t, terrain)?;
        let deviation = t_reference.map_or(t, |t_ref| (t - t_ref).abs());
        if deviation > guard {
            log::debug!(
                "terrain hit rejected by distance guard: deviation={deviation:.1} guard={guard:.1}"
            );
            return None;
        }
        Some(PositioningResult {
            position: ecef_to_geodetic(point),
            surface_type: SurfaceType::Terrain,
            accuracy: Accuracy::High,
            confidence: 0.9,
        })
    }

    fn try_ellipsoid(&self, camera: &CameraModel, screen: (f64, f64)) -> Option<PositioningResult> {
        let ray = camera.unproject(screen)?;
        let t = ray_ellipsoid_intersection(&ray)?;
        Some(PositioningResult {
            position: ecef_to_geodetic(ray.point_at(t)),
            surface_type: SurfaceType::Ellipsoid,
            accuracy: Accuracy::Low,
            confidence: 0.6,
        })
    }

    /// March the ray against the terrain heightfield: one batched height
    /// query for all march samples, above/below crossing detection, then
    /// binary refinement of the bracketed crossing.
    fn terrain_raycast(
        &self,
        ray: &Ray,
        max_t: f64,
        terrain: &dyn TerrainSource,
    ) -> Option<(DVec3, f64)> {
        let steps = self.options.terrain_march_steps.max(1);
        let step = max_t / steps as f64;

        let mut lonlats = Vec::with_capacity(steps as usize + 1);
        let mut geodetics = Vec::with_capacity(steps as usize + 1);
        for i in 0..=steps {
            let geo = ecef_to_geodetic(ray.point_at(i as f64 * step));
            lonlats.push((geo.lon_deg, geo.lat_deg));
            geodetics.push(geo);
        }
        let heights = terrain.sample_heights(&lonlats);

        let mut prev_above = true;
        for (i, geo) in geodetics.iter().enumerate() {
            let ground = heights.get(i).copied().flatten().unwrap_or(0.0);
            let above = geo.height_m > ground;
            if !above && prev_above && i > 0 {
                let t_lo = (i as f64 - 1.0) * step;
                let t_hi = i as f64 * step;
                let t = self.refine_crossing(ray, t_lo, t_hi, terrain);
                return Some((ray.point_at(t), t));
            }
            prev_above = above;
        }
        None
    }

    /// Binary refinement of a bracketed above/below terrain crossing.
    fn refine_crossing(&self, ray: &Ray, t_lo: f64, t_hi: f64, terrain: &dyn TerrainSource) -> f64 {
        let mut lo = t_lo;
        let mut hi = t_hi;
        for _ in 0..self.options.refinement_iterations {
            let mid = (lo + hi) * 0.5;
            let geo = ecef_to_geodetic(ray.point_at(mid));
            let ground = terrain
                .sample_heights(&[(geo.lon_deg, geo.lat_deg)])
                .first()
                .copied()
                .flatten()
                .unwrap_or(0.0);
            if geo.height_m > ground {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (lo + hi) * 0.5
    }

    /// Sample the terrain height at a geodetic location. Missing terrain is
    /// height 0, not an error — callers may run with no terrain loaded.
    pub fn terrain_height_at(&self, terrain: &dyn TerrainSource, lon_deg: f64, lat_deg: f64) -> f64 {
        match terrain.sample_heights(&[(lon_deg, lat_deg)]).first().copied().flatten() {
            Some(h) => h,
            None => {
                log::warn!("no terrain data at ({lon_deg:.6}, {lat_deg:.6}), using height 0");
                0.0
            }
        }
    }

    /// Test whether a world point rests on a mesh/tileset surface: project
    /// it to the screen and re-pick there.
    pub fn is_on_mesh_surface(
        &self,
        camera: &CameraModel,
        picker: &dyn SurfacePicker,
        position: Geodetic,
    ) -> bool {
        let world = geodetic_to_ecef(position);
        let Some(screen) = camera.project(world) else {
            return false;
        };
        matches!(
            picker.pick_nearest(screen),
            Some(hit) if hit.kind == SurfaceKind::Mesh
        )
    }
}
