//! Viewshed analyzer: the core visibility algorithm.
//!
//! Builds an aperture-filtered angular sampling grid, ray-marches every
//! surviving direction against terrain with a horizon pre-check, finds the
//! farthest terrain-clear point per ray, and assembles the angularly-sorted
//! boundary polygon. CPU, on-demand, single sensor per call; every terrain
//! height the pass needs is fetched in one batched request.

pub mod march;
pub mod sampling;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{SightlineError, SightlineResult};
use crate::geodesy::{ecef_to_geodetic, geodetic_to_ecef, EnuFrame, Geodetic};
use crate::sensor::Sensor;
use crate::services::{HorizonOccluder, TerrainSource};

use march::{farthest_visible, occluder_visible_prefix, ray_sample_points};
use sampling::sample_directions;

/// Sampling configuration for one viewshed pass. Pure configuration, no
/// lifecycle; out-of-range values are clamped up to their minimum with a
/// warning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewshedOptions {
    /// Azimuth samples over the full circle (minimum 8).
    pub azimuth_samples: u32,
    /// Elevation samples over the full [-pi/2, pi/2] span (minimum 1).
    pub elevation_samples: u32,
    /// Minimum height margin above terrain for a point to count as visible,
    /// in meters. Fixed margin, no slope-aware tolerance: sharp
    /// near-grazing terrain can over-report occlusion.
    pub terrain_clearance: f64,
    /// March samples per ray between origin and range endpoint (minimum 1).
    pub steps_per_ray: u32,
}

impl Default for ViewshedOptions {
    fn default() -> Self {
        Self {
            azimuth_samples: 120,
            elevation_samples: 4,
            terrain_clearance: 1.5,
            steps_per_ray: 64,
        }
    }
}

impl ViewshedOptions {
    fn sanitized(&self) -> Self {
        let mut opts = *self;
        if opts.azimuth_samples < 8 {
            log::warn!("azimuth_samples {} below minimum, clamping to 8", opts.azimuth_samples);
            opts.azimuth_samples = 8;
        }
        if opts.elevation_samples < 1 {
            log::warn!("elevation_samples 0 below minimum, clamping to 1");
            opts.elevation_samples = 1;
        }
        if opts.steps_per_ray < 1 {
            log::warn!("steps_per_ray 0 below minimum, clamping to 1");
            opts.steps_per_ray = 1;
        }
        if !(opts.terrain_clearance >= 0.0) {
            log::warn!("terrain_clearance {} invalid, clamping to 0", opts.terrain_clearance);
            opts.terrain_clearance = 0.0;
        }
        opts
    }
}

/// Result of one viewshed analysis: the ordered boundary polygon in ECEF.
///
/// Produced fresh on every call and never mutated afterward — callers
/// replace, not patch. `polygon_valid` is false when fewer than 3 boundary
/// points were found (degenerate / no visibility), a valid and expected
/// outcome rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewshedResult {
    pub boundary: Vec<DVec3>,
    pub polygon_valid: bool,
}

/// Cooperative cancellation flag, checked between rays. A cancelled pass
/// returns no result, never a partial polygon.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Compute the viewshed polygon for one sensor.
///
/// Collaborators arrive as explicit parameters — the engine holds no
/// ambient scene references. The horizon occluder is optional; without it
/// every ray marches its full length.
pub fn compute_viewshed(
    sensor: &Sensor,
    terrain: &dyn TerrainSource,
    occluder: Option<&dyn HorizonOccluder>,
    options: &ViewshedOptions,
    cancel: Option<&CancelToken>,
) -> SightlineResult<ViewshedResult> {
    let opts = options.sanitized();

    // Origin lift: never analyze from below ground. The analysis origin is
    // raised to terrain + clearance if the sensor sits lower than that.
    let sensor_geo = ecef_to_geodetic(sensor.origin);
    let ground = match terrain
        .sample_heights(&[(sensor_geo.lon_deg, sensor_geo.lat_deg)])
        .first()
        .copied()
        .flatten()
    {
        Some(h) => h,
        None => {
            log::warn!(
                "no terrain at sensor location ({:.6}, {:.6}), lifting against height 0",
                sensor_geo.lon_deg,
                sensor_geo.lat_deg
            );
            0.0
        }
    };
    let lifted_height = sensor_geo.height_m.max(ground + opts.terrain_clearance);
    let origin = geodetic_to_ecef(Geodetic::new(
        sensor_geo.lon_deg,
        sensor_geo.lat_deg,
        lifted_height,
    ));
    let frame = EnuFrame::at(origin);

    let directions = sample_directions(sensor, &frame, opts.azimuth_samples, opts.elevation_samples);
    log::debug!(
        "viewshed pass: {} rays x {} steps, clearance {} m",
        directions.len(),
        opts.steps_per_ray,
        opts.terrain_clearance
    );

    // Phase 1: per ray, generate samples and keep the occluder-visible
    // prefix; accumulate every retained sample into one batch.
    let mut rays: Vec<(usize, usize)> = Vec::with_capacity(directions.len()); // (offset, len)
    let mut all_points: Vec<DVec3> = Vec::new();
    let mut all_geodetics: Vec<Geodetic> = Vec::new();
    let mut all_lonlats: Vec<(f64, f64)> = Vec::new();

    for dir in &directions {
        check_cancelled(cancel)?;

        let points = ray_sample_points(origin, dir.world, sensor.range, opts.steps_per_ray);
        // Horizon pre-check: only the occluder-visible leading run of each
        // ray is retained for terrain sampling; anything past the horizon
        // cannot be a visibility limit.
        let prefix = occluder_visible_prefix(&points, occluder);

        // The origin sample is excluded from the walk: the sensor trivially
        // sees itself, and a lifted origin resting exactly at the clearance
        // floor must not manufacture a zero-length boundary point.
        let offset = all_points.len();
        for point in points.into_iter().take(prefix).skip(1) {
            let geo = ecef_to_geodetic(point);
            all_lonlats.push((geo.lon_deg, geo.lat_deg));
            all_geodetics.push(geo);
            all_points.push(point);
        }
        rays.push((offset, all_points.len() - offset));
    }

    // Phase 2: one batched height query for the whole pass.
    let mut heights = terrain.sample_heights(&all_lonlats);
    if heights.len() != all_points.len() {
        log::warn!(
            "terrain source returned {} heights for {} samples, padding with no-data",
            heights.len(),
            all_points.len()
        );
        heights.resize(all_points.len(), None);
    }

    // Phase 3: near-to-far clearance walk per ray, collecting one farthest
    // visible point per ray that found any.
    let mut boundary: Vec<DVec3> = Vec::new();
    let mut empty_rays = 0usize;
    for &(offset, len) in &rays {
        check_cancelled(cancel)?;

        if len == 0 {
            empty_rays += 1;
            continue;
        }
        let range = offset..offset + len;
        match farthest_visible(
            &all_points[range.clone()],
            &all_geodetics[range.clone()],
            &heights[range],
            opts.terrain_clearance,
        ) {
            Some(point) => boundary.push(point),
            None => empty_rays += 1,
        }
    }

    sort_boundary_by_azimuth(&frame, &mut boundary);

    let polygon_valid = boundary.len() >= 3;
    if !polygon_valid {
        log::debug!(
            "degenerate viewshed: {} boundary points, {} of {} rays saw nothing",
            boundary.len(),
            empty_rays,
            rays.len()
        );
    }

    Ok(ViewshedResult { boundary, polygon_valid })
}

/// Sort boundary points by their azimuth around the origin in the local ENU
/// frame (`atan2(north, east)`, ascending). Stable and idempotent; rays may
/// be processed in any order internally since this step re-establishes the
/// canonical polygon winding.
pub fn sort_boundary_by_azimuth(frame: &EnuFrame, boundary: &mut Vec<DVec3>) {
    let mut keyed: Vec<(f64, DVec3)> = boundary
        .iter()
        .map(|p| {
            let local = frame.point_to_local(*p);
            (local.y.atan2(local.x), *p)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    boundary.clear();
    boundary.extend(keyed.into_iter().map(|(_, p)| p));
}

fn check_cancelled(cancel: Option<&CancelToken>) -> SightlineResult<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(SightlineError::Cancelled),
        _ => Ok(()),
    }
}
