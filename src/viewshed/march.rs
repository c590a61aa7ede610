// src/viewshed/march.rs
// Per-ray visibility march: linear sample points, short-circuiting horizon
// prefix, and the near-to-far clearance walk that finds the farthest
// terrain-clear point on a ray.

use glam::DVec3;

use crate::geodesy::Geodetic;
use crate::services::HorizonOccluder;

/// Linear sample points from the ray origin to its range endpoint,
/// `steps + 1` points inclusive of both ends.
pub fn ray_sample_points(origin: DVec3, direction: DVec3, range: f64, steps: u32) -> Vec<DVec3> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| origin + direction * (range * i as f64 / steps as f64))
        .collect()
}

/// Length of the leading run of occluder-visible samples.
///
/// With no occluder the whole ray survives. Sampling stops at the first
/// point beyond the horizon — terrain past it is unreachable anyway, so
/// no height query is spent on it.
pub fn occluder_visible_prefix(points: &[DVec3], occluder: Option<&dyn HorizonOccluder>) -> usize {
    match occluder {
        None => points.len(),
        Some(occ) => points.iter().take_while(|p| occ.is_visible(**p)).count(),
    }
}

/// Walk a ray's retained samples from near to far and return the farthest
/// visible point.
///
/// A sample is visible while its straight-line height stays at least
/// `clearance` above the terrain height at its ground location; the walk
/// stops at the first violation. Missing terrain entries count as height 0.
/// Returns `None` when the very first sample already violates the rule —
/// that ray contributes no boundary point.
pub fn farthest_visible(
    points: &[DVec3],
    geodetics: &[Geodetic],
    heights: &[Option<f64>],
    clearance: f64,
) -> Option<DVec3> {
    debug_assert_eq!(points.len(), geodetics.len());

    let mut farthest = None;
    for (i, point) in points.iter().enumerate() {
        let ground = heights.get(i).copied().flatten().unwrap_or(0.0);
        if geodetics[i].height_m < ground + clearance {
            break;
        }
        farthest = Some(*point);
    }
    farthest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::{ecef_to_geodetic, geodetic_to_ecef};

    struct HalfSpace {
        /// Points with x above this are visible
        min_x: f64,
    }

    impl HorizonOccluder for HalfSpace {
        fn is_visible(&self, p: DVec3) -> bool {
            p.x >= self.min_x
        }
    }

    #[test]
    fn test_sample_points_count_and_ends() {
        let pts = ray_sample_points(DVec3::ZERO, DVec3::X, 100.0, 4);
        assert_eq!(pts.len(), 5);
        assert!((pts[0] - DVec3::ZERO).length() < 1e-12);
        assert!((pts[4] - DVec3::new(100.0, 0.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_occluder_prefix_short_circuits() {
        let pts = ray_sample_points(DVec3::new(10.0, 0.0, 0.0), -DVec3::X, 8.0, 8);
        let occ = HalfSpace { min_x: 5.5 };
        // x runs 10, 9, ..., 2; visible while x >= 5.5 → 10..6 = 5 points
        assert_eq!(occluder_visible_prefix(&pts, Some(&occ)), 5);
        assert_eq!(occluder_visible_prefix(&pts, None), 9);
    }

    #[test]
    fn test_farthest_visible_stops_at_first_violation() {
        // Horizontal ray at 100 m over flat terrain, with a synthetic spike
        // at the third sample
        let start = geodetic_to_ecef(crate::geodesy::Geodetic::new(0.0, 0.0, 100.0));
        let frame = crate::geodesy::EnuFrame::at(start);
        let pts = ray_sample_points(start, frame.north(), 1000.0, 9);
        let geos: Vec<_> = pts.iter().map(|p| ecef_to_geodetic(*p)).collect();

        let mut heights: Vec<Option<f64>> = vec![Some(0.0); pts.len()];
        heights[3] = Some(500.0); // spike above the ray

        let hit = farthest_visible(&pts, &geos, &heights, 0.0).unwrap();
        // Farthest visible point is the sample before the spike
        assert!((hit - pts[2]).length() < 1e-9);
    }

    #[test]
    fn test_farthest_visible_none_when_buried() {
        let start = geodetic_to_ecef(crate::geodesy::Geodetic::new(0.0, 0.0, 1.0));
        let frame = crate::geodesy::EnuFrame::at(start);
        let pts = ray_sample_points(start, frame.north(), 100.0, 4);
        let geos: Vec<_> = pts.iter().map(|p| ecef_to_geodetic(*p)).collect();
        let heights: Vec<Option<f64>> = vec![Some(0.0); pts.len()];
        // Clearance of 2 m exceeds the 1 m sensor height everywhere
        assert!(farthest_visible(&pts, &geos, &heights, 2.0).is_none());
    }
}
