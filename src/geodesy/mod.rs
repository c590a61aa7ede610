//! Geodetic math helpers: WGS84 conversions, local ENU frames, and the
//! heading/pitch/roll and azimuth/elevation conventions used by the
//! sensor model and viewshed analyzer.
//!
//! All positions are ECEF meters (`DVec3`), all angles radians unless a
//! name says degrees. f64 throughout; ECEF magnitudes (~6.4e6 m) do not
//! survive f32 round-off.

pub mod horizon;

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 first eccentricity squared: e² = 2f − f².
pub const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;

/// Geodetic coordinate: longitude/latitude in degrees, height above the
/// ellipsoid in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub height_m: f64,
}

impl Geodetic {
    pub fn new(lon_deg: f64, lat_deg: f64, height_m: f64) -> Self {
        Self { lon_deg, lat_deg, height_m }
    }
}

/// Convert geodetic (degrees, meters) to ECEF XYZ meters.
pub fn geodetic_to_ecef(geo: Geodetic) -> DVec3 {
    let lon = geo.lon_deg.to_radians();
    let lat = geo.lat_deg.to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();

    // Radius of curvature in the prime vertical
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    DVec3::new(
        (n + geo.height_m) * cos_lat * lon.cos(),
        (n + geo.height_m) * cos_lat * lon.sin(),
        (n * (1.0 - WGS84_E2) + geo.height_m) * sin_lat,
    )
}

/// Convert ECEF XYZ meters to geodetic, via Bowring-style fixed-point
/// iteration on the latitude. Converges to sub-millimeter in a handful of
/// rounds for any point outside the Earth's core.
pub fn ecef_to_geodetic(ecef: DVec3) -> Geodetic {
    let lon = ecef.y.atan2(ecef.x);
    let p = ecef.x.hypot(ecef.y);

    // Degenerate polar axis: latitude is ±90, height from |z|
    if p < 1e-9 {
        let b = WGS84_A * (1.0 - WGS84_E2).sqrt();
        return Geodetic::new(
            lon.to_degrees(),
            90.0_f64.copysign(ecef.z),
            ecef.z.abs() - b,
        );
    }

    let mut lat = ecef.z.atan2(p * (1.0 - WGS84_E2));
    let mut height = 0.0;
    for _ in 0..8 {
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        // p / cos(lat) is ill-conditioned near the poles; switch to the
        // z-based form there.
        height = if cos_lat.abs() > 0.1 {
            p / cos_lat - n
        } else {
            ecef.z / sin_lat - n * (1.0 - WGS84_E2)
        };
        let next = ecef.z.atan2(p * (1.0 - WGS84_E2 * n / (n + height)));
        if (next - lat).abs() < 1e-12 {
            lat = next;
            break;
        }
        lat = next;
    }

    Geodetic::new(lon.to_degrees(), lat.to_degrees(), height)
}

/// Outward geodetic surface normal (unit Up vector) at a geodetic location.
pub fn geodetic_surface_normal(lon_deg: f64, lat_deg: f64) -> DVec3 {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    DVec3::new(
        lat.cos() * lon.cos(),
        lat.cos() * lon.sin(),
        lat.sin(),
    )
}

/// Local East-North-Up orthonormal frame anchored at an ECEF point.
///
/// Up is the geodetic surface normal at the anchor, East is tangent to the
/// parallel, North completes the right-handed basis. Valid for any finite
/// nonzero anchor.
#[derive(Debug, Clone, Copy)]
pub struct EnuFrame {
    origin: DVec3,
    east: DVec3,
    north: DVec3,
    up: DVec3,
}

impl EnuFrame {
    /// Build the ENU frame at an ECEF anchor point.
    pub fn at(origin: DVec3) -> Self {
        let geo = ecef_to_geodetic(origin);
        let lon = geo.lon_deg.to_radians();
        let up = geodetic_surface_normal(geo.lon_deg, geo.lat_deg);
        let east = DVec3::new(-lon.sin(), lon.cos(), 0.0);
        let north = up.cross(east);
        Self { origin, east, north, up }
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn east(&self) -> DVec3 {
        self.east
    }

    pub fn north(&self) -> DVec3 {
        self.north
    }

    pub fn up(&self) -> DVec3 {
        self.up
    }

    /// ENU basis as a matrix with East/North/Up columns; maps local ENU
    /// directions into ECEF.
    pub fn basis(&self) -> DMat3 {
        DMat3::from_cols(self.east, self.north, self.up)
    }

    /// Rotate a local ENU direction into ECEF.
    pub fn dir_to_world(&self, local: DVec3) -> DVec3 {
        self.basis() * local
    }

    /// Express an ECEF point in local ENU coordinates relative to the anchor.
    pub fn point_to_local(&self, world: DVec3) -> DVec3 {
        let d = world - self.origin;
        DVec3::new(d.dot(self.east), d.dot(self.north), d.dot(self.up))
    }

    /// Express a local ENU point as an ECEF point.
    pub fn point_to_world(&self, local: DVec3) -> DVec3 {
        self.origin + self.basis() * local
    }
}

/// Compose the sensor orientation rotation from heading/pitch/roll.
///
/// The sensor-local frame is +X forward, +Y left, +Z up. At zero HPR the
/// sensor looks East (+X maps to ENU East). Heading rotates about Up
/// (counter-clockwise positive), pitch about the heading-rotated left axis
/// (positive looks up), roll about the resulting forward axis — applied in
/// that fixed order.
pub fn rotation_from_hpr(heading: f64, pitch: f64, roll: f64) -> DMat3 {
    DMat3::from_rotation_z(heading)
        * DMat3::from_rotation_y(-pitch)
        * DMat3::from_rotation_x(roll)
}

/// Unit direction for an azimuth/elevation pair in the sensor-local frame
/// (+X forward, +Y left, +Z up).
pub fn unit_from_az_el(az: f64, el: f64) -> DVec3 {
    DVec3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_geodetic_ecef_round_trip() {
        let geo = Geodetic::new(12.5, 47.25, 1234.0);
        let back = ecef_to_geodetic(geodetic_to_ecef(geo));
        assert!((back.lon_deg - geo.lon_deg).abs() < 1e-9);
        assert!((back.lat_deg - geo.lat_deg).abs() < 1e-9);
        assert!((back.height_m - geo.height_m).abs() < 1e-4);
    }

    #[test]
    fn test_near_polar_round_trip() {
        // Within about a meter of the polar axis, above the degenerate
        // exactly-on-axis branch.
        for lat_deg in [89.99999, -89.99999, 89.9999999] {
            let geo = Geodetic::new(0.0, lat_deg, 1234.0);
            let back = ecef_to_geodetic(geodetic_to_ecef(geo));
            assert!((back.lat_deg - geo.lat_deg).abs() < 1e-8, "lat {lat_deg}");
            assert!((back.height_m - geo.height_m).abs() < 1e-3, "lat {lat_deg}");
        }
    }

    #[test]
    fn test_equator_prime_meridian_ecef() {
        let p = geodetic_to_ecef(Geodetic::new(0.0, 0.0, 0.0));
        assert!((p.x - WGS84_A).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_enu_frame_orthonormal() {
        let frame = EnuFrame::at(geodetic_to_ecef(Geodetic::new(30.0, 60.0, 500.0)));
        assert!((frame.east().length() - 1.0).abs() < 1e-12);
        assert!((frame.north().length() - 1.0).abs() < 1e-12);
        assert!((frame.up().length() - 1.0).abs() < 1e-12);
        assert!(frame.east().dot(frame.north()).abs() < 1e-12);
        assert!(frame.east().dot(frame.up()).abs() < 1e-12);
        assert!((frame.east().cross(frame.north()) - frame.up()).length() < 1e-12);
    }

    #[test]
    fn test_enu_up_points_away_from_earth() {
        let origin = geodetic_to_ecef(Geodetic::new(-70.0, -33.0, 0.0));
        let frame = EnuFrame::at(origin);
        // Up must increase geodetic height
        let lifted = ecef_to_geodetic(origin + frame.up() * 100.0);
        assert!((lifted.height_m - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_enu_local_round_trip() {
        let frame = EnuFrame::at(geodetic_to_ecef(Geodetic::new(5.0, 45.0, 10.0)));
        let local = DVec3::new(120.0, -45.0, 7.0);
        let back = frame.point_to_local(frame.point_to_world(local));
        assert!((back - local).length() < 1e-6);
    }

    #[test]
    fn test_hpr_zero_looks_east() {
        let rot = rotation_from_hpr(0.0, 0.0, 0.0);
        let forward = rot * DVec3::X;
        assert!((forward - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_hpr_pitch_up_looks_up() {
        let rot = rotation_from_hpr(0.0, FRAC_PI_2, 0.0);
        let forward = rot * DVec3::X;
        assert!((forward - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_hpr_heading_turns_left() {
        let rot = rotation_from_hpr(FRAC_PI_2, 0.0, 0.0);
        let forward = rot * DVec3::X;
        // Counter-clockwise about Up: East forward turns to North
        assert!((forward - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_unit_from_az_el() {
        let fwd = unit_from_az_el(0.0, 0.0);
        assert!((fwd - DVec3::X).length() < 1e-12);
        let up = unit_from_az_el(0.0, FRAC_PI_2);
        assert!((up - DVec3::Z).length() < 1e-12);
        let left = unit_from_az_el(FRAC_PI_2, 0.0);
        assert!((left - DVec3::Y).length() < 1e-12);
    }
}
