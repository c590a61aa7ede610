// tests/test_gizmo_drag.rs
// Gizmo drag sessions against a recording transform sink: incremental
// translate round-trip, yaw rotation, radial scale, and the apex anchor.

use std::f64::consts::FRAC_PI_2;

use glam::{DQuat, DVec3};

use sightline::geodesy::{geodetic_to_ecef, Geodetic};
use sightline::gizmo::{AnchorStyle, GizmoMode, GizmoUpdate, TransformGizmo};
use sightline::picking::Ray;
use sightline::services::TransformSink;

#[derive(Default)]
struct RecordingSink {
    positions: Vec<(u64, DVec3)>,
    orientations: Vec<(u64, DQuat)>,
    scales: Vec<(u64, f64)>,
}

impl TransformSink for RecordingSink {
    fn set_position(&mut self, id: u64, position: DVec3) {
        self.positions.push((id, position));
    }

    fn set_orientation(&mut self, id: u64, orientation: DQuat) {
        self.orientations.push((id, orientation));
    }

    fn set_scale(&mut self, id: u64, scale: f64) {
        self.scales.push((id, scale));
    }
}

/// Target at the north pole, where the local tangent plane is horizontal in
/// ECEF (Up is +Z) and vertical test rays are easy to reason about.
fn pole_target() -> DVec3 {
    geodetic_to_ecef(Geodetic::new(0.0, 90.0, 0.0))
}

/// Vertical ray dropping onto the tangent plane at an XY offset from the
/// pole.
fn drop_ray(target: DVec3, dx: f64, dy: f64) -> Ray {
    Ray::new(target + DVec3::new(dx, dy, 100.0), -DVec3::Z).unwrap()
}

#[test]
fn test_translate_is_incremental() {
    let target = pole_target();
    let mut gizmo = TransformGizmo::new(11, AnchorStyle::Center);
    let mut sink = RecordingSink::default();

    gizmo.engage(target, DQuat::IDENTITY, &drop_ray(target, 0.0, 0.0)).unwrap();

    // First move: plane intersection at (5, 0) relative to the anchor
    let update = gizmo.update(&drop_ray(target, 5.0, 0.0), &mut sink).unwrap();
    match update {
        GizmoUpdate::Translate(delta) => {
            assert!((delta - DVec3::new(5.0, 0.0, 0.0)).length() < 1e-6)
        }
        other => panic!("expected translate, got {other:?}"),
    }
    let (_, first) = sink.positions[0];
    assert!((first - (target + DVec3::new(5.0, 0.0, 0.0))).length() < 1e-6);

    // Second move to (5, 3): only the (0, 3) increment applies, not (5, 3)
    // over again
    gizmo.update(&drop_ray(target, 5.0, 3.0), &mut sink).unwrap();
    let (_, second) = sink.positions[1];
    assert!((second - (target + DVec3::new(5.0, 3.0, 0.0))).length() < 1e-6);

    gizmo.disengage();
    assert!(gizmo.update(&drop_ray(target, 9.0, 9.0), &mut sink).is_none());
    assert_eq!(sink.positions.len(), 2);
}

#[test]
fn test_rotate_applies_yaw_about_up() {
    let target = pole_target();
    let mut gizmo = TransformGizmo::new(12, AnchorStyle::Center);
    gizmo.set_mode(GizmoMode::Rotate).unwrap();
    let mut sink = RecordingSink::default();

    gizmo.engage(target, DQuat::IDENTITY, &drop_ray(target, 5.0, 0.0)).unwrap();
    let update = gizmo.update(&drop_ray(target, 0.0, 5.0), &mut sink).unwrap();

    // (5,0) to (0,5) is a quarter turn counter-clockwise about +Z
    match update {
        GizmoUpdate::Rotate(yaw) => assert!((yaw.abs() - FRAC_PI_2).abs() < 1e-6),
        other => panic!("expected rotate, got {other:?}"),
    }
    let (_, orientation) = sink.orientations[0];
    let expected = DQuat::from_axis_angle(DVec3::Z, FRAC_PI_2);
    assert!(orientation.dot(expected).abs() > 0.999_999);
}

#[test]
fn test_scale_ratio_round_trip() {
    let target = pole_target();
    let mut gizmo = TransformGizmo::new(13, AnchorStyle::Center);
    gizmo.set_mode(GizmoMode::Scale).unwrap();
    let mut sink = RecordingSink::default();

    gizmo.engage(target, DQuat::IDENTITY, &drop_ray(target, 5.0, 0.0)).unwrap();

    // Radius 5 -> 10 doubles the scale
    gizmo.update(&drop_ray(target, 10.0, 0.0), &mut sink).unwrap();
    assert!((gizmo.accumulated_scale() - 2.0).abs() < 1e-6);

    // Back to radius 5 halves it again
    gizmo.update(&drop_ray(target, 5.0, 0.0), &mut sink).unwrap();
    assert!((gizmo.accumulated_scale() - 1.0).abs() < 1e-6);

    let (_, last) = *sink.scales.last().unwrap();
    assert!((last - 1.0).abs() < 1e-6);
}

#[test]
fn test_apex_anchor_offsets_handle_not_position() {
    let target = pole_target();
    let mut gizmo = TransformGizmo::new(14, AnchorStyle::Apex { offset: 50.0 });
    let mut sink = RecordingSink::default();

    // The drag plane sits at the apex, 50 m above the target along Up, so
    // the engage ray must reach z = target.z + 50
    gizmo.engage(target, DQuat::IDENTITY, &drop_ray(target, 0.0, 0.0)).unwrap();
    assert!(gizmo.is_engaged());

    gizmo.update(&drop_ray(target, 7.0, 0.0), &mut sink).unwrap();
    // The write-back is the target position plus the drag delta; the apex
    // offset never leaks into the stored position
    let (_, written) = sink.positions[0];
    assert!((written - (target + DVec3::new(7.0, 0.0, 0.0))).length() < 1e-3);
}
