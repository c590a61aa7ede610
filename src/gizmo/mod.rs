// src/gizmo/mod.rs
// Drag-based translate/rotate/scale controller. Pointer drags are projected
// onto a tangent plane through the target; plane-intersection deltas become
// position, yaw, or radial-scale updates written through the TransformSink.

use glam::{DQuat, DVec3};

use crate::error::{SightlineError, SightlineResult};
use crate::geodesy::EnuFrame;
use crate::picking::Ray;
use crate::services::TransformSink;

/// Denominator floor for the radial scale ratio.
const SCALE_RADIUS_FLOOR: f64 = 1e-3;

/// Gizmo operation mode. Entered via [`TransformGizmo::set_mode`] only — no
/// automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

/// Where the gizmo handle anchors on the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorStyle {
    /// Handle at the target's position.
    Center,
    /// Handle offset along local Up to a shape's apex (cone-shaped sensors).
    /// The offset is reversed when writing positions back; the plane math is
    /// unchanged.
    Apex { offset: f64 },
}

/// What one pointer-move applied to the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GizmoUpdate {
    /// World-space translation delta added to the position.
    Translate(DVec3),
    /// Yaw delta (radians) applied about local Up.
    Rotate(f64),
    /// Multiplicative factor applied to the accumulated scale.
    Scale(f64),
}

/// A plane through a point, used as the drag-intersection surface.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub point: DVec3,
    pub normal: DVec3,
}

impl Plane {
    /// Intersect a ray with the plane. `None` when the ray is parallel to
    /// the plane or the intersection is behind the ray origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<DVec3> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = self.normal.dot(self.point - ray.origin) / denom;
        if t < 0.0 {
            return None;
        }
        let hit = ray.point_at(t);
        hit.is_finite().then_some(hit)
    }
}

/// Active drag session state, present only between engage and disengage.
#[derive(Debug, Clone, Copy)]
struct DragState {
    /// Last plane-intersection point; deltas are incremental against this.
    anchor: DVec3,
    plane: Plane,
    /// Target pose as last written by this gizmo. While engaged, the gizmo
    /// owns write access; no other path may mutate the target, or deltas
    /// silently desynchronize.
    position: DVec3,
    orientation: DQuat,
}

/// Interactive transform gizmo for one placed object.
pub struct TransformGizmo {
    target: u64,
    mode: GizmoMode,
    anchor_style: AnchorStyle,
    accumulated_scale: f64,
    drag: Option<DragState>,
}

impl TransformGizmo {
    /// Create a gizmo for a target object, starting in translate mode with
    /// unit accumulated scale.
    pub fn new(target: u64, anchor_style: AnchorStyle) -> Self {
        Self {
            target,
            mode: GizmoMode::default(),
            anchor_style,
            accumulated_scale: 1.0,
            drag: None,
        }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn mode(&self) -> GizmoMode {
        self.mode
    }

    /// Switch mode. Rejected while a drag is engaged so an in-flight delta
    /// is never reinterpreted.
    pub fn set_mode(&mut self, mode: GizmoMode) -> SightlineResult<()> {
        if self.drag.is_some() {
            return Err(SightlineError::GizmoEngaged(self.target));
        }
        self.mode = mode;
        Ok(())
    }

    pub fn accumulated_scale(&self) -> f64 {
        self.accumulated_scale
    }

    pub fn is_engaged(&self) -> bool {
        self.drag.is_some()
    }

    /// Pointer-down: compute the tangent plane through the target handle
    /// (ellipsoid surface normal as plane normal) and record the pointer
    /// ray's plane intersection as the drag anchor.
    ///
    /// Fails silently — `Ok` with no drag started — when the ray is parallel
    /// to the plane or the target position is not resolvable. A second
    /// engage while already engaged is an error.
    pub fn engage(
        &mut self,
        target_position: DVec3,
        target_orientation: DQuat,
        pointer_ray: &Ray,
    ) -> SightlineResult<()> {
        if self.drag.is_some() {
            return Err(SightlineError::GizmoEngaged(self.target));
        }
        if !target_position.is_finite() || target_position.length_squared() < 1e-12 {
            return Ok(());
        }

        let frame = EnuFrame::at(target_position);
        let handle = self.handle_point(target_position, &frame);
        let plane = Plane { point: handle, normal: frame.up() };

        if let Some(anchor) = plane.intersect_ray(pointer_ray) {
            self.drag = Some(DragState {
                anchor,
                plane,
                position: target_position,
                orientation: target_orientation,
            });
        }
        Ok(())
    }

    /// Pointer-move while engaged: intersect the new pointer ray with the
    /// stored plane and apply the delta per the active mode, writing through
    /// the sink. Returns what was applied, or `None` when disengaged or the
    /// ray misses the plane.
    ///
    /// The anchor resets to the new intersection after every update — drags
    /// are incremental, not absolute.
    pub fn update(&mut self, pointer_ray: &Ray, sink: &mut dyn TransformSink) -> Option<GizmoUpdate> {
        let drag = self.drag.as_mut()?;
        let hit = drag.plane.intersect_ray(pointer_ray)?;

        let applied = match self.mode {
            GizmoMode::Translate => {
                let delta = hit - drag.anchor;
                drag.position += delta;
                // Keep the drag plane anchored at the moving handle
                drag.plane.point += delta;
                sink.set_position(self.target, drag.position);
                GizmoUpdate::Translate(delta)
            }
            GizmoMode::Rotate => {
                let frame = EnuFrame::at(drag.position);
                let a = frame.point_to_local(drag.anchor);
                let b = frame.point_to_local(hit);
                let yaw_delta = wrap_angle(b.y.atan2(b.x) - a.y.atan2(a.x));
                drag.orientation =
                    DQuat::from_axis_angle(frame.up(), yaw_delta) * drag.orientation;
                sink.set_orientation(self.target, drag.orientation);
                GizmoUpdate::Rotate(yaw_delta)
            }
            GizmoMode::Scale => {
                let frame = EnuFrame::at(drag.position);
                let a = frame.point_to_local(drag.anchor);
                let b = frame.point_to_local(hit);
                let r_old = a.x.hypot(a.y).max(SCALE_RADIUS_FLOOR);
                let factor = b.x.hypot(b.y) / r_old;
                self.accumulated_scale *= factor;
                sink.set_scale(self.target, self.accumulated_scale);
                GizmoUpdate::Scale(factor)
            }
        };

        drag.anchor = hit;
        Some(applied)
    }

    /// Pointer-up / pointer-cancel: clear the drag. Further updates are
    /// no-ops until re-engaged.
    pub fn disengage(&mut self) {
        self.drag = None;
    }

    fn handle_point(&self, position: DVec3, frame: &EnuFrame) -> DVec3 {
        match self.anchor_style {
            AnchorStyle::Center => position,
            AnchorStyle::Apex { offset } => position + frame.up() * offset,
        }
    }
}

/// Wrap an angle to (-pi, pi].
fn wrap_angle(a: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let mut w = a % two_pi;
    if w <= -std::f64::consts::PI {
        w += two_pi;
    } else if w > std::f64::consts::PI {
        w -= two_pi;
    }
    w
}
