// src/services.rs
// Collaborator interfaces the engine consumes but does not implement:
// terrain elevation, surface picking, horizon occlusion, and transform
// write-back. The surrounding application supplies these; the engine never
// reaches into a shared scene store (everything arrives as an explicit
// parameter).

use glam::{DQuat, DVec3};

/// What kind of surface a pick resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SurfaceKind {
    /// Rendered 3D geometry (mesh / tileset primitive).
    Mesh,
    /// Terrain heightfield surface.
    Terrain,
    /// Anything else the picker recognizes (billboards, labels, ...).
    Other,
}

/// A single nearest-surface hit from the pick service.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// Hit position in ECEF meters.
    pub position: DVec3,
    pub kind: SurfaceKind,
}

/// Batched terrain elevation source.
///
/// `sample_heights` returns one entry per input `(lon_deg, lat_deg)` pair;
/// `None` means no data at that location. Implementations may serve samples
/// from a remote/streamed elevation set, which is why the interface is
/// batch-only: the viewshed analyzer funnels every sample of a pass into a
/// single call rather than issuing one lookup per point.
///
/// Must be reentrant; concurrent engine calls share the source read-only.
pub trait TerrainSource {
    fn sample_heights(&self, points: &[(f64, f64)]) -> Vec<Option<f64>>;
}

/// Nearest-surface pick service over the rendered scene.
pub trait SurfacePicker {
    fn pick_nearest(&self, screen: (f64, f64)) -> Option<SurfaceHit>;
}

/// Horizon visibility pre-check. May be absent, in which case the viewshed
/// analyzer marches full rays with no pre-filter — the occluder is an
/// optimization, not a correctness requirement.
pub trait HorizonOccluder {
    fn is_visible(&self, point_ecef: DVec3) -> bool;
}

/// Transform write-back interface for placed objects. The gizmo writes
/// through this; it never holds a handle to the scene graph itself.
pub trait TransformSink {
    fn set_position(&mut self, id: u64, position: DVec3);
    fn set_orientation(&mut self, id: u64, orientation: DQuat);
    fn set_scale(&mut self, id: u64, scale: f64);
}
