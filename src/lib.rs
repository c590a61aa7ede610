//! sightline — sensor geometry and viewshed analysis for georeferenced 3D
//! scenes.
//!
//! The crate computes what terrain a directional sensor (cone, rectangular
//! frustum, dome, or custom aperture) can actually see, accounting for
//! terrain occlusion and horizon curvature, and ships the supporting
//! machinery: a multi-strategy screen-to-world positioning resolver and a
//! tangent-plane transform gizmo.
//!
//! All computation is synchronous CPU work on the calling thread. External
//! collaborators — terrain elevation, surface picking, transform write-back
//! — arrive through the traits in [`services`]; the engine performs no
//! drawing and holds no ambient scene state.
//!
//! ```no_run
//! use sightline::geodesy::{geodetic_to_ecef, Geodetic};
//! use sightline::sensor::{Sensor, SensorShape};
//! use sightline::viewshed::{compute_viewshed, ViewshedOptions};
//! # struct Flat;
//! # impl sightline::services::TerrainSource for Flat {
//! #     fn sample_heights(&self, pts: &[(f64, f64)]) -> Vec<Option<f64>> {
//! #         pts.iter().map(|_| Some(0.0)).collect()
//! #     }
//! # }
//!
//! let origin = geodetic_to_ecef(Geodetic::new(6.56, 45.92, 2400.0));
//! let sensor = Sensor::new(1, origin, 0.0, -0.3, 0.0, 5000.0,
//!     SensorShape::Cone { fov: 1.2 })?;
//! let result = compute_viewshed(&sensor, &Flat, None, &ViewshedOptions::default(), None)?;
//! if result.polygon_valid {
//!     // hand result.boundary to the presentation layer
//! }
//! # Ok::<(), sightline::error::SightlineError>(())
//! ```

pub mod error;
pub mod geodesy;
pub mod gizmo;
pub mod picking;
pub mod sensor;
pub mod services;
pub mod viewshed;

pub use error::{SightlineError, SightlineResult};
pub use geodesy::{ecef_to_geodetic, geodetic_to_ecef, EnuFrame, Geodetic};
pub use picking::{CameraModel, PositioningResolver, PositioningResult, Ray};
pub use sensor::{Sensor, SensorShape};
pub use viewshed::{compute_viewshed, CancelToken, ViewshedOptions, ViewshedResult};
