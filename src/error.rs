//! Central error handling for the sightline engine.
//!
//! Provides a unified SightlineError enum with consistent categorization.
//! Absence-of-result conditions (failed picks, degenerate viewsheds) are
//! expressed as `Option`/result flags, not errors; only caller-contract
//! violations and cancellation surface here.

/// Centralized error type for all engine operations
#[derive(thiserror::Error, Debug)]
pub enum SightlineError {
    /// Sensor parameters violate the model invariants (aperture, range, origin).
    #[error("Invalid sensor: {0}")]
    InvalidSensor(String),

    /// A viewshed computation observed its cancel token between rays.
    #[error("Viewshed computation cancelled")]
    Cancelled,

    /// A second gizmo session attempted to engage an already-engaged target.
    #[error("Gizmo already engaged on target {0}")]
    GizmoEngaged(u64),
}

impl SightlineError {
    /// Convenience constructor for sensor validation failures
    pub fn invalid_sensor<T: ToString>(msg: T) -> Self {
        SightlineError::InvalidSensor(msg.to_string())
    }
}

/// Result type alias for engine operations
pub type SightlineResult<T> = Result<T, SightlineError>;
