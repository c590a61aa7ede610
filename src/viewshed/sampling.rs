// src/viewshed/sampling.rs
// Angular sampling grid for the viewshed analyzer: candidate directions
// covering the full sphere, filtered by the sensor's field-of-view
// predicate so grid density stays decoupled from aperture size.

use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec3;

use crate::geodesy::{unit_from_az_el, EnuFrame};
use crate::sensor::Sensor;

/// One surviving sample direction, in both the sensor-local frame and
/// rotated into ECEF.
#[derive(Debug, Clone, Copy)]
pub struct SampleDirection {
    pub local: DVec3,
    pub world: DVec3,
}

/// Generate the aperture-filtered direction grid.
///
/// Azimuth midpoints span `[-pi, pi)`, elevation midpoints `[-pi/2, pi/2]`;
/// any direction outside the sensor's field of view is discarded before the
/// expensive marching stage. Wide apertures naturally keep more samples.
pub fn sample_directions(
    sensor: &Sensor,
    frame: &EnuFrame,
    azimuth_samples: u32,
    elevation_samples: u32,
) -> Vec<SampleDirection> {
    let mut directions = Vec::new();

    for ei in 0..elevation_samples {
        let el = -FRAC_PI_2 + PI * (ei as f64 + 0.5) / elevation_samples as f64;
        for ai in 0..azimuth_samples {
            let az = -PI + 2.0 * PI * (ai as f64 + 0.5) / azimuth_samples as f64;
            let local = unit_from_az_el(az, el);
            if !sensor.inside_fov(local) {
                continue;
            }
            directions.push(SampleDirection {
                local,
                world: sensor.local_dir_to_world(frame, local),
            });
        }
    }

    log::trace!(
        "sampling grid: {} of {} directions inside aperture",
        directions.len(),
        azimuth_samples as usize * elevation_samples as usize
    );
    directions
}
