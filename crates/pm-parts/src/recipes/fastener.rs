//! Metric threaded fastener with an ISO coarse thread
//!
//! The thread comes from `Modeler::helical_sweep`, which turns it by
//! `THREAD_SEAM_OFFSET_DEG` about the rod axis. The core cylinder is not
//! turned, so the thread's first turn never starts on the core's seam.

use glam::{DVec2, DVec3};
use pm_cad::{
    Axis3D, BooleanHint, Helix, Modeler, PathBuilder, Plane, PlaneName, Profile, Solid, shapes,
};
use serde::{Deserialize, Serialize};

use super::positive;
use crate::error::{PartError, PartResult};
use crate::{PartKind, PartOutput, Recipe};

/// Coarse pitches by nominal diameter in millimetres
const ISO_COARSE_PITCHES: &[(u32, f64)] = &[
    (3, 0.5),
    (4, 0.7),
    (5, 0.8),
    (6, 1.0),
    (8, 1.25),
    (10, 1.5),
    (12, 1.75),
    (14, 2.0),
    (16, 2.0),
    (18, 2.5),
    (20, 2.5),
    (22, 2.5),
    (24, 3.0),
];

/// Share of the fundamental triangle height cut by the thread
const THREAD_DEPTH_RATIO: f64 = 5.0 / 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ThreadedFastenerParams {
    /// Nominal (major) diameter
    pub diameter: f64,
    pub length: f64,
}

impl Default for ThreadedFastenerParams {
    fn default() -> Self {
        Self {
            diameter: 8.0,
            length: 20.0,
        }
    }
}

pub struct ThreadedFastener;

impl Recipe for ThreadedFastener {
    const KIND: PartKind = PartKind::ThreadedFastener;
    type Params = ThreadedFastenerParams;

    fn build(modeler: &Modeler, params: &ThreadedFastenerParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

/// ISO coarse pitch for a nominal diameter, looked up by its whole
/// millimetres
pub fn iso_coarse_pitch(diameter: f64) -> Option<f64> {
    if !diameter.is_finite() || diameter < 0.0 {
        return None;
    }
    let nominal = diameter.floor() as u32;
    ISO_COARSE_PITCHES
        .iter()
        .find(|(d, _)| *d == nominal)
        .map(|(_, pitch)| *pitch)
}

/// Height of the fundamental triangle of a 60° thread
fn fundamental_height(pitch: f64) -> f64 {
    3f64.sqrt() / 2.0 * pitch
}

pub fn minor_diameter(diameter: f64, pitch: f64) -> f64 {
    diameter - 2.0 * THREAD_DEPTH_RATIO * fundamental_height(pitch)
}

/// Threaded rod standing on the XY plane along +Z
pub fn build(modeler: &Modeler, params: &ThreadedFastenerParams) -> PartResult<Solid> {
    let diameter = positive("diameter", params.diameter)?;
    let length = positive("length", params.length)?;
    let pitch = iso_coarse_pitch(diameter).ok_or_else(|| {
        PartError::invalid(
            "diameter",
            format!("no ISO coarse pitch for M{}", diameter.floor()),
        )
    })?;
    let minor_radius = minor_diameter(diameter, pitch) / 2.0;
    tracing::debug!(diameter, length, pitch, minor_radius, "threaded fastener");

    // One extra turn below the XY plane keeps the thread full at the bottom
    let helix = Helix::new(pitch, length + pitch, minor_radius)
        .with_axis(Axis3D::new(DVec3::new(0.0, 0.0, -pitch), DVec3::Z));
    let thread = modeler.helical_sweep(tooth(pitch)?, &helix)?;
    let below = modeler.extrude(
        shapes::circle(diameter / 2.0)?,
        Plane::named(PlaneName::XY, -pitch),
        pitch,
    )?;
    let thread = thread.cut(below)?;

    let core = modeler.extrude(
        shapes::circle(minor_radius)?,
        Plane::named(PlaneName::XY, 0.0),
        length,
    )?;
    Ok(core.fuse_with(thread, BooleanHint::SameFace)?)
}

/// Trapezoidal tooth: x along the axis, y outward from the minor radius
fn tooth(pitch: f64) -> PartResult<Profile> {
    let depth = THREAD_DEPTH_RATIO * fundamental_height(pitch);
    Ok(PathBuilder::at(DVec2::new(pitch / 8.0, 0.0))
        .line_to(DVec2::new(7.0 * pitch / 16.0, depth))
        .line_to(DVec2::new(9.0 * pitch / 16.0, depth))
        .line_to(DVec2::new(7.0 * pitch / 8.0, 0.0))
        .close()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pm_cad::Containment;

    #[test]
    fn test_coarse_pitch_table() {
        assert_eq!(iso_coarse_pitch(8.0), Some(1.25));
        assert_eq!(iso_coarse_pitch(8.4), Some(1.25));
        assert_eq!(iso_coarse_pitch(24.0), Some(3.0));
        assert_eq!(iso_coarse_pitch(7.0), None);
        assert_eq!(iso_coarse_pitch(f64::NAN), None);
    }

    #[test]
    fn test_minor_diameter() {
        // M8: 8 - 1.25 * 5 * sqrt(3) / 8
        assert_relative_eq!(minor_diameter(8.0, 1.25), 6.646_835_306_6, epsilon = 1e-9);
    }

    #[test]
    fn test_tooth_reaches_the_major_diameter() {
        let tooth = tooth(1.25).unwrap();
        let top = tooth
            .vertices()
            .iter()
            .map(|p| p.y)
            .fold(f64::MIN, f64::max);
        assert_relative_eq!(minor_diameter(8.0, 1.25) / 2.0 + top, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unsupported_diameter() {
        let params = ThreadedFastenerParams {
            diameter: 7.0,
            ..Default::default()
        };
        assert!(matches!(
            build(&Modeler::new(), &params),
            Err(PartError::InvalidParameter { name: "diameter", .. })
        ));
    }

    #[test]
    fn test_rod_starts_on_the_xy_plane() {
        let rod = build(&Modeler::new(), &ThreadedFastenerParams::default()).unwrap();
        let inside = |p: DVec3| rod.classify(p).unwrap() == Containment::Inside;
        assert!(inside(DVec3::new(0.0, 0.0, 10.0)));
        assert!(!inside(DVec3::new(0.0, 0.0, -0.5)));
        assert!(!inside(DVec3::new(5.0, 0.0, 10.0)));
    }
}
