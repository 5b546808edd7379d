//! Wall hook: a J-shaped arm standing on a hexagonal mounting plate

use std::f64::consts::TAU;

use glam::DVec2;
use pm_cad::{ArcSense, HexOrientation, Modeler, PathBuilder, Plane, PlaneName, Profile, Solid, shapes};
use serde::{Deserialize, Serialize};

use super::positive;
use crate::error::PartResult;
use crate::{PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HookParams {
    pub hook_width: f64,
    pub hook_height: f64,
    pub hook_mount_radius: f64,
    pub hook_thickness: f64,
    pub hook_ellipse_length: f64,
    pub hook_ellipse_radius: f64,
    pub hook_lip_length: f64,
    pub hook_fastener_diameter: f64,
    pub hook_fillet: f64,
}

impl Default for HookParams {
    fn default() -> Self {
        Self {
            hook_width: 8.0,
            hook_height: 40.0,
            hook_mount_radius: 15.0,
            hook_thickness: 4.0,
            hook_ellipse_length: 10.0,
            hook_ellipse_radius: 4.0,
            hook_lip_length: 8.0,
            hook_fastener_diameter: 8.0,
            hook_fillet: 1.2,
        }
    }
}

pub struct Hook;

impl Recipe for Hook {
    const KIND: PartKind = PartKind::Hook;
    type Params = HookParams;

    fn build(modeler: &Modeler, params: &HookParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

/// Mount plate in the YZ plane with the arm rising along +Y and curling
/// out along +X
pub fn build(modeler: &Modeler, params: &HookParams) -> PartResult<Solid> {
    let width = positive("hookWidth", params.hook_width)?;
    let thickness = positive("hookThickness", params.hook_thickness)?;
    let mount_radius = positive("hookMountRadius", params.hook_mount_radius)?;
    let fastener_radius = positive("hookFastenerDiameter", params.hook_fastener_diameter)? / 2.0;
    let mount_center = mount_radius * 3f64.sqrt() / 2.0;

    let arm = modeler
        .extrude(arm_outline(params)?, Plane::named(PlaneName::XY, 0.0), width)?
        .fillet_all(params.hook_fillet)?;

    let yz = Plane::named(PlaneName::YZ, 0.0);
    let mount = modeler.extrude(mount_outline(mount_radius)?, yz, thickness)?;
    let fastener = shapes::hexihole(fastener_radius, HexOrientation::FlatBottom)?
        .translate(0.0, mount_center);
    let mount = mount
        .cut(modeler.extrude(fastener, yz, thickness)?)?
        .fillet_all(params.hook_fillet)?;

    Ok(arm.fuse(mount)?)
}

/// Side view of the arm: a straight leg, an inner half ellipse down to the
/// lip, and an outer half ellipse back over the top
fn arm_outline(params: &HookParams) -> PartResult<Profile> {
    let thickness = params.hook_thickness;
    let length = positive("hookEllipseLength", params.hook_ellipse_length)?;
    let radius = positive("hookEllipseRadius", params.hook_ellipse_radius)?;
    let lip = positive("hookLipLength", params.hook_lip_length)?;
    let foot = params.hook_mount_radius / 2.0;
    let leg = positive("hookHeight", params.hook_height - foot)?;

    Ok(PathBuilder::at(DVec2::new(0.0, foot))
        .h_line(thickness)
        .v_line(leg)
        .half_ellipse(length, 0.0, radius, ArcSense::Clockwise)
        .v_line(-lip)
        .h_line(thickness)
        .v_line(lip)
        .half_ellipse(
            -(length + 2.0 * thickness),
            0.0,
            radius + thickness,
            ArcSense::CounterClockwise,
        )
        .close()?)
}

/// Hexagon stretched downward at one vertex, standing on its long point
fn mount_outline(radius: f64) -> PartResult<Profile> {
    let vertex = |k: f64, stretch: f64| {
        let angle = k / 6.0 * TAU;
        DVec2::new(radius * angle.sin(), stretch * radius * angle.cos())
    };
    let profile = PathBuilder::at(vertex(1.0, 1.0))
        .line_to(vertex(2.0, 1.0))
        .line_to(vertex(3.0, 1.0))
        .line_to(vertex(4.0, 3.0))
        .line_to(vertex(5.0, 1.0))
        .line_to(vertex(6.0, 1.0))
        .close()?;
    Ok(profile
        .rotate(90.0, DVec2::ZERO)
        .translate(0.0, radius * 3f64.sqrt() / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mount_outline_rests_on_the_origin() {
        let mount = mount_outline(15.0).unwrap();
        let points = mount.vertices();
        let min_y = points.iter().map(|p| p.y).fold(f64::MAX, f64::min);
        let max_x = points.iter().map(|p| p.x).fold(f64::MIN, f64::max);
        let min_x = points.iter().map(|p| p.x).fold(f64::MAX, f64::min);
        assert_relative_eq!(min_y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(max_x, 22.5, epsilon = 1e-9);
        assert_relative_eq!(min_x, -15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_arm_outline_reaches_over_the_lip() {
        let arm = arm_outline(&HookParams::default()).unwrap();
        assert!(arm.is_closed());
        let points = arm.sample(0.01);
        let top = points.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        let reach = points.iter().map(|p| p.x).fold(f64::MIN, f64::max);
        assert_relative_eq!(top, 48.0, epsilon = 1e-6);
        assert_relative_eq!(reach, 18.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hook_fits_its_mount() {
        let hook = build(&Modeler::new(), &HookParams::default()).unwrap();
        let bbox = hook.bounding_box().unwrap();
        assert_relative_eq!(bbox.min.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.x, 18.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.min.y, -15.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.y, 48.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.z, 15.0 * 3f64.sqrt(), epsilon = 1e-6);
    }
}
