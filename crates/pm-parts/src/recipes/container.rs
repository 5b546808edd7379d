//! Wall container
//!
//! An open box whose walls are swept around a rounded floor outline, with a
//! back plate above it that hangs the box on the grid.

use glam::{DVec2, DVec3};
use pm_cad::{
    EdgeFilter, FilletSpec, Modeler, PathBuilder, Plane, PlaneName, Profile, Solid, SweepOptions,
    Wire, shapes,
};
use serde::{Deserialize, Serialize};

use super::{BackPlate, count, non_negative, positive};
use crate::error::{PartError, PartResult};
use crate::{PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerParams {
    pub grid_spacing_in_mm: f64,
    pub width_in_grids: u32,
    pub depth_in_grids: u32,
    pub height_in_grids: u32,
    pub fastener_diameter_in_mm: f64,
    pub wall_thickness_in_mm: f64,
    pub outer_fillet_in_mm: f64,
    /// Radius of the curve joining the floor and the walls
    pub bottom_fillet_in_mm: f64,
    pub kerf_in_mm: f64,
}

impl Default for ContainerParams {
    fn default() -> Self {
        Self {
            grid_spacing_in_mm: 40.0,
            width_in_grids: 5,
            depth_in_grids: 2,
            height_in_grids: 1,
            fastener_diameter_in_mm: 8.0,
            wall_thickness_in_mm: 1.6,
            outer_fillet_in_mm: 5.0,
            bottom_fillet_in_mm: 5.0,
            kerf_in_mm: 1.0,
        }
    }
}

pub struct Container;

impl Recipe for Container {
    const KIND: PartKind = PartKind::Container;
    type Params = ContainerParams;

    fn build(modeler: &Modeler, params: &ContainerParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

/// Box spanning `[-width, 0]` in X and `[0, depth]` in Y with its back on
/// the XZ plane
pub fn build(modeler: &Modeler, params: &ContainerParams) -> PartResult<Solid> {
    let grid = positive("gridSpacingInMm", params.grid_spacing_in_mm)?;
    let columns = count("widthInGrids", params.width_in_grids)?;
    let rows = count("depthInGrids", params.depth_in_grids)?;
    let levels = count("heightInGrids", params.height_in_grids)?;
    let wall = positive("wallThicknessInMm", params.wall_thickness_in_mm)?;
    let bottom_fillet = positive("bottomFilletInMm", params.bottom_fillet_in_mm)?;
    let kerf = non_negative("kerfInMm", params.kerf_in_mm)?;
    let fastener_diameter = positive("fastenerDiameterInMm", params.fastener_diameter_in_mm)?;
    if bottom_fillet <= wall {
        return Err(PartError::invalid(
            "bottomFilletInMm",
            format!("must exceed the wall thickness {wall}"),
        ));
    }

    let width = positive("widthInGrids", columns as f64 * grid - 2.0 * kerf)?;
    let depth = positive("depthInGrids", rows as f64 * grid - 2.0 * kerf)?;
    let box_height = positive("heightInGrids", levels as f64 * grid - kerf)?;
    let back_height = positive("gridSpacingInMm", grid - kerf)?;

    let base = shapes::rounded_rectangle_with_straight_back(
        width - 2.0 * bottom_fillet,
        depth - 2.0 * bottom_fillet,
        params.outer_fillet_in_mm,
    )?;
    let tray = tray(modeler, &base, box_height, wall, bottom_fillet)?
        .translate(DVec3::new(-bottom_fillet, bottom_fillet, 0.0))?;

    let back = BackPlate {
        width,
        height: back_height,
        thickness: wall,
        corner_radius: params.outer_fillet_in_mm,
        grid_spacing: grid,
        columns,
        fastener_diameter,
        kerf,
        hole_height: grid / 2.0,
    }
    .build(modeler)?
    .translate_z(box_height)?;

    let rims = EdgeFilter::either([
        EdgeFilter::in_named_plane(PlaneName::XY, box_height),
        EdgeFilter::in_named_plane(PlaneName::XZ, 0.0),
        EdgeFilter::in_named_plane(PlaneName::XZ, -wall),
    ]);
    Ok(tray.fuse(back)?.fillet(&FilletSpec::new().with(rims, wall / 3.0))?)
}

/// Walls swept around `base` on the XY plane, fused with a floor of the
/// same outline
fn tray(
    modeler: &Modeler,
    base: &Profile,
    box_height: f64,
    wall: f64,
    bottom_fillet: f64,
) -> PartResult<Solid> {
    let xy = Plane::named(PlaneName::XY, 0.0);
    let walls = modeler.sweep(
        wall_profile(box_height, wall, bottom_fillet)?,
        &Wire::planar(base, xy),
        SweepOptions {
            with_contact: true,
            ..Default::default()
        },
    )?;
    let floor = modeler.extrude(base.clone(), xy, wall)?;
    Ok(walls.fuse(floor)?)
}

/// Cross-section of a wall: x points out of the box, y up
///
/// The wall leaves the floor edge at 45° and bends upward through the bottom
/// fillet; the inner face curves back down onto the floor.
fn wall_profile(box_height: f64, wall: f64, bottom_fillet: f64) -> PartResult<Profile> {
    Ok(PathBuilder::new()
        .line(bottom_fillet, bottom_fillet)
        .custom_corner(bottom_fillet)
        .v_line(box_height - bottom_fillet)
        .h_line(-wall)
        .v_line(-box_height + wall / 2.0 + bottom_fillet)
        .custom_corner(bottom_fillet - wall)
        .line_to(DVec2::new(0.0, wall))
        .close()?)
}
