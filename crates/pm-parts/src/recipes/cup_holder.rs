//! Cup holder: a flat ring that holds a cup by its rim, standing off a back
//! plate hung on the grid

use glam::DVec2;
use pm_cad::{ArcSense, Drawing, Modeler, PathBuilder, Plane, PlaneName, Solid, shapes};
use serde::{Deserialize, Serialize};

use super::{BackPlate, count, non_negative, positive};
use crate::error::PartResult;
use crate::{PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CupHolderParams {
    pub grid_spacing_in_mm: f64,
    pub width_in_grids: u32,
    pub fastener_diameter_in_mm: f64,
    pub cup_edge_width_in_mm: f64,
    pub cup_inner_diameter_in_mm: f64,
    pub space_between_wall_and_cup_in_mm: f64,
    /// Cut the ring open in the middle
    pub has_empty_inner: bool,
    pub wall_thickness_in_mm: f64,
    pub outer_fillet_in_mm: f64,
    pub kerf_in_mm: f64,
}

impl Default for CupHolderParams {
    fn default() -> Self {
        Self {
            grid_spacing_in_mm: 40.0,
            width_in_grids: 2,
            fastener_diameter_in_mm: 8.0,
            cup_edge_width_in_mm: 5.0,
            cup_inner_diameter_in_mm: 100.0,
            space_between_wall_and_cup_in_mm: 10.0,
            has_empty_inner: true,
            wall_thickness_in_mm: 1.6,
            outer_fillet_in_mm: 5.0,
            kerf_in_mm: 1.0,
        }
    }
}

pub struct CupHolder;

impl Recipe for CupHolder {
    const KIND: PartKind = PartKind::CupHolder;
    type Params = CupHolderParams;

    fn build(modeler: &Modeler, params: &CupHolderParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

/// Holder with its back plate in the YZ plane and the ring along +X
pub fn build(modeler: &Modeler, params: &CupHolderParams) -> PartResult<Solid> {
    let grid = positive("gridSpacingInMm", params.grid_spacing_in_mm)?;
    let columns = count("widthInGrids", params.width_in_grids)?;
    let wall = positive("wallThicknessInMm", params.wall_thickness_in_mm)?;
    let kerf = non_negative("kerfInMm", params.kerf_in_mm)?;
    let fastener_diameter = positive("fastenerDiameterInMm", params.fastener_diameter_in_mm)?;
    let width = positive("widthInGrids", columns as f64 * grid - 2.0 * kerf)?;
    let back_height = positive("gridSpacingInMm", grid - 2.0 * kerf)?;

    let ring = modeler.extrude(
        cup_outline(params, width)?,
        Plane::named(PlaneName::XY, 0.0),
        wall,
    )?;
    let back = BackPlate {
        width,
        height: back_height,
        thickness: wall,
        corner_radius: params.outer_fillet_in_mm,
        grid_spacing: grid,
        columns,
        fastener_diameter,
        kerf,
        hole_height: grid / 2.0 - kerf,
    }
    .build(modeler)?
    .rotate_z(-90.0)?;

    Ok(ring.fuse(back)?.fillet_all(wall / 3.0)?)
}

/// Ring outline, mirrored about the line `y = width / 2`
///
/// The outer edge follows the cup's rim on the far side and sweeps back to
/// the wall with a tangent arc.
fn cup_outline(params: &CupHolderParams, width: f64) -> PartResult<Drawing> {
    let wall = params.wall_thickness_in_mm;
    let space = non_negative("spaceBetweenWallAndCupInMm", params.space_between_wall_and_cup_in_mm)?;
    let edge = positive("cupEdgeWidthInMm", params.cup_edge_width_in_mm)?;
    let inner = positive("cupInnerDiameterInMm", params.cup_inner_diameter_in_mm)?;
    let total = inner + 2.0 * edge;
    let center = DVec2::new(wall + space + total / 2.0, width / 2.0);

    let outline = PathBuilder::at(DVec2::new(wall + space + total, center.y))
        .ellipse_to(
            DVec2::new(center.x, center.y - total / 2.0),
            total / 2.0,
            total / 2.0,
            90.0,
            false,
            ArcSense::Clockwise,
        )
        .tangent_arc_to(DVec2::new(wall, 0.0))
        .h_line(-wall)
        .v_line(center.y)
        .close_with_mirror()?;

    if !params.has_empty_inner {
        return Ok(outline.into());
    }
    let opening = shapes::circle(inner / 2.0)?.translate(center.x, center.y);
    Ok(outline.cut(opening)?)
}
