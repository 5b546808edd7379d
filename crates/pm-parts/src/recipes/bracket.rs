//! Corner bracket
//!
//! Two rounded plates with a flat-bottom hexihole in every grid cell, joined
//! along their straight backs into an L. The bottom plate stands in the XZ
//! plane, the top plate in the YZ plane and the bracket runs along +Z.

use glam::DVec3;
use pm_cad::{
    Axis3D, Drawing, EdgeFilter, FilletSpec, HexOrientation, Modeler, Plane, PlaneName, Solid,
    shapes,
};
use serde::{Deserialize, Serialize};

use super::{count, non_negative, pattern, positive};
use crate::error::PartResult;
use crate::{PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BracketParams {
    pub grid_spacing_in_mm: f64,
    pub width_in_grids: u32,
    pub top_length_in_grids: u32,
    pub bottom_length_in_grids: u32,
    pub fastener_diameter_in_mm: f64,
    pub wall_thickness_in_mm: f64,
    pub round_radius_in_mm: f64,
    pub inner_fillet_in_mm: f64,
    pub kerf_in_mm: f64,
}

impl Default for BracketParams {
    fn default() -> Self {
        Self {
            grid_spacing_in_mm: 40.0,
            width_in_grids: 2,
            top_length_in_grids: 1,
            bottom_length_in_grids: 1,
            fastener_diameter_in_mm: 8.0,
            wall_thickness_in_mm: 1.6,
            round_radius_in_mm: 5.0,
            inner_fillet_in_mm: 5.0,
            kerf_in_mm: 1.0,
        }
    }
}

pub struct Bracket;

impl Recipe for Bracket {
    const KIND: PartKind = PartKind::Bracket;
    type Params = BracketParams;

    fn build(modeler: &Modeler, params: &BracketParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

pub fn build(modeler: &Modeler, params: &BracketParams) -> PartResult<Solid> {
    let grid = positive("gridSpacingInMm", params.grid_spacing_in_mm)?;
    let columns = count("widthInGrids", params.width_in_grids)?;
    let top_rows = count("topLengthInGrids", params.top_length_in_grids)?;
    let bottom_rows = count("bottomLengthInGrids", params.bottom_length_in_grids)?;
    let hole_radius = positive("fastenerDiameterInMm", params.fastener_diameter_in_mm)? / 2.0;
    let wall = positive("wallThicknessInMm", params.wall_thickness_in_mm)?;
    let kerf = non_negative("kerfInMm", params.kerf_in_mm)?;
    let radius = params.round_radius_in_mm;

    let xz = Plane::named(PlaneName::XZ, 0.0);
    let bottom = modeler
        .extrude(side(grid, columns, bottom_rows, hole_radius, radius, kerf)?, xz, wall)?
        .rotate(90.0, Axis3D::y())?
        .translate_y(wall)?;
    let top = modeler
        .extrude(side(grid, columns, top_rows, hole_radius, radius, kerf)?, xz, wall)?
        .rotate(90.0, Axis3D::y())?
        .rotate_z(90.0)?;

    let inner_corner = EdgeFilter::contains_point(DVec3::new(wall, wall, 0.5 * columns as f64 * grid));
    let spec = FilletSpec::new()
        .with(inner_corner, params.inner_fillet_in_mm)
        .with(EdgeFilter::All, wall / 3.0);
    Ok(top.fuse(bottom)?.fillet(&spec)?)
}

/// One plate of the bracket, its straight back on the X axis
fn side(
    grid: f64,
    columns: usize,
    rows: usize,
    hole_radius: f64,
    round_radius: f64,
    kerf: f64,
) -> PartResult<Drawing> {
    let width = positive("widthInGrids", columns as f64 * grid - 2.0 * kerf)?;
    let length = positive("lengthInGrids", rows as f64 * grid - kerf)?;
    let plate = shapes::rounded_rectangle_with_straight_back(width, length, round_radius)?;
    let hole = shapes::hexihole(hole_radius, HexOrientation::FlatBottom)?;
    let holes = pattern(
        "widthInGrids",
        &hole,
        shapes::grid_cells(columns, rows, grid)
            .into_iter()
            .map(|cell| (kerf - cell.x, cell.y - kerf)),
    )?;
    Ok(plate.cut(holes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pm_cad::Containment;

    #[test]
    fn test_side_has_a_hole_per_cell() {
        let drawing = side(40.0, 2, 3, 4.0, 5.0, 1.0).unwrap();
        assert_eq!(drawing.profiles().len(), 7);
    }

    #[test]
    fn test_bracket_is_an_l() {
        let bracket = build(&Modeler::new(), &BracketParams::default()).unwrap();
        let bbox = bracket.bounding_box().unwrap();
        assert_relative_eq!(bbox.min.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.x, 39.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.y, 39.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.z, 78.0, epsilon = 1e-6);

        // Inside each leg, and in the open corner between them
        let leg = bracket.classify(DVec3::new(30.0, 0.8, 10.0)).unwrap();
        assert_eq!(leg, Containment::Inside);
        let leg = bracket.classify(DVec3::new(0.8, 30.0, 10.0)).unwrap();
        assert_eq!(leg, Containment::Inside);
        let corner = bracket.classify(DVec3::new(20.0, 20.0, 10.0)).unwrap();
        assert_eq!(corner, Containment::Outside);
    }
}
