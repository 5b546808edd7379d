//! Grid beam
//!
//! A square bar with rounded long edges and a fastener hole through both
//! cross axes of every grid cell.

use pm_cad::{EdgeFilter, FilletSpec, HexOrientation, Modeler, Plane, PlaneName, Solid, shapes};
use serde::{Deserialize, Serialize};

use super::{count, pattern, positive};
use crate::error::PartResult;
use crate::{PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BeamParams {
    pub grid_spacing_in_mm: f64,
    pub length_in_grids: u32,
    pub fastener_diameter_in_mm: f64,
    pub outer_fillet_in_mm: f64,
    pub hole_fillet_in_mm: f64,
    /// Hexagonal holes instead of round ones
    pub use_hexiholes: bool,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            grid_spacing_in_mm: 20.0,
            length_in_grids: 5,
            fastener_diameter_in_mm: 8.0,
            outer_fillet_in_mm: 2.0,
            hole_fillet_in_mm: 0.5,
            use_hexiholes: true,
        }
    }
}

pub struct Beam;

impl Recipe for Beam {
    const KIND: PartKind = PartKind::Beam;
    type Params = BeamParams;

    fn build(modeler: &Modeler, params: &BeamParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

/// Bar along +X from the origin, centred on the X axis
pub fn build(modeler: &Modeler, params: &BeamParams) -> PartResult<Solid> {
    let grid = positive("gridSpacingInMm", params.grid_spacing_in_mm)?;
    let cells = count("lengthInGrids", params.length_in_grids)?;
    let hole_radius = positive("fastenerDiameterInMm", params.fastener_diameter_in_mm)? / 2.0;
    let length = cells as f64 * grid;

    let bar = modeler.extrude(
        shapes::rounded_rectangle(grid, grid, params.outer_fillet_in_mm)?,
        Plane::named(PlaneName::YZ, 0.0),
        length,
    )?;

    let hole = if params.use_hexiholes {
        shapes::hexihole(hole_radius, HexOrientation::VBottom)?
    } else {
        shapes::circle(hole_radius)?
    };
    let holes = pattern(
        "lengthInGrids",
        &hole,
        shapes::grid_centers(cells, grid).into_iter().map(|x| (x, 0.0)),
    )?;
    let across_y = modeler.extrude(holes.clone(), Plane::named(PlaneName::XZ, -grid / 2.0), grid)?;
    let across_z = modeler.extrude(holes, Plane::named(PlaneName::XY, -grid / 2.0), grid)?;
    let beam = bar.cut(across_y)?.cut(across_z)?;

    let ends = EdgeFilter::either([
        EdgeFilter::in_named_plane(PlaneName::YZ, 0.0),
        EdgeFilter::in_named_plane(PlaneName::YZ, length),
    ]);
    let spec = FilletSpec::new()
        .with(ends, params.outer_fillet_in_mm)
        .with(EdgeFilter::All, params.hole_fillet_in_mm);
    Ok(beam.fillet(&spec)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PartError;
    use approx::assert_relative_eq;
    use glam::DVec3;
    use pm_cad::Containment;
    use serde_json::json;

    #[test]
    fn test_missing_keys_take_defaults() {
        let params: BeamParams = serde_json::from_value(json!({ "lengthInGrids": 3 })).unwrap();
        assert_eq!(params.length_in_grids, 3);
        assert_eq!(params.grid_spacing_in_mm, 20.0);
        assert!(params.use_hexiholes);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        let params = BeamParams {
            length_in_grids: 0,
            ..Default::default()
        };
        let err = build(&Modeler::new(), &params).unwrap_err();
        assert!(matches!(
            err,
            PartError::InvalidParameter { name: "lengthInGrids", .. }
        ));
    }

    #[test]
    fn test_round_holes_cross_both_axes() {
        let params = BeamParams {
            use_hexiholes: false,
            ..Default::default()
        };
        let beam = build(&Modeler::new(), &params).unwrap();
        let size = beam.bounding_box().unwrap().size();
        assert_relative_eq!(size.x, 100.0, epsilon = 1e-9);
        assert_relative_eq!(size.y, 20.0, epsilon = 1e-9);
        assert_relative_eq!(size.z, 20.0, epsilon = 1e-9);

        let at = |p: DVec3| beam.classify(p).unwrap();
        for x in [10.0, 30.0, 50.0, 70.0, 90.0] {
            assert_eq!(at(DVec3::new(x, 7.0, 0.0)), Containment::Outside);
            assert_eq!(at(DVec3::new(x, 0.0, 7.0)), Containment::Outside);
        }
        assert_eq!(at(DVec3::new(20.0, 7.0, 0.0)), Containment::Inside);
    }
}
