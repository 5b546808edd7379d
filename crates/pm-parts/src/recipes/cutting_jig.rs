//! Cutting jig: a rounded bar sized in grid units minus the saw kerf, with a
//! drill hole at the centre of every grid unit

use pm_cad::{Modeler, Plane, PlaneName, Solid, shapes};
use serde::{Deserialize, Serialize};

use super::{count, non_negative, pattern, positive};
use crate::error::PartResult;
use crate::{PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CuttingJigParams {
    pub grid_unit_in_mm: f64,
    pub cutter_kerf_in_mm: f64,
    /// Drill tap size
    pub hole_diameter_in_mm: f64,
    pub length_in_gu: u32,
    pub height_in_mm: f64,
    pub fillet_in_mm: f64,
}

impl Default for CuttingJigParams {
    fn default() -> Self {
        Self {
            grid_unit_in_mm: 40.0,
            cutter_kerf_in_mm: 0.635,
            hole_diameter_in_mm: 7.5,
            length_in_gu: 2,
            height_in_mm: 10.0,
            fillet_in_mm: 2.0,
        }
    }
}

pub struct CuttingJig;

impl Recipe for CuttingJig {
    const KIND: PartKind = PartKind::CuttingJig;
    type Params = CuttingJigParams;

    fn build(modeler: &Modeler, params: &CuttingJigParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

pub fn build(modeler: &Modeler, params: &CuttingJigParams) -> PartResult<Solid> {
    let unit = positive("gridUnitInMm", params.grid_unit_in_mm)?;
    let kerf = non_negative("cutterKerfInMm", params.cutter_kerf_in_mm)?;
    let units = count("lengthInGu", params.length_in_gu)?;
    let height = positive("heightInMm", params.height_in_mm)?;
    let hole_radius = positive("holeDiameterInMm", params.hole_diameter_in_mm)? / 2.0;
    let length = positive("lengthInGu", units as f64 * unit - kerf)?;

    let outline = shapes::rounded_rectangle(length, unit, params.fillet_in_mm)?
        .translate(length / 2.0 + kerf / 2.0, 0.0);
    let xy = Plane::named(PlaneName::XY, 0.0);
    let jig = modeler
        .extrude(outline, xy, height)?
        .fillet_all(params.fillet_in_mm)?;

    let holes = pattern(
        "lengthInGu",
        &shapes::circle(hole_radius)?,
        shapes::grid_centers(units, unit).into_iter().map(|x| (x, 0.0)),
    )?;
    Ok(jig.cut(modeler.extrude(holes, xy, height)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_jig_length_leaves_room_for_the_kerf() {
        let jig = build(&Modeler::new(), &CuttingJigParams::default()).unwrap();
        let bbox = jig.bounding_box().unwrap();
        assert_relative_eq!(bbox.size().x, 79.365, epsilon = 1e-9);
        assert_relative_eq!(bbox.min.x, 0.3175, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().y, 40.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().z, 10.0, epsilon = 1e-9);
    }
}
