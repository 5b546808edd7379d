//! Dowel holder base: a stadium-shaped plate spanning one grid spacing, with
//! a fastener hole at the centre of each rounded end

use glam::DVec2;
use pm_cad::{ArcSense, Modeler, PathBuilder, Plane, PlaneName, Solid, shapes};
use serde::{Deserialize, Serialize};

use super::{pattern, positive};
use crate::error::PartResult;
use crate::{PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DowelHolderParams {
    pub grid_spacing_in_mm: f64,
    pub dowel_diameter_in_mm: f64,
    pub fastener_hole_diameter_in_mm: f64,
    pub fastener_cap_diameter_in_mm: f64,
    pub bottom_thickness_in_mm: f64,
    pub edge_thickness_in_mm: f64,
}

impl Default for DowelHolderParams {
    fn default() -> Self {
        Self {
            grid_spacing_in_mm: 40.0,
            dowel_diameter_in_mm: 22.0,
            fastener_hole_diameter_in_mm: 8.0,
            fastener_cap_diameter_in_mm: 13.0,
            bottom_thickness_in_mm: 1.0,
            edge_thickness_in_mm: 2.0,
        }
    }
}

pub struct DowelHolder;

impl Recipe for DowelHolder {
    const KIND: PartKind = PartKind::DowelHolder;
    type Params = DowelHolderParams;

    fn build(modeler: &Modeler, params: &DowelHolderParams) -> PartResult<PartOutput> {
        Ok(PartOutput::single(Self::KIND.name(), build(modeler, params)?))
    }
}

/// The bottom plate, centred on the origin
///
/// The dowel diameter is validated but does not shape the plate yet.
pub fn build(modeler: &Modeler, params: &DowelHolderParams) -> PartResult<Solid> {
    let spacing = positive("gridSpacingInMm", params.grid_spacing_in_mm)?;
    positive("dowelDiameterInMm", params.dowel_diameter_in_mm)?;
    let hole_radius = positive("fastenerHoleDiameterInMm", params.fastener_hole_diameter_in_mm)? / 2.0;
    let cap_radius = positive("fastenerCapDiameterInMm", params.fastener_cap_diameter_in_mm)? / 2.0;
    let thickness = positive("bottomThicknessInMm", params.bottom_thickness_in_mm)?;
    let edge = positive("edgeThicknessInMm", params.edge_thickness_in_mm)?;

    let half = spacing / 2.0;
    let end_radius = cap_radius + edge;
    let outline = PathBuilder::at(DVec2::new(-half, end_radius))
        .half_ellipse_to(DVec2::new(-half, -end_radius), end_radius, ArcSense::CounterClockwise)
        .h_line_to(half)
        .half_ellipse_to(DVec2::new(half, end_radius), end_radius, ArcSense::CounterClockwise)
        .close()?;
    let holes = pattern(
        "gridSpacingInMm",
        &shapes::circle(hole_radius)?,
        [(half, 0.0), (-half, 0.0)],
    )?;

    Ok(modeler.extrude(
        outline.cut(holes)?,
        Plane::named(PlaneName::XY, 0.0),
        thickness,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;
    use pm_cad::Containment;

    #[test]
    fn test_plate_is_a_stadium_with_two_holes() {
        let plate = build(&Modeler::new(), &DowelHolderParams::default()).unwrap();
        let bbox = plate.bounding_box().unwrap();
        assert_relative_eq!(bbox.min.x, -28.5, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.x, 28.5, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().y, 17.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().z, 1.0, epsilon = 1e-9);

        for x in [-20.0, 20.0] {
            let hole = plate.classify(DVec3::new(x, 0.0, 0.5)).unwrap();
            assert_eq!(hole, Containment::Outside);
        }
        let middle = plate.classify(DVec3::new(0.0, 0.0, 0.5)).unwrap();
        assert_eq!(middle, Containment::Inside);
    }
}
