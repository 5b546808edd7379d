//! Print-in-place hinge
//!
//! Two leaves meet at a row of interleaved knuckles. The even side carries
//! the even knuckles and the pins; the odd side carries the odd knuckles with
//! a clearance bore around each pin. Each leaf has a row of fastener holes
//! with hexagonal counterbores for the fastener caps.

use glam::DVec2;
use pm_cad::{
    ArcSense, HexOrientation, LoftOptions, Modeler, PathBuilder, Plane, PlaneName, Solid,
    SplineOptions, Wire, shapes,
};
use serde::{Deserialize, Serialize};

use super::{count, non_negative, pattern, positive};
use crate::constants::{EVEN_SIDE_COLOR, ODD_SIDE_COLOR};
use crate::error::{PartError, PartResult};
use crate::{PartBody, PartKind, PartOutput, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HingeParams {
    pub even_side: bool,
    pub odd_side: bool,
    pub num_fasteners: u32,
    pub num_odd_knuckles: u32,
    pub fastener_spacing: f64,
    pub fastener_hole_diameter: f64,
    pub fastener_cap_diameter: f64,
    pub fastener_cap_height: f64,
    /// Material around the fastener cap
    pub fastener_margin: f64,
    pub thickness: f64,
    pub knuckle_clearance: f64,
    /// Share of the knuckle row taken by the even knuckles
    pub knuckle_even_odd_ratio: f64,
    pub leaf_fillet: f64,
    pub knuckle_fillet: f64,
    pub fastener_fillet: f64,
}

impl Default for HingeParams {
    fn default() -> Self {
        Self {
            even_side: true,
            odd_side: true,
            num_fasteners: 2,
            num_odd_knuckles: 1,
            fastener_spacing: 40.0,
            fastener_hole_diameter: 8.0,
            fastener_cap_diameter: 13.0,
            fastener_cap_height: 3.5,
            fastener_margin: 8.5,
            thickness: 6.0,
            knuckle_clearance: 0.4,
            knuckle_even_odd_ratio: 0.6,
            leaf_fillet: 2.0,
            knuckle_fillet: 2.0,
            fastener_fillet: 1.0,
        }
    }
}

/// Dimensions derived from the hinge parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HingeLayout {
    pub pin_radius: f64,
    pub even_knuckles: usize,
    pub odd_knuckles: usize,
    /// Radius of the hexagonal pad around each fastener
    pub connector_radius: f64,
    pub leaf_height: f64,
    pub even_knuckle_height: f64,
    pub odd_knuckle_height: f64,
    pub clearance: f64,
}

impl HingeLayout {
    pub fn new(params: &HingeParams) -> PartResult<Self> {
        let fasteners = count("numFasteners", params.num_fasteners)?;
        let odd_knuckles = count("numOddKnuckles", params.num_odd_knuckles)?;
        let thickness = positive("thickness", params.thickness)?;
        let spacing = positive("fastenerSpacing", params.fastener_spacing)?;
        let cap_diameter = positive("fastenerCapDiameter", params.fastener_cap_diameter)?;
        let margin = non_negative("fastenerMargin", params.fastener_margin)?;
        let clearance = non_negative("knuckleClearance", params.knuckle_clearance)?;
        let ratio = params.knuckle_even_odd_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PartError::invalid(
                "knuckleEvenOddRatio",
                format!("must lie strictly between 0 and 1, got {ratio}"),
            ));
        }

        let even_knuckles = odd_knuckles + 1;
        let knuckles = odd_knuckles + even_knuckles;
        let leaf_height = spacing * (fasteners - 1) as f64 + cap_diameter + 2.0 * margin;
        let knuckle_total = positive(
            "knuckleClearance",
            leaf_height - clearance * (knuckles - 1) as f64,
        )?;
        Ok(Self {
            pin_radius: thickness / 2.0,
            even_knuckles,
            odd_knuckles,
            connector_radius: cap_diameter / 2.0 + margin,
            leaf_height,
            even_knuckle_height: knuckle_total * ratio / even_knuckles as f64,
            odd_knuckle_height: knuckle_total * (1.0 - ratio) / odd_knuckles as f64,
            clearance,
        })
    }

    pub fn knuckle_count(&self) -> usize {
        self.even_knuckles + self.odd_knuckles
    }

    /// Start along Y and height of knuckle `index`; even indices belong to
    /// the even side
    pub fn knuckle(&self, index: usize) -> (f64, f64) {
        let pair = (index / 2) as f64 * (self.even_knuckle_height + self.odd_knuckle_height);
        let odd = index % 2 == 1;
        let start = pair
            + if odd { self.even_knuckle_height } else { 0.0 }
            + index as f64 * self.clearance;
        let height = if odd {
            self.odd_knuckle_height
        } else {
            self.even_knuckle_height
        };
        (start, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Even,
    Odd,
}

pub struct Hinge;

impl Recipe for Hinge {
    const KIND: PartKind = PartKind::Hinge;
    type Params = HingeParams;

    fn build(modeler: &Modeler, params: &HingeParams) -> PartResult<PartOutput> {
        build(modeler, params)
    }
}

/// The selected sides, even side first; the pin axis runs along +Y at
/// height `thickness` above the XY plane
pub fn build(modeler: &Modeler, params: &HingeParams) -> PartResult<PartOutput> {
    let layout = HingeLayout::new(params)?;
    let mut bodies = Vec::new();
    if params.even_side {
        bodies.push(PartBody {
            name: "even-side".to_string(),
            solid: side(modeler, params, &layout, Side::Even)?,
            color: Some(EVEN_SIDE_COLOR),
        });
    }
    if params.odd_side {
        bodies.push(PartBody {
            name: "odd-side".to_string(),
            solid: side(modeler, params, &layout, Side::Odd)?,
            color: Some(ODD_SIDE_COLOR),
        });
    }
    match bodies.len() {
        0 => Err(PartError::invalid("evenSide", "select the even side, the odd side or both")),
        1 => {
            let mut body = bodies.remove(0);
            body.color = None;
            Ok(PartOutput::new(vec![body]))
        }
        _ => Ok(PartOutput::new(bodies)),
    }
}

fn side(
    modeler: &Modeler,
    params: &HingeParams,
    layout: &HingeLayout,
    which: Side,
) -> PartResult<Solid> {
    let thickness = params.thickness;
    let clearance = layout.clearance;
    let flip = Plane::named(PlaneName::XY, thickness);

    let mut side = leaf(modeler, params, layout)?;
    for index in 0..layout.knuckle_count() {
        let (start, height) = layout.knuckle(index);
        let lobe = knuckle(modeler, thickness, height, params.knuckle_fillet)?
            .translate_y(start)?;
        let pin_height = height + 2.0 * clearance;
        side = match (index % 2 == 0, which) {
            (true, Side::Even) => side.fuse(lobe)?,
            (true, Side::Odd) => side.cut(lobe.mirror(flip)?)?,
            (false, Side::Even) => {
                let pin = pin(modeler, layout.pin_radius, pin_height, thickness)?
                    .translate_y(start - clearance)?;
                side.cut(lobe.mirror(flip)?)?.fuse(pin)?
            }
            (false, Side::Odd) => {
                let bore = pin(modeler, layout.pin_radius + clearance, pin_height, thickness)?
                    .translate_y(start - clearance)?;
                side.fuse(lobe.cut(bore)?)?
            }
        };
    }

    match which {
        Side::Even => Ok(side),
        Side::Odd => Ok(side.mirror(Plane::named(PlaneName::YZ, 0.0))?),
    }
}

/// Flat leaf along +X from `x = thickness`, ending in one hexagonal pad per
/// fastener
fn leaf(modeler: &Modeler, params: &HingeParams, layout: &HingeLayout) -> PartResult<Solid> {
    let thickness = params.thickness;
    let spacing = params.fastener_spacing;
    let pad = layout.connector_radius;
    let fasteners = params.num_fasteners as usize;
    if spacing / 2.0 <= thickness {
        return Err(PartError::invalid(
            "fastenerSpacing",
            format!("must exceed twice the thickness {thickness}"),
        ));
    }
    let hole_radius = positive("fastenerHoleDiameter", params.fastener_hole_diameter)? / 2.0;
    let cap_height = positive("fastenerCapHeight", params.fastener_cap_height)?;
    if cap_height >= thickness {
        return Err(PartError::invalid(
            "fastenerCapHeight",
            format!("must be less than the thickness {thickness}"),
        ));
    }

    let mut pen = PathBuilder::at(DVec2::new(thickness, 0.0))
        .h_line_to(spacing / 2.0)
        .polar_line(pad, 30.0)
        .v_line(pad / 2.0);
    if fasteners > 1 {
        pen = pen.v_line((fasteners - 1) as f64 * spacing);
    }
    let outline = pen
        .v_line(pad / 2.0)
        .polar_line(pad, 150.0)
        .h_line_to(thickness)
        .close()?;
    let leaf = modeler
        .extrude(outline, Plane::named(PlaneName::XY, 0.0), thickness)?
        .fillet_all(params.leaf_fillet)?;

    let centers: Vec<(f64, f64)> = (0..fasteners)
        .map(|i| (spacing / 2.0, i as f64 * spacing + pad))
        .collect();
    let holes = pattern(
        "numFasteners",
        &shapes::hexihole(hole_radius, HexOrientation::VBottom)?,
        centers.iter().copied(),
    )?;
    let caps = pattern(
        "numFasteners",
        &shapes::hexihole(params.fastener_cap_diameter / 2.0, HexOrientation::VBottom)?,
        centers,
    )?;
    let holes = modeler.extrude(holes, Plane::named(PlaneName::XY, 0.0), thickness)?;
    let caps = modeler.extrude(
        caps,
        Plane::named(PlaneName::XY, thickness - cap_height),
        cap_height,
    )?;
    Ok(leaf.cut(holes)?.cut(caps)?.fillet_all(params.fastener_fillet)?)
}

/// Knuckle spanning `[0, height]` along Y, wrapped around the pin axis
fn knuckle(modeler: &Modeler, thickness: f64, height: f64, fillet: f64) -> PartResult<Solid> {
    let profile = PathBuilder::new()
        .half_ellipse_to(DVec2::new(0.0, 2.0 * thickness), thickness, ArcSense::Clockwise)
        .smooth_spline_to(
            DVec2::new(2.0 * thickness, thickness),
            SplineOptions::new(2.0, 2.0),
        )
        .v_line_to(0.0)
        .close()?;
    Ok(modeler
        .extrude(profile, Plane::named(PlaneName::XZ, 0.0), -height)?
        .fillet_all(fillet)?)
}

/// Waisted pin spanning `[0, height]` along Y on the pin axis
fn pin(modeler: &Modeler, radius: f64, height: f64, thickness: f64) -> PartResult<Solid> {
    let mut sections = Vec::new();
    for (r, offset) in [(radius, 0.0), (radius / 2.0, height / 2.0), (radius, height)] {
        sections.push(Wire::planar(
            &shapes::circle(r)?,
            Plane::named(PlaneName::XZ, offset),
        ));
    }
    let pin = modeler.loft(&sections, LoftOptions { ruled: false })?;
    Ok(pin.mirror(Plane::named(PlaneName::XZ, 0.0))?.translate_z(thickness)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;
    use pm_cad::Containment;

    #[test]
    fn test_layout_fills_the_leaf() {
        let layout = HingeLayout::new(&HingeParams::default()).unwrap();
        assert_relative_eq!(layout.leaf_height, 70.0);
        assert_relative_eq!(layout.connector_radius, 15.0);
        assert_eq!(layout.knuckle_count(), 3);

        let (last_start, last_height) = layout.knuckle(layout.knuckle_count() - 1);
        assert_relative_eq!(last_start + last_height, layout.leaf_height, epsilon = 1e-9);

        let (first_start, first_height) = layout.knuckle(0);
        let (second_start, _) = layout.knuckle(1);
        assert_relative_eq!(first_start, 0.0);
        assert_relative_eq!(second_start - first_height, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_knuckle_shares() {
        let layout = HingeLayout::new(&HingeParams::default()).unwrap();
        let even: f64 = (0..3).step_by(2).map(|i| layout.knuckle(i).1).sum();
        let odd = layout.knuckle(1).1;
        assert_relative_eq!(even / (even + odd), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_ratio_must_split_the_row() {
        let params = HingeParams {
            knuckle_even_odd_ratio: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            HingeLayout::new(&params),
            Err(PartError::InvalidParameter { name: "knuckleEvenOddRatio", .. })
        ));
    }

    #[test]
    fn test_no_side_selected() {
        let params = HingeParams {
            even_side: false,
            odd_side: false,
            ..Default::default()
        };
        assert!(build(&Modeler::new(), &params).is_err());
    }

    #[test]
    fn test_both_sides_are_coloured() {
        let output = build(&Modeler::new(), &HingeParams::default()).unwrap();
        let bodies = output.bodies();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].name, "even-side");
        assert_eq!(bodies[0].color, Some(EVEN_SIDE_COLOR));
        assert_eq!(bodies[1].name, "odd-side");
        assert_eq!(bodies[1].color, Some(ODD_SIDE_COLOR));

        // The first knuckle wraps the pin axis at z = thickness
        let even = &bodies[0].solid;
        let knuckle = even.classify(DVec3::new(-4.0, 10.0, 6.0)).unwrap();
        assert_eq!(knuckle, Containment::Inside);
        // The waisted pin runs through the odd knuckle
        let pin = even.classify(DVec3::new(0.0, 35.0, 6.0)).unwrap();
        assert_eq!(pin, Containment::Inside);

        // The odd side is mirrored across YZ and bored for the pin
        let odd = &bodies[1].solid;
        let bore = odd.classify(DVec3::new(0.0, 35.0, 6.0)).unwrap();
        assert_eq!(bore, Containment::Outside);
        let knuckle = odd.classify(DVec3::new(5.0, 35.0, 6.0)).unwrap();
        assert_eq!(knuckle, Containment::Inside);
        let gap = odd.classify(DVec3::new(5.0, 10.0, 6.0)).unwrap();
        assert_eq!(gap, Containment::Outside);
    }

    #[test]
    fn test_single_side_is_uncoloured() {
        let params = HingeParams {
            odd_side: false,
            ..Default::default()
        };
        let output = build(&Modeler::new(), &params).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.bodies()[0].name, "even-side");
        assert_eq!(output.bodies()[0].color, None);
    }
}
