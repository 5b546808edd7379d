//! Part recipes, one module per part
//!
//! Each module exposes its parameter struct, a `build` function returning the
//! finished solid(s) and a unit type implementing [`crate::Recipe`].

pub mod beam;
pub mod bracket;
pub mod container;
pub mod cup_holder;
pub mod cutting_jig;
pub mod dowel_holder;
pub mod fastener;
pub mod hinge;
pub mod hook;

pub use beam::{Beam, BeamParams};
pub use bracket::{Bracket, BracketParams};
pub use container::{Container, ContainerParams};
pub use cup_holder::{CupHolder, CupHolderParams};
pub use cutting_jig::{CuttingJig, CuttingJigParams};
pub use dowel_holder::{DowelHolder, DowelHolderParams};
pub use fastener::{ThreadedFastener, ThreadedFastenerParams, iso_coarse_pitch};
pub use hinge::{Hinge, HingeLayout, HingeParams};
pub use hook::{Hook, HookParams};

use pm_cad::{Drawing, HexOrientation, Modeler, Plane, PlaneName, Profile, Solid, shapes};

use crate::error::{PartError, PartResult};

/// Reject non-finite or non-positive lengths
pub(crate) fn positive(name: &'static str, value: f64) -> PartResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PartError::invalid(name, format!("must be positive, got {value}")))
    }
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> PartResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PartError::invalid(name, format!("must not be negative, got {value}")))
    }
}

/// Grid and fastener counts start at one
pub(crate) fn count(name: &'static str, value: u32) -> PartResult<usize> {
    if value >= 1 {
        Ok(value as usize)
    } else {
        Err(PartError::invalid(name, "must be at least 1"))
    }
}

/// Union of `profile` placed at each of `centers`
pub(crate) fn pattern(
    name: &'static str,
    profile: &Profile,
    centers: impl IntoIterator<Item = (f64, f64)>,
) -> PartResult<Drawing> {
    let mut row: Option<Drawing> = None;
    for (x, y) in centers {
        let placed = profile.translate(x, y);
        row = Some(match row {
            Some(row) => row.fuse(placed)?,
            None => placed.into(),
        });
    }
    row.ok_or_else(|| PartError::invalid(name, "must be at least 1"))
}

/// A wall plate that hangs the part on the grid: a rounded plate with a
/// straight back and one v-bottom hexihole per grid column
///
/// The plate lies in the XZ plane with its thickness along +Y, spans
/// `[-width, 0]` in X and `[0, height]` in Z.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BackPlate {
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
    pub corner_radius: f64,
    pub grid_spacing: f64,
    pub columns: usize,
    pub fastener_diameter: f64,
    pub kerf: f64,
    /// Height of the fastener holes above the bottom of the plate
    pub hole_height: f64,
}

impl BackPlate {
    pub fn build(&self, modeler: &Modeler) -> PartResult<Solid> {
        let plate = shapes::rounded_rectangle_with_straight_back(
            self.width,
            self.height,
            self.corner_radius,
        )?;
        let hole = shapes::hexihole(self.fastener_diameter / 2.0, HexOrientation::VBottom)?;
        let holes = pattern(
            "widthInGrids",
            &hole,
            (0..self.columns).map(|i| {
                (
                    self.kerf - (0.5 + i as f64) * self.grid_spacing,
                    self.hole_height,
                )
            }),
        )?;
        let back = modeler.extrude(
            plate.cut(holes)?,
            Plane::named(PlaneName::XZ, 0.0),
            self.thickness,
        )?;
        Ok(back.translate_y(self.thickness)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;
    use pm_cad::Containment;

    #[test]
    fn test_parameter_checks() {
        assert!(positive("a", 1.0).is_ok());
        assert!(positive("a", 0.0).is_err());
        assert!(positive("a", f64::NAN).is_err());
        assert!(non_negative("a", 0.0).is_ok());
        assert!(matches!(
            count("lengthInGrids", 0),
            Err(PartError::InvalidParameter { name: "lengthInGrids", .. })
        ));
    }

    #[test]
    fn test_pattern_needs_a_center() {
        let dot = shapes::circle(1.0).unwrap();
        assert!(pattern("n", &dot, []).is_err());
        let row = pattern("n", &dot, [(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]).unwrap();
        assert_eq!(row.profiles().len(), 3);
    }

    #[test]
    fn test_back_plate_sits_behind_the_origin() {
        let modeler = Modeler::new();
        let plate = BackPlate {
            width: 78.0,
            height: 39.0,
            thickness: 1.6,
            corner_radius: 5.0,
            grid_spacing: 40.0,
            columns: 2,
            fastener_diameter: 8.0,
            kerf: 1.0,
            hole_height: 20.0,
        }
        .build(&modeler)
        .unwrap();

        let bbox = plate.bounding_box().unwrap();
        assert_relative_eq!(bbox.min.x, -78.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.min.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.y, 1.6, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.z, 39.0, epsilon = 1e-9);
        for x in [-19.0, -59.0] {
            assert_eq!(
                plate.classify(DVec3::new(x, 0.8, 20.0)).unwrap(),
                Containment::Outside
            );
        }
        assert_eq!(
            plate.classify(DVec3::new(-39.0, 0.8, 20.0)).unwrap(),
            Containment::Inside
        );
    }
}
