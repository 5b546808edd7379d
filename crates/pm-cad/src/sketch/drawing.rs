//! Drawings: 2D regions built from closed profiles with booleans

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::{MirrorAxis, Profile, rotation_about};
use crate::error::{GeometryError, GeometryErrorKind};
use crate::plane::Plane;

/// A 2D region: a profile or a boolean combination of drawings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Drawing {
    Profile(Profile),
    Fuse(Box<Drawing>, Box<Drawing>),
    Cut(Box<Drawing>, Box<Drawing>),
    Intersect(Box<Drawing>, Box<Drawing>),
}

impl From<Profile> for Drawing {
    fn from(profile: Profile) -> Self {
        Drawing::Profile(profile)
    }
}

impl Drawing {
    /// Leaf profiles in depth-first order
    pub fn profiles(&self) -> Vec<&Profile> {
        let mut out = Vec::new();
        self.collect_profiles(&mut out);
        out
    }

    fn collect_profiles<'a>(&'a self, out: &mut Vec<&'a Profile>) {
        match self {
            Drawing::Profile(p) => out.push(p),
            Drawing::Fuse(a, b) | Drawing::Cut(a, b) | Drawing::Intersect(a, b) => {
                a.collect_profiles(out);
                b.collect_profiles(out);
            }
        }
    }

    /// The first leaf profile
    pub fn outer_profile(&self) -> &Profile {
        match self {
            Drawing::Profile(p) => p,
            Drawing::Fuse(a, _) | Drawing::Cut(a, _) | Drawing::Intersect(a, _) => {
                a.outer_profile()
            }
        }
    }

    /// Identity used in error reports: the id of the first leaf profile
    pub fn id(&self) -> Uuid {
        self.outer_profile().id()
    }

    pub fn is_closed(&self) -> bool {
        self.profiles().iter().all(|p| p.is_closed())
    }

    pub fn transformed(&self, transform: &DAffine2) -> Self {
        match self {
            Drawing::Profile(p) => Drawing::Profile(p.transformed(transform)),
            Drawing::Fuse(a, b) => Drawing::Fuse(
                Box::new(a.transformed(transform)),
                Box::new(b.transformed(transform)),
            ),
            Drawing::Cut(a, b) => Drawing::Cut(
                Box::new(a.transformed(transform)),
                Box::new(b.transformed(transform)),
            ),
            Drawing::Intersect(a, b) => Drawing::Intersect(
                Box::new(a.transformed(transform)),
                Box::new(b.transformed(transform)),
            ),
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        self.transformed(&DAffine2::from_translation(DVec2::new(dx, dy)))
    }

    /// Rotate counter-clockwise by `angle_deg` degrees about `center`
    pub fn rotate(&self, angle_deg: f64, center: DVec2) -> Self {
        self.transformed(&rotation_about(angle_deg, center))
    }

    pub fn mirror(&self, axis: MirrorAxis) -> Self {
        self.transformed(&axis.transform())
    }

    /// Region of `self` minus `tool`
    pub fn cut(&self, tool: impl Into<Drawing>) -> Result<Self, GeometryError> {
        self.combine("cut", tool.into(), Drawing::Cut)
    }

    pub fn fuse(&self, other: impl Into<Drawing>) -> Result<Self, GeometryError> {
        self.combine("fuse", other.into(), Drawing::Fuse)
    }

    pub fn intersect(&self, other: impl Into<Drawing>) -> Result<Self, GeometryError> {
        self.combine("intersect", other.into(), Drawing::Intersect)
    }

    fn combine(
        &self,
        op: &'static str,
        other: Drawing,
        build: fn(Box<Drawing>, Box<Drawing>) -> Drawing,
    ) -> Result<Self, GeometryError> {
        if !self.is_closed() || !other.is_closed() {
            return Err(GeometryError::new(op, 0, GeometryErrorKind::NotClosed));
        }
        Ok(build(Box::new(self.clone()), Box::new(other)))
    }

    /// Place the drawing on a plane
    pub fn sketch_on(&self, plane: Plane) -> Sketch {
        Sketch {
            id: Uuid::new_v4(),
            plane,
            drawing: self.clone(),
        }
    }
}

impl Profile {
    pub fn cut(&self, tool: impl Into<Drawing>) -> Result<Drawing, GeometryError> {
        Drawing::from(self.clone()).cut(tool)
    }

    pub fn fuse(&self, other: impl Into<Drawing>) -> Result<Drawing, GeometryError> {
        Drawing::from(self.clone()).fuse(other)
    }

    pub fn intersect(&self, other: impl Into<Drawing>) -> Result<Drawing, GeometryError> {
        Drawing::from(self.clone()).intersect(other)
    }

    pub fn sketch_on(&self, plane: Plane) -> Sketch {
        Drawing::from(self.clone()).sketch_on(plane)
    }
}

/// A drawing placed on a plane, ready to be formed into a solid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sketch {
    pub id: Uuid,
    pub plane: Plane,
    pub drawing: Drawing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::{PathBuilder, shapes};

    #[test]
    fn test_cut_requires_closed_operands() {
        let open = PathBuilder::new().h_line(1.0).done().unwrap();
        let err = shapes::circle(5.0).unwrap().cut(open).unwrap_err();
        assert_eq!(err.op, "cut");
        assert_eq!(err.kind, GeometryErrorKind::NotClosed);
    }

    #[test]
    fn test_cut_keeps_leaves_in_order() {
        let outer = shapes::rectangle(10.0, 10.0).unwrap();
        let hole = shapes::circle(2.0).unwrap();
        let drawing = outer.cut(hole.clone()).unwrap();
        let leaves = drawing.profiles();
        assert_eq!(leaves.len(), 2);
        assert_eq!(drawing.id(), outer.id());
        assert_eq!(leaves[1].id(), hole.id());
    }

    #[test]
    fn test_transform_open_profile_allowed() {
        let open: Drawing = PathBuilder::new().h_line(1.0).done().unwrap().into();
        let moved = open.translate(1.0, 1.0);
        assert!(!moved.is_closed());
    }
}
