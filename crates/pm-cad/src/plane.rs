//! Sketch planes and axes
//!
//! A plane is an origin, an in-plane x direction and a normal. The in-plane
//! y direction is `normal × x_dir`, so 2D drawings keep their handedness when
//! placed on any plane.

use glam::{DAffine3, DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Named plane orientations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneName {
    XY,
    YZ,
    ZX,
    XZ,
    YX,
    ZY,
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
}

impl PlaneName {
    /// `(x_dir, normal)` of the named orientation
    pub fn axes(self) -> (DVec3, DVec3) {
        match self {
            PlaneName::XY | PlaneName::Top => (DVec3::X, DVec3::Z),
            PlaneName::YZ | PlaneName::Right => (DVec3::Y, DVec3::X),
            PlaneName::ZX => (DVec3::Z, DVec3::Y),
            PlaneName::XZ | PlaneName::Front => (DVec3::X, DVec3::NEG_Y),
            PlaneName::YX => (DVec3::Y, DVec3::NEG_Z),
            PlaneName::ZY => (DVec3::Z, DVec3::NEG_X),
            PlaneName::Back => (DVec3::NEG_X, DVec3::Y),
            PlaneName::Left => (DVec3::NEG_Y, DVec3::NEG_X),
            PlaneName::Bottom => (DVec3::X, DVec3::NEG_Z),
        }
    }
}

/// An oriented plane in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: DVec3,
    pub x_dir: DVec3,
    pub normal: DVec3,
}

impl Default for Plane {
    fn default() -> Self {
        Self::named(PlaneName::XY, 0.0)
    }
}

impl Plane {
    /// Create a plane; `x_dir` is projected into the plane and normalized
    pub fn new(origin: DVec3, x_dir: DVec3, normal: DVec3) -> Self {
        let normal = normal.normalize();
        let x_dir = (x_dir - normal * x_dir.dot(normal)).normalize();
        Self {
            origin,
            x_dir,
            normal,
        }
    }

    /// Named plane with its origin moved `offset` along the normal
    pub fn named(name: PlaneName, offset: f64) -> Self {
        let (x_dir, normal) = name.axes();
        Self {
            origin: normal * offset,
            x_dir,
            normal,
        }
    }

    pub fn y_dir(&self) -> DVec3 {
        self.normal.cross(self.x_dir)
    }

    /// Map a point of the plane's 2D coordinate system to world space
    pub fn to_world(&self, p: DVec2) -> DVec3 {
        self.origin + self.x_dir * p.x + self.y_dir() * p.y
    }

    /// Map an in-plane 2D vector to world space
    pub fn vector_to_world(&self, v: DVec2) -> DVec3 {
        self.x_dir * v.x + self.y_dir() * v.y
    }

    /// World point expressed as `(x, y, height above the plane)`
    pub fn to_local(&self, p: DVec3) -> DVec3 {
        let d = p - self.origin;
        DVec3::new(d.dot(self.x_dir), d.dot(self.y_dir()), d.dot(self.normal))
    }

    pub fn signed_distance(&self, p: DVec3) -> f64 {
        (p - self.origin).dot(self.normal)
    }

    /// Local-to-world affine transform of the plane frame
    pub fn frame(&self) -> DAffine3 {
        DAffine3::from_mat3_translation(
            DMat3::from_cols(self.x_dir, self.y_dir(), self.normal),
            self.origin,
        )
    }

    /// Same orientation, origin moved by `distance` along the normal
    pub fn offset(&self, distance: f64) -> Self {
        self.translated(self.normal * distance)
    }

    pub fn translated(&self, v: DVec3) -> Self {
        Self {
            origin: self.origin + v,
            ..*self
        }
    }

    /// Apply a rigid transform to the plane
    pub fn transformed(&self, transform: &DAffine3) -> Self {
        Self::new(
            transform.transform_point3(self.origin),
            transform.transform_vector3(self.x_dir),
            transform.transform_vector3(self.normal),
        )
    }

    /// Reflection across this plane
    pub fn reflection(&self) -> DAffine3 {
        let n = self.normal;
        let linear = DMat3::IDENTITY - 2.0 * outer(n, n);
        let translation = 2.0 * self.origin.dot(n) * n;
        DAffine3::from_mat3_translation(linear, translation)
    }

    /// Whether `p` lies in the plane within `tolerance`
    pub fn contains(&self, p: DVec3, tolerance: f64) -> bool {
        self.signed_distance(p).abs() <= tolerance
    }
}

fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// An axis lying in a sketch plane, in the plane's 2D coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis2 {
    pub origin: DVec2,
    pub direction: DVec2,
}

impl Axis2 {
    pub fn new(origin: DVec2, direction: DVec2) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// The plane's x axis
    pub fn x() -> Self {
        Self::new(DVec2::ZERO, DVec2::X)
    }

    /// The plane's y axis
    pub fn y() -> Self {
        Self::new(DVec2::ZERO, DVec2::Y)
    }
}

/// Axis definition for revolve operations and rotations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis3D {
    /// Origin point of the axis
    pub origin: DVec3,
    /// Direction of the axis (normalized)
    pub direction: DVec3,
}

impl Axis3D {
    /// Create an axis from origin and direction
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// X axis at origin
    pub fn x() -> Self {
        Self::new(DVec3::ZERO, DVec3::X)
    }

    /// Y axis at origin
    pub fn y() -> Self {
        Self::new(DVec3::ZERO, DVec3::Y)
    }

    /// Z axis at origin
    pub fn z() -> Self {
        Self::new(DVec3::ZERO, DVec3::Z)
    }

    /// Rotation about this axis by `angle` radians
    pub fn rotation(&self, angle: f64) -> DAffine3 {
        DAffine3::from_translation(self.origin)
            * DAffine3::from_axis_angle(self.direction, angle)
            * DAffine3::from_translation(-self.origin)
    }

    /// The in-plane axis `axis` of `plane`, in world space
    pub fn from_plane_axis(plane: &Plane, axis: &Axis2) -> Self {
        Self::new(plane.to_world(axis.origin), plane.vector_to_world(axis.direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_named_plane_normals() {
        assert_eq!(Plane::named(PlaneName::XY, 0.0).normal, DVec3::Z);
        assert_eq!(Plane::named(PlaneName::YZ, 0.0).normal, DVec3::X);
        assert_eq!(Plane::named(PlaneName::XZ, 0.0).normal, DVec3::NEG_Y);
        assert_eq!(Plane::named(PlaneName::ZX, 0.0).normal, DVec3::Y);
        assert_eq!(Plane::named(PlaneName::ZY, 0.0).normal, DVec3::NEG_X);
        assert_eq!(Plane::named(PlaneName::YX, 0.0).normal, DVec3::NEG_Z);
    }

    #[test]
    fn test_named_plane_is_right_handed() {
        for name in [PlaneName::XY, PlaneName::YZ, PlaneName::XZ, PlaneName::Back, PlaneName::Left] {
            let plane = Plane::named(name, 0.0);
            assert_relative_eq!(plane.x_dir.cross(plane.y_dir()).dot(plane.normal), 1.0);
        }
        assert_eq!(Plane::named(PlaneName::XZ, 0.0).y_dir(), DVec3::Z);
    }

    #[test]
    fn test_offset_moves_along_normal() {
        let plane = Plane::named(PlaneName::XZ, -1.6);
        assert_relative_eq!(plane.origin.y, 1.6);
        assert!(plane.contains(DVec3::new(5.0, 1.6, -3.0), 1e-9));
    }

    #[test]
    fn test_local_round_trip() {
        let plane = Plane::named(PlaneName::YZ, 4.0);
        let world = plane.to_world(DVec2::new(2.0, 3.0));
        assert_eq!(world, DVec3::new(4.0, 2.0, 3.0));
        let local = plane.to_local(world);
        assert_relative_eq!(local.x, 2.0);
        assert_relative_eq!(local.y, 3.0);
        assert_relative_eq!(local.z, 0.0);
    }

    #[test]
    fn test_reflection() {
        let plane = Plane::named(PlaneName::XY, 6.0);
        let p = plane.reflection().transform_point3(DVec3::new(1.0, 2.0, 1.0));
        assert_relative_eq!(p.z, 11.0);
        assert_relative_eq!(p.x, 1.0);
    }
}
