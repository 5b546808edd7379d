//! Wires: 1D paths in 3D used as sweep spines and loft sections

use std::f64::consts::TAU;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plane::{Axis3D, Plane};
use crate::sketch::Profile;

/// A helical spine around an axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Helix {
    /// Axial advance per turn
    pub pitch: f64,
    /// Total axial length
    pub height: f64,
    pub radius: f64,
    pub axis: Axis3D,
    pub left_handed: bool,
}

impl Helix {
    pub fn new(pitch: f64, height: f64, radius: f64) -> Self {
        Self {
            pitch,
            height,
            radius,
            axis: Axis3D::z(),
            left_handed: false,
        }
    }

    pub fn with_axis(mut self, axis: Axis3D) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_left_hand(mut self, left_handed: bool) -> Self {
        self.left_handed = left_handed;
        self
    }

    /// Number of turns over the full height
    pub fn turns(&self) -> f64 {
        self.height / self.pitch
    }

    /// Orthonormal `(e1, e2, axis)` frame; angle zero lies along `e1`
    pub fn basis(&self) -> (DVec3, DVec3, DVec3) {
        let (e1, e2) = self.axis.direction.any_orthonormal_pair();
        (e1, e2, self.axis.direction)
    }

    /// Point at turn parameter `u` (0 at the start, `turns()` at the end),
    /// offset by `axial` along the axis and `radial` from the helix radius
    pub fn point_at(&self, u: f64, axial: f64, radial: f64) -> DVec3 {
        let (e1, e2, dir) = self.basis();
        let angle = if self.left_handed { -TAU * u } else { TAU * u };
        self.axis.origin
            + dir * (self.pitch * u + axial)
            + (e1 * angle.cos() + e2 * angle.sin()) * (self.radius + radial)
    }
}

/// Kind of path carried by a wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireKind {
    /// A profile placed on a plane
    Planar { profile: Profile, plane: Plane },
    Helix(Helix),
}

/// A path in 3D space, independent of the profile it was made from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    id: Uuid,
    kind: WireKind,
}

impl Wire {
    /// Place a profile on a plane
    pub fn planar(profile: &Profile, plane: Plane) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: WireKind::Planar {
                profile: profile.clone(),
                plane,
            },
        }
    }

    pub fn helix(helix: Helix) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: WireKind::Helix(helix),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &WireKind {
        &self.kind
    }

    pub fn is_closed(&self) -> bool {
        match &self.kind {
            WireKind::Planar { profile, .. } => profile.is_closed(),
            WireKind::Helix(_) => false,
        }
    }

    /// Polyline approximation in world space
    pub fn sample(&self, tolerance: f64) -> Vec<DVec3> {
        match &self.kind {
            WireKind::Planar { profile, plane } => profile
                .sample(tolerance)
                .into_iter()
                .map(|p: DVec2| plane.to_world(p))
                .collect(),
            WireKind::Helix(helix) => {
                let steps = (helix.turns() * 72.0).ceil().max(1.0) as usize;
                let end = helix.turns();
                (0..=steps)
                    .map(|i| helix.point_at(end * i as f64 / steps as f64, 0.0, 0.0))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_helix_end_point() {
        let helix = Helix::new(2.0, 6.0, 3.0);
        let end = helix.point_at(helix.turns(), 0.0, 0.0);
        assert_relative_eq!(end.z, 6.0, epsilon = 1e-12);
        assert_relative_eq!(DVec2::new(end.x, end.y).length(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_left_handed_helix_turns_the_other_way() {
        let right = Helix::new(4.0, 4.0, 1.0);
        let left = right.with_left_hand(true);
        let (_, e2, _) = right.basis();
        assert!(right.point_at(0.25, 0.0, 0.0).dot(e2) > 0.9);
        assert!(left.point_at(0.25, 0.0, 0.0).dot(e2) < -0.9);
    }

    #[test]
    fn test_planar_wire_owns_profile() {
        let circle = shapes::circle(2.0).unwrap();
        let wire = Wire::planar(&circle, Plane::named(crate::plane::PlaneName::XZ, 5.0));
        drop(circle);
        let points = wire.sample(0.01);
        assert!(points.iter().all(|p| (p.y + 5.0).abs() < 1e-12));
        assert!(wire.is_closed());
    }
}
