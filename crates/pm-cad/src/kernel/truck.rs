//! Truck CAD Kernel Backend
//!
//! Pure Rust B-Rep kernel using the Truck library.
//!
//! Note: This backend covers extrusion, revolution, booleans, transforms and
//! bounding boxes. Drawings are approximated by their polylines, and curved
//! extremes are not included in the bounding box. Everything else reports
//! `OperationFailed`.

use std::collections::HashMap;

use glam::{DAffine3, DMat4, DVec3};
use parking_lot::Mutex;
use truck_modeling::{InnerSpace, Matrix4, Point3, Rad, Solid as TruckSolid, Vector3, Wire, builder};

use super::{
    BooleanHint, BooleanType, BoundingBox, CadKernel, Containment, EdgeInfo, FilletGroup,
    KernelError, KernelResult, ShapeId, SweepOptions,
};
use crate::plane::{Axis2, Axis3D, Plane};
use crate::sketch::{Drawing, Profile, Sketch};
use crate::wire::{Helix, Wire as PathWire};

/// Chord tolerance used to turn profile curves into polylines
const SAMPLE_TOLERANCE: f64 = 0.01;

/// Distance tolerance handed to truck's boolean operations
const BOOLEAN_TOLERANCE: f64 = 0.05;

/// Truck-based CAD kernel
pub struct TruckKernel {
    /// Storage for solid data
    solids: Mutex<HashMap<ShapeId, TruckSolid>>,
}

impl TruckKernel {
    /// Create a new Truck kernel
    pub fn new() -> Self {
        Self {
            solids: Mutex::new(HashMap::new()),
        }
    }

    fn store(&self, solid: TruckSolid) -> ShapeId {
        let id = ShapeId::new();
        self.solids.lock().insert(id, solid);
        id
    }

    fn get(&self, id: ShapeId) -> KernelResult<TruckSolid> {
        self.solids
            .lock()
            .get(&id)
            .cloned()
            .ok_or(KernelError::ShapeNotFound(id))
    }

    /// Closed polyline wire of a profile placed on a plane
    fn profile_wire(profile: &Profile, plane: &Plane) -> KernelResult<Wire> {
        let mut points: Vec<Point3> = profile
            .sample(SAMPLE_TOLERANCE)
            .into_iter()
            .map(|p| to_point(plane.to_world(p)))
            .collect();
        if points.len() > 1 && (points[0] - points[points.len() - 1]).magnitude() < 1e-9 {
            points.pop();
        }
        if points.len() < 3 {
            return Err(KernelError::InvalidProfile(format!(
                "profile {} must have at least 3 points",
                profile.id()
            )));
        }

        let vertices: Vec<_> = points.iter().map(|p| builder::vertex(*p)).collect();
        let n = vertices.len();
        let edges: Vec<_> = (0..n)
            .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
            .collect();
        Ok(edges.into())
    }

    /// Form every leaf of a drawing with `form` and combine the results with
    /// the drawing's booleans
    fn form_drawing(
        &self,
        drawing: &Drawing,
        form: &dyn Fn(&Profile) -> KernelResult<TruckSolid>,
    ) -> KernelResult<TruckSolid> {
        match drawing {
            Drawing::Profile(profile) => form(profile),
            Drawing::Fuse(a, b) => combine(
                &self.form_drawing(a, form)?,
                &self.form_drawing(b, form)?,
                BooleanType::Union,
            ),
            Drawing::Cut(a, b) => combine(
                &self.form_drawing(a, form)?,
                &self.form_drawing(b, form)?,
                BooleanType::Subtract,
            ),
            Drawing::Intersect(a, b) => combine(
                &self.form_drawing(a, form)?,
                &self.form_drawing(b, form)?,
                BooleanType::Intersect,
            ),
        }
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn to_point(p: DVec3) -> Point3 {
    Point3::new(p.x, p.y, p.z)
}

fn to_vector(v: DVec3) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

fn combine(a: &TruckSolid, b: &TruckSolid, op: BooleanType) -> KernelResult<TruckSolid> {
    let result = match op {
        BooleanType::Union => truck_shapeops::or(a, b, BOOLEAN_TOLERANCE),
        BooleanType::Intersect => truck_shapeops::and(a, b, BOOLEAN_TOLERANCE),
        BooleanType::Subtract => {
            let mut tool = b.clone();
            tool.not();
            truck_shapeops::and(a, &tool, BOOLEAN_TOLERANCE)
        }
    };
    result.ok_or_else(|| KernelError::BooleanFailed(format!("truck {op:?} did not converge")))
}

fn unsupported<T>(op: &str) -> KernelResult<T> {
    Err(KernelError::OperationFailed(format!(
        "{op} is not supported in Truck kernel"
    )))
}

impl CadKernel for TruckKernel {
    fn name(&self) -> &str {
        "truck"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extrude(&self, sketch: &Sketch, distance: f64) -> KernelResult<ShapeId> {
        let plane = sketch.plane;
        let dir = to_vector(plane.normal * distance);
        let solid = self.form_drawing(&sketch.drawing, &|profile| {
            let wire = Self::profile_wire(profile, &plane)?;
            let face = builder::try_attach_plane(&[wire]).map_err(|e| {
                KernelError::OperationFailed(format!("Failed to create face: {e:?}"))
            })?;
            Ok(builder::tsweep(&face, dir))
        })?;
        Ok(self.store(solid))
    }

    fn revolve(&self, sketch: &Sketch, axis: &Axis2, angle: f64) -> KernelResult<ShapeId> {
        let plane = sketch.plane;
        let world_axis = Axis3D::from_plane_axis(&plane, axis);
        let solid = self.form_drawing(&sketch.drawing, &|profile| {
            let wire = Self::profile_wire(profile, &plane)?;
            let face = builder::try_attach_plane(&[wire]).map_err(|e| {
                KernelError::OperationFailed(format!("Failed to create face: {e:?}"))
            })?;
            Ok(builder::rsweep(
                &face,
                to_point(world_axis.origin),
                to_vector(world_axis.direction),
                Rad(angle),
            ))
        })?;
        Ok(self.store(solid))
    }

    fn sweep(
        &self,
        _profile: &Drawing,
        _path: &PathWire,
        _options: &SweepOptions,
    ) -> KernelResult<ShapeId> {
        unsupported("Sweep")
    }

    fn loft(&self, _sections: &[PathWire], _ruled: bool) -> KernelResult<ShapeId> {
        unsupported("Loft")
    }

    fn helical_sweep(&self, _profile: &Drawing, _helix: &Helix) -> KernelResult<ShapeId> {
        unsupported("Helical sweep")
    }

    fn boolean(
        &self,
        a: ShapeId,
        b: ShapeId,
        op: BooleanType,
        _hint: BooleanHint,
    ) -> KernelResult<ShapeId> {
        let (solid_a, solid_b) = (self.get(a)?, self.get(b)?);
        let solid = combine(&solid_a, &solid_b, op)?;
        Ok(self.store(solid))
    }

    fn transform(&self, shape: ShapeId, transform: &DAffine3) -> KernelResult<ShapeId> {
        let solid = self.get(shape)?;
        let matrix = Matrix4::from(DMat4::from(*transform).to_cols_array_2d());
        Ok(self.store(builder::transformed(&solid, matrix)))
    }

    fn duplicate(&self, shape: ShapeId) -> KernelResult<ShapeId> {
        let solid = self.get(shape)?;
        Ok(self.store(solid))
    }

    fn release(&self, shape: ShapeId) {
        self.solids.lock().remove(&shape);
    }

    fn edges(&self, _shape: ShapeId) -> KernelResult<Vec<EdgeInfo>> {
        unsupported("Edge enumeration")
    }

    fn fillet(&self, _shape: ShapeId, _groups: &[FilletGroup]) -> KernelResult<ShapeId> {
        unsupported("Fillet")
    }

    fn bounding_box(&self, shape: ShapeId) -> KernelResult<BoundingBox> {
        let solid = self.get(shape)?;
        let bbox = BoundingBox::from_points(
            solid
                .boundaries()
                .iter()
                .flat_map(|shell| shell.vertex_iter())
                .map(|v| {
                    let p = v.point();
                    DVec3::new(p.x, p.y, p.z)
                }),
        );
        Ok(bbox)
    }

    fn volume(&self, _shape: ShapeId) -> KernelResult<f64> {
        unsupported("Volume")
    }

    fn classify(&self, _shape: ShapeId, _point: DVec3) -> KernelResult<Containment> {
        unsupported("Point classification")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::PlaneName;
    use crate::sketch::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_extrude_bounding_box() {
        let kernel = TruckKernel::new();
        let sketch = shapes::rectangle(10.0, 20.0)
            .unwrap()
            .sketch_on(Plane::named(PlaneName::XY, 0.0));
        let id = kernel.extrude(&sketch, 5.0).unwrap();
        let bbox = kernel.bounding_box(id).unwrap();
        assert_relative_eq!(bbox.size().z, 5.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().x, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cut_removes_the_top_half() {
        let kernel = TruckKernel::new();
        let block = kernel
            .extrude(
                &shapes::rectangle(10.0, 10.0)
                    .unwrap()
                    .sketch_on(Plane::named(PlaneName::XY, 0.0)),
                10.0,
            )
            .unwrap();
        let tool = kernel
            .extrude(
                &shapes::rectangle(20.0, 20.0)
                    .unwrap()
                    .sketch_on(Plane::named(PlaneName::XY, 5.0)),
                10.0,
            )
            .unwrap();
        let cut = kernel
            .boolean(block, tool, BooleanType::Subtract, BooleanHint::General)
            .unwrap();
        let bbox = kernel.bounding_box(cut).unwrap();
        assert_relative_eq!(bbox.min.z, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.z, 5.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.size().x, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_revolve_ring_about_the_z_axis() {
        let kernel = TruckKernel::new();
        // Cross-section from radius 2 to 4, 4 mm tall, on the XZ plane
        let sketch = shapes::rectangle(2.0, 4.0)
            .unwrap()
            .translate(3.0, 0.0)
            .sketch_on(Plane::named(PlaneName::XZ, 0.0));
        let id = kernel
            .revolve(&sketch, &Axis2::y(), std::f64::consts::TAU)
            .unwrap();
        let bbox = kernel.bounding_box(id).unwrap();
        assert_relative_eq!(bbox.size().z, 4.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.x, 4.0, epsilon = 1e-6);
        assert!(kernel.edges(id).is_err());
    }

    #[test]
    fn test_fillet_unsupported() {
        let kernel = TruckKernel::new();
        assert!(matches!(
            kernel.fillet(ShapeId::new(), &[]),
            Err(KernelError::OperationFailed(_))
        ));
    }
}
