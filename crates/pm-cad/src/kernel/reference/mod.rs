//! Reference kernel
//!
//! A deterministic in-process kernel. Solids are signed distance fields with
//! an edge and planar face bookkeeping layer on top, which is enough to
//! measure parts, classify points and select and round edges. Booleans are
//! exact on the field; edges are tracked to the chord tolerance. Fillets roll
//! a ball along each crease, so rounded solids lose (or gain) material.

mod body;
mod field;
mod forming;
mod region;
mod round;

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DAffine3, DVec3};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{
    BooleanHint, BooleanType, BoundingBox, CadKernel, Containment, EdgeId, EdgeInfo, FilletGroup,
    KernelError, KernelResult, ShapeId, SweepOptions,
};
use crate::plane::Axis2;
use crate::sketch::{Drawing, Sketch};
use crate::wire::{Helix, Wire};
use body::Body;

/// Tuning for the reference kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceKernelConfig {
    /// Maximum distance between a curve and its polyline
    pub chord_tolerance: f64,
    /// Points closer than this to the surface are on the boundary
    pub boundary_tolerance: f64,
    /// Radius of the circle sampled around an edge to detect creases
    pub crease_sample_radius: f64,
    /// Grid cells along the longest side when measuring volume
    pub volume_resolution: usize,
    /// Points per resampled loft section
    pub loft_ring_points: usize,
}

impl Default for ReferenceKernelConfig {
    fn default() -> Self {
        Self {
            chord_tolerance: 0.01,
            boundary_tolerance: 1e-6,
            crease_sample_radius: 1e-3,
            volume_resolution: 48,
            loft_ring_points: 96,
        }
    }
}

impl ReferenceKernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chord_tolerance(mut self, tolerance: f64) -> Self {
        self.chord_tolerance = tolerance;
        self
    }

    pub fn with_boundary_tolerance(mut self, tolerance: f64) -> Self {
        self.boundary_tolerance = tolerance;
        self
    }

    pub fn with_crease_sample_radius(mut self, radius: f64) -> Self {
        self.crease_sample_radius = radius;
        self
    }

    pub fn with_volume_resolution(mut self, resolution: usize) -> Self {
        self.volume_resolution = resolution;
        self
    }

    pub fn with_loft_ring_points(mut self, points: usize) -> Self {
        self.loft_ring_points = points;
        self
    }
}

/// Pure-Rust kernel implementing every [`CadKernel`] operation
#[derive(Debug, Default)]
pub struct ReferenceKernel {
    config: ReferenceKernelConfig,
    shapes: Mutex<HashMap<ShapeId, Arc<Body>>>,
}

impl ReferenceKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReferenceKernelConfig) -> Self {
        Self {
            config,
            shapes: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ReferenceKernelConfig {
        &self.config
    }

    /// Number of shapes currently stored
    pub fn shape_count(&self) -> usize {
        self.shapes.lock().len()
    }

    fn get(&self, id: ShapeId) -> KernelResult<Arc<Body>> {
        self.shapes
            .lock()
            .get(&id)
            .cloned()
            .ok_or(KernelError::ShapeNotFound(id))
    }

    fn store(&self, body: Body) -> ShapeId {
        let id = ShapeId::new();
        tracing::trace!(
            shape = %id,
            edges = body.edges.len(),
            faces = body.faces.len(),
            "stored shape"
        );
        self.shapes.lock().insert(id, Arc::new(body));
        id
    }
}

impl CadKernel for ReferenceKernel {
    fn name(&self) -> &str {
        "reference"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extrude(&self, sketch: &Sketch, distance: f64) -> KernelResult<ShapeId> {
        if !distance.is_finite() || distance == 0.0 {
            return Err(KernelError::InvalidProfile(format!(
                "extrusion distance must be non-zero, got {distance}"
            )));
        }
        let body = forming::extrusion(sketch, distance, &self.config)?;
        Ok(self.store(body))
    }

    fn revolve(&self, sketch: &Sketch, axis: &Axis2, angle: f64) -> KernelResult<ShapeId> {
        if !angle.is_finite() || angle <= 0.0 {
            return Err(KernelError::InvalidProfile(format!(
                "revolution angle must be positive, got {angle}"
            )));
        }
        let body = forming::revolution(sketch, axis, angle, &self.config)?;
        Ok(self.store(body))
    }

    fn sweep(
        &self,
        profile: &Drawing,
        path: &Wire,
        options: &SweepOptions,
    ) -> KernelResult<ShapeId> {
        if options.with_contact {
            // Contact placement is resolved before the profile reaches a kernel.
            tracing::trace!("sweep received with_contact; profile used as given");
        }
        let body = forming::sweep(profile, path, &self.config)?;
        Ok(self.store(body))
    }

    fn loft(&self, sections: &[Wire], ruled: bool) -> KernelResult<ShapeId> {
        let body = forming::loft(sections, ruled, &self.config)?;
        Ok(self.store(body))
    }

    fn helical_sweep(&self, profile: &Drawing, helix: &Helix) -> KernelResult<ShapeId> {
        if helix.pitch <= 0.0 || helix.height <= 0.0 || helix.radius <= 0.0 {
            return Err(KernelError::InvalidProfile(format!(
                "helix needs positive pitch, height and radius, got {helix:?}"
            )));
        }
        let body = forming::thread(profile, helix, &self.config)?;
        Ok(self.store(body))
    }

    fn boolean(
        &self,
        a: ShapeId,
        b: ShapeId,
        op: BooleanType,
        hint: BooleanHint,
    ) -> KernelResult<ShapeId> {
        let (body_a, body_b) = (self.get(a)?, self.get(b)?);
        tracing::trace!(?op, ?hint, %a, %b, "boolean");
        let body = Body::combine(&body_a, &body_b, op, &self.config);
        if body.hull.is_empty() {
            return Err(KernelError::BooleanFailed(format!(
                "{op:?} of {a} and {b} is empty"
            )));
        }
        Ok(self.store(body))
    }

    fn transform(&self, shape: ShapeId, transform: &DAffine3) -> KernelResult<ShapeId> {
        let body = self.get(shape)?;
        Ok(self.store(body.transformed(transform)))
    }

    fn duplicate(&self, shape: ShapeId) -> KernelResult<ShapeId> {
        let body = self.get(shape)?;
        let id = ShapeId::new();
        self.shapes.lock().insert(id, body);
        Ok(id)
    }

    fn release(&self, shape: ShapeId) {
        self.shapes.lock().remove(&shape);
    }

    fn edges(&self, shape: ShapeId) -> KernelResult<Vec<EdgeInfo>> {
        let body = self.get(shape)?;
        Ok(body
            .edges
            .iter()
            .enumerate()
            .map(|(i, edge)| {
                EdgeInfo::new(EdgeId::new(shape, i as u32), edge.points.clone(), edge.smooth)
            })
            .collect())
    }

    fn fillet(&self, shape: ShapeId, groups: &[FilletGroup]) -> KernelResult<ShapeId> {
        let body = self.get(shape)?;
        let mut requests = Vec::new();
        for (group_index, group) in groups.iter().enumerate() {
            for edge in &group.edges {
                let index = edge.index as usize;
                if edge.shape != shape || index >= body.edges.len() {
                    return Err(KernelError::StaleEdge { edge: *edge, shape });
                }
                if body.edges[index].smooth {
                    continue;
                }
                let limit = body.fillet_limit(index);
                if group.radius > limit + 1e-9 {
                    tracing::warn!(
                        group = group_index,
                        radius = group.radius,
                        limit,
                        "fillet radius too large"
                    );
                    return Err(KernelError::FilletInfeasible {
                        group: group_index,
                        radius: group.radius,
                        limit,
                    });
                }
                requests.push((index, group.radius));
            }
        }
        Ok(self.store(body.rounded(&requests, &self.config)))
    }

    fn bounding_box(&self, shape: ShapeId) -> KernelResult<BoundingBox> {
        Ok(self.get(shape)?.bounding_box())
    }

    fn volume(&self, shape: ShapeId) -> KernelResult<f64> {
        Ok(self.get(shape)?.volume(self.config.volume_resolution))
    }

    fn classify(&self, shape: ShapeId, point: DVec3) -> KernelResult<Containment> {
        Ok(self
            .get(shape)?
            .classify(point, self.config.boundary_tolerance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::{Plane, PlaneName};
    use crate::sketch::shapes;
    use approx::assert_relative_eq;

    fn block(kernel: &ReferenceKernel, w: f64, h: f64, d: f64) -> ShapeId {
        let sketch = shapes::rectangle(w, h)
            .unwrap()
            .sketch_on(Plane::named(PlaneName::XY, 0.0));
        kernel.extrude(&sketch, d).unwrap()
    }

    #[test]
    fn test_extrude_bounding_box_and_volume() {
        let kernel = ReferenceKernel::new();
        let id = block(&kernel, 10.0, 20.0, 30.0);
        let bbox = kernel.bounding_box(id).unwrap();
        assert_eq!(bbox.size(), DVec3::new(10.0, 20.0, 30.0));
        assert_relative_eq!(kernel.volume(id).unwrap(), 6000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_classify() {
        let kernel = ReferenceKernel::new();
        let id = block(&kernel, 2.0, 2.0, 2.0);
        assert_eq!(
            kernel.classify(id, DVec3::new(0.0, 0.0, 1.0)).unwrap(),
            Containment::Inside
        );
        assert_eq!(
            kernel.classify(id, DVec3::new(1.0, 0.0, 1.0)).unwrap(),
            Containment::Boundary
        );
        assert_eq!(
            kernel.classify(id, DVec3::new(3.0, 0.0, 1.0)).unwrap(),
            Containment::Outside
        );
    }

    #[test]
    fn test_rotation_round_trip_keeps_measurements() {
        let kernel = ReferenceKernel::new();
        let id = block(&kernel, 10.0, 4.0, 6.0);
        let turn = DAffine3::from_rotation_z(0.7);
        let there = kernel.transform(id, &turn).unwrap();
        let back = kernel.transform(there, &turn.inverse()).unwrap();
        let before = kernel.bounding_box(id).unwrap();
        let after = kernel.bounding_box(back).unwrap();
        assert!((before.min - after.min).abs().max_element() < 1e-9);
        assert!((before.max - after.max).abs().max_element() < 1e-9);
        assert_relative_eq!(
            kernel.volume(id).unwrap(),
            kernel.volume(back).unwrap(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_fillet_radius_limit() {
        let kernel = ReferenceKernel::new();
        let id = block(&kernel, 10.0, 10.0, 2.0);
        let edges: Vec<EdgeId> = kernel.edges(id).unwrap().iter().map(|e| e.id).collect();
        let ok = kernel
            .fillet(id, &[FilletGroup { edges: edges.clone(), radius: 0.5 }])
            .unwrap();
        assert!(kernel.edges(ok).unwrap().iter().all(|e| e.smooth));
        let err = kernel
            .fillet(id, &[FilletGroup { edges, radius: 1.5 }])
            .unwrap_err();
        match err {
            KernelError::FilletInfeasible { group, limit, .. } => {
                assert_eq!(group, 0);
                assert_relative_eq!(limit, 1.0, epsilon = 1e-12);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_fillet_removes_corner_material() {
        let kernel = ReferenceKernel::new();
        let id = block(&kernel, 10.0, 10.0, 10.0);
        let edges: Vec<EdgeId> = kernel.edges(id).unwrap().iter().map(|e| e.id).collect();
        let rounded = kernel
            .fillet(id, &[FilletGroup { edges, radius: 2.0 }])
            .unwrap();
        assert_eq!(
            kernel.classify(rounded, DVec3::new(4.9, 4.9, 9.9)).unwrap(),
            Containment::Outside
        );
        assert_eq!(
            kernel.classify(rounded, DVec3::new(4.9, 0.0, 5.0)).unwrap(),
            Containment::Inside
        );
        // Twelve quarter-round strips of (4 - pi) * 10 each, less the corners.
        let volume = kernel.volume(rounded).unwrap();
        assert!(volume < 1000.0 - 60.0, "volume {volume}");
        assert!(volume > 1000.0 - 12.0 * (4.0 - std::f64::consts::PI) * 10.0 - 10.0);
        let bbox = kernel.bounding_box(rounded).unwrap();
        assert!((bbox.size() - DVec3::splat(10.0)).abs().max_element() < 1e-9);
        // Every crease became two tangent lines.
        let after = kernel.edges(rounded).unwrap();
        assert_eq!(after.len(), 24);
        assert!(after.iter().all(|e| e.smooth));
    }

    #[test]
    fn test_fillet_fills_an_inner_corner() {
        let kernel = ReferenceKernel::new();
        let base = block(&kernel, 10.0, 10.0, 2.0);
        let post = kernel
            .extrude(
                &shapes::rectangle(2.0, 10.0)
                    .unwrap()
                    .sketch_on(Plane::named(PlaneName::XY, 2.0)),
                8.0,
            )
            .unwrap();
        let tee = kernel
            .boolean(base, post, BooleanType::Union, BooleanHint::General)
            .unwrap();
        let inner: Vec<EdgeId> = kernel
            .edges(tee)
            .unwrap()
            .iter()
            .filter(|e| (e.midpoint.z - 2.0).abs() < 1e-9 && (e.midpoint.x.abs() - 1.0).abs() < 1e-9)
            .map(|e| e.id)
            .collect();
        assert_eq!(inner.len(), 2);
        let filled = kernel
            .fillet(tee, &[FilletGroup { edges: inner, radius: 1.0 }])
            .unwrap();
        let notch = DVec3::new(1.1, 0.0, 2.1);
        assert_eq!(kernel.classify(tee, notch).unwrap(), Containment::Outside);
        assert_eq!(kernel.classify(filled, notch).unwrap(), Containment::Inside);
        assert_eq!(
            kernel.classify(filled, DVec3::new(1.9, 0.0, 2.9)).unwrap(),
            Containment::Outside
        );
    }

    #[test]
    fn test_fillet_rejects_edges_of_other_shapes() {
        let kernel = ReferenceKernel::new();
        let a = block(&kernel, 1.0, 1.0, 1.0);
        let b = block(&kernel, 1.0, 1.0, 1.0);
        let foreign = kernel.edges(b).unwrap()[0].id;
        assert!(matches!(
            kernel.fillet(a, &[FilletGroup { edges: vec![foreign], radius: 0.1 }]),
            Err(KernelError::StaleEdge { .. })
        ));
    }

    #[test]
    fn test_release_forgets_shape() {
        let kernel = ReferenceKernel::new();
        let id = block(&kernel, 1.0, 1.0, 1.0);
        let copy = kernel.duplicate(id).unwrap();
        kernel.release(id);
        assert!(matches!(
            kernel.volume(id),
            Err(KernelError::ShapeNotFound(_))
        ));
        assert!(kernel.volume(copy).is_ok());
        assert_eq!(kernel.shape_count(), 1);
    }

    #[test]
    fn test_cut_hole_through_plate() {
        let kernel = ReferenceKernel::new();
        let plate = block(&kernel, 10.0, 10.0, 2.0);
        let hole = kernel
            .extrude(
                &shapes::circle(2.0)
                    .unwrap()
                    .sketch_on(Plane::named(PlaneName::XY, -1.0)),
                4.0,
            )
            .unwrap();
        let cut = kernel
            .boolean(plate, hole, BooleanType::Subtract, BooleanHint::General)
            .unwrap();
        assert_eq!(
            kernel.classify(cut, DVec3::new(0.0, 0.0, 1.0)).unwrap(),
            Containment::Outside
        );
        let edges = kernel.edges(cut).unwrap();
        // Outer box edges, the two hole rims and the hole's seam.
        assert_eq!(edges.len(), 15);
        assert_eq!(edges.iter().filter(|e| e.is_closed()).count(), 2);
    }
}
