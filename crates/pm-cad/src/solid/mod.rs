//! Solids and the operations that form and combine them
//!
//! A [`Solid`] owns one kernel shape and releases it when dropped. Forming
//! goes through a [`Modeler`], which validates its inputs before the kernel
//! sees them. Booleans and fillets consume their operands; transforms and
//! measurements borrow.

use std::fmt;
use std::sync::Arc;

use glam::{DAffine3, DVec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{
    BooleanError, BooleanErrorKind, FormingError, FormingErrorKind, ModelResult,
};
use crate::kernel::{
    BooleanHint, BooleanType, BoundingBox, CadKernel, Containment, EdgeInfo, ShapeId,
    SweepOptions, default_kernel,
};
use crate::plane::{Axis2, Axis3D, Plane};
use crate::sketch::{Drawing, Sketch};
use crate::wire::{Helix, Wire, WireKind};

/// Rotation applied to every helical sweep about its axis, so the first turn
/// does not start on the seam of a coaxial cylinder
pub const THREAD_SEAM_OFFSET_DEG: f64 = 2.0;

/// One step in the construction of a solid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Extrude {
        sketch: Uuid,
        distance: f64,
    },
    Revolve {
        sketch: Uuid,
        angle_deg: f64,
    },
    Sweep {
        profile: Uuid,
        path: Uuid,
    },
    Loft {
        sections: Vec<Uuid>,
        ruled: bool,
    },
    HelicalSweep {
        profile: Uuid,
        pitch: f64,
        height: f64,
    },
    /// Combination with a tool whose own history is kept
    Boolean {
        op: BooleanType,
        tool: Provenance,
    },
    Transform(DAffine3),
    Fillet {
        radii: Vec<f64>,
        edges: usize,
    },
}

impl Operation {
    pub fn type_name(&self) -> &'static str {
        match self {
            Operation::Extrude { .. } => "Extrude",
            Operation::Revolve { .. } => "Revolve",
            Operation::Sweep { .. } => "Sweep",
            Operation::Loft { .. } => "Loft",
            Operation::HelicalSweep { .. } => "HelicalSweep",
            Operation::Boolean { .. } => "Boolean",
            Operation::Transform(_) => "Transform",
            Operation::Fillet { .. } => "Fillet",
        }
    }
}

/// Ordered construction steps of a solid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    steps: Vec<Operation>,
}

impl Provenance {
    pub fn new(first: Operation) -> Self {
        Self { steps: vec![first] }
    }

    pub fn steps(&self) -> &[Operation] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Copy of this history with one more step
    pub fn then(&self, step: Operation) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }
}

/// A solid owned by exactly one value
pub struct Solid {
    shape: ShapeId,
    kernel: Arc<dyn CadKernel>,
    provenance: Provenance,
}

impl fmt::Debug for Solid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solid")
            .field("shape", &self.shape)
            .field("kernel", &self.kernel.name())
            .field("steps", &self.provenance.len())
            .finish()
    }
}

impl Drop for Solid {
    fn drop(&mut self) {
        self.kernel.release(self.shape);
    }
}

impl Solid {
    pub(crate) fn new(shape: ShapeId, kernel: Arc<dyn CadKernel>, provenance: Provenance) -> Self {
        Self {
            shape,
            kernel,
            provenance,
        }
    }

    /// Kernel handle of this solid
    pub fn id(&self) -> ShapeId {
        self.shape
    }

    pub fn kernel(&self) -> &Arc<dyn CadKernel> {
        &self.kernel
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    fn derived(&self, shape: ShapeId, step: Operation) -> Solid {
        Solid::new(shape, self.kernel.clone(), self.provenance.then(step))
    }

    fn shares_kernel(&self, other: &Solid) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.kernel), Arc::as_ptr(&other.kernel))
    }

    // ========== Booleans ==========

    /// Union of both solids
    pub fn fuse(self, other: Solid) -> ModelResult<Solid> {
        self.fuse_with(other, BooleanHint::General)
    }

    pub fn fuse_with(self, other: Solid, hint: BooleanHint) -> ModelResult<Solid> {
        self.boolean(other, BooleanType::Union, hint)
    }

    /// Remove `tool` from this solid
    pub fn cut(self, tool: Solid) -> ModelResult<Solid> {
        self.cut_with(tool, BooleanHint::General)
    }

    pub fn cut_with(self, tool: Solid, hint: BooleanHint) -> ModelResult<Solid> {
        self.boolean(tool, BooleanType::Subtract, hint)
    }

    /// Common volume of both solids
    pub fn intersect(self, other: Solid) -> ModelResult<Solid> {
        self.boolean(other, BooleanType::Intersect, BooleanHint::General)
    }

    fn boolean(self, tool: Solid, op: BooleanType, hint: BooleanHint) -> ModelResult<Solid> {
        if !self.shares_kernel(&tool) {
            return Err(BooleanError::new(op, BooleanErrorKind::ForeignKernel).into());
        }
        let shape = self
            .kernel
            .boolean(self.shape, tool.shape, op, hint)
            .map_err(|e| {
                tracing::warn!(?op, target = %self.shape, tool = %tool.shape, "boolean rejected: {e}");
                BooleanError::new(op, BooleanErrorKind::Kernel(e))
            })?;
        tracing::debug!(?op, target = %self.shape, tool = %tool.shape, result = %shape, "boolean");
        Ok(self.derived(
            shape,
            Operation::Boolean {
                op,
                tool: tool.provenance.clone(),
            },
        ))
    }

    // ========== Transforms ==========

    /// Transformed copy (rigid motions and reflections)
    pub fn transform(&self, transform: &DAffine3) -> ModelResult<Solid> {
        let shape = self.kernel.transform(self.shape, transform)?;
        Ok(self.derived(shape, Operation::Transform(*transform)))
    }

    pub fn translate(&self, offset: DVec3) -> ModelResult<Solid> {
        self.transform(&DAffine3::from_translation(offset))
    }

    pub fn translate_x(&self, dx: f64) -> ModelResult<Solid> {
        self.translate(DVec3::new(dx, 0.0, 0.0))
    }

    pub fn translate_y(&self, dy: f64) -> ModelResult<Solid> {
        self.translate(DVec3::new(0.0, dy, 0.0))
    }

    pub fn translate_z(&self, dz: f64) -> ModelResult<Solid> {
        self.translate(DVec3::new(0.0, 0.0, dz))
    }

    /// Rotate by `angle_deg` degrees about `axis` (right-hand rule)
    pub fn rotate(&self, angle_deg: f64, axis: Axis3D) -> ModelResult<Solid> {
        self.transform(&axis.rotation(angle_deg.to_radians()))
    }

    pub fn rotate_z(&self, angle_deg: f64) -> ModelResult<Solid> {
        self.rotate(angle_deg, Axis3D::z())
    }

    /// Mirror image across `plane`
    pub fn mirror(&self, plane: Plane) -> ModelResult<Solid> {
        self.transform(&plane.reflection())
    }

    /// Independent copy of this solid
    pub fn try_clone(&self) -> ModelResult<Solid> {
        let shape = self.kernel.duplicate(self.shape)?;
        Ok(Solid::new(shape, self.kernel.clone(), self.provenance.clone()))
    }

    // ========== Queries ==========

    pub fn bounding_box(&self) -> ModelResult<BoundingBox> {
        Ok(self.kernel.bounding_box(self.shape)?)
    }

    pub fn volume(&self) -> ModelResult<f64> {
        Ok(self.kernel.volume(self.shape)?)
    }

    pub fn classify(&self, point: DVec3) -> ModelResult<Containment> {
        Ok(self.kernel.classify(self.shape, point)?)
    }

    /// Current edges of the solid
    pub fn edges(&self) -> ModelResult<Vec<EdgeInfo>> {
        Ok(self.kernel.edges(self.shape)?)
    }

    pub(crate) fn with_fillet(&self, shape: ShapeId, radii: Vec<f64>, edges: usize) -> Solid {
        self.derived(shape, Operation::Fillet { radii, edges })
    }
}

/// Options for lofting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoftOptions {
    /// Straight rulings between sections instead of a smooth surface
    pub ruled: bool,
}

/// Entry point for forming solids on a kernel
#[derive(Clone)]
pub struct Modeler {
    kernel: Arc<dyn CadKernel>,
}

impl Default for Modeler {
    fn default() -> Self {
        Self::with_kernel(default_kernel())
    }
}

impl fmt::Debug for Modeler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modeler")
            .field("kernel", &self.kernel.name())
            .finish()
    }
}

impl Modeler {
    /// Modeler on the default kernel
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kernel(kernel: Arc<dyn CadKernel>) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Arc<dyn CadKernel> {
        &self.kernel
    }

    fn solid(&self, shape: ShapeId, step: Operation) -> Solid {
        tracing::debug!(shape = %shape, op = step.type_name(), "formed solid");
        Solid::new(shape, self.kernel.clone(), Provenance::new(step))
    }

    /// Extrude a drawing placed on `plane` by a signed distance along the
    /// plane normal
    pub fn extrude(
        &self,
        drawing: impl Into<Drawing>,
        plane: Plane,
        distance: f64,
    ) -> ModelResult<Solid> {
        self.extrude_sketch(&drawing.into().sketch_on(plane), distance)
    }

    pub fn extrude_sketch(&self, sketch: &Sketch, distance: f64) -> ModelResult<Solid> {
        let fail = |kind| FormingError::new("extrude", sketch.id, kind);
        if !sketch.drawing.is_closed() {
            return Err(fail(FormingErrorKind::OpenProfile).into());
        }
        if !distance.is_finite() || distance == 0.0 {
            return Err(fail(FormingErrorKind::InvalidParameter {
                name: "distance",
                value: distance,
            })
            .into());
        }
        let shape = self
            .kernel
            .extrude(sketch, distance)
            .map_err(|e| fail(FormingErrorKind::Kernel(e)))?;
        Ok(self.solid(
            shape,
            Operation::Extrude {
                sketch: sketch.id,
                distance,
            },
        ))
    }

    /// Full revolution about an axis in the plane's 2D coordinates
    pub fn revolve(
        &self,
        drawing: impl Into<Drawing>,
        plane: Plane,
        axis: Axis2,
    ) -> ModelResult<Solid> {
        self.revolve_by(drawing, plane, axis, 360.0)
    }

    /// Revolution by `angle_deg` degrees, in (0, 360]
    pub fn revolve_by(
        &self,
        drawing: impl Into<Drawing>,
        plane: Plane,
        axis: Axis2,
        angle_deg: f64,
    ) -> ModelResult<Solid> {
        let sketch = drawing.into().sketch_on(plane);
        let fail = |kind| FormingError::new("revolve", sketch.id, kind);
        if !sketch.drawing.is_closed() {
            return Err(fail(FormingErrorKind::OpenProfile).into());
        }
        if !angle_deg.is_finite() || angle_deg <= 0.0 || angle_deg > 360.0 {
            return Err(fail(FormingErrorKind::InvalidParameter {
                name: "angle",
                value: angle_deg,
            })
            .into());
        }
        let shape = self
            .kernel
            .revolve(&sketch, &axis, angle_deg.to_radians())
            .map_err(|e| fail(FormingErrorKind::Kernel(e)))?;
        Ok(self.solid(
            shape,
            Operation::Revolve {
                sketch: sketch.id,
                angle_deg,
            },
        ))
    }

    /// Sweep a closed profile along a planar path
    ///
    /// The profile's x axis points right of the direction of travel, its y
    /// axis along the path plane normal. With `with_contact` the profile is
    /// first moved so its first point sits on the start of the path.
    pub fn sweep(
        &self,
        profile: impl Into<Drawing>,
        path: &Wire,
        options: SweepOptions,
    ) -> ModelResult<Solid> {
        let mut profile = profile.into();
        let fail = |kind| FormingError::new("sweep", path.id(), kind);
        if !profile.is_closed() {
            return Err(fail(FormingErrorKind::OpenProfile).into());
        }
        if !matches!(path.kind(), WireKind::Planar { .. }) {
            return Err(fail(FormingErrorKind::NonPlanarPath).into());
        }
        if options.with_contact {
            let first = profile.outer_profile().first_point();
            profile = profile.translate(-first.x, -first.y);
        }
        let options = SweepOptions {
            with_contact: false,
            ..options
        };
        let shape = self
            .kernel
            .sweep(&profile, path, &options)
            .map_err(|e| fail(FormingErrorKind::Kernel(e)))?;
        Ok(self.solid(
            shape,
            Operation::Sweep {
                profile: profile.id(),
                path: path.id(),
            },
        ))
    }

    /// Loft through at least two closed planar sections
    pub fn loft(&self, sections: &[Wire], options: LoftOptions) -> ModelResult<Solid> {
        let source = sections.first().map(Wire::id).unwrap_or_else(Uuid::nil);
        let fail = |kind| FormingError::new("loft", source, kind);
        if sections.len() < 2 {
            return Err(fail(FormingErrorKind::TooFewSections(sections.len())).into());
        }
        for section in sections {
            if !matches!(section.kind(), WireKind::Planar { .. }) {
                return Err(fail(FormingErrorKind::NonPlanarSection).into());
            }
            if !section.is_closed() {
                return Err(fail(FormingErrorKind::OpenProfile).into());
            }
        }
        let shape = self
            .kernel
            .loft(sections, options.ruled)
            .map_err(|e| fail(FormingErrorKind::Kernel(e)))?;
        Ok(self.solid(
            shape,
            Operation::Loft {
                sections: sections.iter().map(Wire::id).collect(),
                ruled: options.ruled,
            },
        ))
    }

    /// Sweep a closed profile along a helix
    ///
    /// The profile's x axis runs along the helix axis and its y axis points
    /// radially outward from the helix radius. The result is turned by
    /// [`THREAD_SEAM_OFFSET_DEG`] about the helix axis.
    pub fn helical_sweep(&self, profile: impl Into<Drawing>, helix: &Helix) -> ModelResult<Solid> {
        let profile = profile.into();
        let fail = |kind| FormingError::new("helical sweep", profile.id(), kind);
        if !profile.is_closed() {
            return Err(fail(FormingErrorKind::OpenProfile).into());
        }
        for (name, value) in [
            ("pitch", helix.pitch),
            ("height", helix.height),
            ("radius", helix.radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(fail(FormingErrorKind::InvalidParameter { name, value }).into());
            }
        }
        let shape = self
            .kernel
            .helical_sweep(&profile, helix)
            .map_err(|e| fail(FormingErrorKind::Kernel(e)))?;
        let thread = self.solid(
            shape,
            Operation::HelicalSweep {
                profile: profile.id(),
                pitch: helix.pitch,
                height: helix.height,
            },
        );
        thread.rotate(THREAD_SEAM_OFFSET_DEG, helix.axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::kernel::{NullKernel, ReferenceKernel};
    use crate::plane::PlaneName;
    use crate::sketch::{PathBuilder, shapes};
    use approx::assert_relative_eq;

    fn xy() -> Plane {
        Plane::named(PlaneName::XY, 0.0)
    }

    fn reference() -> (Arc<ReferenceKernel>, Modeler) {
        let kernel = Arc::new(ReferenceKernel::new());
        let modeler = Modeler::with_kernel(kernel.clone());
        (kernel, modeler)
    }

    #[test]
    fn test_extruded_rectangle_bounding_box() {
        let modeler = Modeler::new();
        let solid = modeler
            .extrude(shapes::rectangle(30.0, 10.0).unwrap(), xy(), 4.0)
            .unwrap();
        let size = solid.bounding_box().unwrap().size();
        assert_relative_eq!(size.x, 30.0, epsilon = 1e-9);
        assert_relative_eq!(size.y, 10.0, epsilon = 1e-9);
        assert_relative_eq!(size.z, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_open_profile_is_rejected_before_the_kernel() {
        let modeler = Modeler::with_kernel(Arc::new(NullKernel));
        let open = PathBuilder::new().h_line(5.0).v_line(5.0).done().unwrap();
        let err = modeler.extrude(open, xy(), 1.0).unwrap_err();
        match err {
            ModelError::Forming(e) => {
                assert_eq!(e.op, "extrude");
                assert!(matches!(e.kind, FormingErrorKind::OpenProfile));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_helix_parameters_are_validated() {
        let modeler = Modeler::with_kernel(Arc::new(NullKernel));
        let tooth = shapes::rectangle(1.0, 1.0).unwrap();
        let err = modeler
            .helical_sweep(tooth, &Helix::new(0.0, 10.0, 3.0))
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Forming(FormingError {
                kind: FormingErrorKind::InvalidParameter { name: "pitch", .. },
                ..
            })
        ));
    }

    #[test]
    fn test_loft_needs_two_sections() {
        let modeler = Modeler::new();
        let circle = shapes::circle(2.0).unwrap();
        let err = modeler
            .loft(&[Wire::planar(&circle, xy())], LoftOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::Forming(FormingError {
                kind: FormingErrorKind::TooFewSections(1),
                ..
            })
        ));
    }

    #[test]
    fn test_rotation_round_trip() {
        let modeler = Modeler::new();
        let block = modeler
            .extrude(shapes::rectangle(12.0, 3.0).unwrap(), xy(), 5.0)
            .unwrap();
        let back = block
            .rotate(35.0, Axis3D::x())
            .unwrap()
            .rotate(-35.0, Axis3D::x())
            .unwrap();
        let (before, after) = (block.bounding_box().unwrap(), back.bounding_box().unwrap());
        assert!((before.size() - after.size()).abs().max_element() < 1e-9);
        assert_relative_eq!(
            block.volume().unwrap(),
            back.volume().unwrap(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_booleans_release_consumed_shapes() {
        let (kernel, modeler) = reference();
        let plate = modeler
            .extrude(shapes::rectangle(10.0, 10.0).unwrap(), xy(), 2.0)
            .unwrap();
        let hole = modeler
            .extrude(
                shapes::circle(2.0).unwrap(),
                Plane::named(PlaneName::XY, -1.0),
                4.0,
            )
            .unwrap();
        assert_eq!(kernel.shape_count(), 2);
        let plate = plate.cut(hole).unwrap();
        assert_eq!(kernel.shape_count(), 1);
        assert_eq!(
            plate.classify(DVec3::new(0.0, 0.0, 1.0)).unwrap(),
            Containment::Outside
        );
        assert_eq!(plate.provenance().len(), 2);
        drop(plate);
        assert_eq!(kernel.shape_count(), 0);
    }

    #[test]
    fn test_boolean_across_kernels_is_rejected() {
        let a = Modeler::new()
            .extrude(shapes::rectangle(1.0, 1.0).unwrap(), xy(), 1.0)
            .unwrap();
        let b = Modeler::new()
            .extrude(shapes::rectangle(1.0, 1.0).unwrap(), xy(), 1.0)
            .unwrap();
        let err = a.fuse(b).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Boolean(BooleanError {
                kind: BooleanErrorKind::ForeignKernel,
                ..
            })
        ));
    }

    #[test]
    fn test_sweep_with_contact_starts_on_the_path() {
        let modeler = Modeler::new();
        let path = PathBuilder::new().h_line(20.0).done().unwrap();
        let wire = Wire::planar(&path, xy());
        // Square whose first point is its lower left corner at (5, 5).
        let square = shapes::rectangle(2.0, 2.0).unwrap().translate(6.0, 6.0);
        let solid = modeler
            .sweep(
                square,
                &wire,
                SweepOptions {
                    with_contact: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let bbox = solid.bounding_box().unwrap();
        assert_relative_eq!(bbox.size().x, 20.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.size().z, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mirror_and_clone() {
        let modeler = Modeler::new();
        let block = modeler
            .extrude(shapes::rectangle(2.0, 2.0).unwrap(), xy(), 3.0)
            .unwrap();
        let copy = block.try_clone().unwrap();
        let mirrored = copy.mirror(Plane::named(PlaneName::XY, 0.0)).unwrap();
        let bbox = mirrored.bounding_box().unwrap();
        assert_relative_eq!(bbox.min.z, -3.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.z, 0.0, epsilon = 1e-9);
        assert_ne!(copy.id(), block.id());
    }
}
