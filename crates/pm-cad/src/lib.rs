//! Parametric Profile-to-Solid Modeling Core
//!
//! This crate provides:
//! - A pen-based 2D path builder and boolean drawings over closed profiles
//! - Sketch planes, axes and wires (sweep spines, loft sections, helices)
//! - Solid forming (extrude, revolve, sweep, loft, helical sweep)
//! - Booleans and transforms on owned solids
//! - Geometric edge selection and grouped fillets
//! - An abstract CAD kernel trait with a built-in reference kernel, plus
//!   optional OpenCASCADE and truck backends

pub mod edge;
pub mod error;
pub mod fillet;
pub mod kernel;
pub mod plane;
pub mod sketch;
pub mod solid;
pub mod wire;

// Re-exports for convenience
pub use edge::{EDGE_TOLERANCE, EdgeFilter, EdgeSet};
pub use error::{
    BooleanError, BooleanErrorKind, FilletError, FilletErrorKind, FormingError, FormingErrorKind,
    GeometryError, GeometryErrorKind, ModelError, ModelResult,
};
pub use fillet::{FilletSpec, fillet};
pub use kernel::{
    BooleanHint, BooleanType, BoundingBox, CadKernel, Containment, EdgeId, EdgeInfo, KernelError,
    KernelResult, NullKernel, ReferenceKernel, ReferenceKernelConfig, ShapeId, SweepOptions,
    default_kernel,
};
pub use plane::{Axis2, Axis3D, Plane, PlaneName};
pub use sketch::{
    ArcSense, Drawing, HexOrientation, MirrorAxis, PathBuilder, Profile, Sketch, SplineOptions,
    shapes,
};
pub use solid::{LoftOptions, Modeler, Operation, Provenance, Solid, THREAD_SEAM_OFFSET_DEG};
pub use wire::{Helix, Wire, WireKind};
