//! Modeling Errors
//!
//! Errors raised while building profiles, forming solids, combining them and
//! rounding their edges. Kernel failures are wrapped so callers always learn
//! which operation and which input failed.

use thiserror::Error;
use uuid::Uuid;

use crate::kernel::{BooleanType, KernelError};

/// Reason a profile construction step failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryErrorKind {
    #[error("Segment is degenerate (shorter than 1e-9 mm)")]
    DegenerateSegment,

    #[error("Pen can only be moved before the first segment")]
    MoveAfterSegments,

    #[error("Corner radius {radius} needs {needed:.4} mm of trim but only {available:.4} mm is available")]
    InfeasibleCorner {
        radius: f64,
        needed: f64,
        available: f64,
    },

    #[error("Custom corner needs straight segments on both sides")]
    CornerNeedsLines,

    #[error("Collinear segments cannot be rounded")]
    CollinearCorner,

    #[error("Custom corner was never followed by a segment")]
    DanglingCorner,

    #[error("Radius must be positive and finite, got {0}")]
    InvalidRadius(f64),

    #[error("Path has no segments")]
    EmptyPath,

    #[error("Mirror axis is degenerate: first and last points coincide")]
    DegenerateMirrorAxis,

    #[error("Operation requires a closed profile")]
    NotClosed,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A failed 2D construction step
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{op} (operation #{index}) failed: {kind}")]
pub struct GeometryError {
    /// Name of the builder or profile operation
    pub op: &'static str,
    /// Zero-based index of the operation within its builder
    pub index: usize,
    pub kind: GeometryErrorKind,
}

impl GeometryError {
    pub fn new(op: &'static str, index: usize, kind: GeometryErrorKind) -> Self {
        Self { op, index, kind }
    }
}

/// Reason a forming operation failed
#[derive(Debug, Clone, Error)]
pub enum FormingErrorKind {
    #[error("Profile is not closed")]
    OpenProfile,

    #[error("Loft needs at least 2 sections, got {0}")]
    TooFewSections(usize),

    #[error("Loft sections must be planar wires")]
    NonPlanarSection,

    #[error("Sweep path must be a planar wire")]
    NonPlanarPath,

    #[error("{name} is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Kernel rejected the operation: {0}")]
    Kernel(#[source] KernelError),
}

/// A failed extrude, revolve, sweep, loft or helical sweep
#[derive(Debug, Clone, Error)]
#[error("{op} of {source_id} failed: {kind}")]
pub struct FormingError {
    pub op: &'static str,
    /// Id of the sketch or wire that was being formed
    pub source_id: Uuid,
    pub kind: FormingErrorKind,
}

impl FormingError {
    pub fn new(op: &'static str, source_id: Uuid, kind: FormingErrorKind) -> Self {
        Self {
            op,
            source_id,
            kind,
        }
    }
}

/// Reason a boolean failed
#[derive(Debug, Clone, Error)]
pub enum BooleanErrorKind {
    #[error("Operands belong to different kernels")]
    ForeignKernel,

    #[error("Kernel rejected the operation: {0}")]
    Kernel(#[source] KernelError),
}

/// A failed fuse, cut or intersect
#[derive(Debug, Clone, Error)]
#[error("Boolean {op:?} failed: {kind}")]
pub struct BooleanError {
    pub op: BooleanType,
    pub kind: BooleanErrorKind,
}

impl BooleanError {
    pub fn new(op: BooleanType, kind: BooleanErrorKind) -> Self {
        Self { op, kind }
    }
}

/// Reason a fillet failed
#[derive(Debug, Clone, Error)]
pub enum FilletErrorKind {
    #[error("Radius must be positive and finite")]
    InvalidRadius,

    #[error("Radius exceeds the largest feasible radius {limit:.4}")]
    Infeasible { limit: f64 },

    #[error("Kernel rejected the operation: {0}")]
    Kernel(#[source] KernelError),
}

/// A failed fillet, naming the offending group when known
#[derive(Debug, Clone, Error)]
#[error("Fillet of group {group:?} with radius {radius} failed: {kind}")]
pub struct FilletError {
    pub group: Option<usize>,
    pub radius: f64,
    pub kind: FilletErrorKind,
}

impl FilletError {
    pub fn new(group: Option<usize>, radius: f64, kind: FilletErrorKind) -> Self {
        Self {
            group,
            radius,
            kind,
        }
    }
}

/// Any error produced by the modeling core
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Forming error: {0}")]
    Forming(#[from] FormingError),

    #[error("Boolean error: {0}")]
    Boolean(#[from] BooleanError),

    #[error("Fillet error: {0}")]
    Fillet(#[from] FilletError),

    #[error("CAD kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Result type for modeling operations
pub type ModelResult<T> = Result<T, ModelError>;
