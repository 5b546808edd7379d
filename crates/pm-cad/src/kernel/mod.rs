//! CAD Kernel Abstraction
//!
//! The modeling core drives geometry through the [`CadKernel`] trait. The
//! reference kernel is always compiled in; the OpenCASCADE and truck backends
//! are optional.

#[cfg(any(feature = "opencascade", test))]
mod mesh;
#[cfg(feature = "opencascade")]
pub mod opencascade;
pub mod reference;
mod traits;
#[cfg(feature = "truck")]
pub mod truck;

pub use traits::{
    BooleanHint, BooleanType, BoundingBox, CadKernel, Containment, EdgeId, EdgeInfo, FilletGroup,
    KernelError, KernelResult, NullKernel, ShapeId, SweepOptions, default_kernel,
};
pub use reference::{ReferenceKernel, ReferenceKernelConfig};
#[cfg(feature = "opencascade")]
pub use opencascade::OpenCascadeKernel;
#[cfg(feature = "truck")]
pub use truck::TruckKernel;
