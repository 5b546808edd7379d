//! 2D Sketch System
//!
//! Provides the pen-based path builder, the profiles it produces, boolean
//! drawings over closed profiles and the common shapes used by part recipes.

mod drawing;
mod path;
mod profile;
mod segment;
pub mod shapes;

pub use drawing::{Drawing, Sketch};
pub use path::{ArcSense, PathBuilder, SplineOptions};
pub use profile::{MirrorAxis, Profile};
pub(crate) use profile::polygon_area;
pub use segment::{ArcSegment, MIN_SEGMENT_LENGTH, Segment};
pub use shapes::HexOrientation;
