//! CAD Kernel trait definitions
//!
//! These traits define the interface that all CAD kernels must implement.
//! Shapes live inside the kernel and are addressed by [`ShapeId`]; the core
//! owns each id through exactly one `Solid` and releases it on drop.

use std::fmt;
use std::sync::Arc;

use glam::{DAffine3, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::plane::Axis2;
use crate::sketch::{Drawing, Sketch};
use crate::wire::{Helix, Wire};

/// Handle of a shape stored in a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeId(pub Uuid);

impl ShapeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an edge within a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId {
    /// Shape this edge belongs to
    pub shape: ShapeId,
    /// Index of the edge within the shape
    pub index: u32,
}

impl EdgeId {
    /// Create a new edge ID
    pub fn new(shape: ShapeId, index: u32) -> Self {
        Self { shape, index }
    }
}

/// Information about an edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeInfo {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Polyline through the edge, end points included
    pub points: Vec<DVec3>,
    /// Start point of the edge
    pub start: DVec3,
    /// End point of the edge
    pub end: DVec3,
    /// Midpoint of the edge
    pub midpoint: DVec3,
    /// Length of the edge
    pub length: f64,
    /// Whether the faces meeting at this edge are tangent (seams and
    /// already rounded edges)
    pub smooth: bool,
}

impl EdgeInfo {
    /// Create edge info from a polyline with at least two points
    pub fn new(id: EdgeId, points: Vec<DVec3>, smooth: bool) -> Self {
        let start = points.first().copied().unwrap_or(DVec3::ZERO);
        let end = points.last().copied().unwrap_or(start);
        let midpoint = polyline_midpoint(&points);
        let length = points.windows(2).map(|w| w[0].distance(w[1])).sum();
        Self {
            id,
            points,
            start,
            end,
            midpoint,
            length,
            smooth,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.start.distance(self.end) < 1e-9
    }

    /// Distance from `p` to the edge polyline
    pub fn distance_to(&self, p: DVec3) -> f64 {
        self.points
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Point halfway along a polyline by arc length
pub(crate) fn polyline_midpoint(points: &[DVec3]) -> DVec3 {
    let total: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    let mut remaining = total / 2.0;
    for w in points.windows(2) {
        let len = w[0].distance(w[1]);
        if len >= remaining && len > 0.0 {
            return w[0].lerp(w[1], remaining / len);
        }
        remaining -= len;
    }
    points.last().copied().unwrap_or(DVec3::ZERO)
}

pub(crate) fn point_segment_distance(p: DVec3, a: DVec3, b: DVec3) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// An empty (inverted) box
    pub fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        points
            .into_iter()
            .fold(Self::empty(), |bbox, p| bbox.expand_to_include(p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand_to_include(&self, point: DVec3) -> BoundingBox {
        BoundingBox {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Grow by `margin` on every side
    pub fn inflate(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            min: self.min - DVec3::splat(margin),
            max: self.max + DVec3::splat(margin),
        }
    }
}

/// Where a point lies relative to a solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Containment {
    Inside,
    Boundary,
    Outside,
}

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanType {
    /// Union (add)
    Union,
    /// Subtraction (cut)
    Subtract,
    /// Intersection (common)
    Intersect,
}

/// Performance hint for booleans; never changes the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BooleanHint {
    #[default]
    General,
    /// Operands share coincident faces that may be merged
    SameFace,
}

/// Options for sweeping a profile along a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepOptions {
    /// Move the profile so its first point sits on the start of the path
    pub with_contact: bool,
    /// Orient the profile with the path's Frenet frame instead of the path
    /// plane normal
    pub frenet: bool,
}

/// Edges rounded with one radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletGroup {
    pub edges: Vec<EdgeId>,
    pub radius: f64,
}

/// Error type for CAD kernel operations
#[derive(Debug, Clone, Error)]
pub enum KernelError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("Kernel not available: {0}")]
    KernelNotAvailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Shape not found: {0}")]
    ShapeNotFound(ShapeId),

    #[error("Edge {edge:?} does not belong to shape {shape}")]
    StaleEdge { edge: EdgeId, shape: ShapeId },

    #[error("Fillet radius {radius} in group {group} exceeds the feasible limit {limit:.4}")]
    FilletInfeasible {
        group: usize,
        radius: f64,
        limit: f64,
    },
}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// The main CAD kernel trait
///
/// Implementations of this trait provide the actual geometry operations
/// using different backends (the built-in reference kernel, Truck, etc.)
pub trait CadKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Check if the kernel is available
    fn is_available(&self) -> bool;

    /// Extrude a sketch along its plane normal
    ///
    /// # Arguments
    /// * `sketch` - Closed drawing placed on a plane
    /// * `distance` - Signed distance along the plane normal
    fn extrude(&self, sketch: &Sketch, distance: f64) -> KernelResult<ShapeId>;

    /// Revolve a sketch around an axis lying in its plane
    ///
    /// # Arguments
    /// * `sketch` - Closed drawing placed on a plane
    /// * `axis` - Rotation axis in the sketch plane's 2D coordinates
    /// * `angle` - The rotation angle in radians
    fn revolve(&self, sketch: &Sketch, axis: &Axis2, angle: f64) -> KernelResult<ShapeId>;

    /// Sweep a profile along a planar path
    ///
    /// # Arguments
    /// * `profile` - Closed profile; x points right of travel, y along the
    ///   path plane normal
    /// * `path` - Planar spine wire
    /// * `options` - Sweep options
    fn sweep(&self, profile: &Drawing, path: &Wire, options: &SweepOptions)
    -> KernelResult<ShapeId>;

    /// Loft through planar sections
    ///
    /// # Arguments
    /// * `sections` - At least two closed planar wires, in order
    /// * `ruled` - Whether to use ruled surfaces
    fn loft(&self, sections: &[Wire], ruled: bool) -> KernelResult<ShapeId>;

    /// Sweep a profile along a helix
    ///
    /// # Arguments
    /// * `profile` - Closed profile; x along the axis, y radially outward
    /// * `helix` - The helical spine
    fn helical_sweep(&self, profile: &Drawing, helix: &Helix) -> KernelResult<ShapeId>;

    /// Perform a boolean operation on two shapes
    ///
    /// # Arguments
    /// * `a` - The first shape
    /// * `b` - The second shape (the tool for subtraction)
    /// * `op` - The boolean operation type
    /// * `hint` - Performance hint
    fn boolean(
        &self,
        a: ShapeId,
        b: ShapeId,
        op: BooleanType,
        hint: BooleanHint,
    ) -> KernelResult<ShapeId>;

    /// Create a transformed copy of a shape (rigid motions and reflections)
    fn transform(&self, shape: ShapeId, transform: &DAffine3) -> KernelResult<ShapeId>;

    /// Create an independent copy of a shape
    fn duplicate(&self, shape: ShapeId) -> KernelResult<ShapeId>;

    /// Forget a shape; unknown ids are ignored
    fn release(&self, shape: ShapeId);

    // ========== Edge Query Methods ==========

    /// Get all edges of a shape with their geometric information
    fn edges(&self, shape: ShapeId) -> KernelResult<Vec<EdgeInfo>>;

    // ========== Fillet Methods ==========

    /// Round groups of edges, each group with its own radius, in one call
    ///
    /// # Arguments
    /// * `shape` - The shape to modify
    /// * `groups` - Disjoint edge groups with their radii
    fn fillet(&self, shape: ShapeId, groups: &[FilletGroup]) -> KernelResult<ShapeId>;

    // ========== Measurement Methods ==========

    fn bounding_box(&self, shape: ShapeId) -> KernelResult<BoundingBox>;

    fn volume(&self, shape: ShapeId) -> KernelResult<f64>;

    fn classify(&self, shape: ShapeId, point: DVec3) -> KernelResult<Containment>;
}

/// A null kernel that always returns errors (used when no kernel is available)
#[derive(Debug, Default)]
pub struct NullKernel;

fn not_available<T>() -> KernelResult<T> {
    Err(KernelError::KernelNotAvailable(
        "No CAD kernel available".into(),
    ))
}

impl CadKernel for NullKernel {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn extrude(&self, _sketch: &Sketch, _distance: f64) -> KernelResult<ShapeId> {
        not_available()
    }

    fn revolve(&self, _sketch: &Sketch, _axis: &Axis2, _angle: f64) -> KernelResult<ShapeId> {
        not_available()
    }

    fn sweep(
        &self,
        _profile: &Drawing,
        _path: &Wire,
        _options: &SweepOptions,
    ) -> KernelResult<ShapeId> {
        not_available()
    }

    fn loft(&self, _sections: &[Wire], _ruled: bool) -> KernelResult<ShapeId> {
        not_available()
    }

    fn helical_sweep(&self, _profile: &Drawing, _helix: &Helix) -> KernelResult<ShapeId> {
        not_available()
    }

    fn boolean(
        &self,
        _a: ShapeId,
        _b: ShapeId,
        _op: BooleanType,
        _hint: BooleanHint,
    ) -> KernelResult<ShapeId> {
        not_available()
    }

    fn transform(&self, _shape: ShapeId, _transform: &DAffine3) -> KernelResult<ShapeId> {
        not_available()
    }

    fn duplicate(&self, _shape: ShapeId) -> KernelResult<ShapeId> {
        not_available()
    }

    fn release(&self, _shape: ShapeId) {}

    fn edges(&self, _shape: ShapeId) -> KernelResult<Vec<EdgeInfo>> {
        not_available()
    }

    fn fillet(&self, _shape: ShapeId, _groups: &[FilletGroup]) -> KernelResult<ShapeId> {
        not_available()
    }

    fn bounding_box(&self, _shape: ShapeId) -> KernelResult<BoundingBox> {
        not_available()
    }

    fn volume(&self, _shape: ShapeId) -> KernelResult<f64> {
        not_available()
    }

    fn classify(&self, _shape: ShapeId, _point: DVec3) -> KernelResult<Containment> {
        not_available()
    }
}

/// Get the default CAD kernel
///
/// The reference kernel implements every operation; the OpenCASCADE and
/// truck backends have to be chosen explicitly with `Modeler::with_kernel`.
pub fn default_kernel() -> Arc<dyn CadKernel> {
    Arc::new(super::reference::ReferenceKernel::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_edge_info_midpoint_by_length() {
        let id = EdgeId::new(ShapeId::new(), 0);
        let edge = EdgeInfo::new(
            id,
            vec![DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0), DVec3::new(1.0, 3.0, 0.0)],
            false,
        );
        assert_relative_eq!(edge.length, 4.0);
        assert_relative_eq!(edge.midpoint.y, 1.0);
        assert_relative_eq!(edge.distance_to(DVec3::new(2.0, 2.0, 0.0)), 1.0);
        assert!(!edge.is_closed());
    }

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox::from_points([DVec3::ZERO, DVec3::new(2.0, -1.0, 3.0)]);
        assert_eq!(bbox.size(), DVec3::new(2.0, 1.0, 3.0));
        assert!(bbox.contains_point(DVec3::new(1.0, -0.5, 1.0)));
        assert!(BoundingBox::empty().is_empty());
    }

    #[test]
    fn test_null_kernel() {
        let kernel = NullKernel;
        assert!(!kernel.is_available());
        assert!(matches!(
            kernel.volume(ShapeId::new()),
            Err(KernelError::KernelNotAvailable(_))
        ));
    }
}
