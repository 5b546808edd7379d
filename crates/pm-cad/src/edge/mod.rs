//! Edge selection
//!
//! An [`EdgeFilter`] is a geometric predicate over edges. Bound to a solid it
//! becomes an [`EdgeSet`], which is evaluated against the solid's current
//! edges every time it is queried.

use std::ops::Not;

use glam::DVec3;

use crate::error::ModelResult;
use crate::kernel::{EdgeId, EdgeInfo};
use crate::plane::{Plane, PlaneName};
use crate::solid::Solid;

/// Distance within which a point counts as lying on a plane or an edge
pub const EDGE_TOLERANCE: f64 = 1e-6;

/// Geometric predicate over edges
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EdgeFilter {
    /// Every edge
    #[default]
    All,
    /// Edges lying entirely in a plane
    InPlane(Plane),
    /// Edges passing through a point
    ContainsPoint(DVec3),
    /// Edges matching any of the filters
    Either(Vec<EdgeFilter>),
    /// Edges matching all of the filters
    Both(Vec<EdgeFilter>),
    Not(Box<EdgeFilter>),
}

impl EdgeFilter {
    pub fn all() -> Self {
        EdgeFilter::All
    }

    pub fn in_plane(plane: Plane) -> Self {
        EdgeFilter::InPlane(plane)
    }

    /// Edges in a named plane moved `offset` along its normal
    pub fn in_named_plane(name: PlaneName, offset: f64) -> Self {
        EdgeFilter::InPlane(Plane::named(name, offset))
    }

    pub fn contains_point(point: DVec3) -> Self {
        EdgeFilter::ContainsPoint(point)
    }

    pub fn either(filters: impl IntoIterator<Item = EdgeFilter>) -> Self {
        EdgeFilter::Either(filters.into_iter().collect())
    }

    pub fn both(filters: impl IntoIterator<Item = EdgeFilter>) -> Self {
        EdgeFilter::Both(filters.into_iter().collect())
    }

    /// Edges matching this filter and `other`
    pub fn and(self, other: EdgeFilter) -> Self {
        match self {
            EdgeFilter::Both(mut filters) => {
                filters.push(other);
                EdgeFilter::Both(filters)
            }
            filter => EdgeFilter::Both(vec![filter, other]),
        }
    }

    pub fn matches(&self, edge: &EdgeInfo) -> bool {
        match self {
            EdgeFilter::All => true,
            EdgeFilter::InPlane(plane) => edge
                .points
                .iter()
                .all(|p| plane.contains(*p, EDGE_TOLERANCE)),
            EdgeFilter::ContainsPoint(point) => edge.distance_to(*point) <= EDGE_TOLERANCE,
            EdgeFilter::Either(filters) => filters.iter().any(|f| f.matches(edge)),
            EdgeFilter::Both(filters) => filters.iter().all(|f| f.matches(edge)),
            EdgeFilter::Not(filter) => !filter.matches(edge),
        }
    }
}

impl Not for EdgeFilter {
    type Output = EdgeFilter;

    fn not(self) -> EdgeFilter {
        match self {
            EdgeFilter::Not(inner) => *inner,
            filter => EdgeFilter::Not(Box::new(filter)),
        }
    }
}

/// Edges of one solid selected by a filter
#[derive(Debug, Clone)]
pub struct EdgeSet<'s> {
    solid: &'s Solid,
    filter: EdgeFilter,
}

impl<'s> EdgeSet<'s> {
    pub fn new(solid: &'s Solid, filter: EdgeFilter) -> Self {
        Self { solid, filter }
    }

    pub fn filter(&self) -> &EdgeFilter {
        &self.filter
    }

    /// Matching edges of the solid as it is now
    pub fn find(&self) -> ModelResult<Vec<EdgeInfo>> {
        let edges: Vec<EdgeInfo> = self
            .solid
            .edges()?
            .into_iter()
            .filter(|edge| self.filter.matches(edge))
            .collect();
        tracing::trace!(
            shape = %self.solid.id(),
            matched = edges.len(),
            "resolved edge selection"
        );
        Ok(edges)
    }

    pub fn ids(&self) -> ModelResult<Vec<EdgeId>> {
        Ok(self.find()?.into_iter().map(|edge| edge.id).collect())
    }

    pub fn count(&self) -> ModelResult<usize> {
        Ok(self.find()?.len())
    }
}

impl Solid {
    /// Select edges of this solid
    pub fn select_edges(&self, filter: EdgeFilter) -> EdgeSet<'_> {
        EdgeSet::new(self, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::ShapeId;
    use crate::solid::Modeler;
    use crate::sketch::shapes;

    fn edge(points: Vec<DVec3>) -> EdgeInfo {
        EdgeInfo::new(EdgeId::new(ShapeId::new(), 0), points, false)
    }

    #[test]
    fn test_in_plane_needs_every_point() {
        let flat = edge(vec![DVec3::new(0.0, 0.0, 2.0), DVec3::new(4.0, 1.0, 2.0)]);
        let rising = edge(vec![DVec3::new(0.0, 0.0, 2.0), DVec3::new(0.0, 0.0, 3.0)]);
        let filter = EdgeFilter::in_named_plane(PlaneName::XY, 2.0);
        assert!(filter.matches(&flat));
        assert!(!filter.matches(&rising));
    }

    #[test]
    fn test_combinators() {
        let e = edge(vec![DVec3::ZERO, DVec3::new(0.0, 10.0, 0.0)]);
        let on_edge = EdgeFilter::contains_point(DVec3::new(0.0, 4.0, 0.0));
        let elsewhere = EdgeFilter::contains_point(DVec3::new(1.0, 4.0, 0.0));
        assert!(on_edge.matches(&e));
        assert!(!elsewhere.matches(&e));
        assert!(EdgeFilter::either([elsewhere.clone(), on_edge.clone()]).matches(&e));
        assert!(!on_edge.clone().and(elsewhere.clone()).matches(&e));
        assert!((!elsewhere).matches(&e));
        assert_eq!(!!on_edge.clone(), on_edge);
    }

    #[test]
    fn test_select_end_face_edges_of_block() {
        let modeler = Modeler::new();
        let block = modeler
            .extrude(
                shapes::rectangle(4.0, 4.0).unwrap(),
                Plane::named(PlaneName::YZ, 0.0),
                10.0,
            )
            .unwrap();
        let ends = block.select_edges(EdgeFilter::either([
            EdgeFilter::in_named_plane(PlaneName::YZ, 0.0),
            EdgeFilter::in_named_plane(PlaneName::YZ, 10.0),
        ]));
        assert_eq!(ends.count().unwrap(), 8);
        assert_eq!(block.select_edges(EdgeFilter::all()).count().unwrap(), 12);
        assert_eq!(
            block.select_edges(!EdgeFilter::all()).ids().unwrap().len(),
            0
        );
    }
}
