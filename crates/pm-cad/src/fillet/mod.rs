//! Edge rounding
//!
//! A [`FilletSpec`] is an ordered list of edge filters with radii. Each edge
//! of the solid goes to the first group whose filter matches it, and every
//! group is rounded in a single kernel call.

use crate::edge::EdgeFilter;
use crate::error::{FilletError, FilletErrorKind, ModelResult};
use crate::kernel::{FilletGroup, KernelError};
use crate::solid::Solid;

/// Edge groups with their radii, in priority order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilletSpec {
    groups: Vec<(EdgeFilter, f64)>,
}

impl FilletSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every edge with one radius
    pub fn all(radius: f64) -> Self {
        Self::new().with(EdgeFilter::All, radius)
    }

    /// Add a group; earlier groups take precedence
    pub fn with(mut self, filter: EdgeFilter, radius: f64) -> Self {
        self.groups.push((filter, radius));
        self
    }

    pub fn groups(&self) -> &[(EdgeFilter, f64)] {
        &self.groups
    }
}

/// Round the edges selected by `spec`
pub fn fillet(solid: Solid, spec: &FilletSpec) -> ModelResult<Solid> {
    for (index, (_, radius)) in spec.groups.iter().enumerate() {
        if !radius.is_finite() || *radius <= 0.0 {
            return Err(FilletError::new(Some(index), *radius, FilletErrorKind::InvalidRadius).into());
        }
    }

    let mut members: Vec<Vec<_>> = vec![Vec::new(); spec.groups.len()];
    for edge in solid.edges()? {
        if let Some(index) = spec.groups.iter().position(|(filter, _)| filter.matches(&edge)) {
            members[index].push(edge.id);
        }
    }

    // Only non-empty groups reach the kernel; remember where each came from.
    let mut origin = Vec::new();
    let mut groups = Vec::new();
    for (index, edges) in members.into_iter().enumerate() {
        if edges.is_empty() {
            continue;
        }
        tracing::trace!(group = index, edges = edges.len(), "fillet group");
        origin.push(index);
        groups.push(FilletGroup {
            edges,
            radius: spec.groups[index].1,
        });
    }
    if groups.is_empty() {
        tracing::debug!(shape = %solid.id(), "fillet selected no edges");
        return Ok(solid);
    }

    let shape = solid.kernel().fillet(solid.id(), &groups).map_err(|e| match e {
        KernelError::FilletInfeasible {
            group,
            radius,
            limit,
        } => {
            let group = origin.get(group).copied();
            tracing::warn!(?group, radius, limit, "fillet infeasible");
            FilletError::new(group, radius, FilletErrorKind::Infeasible { limit })
        }
        other => {
            let radius = groups.iter().map(|g| g.radius).fold(0.0, f64::max);
            tracing::warn!(radius, "fillet rejected: {other}");
            FilletError::new(None, radius, FilletErrorKind::Kernel(other))
        }
    })?;

    let edges = groups.iter().map(|g| g.edges.len()).sum();
    tracing::debug!(shape = %solid.id(), result = %shape, edges, "fillet");
    Ok(solid.with_fillet(shape, groups.iter().map(|g| g.radius).collect(), edges))
}

impl Solid {
    /// Round edges group by group
    pub fn fillet(self, spec: &FilletSpec) -> ModelResult<Solid> {
        fillet(self, spec)
    }

    /// Round every edge with one radius
    pub fn fillet_all(self, radius: f64) -> ModelResult<Solid> {
        fillet(self, &FilletSpec::all(radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::plane::{Plane, PlaneName};
    use crate::sketch::shapes;
    use crate::solid::Modeler;

    fn plate(modeler: &Modeler) -> Solid {
        modeler
            .extrude(
                shapes::rectangle(10.0, 10.0).unwrap(),
                Plane::named(PlaneName::XY, 0.0),
                2.0,
            )
            .unwrap()
    }

    #[test]
    fn test_first_matching_group_wins() {
        let modeler = Modeler::new();
        let caps = EdgeFilter::either([
            EdgeFilter::in_named_plane(PlaneName::XY, 0.0),
            EdgeFilter::in_named_plane(PlaneName::XY, 2.0),
        ]);
        // 1.5 only fits the vertical edges; the cap edges are claimed first.
        let spec = FilletSpec::new().with(caps, 0.5).with(EdgeFilter::All, 1.5);
        let rounded = plate(&modeler).fillet(&spec).unwrap();
        assert!(rounded.edges().unwrap().iter().all(|e| e.smooth));
    }

    #[test]
    fn test_radius_too_large_is_reported_not_clamped() {
        let modeler = Modeler::new();
        let spec = FilletSpec::new()
            .with(EdgeFilter::in_named_plane(PlaneName::XY, 20.0), 1.0)
            .with(EdgeFilter::All, 1.5);
        let err = plate(&modeler).fillet(&spec).unwrap_err();
        match err {
            ModelError::Fillet(e) => {
                assert_eq!(e.group, Some(1));
                assert_eq!(e.radius, 1.5);
                assert!(matches!(e.kind, FilletErrorKind::Infeasible { limit } if (limit - 1.0).abs() < 1e-9));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_radius() {
        let modeler = Modeler::new();
        let err = plate(&modeler).fillet_all(0.0).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Fillet(FilletError {
                kind: FilletErrorKind::InvalidRadius,
                group: Some(0),
                ..
            })
        ));
    }

    #[test]
    fn test_empty_selection_returns_solid_unchanged() {
        let modeler = Modeler::new();
        let solid = plate(&modeler);
        let id = solid.id();
        let spec = FilletSpec::new().with(EdgeFilter::in_named_plane(PlaneName::XY, 7.0), 1.0);
        let same = solid.fillet(&spec).unwrap();
        assert_eq!(same.id(), id);
    }
}
