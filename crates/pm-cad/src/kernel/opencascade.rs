//! OpenCASCADE CAD Kernel Backend
//!
//! Provides bindings to the OpenCASCADE geometry kernel via opencascade-sys.
//!
//! Drawings are handed over as closed polylines. Fillets, sweeps and lofts
//! are OCCT's own; a helical sweep is a ruled loft through the profile placed
//! at regular turns of the helix. Bounding boxes, volumes and point
//! classification are measured on a tessellation of the shape. OCCT does not
//! report tangent continuity through these bindings, so no edge is marked
//! smooth.

use std::collections::HashMap;

use glam::{DAffine3, DVec2, DVec3};
use opencascade_sys::ffi;
use parking_lot::Mutex;

use super::mesh::TriangleMesh;
use super::{
    BooleanHint, BooleanType, BoundingBox, CadKernel, Containment, EdgeId, EdgeInfo, FilletGroup,
    KernelError, KernelResult, ShapeId, SweepOptions,
};
use crate::plane::{Axis2, Axis3D, Plane};
use crate::sketch::{Drawing, Profile, Sketch};
use crate::wire::{Helix, Wire, WireKind};

/// Chord tolerance used to turn profile curves into polylines
const SAMPLE_TOLERANCE: f64 = 0.01;
/// Linear deflection of the tessellation used for measurements
const MESH_TOLERANCE: f64 = 0.01;
/// Points closer than this to the tessellation are on the boundary
const BOUNDARY_TOLERANCE: f64 = 1e-6;
/// Parameter samples along an edge curve
const EDGE_SAMPLES: usize = 16;
/// Loft sections per helix turn
const HELIX_SECTIONS_PER_TURN: f64 = 24.0;

/// OpenCASCADE-based CAD kernel
pub struct OpenCascadeKernel {
    /// Storage for solid data
    solids: Mutex<HashMap<ShapeId, OccSolid>>,
}

/// Wrapper for OpenCASCADE solid
struct OccSolid {
    shape: cxx::UniquePtr<ffi::TopoDS_Shape>,
}

// SAFETY: a stored shape is only read while the store lock is held, and
// clones are deep copies owned by the caller. OCCT reference counts are
// atomic.
unsafe impl Send for OccSolid {}

impl Clone for OccSolid {
    fn clone(&self) -> Self {
        Self {
            shape: ffi::BRepBuilderAPI_Copy_ctor(&self.shape).Shape(),
        }
    }
}

impl OpenCascadeKernel {
    /// Create a new OpenCASCADE kernel
    pub fn new() -> Self {
        Self {
            solids: Mutex::new(HashMap::new()),
        }
    }

    fn store(&self, shape: cxx::UniquePtr<ffi::TopoDS_Shape>) -> KernelResult<ShapeId> {
        if shape.is_null() {
            return Err(KernelError::OperationFailed(
                "OpenCASCADE returned no shape".into(),
            ));
        }
        let id = ShapeId::new();
        self.solids.lock().insert(id, OccSolid { shape });
        Ok(id)
    }

    fn get(&self, id: ShapeId) -> KernelResult<OccSolid> {
        self.solids
            .lock()
            .get(&id)
            .cloned()
            .ok_or(KernelError::ShapeNotFound(id))
    }

    /// Form every leaf of a drawing with `form` and combine the results with
    /// the drawing's booleans
    fn form_drawing(
        &self,
        drawing: &Drawing,
        form: &dyn Fn(&Profile) -> KernelResult<OccSolid>,
    ) -> KernelResult<OccSolid> {
        match drawing {
            Drawing::Profile(profile) => form(profile),
            Drawing::Fuse(a, b) => Ok(combine(
                &self.form_drawing(a, form)?,
                &self.form_drawing(b, form)?,
                BooleanType::Union,
            )),
            Drawing::Cut(a, b) => Ok(combine(
                &self.form_drawing(a, form)?,
                &self.form_drawing(b, form)?,
                BooleanType::Subtract,
            )),
            Drawing::Intersect(a, b) => Ok(combine(
                &self.form_drawing(a, form)?,
                &self.form_drawing(b, form)?,
                BooleanType::Intersect,
            )),
        }
    }

    /// Visit the edges of a shape, each once, with its index and polyline.
    /// The explorer reaches an edge from every face it bounds; the first
    /// visit decides its index.
    fn for_each_edge(solid: &OccSolid, mut visit: impl FnMut(usize, &ffi::TopoDS_Edge, &[DVec3])) {
        let mut seen: Vec<Vec<DVec3>> = Vec::new();
        let mut explorer =
            ffi::TopExp_Explorer_ctor(&solid.shape, ffi::TopAbs_ShapeEnum::TopAbs_EDGE);
        while ffi::TopExp_Explorer_More(&explorer) {
            let edge_shape = ffi::TopExp_Explorer_Current(&explorer);
            let edge = ffi::TopoDS_cast_to_edge(&edge_shape);

            let mut first = 0.0f64;
            let mut last = 0.0f64;
            let curve = ffi::BRep_Tool_Curve(&edge, &mut first, &mut last);
            if !curve.is_null() {
                let points = straighten(
                    (0..=EDGE_SAMPLES)
                        .map(|i| {
                            let t = first + (last - first) * i as f64 / EDGE_SAMPLES as f64;
                            from_pnt(&ffi::Geom_Curve_Value(&curve, t))
                        })
                        .collect(),
                );
                if !seen.iter().any(|other| same_polyline(other, &points)) {
                    visit(seen.len(), &edge, &points);
                    seen.push(points);
                }
            }

            ffi::TopExp_Explorer_Next(&mut explorer);
        }
    }

    /// Tessellate a shape into one triangle mesh
    fn tessellate(solid: &OccSolid) -> TriangleMesh {
        let _mesh_builder =
            ffi::BRepMesh_IncrementalMesh_ctor(&solid.shape, MESH_TOLERANCE, false, 0.5, true);

        let mut mesh = TriangleMesh::new();
        let mut explorer =
            ffi::TopExp_Explorer_ctor(&solid.shape, ffi::TopAbs_ShapeEnum::TopAbs_FACE);
        while ffi::TopExp_Explorer_More(&explorer) {
            let face_shape = ffi::TopExp_Explorer_Current(&explorer);
            let face = ffi::TopoDS_cast_to_face(&face_shape);

            let location = ffi::TopLoc_Location_ctor();
            let triangulation = ffi::BRep_Tool_Triangulation(&face, &location);
            if !triangulation.is_null() {
                let nb_nodes = ffi::Poly_Triangulation_NbNodes(&triangulation);
                let nb_triangles = ffi::Poly_Triangulation_NbTriangles(&triangulation);
                let vertices = (1..=nb_nodes)
                    .map(|i| {
                        let node = ffi::Poly_Triangulation_Node(&triangulation, i);
                        from_pnt(&ffi::gp_Pnt_Transformed(
                            &node,
                            &ffi::TopLoc_Location_Transformation(&location),
                        ))
                    })
                    .collect();
                let reversed = ffi::TopoDS_Shape_Orientation(&face_shape)
                    == ffi::TopAbs_Orientation::TopAbs_REVERSED;
                let triangles = (1..=nb_triangles).map(|i| {
                    let triangle = ffi::Poly_Triangulation_Triangle(&triangulation, i);
                    let corner = |k| ffi::Poly_Triangle_Value(&triangle, k) as usize - 1;
                    if reversed {
                        [corner(1), corner(3), corner(2)]
                    } else {
                        [corner(1), corner(2), corner(3)]
                    }
                });
                mesh.append(vertices, triangles);
            }

            ffi::TopExp_Explorer_Next(&mut explorer);
        }
        mesh
    }
}

impl Default for OpenCascadeKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn to_pnt(p: DVec3) -> cxx::UniquePtr<ffi::gp_Pnt> {
    ffi::new_gp_Pnt(p.x, p.y, p.z)
}

fn from_pnt(p: &ffi::gp_Pnt) -> DVec3 {
    DVec3::new(ffi::gp_Pnt_X(p), ffi::gp_Pnt_Y(p), ffi::gp_Pnt_Z(p))
}

/// Only the end points of a polyline that runs straight
fn straighten(points: Vec<DVec3>) -> Vec<DVec3> {
    let (Some(start), Some(end)) = (points.first().copied(), points.last().copied()) else {
        return points;
    };
    let straight = start.distance(end) > 1e-9
        && points
            .iter()
            .all(|p| super::traits::point_segment_distance(*p, start, end) < 1e-9);
    if straight { vec![start, end] } else { points }
}

fn same_polyline(a: &[DVec3], b: &[DVec3]) -> bool {
    let close = |p: DVec3, q: DVec3| p.distance(q) < 1e-7;
    a.len() == b.len()
        && (a.iter().zip(b).all(|(p, q)| close(*p, *q))
            || a.iter().zip(b.iter().rev()).all(|(p, q)| close(*p, *q)))
}

/// Wire through world points, closed back to the first point when `closed`
fn polyline_wire(
    points: &[DVec3],
    closed: bool,
) -> KernelResult<cxx::UniquePtr<ffi::TopoDS_Wire>> {
    let mut points: Vec<DVec3> = points.to_vec();
    if closed && points.len() > 1 && points[0].distance(points[points.len() - 1]) < 1e-9 {
        points.pop();
    }
    let needed = if closed { 3 } else { 2 };
    if points.len() < needed {
        return Err(KernelError::InvalidProfile(format!(
            "wire needs at least {needed} points, got {}",
            points.len()
        )));
    }
    let pnts: Vec<_> = points.iter().map(|p| to_pnt(*p)).collect();
    let count = if closed { pnts.len() } else { pnts.len() - 1 };

    let mut wire_builder = ffi::BRepBuilderAPI_MakeWire_ctor();
    for i in 0..count {
        let edge = ffi::BRepBuilderAPI_MakeEdge_gp_Pnt_gp_Pnt(&pnts[i], &pnts[(i + 1) % pnts.len()]);
        ffi::BRepBuilderAPI_MakeWire_Add_edge(&mut wire_builder, &edge.Edge());
    }
    Ok(wire_builder.Wire())
}

/// Closed wire of a profile placed on a plane
fn profile_wire(profile: &Profile, plane: &Plane) -> KernelResult<cxx::UniquePtr<ffi::TopoDS_Wire>> {
    let points: Vec<DVec3> = profile
        .sample(SAMPLE_TOLERANCE)
        .into_iter()
        .map(|p| plane.to_world(p))
        .collect();
    polyline_wire(&points, true)
}

fn combine(a: &OccSolid, b: &OccSolid, op: BooleanType) -> OccSolid {
    let result = match op {
        BooleanType::Union => ffi::BRepAlgoAPI_Fuse_ctor(&a.shape, &b.shape),
        BooleanType::Subtract => ffi::BRepAlgoAPI_Cut_ctor(&a.shape, &b.shape),
        BooleanType::Intersect => ffi::BRepAlgoAPI_Common_ctor(&a.shape, &b.shape),
    };
    OccSolid {
        shape: result.Shape(),
    }
}

impl CadKernel for OpenCascadeKernel {
    fn name(&self) -> &str {
        "opencascade"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extrude(&self, sketch: &Sketch, distance: f64) -> KernelResult<ShapeId> {
        let plane = sketch.plane;
        let offset = plane.normal * distance;
        let solid = self.form_drawing(&sketch.drawing, &|profile| {
            let wire = profile_wire(profile, &plane)?;
            let face = ffi::BRepBuilderAPI_MakeFace_wire(&wire, true);
            let dir = ffi::new_gp_Vec(offset.x, offset.y, offset.z);
            let prism = ffi::BRepPrimAPI_MakePrism_ctor(&face.Face().as_shape(), &dir, false, true);
            Ok(OccSolid {
                shape: prism.Shape(),
            })
        })?;
        self.store(solid.shape)
    }

    fn revolve(&self, sketch: &Sketch, axis: &Axis2, angle: f64) -> KernelResult<ShapeId> {
        let plane = sketch.plane;
        let world_axis = Axis3D::from_plane_axis(&plane, axis);
        let solid = self.form_drawing(&sketch.drawing, &|profile| {
            let wire = profile_wire(profile, &plane)?;
            let face = ffi::BRepBuilderAPI_MakeFace_wire(&wire, true);
            let axis_origin = to_pnt(world_axis.origin);
            let d = world_axis.direction;
            let axis_dir = ffi::new_gp_Dir(d.x, d.y, d.z);
            let gp_axis = ffi::new_gp_Ax1(&axis_origin, &axis_dir);
            let revol =
                ffi::BRepPrimAPI_MakeRevol_ctor(&face.Face().as_shape(), &gp_axis, angle, true);
            Ok(OccSolid {
                shape: revol.Shape(),
            })
        })?;
        self.store(solid.shape)
    }

    fn sweep(
        &self,
        profile: &Drawing,
        path: &Wire,
        options: &SweepOptions,
    ) -> KernelResult<ShapeId> {
        let WireKind::Planar {
            profile: spine,
            plane,
        } = path.kind()
        else {
            return Err(KernelError::InvalidProfile(
                "sweep path must be a planar wire".into(),
            ));
        };
        if options.with_contact {
            tracing::trace!("sweep received with_contact; profile used as given");
        }
        let spine_points = spine.sample(SAMPLE_TOLERANCE);
        let (Some(start), Some(next)) = (spine_points.first(), spine_points.get(1)) else {
            return Err(KernelError::InvalidProfile("sweep path is empty".into()));
        };
        let forward = (*next - *start).normalize_or_zero();
        let right = plane.vector_to_world(DVec2::new(forward.y, -forward.x));
        let origin = plane.to_world(*start);
        let path_points: Vec<DVec3> = spine_points.iter().map(|p| plane.to_world(*p)).collect();
        let path_wire = polyline_wire(&path_points, path.is_closed())?;

        // Profile x runs right of travel, y along the path plane normal.
        let solid = self.form_drawing(profile, &|leaf| {
            let points: Vec<DVec3> = leaf
                .sample(SAMPLE_TOLERANCE)
                .into_iter()
                .map(|q| origin + right * q.x + plane.normal * q.y)
                .collect();
            let profile_wire = polyline_wire(&points, true)?;
            let mut pipe = ffi::BRepOffsetAPI_MakePipeShell_ctor(&path_wire);
            ffi::BRepOffsetAPI_MakePipeShell_Add_wire(&mut pipe, &profile_wire, false, false);
            ffi::BRepOffsetAPI_MakePipeShell_Build(&mut pipe);
            ffi::BRepOffsetAPI_MakePipeShell_MakeSolid(&mut pipe);
            Ok(OccSolid {
                shape: ffi::BRepOffsetAPI_MakePipeShell_Shape(&pipe),
            })
        })?;
        self.store(solid.shape)
    }

    fn loft(&self, sections: &[Wire], ruled: bool) -> KernelResult<ShapeId> {
        if sections.len() < 2 {
            return Err(KernelError::InvalidProfile(format!(
                "loft needs at least two sections, got {}",
                sections.len()
            )));
        }
        let mut loft = ffi::BRepOffsetAPI_ThruSections_ctor(true, ruled, 1e-6);
        for section in sections {
            let wire = polyline_wire(&section.sample(SAMPLE_TOLERANCE), true)?;
            ffi::BRepOffsetAPI_ThruSections_AddWire(&mut loft, &wire);
        }
        ffi::BRepOffsetAPI_ThruSections_Build(&mut loft);
        self.store(ffi::BRepOffsetAPI_ThruSections_Shape(&loft))
    }

    fn helical_sweep(&self, profile: &Drawing, helix: &Helix) -> KernelResult<ShapeId> {
        if helix.pitch <= 0.0 || helix.height <= 0.0 || helix.radius <= 0.0 {
            return Err(KernelError::InvalidProfile(format!(
                "helix needs positive pitch, height and radius, got {helix:?}"
            )));
        }
        let turns = helix.turns();
        let count = ((turns * HELIX_SECTIONS_PER_TURN).ceil() as usize).max(1);
        let solid = self.form_drawing(profile, &|leaf| {
            let outline = leaf.sample(SAMPLE_TOLERANCE);
            let mut loft = ffi::BRepOffsetAPI_ThruSections_ctor(true, true, 1e-6);
            for i in 0..=count {
                let u = turns * i as f64 / count as f64;
                let points: Vec<DVec3> = outline
                    .iter()
                    .map(|q| helix.point_at(u, q.x, q.y))
                    .collect();
                let wire = polyline_wire(&points, true)?;
                ffi::BRepOffsetAPI_ThruSections_AddWire(&mut loft, &wire);
            }
            ffi::BRepOffsetAPI_ThruSections_Build(&mut loft);
            Ok(OccSolid {
                shape: ffi::BRepOffsetAPI_ThruSections_Shape(&loft),
            })
        })?;
        self.store(solid.shape)
    }

    fn boolean(
        &self,
        a: ShapeId,
        b: ShapeId,
        op: BooleanType,
        _hint: BooleanHint,
    ) -> KernelResult<ShapeId> {
        let (solid_a, solid_b) = (self.get(a)?, self.get(b)?);
        self.store(combine(&solid_a, &solid_b, op).shape)
    }

    fn transform(&self, shape: ShapeId, transform: &DAffine3) -> KernelResult<ShapeId> {
        let solid = self.get(shape)?;
        let m = transform.matrix3;
        let t = transform.translation;
        let mut trsf = ffi::new_gp_Trsf();
        ffi::gp_Trsf_SetValues(
            &mut trsf, m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x, m.x_axis.y, m.y_axis.y,
            m.z_axis.y, t.y, m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z,
        );
        let moved = ffi::BRepBuilderAPI_Transform_ctor(&solid.shape, &trsf, true);
        self.store(moved.Shape())
    }

    fn duplicate(&self, shape: ShapeId) -> KernelResult<ShapeId> {
        let solid = self.get(shape)?;
        self.store(solid.shape)
    }

    fn release(&self, shape: ShapeId) {
        self.solids.lock().remove(&shape);
    }

    fn edges(&self, shape: ShapeId) -> KernelResult<Vec<EdgeInfo>> {
        let solid = self.get(shape)?;
        let mut edges = Vec::new();
        Self::for_each_edge(&solid, |index, _, points| {
            edges.push(EdgeInfo::new(
                EdgeId::new(shape, index as u32),
                points.to_vec(),
                false,
            ));
        });
        Ok(edges)
    }

    fn fillet(&self, shape: ShapeId, groups: &[FilletGroup]) -> KernelResult<ShapeId> {
        let solid = self.get(shape)?;
        let mut radius_of: HashMap<u32, f64> = HashMap::new();
        for group in groups {
            for edge in &group.edges {
                if edge.shape != shape {
                    return Err(KernelError::StaleEdge { edge: *edge, shape });
                }
                radius_of.insert(edge.index, group.radius);
            }
        }

        let mut fillet = ffi::BRepFilletAPI_MakeFillet_ctor(&solid.shape);
        let mut count = 0usize;
        Self::for_each_edge(&solid, |index, edge, _| {
            count += 1;
            if let Some(radius) = radius_of.get(&(index as u32)) {
                ffi::BRepFilletAPI_MakeFillet_Add(&mut fillet, *radius, edge);
            }
        });
        if let Some(index) = radius_of.keys().find(|i| **i as usize >= count) {
            return Err(KernelError::StaleEdge {
                edge: EdgeId::new(shape, *index),
                shape,
            });
        }
        ffi::BRepFilletAPI_MakeFillet_Build(&mut fillet);
        self.store(ffi::BRepFilletAPI_MakeFillet_Shape(&fillet))
    }

    fn bounding_box(&self, shape: ShapeId) -> KernelResult<BoundingBox> {
        Ok(Self::tessellate(&self.get(shape)?).bounding_box())
    }

    fn volume(&self, shape: ShapeId) -> KernelResult<f64> {
        Ok(Self::tessellate(&self.get(shape)?).volume())
    }

    fn classify(&self, shape: ShapeId, point: DVec3) -> KernelResult<Containment> {
        Ok(Self::tessellate(&self.get(shape)?).classify(point, BOUNDARY_TOLERANCE))
    }
}
