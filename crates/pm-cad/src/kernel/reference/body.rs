//! Bodies: a distance field plus the edges and planar faces that describe
//! its topology
//!
//! Edges of a boolean result are the operands' edges, the intersection lines
//! of their planar faces and the cuts of planar faces through curved sheets,
//! clipped to the parts that lie on the new boundary and still separate two
//! non-coplanar faces.

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::sync::Arc;

use glam::{DAffine2, DAffine3, DVec2, DVec3};

use super::ReferenceKernelConfig;
use super::field::Field;
use super::region::Region;
use super::round::Round;
use crate::kernel::traits::point_segment_distance;
use crate::kernel::{BooleanType, BoundingBox, Containment};
use crate::plane::Plane;

/// Directions sampled around an edge to tell creases from flat seams
const CREASE_SAMPLES: usize = 16;
/// Samples along a straight candidate edge when clipping it
const LINE_SAMPLES: usize = 16;
/// Bisection steps when refining the end of a clipped line
const REFINE_STEPS: usize = 24;
/// Pieces shorter than this are dropped
const MIN_EDGE_LENGTH: f64 = 1e-6;
/// Sine of the largest angle between two edges at a vertex that still counts
/// as a tangent join once curves are sampled to the chord tolerance
const TANGENT_TOLERANCE: f64 = 2e-2;
/// Points across a round's arc in the sheet that records it
const ROUND_ARC_SAMPLES: usize = 8;

#[derive(Debug, Clone)]
pub(crate) struct EdgeCurve {
    pub points: Vec<DVec3>,
    /// Faces on both sides are tangent
    pub smooth: bool,
}

impl EdgeCurve {
    pub fn new(points: Vec<DVec3>, smooth: bool) -> Self {
        Self { points, smooth }
    }

    pub fn line(a: DVec3, b: DVec3, smooth: bool) -> Self {
        Self::new(vec![a, b], smooth)
    }

    pub fn start(&self) -> DVec3 {
        self.points[0]
    }

    pub fn end(&self) -> DVec3 {
        self.points[self.points.len() - 1]
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.start().distance(self.end()) < 1e-9
    }

    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// A point of the curve on the modelled edge and the tangent there, the
    /// midpoint of a line, otherwise the middle vertex
    pub fn middle(&self) -> (DVec3, DVec3) {
        let n = self.points.len();
        if n == 2 {
            let (a, b) = (self.points[0], self.points[1]);
            return ((a + b) * 0.5, (b - a).normalize_or_zero());
        }
        let i = n / 2;
        let tangent = self.points[(i + 1).min(n - 1)] - self.points[i - 1];
        (self.points[i], tangent.normalize_or_zero())
    }

    /// Unit direction leaving the curve at the end point `at`
    ///
    /// Sampled curves extrapolate the first two chords back to the vertex,
    /// which recovers the true tangent far better than the first chord.
    fn direction_from(&self, at: DVec3) -> Option<DVec3> {
        let n = self.points.len();
        let leaving = |a: DVec3, b: DVec3, c: Option<DVec3>| {
            let first = (b - a).normalize_or_zero();
            match c {
                Some(c) => (1.5 * first - 0.5 * (c - b).normalize_or_zero()).normalize_or_zero(),
                None => first,
            }
        };
        if self.start().distance(at) < 1e-6 {
            let next = (n > 2).then(|| self.points[2]);
            Some(leaving(self.points[0], self.points[1], next))
        } else if self.end().distance(at) < 1e-6 {
            let next = (n > 2).then(|| self.points[n - 3]);
            Some(leaving(self.points[n - 1], self.points[n - 2], next))
        } else {
            None
        }
    }

    pub fn distance_to(&self, p: DVec3) -> f64 {
        self.points
            .windows(2)
            .map(|w| point_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }

    fn transformed(&self, transform: &DAffine3) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| transform.transform_point3(*p))
                .collect(),
            self.smooth,
        )
    }

    fn same_as(&self, other: &EdgeCurve) -> bool {
        let ends = (self.start().distance(other.start()) < 1e-6
            && self.end().distance(other.end()) < 1e-6)
            || (self.start().distance(other.end()) < 1e-6
                && self.end().distance(other.start()) < 1e-6);
        ends && self.distance_to(other.middle().0) < 1e-6
    }
}

/// A planar face: a region in the 2D coordinates of its plane
#[derive(Debug, Clone)]
pub(crate) struct PlanarFace {
    pub plane: Plane,
    pub region: Region,
    pub bounds: BoundingBox,
}

impl PlanarFace {
    pub fn new(plane: Plane, region: Region) -> Self {
        let bounds = BoundingBox::from_points(
            region
                .polygons()
                .iter()
                .flat_map(|polygon| polygon.points().iter().map(|p| plane.to_world(*p))),
        );
        Self {
            plane,
            region,
            bounds,
        }
    }

    fn transformed(&self, transform: &DAffine3) -> Self {
        let plane = self.plane.transformed(transform);
        let region = if transform.matrix3.determinant() < 0.0 {
            // The moved frame is left-handed; flip v to stay in plane coordinates.
            self.region
                .transformed(&DAffine2::from_scale(DVec2::new(1.0, -1.0)))
        } else {
            self.region.clone()
        };
        Self::new(plane, region)
    }

    /// World points sampled on the face: polygon vertices and an interior grid
    fn sample_points(&self) -> Vec<DVec3> {
        let mut points: Vec<DVec2> = self
            .region
            .polygons()
            .iter()
            .flat_map(|polygon| polygon.points().iter().copied())
            .collect();
        let (min, max) = points.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        );
        for i in 1..6 {
            for j in 1..6 {
                let p = min + (max - min) * DVec2::new(i as f64, j as f64) / 6.0;
                if self.region.distance(p) < 0.0 {
                    points.push(p);
                }
            }
        }
        points.into_iter().map(|p| self.plane.to_world(p)).collect()
    }
}

/// A curved surface sampled on a grid of points lying on it
#[derive(Debug, Clone)]
pub(crate) struct Sheet {
    pub rows: Vec<Vec<DVec3>>,
    pub bounds: BoundingBox,
}

/// A crossing on the sheet grid: row, column and whether the grid edge runs
/// along the row
type GridEdge = (usize, usize, bool);

impl Sheet {
    pub fn new(rows: Vec<Vec<DVec3>>) -> Self {
        let bounds = BoundingBox::from_points(rows.iter().flatten().copied());
        Self { rows, bounds }
    }

    fn transformed(&self, transform: &DAffine3) -> Self {
        Self::new(
            self.rows
                .iter()
                .map(|row| row.iter().map(|p| transform.transform_point3(*p)).collect())
                .collect(),
        )
    }

    /// Every `stride`-th grid point, enough to tell whether the sheet survives
    fn sample_points(&self) -> impl Iterator<Item = &DVec3> {
        let total: usize = self.rows.iter().map(Vec::len).sum();
        let stride = (total / 256).max(1);
        self.rows.iter().flatten().step_by(stride)
    }

    /// Polylines where the sheet crosses `plane`, by marching over the grid
    fn plane_cuts(&self, plane: &Plane) -> Vec<Vec<DVec3>> {
        let rows = &self.rows;
        if rows.len() < 2 {
            return Vec::new();
        }
        let cols = rows.iter().map(Vec::len).min().unwrap_or(0);
        if cols < 2 {
            return Vec::new();
        }
        let side: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| row.iter().map(|p| plane.signed_distance(*p)).collect())
            .collect();
        let crossing = |(i, j, along): GridEdge| -> Option<DVec3> {
            let (i2, j2) = if along { (i, j + 1) } else { (i + 1, j) };
            let (a, b) = (side[i][j], side[i2][j2]);
            if (a >= 0.0) == (b >= 0.0) {
                return None;
            }
            let t = a / (a - b);
            Some(rows[i][j].lerp(rows[i2][j2], t))
        };

        let mut links: HashMap<GridEdge, Vec<GridEdge>> = HashMap::new();
        for i in 0..rows.len() - 1 {
            for j in 0..cols - 1 {
                let around = [(i, j, true), (i, j + 1, false), (i + 1, j, true), (i, j, false)];
                let crossed: Vec<GridEdge> = around
                    .into_iter()
                    .filter(|e| crossing(*e).is_some())
                    .collect();
                for pair in crossed.chunks_exact(2) {
                    links.entry(pair[0]).or_default().push(pair[1]);
                    links.entry(pair[1]).or_default().push(pair[0]);
                }
            }
        }

        // Walk open chains from their ends first, then the remaining loops.
        let mut starts: Vec<GridEdge> = links
            .iter()
            .filter(|(_, next)| next.len() == 1)
            .map(|(e, _)| *e)
            .collect();
        starts.sort_unstable();
        let mut rest: Vec<GridEdge> = links.keys().copied().collect();
        rest.sort_unstable();
        starts.extend(rest);

        let mut visited: HashSet<GridEdge> = HashSet::new();
        let mut cuts = Vec::new();
        for start in starts {
            if visited.contains(&start) {
                continue;
            }
            let mut chain = vec![start];
            visited.insert(start);
            let mut current = start;
            while let Some(next) = links
                .get(&current)
                .and_then(|next| next.iter().find(|e| !visited.contains(*e)))
                .copied()
            {
                visited.insert(next);
                chain.push(next);
                current = next;
            }
            let closes = chain.len() > 2
                && links.get(&current).is_some_and(|next| next.contains(&start));
            if closes {
                chain.push(start);
            }
            let points: Vec<DVec3> = chain.into_iter().filter_map(&crossing).collect();
            if points.len() >= 2 {
                cuts.push(points);
            }
        }
        cuts
    }
}

/// A solid in the reference kernel
#[derive(Debug, Clone)]
pub(crate) struct Body {
    pub field: Arc<Field>,
    pub edges: Vec<EdgeCurve>,
    pub faces: Vec<PlanarFace>,
    pub sheets: Vec<Sheet>,
    /// Points on the boundary whose bounds are the solid's bounds
    pub hull: Vec<DVec3>,
}

impl Body {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.hull.iter().copied())
    }

    pub fn transformed(&self, transform: &DAffine3) -> Self {
        Self {
            field: Field::transformed(self.field.clone(), transform),
            edges: self.edges.iter().map(|e| e.transformed(transform)).collect(),
            faces: self.faces.iter().map(|f| f.transformed(transform)).collect(),
            sheets: self.sheets.iter().map(|s| s.transformed(transform)).collect(),
            hull: self
                .hull
                .iter()
                .map(|p| transform.transform_point3(*p))
                .collect(),
        }
    }

    pub fn combine(a: &Body, b: &Body, op: BooleanType, config: &ReferenceKernelConfig) -> Self {
        let field = match op {
            BooleanType::Union => Field::union(a.field.clone(), b.field.clone()),
            BooleanType::Subtract => Field::difference(a.field.clone(), b.field.clone()),
            BooleanType::Intersect => Field::intersection(a.field.clone(), b.field.clone()),
        };

        let mut candidates: Vec<EdgeCurve> = a.edges.iter().chain(&b.edges).cloned().collect();
        candidates.extend(face_intersections(&a.faces, &b.faces, config));
        candidates.extend(sheet_cuts(&a.faces, &b.sheets, &b.field, config));
        candidates.extend(sheet_cuts(&b.faces, &a.sheets, &a.field, config));

        let mut edges: Vec<EdgeCurve> = Vec::new();
        for candidate in &candidates {
            for piece in clip_edge(candidate, &field, config) {
                if !edges.iter().any(|e| e.same_as(&piece)) {
                    edges.push(piece);
                }
            }
        }
        let edges = merge_collinear(edges);

        let tolerance = config.boundary_tolerance;
        let faces = a
            .faces
            .iter()
            .chain(&b.faces)
            .filter(|face| {
                face.sample_points()
                    .iter()
                    .any(|p| field.distance(*p).abs() <= tolerance)
            })
            .cloned()
            .collect();
        let sheets = a
            .sheets
            .iter()
            .chain(&b.sheets)
            .filter(|sheet| {
                sheet
                    .sample_points()
                    .any(|p| field.distance(*p).abs() <= tolerance)
            })
            .cloned()
            .collect();

        let hull_tolerance = config.chord_tolerance;
        let mut hull: Vec<DVec3> = a
            .hull
            .iter()
            .chain(&b.hull)
            .copied()
            .filter(|p| field.distance(*p) <= hull_tolerance)
            .collect();
        hull.extend(edges.iter().flat_map(|e| e.points.iter().copied()));

        Self {
            field,
            edges,
            faces,
            sheets,
            hull,
        }
    }

    pub fn classify(&self, p: DVec3, tolerance: f64) -> Containment {
        let d = self.field.distance(p);
        if d < -tolerance {
            Containment::Inside
        } else if d <= tolerance {
            Containment::Boundary
        } else {
            Containment::Outside
        }
    }

    /// Volume by counting cell centres inside the solid on a grid with
    /// `resolution` cells along the longest side of the bounding box
    pub fn volume(&self, resolution: usize) -> f64 {
        let bbox = self.bounding_box();
        if bbox.is_empty() {
            return 0.0;
        }
        let size = bbox.size();
        let longest = size.max_element();
        if longest <= 0.0 {
            return 0.0;
        }
        let step = longest / resolution.max(1) as f64;
        let cells = (size / step).round().max(DVec3::ONE);
        let cell = size / cells;
        let (nx, ny, nz) = (cells.x as usize, cells.y as usize, cells.z as usize);
        let mut inside = 0usize;
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let p = bbox.min
                        + cell * DVec3::new(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5);
                    if self.field.distance(p) < 0.0 {
                        inside += 1;
                    }
                }
            }
        }
        inside as f64 * cell.x * cell.y * cell.z
    }

    /// The body with edges rounded, given as `(edge index, radius)` pairs.
    ///
    /// Each rounded edge is replaced by the two tangent lines where the round
    /// meets its faces; those edges are smooth. Edges that turn out not to be
    /// creases are only marked smooth.
    pub fn rounded(&self, requests: &[(usize, f64)], config: &ReferenceKernelConfig) -> Self {
        let radius_of: HashMap<usize, f64> = requests.iter().copied().collect();
        let mut rounds = Vec::new();
        let mut edges = Vec::new();
        let mut sheets = self.sheets.clone();
        for (index, edge) in self.edges.iter().enumerate() {
            let Some(radius) = radius_of.get(&index).copied() else {
                edges.push(edge.clone());
                continue;
            };
            match Round::new(&self.field, &edge.points, edge.is_closed(), radius, config) {
                Some(round) => {
                    let (first, second) = round.tangent_lines();
                    for line in [first, second] {
                        if line.len() >= 2 {
                            edges.push(EdgeCurve::new(line, true));
                        }
                    }
                    sheets.push(Sheet::new(round.arcs(ROUND_ARC_SAMPLES)));
                    rounds.push(round);
                }
                None => {
                    tracing::debug!(edge = index, "edge is not a crease; marked smooth");
                    edges.push(EdgeCurve::new(edge.points.clone(), true));
                }
            }
        }
        if rounds.is_empty() {
            return Self {
                edges,
                ..self.clone()
            };
        }

        let field = Field::rounded(self.field.clone(), rounds);
        let hull_tolerance = config.chord_tolerance;
        let mut hull: Vec<DVec3> = self
            .hull
            .iter()
            .copied()
            .filter(|p| field.distance(*p) <= hull_tolerance)
            .collect();
        hull.extend(edges.iter().flat_map(|e| e.points.iter().copied()));
        Self {
            field,
            edges,
            faces: self.faces.clone(),
            sheets,
            hull,
        }
    }

    /// Largest radius that can round edge `index`: half the shortest edge
    /// meeting it at an end point at an angle
    pub fn fillet_limit(&self, index: usize) -> f64 {
        let edge = &self.edges[index];
        let mut ends = vec![edge.start()];
        if !edge.is_closed() {
            ends.push(edge.end());
        }
        let mut limit = f64::INFINITY;
        for (j, other) in self.edges.iter().enumerate() {
            if j == index {
                continue;
            }
            for at in &ends {
                let (Some(mine), Some(theirs)) = (edge.direction_from(*at), other.direction_from(*at))
                else {
                    continue;
                };
                if mine.cross(theirs).length() < TANGENT_TOLERANCE {
                    continue;
                }
                limit = limit.min(other.length() / 2.0);
            }
        }
        limit
    }
}

/// Join straight pieces that continue each other through a vertex no other
/// edge touches
fn merge_collinear(mut edges: Vec<EdgeCurve>) -> Vec<EdgeCurve> {
    loop {
        let mut found = None;
        'search: for i in 0..edges.len() {
            for j in (i + 1)..edges.len() {
                let Some((joined, shared)) = join_lines(&edges[i], &edges[j]) else {
                    continue;
                };
                let incident = edges
                    .iter()
                    .filter(|e| e.start().distance(shared) < 1e-6 || e.end().distance(shared) < 1e-6)
                    .count();
                if incident == 2 {
                    found = Some((i, j, joined));
                    break 'search;
                }
            }
        }
        match found {
            Some((i, j, joined)) => {
                edges[i] = joined;
                edges.remove(j);
            }
            None => return edges,
        }
    }
}

/// The line through `a` and `b` if they meet end to end in a straight line,
/// with the shared vertex
fn join_lines(a: &EdgeCurve, b: &EdgeCurve) -> Option<(EdgeCurve, DVec3)> {
    if a.points.len() != 2 || b.points.len() != 2 || a.smooth != b.smooth {
        return None;
    }
    let close = |p: DVec3, q: DVec3| p.distance(q) < 1e-6;
    let (far_a, shared, far_b) = if close(a.end(), b.start()) {
        (a.start(), a.end(), b.end())
    } else if close(a.end(), b.end()) {
        (a.start(), a.end(), b.start())
    } else if close(a.start(), b.start()) {
        (a.end(), a.start(), b.end())
    } else if close(a.start(), b.end()) {
        (a.end(), a.start(), b.start())
    } else {
        return None;
    };
    let da = (far_a - shared).normalize_or_zero();
    let db = (far_b - shared).normalize_or_zero();
    if da.dot(db) > -1.0 + 1e-9 {
        return None;
    }
    Some((EdgeCurve::line(far_a, far_b, a.smooth), shared))
}

/// Pieces of `curve` that lie on the zero set of `field` and are creases
fn clip_edge(curve: &EdgeCurve, field: &Field, config: &ReferenceKernelConfig) -> Vec<EdgeCurve> {
    let tolerance = config.boundary_tolerance;
    let on = |p: DVec3| field.distance(p).abs() <= tolerance;

    let pieces = if curve.points.len() == 2 {
        clip_line(curve, &on)
    } else {
        clip_polyline(curve, &on)
    };

    pieces
        .into_iter()
        .filter(|piece| piece.length() > MIN_EDGE_LENGTH)
        .filter(|piece| {
            if piece.smooth {
                return true;
            }
            let (p, tangent) = piece.middle();
            is_crease(field, p, tangent, config)
        })
        .collect()
}

fn clip_line(curve: &EdgeCurve, on: &impl Fn(DVec3) -> bool) -> Vec<EdgeCurve> {
    let (a, b) = (curve.start(), curve.end());
    let at = |s: f64| a.lerp(b, s);
    let flags: Vec<bool> = (0..=LINE_SAMPLES)
        .map(|i| on(at(i as f64 / LINE_SAMPLES as f64)))
        .collect();
    if flags.iter().all(|f| *f) {
        return vec![curve.clone()];
    }

    // Bisect between a parameter on the boundary and one off it.
    let refine = |mut inside: f64, mut outside: f64| {
        for _ in 0..REFINE_STEPS {
            let mid = (inside + outside) * 0.5;
            if on(at(mid)) {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        inside
    };

    let step = 1.0 / LINE_SAMPLES as f64;
    let mut pieces = Vec::new();
    let mut i = 0;
    while i <= LINE_SAMPLES {
        if !flags[i] {
            i += 1;
            continue;
        }
        let first = i;
        while i < LINE_SAMPLES && flags[i + 1] {
            i += 1;
        }
        let last = i;
        let s0 = if first == 0 {
            0.0
        } else {
            refine(first as f64 * step, (first - 1) as f64 * step)
        };
        let s1 = if last == LINE_SAMPLES {
            1.0
        } else {
            refine(last as f64 * step, (last + 1) as f64 * step)
        };
        pieces.push(EdgeCurve::line(at(s0), at(s1), curve.smooth));
        i += 1;
    }
    pieces
}

fn clip_polyline(curve: &EdgeCurve, on: &impl Fn(DVec3) -> bool) -> Vec<EdgeCurve> {
    let closed = curve.is_closed();
    let points = if closed {
        &curve.points[..curve.points.len() - 1]
    } else {
        &curve.points[..]
    };
    let flags: Vec<bool> = points.iter().map(|p| on(*p)).collect();
    if flags.iter().all(|f| *f) {
        return vec![curve.clone()];
    }

    // Start a closed loop at a vertex off the boundary so runs never wrap.
    let n = points.len();
    let offset = if closed {
        flags.iter().position(|f| !*f).unwrap_or(0)
    } else {
        0
    };
    let count = if closed { n + 1 } else { n };
    let index = |k: usize| (k + offset) % n;

    let mut pieces = Vec::new();
    let mut run: Vec<DVec3> = Vec::new();
    for k in 0..count {
        let i = index(k);
        if flags[i] {
            run.push(points[i]);
        } else if run.len() >= 2 {
            pieces.push(EdgeCurve::new(std::mem::take(&mut run), curve.smooth));
        } else {
            run.clear();
        }
    }
    if run.len() >= 2 {
        pieces.push(EdgeCurve::new(run, curve.smooth));
    }
    pieces
}

/// Whether the solid's boundary bends at `p`. Samples a small circle
/// perpendicular to the edge: a flat boundary splits it into equal halves.
fn is_crease(field: &Field, p: DVec3, tangent: DVec3, config: &ReferenceKernelConfig) -> bool {
    if tangent == DVec3::ZERO {
        return false;
    }
    let (e1, e2) = tangent.any_orthonormal_pair();
    let radius = config.crease_sample_radius;
    let score: f64 = (0..CREASE_SAMPLES)
        .map(|k| {
            let angle = (k as f64 + 0.5) * TAU / CREASE_SAMPLES as f64;
            let q = p + (e1 * angle.cos() + e2 * angle.sin()) * radius;
            let d = field.distance(q);
            if d < -1e-9 {
                1.0
            } else if d <= 1e-9 {
                0.5
            } else {
                0.0
            }
        })
        .sum();
    let half = CREASE_SAMPLES as f64 / 2.0;
    score > 0.5 && score < CREASE_SAMPLES as f64 - 0.5 && (score - half).abs() > 0.5
}

/// Curves where planar faces cut through the curved sheets of another body,
/// moved onto that body's surface
fn sheet_cuts(
    faces: &[PlanarFace],
    sheets: &[Sheet],
    owner: &Field,
    config: &ReferenceKernelConfig,
) -> Vec<EdgeCurve> {
    let tolerance = config.boundary_tolerance;
    let mut out = Vec::new();
    for face in faces {
        let bounds = face.bounds.inflate(tolerance);
        for sheet in sheets {
            if !bounds.intersects(&sheet.bounds) {
                continue;
            }
            for cut in sheet.plane_cuts(&face.plane) {
                let points = cut
                    .into_iter()
                    .map(|p| project_onto(owner, &face.plane, p))
                    .collect();
                out.push(EdgeCurve::new(points, false));
            }
        }
    }
    out
}

/// Newton steps along the field gradient, kept inside `plane`
fn project_onto(field: &Field, plane: &Plane, mut p: DVec3) -> DVec3 {
    const H: f64 = 1e-6;
    for _ in 0..8 {
        let d = field.distance(p);
        if d.abs() < 1e-12 {
            break;
        }
        let g = DVec3::new(
            field.distance(p + DVec3::X * H) - field.distance(p - DVec3::X * H),
            field.distance(p + DVec3::Y * H) - field.distance(p - DVec3::Y * H),
            field.distance(p + DVec3::Z * H) - field.distance(p - DVec3::Z * H),
        ) / (2.0 * H);
        let g = g - plane.normal * g.dot(plane.normal);
        let len2 = g.length_squared();
        if len2 < 1e-12 {
            break;
        }
        p -= g * (d / len2);
    }
    p
}

/// Intersection segments of every non-parallel pair of faces
fn face_intersections(
    a: &[PlanarFace],
    b: &[PlanarFace],
    config: &ReferenceKernelConfig,
) -> Vec<EdgeCurve> {
    let tolerance = config.boundary_tolerance;
    let mut out = Vec::new();
    for fa in a {
        let bounds_a = fa.bounds.inflate(tolerance);
        for fb in b {
            if !bounds_a.intersects(&fb.bounds.inflate(tolerance)) {
                continue;
            }
            let (n1, n2) = (fa.plane.normal, fb.plane.normal);
            let u = n1.cross(n2);
            let len2 = u.length_squared();
            if len2 < 1e-12 {
                continue;
            }
            let h1 = n1.dot(fa.plane.origin);
            let h2 = n2.dot(fb.plane.origin);
            let origin = (n2.cross(u) * h1 + u.cross(n1) * h2) / len2;
            let direction = u / len2.sqrt();

            let along = |face: &PlanarFace| {
                let local = face.plane.to_local(origin);
                let dir = DVec2::new(
                    direction.dot(face.plane.x_dir),
                    direction.dot(face.plane.y_dir()),
                );
                face.region
                    .clip_line(DVec2::new(local.x, local.y), dir, tolerance)
            };
            let spans_a = along(fa);
            if spans_a.is_empty() {
                continue;
            }
            for (a0, a1) in &spans_a {
                for (b0, b1) in along(fb) {
                    let s0 = a0.max(b0);
                    let s1 = a1.min(b1);
                    if s1 - s0 > MIN_EDGE_LENGTH {
                        out.push(EdgeCurve::line(
                            origin + direction * s0,
                            origin + direction * s1,
                            false,
                        ));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::reference::field::FieldKind;

    fn slab_body(min: DVec3, max: DVec3) -> Body {
        let size = max - min;
        let plane = Plane::new(min, DVec3::X, DVec3::Z);
        let region = Region::rectangle(size.x, size.y);
        let field = Field::primitive(
            FieldKind::Extrusion {
                to_local: plane.frame().inverse(),
                region: region.clone(),
                z0: 0.0,
                z1: size.z,
            },
            BoundingBox::new(min, max),
        );
        let corners = [
            DVec3::new(min.x, min.y, 0.0),
            DVec3::new(max.x, min.y, 0.0),
            DVec3::new(max.x, max.y, 0.0),
            DVec3::new(min.x, max.y, 0.0),
        ];
        let mut edges = Vec::new();
        for z in [min.z, max.z] {
            for i in 0..4 {
                let a = corners[i] + DVec3::Z * z;
                let b = corners[(i + 1) % 4] + DVec3::Z * z;
                edges.push(EdgeCurve::line(a, b, false));
            }
        }
        for c in corners {
            edges.push(EdgeCurve::line(c + DVec3::Z * min.z, c + DVec3::Z * max.z, false));
        }
        let faces = vec![
            PlanarFace::new(plane, region.clone()),
            PlanarFace::new(plane.offset(size.z), region),
        ];
        let hull = edges.iter().flat_map(|e| e.points.clone()).collect();
        Body {
            field,
            edges,
            faces,
            sheets: Vec::new(),
            hull,
        }
    }

    #[test]
    fn test_plane_cuts_a_cylinder_sheet() {
        let ring: Vec<DVec3> = (0..=16)
            .map(|i| {
                let t = TAU * i as f64 / 16.0;
                DVec3::new(t.cos(), t.sin(), 0.0)
            })
            .collect();
        let top: Vec<DVec3> = ring.iter().map(|p| *p + DVec3::Z * 2.0).collect();
        let sheet = Sheet::new(vec![ring, top]);
        let cuts = sheet.plane_cuts(&Plane::new(DVec3::Z, DVec3::X, DVec3::Z));
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].len(), 17);
        assert!(cuts[0].iter().all(|p| (p.z - 1.0).abs() < 1e-12));
        assert!(cuts[0][0].distance(cuts[0][16]) < 1e-12);
    }

    #[test]
    fn test_union_of_stacked_boxes_drops_shared_edges() {
        let config = ReferenceKernelConfig::default();
        let lower = slab_body(DVec3::ZERO, DVec3::new(2.0, 2.0, 1.0));
        let upper = slab_body(DVec3::new(0.0, 0.0, 1.0), DVec3::new(2.0, 2.0, 2.0));
        let merged = Body::combine(&lower, &upper, BooleanType::Union, &config);
        // The seam at z = 1 lies flat inside the merged side faces.
        assert!(merged
            .edges
            .iter()
            .all(|e| e.points.iter().any(|p| (p.z - 1.0).abs() > 1e-9)));
        // Vertical pieces of both boxes join into single side edges.
        assert_eq!(merged.edges.len(), 12);
    }

    #[test]
    fn test_cut_clips_edges() {
        let config = ReferenceKernelConfig::default();
        let block = slab_body(DVec3::ZERO, DVec3::new(4.0, 2.0, 2.0));
        let tool = slab_body(DVec3::new(2.0, -1.0, 1.0), DVec3::new(5.0, 3.0, 3.0));
        let stepped = Body::combine(&block, &tool, BooleanType::Subtract, &config);
        let bbox = stepped.bounding_box();
        assert!((bbox.max.x - 4.0).abs() < 1e-9);
        assert!((bbox.max.z - 2.0).abs() < 1e-9);
        // The top front edge now stops at the step.
        let top_front = stepped
            .edges
            .iter()
            .find(|e| {
                e.points.iter().all(|p| (p.z - 2.0).abs() < 1e-9 && p.y.abs() < 1e-9)
            })
            .unwrap();
        assert!((top_front.length() - 2.0).abs() < 1e-5);
        // The step's inner corner is a new edge from the face intersection.
        assert!(stepped.edges.iter().any(|e| {
            e.points
                .iter()
                .all(|p| (p.x - 2.0).abs() < 1e-9 && (p.z - 1.0).abs() < 1e-9)
        }));
    }

    #[test]
    fn test_fillet_limit_uses_adjacent_edges() {
        let body = slab_body(DVec3::ZERO, DVec3::new(10.0, 10.0, 1.0));
        // A bottom edge meets two other bottom edges and two 1 mm verticals.
        assert!((body.fillet_limit(0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_volume_of_box() {
        let body = slab_body(DVec3::ZERO, DVec3::new(1.0, 2.0, 3.0));
        assert!((body.volume(24) - 6.0).abs() < 1e-9);
    }
}
