//! Primitive bodies: extrusions, revolutions, sweeps, lofts and threads

use std::f64::consts::TAU;

use glam::{DAffine2, DAffine3, DMat2, DMat3, DVec2, DVec3};

use super::ReferenceKernelConfig;
use super::body::{Body, EdgeCurve, PlanarFace, Sheet};
use super::field::{Field, FieldKind, SweepPath, ring_at};
use super::region::{Polygon, Region};
use crate::kernel::{BoundingBox, KernelError, KernelResult};
use crate::plane::{Axis2, Axis3D, Plane};
use crate::sketch::{ArcSegment, Drawing, Segment, Sketch, polygon_area};
use crate::wire::{Helix, Wire, WireKind};

/// Intermediate rings per loft interval added to the boundary points
const LOFT_HULL_STEPS: usize = 8;

/// Sampled pieces of a drawing that lie on the boundary of its region
struct Outline {
    /// One polyline per segment
    pieces: Vec<Vec<DVec2>>,
    /// Segment start vertices, flagged when the outline is tangent there
    corners: Vec<(DVec2, bool)>,
    /// Every sampled boundary point
    points: Vec<DVec2>,
}

fn outline(drawing: &Drawing, region: &Region, config: &ReferenceKernelConfig) -> Outline {
    let tolerance = config.chord_tolerance;
    let on = |p: DVec2| region.distance(p).abs() <= config.boundary_tolerance;
    let mut out = Outline {
        pieces: Vec::new(),
        corners: Vec::new(),
        points: Vec::new(),
    };
    for profile in drawing.profiles() {
        let segments = profile.segments();
        for (i, segment) in segments.iter().enumerate() {
            let samples = segment.sample(tolerance);
            let sample = if samples.len() == 2 {
                (samples[0] + samples[1]) * 0.5
            } else {
                samples[samples.len() / 2]
            };
            if on(sample) {
                out.points.extend_from_slice(&samples[..samples.len() - 1]);
                out.pieces.push(samples);
            }

            let previous = match i {
                0 if profile.is_closed() => segments.last(),
                0 => None,
                _ => segments.get(i - 1),
            };
            let smooth = previous.is_some_and(|p| tangent_join(p.end_tangent(), segment.start_tangent()));
            if on(segment.start()) {
                out.corners.push((segment.start(), smooth));
            }
        }
    }
    out
}

fn tangent_join(incoming: DVec2, outgoing: DVec2) -> bool {
    incoming.perp_dot(outgoing).abs() < 1e-6 && incoming.dot(outgoing) > 0.0
}

fn field_bounds(hull: &[DVec3], margin: f64, config: &ReferenceKernelConfig) -> BoundingBox {
    BoundingBox::from_points(hull.iter().copied()).inflate(margin + 4.0 * config.chord_tolerance + 1e-3)
}

/// Angles sampling a circle of `radius` over `sweep`, end points included
fn circle_angles(radius: f64, sweep: f64, tolerance: f64) -> Vec<f64> {
    let samples = Segment::Arc(ArcSegment::circle(DVec2::ZERO, radius, 0.0, sweep)).sample(tolerance);
    let n = samples.len() - 1;
    (0..=n).map(|i| sweep * i as f64 / n as f64).collect()
}

pub(crate) fn extrusion(
    sketch: &Sketch,
    distance: f64,
    config: &ReferenceKernelConfig,
) -> KernelResult<Body> {
    let region = Region::from_drawing(&sketch.drawing, config.chord_tolerance)?;
    let plane = sketch.plane;
    let lift = plane.normal * distance;
    let outline = outline(&sketch.drawing, &region, config);

    let mut edges = Vec::new();
    let mut sheets = Vec::new();
    for piece in &outline.pieces {
        let bottom: Vec<DVec3> = piece.iter().map(|p| plane.to_world(*p)).collect();
        let top: Vec<DVec3> = bottom.iter().map(|p| *p + lift).collect();
        if piece.len() > 2 {
            sheets.push(Sheet::new(vec![bottom.clone(), top.clone()]));
        }
        edges.push(EdgeCurve::new(bottom, false));
        edges.push(EdgeCurve::new(top, false));
    }
    for (vertex, smooth) in &outline.corners {
        let w = plane.to_world(*vertex);
        edges.push(EdgeCurve::line(w, w + lift, *smooth));
    }

    let mut faces = vec![
        PlanarFace::new(plane, region.clone()),
        PlanarFace::new(plane.translated(lift), region.clone()),
    ];
    let up = lift.normalize();
    for profile in sketch.drawing.profiles() {
        for segment in profile.segments() {
            let Segment::Line { start, end } = segment else {
                continue;
            };
            if region.distance((*start + *end) * 0.5).abs() > config.boundary_tolerance {
                continue;
            }
            let a = plane.to_world(*start);
            let x_dir = (plane.to_world(*end) - a).normalize();
            let side = Plane::new(a, x_dir, x_dir.cross(up));
            faces.push(PlanarFace::new(
                side,
                Region::rectangle(start.distance(*end), distance.abs()),
            ));
        }
    }

    let hull: Vec<DVec3> = outline
        .points
        .iter()
        .flat_map(|p| {
            let w = plane.to_world(*p);
            [w, w + lift]
        })
        .collect();
    let field = Field::primitive(
        FieldKind::Extrusion {
            to_local: plane.frame().inverse(),
            region,
            z0: distance.min(0.0),
            z1: distance.max(0.0),
        },
        field_bounds(&hull, 0.0, config),
    );
    Ok(Body {
        field,
        edges,
        faces,
        sheets,
        hull,
    })
}

pub(crate) fn revolution(
    sketch: &Sketch,
    axis: &Axis2,
    angle: f64,
    config: &ReferenceKernelConfig,
) -> KernelResult<Body> {
    let plane = sketch.plane;
    let a = axis.direction;
    // Sketch coordinates to (signed distance from the axis, height along it).
    let linear = DMat2::from_cols(DVec2::new(a.y, a.x), DVec2::new(-a.x, a.y));
    let to_axis = DAffine2::from_mat2_translation(linear, -(linear * axis.origin));
    let axial = sketch.drawing.transformed(&to_axis);
    let region = Region::from_drawing(&axial, config.chord_tolerance)?;

    let radii: Vec<f64> = region
        .polygons()
        .iter()
        .flat_map(|polygon| polygon.points().iter().map(|p| p.x))
        .collect();
    let min = radii.iter().copied().fold(f64::INFINITY, f64::min);
    let max = radii.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min < -1e-9 && max > 1e-9 {
        return Err(KernelError::InvalidProfile(
            "profile crosses the revolution axis".into(),
        ));
    }
    if max.abs().max(min.abs()) <= 1e-9 {
        return Err(KernelError::InvalidProfile(
            "profile lies on the revolution axis".into(),
        ));
    }
    let side = if max > 1e-9 { 1.0 } else { -1.0 };

    let world_axis = Axis3D::from_plane_axis(&plane, axis);
    let x_dir = world_axis.direction.cross(plane.normal);
    let frame = DAffine3::from_mat3_translation(
        DMat3::from_cols(x_dir, world_axis.direction, plane.normal),
        world_axis.origin,
    );
    let full = angle >= TAU - 1e-9;
    let sweep = if full { TAU } else { angle };
    let tolerance = config.chord_tolerance;
    let place = |p: DVec2, theta: f64| {
        frame.transform_point3(DVec3::new(p.x * theta.cos(), p.y, -p.x * theta.sin()))
    };
    let ring = |p: DVec2| -> Vec<DVec3> {
        circle_angles(p.x.abs(), sweep, tolerance)
            .into_iter()
            .map(|theta| place(p, theta))
            .collect()
    };

    let outline = outline(&axial, &region, config);
    let mut edges = Vec::new();
    for (vertex, smooth) in &outline.corners {
        if vertex.x.abs() > 1e-9 {
            edges.push(EdgeCurve::new(ring(*vertex), *smooth));
        }
    }
    let mut sheets = Vec::new();
    for piece in &outline.pieces {
        let flat = piece.len() == 2 && (piece[0].y - piece[1].y).abs() <= 1e-9;
        let reach = piece.iter().map(|p| p.x.abs()).fold(0.0, f64::max);
        if flat || reach <= 1e-9 {
            continue;
        }
        let rows = circle_angles(reach, sweep, tolerance)
            .into_iter()
            .map(|theta| piece.iter().map(|p| place(*p, theta)).collect())
            .collect();
        sheets.push(Sheet::new(rows));
    }

    let mut faces = Vec::new();
    if full {
        // Segments perpendicular to the axis sweep out flat discs and rings.
        for profile in axial.profiles() {
            for segment in profile.segments() {
                let Segment::Line { start, end } = segment else {
                    continue;
                };
                if (start.y - end.y).abs() > 1e-9 {
                    continue;
                }
                let outer = start.x.abs().max(end.x.abs());
                let inner = start.x.abs().min(end.x.abs());
                let disc = |r: f64| {
                    Region::Polygon(Polygon::new(
                        circle_angles(r, TAU, tolerance)
                            .iter()
                            .skip(1)
                            .map(|t| DVec2::from_angle(*t) * r)
                            .collect(),
                    ))
                };
                let face_region = if inner > 1e-9 {
                    Region::Difference(Box::new(disc(outer)), Box::new(disc(inner)))
                } else {
                    disc(outer)
                };
                let origin = frame.transform_point3(DVec3::new(0.0, start.y, 0.0));
                faces.push(PlanarFace::new(
                    Plane::new(origin, x_dir, world_axis.direction),
                    face_region,
                ));
            }
        }
    } else {
        let sketch_region = Region::from_drawing(&sketch.drawing, tolerance)?;
        let turned = plane.transformed(&world_axis.rotation(angle));
        faces.push(PlanarFace::new(plane, sketch_region.clone()));
        faces.push(PlanarFace::new(turned, sketch_region));
        for piece in &outline.pieces {
            for theta in [0.0, angle] {
                edges.push(EdgeCurve::new(
                    piece.iter().map(|p| place(*p, theta)).collect(),
                    false,
                ));
            }
        }
    }

    let hull: Vec<DVec3> = outline
        .points
        .iter()
        .flat_map(|p| ring(*p))
        .collect();
    let field = Field::primitive(
        FieldKind::Revolution {
            to_local: frame.inverse(),
            region,
            side,
            angle: (!full).then_some(angle),
        },
        field_bounds(&hull, 0.0, config),
    );
    Ok(Body {
        field,
        edges,
        faces,
        sheets,
        hull,
    })
}

pub(crate) fn sweep(
    profile: &Drawing,
    path: &Wire,
    config: &ReferenceKernelConfig,
) -> KernelResult<Body> {
    let WireKind::Planar {
        profile: spine,
        plane,
    } = path.kind()
    else {
        return Err(KernelError::InvalidProfile(
            "sweep path must be a planar wire".into(),
        ));
    };
    let tolerance = config.chord_tolerance;
    let spine = SweepPath::new(spine.sample(tolerance), spine.is_closed());
    let segments = spine.segments();
    if segments.is_empty() {
        return Err(KernelError::InvalidProfile("sweep path is empty".into()));
    }
    let region = Region::from_drawing(profile, tolerance)?;
    let outline = outline(profile, &region, config);

    // Profile placements: the path ends of an open path and every segment
    // midpoint, where the offset surface is exact.
    let frames: Vec<(DVec2, DVec2)> = segments
        .iter()
        .map(|(a, b)| {
            let dir = (*b - *a).normalize_or_zero();
            ((*a + *b) * 0.5, DVec2::new(dir.y, -dir.x))
        })
        .collect();
    let (first, last) = (segments[0], segments[segments.len() - 1]);
    let (start_right, end_right) = (frames[0].1, frames[frames.len() - 1].1);
    let mut stations = Vec::with_capacity(frames.len() + 2);
    if !spine.is_closed() {
        stations.push((first.0, start_right));
    }
    stations.extend_from_slice(&frames);
    if spine.is_closed() {
        stations.push(frames[0]);
    } else {
        stations.push((last.1, end_right));
    }
    let place =
        |at: DVec2, right: DVec2, q: DVec2| plane.to_world(at + right * q.x) + plane.normal * q.y;
    let trace = |q: DVec2| -> Vec<DVec3> {
        stations
            .iter()
            .map(|(at, right)| place(*at, *right, q))
            .collect()
    };

    let sheets = outline
        .pieces
        .iter()
        .map(|piece| {
            Sheet::new(
                stations
                    .iter()
                    .map(|(at, right)| piece.iter().map(|q| place(*at, *right, *q)).collect())
                    .collect(),
            )
        })
        .collect();
    let mut edges: Vec<EdgeCurve> = outline
        .corners
        .iter()
        .map(|(vertex, smooth)| EdgeCurve::new(trace(*vertex), *smooth))
        .collect();
    let mut faces = Vec::new();
    if !spine.is_closed() {
        for (at, right, forward) in [
            (first.0, start_right, first.1 - first.0),
            (last.1, end_right, last.1 - last.0),
        ] {
            for piece in &outline.pieces {
                edges.push(EdgeCurve::new(
                    piece.iter().map(|q| place(at, right, *q)).collect(),
                    false,
                ));
            }
            let normal = -plane.vector_to_world(forward.normalize());
            faces.push(PlanarFace::new(
                Plane::new(plane.to_world(at), plane.vector_to_world(right), normal),
                region.clone(),
            ));
        }
    }

    let hull: Vec<DVec3> = outline.points.iter().flat_map(|q| trace(*q)).collect();
    let reach = outline
        .points
        .iter()
        .map(|q| q.x.abs())
        .fold(0.0, f64::max);
    let field = Field::primitive(
        FieldKind::Sweep {
            to_local: plane.frame().inverse(),
            path: spine,
            profile: region,
        },
        field_bounds(&hull, reach * 0.05, config),
    );
    Ok(Body {
        field,
        edges,
        faces,
        sheets,
        hull,
    })
}

pub(crate) fn loft(
    sections: &[Wire],
    ruled: bool,
    config: &ReferenceKernelConfig,
) -> KernelResult<Body> {
    if sections.len() < 2 {
        return Err(KernelError::InvalidProfile(format!(
            "loft needs at least two sections, got {}",
            sections.len()
        )));
    }
    let tolerance = config.chord_tolerance;
    let mut base: Option<Plane> = None;
    let mut stations = Vec::with_capacity(sections.len());
    let mut rings = Vec::with_capacity(sections.len());
    for wire in sections {
        let WireKind::Planar { profile, plane } = wire.kind() else {
            return Err(KernelError::InvalidProfile(
                "loft sections must be planar wires".into(),
            ));
        };
        if !profile.is_closed() {
            return Err(KernelError::InvalidProfile(format!(
                "loft section {} is not closed",
                wire.id()
            )));
        }
        let base = *base.get_or_insert(*plane);
        if plane.normal.dot(base.normal).abs() < 1.0 - 1e-9 {
            return Err(KernelError::InvalidProfile(
                "loft sections must lie on parallel planes".into(),
            ));
        }
        let local: Vec<DVec3> = profile
            .sample(tolerance)
            .into_iter()
            .map(|p| base.to_local(plane.to_world(p)))
            .collect();
        let height = local.iter().map(|p| p.z).sum::<f64>() / local.len() as f64;
        let flat: Vec<DVec2> = local.iter().map(|p| DVec2::new(p.x, p.y)).collect();
        stations.push(height);
        rings.push(resample_ring(&flat, config.loft_ring_points));
    }
    let Some(base) = base else {
        return Err(KernelError::InvalidProfile("loft has no sections".into()));
    };
    if stations[0] > stations[stations.len() - 1] {
        stations.reverse();
        rings.reverse();
    }
    if stations.windows(2).any(|w| w[1] - w[0] <= 1e-9) {
        return Err(KernelError::InvalidProfile(
            "loft sections must be at distinct heights in order".into(),
        ));
    }

    let frame = base.frame();
    let lift = |ring: &[DVec2], h: f64| -> Vec<DVec3> {
        ring.iter()
            .map(|p| frame.transform_point3(DVec3::new(p.x, p.y, h)))
            .collect()
    };
    let last = stations.len() - 1;
    let mut edges = Vec::new();
    let mut faces = Vec::new();
    for (i, (ring, h)) in rings.iter().zip(&stations).enumerate() {
        let mut points = lift(ring, *h);
        points.push(points[0]);
        let end = i == 0 || i == last;
        edges.push(EdgeCurve::new(points, !end && !ruled));
        if end {
            faces.push(PlanarFace::new(
                base.offset(*h),
                Region::Polygon(Polygon::new(ring.clone())),
            ));
        }
    }

    let mut levels: Vec<Vec<DVec3>> = Vec::new();
    for i in 0..last {
        for step in 0..LOFT_HULL_STEPS {
            let h = stations[i]
                + (stations[i + 1] - stations[i]) * step as f64 / LOFT_HULL_STEPS as f64;
            levels.push(lift(&ring_at(&stations, &rings, ruled, h), h));
        }
    }
    levels.push(lift(&rings[last], stations[last]));
    let hull: Vec<DVec3> = levels.iter().flatten().copied().collect();
    let sheets = vec![Sheet::new(
        levels
            .into_iter()
            .map(|mut level| {
                level.push(level[0]);
                level
            })
            .collect(),
    )];

    let field = Field::primitive(
        FieldKind::Loft {
            to_local: frame.inverse(),
            stations,
            rings,
            ruled,
        },
        field_bounds(&hull, 0.0, config),
    );
    Ok(Body {
        field,
        edges,
        faces,
        sheets,
        hull,
    })
}

/// `count` points spaced evenly by arc length around a closed ring, counter-
/// clockwise, starting at the ring's first point
fn resample_ring(ring: &[DVec2], count: usize) -> Vec<DVec2> {
    let mut points = ring.to_vec();
    if polygon_area(&points) < 0.0 {
        points[1..].reverse();
    }
    let n = points.len();
    let lengths: Vec<f64> = (0..n)
        .map(|i| points[i].distance(points[(i + 1) % n]))
        .collect();
    let total: f64 = lengths.iter().sum();
    let mut out = Vec::with_capacity(count);
    let mut segment = 0;
    let mut walked = 0.0;
    for k in 0..count {
        let target = total * k as f64 / count as f64;
        while segment < n - 1 && walked + lengths[segment] < target {
            walked += lengths[segment];
            segment += 1;
        }
        let len = lengths[segment];
        let t = if len > 0.0 { (target - walked) / len } else { 0.0 };
        out.push(points[segment].lerp(points[(segment + 1) % n], t.clamp(0.0, 1.0)));
    }
    out
}

pub(crate) fn thread(
    profile: &Drawing,
    helix: &Helix,
    config: &ReferenceKernelConfig,
) -> KernelResult<Body> {
    let tolerance = config.chord_tolerance;
    let region = Region::from_drawing(profile, tolerance)?;
    let outline = outline(profile, &region, config);
    let (e1, e2, dir) = helix.basis();
    let frame = DAffine3::from_mat3_translation(DMat3::from_cols(e1, e2, dir), helix.axis.origin);
    let turns = helix.turns();

    // Even step counts put the middle sample at half the length.
    let steps = |radial: f64| {
        let radius = (helix.radius + radial).max(tolerance);
        let per_turn = circle_angles(radius, TAU, tolerance).len() - 1;
        ((turns * per_turn as f64).ceil() as usize).max(2).div_ceil(2) * 2
    };
    let trace = |q: DVec2| -> Vec<DVec3> {
        let n = steps(q.y);
        (0..=n)
            .map(|i| helix.point_at(turns * i as f64 / n as f64, q.x, q.y))
            .collect()
    };
    let sheets = outline
        .pieces
        .iter()
        .map(|piece| {
            let n = steps(piece.iter().map(|q| q.y).fold(f64::NEG_INFINITY, f64::max));
            Sheet::new(
                (0..=n)
                    .map(|i| {
                        let u = turns * i as f64 / n as f64;
                        piece.iter().map(|q| helix.point_at(u, q.x, q.y)).collect()
                    })
                    .collect(),
            )
        })
        .collect();

    let mut edges: Vec<EdgeCurve> = outline
        .corners
        .iter()
        .map(|(vertex, smooth)| EdgeCurve::new(trace(*vertex), *smooth))
        .collect();
    let mut faces = Vec::new();
    for u in [0.0, turns] {
        for piece in &outline.pieces {
            edges.push(EdgeCurve::new(
                piece.iter().map(|q| helix.point_at(u, q.x, q.y)).collect(),
                false,
            ));
        }
        let origin = helix.point_at(u, 0.0, 0.0);
        let radial = helix.point_at(u, 0.0, 1.0) - origin;
        faces.push(PlanarFace::new(
            Plane::new(origin, dir, dir.cross(radial)),
            region.clone(),
        ));
    }

    let hull: Vec<DVec3> = outline.points.iter().flat_map(|q| trace(*q)).collect();
    let field = Field::primitive(
        FieldKind::Thread {
            to_local: frame.inverse(),
            profile: region,
            pitch: helix.pitch,
            radius: helix.radius,
            turns,
            left_handed: helix.left_handed,
        },
        field_bounds(&hull, 0.0, config),
    );
    Ok(Body {
        field,
        edges,
        faces,
        sheets,
        hull,
    })
}
