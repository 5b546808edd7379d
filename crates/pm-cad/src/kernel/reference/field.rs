//! Signed distance fields of solids
//!
//! Every solid in the reference kernel is the zero level set of a field that
//! is negative inside. Primitives measure the distance to their 2D region in
//! a local frame; booleans combine fields with min/max. Values away from the
//! surface are bounds, not exact distances, which is all classification and
//! edge bookkeeping need.

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::{DAffine3, DVec2, DVec3};

use super::region::{Region, polygon_distance};
use super::round::Round;
use crate::kernel::BoundingBox;

/// Past this distance outside a node's bounds the bound itself is returned
const EARLY_OUT: f64 = 1e-3;

#[derive(Debug)]
pub(crate) struct Field {
    kind: FieldKind,
    bounds: BoundingBox,
}

#[derive(Debug)]
pub(crate) enum FieldKind {
    /// Region in the local xy plane between heights `z0` and `z1`
    Extrusion {
        to_local: DAffine3,
        region: Region,
        z0: f64,
        z1: f64,
    },
    /// Region in `(radius, height)` coordinates around the local y axis.
    /// `side` is the sign of the radius coordinate of the region; a partial
    /// revolution covers the angle `[0, angle]` from local x towards -z.
    Revolution {
        to_local: DAffine3,
        region: Region,
        side: f64,
        angle: Option<f64>,
    },
    /// Profile region in `(right of travel, height)` coordinates swept along
    /// a path in the local xy plane
    Sweep {
        to_local: DAffine3,
        path: SweepPath,
        profile: Region,
    },
    /// Rings at increasing local heights, interpolated in between
    Loft {
        to_local: DAffine3,
        stations: Vec<f64>,
        rings: Vec<Vec<DVec2>>,
        ruled: bool,
    },
    /// Profile region in `(axial, radial)` coordinates swept along a helix
    /// around the local z axis
    Thread {
        to_local: DAffine3,
        profile: Region,
        pitch: f64,
        radius: f64,
        turns: f64,
        left_handed: bool,
    },
    Transformed {
        inverse: DAffine3,
        inner: Arc<Field>,
    },
    /// Edges of `base` rounded; convex rounds cut, concave rounds fill
    Rounded {
        base: Arc<Field>,
        rounds: Vec<Round>,
    },
    Union(Arc<Field>, Arc<Field>),
    Difference(Arc<Field>, Arc<Field>),
    Intersection(Arc<Field>, Arc<Field>),
}

impl Field {
    /// Wrap a primitive whose solid lies within `bounds`
    pub fn primitive(kind: FieldKind, bounds: BoundingBox) -> Arc<Self> {
        Arc::new(Self { kind, bounds })
    }

    pub fn union(a: Arc<Field>, b: Arc<Field>) -> Arc<Self> {
        let bounds = a.bounds.union(&b.bounds);
        Arc::new(Self {
            kind: FieldKind::Union(a, b),
            bounds,
        })
    }

    pub fn difference(a: Arc<Field>, b: Arc<Field>) -> Arc<Self> {
        let bounds = a.bounds;
        Arc::new(Self {
            kind: FieldKind::Difference(a, b),
            bounds,
        })
    }

    pub fn intersection(a: Arc<Field>, b: Arc<Field>) -> Arc<Self> {
        let bounds = BoundingBox::new(a.bounds.min.max(b.bounds.min), a.bounds.max.min(b.bounds.max));
        Arc::new(Self {
            kind: FieldKind::Intersection(a, b),
            bounds,
        })
    }

    /// The field moved by `transform`, a rigid motion or reflection
    pub fn transformed(inner: Arc<Field>, transform: &DAffine3) -> Arc<Self> {
        let bounds = transform_bounds(&inner.bounds, transform);
        Arc::new(Self {
            kind: FieldKind::Transformed {
                inverse: transform.inverse(),
                inner,
            },
            bounds,
        })
    }

    /// `base` with rounded edges. Rounds stay within the base's bounds.
    pub fn rounded(base: Arc<Field>, rounds: Vec<Round>) -> Arc<Self> {
        let bounds = base.bounds;
        Arc::new(Self {
            kind: FieldKind::Rounded { base, rounds },
            bounds,
        })
    }

    /// Signed distance at `p`, negative inside
    pub fn distance(&self, p: DVec3) -> f64 {
        let outside = bounds_distance(&self.bounds, p);
        if outside > EARLY_OUT {
            return outside;
        }
        match &self.kind {
            FieldKind::Extrusion {
                to_local,
                region,
                z0,
                z1,
            } => {
                let q = to_local.transform_point3(p);
                let d2 = region.distance(DVec2::new(q.x, q.y));
                let mid = (z0 + z1) * 0.5;
                let half = (z1 - z0) * 0.5;
                slab(d2, (q.z - mid).abs() - half)
            }
            FieldKind::Revolution {
                to_local,
                region,
                side,
                angle,
            } => {
                let q = to_local.transform_point3(p);
                let r = DVec2::new(q.x, q.z).length();
                let d = region.distance(DVec2::new(side * r, q.y));
                match angle {
                    Some(angle) => {
                        let w = DVec2::new(side * q.x, -side * q.z);
                        d.max(wedge_distance(w, *angle))
                    }
                    None => d,
                }
            }
            FieldKind::Sweep {
                to_local,
                path,
                profile,
            } => {
                let q = to_local.transform_point3(p);
                let (offset, overshoot) = path.offset(DVec2::new(q.x, q.y));
                slab(profile.distance(DVec2::new(offset, q.z)), overshoot)
            }
            FieldKind::Loft {
                to_local,
                stations,
                rings,
                ruled,
            } => {
                let q = to_local.transform_point3(p);
                let first = stations[0];
                let last = stations[stations.len() - 1];
                let ring = ring_at(stations, rings, *ruled, q.z.clamp(first, last));
                let d2 = polygon_distance(&ring, DVec2::new(q.x, q.y));
                let mid = (first + last) * 0.5;
                slab(d2, (q.z - mid).abs() - (last - first) * 0.5)
            }
            FieldKind::Thread {
                to_local,
                profile,
                pitch,
                radius,
                turns,
                left_handed,
            } => {
                let q = to_local.transform_point3(p);
                let r = DVec2::new(q.x, q.y).length();
                let mut angle = q.y.atan2(q.x);
                if *left_handed {
                    angle = -angle;
                }
                let frac = (angle / TAU).rem_euclid(1.0);
                let nearest = (q.z / pitch - frac).round();
                (-2..=2)
                    .map(|k| {
                        let u = frac + nearest + k as f64;
                        let d = profile.distance(DVec2::new(q.z - pitch * u, r - radius));
                        let arc = TAU * r.max(*radius);
                        let overshoot = if u < 0.0 {
                            -u * arc
                        } else if u > *turns {
                            (u - turns) * arc
                        } else {
                            f64::NEG_INFINITY
                        };
                        slab(d, overshoot)
                    })
                    .fold(f64::INFINITY, f64::min)
            }
            FieldKind::Transformed { inverse, inner } => {
                inner.distance(inverse.transform_point3(p))
            }
            FieldKind::Rounded { base, rounds } => rounds
                .iter()
                .fold(base.distance(p), |d, round| round.apply(p, d)),
            FieldKind::Union(a, b) => a.distance(p).min(b.distance(p)),
            FieldKind::Difference(a, b) => a.distance(p).max(-b.distance(p)),
            FieldKind::Intersection(a, b) => a.distance(p).max(b.distance(p)),
        }
    }
}

/// Intersection of a 2D distance with a 1D slab distance
fn slab(d2: f64, dz: f64) -> f64 {
    let w = DVec2::new(d2, dz);
    w.max(DVec2::ZERO).length() + d2.max(dz).min(0.0)
}

/// Distance to the wedge between the +x ray and the ray at `angle`
fn wedge_distance(w: DVec2, angle: f64) -> f64 {
    let ray = |dir: DVec2| {
        let along = w.dot(dir);
        if along > 0.0 {
            w.perp_dot(dir).abs()
        } else {
            w.length()
        }
    };
    let edge = ray(DVec2::X).min(ray(DVec2::from_angle(angle)));
    let polar = w.y.atan2(w.x).rem_euclid(TAU);
    if polar <= angle { -edge } else { edge }
}

fn bounds_distance(bounds: &BoundingBox, p: DVec3) -> f64 {
    if bounds.is_empty() {
        return f64::INFINITY;
    }
    let q = (p - bounds.center()).abs() - bounds.size() * 0.5;
    q.max(DVec3::ZERO).length()
}

pub(crate) fn transform_bounds(bounds: &BoundingBox, transform: &DAffine3) -> BoundingBox {
    if bounds.is_empty() {
        return *bounds;
    }
    let corners = (0..8).map(|i| {
        DVec3::new(
            if i & 1 == 0 { bounds.min.x } else { bounds.max.x },
            if i & 2 == 0 { bounds.min.y } else { bounds.max.y },
            if i & 4 == 0 { bounds.min.z } else { bounds.max.z },
        )
    });
    BoundingBox::from_points(corners.map(|c| transform.transform_point3(c)))
}

/// Ring interpolated at height `h` between the loft stations
pub(crate) fn ring_at(stations: &[f64], rings: &[Vec<DVec2>], ruled: bool, h: f64) -> Vec<DVec2> {
    let last = stations.len() - 1;
    let i = stations
        .windows(2)
        .position(|w| h <= w[1])
        .unwrap_or(last - 1);
    let span = stations[i + 1] - stations[i];
    let t = if span > 0.0 {
        ((h - stations[i]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (p1, p2) = (&rings[i], &rings[i + 1]);
    if ruled {
        return p1.iter().zip(p2).map(|(a, b)| a.lerp(*b, t)).collect();
    }
    let p0 = &rings[i.saturating_sub(1)];
    let p3 = &rings[(i + 2).min(last)];
    let t2 = t * t;
    let t3 = t2 * t;
    (0..p1.len())
        .map(|k| {
            let (a, b, c, d) = (p0[k], p1[k], p2[k], p3[k]);
            0.5 * (2.0 * b
                + (c - a) * t
                + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
                + (3.0 * b - a - 3.0 * c + d) * t3)
        })
        .collect()
}

/// Spine of a sweep in the path plane
#[derive(Debug, Clone)]
pub(crate) struct SweepPath {
    points: Vec<DVec2>,
    closed: bool,
    /// `1` when a closed path runs counter-clockwise, `-1` otherwise
    orientation: f64,
}

impl SweepPath {
    pub fn new(points: Vec<DVec2>, closed: bool) -> Self {
        let orientation = if closed && crate::sketch::polygon_area(&points) < 0.0 {
            -1.0
        } else {
            1.0
        };
        Self {
            points,
            closed,
            orientation,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Segments as `(start, end)` pairs, closing segment included
    pub fn segments(&self) -> Vec<(DVec2, DVec2)> {
        let n = self.points.len();
        let count = if self.closed { n } else { n.saturating_sub(1) };
        (0..count)
            .map(|i| (self.points[i], self.points[(i + 1) % n]))
            .collect()
    }

    /// Signed offset to the right of travel, and the signed distance past
    /// the ends of an open path (negative infinity between them)
    pub fn offset(&self, p: DVec2) -> (f64, f64) {
        if self.closed {
            return (polygon_distance(&self.points, p) * self.orientation, f64::NEG_INFINITY);
        }
        let segments = self.segments();
        let last = segments.len() - 1;
        let mut best = (f64::INFINITY, 0.0, f64::NEG_INFINITY);
        for (i, (a, b)) in segments.iter().enumerate() {
            let e = *b - *a;
            let len = e.length();
            if len == 0.0 {
                continue;
            }
            let dir = e / len;
            let right = DVec2::new(dir.y, -dir.x);
            let w = p - *a;
            let along = w.dot(dir);
            let beyond_start = i == 0 && along < 0.0;
            let beyond_end = i == last && along > len;
            let (dist, offset, overshoot) = if beyond_start {
                (w.dot(right).abs(), w.dot(right), -along)
            } else if beyond_end {
                (w.dot(right).abs(), w.dot(right), along - len)
            } else {
                let t = along.clamp(0.0, len);
                let dist = (w - dir * t).length();
                let sign = if w.dot(right) >= 0.0 { 1.0 } else { -1.0 };
                (dist, sign * dist, f64::NEG_INFINITY)
            };
            if dist < best.0 {
                best = (dist, offset, overshoot);
            }
        }
        (best.1, best.2)
    }
}
