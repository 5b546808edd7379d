//! Rolling-ball rounds of creased edges
//!
//! A round is built from the polyline of an edge and the field of the solid
//! it belongs to. Each segment gets a crease frame: the edge tangent and the
//! outward normals of the two faces meeting there, recovered by walking a
//! small circle around the segment midpoint. A convex crease loses the
//! material between the faces and a ball of the round's radius rolled along
//! them; a concave crease gains it.

use std::f64::consts::{PI, TAU};

use glam::DVec3;

use super::ReferenceKernelConfig;
use super::field::Field;
use crate::kernel::BoundingBox;

/// Directions sampled around a segment to find its faces
const FRAME_SAMPLES: usize = 32;
/// Bisection steps when locating a face direction on the sampling circle
const FRAME_REFINE_STEPS: usize = 32;
/// Creases whose dihedral angle is within this of a straight angle are flat
const FLAT_ANGLE: f64 = 0.1;
/// Slack on the wedge half-spaces so tangent lines stay on the surface
const WEDGE_SLACK: f64 = 1e-9;

/// Where the two faces of a crease meet, seen along the edge
#[derive(Debug, Clone, Copy)]
pub(crate) struct CreaseFrame {
    tangent: DVec3,
    /// Outward normal of the face the material starts from, counter-clockwise
    /// about the tangent
    n1: DVec3,
    /// Outward normal of the face the material ends at
    n2: DVec3,
    convex: bool,
}

impl CreaseFrame {
    /// Frame of the crease through `a` and `b`, or `None` when the boundary
    /// does not bend there or the sampling circle meets other features
    fn locate(field: &Field, a: DVec3, b: DVec3, radius: f64) -> Option<Self> {
        let tangent = (b - a).normalize_or_zero();
        if tangent == DVec3::ZERO {
            return None;
        }
        let centre = (a + b) * 0.5;
        let e1 = tangent.any_orthogonal_vector().normalize();
        let e2 = tangent.cross(e1);
        let direction = |angle: f64| e1 * angle.cos() + e2 * angle.sin();
        let inside = |angle: f64| field.distance(centre + direction(angle) * radius) < 0.0;

        let step = TAU / FRAME_SAMPLES as f64;
        let angles: Vec<f64> = (0..FRAME_SAMPLES).map(|k| k as f64 * step).collect();
        let flags: Vec<bool> = angles.iter().map(|a| inside(*a)).collect();
        let mut enter = None;
        let mut leave = None;
        for k in 0..FRAME_SAMPLES {
            let next = (k + 1) % FRAME_SAMPLES;
            match (flags[k], flags[next]) {
                (false, true) if enter.replace(k).is_some() => return None,
                (true, false) if leave.replace(k).is_some() => return None,
                _ => {}
            }
        }
        let (enter, leave) = (enter?, leave?);

        // Narrow each crossing down to the face itself.
        let refine = |mut outside: f64, mut within: f64| {
            for _ in 0..FRAME_REFINE_STEPS {
                let mid = (outside + within) * 0.5;
                if inside(mid) {
                    within = mid;
                } else {
                    outside = mid;
                }
            }
            (outside + within) * 0.5
        };
        let start = refine(angles[enter], angles[enter] + step);
        let end = refine(angles[leave] + step, angles[leave]);

        let arc = (end - start).rem_euclid(TAU);
        if (arc - PI).abs() < FLAT_ANGLE {
            return None;
        }
        let n1 = direction(start).cross(tangent);
        let n2 = tangent.cross(direction(end));
        Some(Self {
            tangent,
            n1,
            n2,
            convex: arc < PI,
        })
    }

    /// Frame halfway between two neighbouring frames
    fn blend(&self, other: &Self) -> Self {
        let tangent = (self.tangent + other.tangent).normalize_or(self.tangent);
        let n1 = self.n1 + other.n1;
        let n2 = self.n2 + other.n2;
        // Keep the normals perpendicular to the blended tangent.
        let n1 = (n1 - tangent * n1.dot(tangent)).normalize_or(self.n1);
        let n2 = (n2 - tangent * n2.dot(tangent)).normalize_or(self.n2);
        Self {
            tangent,
            n1,
            n2,
            convex: self.convex,
        }
    }

    /// Normals pointing from the ball centre towards the two tangent lines
    fn spokes(&self) -> (DVec3, DVec3) {
        if self.convex {
            (self.n1, self.n2)
        } else {
            (-self.n1, -self.n2)
        }
    }

    /// Ball centre relative to the crease
    fn centre(&self, radius: f64) -> DVec3 {
        let (s1, s2) = self.spokes();
        -(s1 + s2) * radius / (1.0 + s1.dot(s2))
    }

    /// Points of the round's arc relative to the crease, from the first face
    /// to the second
    fn arc(&self, radius: f64, samples: usize) -> Vec<DVec3> {
        let (s1, s2) = self.spokes();
        let centre = self.centre(radius);
        let angle = s1.dot(s2).clamp(-1.0, 1.0).acos();
        let sin = angle.sin();
        (0..=samples)
            .map(|i| {
                let s = i as f64 / samples as f64;
                let spoke = if sin.abs() < 1e-12 {
                    s1
                } else {
                    (s1 * ((1.0 - s) * angle).sin() + s2 * (s * angle).sin()) / sin
                };
                centre + spoke * radius
            })
            .collect()
    }
}

/// A rounded edge: its polyline, a crease frame per segment and the radius
#[derive(Debug, Clone)]
pub(crate) struct Round {
    points: Vec<DVec3>,
    frames: Vec<Option<CreaseFrame>>,
    radius: f64,
    closed: bool,
    bounds: BoundingBox,
}

impl Round {
    /// Round the edge through `points` on the solid of `field`. `None` when
    /// no segment of the edge is a crease.
    pub fn new(
        field: &Field,
        points: &[DVec3],
        closed: bool,
        radius: f64,
        config: &ReferenceKernelConfig,
    ) -> Option<Self> {
        let sample_radius = (radius * 0.5).clamp(4.0 * config.chord_tolerance, 0.5);
        let frames: Vec<Option<CreaseFrame>> = points
            .windows(2)
            .map(|w| CreaseFrame::locate(field, w[0], w[1], sample_radius))
            .collect();
        if frames.iter().all(Option::is_none) {
            return None;
        }
        let bounds = BoundingBox::from_points(points.iter().copied()).inflate(2.0 * radius);
        Some(Self {
            points: points.to_vec(),
            frames,
            radius,
            closed,
            bounds,
        })
    }

    /// Frame at polyline vertex `i`, blended from the segments meeting there
    fn vertex_frame(&self, i: usize) -> Option<CreaseFrame> {
        let count = self.frames.len();
        let before = if i > 0 {
            self.frames[i - 1]
        } else if self.closed {
            self.frames[count - 1]
        } else {
            None
        };
        let after = if self.closed && i == count {
            self.frames[0]
        } else {
            self.frames.get(i).copied().flatten()
        };
        match (before, after) {
            (Some(a), Some(b)) => Some(a.blend(&b)),
            (a, b) => a.or(b),
        }
    }

    /// Arc of the round at every polyline vertex with a frame, from the
    /// first face to the second
    pub fn arcs(&self, samples: usize) -> Vec<Vec<DVec3>> {
        (0..self.points.len())
            .filter_map(|i| {
                let frame = self.vertex_frame(i)?;
                let origin = self.points[i];
                Some(
                    frame
                        .arc(self.radius, samples)
                        .into_iter()
                        .map(|p| origin + p)
                        .collect(),
                )
            })
            .collect()
    }

    /// The two lines where the round meets the faces of the crease
    pub fn tangent_lines(&self) -> (Vec<DVec3>, Vec<DVec3>) {
        self.arcs(1)
            .into_iter()
            .filter_map(|arc| Some((*arc.first()?, *arc.last()?)))
            .unzip()
    }

    /// Apply the round to the distance `d` of the unrounded solid at `p`
    pub fn apply(&self, p: DVec3, d: f64) -> f64 {
        if !self.bounds.contains_point(p) {
            return d;
        }
        let last = self.frames.len() - 1;
        let mut nearest: Option<(f64, usize, f64)> = None;
        for (i, w) in self.points.windows(2).enumerate() {
            let ab = w[1] - w[0];
            let len2 = ab.length_squared();
            if len2 == 0.0 {
                continue;
            }
            let t = (p - w[0]).dot(ab) / len2;
            let distance = p.distance(w[0] + ab * t.clamp(0.0, 1.0));
            if nearest.is_none_or(|(best, _, _)| distance < best) {
                nearest = Some((distance, i, t));
            }
        }
        let Some((_, i, t)) = nearest else {
            return d;
        };
        if !self.closed && ((i == 0 && t < 0.0) || (i == last && t > 1.0)) {
            return d;
        }
        let Some(frame) = self.frames[i] else {
            return d;
        };

        let foot = self.points[i].lerp(self.points[i + 1], t.clamp(0.0, 1.0));
        let u = p - foot;
        let u = u - frame.tangent * u.dot(frame.tangent);
        let (n1, n2) = (frame.n1, frame.n2);
        let in_wedge = if frame.convex {
            u.dot(n1) <= WEDGE_SLACK && u.dot(n2) <= WEDGE_SLACK
        } else {
            u.dot(n1) >= -WEDGE_SLACK && u.dot(n2) >= -WEDGE_SLACK
        };
        if !in_wedge {
            return d;
        }

        // Split the offset from the ball centre along the two spokes.
        let (s1, s2) = frame.spokes();
        let v = u - frame.centre(self.radius);
        let g = s1.dot(s2);
        let det = 1.0 - g * g;
        if det < 1e-12 {
            return d;
        }
        let (a, b) = (v.dot(s1), v.dot(s2));
        if (a - g * b) / det < 0.0 || (b - g * a) / det < 0.0 {
            return d;
        }
        if frame.convex {
            d.max(v.length() - self.radius)
        } else if d > 0.0 {
            d.min(self.radius - v.length())
        } else {
            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::reference::field::FieldKind;
    use crate::kernel::reference::region::Region;
    use approx::assert_relative_eq;
    use glam::DAffine3;
    use std::sync::Arc;

    /// 10 mm cube centred on the z axis, standing on the XY plane
    fn cube() -> Arc<Field> {
        Field::primitive(
            FieldKind::Extrusion {
                to_local: DAffine3::from_translation(DVec3::new(5.0, 5.0, 0.0)),
                region: Region::rectangle(10.0, 10.0),
                z0: 0.0,
                z1: 10.0,
            },
            BoundingBox::new(DVec3::new(-5.0, -5.0, 0.0), DVec3::new(5.0, 5.0, 10.0)),
        )
    }

    #[test]
    fn test_convex_crease_frame() {
        let field = cube();
        let frame = CreaseFrame::locate(
            &field,
            DVec3::new(5.0, 5.0, 0.0),
            DVec3::new(5.0, 5.0, 10.0),
            0.5,
        )
        .unwrap();
        assert!(frame.convex);
        let normals = [frame.n1, frame.n2];
        assert!(normals.iter().any(|n| n.distance(DVec3::X) < 1e-9));
        assert!(normals.iter().any(|n| n.distance(DVec3::Y) < 1e-9));
        let centre = frame.centre(2.0);
        assert!(centre.distance(DVec3::new(-2.0, -2.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_round_removes_the_corner() {
        let field = cube();
        let points = [DVec3::new(5.0, 5.0, 0.0), DVec3::new(5.0, 5.0, 10.0)];
        let round = Round::new(&field, &points, false, 2.0, &ReferenceKernelConfig::default())
            .unwrap();
        let at = |p: DVec3| round.apply(p, field.distance(p));
        assert!(at(DVec3::new(4.9, 4.9, 5.0)) > 0.0);
        assert!(at(DVec3::new(4.0, 4.0, 5.0)) < 0.0);
        // Tangent lines lie on the faces and on the round.
        let (first, second) = round.tangent_lines();
        for p in first.iter().chain(&second) {
            assert_relative_eq!(at(*p), 0.0, epsilon = 1e-9);
        }
        // Away from the crease nothing changes.
        let far = DVec3::new(0.0, 4.9, 5.0);
        assert_eq!(at(far), field.distance(far));
    }

    #[test]
    fn test_flat_seam_has_no_frame() {
        let field = cube();
        let frame = CreaseFrame::locate(
            &field,
            DVec3::new(-5.0, 5.0, 5.0),
            DVec3::new(5.0, 5.0, 5.0),
            0.5,
        );
        assert!(frame.is_none());
    }
}
