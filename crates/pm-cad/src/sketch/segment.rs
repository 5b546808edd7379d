//! Profile segments
//!
//! Lines, elliptical arcs and cubic Béziers in the sketch plane. Circular arcs
//! are elliptical arcs with equal perpendicular axes.

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};

/// Below this length a segment is considered degenerate
pub const MIN_SEGMENT_LENGTH: f64 = 1e-9;

/// Bézier segments are always sampled with this many intervals
const BEZIER_INTERVALS: usize = 32;

/// Elliptical arc in conjugate-axis form: `center + u·cos(t) + v·sin(t)` for
/// `t` running from `start_angle` to `start_angle + sweep`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcSegment {
    pub center: DVec2,
    pub u: DVec2,
    pub v: DVec2,
    pub start_angle: f64,
    /// Signed parameter sweep in radians; positive runs counter-clockwise
    /// when `v` is `u` rotated by +90°
    pub sweep: f64,
}

impl ArcSegment {
    /// Circular arc starting at angle `start_angle` (radians, from +x)
    pub fn circle(center: DVec2, radius: f64, start_angle: f64, sweep: f64) -> Self {
        Self {
            center,
            u: DVec2::new(radius, 0.0),
            v: DVec2::new(0.0, radius),
            start_angle,
            sweep,
        }
    }

    pub fn point_at_angle(&self, t: f64) -> DVec2 {
        self.center + self.u * t.cos() + self.v * t.sin()
    }

    /// Unit direction of travel at parameter `t`
    pub fn tangent_at_angle(&self, t: f64) -> DVec2 {
        let d = -self.u * t.sin() + self.v * t.cos();
        (d * self.sweep.signum()).normalize_or_zero()
    }

    pub fn start(&self) -> DVec2 {
        self.point_at_angle(self.start_angle)
    }

    pub fn end(&self) -> DVec2 {
        self.point_at_angle(self.start_angle + self.sweep)
    }

    fn max_radius(&self) -> f64 {
        self.u.length().max(self.v.length())
    }

    /// Number of sampling intervals, always a multiple of four so full circles
    /// hit their quadrant points and the midpoint is a sample
    fn intervals(&self, tolerance: f64) -> usize {
        let r = self.max_radius();
        let step = if tolerance < r {
            2.0 * (1.0 - tolerance / r).acos()
        } else {
            std::f64::consts::FRAC_PI_2
        };
        let n = (self.sweep.abs() / step.max(1e-6)).ceil() as usize;
        n.max(4).div_ceil(4) * 4
    }
}

/// One piece of a profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Line {
        start: DVec2,
        end: DVec2,
    },
    Arc(ArcSegment),
    Bezier {
        start: DVec2,
        control1: DVec2,
        control2: DVec2,
        end: DVec2,
    },
}

impl Segment {
    pub fn line(start: DVec2, end: DVec2) -> Self {
        Segment::Line { start, end }
    }

    pub fn start(&self) -> DVec2 {
        match self {
            Segment::Line { start, .. } | Segment::Bezier { start, .. } => *start,
            Segment::Arc(arc) => arc.start(),
        }
    }

    pub fn end(&self) -> DVec2 {
        match self {
            Segment::Line { end, .. } | Segment::Bezier { end, .. } => *end,
            Segment::Arc(arc) => arc.end(),
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Segment::Line { .. })
    }

    /// Unit direction of travel at the start
    pub fn start_tangent(&self) -> DVec2 {
        match *self {
            Segment::Line { start, end } => (end - start).normalize_or_zero(),
            Segment::Arc(arc) => arc.tangent_at_angle(arc.start_angle),
            Segment::Bezier {
                start,
                control1,
                control2,
                end,
            } => first_distinct(start, &[control1, control2, end]),
        }
    }

    /// Unit direction of travel at the end
    pub fn end_tangent(&self) -> DVec2 {
        match *self {
            Segment::Line { start, end } => (end - start).normalize_or_zero(),
            Segment::Arc(arc) => arc.tangent_at_angle(arc.start_angle + arc.sweep),
            Segment::Bezier {
                start,
                control1,
                control2,
                end,
            } => -first_distinct(end, &[control2, control1, start]),
        }
    }

    pub fn point_at(&self, s: f64) -> DVec2 {
        match *self {
            Segment::Line { start, end } => start.lerp(end, s),
            Segment::Arc(arc) => arc.point_at_angle(arc.start_angle + arc.sweep * s),
            Segment::Bezier {
                start,
                control1,
                control2,
                end,
            } => {
                let t = 1.0 - s;
                start * (t * t * t)
                    + control1 * (3.0 * t * t * s)
                    + control2 * (3.0 * t * s * s)
                    + end * (s * s * s)
            }
        }
    }

    /// Polyline approximation including both end points. Curves use an even
    /// number of intervals, so the middle sample is the curve midpoint.
    pub fn sample(&self, tolerance: f64) -> Vec<DVec2> {
        let intervals = match self {
            Segment::Line { start, end } => return vec![*start, *end],
            Segment::Arc(arc) => arc.intervals(tolerance),
            Segment::Bezier { .. } => BEZIER_INTERVALS,
        };
        (0..=intervals)
            .map(|i| self.point_at(i as f64 / intervals as f64))
            .collect()
    }

    pub fn length(&self) -> f64 {
        match self {
            Segment::Line { start, end } => start.distance(*end),
            _ => {
                let points = self.sample(1e-4);
                points.windows(2).map(|w| w[0].distance(w[1])).sum()
            }
        }
    }

    /// The same curve traversed from end to start
    pub fn reversed(&self) -> Self {
        match *self {
            Segment::Line { start, end } => Segment::Line {
                start: end,
                end: start,
            },
            Segment::Arc(arc) => Segment::Arc(ArcSegment {
                start_angle: arc.start_angle + arc.sweep,
                sweep: -arc.sweep,
                ..arc
            }),
            Segment::Bezier {
                start,
                control1,
                control2,
                end,
            } => Segment::Bezier {
                start: end,
                control1: control2,
                control2: control1,
                end: start,
            },
        }
    }

    /// Apply an affine transform; arcs stay exact under any affine map
    pub fn transformed(&self, transform: &DAffine2) -> Self {
        match *self {
            Segment::Line { start, end } => Segment::Line {
                start: transform.transform_point2(start),
                end: transform.transform_point2(end),
            },
            Segment::Arc(arc) => Segment::Arc(ArcSegment {
                center: transform.transform_point2(arc.center),
                u: transform.transform_vector2(arc.u),
                v: transform.transform_vector2(arc.v),
                ..arc
            }),
            Segment::Bezier {
                start,
                control1,
                control2,
                end,
            } => Segment::Bezier {
                start: transform.transform_point2(start),
                control1: transform.transform_point2(control1),
                control2: transform.transform_point2(control2),
                end: transform.transform_point2(end),
            },
        }
    }
}

fn first_distinct(from: DVec2, candidates: &[DVec2]) -> DVec2 {
    candidates
        .iter()
        .map(|c| *c - from)
        .find(|d| d.length() > MIN_SEGMENT_LENGTH)
        .map(DVec2::normalize)
        .unwrap_or(DVec2::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_arc_tangents_follow_sweep() {
        let arc = ArcSegment::circle(DVec2::ZERO, 2.0, 0.0, FRAC_PI_2);
        assert_relative_eq!(arc.end().y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(arc.tangent_at_angle(0.0).y, 1.0);

        let reversed = Segment::Arc(arc).reversed();
        assert_relative_eq!(reversed.start_tangent().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(reversed.end().x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_arc_sampling_has_midpoint() {
        let arc = Segment::Arc(ArcSegment::circle(DVec2::ZERO, 10.0, 0.0, PI));
        let points = arc.sample(0.01);
        assert_eq!((points.len() - 1) % 4, 0);
        let mid = points[points.len() / 2];
        assert_relative_eq!(mid.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(mid.y, 10.0, epsilon = 1e-9);
        assert!(points.iter().all(|p| (p.length() - 10.0).abs() < 1e-9));
    }

    #[test]
    fn test_arc_length() {
        let arc = Segment::Arc(ArcSegment::circle(DVec2::ZERO, 1.0, 0.0, FRAC_PI_2));
        assert_relative_eq!(arc.length(), FRAC_PI_2, epsilon = 1e-4);
    }

    #[test]
    fn test_bezier_tangents() {
        let curve = Segment::Bezier {
            start: DVec2::ZERO,
            control1: DVec2::new(1.0, 0.0),
            control2: DVec2::new(2.0, 1.0),
            end: DVec2::new(2.0, 2.0),
        };
        assert_eq!(curve.start_tangent(), DVec2::X);
        assert_eq!(curve.end_tangent(), DVec2::Y);
        assert_eq!(curve.sample(0.1).len(), BEZIER_INTERVALS + 1);
    }

    #[test]
    fn test_mirrored_arc_keeps_endpoints() {
        let arc = Segment::Arc(ArcSegment::circle(DVec2::new(1.0, 1.0), 1.0, 0.0, FRAC_PI_2));
        let mirror = DAffine2::from_scale(DVec2::new(1.0, -1.0));
        let mirrored = arc.transformed(&mirror);
        assert_relative_eq!(mirrored.start().y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(mirrored.end().y, -2.0, epsilon = 1e-12);
        assert_relative_eq!(mirrored.point_at(0.5).y, -arc.point_at(0.5).y, epsilon = 1e-12);
    }
}
