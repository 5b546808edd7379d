//! Signed distance to 2D regions
//!
//! Regions are polygons combined with booleans, mirroring [`Drawing`]. The
//! distance is negative inside and exact for single polygons.

use glam::{DAffine2, DVec2};

use crate::kernel::{KernelError, KernelResult};
use crate::sketch::{Drawing, Profile};

/// Below this distance outside the bounds the exact distance is computed
const EARLY_OUT: f64 = 1e-3;

#[derive(Debug, Clone)]
pub(crate) struct Polygon {
    points: Vec<DVec2>,
    min: DVec2,
    max: DVec2,
}

impl Polygon {
    pub fn new(points: Vec<DVec2>) -> Self {
        let min = points.iter().fold(DVec2::splat(f64::INFINITY), |m, p| m.min(*p));
        let max = points
            .iter()
            .fold(DVec2::splat(f64::NEG_INFINITY), |m, p| m.max(*p));
        Self { points, min, max }
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn distance(&self, p: DVec2) -> f64 {
        let outside = bounds_distance(self.min, self.max, p);
        if outside > EARLY_OUT {
            return outside;
        }
        polygon_distance(&self.points, p)
    }
}

/// Exact signed distance to a closed polygon (negative inside)
pub(crate) fn polygon_distance(points: &[DVec2], p: DVec2) -> f64 {
    let n = points.len();
    if n == 0 {
        return f64::INFINITY;
    }
    let mut d = (p - points[0]).length_squared();
    let mut sign = 1.0;
    let mut j = n - 1;
    for i in 0..n {
        let e = points[j] - points[i];
        let w = p - points[i];
        let len2 = e.length_squared();
        let t = if len2 > 0.0 {
            (w.dot(e) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let b = w - e * t;
        d = d.min(b.length_squared());
        let c1 = p.y >= points[i].y;
        let c2 = p.y < points[j].y;
        let c3 = e.x * w.y > e.y * w.x;
        if (c1 && c2 && c3) || (!c1 && !c2 && !c3) {
            sign = -sign;
        }
        j = i;
    }
    sign * d.sqrt()
}

fn bounds_distance(min: DVec2, max: DVec2, p: DVec2) -> f64 {
    let center = (min + max) * 0.5;
    let half = (max - min) * 0.5;
    let q = (p - center).abs() - half;
    q.max(DVec2::ZERO).length()
}

/// A 2D region as a boolean tree of polygons
#[derive(Debug, Clone)]
pub(crate) enum Region {
    Polygon(Polygon),
    Union(Box<Region>, Box<Region>),
    Difference(Box<Region>, Box<Region>),
    Intersection(Box<Region>, Box<Region>),
}

impl Region {
    /// Sample a closed drawing into polygons
    pub fn from_drawing(drawing: &Drawing, tolerance: f64) -> KernelResult<Self> {
        Ok(match drawing {
            Drawing::Profile(profile) => Region::Polygon(Polygon::new(closed_samples(
                profile, tolerance,
            )?)),
            Drawing::Fuse(a, b) => Region::Union(
                Box::new(Self::from_drawing(a, tolerance)?),
                Box::new(Self::from_drawing(b, tolerance)?),
            ),
            Drawing::Cut(a, b) => Region::Difference(
                Box::new(Self::from_drawing(a, tolerance)?),
                Box::new(Self::from_drawing(b, tolerance)?),
            ),
            Drawing::Intersect(a, b) => Region::Intersection(
                Box::new(Self::from_drawing(a, tolerance)?),
                Box::new(Self::from_drawing(b, tolerance)?),
            ),
        })
    }

    pub fn rectangle(width: f64, height: f64) -> Self {
        Region::Polygon(Polygon::new(vec![
            DVec2::ZERO,
            DVec2::new(width, 0.0),
            DVec2::new(width, height),
            DVec2::new(0.0, height),
        ]))
    }

    pub fn distance(&self, p: DVec2) -> f64 {
        match self {
            Region::Polygon(polygon) => polygon.distance(p),
            Region::Union(a, b) => a.distance(p).min(b.distance(p)),
            Region::Difference(a, b) => a.distance(p).max(-b.distance(p)),
            Region::Intersection(a, b) => a.distance(p).max(b.distance(p)),
        }
    }

    pub fn polygons(&self) -> Vec<&Polygon> {
        match self {
            Region::Polygon(polygon) => vec![polygon],
            Region::Union(a, b) | Region::Difference(a, b) | Region::Intersection(a, b) => {
                let mut out = a.polygons();
                out.extend(b.polygons());
                out
            }
        }
    }

    pub fn transformed(&self, transform: &DAffine2) -> Self {
        match self {
            Region::Polygon(polygon) => Region::Polygon(Polygon::new(
                polygon
                    .points()
                    .iter()
                    .map(|p| transform.transform_point2(*p))
                    .collect(),
            )),
            Region::Union(a, b) => Region::Union(
                Box::new(a.transformed(transform)),
                Box::new(b.transformed(transform)),
            ),
            Region::Difference(a, b) => Region::Difference(
                Box::new(a.transformed(transform)),
                Box::new(b.transformed(transform)),
            ),
            Region::Intersection(a, b) => Region::Intersection(
                Box::new(a.transformed(transform)),
                Box::new(b.transformed(transform)),
            ),
        }
    }

    /// Parameters along the line `origin + direction·s` where it is inside
    /// the region (boundary included), as sorted disjoint intervals
    pub fn clip_line(&self, origin: DVec2, direction: DVec2, tolerance: f64) -> Vec<(f64, f64)> {
        let mut cuts = Vec::new();
        for polygon in self.polygons() {
            let points = polygon.points();
            let n = points.len();
            for i in 0..n {
                let a = points[i];
                let b = points[(i + 1) % n];
                let e = b - a;
                let denom = direction.perp_dot(e);
                if denom.abs() < 1e-14 {
                    continue;
                }
                let w = a - origin;
                let s = w.perp_dot(e) / denom;
                let t = w.perp_dot(direction) / denom;
                if (-1e-12..=1.0 + 1e-12).contains(&t) {
                    cuts.push(s);
                }
            }
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        let mut intervals: Vec<(f64, f64)> = Vec::new();
        for pair in cuts.windows(2) {
            let (s0, s1) = (pair[0], pair[1]);
            let mid = origin + direction * ((s0 + s1) * 0.5);
            if self.distance(mid) > tolerance {
                continue;
            }
            match intervals.last_mut() {
                Some(last) if (last.1 - s0).abs() < 1e-9 => last.1 = s1,
                _ => intervals.push((s0, s1)),
            }
        }
        intervals
    }
}

fn closed_samples(profile: &Profile, tolerance: f64) -> KernelResult<Vec<DVec2>> {
    if !profile.is_closed() {
        return Err(KernelError::InvalidProfile(format!(
            "profile {} is not closed",
            profile.id()
        )));
    }
    let points = profile.sample(tolerance);
    if points.len() < 3 {
        return Err(KernelError::InvalidProfile(format!(
            "profile {} encloses no area",
            profile.id()
        )));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_distance() {
        let square = Region::rectangle(2.0, 2.0);
        assert_relative_eq!(square.distance(DVec2::new(1.0, 1.0)), -1.0);
        assert_relative_eq!(square.distance(DVec2::new(3.0, 1.0)), 1.0);
        assert_relative_eq!(square.distance(DVec2::new(2.0, 0.5)), 0.0);
    }

    #[test]
    fn test_difference_region() {
        let outer = shapes::rectangle(10.0, 10.0).unwrap();
        let hole = shapes::circle(2.0).unwrap();
        let region = Region::from_drawing(&outer.cut(hole).unwrap(), 0.001).unwrap();
        assert!(region.distance(DVec2::ZERO) > 1.9);
        assert!(region.distance(DVec2::new(3.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_clip_line_through_hole() {
        let outer = shapes::rectangle(10.0, 10.0).unwrap();
        let hole = shapes::rectangle(2.0, 2.0).unwrap();
        let region = Region::from_drawing(&outer.cut(hole).unwrap(), 0.01).unwrap();
        let intervals = region.clip_line(DVec2::new(-20.0, 0.0), DVec2::X, 1e-9);
        assert_eq!(intervals.len(), 2);
        assert_relative_eq!(intervals[0].0, 15.0, epsilon = 1e-9);
        assert_relative_eq!(intervals[0].1, 19.0, epsilon = 1e-9);
        assert_relative_eq!(intervals[1].0, 21.0, epsilon = 1e-9);
    }
}
