//! Profiles: ordered, connected segments produced by the path builder

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::segment::Segment;

/// Mirror axis for 2D reflections
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MirrorAxis {
    /// Reflect across the x axis (y ↦ −y)
    X,
    /// Reflect across the y axis (x ↦ −x)
    Y,
    /// Reflect across an arbitrary line
    Line { origin: DVec2, direction: DVec2 },
}

impl MirrorAxis {
    pub fn transform(&self) -> DAffine2 {
        match *self {
            MirrorAxis::X => DAffine2::from_scale(DVec2::new(1.0, -1.0)),
            MirrorAxis::Y => DAffine2::from_scale(DVec2::new(-1.0, 1.0)),
            MirrorAxis::Line { origin, direction } => reflection_across(origin, direction),
        }
    }
}

/// Reflection across the line through `origin` along `direction`
pub(crate) fn reflection_across(origin: DVec2, direction: DVec2) -> DAffine2 {
    let d = direction.normalize();
    let linear = glam::DMat2::from_cols(
        DVec2::new(2.0 * d.x * d.x - 1.0, 2.0 * d.x * d.y),
        DVec2::new(2.0 * d.x * d.y, 2.0 * d.y * d.y - 1.0),
    );
    DAffine2::from_translation(origin)
        * DAffine2::from_mat2(linear)
        * DAffine2::from_translation(-origin)
}

/// Rotation by `angle_deg` degrees counter-clockwise about `center`
pub(crate) fn rotation_about(angle_deg: f64, center: DVec2) -> DAffine2 {
    DAffine2::from_translation(center)
        * DAffine2::from_angle(angle_deg.to_radians())
        * DAffine2::from_translation(-center)
}

/// A connected sequence of segments, open or closed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    id: Uuid,
    segments: Vec<Segment>,
    closed: bool,
}

impl Profile {
    /// Build a profile from already connected segments
    pub(crate) fn from_segments(segments: Vec<Segment>, closed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            segments,
            closed,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn first_point(&self) -> DVec2 {
        self.segments.first().map(Segment::start).unwrap_or(DVec2::ZERO)
    }

    pub fn last_point(&self) -> DVec2 {
        self.segments.last().map(Segment::end).unwrap_or(DVec2::ZERO)
    }

    /// Start point of every segment, plus the final end point of open profiles
    pub fn vertices(&self) -> Vec<DVec2> {
        let mut points: Vec<DVec2> = self.segments.iter().map(Segment::start).collect();
        if !self.closed {
            points.push(self.last_point());
        }
        points
    }

    /// Polyline approximation. Closed profiles do not repeat the first point.
    pub fn sample(&self, tolerance: f64) -> Vec<DVec2> {
        let mut points = Vec::new();
        for segment in &self.segments {
            let samples = segment.sample(tolerance);
            points.extend_from_slice(&samples[..samples.len() - 1]);
        }
        if !self.closed {
            points.push(self.last_point());
        }
        points
    }

    /// Signed area of the sampled outline; positive when counter-clockwise
    pub fn signed_area(&self, tolerance: f64) -> f64 {
        polygon_area(&self.sample(tolerance))
    }

    pub fn length(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    pub fn transformed(&self, transform: &DAffine2) -> Self {
        Self::from_segments(
            self.segments.iter().map(|s| s.transformed(transform)).collect(),
            self.closed,
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        self.transformed(&DAffine2::from_translation(DVec2::new(dx, dy)))
    }

    /// Rotate counter-clockwise by `angle_deg` degrees about `center`
    pub fn rotate(&self, angle_deg: f64, center: DVec2) -> Self {
        self.transformed(&rotation_about(angle_deg, center))
    }

    pub fn mirror(&self, axis: MirrorAxis) -> Self {
        self.transformed(&axis.transform())
    }

    /// The same outline traversed backwards
    pub fn reversed(&self) -> Self {
        Self::from_segments(
            self.segments.iter().rev().map(Segment::reversed).collect(),
            self.closed,
        )
    }
}

/// Shoelace area of a closed polygon
pub(crate) fn polygon_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f64>()
        * 0.5
}
