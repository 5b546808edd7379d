//! Path Builder
//!
//! Pen-based construction of profiles. Every drawing call appends exactly one
//! segment and advances the pen; `custom_corner` defers a fillet until the
//! next segment is known. The first failing call poisons the builder and the
//! error is returned by the terminal `close`, `close_with_mirror` or `done`.

use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::profile::{Profile, reflection_across};
use super::segment::{ArcSegment, MIN_SEGMENT_LENGTH, Segment};
use crate::error::{GeometryError, GeometryErrorKind};

/// Direction in which an elliptical arc is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArcSense {
    /// Decreasing angle (y axis up)
    #[default]
    Clockwise,
    /// Increasing angle (y axis up)
    CounterClockwise,
}

/// Tangent scaling for `smooth_spline`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplineOptions {
    pub start_factor: f64,
    pub end_factor: f64,
}

impl Default for SplineOptions {
    fn default() -> Self {
        Self {
            start_factor: 1.0,
            end_factor: 1.0,
        }
    }
}

impl SplineOptions {
    pub fn new(start_factor: f64, end_factor: f64) -> Self {
        Self {
            start_factor,
            end_factor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingCorner {
    radius: f64,
    index: usize,
}

/// Failure raised inside a builder step: either attributed to the step
/// itself or to an earlier operation (a deferred corner)
enum Fault {
    Here(GeometryErrorKind),
    At(GeometryError),
}

impl From<GeometryErrorKind> for Fault {
    fn from(kind: GeometryErrorKind) -> Self {
        Fault::Here(kind)
    }
}

/// Fluent builder for 2D profiles
#[derive(Debug, Clone)]
pub struct PathBuilder {
    start: DVec2,
    pen: DVec2,
    segments: Vec<Segment>,
    next_index: usize,
    pending_corner: Option<PendingCorner>,
    error: Option<GeometryError>,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PathBuilder {
    /// Start drawing at the origin
    pub fn new() -> Self {
        Self::at(DVec2::ZERO)
    }

    /// Start drawing at `start`
    pub fn at(start: DVec2) -> Self {
        Self {
            start,
            pen: start,
            segments: Vec::new(),
            next_index: 0,
            pending_corner: None,
            error: None,
        }
    }

    /// Current pen position
    pub fn pen(&self) -> DVec2 {
        self.pen
    }

    /// The first error recorded by the builder, if any
    pub fn error(&self) -> Option<&GeometryError> {
        self.error.as_ref()
    }

    // ============== Builder plumbing ==============

    fn step<F>(mut self, op: &'static str, f: F) -> Self
    where
        F: FnOnce(&mut Self) -> Result<(), Fault>,
    {
        let index = self.next_index;
        self.next_index += 1;
        if self.error.is_none() {
            if let Err(fault) = f(&mut self) {
                self.error = Some(match fault {
                    Fault::Here(kind) => GeometryError::new(op, index, kind),
                    Fault::At(error) => error,
                });
            }
        }
        self
    }

    fn finish<F>(mut self, op: &'static str, f: F) -> Result<Profile, GeometryError>
    where
        F: FnOnce(&mut Self) -> Result<Profile, Fault>,
    {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let index = self.next_index;
        f(&mut self).map_err(|fault| match fault {
            Fault::Here(kind) => GeometryError::new(op, index, kind),
            Fault::At(error) => error,
        })
    }

    fn last_tangent(&self) -> DVec2 {
        self.segments
            .last()
            .map(Segment::end_tangent)
            .unwrap_or(DVec2::X)
    }

    fn push(&mut self, segment: Segment) -> Result<(), Fault> {
        if segment.length() < MIN_SEGMENT_LENGTH {
            return Err(GeometryErrorKind::DegenerateSegment.into());
        }
        match self.pending_corner.take() {
            Some(corner) => self.round_corner(corner, segment)?,
            None => self.segments.push(segment),
        }
        self.pen = segment.end();
        Ok(())
    }

    /// Replace the vertex between the last segment and `next` with a tangent arc
    fn round_corner(&mut self, corner: PendingCorner, next: Segment) -> Result<(), Fault> {
        let incoming = self.segments.pop();
        let (rounded, trimmed_next) = match incoming.map(|prev| fillet_lines(prev, next, corner)) {
            Some(Ok(result)) => result,
            Some(Err(fault)) => {
                self.segments.extend(incoming);
                return Err(fault);
            }
            None => return Err(corner_error(corner, GeometryErrorKind::CornerNeedsLines)),
        };
        self.segments.extend(rounded);
        self.segments.extend(trimmed_next);
        Ok(())
    }

    // ============== Drawing operations ==============

    /// Move the pen; only allowed before the first segment
    pub fn move_to(self, p: DVec2) -> Self {
        self.step("move_to", |b| {
            if !b.segments.is_empty() || b.pending_corner.is_some() {
                return Err(GeometryErrorKind::MoveAfterSegments.into());
            }
            b.start = p;
            b.pen = p;
            Ok(())
        })
    }

    pub fn line_to(self, p: DVec2) -> Self {
        self.step("line_to", |b| b.push(Segment::line(b.pen, p)))
    }

    pub fn line(self, dx: f64, dy: f64) -> Self {
        self.step("line", |b| b.push(Segment::line(b.pen, b.pen + DVec2::new(dx, dy))))
    }

    pub fn h_line(self, dx: f64) -> Self {
        self.step("h_line", |b| b.push(Segment::line(b.pen, b.pen + DVec2::new(dx, 0.0))))
    }

    pub fn v_line(self, dy: f64) -> Self {
        self.step("v_line", |b| b.push(Segment::line(b.pen, b.pen + DVec2::new(0.0, dy))))
    }

    pub fn h_line_to(self, x: f64) -> Self {
        self.step("h_line_to", |b| {
            b.push(Segment::line(b.pen, DVec2::new(x, b.pen.y)))
        })
    }

    pub fn v_line_to(self, y: f64) -> Self {
        self.step("v_line_to", |b| {
            b.push(Segment::line(b.pen, DVec2::new(b.pen.x, y)))
        })
    }

    /// Line of `length` at `angle_deg` degrees counter-clockwise from +x
    pub fn polar_line(self, length: f64, angle_deg: f64) -> Self {
        self.step("polar_line", |b| {
            let d = DVec2::from_angle(angle_deg.to_radians()) * length;
            b.push(Segment::line(b.pen, b.pen + d))
        })
    }

    /// Line to the absolute polar point `(radius, angle_deg)`
    pub fn polar_line_to(self, radius: f64, angle_deg: f64) -> Self {
        self.step("polar_line_to", |b| {
            let p = DVec2::from_angle(angle_deg.to_radians()) * radius;
            b.push(Segment::line(b.pen, p))
        })
    }

    /// Circular arc tangent to the previous segment, ending at `end`
    pub fn tangent_arc_to(self, end: DVec2) -> Self {
        self.step("tangent_arc_to", |b| {
            let segment = tangent_arc(b.pen, b.last_tangent(), end);
            b.push(segment)
        })
    }

    pub fn tangent_arc(self, dx: f64, dy: f64) -> Self {
        self.step("tangent_arc", |b| {
            let segment = tangent_arc(b.pen, b.last_tangent(), b.pen + DVec2::new(dx, dy));
            b.push(segment)
        })
    }

    /// Elliptical arc to `end` with radii `rx`, `ry` and the x radius rotated
    /// by `rotation_deg`. Radii too small to reach `end` are scaled up.
    pub fn ellipse_to(
        self,
        end: DVec2,
        rx: f64,
        ry: f64,
        rotation_deg: f64,
        long_way: bool,
        sense: ArcSense,
    ) -> Self {
        self.step("ellipse_to", |b| {
            let arc = elliptical_arc(b.pen, end, rx, ry, rotation_deg, long_way, sense)?;
            b.push(Segment::Arc(arc))
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn ellipse(
        self,
        dx: f64,
        dy: f64,
        rx: f64,
        ry: f64,
        rotation_deg: f64,
        long_way: bool,
        sense: ArcSense,
    ) -> Self {
        self.step("ellipse", |b| {
            let end = b.pen + DVec2::new(dx, dy);
            let arc = elliptical_arc(b.pen, end, rx, ry, rotation_deg, long_way, sense)?;
            b.push(Segment::Arc(arc))
        })
    }

    /// Half ellipse whose major axis is the chord to `end`
    pub fn half_ellipse_to(self, end: DVec2, minor_radius: f64, sense: ArcSense) -> Self {
        self.step("half_ellipse_to", |b| {
            let arc = half_ellipse(b.pen, end, minor_radius, sense)?;
            b.push(Segment::Arc(arc))
        })
    }

    pub fn half_ellipse(self, dx: f64, dy: f64, minor_radius: f64, sense: ArcSense) -> Self {
        self.step("half_ellipse", |b| {
            let arc = half_ellipse(b.pen, b.pen + DVec2::new(dx, dy), minor_radius, sense)?;
            b.push(Segment::Arc(arc))
        })
    }

    /// Cubic Bézier leaving along the previous tangent and arriving with the
    /// start tangent mirrored across the chord normal
    pub fn smooth_spline_to(self, end: DVec2, options: SplineOptions) -> Self {
        self.step("smooth_spline_to", |b| {
            let segment = smooth_spline(b.pen, b.last_tangent(), end, options);
            b.push(segment)
        })
    }

    pub fn smooth_spline(self, dx: f64, dy: f64, options: SplineOptions) -> Self {
        self.step("smooth_spline", |b| {
            let end = b.pen + DVec2::new(dx, dy);
            let segment = smooth_spline(b.pen, b.last_tangent(), end, options);
            b.push(segment)
        })
    }

    /// Round the vertex at the pen with `radius` once the next segment exists
    pub fn custom_corner(self, radius: f64) -> Self {
        let index = self.next_index;
        self.step("custom_corner", |b| {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(GeometryErrorKind::InvalidRadius(radius).into());
            }
            if b.segments.is_empty() {
                return Err(GeometryErrorKind::CornerNeedsLines.into());
            }
            if b.pending_corner.is_some() {
                return Err(GeometryErrorKind::DanglingCorner.into());
            }
            b.pending_corner = Some(PendingCorner { radius, index });
            Ok(())
        })
    }

    // ============== Terminal operations ==============

    /// Close the path with a straight segment back to the start
    pub fn close(self) -> Result<Profile, GeometryError> {
        self.finish("close", |b| {
            if b.segments.is_empty() {
                return Err(GeometryErrorKind::EmptyPath.into());
            }
            if b.pen.distance(b.start) > MIN_SEGMENT_LENGTH {
                b.push(Segment::line(b.pen, b.start))?;
            } else if let Some(corner) = b.pending_corner.take() {
                b.round_closing_corner(corner)?;
            }
            Ok(Profile::from_segments(std::mem::take(&mut b.segments), true))
        })
    }

    /// Close the path with its own reflection across the line through the
    /// first and last pen positions
    pub fn close_with_mirror(self) -> Result<Profile, GeometryError> {
        self.finish("close_with_mirror", |b| {
            if b.segments.is_empty() {
                return Err(GeometryErrorKind::EmptyPath.into());
            }
            if b.pending_corner.is_some() {
                return Err(GeometryErrorKind::DanglingCorner.into());
            }
            let axis = b.pen - b.start;
            if axis.length() < MIN_SEGMENT_LENGTH {
                return Err(GeometryErrorKind::DegenerateMirrorAxis.into());
            }
            let reflection = reflection_across(b.start, axis);
            let mirrored: Vec<Segment> = b
                .segments
                .iter()
                .rev()
                .map(|s| s.reversed().transformed(&reflection))
                .collect();
            b.segments.extend(mirrored);
            Ok(Profile::from_segments(std::mem::take(&mut b.segments), true))
        })
    }

    /// Finish as an open profile
    pub fn done(self) -> Result<Profile, GeometryError> {
        self.finish("done", |b| {
            if b.segments.is_empty() {
                return Err(GeometryErrorKind::EmptyPath.into());
            }
            if let Some(corner) = b.pending_corner {
                return Err(corner_error(corner, GeometryErrorKind::DanglingCorner));
            }
            Ok(Profile::from_segments(std::mem::take(&mut b.segments), false))
        })
    }

    /// Pending corner at the start point: round between the last and the
    /// first segment
    fn round_closing_corner(&mut self, corner: PendingCorner) -> Result<(), Fault> {
        if self.segments.len() < 2 {
            return Err(corner_error(corner, GeometryErrorKind::CornerNeedsLines));
        }
        let first = self.segments.remove(0);
        let last = self.segments.pop();
        let Some(last) = last else {
            return Err(corner_error(corner, GeometryErrorKind::CornerNeedsLines));
        };
        let (rounded, trimmed_first) = fillet_lines(last, first, corner)?;
        if let Some(first) = trimmed_first {
            self.segments.insert(0, first);
        }
        self.segments.extend(rounded);
        Ok(())
    }
}

fn corner_error(corner: PendingCorner, kind: GeometryErrorKind) -> Fault {
    Fault::At(GeometryError::new("custom_corner", corner.index, kind))
}

/// Fillet two straight segments meeting at a vertex. Returns the trimmed
/// incoming line (if anything is left of it) followed by the arc, and the
/// trimmed outgoing line.
fn fillet_lines(
    prev: Segment,
    next: Segment,
    corner: PendingCorner,
) -> Result<(Vec<Segment>, Option<Segment>), Fault> {
    let (Segment::Line { start: a, end: vertex }, Segment::Line { end: b, .. }) = (prev, next)
    else {
        return Err(corner_error(corner, GeometryErrorKind::CornerNeedsLines));
    };
    let d1 = (vertex - a).normalize();
    let d2 = (b - vertex).normalize();
    let cross = d1.perp_dot(d2);
    if cross.abs() < 1e-12 {
        return Err(corner_error(corner, GeometryErrorKind::CollinearCorner));
    }
    let turn = cross.atan2(d1.dot(d2));
    let trim = corner.radius * (turn.abs() / 2.0).tan();
    let available = a.distance(vertex).min(vertex.distance(b));
    if trim > available + MIN_SEGMENT_LENGTH {
        return Err(corner_error(
            corner,
            GeometryErrorKind::InfeasibleCorner {
                radius: corner.radius,
                needed: trim,
                available,
            },
        ));
    }

    let p1 = vertex - d1 * trim;
    let p2 = vertex + d2 * trim;
    let normal = if cross > 0.0 { d1.perp() } else { -d1.perp() };
    let center = p1 + normal * corner.radius;
    let radial = p1 - center;
    let arc = ArcSegment::circle(center, corner.radius, radial.y.atan2(radial.x), turn);

    let mut rounded = Vec::with_capacity(2);
    if a.distance(p1) > MIN_SEGMENT_LENGTH {
        rounded.push(Segment::line(a, p1));
    }
    rounded.push(Segment::Arc(arc));
    let trimmed_next = (p2.distance(b) > MIN_SEGMENT_LENGTH).then(|| Segment::line(p2, b));
    Ok((rounded, trimmed_next))
}

/// Circular arc leaving `start` along `tangent` and passing through `end`
fn tangent_arc(start: DVec2, tangent: DVec2, end: DVec2) -> Segment {
    let chord = end - start;
    let cross = tangent.perp_dot(chord);
    if cross.abs() < 1e-12 * chord.length().max(1.0) {
        return Segment::line(start, end);
    }
    let normal = tangent.perp();
    let signed_radius = chord.length_squared() / (2.0 * normal.dot(chord));
    let center = start + normal * signed_radius;
    let radial = start - center;
    let turn = 2.0 * cross.atan2(tangent.dot(chord));
    Segment::Arc(ArcSegment::circle(
        center,
        signed_radius.abs(),
        radial.y.atan2(radial.x),
        turn,
    ))
}

/// Endpoint-parameterized elliptical arc converted to center form
fn elliptical_arc(
    start: DVec2,
    end: DVec2,
    rx: f64,
    ry: f64,
    rotation_deg: f64,
    long_way: bool,
    sense: ArcSense,
) -> Result<ArcSegment, GeometryErrorKind> {
    for r in [rx, ry] {
        if !(r.is_finite() && r > 0.0) {
            return Err(GeometryErrorKind::InvalidRadius(r));
        }
    }
    if start.distance(end) < MIN_SEGMENT_LENGTH {
        return Err(GeometryErrorKind::DegenerateSegment);
    }

    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    let half = (start - end) * 0.5;
    let x1 = cos * half.x + sin * half.y;
    let y1 = -sin * half.x + cos * half.y;

    let (mut rx, mut ry) = (rx, ry);
    let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let counter_clockwise = sense == ArcSense::CounterClockwise;
    let num = rx * rx * ry * ry - rx * rx * y1 * y1 - ry * ry * x1 * x1;
    let den = rx * rx * y1 * y1 + ry * ry * x1 * x1;
    let mut coef = (num / den).max(0.0).sqrt();
    if long_way == counter_clockwise {
        coef = -coef;
    }
    let cx = coef * rx * y1 / ry;
    let cy = -coef * ry * x1 / rx;
    let center = DVec2::new(cos * cx - sin * cy, sin * cx + cos * cy) + (start + end) * 0.5;

    let a = DVec2::new((x1 - cx) / rx, (y1 - cy) / ry);
    let b = DVec2::new((-x1 - cx) / rx, (-y1 - cy) / ry);
    let mut sweep = a.perp_dot(b).atan2(a.dot(b));
    if !counter_clockwise && sweep > 0.0 {
        sweep -= 2.0 * PI;
    } else if counter_clockwise && sweep < 0.0 {
        sweep += 2.0 * PI;
    }

    Ok(ArcSegment {
        center,
        u: DVec2::new(cos, sin) * rx,
        v: DVec2::new(-sin, cos) * ry,
        start_angle: a.y.atan2(a.x),
        sweep,
    })
}

fn half_ellipse(
    start: DVec2,
    end: DVec2,
    minor_radius: f64,
    sense: ArcSense,
) -> Result<ArcSegment, GeometryErrorKind> {
    if !(minor_radius.is_finite() && minor_radius > 0.0) {
        return Err(GeometryErrorKind::InvalidRadius(minor_radius));
    }
    if start.distance(end) < MIN_SEGMENT_LENGTH {
        return Err(GeometryErrorKind::DegenerateSegment);
    }
    let center = (start + end) * 0.5;
    let u = start - center;
    let sweep = match sense {
        ArcSense::CounterClockwise => PI,
        ArcSense::Clockwise => -PI,
    };
    Ok(ArcSegment {
        center,
        u,
        v: u.perp().normalize() * minor_radius,
        start_angle: 0.0,
        sweep,
    })
}

fn smooth_spline(start: DVec2, tangent: DVec2, end: DVec2, options: SplineOptions) -> Segment {
    let chord = end - start;
    let reach = chord.length() / 4.0;
    let along = chord.normalize_or_zero();
    let end_tangent = along * (2.0 * tangent.dot(along)) - tangent;
    Segment::Bezier {
        start,
        control1: start + tangent * (options.start_factor * reach),
        control2: end - end_tangent * (options.end_factor * reach),
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_connected(profile: &Profile) {
        let segments = profile.segments();
        for pair in segments.windows(2) {
            assert!(pair[0].end().distance(pair[1].start()) < 1e-9);
        }
        if profile.is_closed() {
            assert!(profile.last_point().distance(profile.first_point()) < 1e-9);
        }
    }

    #[test]
    fn test_rectangle_closes() {
        let profile = PathBuilder::new()
            .h_line(4.0)
            .v_line(2.0)
            .h_line(-4.0)
            .close()
            .unwrap();
        assert_eq!(profile.segments().len(), 4);
        assert_connected(&profile);
        assert_relative_eq!(profile.signed_area(0.01), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_close_at_start_adds_nothing() {
        let profile = PathBuilder::new()
            .line_to(DVec2::new(1.0, 0.0))
            .line_to(DVec2::new(0.0, 1.0))
            .line_to(DVec2::ZERO)
            .close()
            .unwrap();
        assert_eq!(profile.segments().len(), 3);
    }

    #[test]
    fn test_move_after_segment_fails() {
        let err = PathBuilder::new()
            .h_line(1.0)
            .move_to(DVec2::new(5.0, 5.0))
            .v_line(1.0)
            .close()
            .unwrap_err();
        assert_eq!(err.op, "move_to");
        assert_eq!(err.index, 1);
        assert_eq!(err.kind, GeometryErrorKind::MoveAfterSegments);
    }

    #[test]
    fn test_degenerate_segment_reported_with_index() {
        let err = PathBuilder::new()
            .h_line(1.0)
            .v_line(0.0)
            .close()
            .unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.kind, GeometryErrorKind::DegenerateSegment);
    }

    #[test]
    fn test_tangent_arc_quarter_circle() {
        let profile = PathBuilder::new()
            .v_line(3.0)
            .tangent_arc(-2.0, 2.0)
            .done()
            .unwrap();
        let Segment::Arc(arc) = profile.segments()[1] else {
            panic!("expected an arc");
        };
        assert_relative_eq!(arc.center.x, -2.0, epsilon = 1e-12);
        assert_relative_eq!(arc.center.y, 3.0, epsilon = 1e-12);
        assert_relative_eq!(arc.sweep, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        let t = profile.segments()[1].start_tangent();
        assert_relative_eq!(t.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tangent_arc_along_tangent_is_line() {
        let profile = PathBuilder::new().h_line(1.0).tangent_arc(2.0, 0.0).done().unwrap();
        assert!(profile.segments()[1].is_line());
    }

    #[test]
    fn test_ellipse_clockwise_quarter() {
        let r = 5.0;
        let profile = PathBuilder::at(DVec2::new(r, 0.0))
            .ellipse_to(DVec2::new(0.0, -r), r, r, 90.0, false, ArcSense::Clockwise)
            .done()
            .unwrap();
        let arc = profile.segments()[0];
        let mid = arc.point_at(0.5);
        assert_relative_eq!(mid.x, r * std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_relative_eq!(mid.y, -r * std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_relative_eq!(arc.end().x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(arc.end().y, -r, epsilon = 1e-9);
    }

    #[test]
    fn test_ellipse_radii_scaled_up() {
        let profile = PathBuilder::new()
            .ellipse_to(DVec2::new(10.0, 0.0), 1.0, 1.0, 0.0, false, ArcSense::CounterClockwise)
            .done()
            .unwrap();
        let Segment::Arc(arc) = profile.segments()[0] else {
            panic!("expected an arc");
        };
        assert_relative_eq!(arc.u.length(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(arc.end().x, 10.0, epsilon = 1e-9);
        assert!(arc.point_at_angle(arc.start_angle + arc.sweep / 2.0).y < 0.0);
    }

    #[test]
    fn test_half_ellipse_bulges_by_sense() {
        let top = PathBuilder::new()
            .half_ellipse(10.0, 0.0, 4.0, ArcSense::Clockwise)
            .done()
            .unwrap();
        assert_relative_eq!(top.segments()[0].point_at(0.5).y, 4.0, epsilon = 1e-12);

        let bottom = PathBuilder::new()
            .half_ellipse(10.0, 0.0, 4.0, ArcSense::CounterClockwise)
            .done()
            .unwrap();
        assert_relative_eq!(bottom.segments()[0].point_at(0.5).y, -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_spline_symmetric() {
        let profile = PathBuilder::new()
            .v_line(1.0)
            .smooth_spline_to(DVec2::new(4.0, 1.0), SplineOptions::default())
            .done()
            .unwrap();
        let spline = profile.segments()[1];
        assert_relative_eq!(spline.start_tangent().y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(spline.end_tangent().y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(spline.point_at(0.5).x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_custom_corner_is_tangent() {
        let profile = PathBuilder::new()
            .h_line(10.0)
            .custom_corner(2.0)
            .v_line(10.0)
            .h_line(-10.0)
            .close()
            .unwrap();
        assert_connected(&profile);
        let segments = profile.segments();
        assert!(matches!(segments[1], Segment::Arc(_)));
        assert_relative_eq!(segments[0].end().x, 8.0, epsilon = 1e-12);
        assert!(segments[0].end_tangent().distance(segments[1].start_tangent()) < 1e-12);
        assert!(segments[1].end_tangent().distance(segments[2].start_tangent()) < 1e-12);
        assert_relative_eq!(segments[2].start().y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_custom_corner_right_turn() {
        let profile = PathBuilder::new()
            .v_line(-10.0)
            .custom_corner(1.0)
            .line(-3.0, -4.0)
            .done()
            .unwrap();
        let segments = profile.segments();
        assert!(segments[0].end_tangent().distance(segments[1].start_tangent()) < 1e-12);
        assert!(segments[1].end_tangent().distance(segments[2].start_tangent()) < 1e-12);
        let Segment::Arc(arc) = segments[1] else {
            panic!("expected an arc");
        };
        assert!(arc.sweep < 0.0);
    }

    #[test]
    fn test_custom_corner_resolved_by_close() {
        let profile = PathBuilder::new()
            .h_line(10.0)
            .v_line(10.0)
            .custom_corner(3.0)
            .close()
            .unwrap();
        assert_connected(&profile);
        assert_eq!(profile.segments().len(), 4);
    }

    #[test]
    fn test_custom_corner_at_start_point() {
        let profile = PathBuilder::new()
            .h_line(10.0)
            .v_line(10.0)
            .line_to(DVec2::ZERO)
            .custom_corner(1.0)
            .close()
            .unwrap();
        assert_connected(&profile);
        assert!(profile.first_point().x > 0.0);
    }

    #[test]
    fn test_custom_corner_too_large() {
        let err = PathBuilder::new()
            .h_line(1.0)
            .custom_corner(5.0)
            .v_line(1.0)
            .done()
            .unwrap_err();
        assert_eq!(err.op, "custom_corner");
        assert_eq!(err.index, 1);
        assert!(matches!(err.kind, GeometryErrorKind::InfeasibleCorner { .. }));
    }

    #[test]
    fn test_custom_corner_needs_lines() {
        let err = PathBuilder::new()
            .h_line(5.0)
            .custom_corner(1.0)
            .tangent_arc(2.0, 2.0)
            .done()
            .unwrap_err();
        assert_eq!(err.kind, GeometryErrorKind::CornerNeedsLines);
    }

    #[test]
    fn test_dangling_corner() {
        let err = PathBuilder::new().h_line(5.0).custom_corner(1.0).done().unwrap_err();
        assert_eq!(err.kind, GeometryErrorKind::DanglingCorner);
    }

    #[test]
    fn test_close_with_mirror_is_symmetric() {
        let profile = PathBuilder::at(DVec2::new(10.0, 3.0))
            .ellipse_to(DVec2::new(7.0, 0.0), 3.0, 3.0, 90.0, false, ArcSense::Clockwise)
            .tangent_arc_to(DVec2::new(2.0, -1.0))
            .h_line(-2.0)
            .v_line_to(3.0)
            .close_with_mirror()
            .unwrap();
        assert_connected(&profile);
        let points = profile.sample(0.01);
        for p in &points {
            let mirrored = DVec2::new(p.x, 6.0 - p.y);
            let nearest = points
                .iter()
                .map(|q| q.distance(mirrored))
                .fold(f64::INFINITY, f64::min);
            assert!(nearest < 1e-9, "{p} has no mirror partner");
        }
    }

    #[test]
    fn test_close_with_mirror_degenerate_axis() {
        let err = PathBuilder::new()
            .h_line(1.0)
            .h_line(-1.0)
            .close_with_mirror()
            .unwrap_err();
        assert_eq!(err.kind, GeometryErrorKind::DegenerateMirrorAxis);
    }

    #[test]
    fn test_empty_path() {
        let err = PathBuilder::new().close().unwrap_err();
        assert_eq!(err.kind, GeometryErrorKind::EmptyPath);
    }

    #[test]
    fn test_polar_lines() {
        let profile = PathBuilder::new()
            .polar_line(2.0, 90.0)
            .polar_line_to(2.0, 0.0)
            .done()
            .unwrap();
        assert_relative_eq!(profile.segments()[0].end().y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(profile.last_point().x, 2.0, epsilon = 1e-12);
    }
}
