//! Common closed profiles shared by part recipes

use std::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::path::PathBuilder;
use super::profile::Profile;
use super::segment::{ArcSegment, MIN_SEGMENT_LENGTH, Segment};
use crate::error::{GeometryError, GeometryErrorKind};

/// Which feature of a hexagon points down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HexOrientation {
    /// A vertex at the bottom
    #[default]
    VBottom,
    /// A flat side at the bottom
    FlatBottom,
}

fn check_positive(op: &'static str, name: &str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::new(
            op,
            0,
            GeometryErrorKind::InvalidParameter(format!("{name} must be positive, got {value}")),
        ))
    }
}

/// Circle of `radius` centred at the origin
pub fn circle(radius: f64) -> Result<Profile, GeometryError> {
    check_positive("circle", "radius", radius)?;
    let arc = ArcSegment::circle(DVec2::ZERO, radius, 0.0, TAU);
    Ok(Profile::from_segments(vec![Segment::Arc(arc)], true))
}

/// Axis-aligned rectangle centred at the origin
pub fn rectangle(width: f64, height: f64) -> Result<Profile, GeometryError> {
    check_positive("rectangle", "width", width)?;
    check_positive("rectangle", "height", height)?;
    PathBuilder::at(DVec2::new(-width / 2.0, -height / 2.0))
        .h_line(width)
        .v_line(height)
        .h_line(-width)
        .close()
}

/// Rectangle centred at the origin with all four corners rounded
pub fn rounded_rectangle(width: f64, height: f64, radius: f64) -> Result<Profile, GeometryError> {
    if radius == 0.0 {
        return rectangle(width, height);
    }
    check_positive("rounded_rectangle", "width", width)?;
    check_positive("rounded_rectangle", "height", height)?;
    check_radius("rounded_rectangle", radius, width / 2.0, height / 2.0)?;

    let straight_w = width - 2.0 * radius;
    let straight_h = height - 2.0 * radius;
    let mut pen = PathBuilder::at(DVec2::new(-width / 2.0 + radius, -height / 2.0));
    pen = straight(pen, straight_w, 0.0).tangent_arc(radius, radius);
    pen = straight(pen, 0.0, straight_h).tangent_arc(-radius, radius);
    pen = straight(pen, -straight_w, 0.0).tangent_arc(-radius, -radius);
    pen = straight(pen, 0.0, -straight_h).tangent_arc(radius, -radius);
    pen.close()
}

/// Rectangle spanning `[-width, 0] × [0, height]` whose two top corners are
/// rounded; the bottom edge (the back) stays straight
pub fn rounded_rectangle_with_straight_back(
    width: f64,
    height: f64,
    radius: f64,
) -> Result<Profile, GeometryError> {
    check_positive("rounded_rectangle_with_straight_back", "width", width)?;
    check_positive("rounded_rectangle_with_straight_back", "height", height)?;
    if radius == 0.0 {
        return PathBuilder::new()
            .v_line(height)
            .h_line(-width)
            .v_line(-height)
            .close();
    }
    check_radius(
        "rounded_rectangle_with_straight_back",
        radius,
        width / 2.0,
        height,
    )?;

    let mut pen = straight(PathBuilder::new(), 0.0, height - radius);
    pen = straight(pen.tangent_arc(-radius, radius), -width + 2.0 * radius, 0.0);
    pen = pen.tangent_arc(-radius, -radius).v_line(-height + radius);
    pen.close()
}

fn check_radius(op: &'static str, radius: f64, max_x: f64, max_y: f64) -> Result<(), GeometryError> {
    if radius.is_finite() && radius > 0.0 && radius <= max_x && radius <= max_y {
        Ok(())
    } else {
        Err(GeometryError::new(op, 0, GeometryErrorKind::InvalidRadius(radius)))
    }
}

/// Straight segment that is skipped when a corner radius consumes the side
fn straight(pen: PathBuilder, dx: f64, dy: f64) -> PathBuilder {
    if dx.abs().max(dy.abs()) > MIN_SEGMENT_LENGTH {
        pen.line(dx, dy)
    } else {
        pen
    }
}

/// Regular hexagon centred at the origin
pub fn hexagon(circumradius: f64, orientation: HexOrientation) -> Result<Profile, GeometryError> {
    check_positive("hexagon", "circumradius", circumradius)?;
    let (start, start_angle) = match orientation {
        HexOrientation::VBottom => (DVec2::new(0.0, -circumradius), 30.0),
        HexOrientation::FlatBottom => (DVec2::new(circumradius, 0.0), 120.0),
    };
    let mut pen = PathBuilder::at(start);
    for side in 0..5 {
        pen = pen.polar_line(circumradius, side as f64 * 60.0 + start_angle);
    }
    pen.close()
}

/// Hexagonal hole whose inscribed circle has `inscribed_radius`
pub fn hexihole(inscribed_radius: f64, orientation: HexOrientation) -> Result<Profile, GeometryError> {
    hexagon(inscribed_radius * (2.0 / 3f64.sqrt()), orientation)
}

/// Centres of `count` grid cells of size `spacing` starting at zero
pub fn grid_centers(count: usize, spacing: f64) -> Vec<f64> {
    (0..count).map(|i| (i as f64 + 0.5) * spacing).collect()
}

/// Cell centres of a `columns × rows` grid, row by row
pub fn grid_cells(columns: usize, rows: usize, spacing: f64) -> Vec<DVec2> {
    let xs = grid_centers(columns, spacing);
    grid_centers(rows, spacing)
        .into_iter()
        .flat_map(|y| xs.iter().map(move |x| DVec2::new(*x, y)))
        .collect()
}
