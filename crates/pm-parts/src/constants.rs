//! Display constants shared by multi-body parts

/// RGBA colour of a hinge's even side
pub const EVEN_SIDE_COLOR: [f32; 4] = [0.26, 0.52, 0.96, 1.0];

/// RGBA colour of a hinge's odd side
pub const ODD_SIDE_COLOR: [f32; 4] = [0.96, 0.62, 0.22, 1.0];
