//! Measurements on closed triangle meshes
//!
//! B-rep backends that cannot classify points or integrate volumes
//! themselves tessellate the shape and measure the mesh instead.

use glam::DVec3;

use super::{BoundingBox, Containment};

/// Ray directions for the parity test; skewed so rays rarely graze mesh
/// edges, and three of them so a grazing ray is outvoted
const RAY_DIRECTIONS: [DVec3; 3] = [
    DVec3::new(0.577_215_664_9, 0.618_033_988_7, 0.533_102_951_3),
    DVec3::new(-0.414_213_562_4, 0.732_050_807_6, -0.541_196_100_1),
    DVec3::new(0.301_029_995_7, -0.477_121_254_7, 0.825_741_858_4),
];

/// A closed, consistently oriented triangle mesh
#[derive(Debug, Clone, Default)]
pub(crate) struct TriangleMesh {
    pub vertices: Vec<DVec3>,
    pub triangles: Vec<[usize; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another mesh, e.g. the triangulation of one more face
    pub fn append(&mut self, vertices: Vec<DVec3>, triangles: impl IntoIterator<Item = [usize; 3]>) {
        let offset = self.vertices.len();
        self.vertices.extend(vertices);
        self.triangles.extend(
            triangles
                .into_iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }

    fn corners(&self, triangle: &[usize; 3]) -> (DVec3, DVec3, DVec3) {
        (
            self.vertices[triangle[0]],
            self.vertices[triangle[1]],
            self.vertices[triangle[2]],
        )
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().copied())
    }

    /// Enclosed volume by the divergence theorem
    pub fn volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let (a, b, c) = self.corners(t);
                a.dot(b.cross(c))
            })
            .sum::<f64>()
            .abs()
            / 6.0
    }

    /// Points within `tolerance` of a triangle are on the boundary; others
    /// are inside when most rays leaving them cross the mesh an odd number
    /// of times
    pub fn classify(&self, p: DVec3, tolerance: f64) -> Containment {
        let near = self.triangles.iter().any(|t| {
            let (a, b, c) = self.corners(t);
            closest_on_triangle(p, a, b, c).distance(p) <= tolerance
        });
        if near {
            return Containment::Boundary;
        }
        let odd = RAY_DIRECTIONS
            .iter()
            .filter(|dir| {
                let hits = self
                    .triangles
                    .iter()
                    .filter(|t| {
                        let (a, b, c) = self.corners(t);
                        ray_hits(p, **dir, a, b, c)
                    })
                    .count();
                hits % 2 == 1
            })
            .count();
        if odd * 2 > RAY_DIRECTIONS.len() {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }
}

/// Möller–Trumbore test for a ray from `origin` along `dir`
fn ray_hits(origin: DVec3, dir: DVec3, a: DVec3, b: DVec3, c: DVec3) -> bool {
    let e1 = b - a;
    let e2 = c - a;
    let h = dir.cross(e2);
    let det = e1.dot(h);
    if det.abs() < 1e-14 {
        return false;
    }
    let s = origin - a;
    let u = s.dot(h) / det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) / det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    e2.dot(q) / det > 0.0
}

/// Closest point to `p` on triangle `abc`
fn closest_on_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }
    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}
