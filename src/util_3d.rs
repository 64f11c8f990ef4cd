use std::cmp::Ordering;

use cgmath::{InnerSpace, Rad};

pub type Vector2 = cgmath::Vector2<f64>;
pub type Vector3 = cgmath::Vector3<f64>;
pub type Matrix2 = cgmath::Matrix2<f64>;

/// Projection of 3D points onto a face plane.
///
/// The pair of axes is chosen so that a polygon that is counter-clockwise around
/// the plane normal is still counter-clockwise once projected.
#[derive(Debug, Copy, Clone)]
pub struct Plane {
    x: Vector3,
    y: Vector3,
}

impl Plane {
    pub fn from_normal(n: Vector3) -> Plane {
        let b = (n.x * n.x + n.y * n.y).sqrt();
        let s = n.magnitude();
        if b > 0.0 {
            Plane {
                x: Vector3::new(n.x * n.z / (b * s), n.y * n.z / (b * s), -b / s),
                y: Vector3::new(-n.y / b, n.x / b, 0.0),
            }
        } else {
            // Already facing up or down, no rotation, maybe a mirror
            let sign = if n.z < 0.0 { -1.0 } else { 1.0 };
            Plane {
                x: Vector3::new(1.0, 0.0, 0.0),
                y: Vector3::new(0.0, sign, 0.0),
            }
        }
    }
    pub fn project(&self, p: &Vector3) -> Vector2 {
        Vector2::new(self.x.dot(*p), self.y.dot(*p))
    }
}

// The length of the result is twice the area of the polygon
pub fn newell_normal(ps: &[Vector3]) -> Vector3 {
    let mut normal = Vector3::new(0.0, 0.0, 0.0);
    for (i, a) in ps.iter().enumerate() {
        let b = ps[(i + 1) % ps.len()];
        normal += a.cross(b);
    }
    normal
}

/// Linear map that rotates `v1` onto the direction of `v2`.
///
/// If both vectors have different lengths the map also scales uniformly by `|v2|/|v1|`.
pub fn fitting_matrix(v1: Vector2, v2: Vector2) -> Matrix2 {
    let dot = v1.x * v2.x + v1.y * v2.y;
    let cross = v1.y * v2.x - v1.x * v2.y;
    // column-major
    Matrix2::new(dot, -cross, cross, dot) / v1.magnitude2()
}

pub fn cross2(a: Vector2, b: Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Lexicographic order by (x, y), the order of the sweepline events.
pub fn lex_cmp(a: &Vector2, b: &Vector2) -> Ordering {
    a.x.partial_cmp(&b.x)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}

pub fn lex_lt(a: &Vector2, b: &Vector2) -> bool {
    lex_cmp(a, b) == Ordering::Less
}

pub fn lex_le(a: &Vector2, b: &Vector2) -> bool {
    lex_cmp(a, b) != Ordering::Greater
}

// f64 is not Hash nor Eq, but points that come out of the same computation have the same bits.
// Adding 0.0 turns -0.0 into 0.0, so both compare equal as keys too.
pub fn point_key(v: &Vector2) -> (u64, u64) {
    ((v.x + 0.0).to_bits(), (v.y + 0.0).to_bits())
}

pub fn bounding_box_2d(vs: impl IntoIterator<Item = Vector2>) -> (Vector2, Vector2) {
    let mut vs = vs.into_iter();
    let (mut a, mut b) = match vs.next() {
        Some(v) => (v, v),
        None => return (Vector2::new(0.0, 0.0), Vector2::new(0.0, 0.0)),
    };
    for v in vs {
        a.x = a.x.min(v.x);
        a.y = a.y.min(v.y);
        b.x = b.x.max(v.x);
        b.y = b.y.max(v.y);
    }
    (a, b)
}

/// Signed area, positive for counter-clockwise polygons.
pub fn polygon_area(ps: &[Vector2]) -> f64 {
    let mut area = 0.0;
    for (i, a) in ps.iter().enumerate() {
        let b = ps[(i + 1) % ps.len()];
        area += cross2(*a, b);
    }
    area / 2.0
}

// Andrew's monotone chain, counter-clockwise, without collinear points
pub fn convex_hull(points: &[Vector2]) -> Vec<Vector2> {
    let mut ps = points.to_vec();
    ps.sort_by(lex_cmp);
    ps.dedup_by(|a, b| lex_cmp(a, b) == Ordering::Equal);
    if ps.len() < 3 {
        return ps;
    }

    let mut hull: Vec<Vector2> = Vec::with_capacity(2 * ps.len());
    for &p in &ps {
        while hull.len() >= 2 && cross2(hull[hull.len() - 1] - hull[hull.len() - 2], p - hull[hull.len() - 2]) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in ps.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross2(hull[hull.len() - 1] - hull[hull.len() - 2], p - hull[hull.len() - 2]) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Rotation that minimizes the area of the axis-aligned bounding box of `points`.
///
/// The optimal box always has one side along an edge of the convex hull, so only those
/// directions are tried.
pub fn box_fit_angle(points: &[Vector2]) -> Rad<f64> {
    let hull = convex_hull(points);
    if hull.len() < 2 {
        return Rad(0.0);
    }
    let mut best: Option<(f64, f64)> = None;
    for (i, a) in hull.iter().enumerate() {
        let b = hull[(i + 1) % hull.len()];
        let d = b - a;
        let len = d.magnitude();
        if len == 0.0 {
            continue;
        }
        let (cos, sin) = (d.x / len, d.y / len);
        // rotate by -angle(d), so that this hull edge becomes horizontal
        let rotated = hull.iter().map(|p| Vector2::new(cos * p.x + sin * p.y, -sin * p.x + cos * p.y));
        let (v0, v1) = bounding_box_2d(rotated);
        let area = (v1.x - v0.x) * (v1.y - v0.y);
        if best.is_none_or(|(best_area, _)| area < best_area) {
            best = Some((area, -sin.atan2(cos)));
        }
    }
    Rad(best.map_or(0.0, |(_, angle)| angle))
}
