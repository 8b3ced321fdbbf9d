use crate::geometry::Plane;

use super::{Point2, Point3, Vector3};

/// Where a point lies relative to a single closed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPosition {
    Inside,
    OnVertex,
    OnEdge,
    Outside,
}

/// Projects a 3D point onto the UV coordinate system of a plane.
#[must_use]
pub fn project_to_uv(point: &Point3, plane: &Plane) -> Point2 {
    let diff = point - plane.origin();
    Point2::new(diff.dot(plane.u_dir()), diff.dot(plane.v_dir()))
}

/// Newell's method: the (unnormalized) normal of a closed polygon.
///
/// The length of the result is twice the polygon area, and the direction
/// follows the right-hand rule over the vertex order.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Point-in-polygon test for a 3D point coplanar with the polygon.
///
/// Projects to the plane's UV coordinate space and uses the winding number
/// algorithm. Boundary points may land on either side.
#[must_use]
pub fn point_in_polygon_3d(point: &Point3, polygon: &[Point3], plane: &Plane) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let p = project_to_uv(point, plane);
    let uvs: Vec<Point2> = polygon.iter().map(|q| project_to_uv(q, plane)).collect();

    winding_number_2d(&p, &uvs) != 0
}

/// Locates a coplanar point relative to a closed loop, checking vertices and
/// edges within `tolerance` before the interior test.
#[must_use]
pub fn locate_in_loop(
    point: &Point3,
    polygon: &[Point3],
    plane: &Plane,
    tolerance: f64,
) -> LoopPosition {
    let n = polygon.len();
    if n < 3 {
        return LoopPosition::Outside;
    }
    if polygon.iter().any(|v| (point - v).norm() <= tolerance) {
        return LoopPosition::OnVertex;
    }
    for i in 0..n {
        if distance_to_segment(point, &polygon[i], &polygon[(i + 1) % n]) <= tolerance {
            return LoopPosition::OnEdge;
        }
    }
    if point_in_polygon_3d(point, polygon, plane) {
        LoopPosition::Inside
    } else {
        LoopPosition::Outside
    }
}

/// Shortest distance from `point` to the segment `a`-`b`.
#[must_use]
pub fn distance_to_segment(point: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::EPSILON {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Winding number of `p` with respect to polygon `verts`.
///
/// Non-zero => inside, zero => outside.
fn winding_number_2d(p: &Point2, verts: &[Point2]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];

        if a.y <= p.y {
            if b.y > p.y && cross_2d(b.x - a.x, b.y - a.y, p.x - a.x, p.y - a.y) > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && cross_2d(b.x - a.x, b.y - a.y, p.x - a.x, p.y - a.y) < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// 2D cross product: `(ax * by - ay * bx)`.
#[inline]
fn cross_2d(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}
