use crate::geometry::Plane;

use super::{Point3, Vector3, TOLERANCE};

/// Relationship of a line with a plane.
#[derive(Debug)]
pub enum LinePlaneRelation {
    /// Line intersects the plane at a single point.
    Point { point: Point3, t: f64 },
    /// Line is parallel to the plane (does not intersect).
    Parallel,
    /// Line lies entirely on the plane.
    OnPlane,
}

/// Computes the intersection of a line `origin + t * dir` with a plane.
#[must_use]
pub fn line_plane_intersect(origin: &Point3, dir: &Vector3, plane: &Plane) -> LinePlaneRelation {
    let normal = plane.plane_normal();
    let denom = normal.dot(dir);

    let diff = plane.origin() - origin;
    let numer = normal.dot(&diff);

    if denom.abs() < TOLERANCE {
        if numer.abs() < TOLERANCE {
            LinePlaneRelation::OnPlane
        } else {
            LinePlaneRelation::Parallel
        }
    } else {
        let t = numer / denom;
        let point = origin + dir * t;
        LinePlaneRelation::Point { point, t }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn vertical_line_hits_horizontal_plane() {
        let plane = Plane::from_normal(Point3::new(0.0, 0.0, 2.0), Vector3::z()).unwrap();
        match line_plane_intersect(&Point3::new(1.0, 1.0, 0.0), &Vector3::z(), &plane) {
            LinePlaneRelation::Point { point, t } => {
                assert!((t - 2.0).abs() < TOLERANCE);
                assert!((point.z - 2.0).abs() < TOLERANCE);
            }
            other => panic!("expected a point, got {other:?}"),
        }
    }

    #[test]
    fn parallel_and_on_plane() {
        let plane = Plane::from_normal(Point3::origin(), Vector3::z()).unwrap();
        assert!(matches!(
            line_plane_intersect(&Point3::new(0.0, 0.0, 1.0), &Vector3::x(), &plane),
            LinePlaneRelation::Parallel
        ));
        assert!(matches!(
            line_plane_intersect(&Point3::origin(), &Vector3::x(), &plane),
            LinePlaneRelation::OnPlane
        ));
    }
}
