use tracing::debug;

use crate::error::Result;
use crate::math::polygon_3d::newell_normal;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{FaceId, TopologyStore};

/// Below this, `1 + cos(turn)` is treated as a hairpin and the vertex moves
/// along the incoming edge normal only.
const HAIRPIN_LIMIT: f64 = 1e-6;

/// Offsets a planar face boundary within its plane.
///
/// Positive distances grow the face, negative distances inset it: the outer
/// loop shrinks and holes grow. Corners are mitred.
pub struct FaceOffset {
    face: FaceId,
    distance: f64,
}

impl FaceOffset {
    /// Creates a new `FaceOffset` operation.
    #[must_use]
    pub fn new(face: FaceId, distance: f64) -> Self {
        Self { face, distance }
    }

    /// Executes the offset, returning the outer loop followed by the
    /// surviving holes, or `None` if the outer loop collapses.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not found.
    pub fn execute(&self, store: &TopologyStore) -> Result<Option<Vec<Vec<Point3>>>> {
        let normal = *store.face(self.face)?.plane.plane_normal();
        let (outer, holes) = store.face_loops(self.face)?;
        Ok(offset_loops(&outer, &holes, &normal, self.distance))
    }
}

/// Mitred offset of an outer loop (counter-clockwise about `normal`) and its
/// holes (clockwise). Holes that collapse are dropped.
#[must_use]
pub fn offset_loops(
    outer: &[Point3],
    holes: &[Vec<Point3>],
    normal: &Vector3,
    distance: f64,
) -> Option<Vec<Vec<Point3>>> {
    let mut loops = vec![offset_loop(outer, normal, distance)?];
    for hole in holes {
        match offset_loop(hole, normal, distance) {
            Some(moved) => loops.push(moved),
            None => debug!("hole collapsed under offset"),
        }
    }
    Some(loops)
}

/// Moves each vertex so both adjacent edges shift by `distance` along their
/// outward normals `edge × normal`. `None` when the loop flips or vanishes.
fn offset_loop(points: &[Point3], normal: &Vector3, distance: f64) -> Option<Vec<Point3>> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let edge_normals: Vec<Vector3> = (0..n)
        .map(|i| {
            let edge = points[(i + 1) % n] - points[i];
            edge.cross(normal).try_normalize(TOLERANCE).unwrap_or_else(Vector3::zeros)
        })
        .collect();

    let moved: Vec<Point3> = (0..n)
        .map(|i| {
            let before = &edge_normals[(i + n - 1) % n];
            let after = &edge_normals[i];
            let denom = 1.0 + before.dot(after);
            let shift = if denom < HAIRPIN_LIMIT {
                *before
            } else {
                (before + after) / denom
            };
            points[i] + shift * distance
        })
        .collect();

    let area_before = newell_normal(points).dot(normal);
    let area_after = newell_normal(&moved).dot(normal);
    if area_after.abs() < TOLERANCE || area_before.signum() != area_after.signum() {
        return None;
    }
    Some(moved)
}
