use tracing::debug;

use crate::error::Result;
use crate::math::polygon_3d::{locate_in_loop, LoopPosition};
use crate::math::{Point3, EDGE_TOLERANCE, PLANE_TOLERANCE};
use crate::topology::{FaceId, TopologyStore};

/// Where a point lies relative to a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    /// Strictly inside the face.
    Inside,
    /// On one of the face's vertices.
    OnVertex,
    /// On one of the face's edges (outer loop or a hole).
    OnEdge,
    /// On the face plane but outside the face.
    Outside,
    /// Farther than the plane tolerance from the face plane.
    NotOnPlane,
    /// The face geometry could not be evaluated.
    Unknown,
}

impl PointClassification {
    /// `true` for `Inside`, `OnVertex` and `OnEdge`.
    #[must_use]
    pub fn is_on_face(self) -> bool {
        matches!(self, Self::Inside | Self::OnVertex | Self::OnEdge)
    }
}

/// Classifies a point against a face, taking holes into account.
pub struct ClassifyPoint {
    face: FaceId,
    point: Point3,
}

impl ClassifyPoint {
    /// Creates a new `ClassifyPoint` query.
    #[must_use]
    pub fn new(face: FaceId, point: Point3) -> Self {
        Self { face, point }
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not in the store.
    pub fn execute(&self, store: &TopologyStore) -> Result<PointClassification> {
        let face = store.face(self.face)?;
        if face.plane.signed_distance(&self.point).abs() > PLANE_TOLERANCE {
            return Ok(PointClassification::NotOnPlane);
        }
        let Ok((outer, holes)) = store.face_loops(self.face) else {
            debug!("face loops unavailable; classification unknown");
            return Ok(PointClassification::Unknown);
        };

        let position = |polygon: &[Point3]| {
            locate_in_loop(&self.point, polygon, &face.plane, EDGE_TOLERANCE)
        };

        match position(&outer) {
            LoopPosition::Outside => return Ok(PointClassification::Outside),
            LoopPosition::OnVertex => return Ok(PointClassification::OnVertex),
            LoopPosition::OnEdge => return Ok(PointClassification::OnEdge),
            LoopPosition::Inside => {}
        }
        for hole in &holes {
            match position(hole) {
                LoopPosition::Inside => return Ok(PointClassification::Outside),
                LoopPosition::OnVertex => return Ok(PointClassification::OnVertex),
                LoopPosition::OnEdge => return Ok(PointClassification::OnEdge),
                LoopPosition::Outside => {}
            }
        }
        Ok(PointClassification::Inside)
    }
}
