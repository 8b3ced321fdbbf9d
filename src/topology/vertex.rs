use crate::math::{transform_point, Matrix4, Point3, EDGE_TOLERANCE};

slotmap::new_key_type! {
    /// Unique identifier for a vertex in the topology store.
    pub struct VertexId;
}

/// A corner shared by every face loop that passes through its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexData {
    pub point: Point3,
}

impl VertexData {
    #[must_use]
    pub fn new(point: Point3) -> Self {
        Self { point }
    }

    /// `true` if `point` lies within [`EDGE_TOLERANCE`] of this vertex, so
    /// it would be merged into it.
    #[must_use]
    pub fn coincides_with(&self, point: &Point3) -> bool {
        (self.point - point).norm() <= EDGE_TOLERANCE
    }

    /// Moves the vertex by a homogeneous transform.
    pub fn transform(&mut self, matrix: &Matrix4) {
        self.point = transform_point(matrix, &self.point);
    }
}
