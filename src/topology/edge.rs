use super::face::FaceId;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology store.
    pub struct EdgeId;
}

/// Data associated with a topological edge.
///
/// An edge is a straight segment between two vertices. Faces sharing the
/// segment share the edge; `faces` lists them in insertion order.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// Soft edges join the facets of one smoothly curved surface.
    pub soft: bool,
    /// Faces bounded by this edge.
    pub faces: Vec<FaceId>,
}

impl EdgeData {
    /// Creates a hard edge with no adjacent faces.
    #[must_use]
    pub fn new(start: VertexId, end: VertexId) -> Self {
        Self {
            start,
            end,
            soft: false,
            faces: Vec::new(),
        }
    }
}
