use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Plane;

use super::edge::EdgeId;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// Provenance token tying a grid to the faces it was fitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stamp(Uuid);

impl Stamp {
    /// Creates a fresh, unique stamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Stamp {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Stamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Data associated with a topological face.
///
/// A planar polygon bounded by an outer loop and optionally inner loops
/// (holes). The outer loop winds counter-clockwise about the plane normal,
/// holes wind clockwise.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The plane on which this face lies.
    pub plane: Plane,
    /// Vertices of the outer boundary, in order.
    pub outer: Vec<VertexId>,
    /// Vertices of each hole boundary, in order.
    pub holes: Vec<Vec<VertexId>>,
    /// Edges of all loops, outer loop first.
    pub edges: Vec<EdgeId>,
    /// Hidden faces are ignored by ray tests.
    pub hidden: bool,
    /// Stamp of the last fitting operation that used this face.
    pub stamp: Option<Stamp>,
}

impl FaceData {
    /// All loops of the face, outer loop first.
    pub fn loops(&self) -> impl Iterator<Item = &[VertexId]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }
}
