pub mod edge;
pub mod face;
pub mod vertex;

pub use edge::{EdgeData, EdgeId};
pub use face::{FaceData, FaceId, Stamp};
pub use vertex::{VertexData, VertexId};

use std::collections::{HashMap, HashSet};

use crate::error::{Result, TopologyError};
use crate::geometry::Plane;
use crate::math::Point3;
use slotmap::SlotMap;

/// Central arena that owns all topological entities of a scene.
///
/// Entities reference each other via typed IDs (generational indices),
/// avoiding self-referential structures and enabling safe mutation.
/// Vertices closer than [`crate::math::EDGE_TOLERANCE`] are merged on insertion, so faces
/// that touch along a segment share its edge.
#[derive(Debug, Default)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    faces: SlotMap<FaceId, FaceData>,
    edge_lookup: HashMap<(VertexId, VertexId), EdgeId>,
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex operations ---

    /// Returns the vertex at `point`, inserting one if none lies within
    /// tolerance.
    pub fn find_or_add_vertex(&mut self, point: Point3) -> VertexId {
        if let Some((id, _)) = self
            .vertices
            .iter()
            .find(|(_, v)| v.coincides_with(&point))
        {
            return id;
        }
        self.vertices.insert(VertexData::new(point))
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData> {
        self.vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()).into())
    }

    /// Returns a mutable reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexData> {
        self.vertices
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()).into())
    }

    /// Resolves a loop of vertex IDs into positions.
    ///
    /// # Errors
    ///
    /// Returns an error if any vertex is missing.
    pub fn loop_points(&self, ids: &[VertexId]) -> Result<Vec<Point3>> {
        ids.iter().map(|&id| Ok(self.vertex(id)?.point)).collect()
    }

    // --- Edge operations ---

    /// Returns the edge between `a` and `b`, inserting one if needed.
    pub fn find_or_add_edge(&mut self, a: VertexId, b: VertexId) -> EdgeId {
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&id) = self.edge_lookup.get(&key) {
            return id;
        }
        let id = self.edges.insert(EdgeData::new(a, b));
        self.edge_lookup.insert(key, id);
        id
    }

    /// The edge joining `a` and `b`, in either direction.
    #[must_use]
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.edge_lookup.get(&key).copied()
    }

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()).into())
    }

    /// Marks an edge as soft (joining facets of a curved surface) or hard.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not found.
    pub fn set_edge_soft(&mut self, id: EdgeId, soft: bool) -> Result<()> {
        self.edges
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))?
            .soft = soft;
        Ok(())
    }

    /// Softens every edge shared by two or more of `faces`, turning them into
    /// one curved surface.
    ///
    /// # Errors
    ///
    /// Returns an error if a face is not found.
    pub fn soften_shared_edges(&mut self, faces: &[FaceId]) -> Result<()> {
        let members: HashSet<FaceId> = faces.iter().copied().collect();
        let mut shared = Vec::new();
        for &face in faces {
            for &edge_id in &self.face(face)?.edges {
                let edge = self.edge(edge_id)?;
                if edge.faces.iter().filter(|f| members.contains(f)).count() > 1 {
                    shared.push(edge_id);
                }
            }
        }
        for edge_id in shared {
            self.set_edge_soft(edge_id, true)?;
        }
        Ok(())
    }

    // --- Face operations ---

    /// Inserts a face and registers it with its edges.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the face's edges is not in the store.
    pub fn add_face(&mut self, data: FaceData) -> Result<FaceId> {
        for &edge_id in &data.edges {
            self.edge(edge_id)?;
        }
        let edges = data.edges.clone();
        let id = self.faces.insert(data);
        for edge_id in edges {
            if let Some(edge) = self.edges.get_mut(edge_id) {
                if !edge.faces.contains(&id) {
                    edge.faces.push(id);
                }
            }
        }
        Ok(id)
    }

    /// Returns a reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face(&self, id: FaceId) -> Result<&FaceData> {
        self.faces
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()).into())
    }

    /// Returns a mutable reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face_mut(&mut self, id: FaceId) -> Result<&mut FaceData> {
        self.faces
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()).into())
    }

    /// Iterates over all faces in the store.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &FaceData)> {
        self.faces.iter()
    }

    /// Returns `true` if the face exists.
    #[must_use]
    pub fn contains_face(&self, id: FaceId) -> bool {
        self.faces.contains_key(id)
    }

    /// Outer loop and hole loops of a face as positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its vertices is missing.
    pub fn face_loops(&self, id: FaceId) -> Result<(Vec<Point3>, Vec<Vec<Point3>>)> {
        let face = self.face(id)?;
        let outer = self.loop_points(&face.outer)?;
        let holes = face
            .holes
            .iter()
            .map(|hole| self.loop_points(hole))
            .collect::<Result<Vec<_>>>()?;
        Ok((outer, holes))
    }

    /// Recomputes a face's plane from its current vertex positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing or has become degenerate.
    pub fn refresh_plane(&mut self, id: FaceId) -> Result<()> {
        let outer = self.loop_points(&self.face(id)?.outer)?;
        let plane = Plane::from_loop(&outer)?;
        self.face_mut(id)?.plane = plane;
        Ok(())
    }

    /// Hides or shows a face. Hidden faces cast no shadows.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not found.
    pub fn set_hidden(&mut self, id: FaceId, hidden: bool) -> Result<()> {
        self.face_mut(id)?.hidden = hidden;
        Ok(())
    }

    /// Records the fitting stamp on a face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not found.
    pub fn set_stamp(&mut self, id: FaceId, stamp: Stamp) -> Result<()> {
        self.face_mut(id)?.stamp = Some(stamp);
        Ok(())
    }

    /// All faces carrying `stamp`.
    #[must_use]
    pub fn faces_with_stamp(&self, stamp: Stamp) -> Vec<FaceId> {
        self.faces
            .iter()
            .filter(|(_, f)| f.stamp == Some(stamp))
            .map(|(id, _)| id)
            .collect()
    }

    /// Removes a face. Edges left without faces are removed too.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not found.
    pub fn remove_face(&mut self, id: FaceId) -> Result<FaceData> {
        let data = self
            .faces
            .remove(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()))?;
        for &edge_id in &data.edges {
            let orphaned = match self.edges.get_mut(edge_id) {
                Some(edge) => {
                    edge.faces.retain(|&f| f != id);
                    edge.faces.is_empty()
                }
                None => false,
            };
            if orphaned {
                if let Some(edge) = self.edges.remove(edge_id) {
                    let key = if edge.start < edge.end {
                        (edge.start, edge.end)
                    } else {
                        (edge.end, edge.start)
                    };
                    self.edge_lookup.remove(&key);
                }
            }
        }
        Ok(data)
    }
}
