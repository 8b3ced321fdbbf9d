use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::math::Matrix4;
use crate::topology::{FaceId, TopologyStore, VertexId};

/// Applies an arbitrary 4x4 transformation matrix to a set of faces.
///
/// Vertices are shared, so every other face using a moved vertex moves with
/// it. Face planes are recomputed afterwards.
pub struct TransformFaces {
    faces: Vec<FaceId>,
    matrix: Matrix4,
}

impl TransformFaces {
    /// Creates a new `TransformFaces` operation.
    #[must_use]
    pub fn new(faces: Vec<FaceId>, matrix: Matrix4) -> Self {
        Self { faces, matrix }
    }

    /// Executes the transformation, modifying the faces in-place.
    ///
    /// # Errors
    ///
    /// Returns an error if a face or vertex is missing, or a face becomes
    /// degenerate under the transform.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<()> {
        let vertex_ids = collect_vertices(store, &self.faces)?;
        for &vid in &vertex_ids {
            store.vertex_mut(vid)?.transform(&self.matrix);
        }
        for &face in &self.faces {
            store.refresh_plane(face)?;
        }
        debug!(
            faces = self.faces.len(),
            vertices = vertex_ids.len(),
            "transformed faces"
        );
        Ok(())
    }
}

/// Unique vertices of all loops of `faces`, in first-seen order.
fn collect_vertices(store: &TopologyStore, faces: &[FaceId]) -> Result<Vec<VertexId>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for &face in faces {
        for lp in store.face(face)?.loops() {
            for &vid in lp {
                if seen.insert(vid) {
                    ids.push(vid);
                }
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{Point3, Vector3};
    use crate::operations::creation::MakeFace;
    use crate::operations::transform::rotation_about;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn shared_vertices_move_once() {
        let mut store = TopologyStore::new();
        let a = MakeFace::new(vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ])
        .execute(&mut store)
        .unwrap();
        let b = MakeFace::new(vec![
            p(1.0, 0.0, 0.0),
            p(2.0, 0.0, 0.0),
            p(2.0, 1.0, 0.0),
            p(1.0, 1.0, 0.0),
        ])
        .execute(&mut store)
        .unwrap();
        let shift = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 3.0));
        TransformFaces::new(vec![a, b], shift).execute(&mut store).unwrap();

        let (outer, _) = store.face_loops(b).unwrap();
        assert!(outer.iter().all(|q| (q.z - 3.0).abs() < 1e-12));
        assert_relative_eq!(store.face(a).unwrap().plane.signed_distance(&p(0.0, 0.0, 3.0)), 0.0);
    }

    #[test]
    fn rotation_updates_plane_normal() {
        let mut store = TopologyStore::new();
        let face = MakeFace::new(vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ])
        .execute(&mut store)
        .unwrap();
        let m = rotation_about(&Point3::origin(), &Vector3::x(), FRAC_PI_2).unwrap();
        TransformFaces::new(vec![face], m).execute(&mut store).unwrap();
        let normal = *store.face(face).unwrap().plane.plane_normal();
        assert_relative_eq!(normal, -Vector3::y(), epsilon = 1e-12);
    }
}
