use crate::error::{OperationError, Result};
use crate::geometry::Plane;
use crate::math::polygon_3d::newell_normal;
use crate::math::{Point3, EDGE_TOLERANCE};
use crate::topology::{EdgeId, FaceData, FaceId, TopologyStore, VertexId};

/// Creates a planar face from an outer loop and optional holes.
///
/// The face normal follows the right-hand rule over the outer loop. Hole
/// loops are re-wound clockwise about that normal. Vertices and edges that
/// already exist in the store are reused.
pub struct MakeFace {
    outer: Vec<Point3>,
    holes: Vec<Vec<Point3>>,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(outer: Vec<Point3>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Adds hole loops to the face.
    #[must_use]
    pub fn with_holes(mut self, holes: Vec<Vec<Point3>>) -> Self {
        self.holes = holes;
        self
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a loop has fewer than 3 distinct points or the
    /// outer loop encloses no area.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        let outer = dedup_loop(&self.outer);
        if outer.len() < 3 {
            return Err(OperationError::InvalidInput(
                "face loop needs at least 3 distinct points".into(),
            )
            .into());
        }
        let plane = Plane::from_loop(&outer)?;
        let normal = *plane.plane_normal();

        let mut holes = Vec::with_capacity(self.holes.len());
        for hole in &self.holes {
            let mut hole = dedup_loop(hole);
            if hole.len() < 3 {
                return Err(OperationError::InvalidInput(
                    "hole loop needs at least 3 distinct points".into(),
                )
                .into());
            }
            if newell_normal(&hole).dot(&normal) > 0.0 {
                hole.reverse();
            }
            holes.push(hole);
        }

        let mut edges = Vec::new();
        let outer_ids = insert_loop(store, &outer, &mut edges);
        let hole_ids = holes
            .iter()
            .map(|hole| insert_loop(store, hole, &mut edges))
            .collect();

        store.add_face(FaceData {
            plane,
            outer: outer_ids,
            holes: hole_ids,
            edges,
            hidden: false,
            stamp: None,
        })
    }
}

/// Drops consecutive duplicates, including a closing point equal to the first.
fn dedup_loop(points: &[Point3]) -> Vec<Point3> {
    let mut out: Vec<Point3> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_none_or(|last| (last - p).norm() > EDGE_TOLERANCE) {
            out.push(*p);
        }
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).norm() <= EDGE_TOLERANCE {
        out.pop();
    }
    out
}

fn insert_loop(
    store: &mut TopologyStore,
    points: &[Point3],
    edges: &mut Vec<EdgeId>,
) -> Vec<VertexId> {
    let ids: Vec<VertexId> = points.iter().map(|p| store.find_or_add_vertex(*p)).collect();
    for i in 0..ids.len() {
        edges.push(store.find_or_add_edge(ids[i], ids[(i + 1) % ids.len()]));
    }
    ids
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Vector3, TOLERANCE};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn square_face_has_four_edges() {
        let mut store = TopologyStore::new();
        let face = MakeFace::new(vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 0.0),
        ])
        .execute(&mut store)
        .unwrap();
        let data = store.face(face).unwrap();
        assert_eq!(data.outer.len(), 4);
        assert_eq!(data.edges.len(), 4);
        assert!((data.plane.plane_normal() - Vector3::z()).norm() < TOLERANCE);
    }

    #[test]
    fn holes_are_wound_against_the_outer_loop() {
        let mut store = TopologyStore::new();
        let hole = vec![
            p(1.0, 1.0, 0.0),
            p(2.0, 1.0, 0.0),
            p(2.0, 2.0, 0.0),
            p(1.0, 2.0, 0.0),
        ];
        let face = MakeFace::new(vec![
            p(0.0, 0.0, 0.0),
            p(3.0, 0.0, 0.0),
            p(3.0, 3.0, 0.0),
            p(0.0, 3.0, 0.0),
        ])
        .with_holes(vec![hole])
        .execute(&mut store)
        .unwrap();
        let (_, holes) = store.face_loops(face).unwrap();
        assert_eq!(holes.len(), 1);
        assert!(newell_normal(&holes[0]).z < 0.0);
        assert_eq!(store.face(face).unwrap().edges.len(), 8);
    }

    #[test]
    fn too_few_points_rejected() {
        let mut store = TopologyStore::new();
        let result = MakeFace::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 0.0, 0.0)])
            .execute(&mut store);
        assert!(result.is_err());
    }
}
