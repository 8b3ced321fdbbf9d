use crate::error::{OperationError, Result};
use crate::geometry::Plane;
use crate::math::intersect_3d::{line_plane_intersect, LinePlaneRelation};
use crate::math::polygon_3d::{distance_to_segment, locate_in_loop, LoopPosition};
use crate::math::{Point3, Vector3, EDGE_TOLERANCE, TOLERANCE};
use crate::topology::{EdgeId, FaceId, TopologyStore};

use super::bounding_box::Aabb;

/// Hits closer to the ray origin than this are ignored, so a ray cast from
/// a point on a face does not strike that face again.
pub const RAY_EPSILON: f64 = 1e-7;

/// The primitive struck by a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitEntity {
    /// The interior of a face.
    Face(FaceId),
    /// A face boundary.
    Edge(EdgeId),
}

/// Result of a ray test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The struck point.
    pub point: Point3,
    /// Distance from the ray origin.
    pub distance: f64,
    /// What was struck.
    pub entity: HitEntity,
}

/// Anything a ray can be cast through.
pub trait Scene {
    /// Returns the nearest opaque hit along `origin + t * direction`, t > 0.
    fn raytest(&self, origin: &Point3, direction: &Vector3) -> Option<RayHit>;
}

struct IndexedFace {
    id: FaceId,
    plane: Plane,
    outer: Vec<Point3>,
    holes: Vec<Vec<Point3>>,
    edges: Vec<(EdgeId, Point3, Point3)>,
    bounds: Aabb,
}

impl IndexedFace {
    fn hit(&self, origin: &Point3, dir: &Vector3) -> Option<(f64, Point3, HitEntity)> {
        if !self.bounds.hit_by_ray(origin, dir, EDGE_TOLERANCE) {
            return None;
        }
        let LinePlaneRelation::Point { point, t } = line_plane_intersect(origin, dir, &self.plane)
        else {
            return None;
        };
        if t * dir.norm() <= RAY_EPSILON {
            return None;
        }

        let mut on_boundary = false;
        match locate_in_loop(&point, &self.outer, &self.plane, EDGE_TOLERANCE) {
            LoopPosition::Outside => return None,
            LoopPosition::OnVertex | LoopPosition::OnEdge => on_boundary = true,
            LoopPosition::Inside => {}
        }
        if !on_boundary {
            for hole in &self.holes {
                match locate_in_loop(&point, hole, &self.plane, EDGE_TOLERANCE) {
                    LoopPosition::Inside => return None,
                    LoopPosition::OnVertex | LoopPosition::OnEdge => {
                        on_boundary = true;
                        break;
                    }
                    LoopPosition::Outside => {}
                }
            }
        }

        let entity = if on_boundary {
            self.nearest_edge(&point)
                .map_or(HitEntity::Face(self.id), HitEntity::Edge)
        } else {
            HitEntity::Face(self.id)
        };
        Some((t, point, entity))
    }

    fn nearest_edge(&self, point: &Point3) -> Option<EdgeId> {
        self.edges
            .iter()
            .map(|(id, a, b)| (*id, distance_to_segment(point, a, b)))
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(id, _)| id)
    }
}

/// A snapshot of the visible faces of a store, prepared for repeated ray
/// tests. Faces added, moved or hidden afterwards are not seen.
pub struct SceneIndex {
    faces: Vec<IndexedFace>,
}

impl SceneIndex {
    /// Indexes every visible face of `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if a face references a missing vertex or edge.
    pub fn new(store: &TopologyStore) -> Result<Self> {
        let mut faces = Vec::new();
        for (id, data) in store.faces() {
            if data.hidden {
                continue;
            }
            let (outer, holes) = store.face_loops(id)?;
            let Some(bounds) = Aabb::from_points(&outer) else {
                continue;
            };
            let mut edges = Vec::with_capacity(data.edges.len());
            for &edge_id in &data.edges {
                let edge = store.edge(edge_id)?;
                edges.push((
                    edge_id,
                    store.vertex(edge.start)?.point,
                    store.vertex(edge.end)?.point,
                ));
            }
            faces.push(IndexedFace {
                id,
                plane: data.plane.clone(),
                outer,
                holes,
                edges,
                bounds,
            });
        }
        Ok(Self { faces })
    }

    /// Number of indexed faces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// `true` if no face is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl Scene for SceneIndex {
    fn raytest(&self, origin: &Point3, direction: &Vector3) -> Option<RayHit> {
        let len = direction.norm();
        if len < TOLERANCE {
            return None;
        }
        let dir = direction / len;
        self.faces
            .iter()
            .filter_map(|face| face.hit(origin, &dir))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, point, entity)| RayHit {
                point,
                distance: t,
                entity,
            })
    }
}

/// Casts a single ray through the visible faces of a store.
pub struct RayTest {
    origin: Point3,
    direction: Vector3,
}

impl RayTest {
    /// Creates a new `RayTest` query.
    #[must_use]
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    /// Executes the query, returning the nearest hit if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction is zero-length or the store is
    /// inconsistent.
    pub fn execute(&self, store: &TopologyStore) -> Result<Option<RayHit>> {
        if self.direction.norm() < TOLERANCE {
            return Err(
                OperationError::InvalidInput("ray direction must be non-zero".into()).into(),
            );
        }
        Ok(SceneIndex::new(store)?.raytest(&self.origin, &self.direction))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::operations::creation::MakeFace;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn slab(store: &mut TopologyStore, z: f64) -> FaceId {
        MakeFace::new(vec![
            p(0.0, 0.0, z),
            p(2.0, 0.0, z),
            p(2.0, 2.0, z),
            p(0.0, 2.0, z),
        ])
        .execute(store)
        .unwrap()
    }

    #[test]
    fn nearest_face_wins() {
        let mut store = TopologyStore::new();
        let low = slab(&mut store, 1.0);
        slab(&mut store, 3.0);
        let hit = RayTest::new(p(0.5, 0.5, 0.0), Vector3::z())
            .execute(&store)
            .unwrap()
            .unwrap();
        assert_eq!(hit.entity, HitEntity::Face(low));
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-12);
        assert_relative_eq!(hit.point.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn miss_and_backwards_are_none() {
        let mut store = TopologyStore::new();
        slab(&mut store, 1.0);
        let index = SceneIndex::new(&store).unwrap();
        assert!(index.raytest(&p(5.0, 5.0, 0.0), &Vector3::z()).is_none());
        assert!(index.raytest(&p(0.5, 0.5, 2.0), &Vector3::z()).is_none());
    }

    #[test]
    fn origin_on_face_is_ignored() {
        let mut store = TopologyStore::new();
        slab(&mut store, 0.0);
        let index = SceneIndex::new(&store).unwrap();
        assert!(index.raytest(&p(1.0, 1.0, 0.0), &Vector3::z()).is_none());
    }

    #[test]
    fn boundary_hit_reports_edge() {
        let mut store = TopologyStore::new();
        let face = slab(&mut store, 1.0);
        let hit = RayTest::new(p(1.0, 0.0, 0.0), Vector3::z())
            .execute(&store)
            .unwrap()
            .unwrap();
        let HitEntity::Edge(edge) = hit.entity else {
            panic!("expected an edge hit, got {:?}", hit.entity);
        };
        assert_eq!(store.edge(edge).unwrap().faces, vec![face]);
    }

    #[test]
    fn hidden_faces_cast_no_shadow() {
        let mut store = TopologyStore::new();
        let face = slab(&mut store, 1.0);
        store.set_hidden(face, true).unwrap();
        let index = SceneIndex::new(&store).unwrap();
        assert!(index.is_empty());
        assert!(index.raytest(&p(0.5, 0.5, 0.0), &Vector3::z()).is_none());
    }

    #[test]
    fn zero_direction_rejected() {
        let store = TopologyStore::new();
        assert!(RayTest::new(p(0.0, 0.0, 0.0), Vector3::zeros()).execute(&store).is_err());
    }
}
