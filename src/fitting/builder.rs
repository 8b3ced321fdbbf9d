use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::Result;
use crate::math::{Point3, Vector3};
use crate::operations::query::{
    BoundingBox, ClassifyPoint, HitEntity, PointClassification, Scene, SceneIndex,
};
use crate::topology::{FaceId, TopologyStore};

use super::density::DensitySpec;
use super::lattice::NodeLattice;

/// Curved groups are sampled from this far below their lowest point.
const CURVED_DROP: f64 = 10.0;

/// Lays a node lattice over a horizontal face group and decides which nodes
/// fall on it.
///
/// Flat groups keep nodes at the group's mid-height and test them against
/// every face. Curved groups start below the surface and shoot each node
/// straight up until it lands on a group face or escapes.
pub struct LatticeBuilder {
    faces: Vec<FaceId>,
    curved: bool,
    density: DensitySpec,
}

impl LatticeBuilder {
    /// Creates a new `LatticeBuilder`.
    #[must_use]
    pub fn new(faces: Vec<FaceId>, curved: bool, density: DensitySpec) -> Self {
        Self {
            faces,
            curved,
            density,
        }
    }

    /// Builds the lattice in the store's (normalized) coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no faces, the density is invalid, or
    /// the store is inconsistent.
    pub fn execute(&self, store: &TopologyStore) -> Result<NodeLattice> {
        let bounds = BoundingBox::new(self.faces.clone()).execute(store)?;
        let size = bounds.size();
        let (nx, ny) = self.density.resolve(size.x, size.y)?;
        #[allow(clippy::cast_precision_loss)]
        let (cell_w, cell_h) = (size.x / nx as f64, size.y / ny as f64);
        let z0 = if self.curved {
            bounds.min.z - CURVED_DROP
        } else {
            (bounds.min.z + bounds.max.z) / 2.0
        };
        debug!(nx, ny, curved = self.curved, "laying out lattice");

        let placer = if self.curved {
            NodePlacer::Surface {
                scene: SceneIndex::new(store)?,
                members: self.faces.iter().copied().collect(),
            }
        } else {
            NodePlacer::Plane
        };

        let mut failure = None;
        #[allow(clippy::cast_precision_loss)]
        let nodes = NodeLattice::from_fn(nx, ny, |x, y| {
            let candidate = Point3::new(
                bounds.min.x + x as f64 * cell_w,
                bounds.min.y + y as f64 * cell_h,
                z0,
            );
            match placer.place(store, &self.faces, candidate) {
                Ok(node) => node,
                Err(e) => {
                    failure.get_or_insert(e);
                    None
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        debug!(valid = nodes.valid_count(), total = nodes.node_count(), "lattice classified");
        Ok(nodes)
    }
}

enum NodePlacer {
    Plane,
    Surface {
        scene: SceneIndex,
        members: HashSet<FaceId>,
    },
}

impl NodePlacer {
    fn place(
        &self,
        store: &TopologyStore,
        faces: &[FaceId],
        candidate: Point3,
    ) -> Result<Option<Point3>> {
        match self {
            Self::Plane => {
                for &face in faces {
                    match ClassifyPoint::new(face, candidate).execute(store)? {
                        c if c.is_on_face() => return Ok(Some(candidate)),
                        PointClassification::Outside => {}
                        other => warn!(?other, "node could not be classified against face"),
                    }
                }
                Ok(None)
            }
            Self::Surface { scene, members } => {
                let mut origin = candidate;
                while let Some(hit) = scene.raytest(&origin, &Vector3::z()) {
                    origin = hit.point;
                    let on_group = match hit.entity {
                        HitEntity::Face(face) => members.contains(&face),
                        HitEntity::Edge(edge) => {
                            store.edge(edge)?.faces.iter().any(|f| members.contains(f))
                        }
                    };
                    if on_group {
                        return Ok(Some(origin));
                    }
                }
                Ok(None)
            }
        }
    }
}
