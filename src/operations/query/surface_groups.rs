use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::error::Result;
use crate::math::TOLERANCE;
use crate::topology::{FaceId, TopologyStore};

/// A set of faces fitted as one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceGroup {
    /// Member faces. For a curved group the first face is the one the
    /// search started from.
    pub faces: Vec<FaceId>,
    /// `true` if the faces are joined by soft edges into a curved surface.
    pub curved: bool,
}

/// Partitions a face selection into curved surfaces and coplanar groups.
///
/// Selected faces are taken from the back of the selection. A face with a
/// soft edge pulls in every face reachable through soft edges, including
/// faces outside the selection. The remaining flat faces are grouped by
/// plane equation.
pub struct SurfaceGroups {
    selection: Vec<FaceId>,
}

impl SurfaceGroups {
    /// Creates a new `SurfaceGroups` query.
    #[must_use]
    pub fn new(selection: Vec<FaceId>) -> Self {
        Self { selection }
    }

    /// Executes the query. Curved groups come first.
    ///
    /// # Errors
    ///
    /// Returns an error if a face or edge is missing from the store.
    pub fn execute(&self, store: &TopologyStore) -> Result<Vec<SurfaceGroup>> {
        let mut pending: Vec<FaceId> = Vec::with_capacity(self.selection.len());
        for &face in &self.selection {
            if !pending.contains(&face) {
                pending.push(face);
            }
        }

        let mut groups = Vec::new();
        let mut flat = Vec::new();
        while let Some(face) = pending.pop() {
            let surface = connected_surface(store, face)?;
            if surface.len() <= 1 {
                flat.push(face);
                continue;
            }
            let members: HashSet<FaceId> = surface.iter().copied().collect();
            pending.retain(|f| !members.contains(f));
            debug!(faces = surface.len(), "found curved surface");
            groups.push(SurfaceGroup {
                faces: surface,
                curved: true,
            });
        }

        while let Some(face) = flat.pop() {
            let plane = store.face(face)?.plane.coefficients();
            let mut faces = vec![face];
            let mut rest = Vec::with_capacity(flat.len());
            for other in flat {
                let other_plane = store.face(other)?.plane.coefficients();
                if plane
                    .iter()
                    .zip(other_plane.iter())
                    .all(|(a, b)| (a - b).abs() < TOLERANCE)
                {
                    faces.push(other);
                } else {
                    rest.push(other);
                }
            }
            flat = rest;
            debug!(faces = faces.len(), "found coplanar group");
            groups.push(SurfaceGroup {
                faces,
                curved: false,
            });
        }
        Ok(groups)
    }
}

/// Every face reachable from `seed` through soft edges, seed first.
fn connected_surface(store: &TopologyStore, seed: FaceId) -> Result<Vec<FaceId>> {
    let mut seen = HashSet::from([seed]);
    let mut order = vec![seed];
    let mut queue = VecDeque::from([seed]);
    while let Some(face) = queue.pop_front() {
        for &edge_id in &store.face(face)?.edges {
            let edge = store.edge(edge_id)?;
            if !edge.soft {
                continue;
            }
            for &next in &edge.faces {
                if seen.insert(next) {
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }
    }
    Ok(order)
}
