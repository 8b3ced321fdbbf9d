use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::math::{transform_point, Point3};

use super::lattice::NodeLattice;
use super::normalize::Orientation;

/// One emitted grid cell: a quad on flat grids, a triangle on curved ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshFace {
    /// Lattice `(x, y)` index of every corner, in winding order.
    pub corners: Vec<(usize, usize)>,
    /// World position of every corner.
    pub points: Vec<Point3>,
    /// Front and back color, once graded.
    pub color: Option<Rgb>,
}

/// The cells of a grid in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridMesh {
    faces: Vec<MeshFace>,
}

impl GridMesh {
    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// `true` if no cell was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// The cells in emission order.
    #[must_use]
    pub fn faces(&self) -> &[MeshFace] {
        &self.faces
    }

    /// Mutable access to the cells.
    pub fn faces_mut(&mut self) -> &mut [MeshFace] {
        &mut self.faces
    }
}

/// Moves a normalized lattice back into world space: apply the rotation,
/// then raise by `standoff` along the normal.
#[must_use]
pub fn restore_placement(
    nodes: &NodeLattice,
    orientation: &Orientation,
    standoff: f64,
) -> NodeLattice {
    let mut lift = orientation.normal * standoff;
    if orientation.normal.z * standoff < 0.0 {
        lift = -lift;
    }
    nodes.map(|node| node.map(|p| transform_point(&orientation.rotation, &p) + lift))
}

const QUAD: &[(usize, usize)] = &[(0, 0), (0, 1), (1, 1), (1, 0)];
const TRIANGLES: [&[(usize, usize)]; 2] = [&[(0, 0), (0, 1), (1, 1)], &[(0, 0), (1, 0), (1, 1)]];

/// Turns a node lattice into mesh cells wherever all corners are valid.
pub struct MeshEmitter {
    curved: bool,
}

impl MeshEmitter {
    /// Creates a new `MeshEmitter`.
    #[must_use]
    pub fn new(curved: bool) -> Self {
        Self { curved }
    }

    /// Emits the mesh, cell by cell in `(y, x)` order.
    #[must_use]
    pub fn execute(&self, nodes: &NodeLattice) -> GridMesh {
        let patterns: &[&[(usize, usize)]] = if self.curved { &TRIANGLES } else { &[QUAD] };

        let mut faces = Vec::new();
        for y in 0..nodes.ny() {
            for x in 0..nodes.nx() {
                for pattern in patterns {
                    let corners: Vec<(usize, usize)> = pattern
                        .iter()
                        .map(|&(dx, dy)| (x + dx, y + dy))
                        .collect();
                    let points: Option<Vec<Point3>> = corners
                        .iter()
                        .map(|&(cx, cy)| nodes.get(cx, cy).copied().flatten())
                        .collect();
                    if let Some(points) = points {
                        faces.push(MeshFace {
                            corners,
                            points,
                            color: None,
                        });
                    }
                }
            }
        }
        GridMesh { faces }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::fitting::lattice::Lattice;
    use crate::math::Vector3;

    fn flat(nx: usize, ny: usize) -> NodeLattice {
        #[allow(clippy::cast_precision_loss)]
        Lattice::from_fn(nx, ny, |x, y| Some(Point3::new(x as f64, y as f64, 0.0)))
    }

    #[test]
    fn quads_follow_row_order() {
        let mesh = MeshEmitter::new(false).execute(&flat(2, 2));
        assert_eq!(mesh.len(), 4);
        assert_eq!(mesh.faces()[0].corners, vec![(0, 0), (0, 1), (1, 1), (1, 0)]);
        assert_eq!(mesh.faces()[1].corners[0], (1, 0));
        assert_eq!(mesh.faces()[2].corners[0], (0, 1));
    }

    #[test]
    fn curved_cells_split_into_triangles() {
        let mut nodes = flat(1, 1);
        *nodes.get_mut(0, 1).unwrap() = None;
        let mesh = MeshEmitter::new(true).execute(&nodes);
        assert_eq!(mesh.len(), 1);
        assert_eq!(mesh.faces()[0].corners, vec![(0, 0), (1, 0), (1, 1)]);
    }

    #[test]
    fn cells_with_invalid_corner_are_skipped() {
        let mut nodes = flat(2, 1);
        *nodes.get_mut(2, 1).unwrap() = None;
        assert_eq!(MeshEmitter::new(false).execute(&nodes).len(), 1);
    }

    #[test]
    fn placement_lifts_along_normal() {
        let orientation = Orientation::from_normal(Vector3::z(), Point3::origin()).unwrap();
        let placed = restore_placement(&flat(1, 1), &orientation, 0.72);
        assert_relative_eq!(placed.get(1, 1).unwrap().unwrap(), Point3::new(1.0, 1.0, 0.72));
        let placed = restore_placement(&flat(1, 1), &orientation, -0.5);
        assert_relative_eq!(placed.get(0, 0).unwrap().unwrap().z, 0.5);
    }
}
