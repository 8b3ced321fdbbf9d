use tracing::debug;

use super::lattice::NodeLattice;

/// Invalidates every valid node that has an invalid or missing node within
/// `rings` steps in x and y, peeling that many rings off each border.
///
/// Decisions are taken from a snapshot of the validity before the pass, so
/// erosion does not cascade.
pub struct BorderEroder {
    rings: usize,
}

impl BorderEroder {
    /// Creates a new `BorderEroder`.
    #[must_use]
    pub fn new(rings: usize) -> Self {
        Self { rings }
    }

    /// Executes the erosion in place, returning how many nodes were removed.
    pub fn execute(&self, nodes: &mut NodeLattice) -> usize {
        if self.rings == 0 {
            return 0;
        }
        let valid = nodes.validity();
        let (nx, ny) = (nodes.nx(), nodes.ny());
        let n = self.rings;

        let near_border = |x: usize, y: usize| {
            if x < n || y < n || x + n > nx || y + n > ny {
                return true;
            }
            (y - n..=y + n).any(|yy| (x - n..=x + n).any(|xx| valid.get(xx, yy) != Some(&true)))
        };

        let mut removed = 0;
        for y in 0..=ny {
            for x in 0..=nx {
                if valid.get(x, y) == Some(&true) && near_border(x, y) {
                    if let Some(node) = nodes.get_mut(x, y) {
                        *node = None;
                        removed += 1;
                    }
                }
            }
        }
        debug!(rings = n, removed, "eroded lattice border");
        removed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fitting::lattice::Lattice;
    use crate::math::Point3;

    fn full(nx: usize, ny: usize) -> NodeLattice {
        Lattice::from_fn(nx, ny, |x, y| {
            #[allow(clippy::cast_precision_loss)]
            Some(Point3::new(x as f64, y as f64, 0.0))
        })
    }

    #[test]
    fn zero_rings_is_a_no_op() {
        let mut nodes = full(4, 4);
        assert_eq!(BorderEroder::new(0).execute(&mut nodes), 0);
        assert_eq!(nodes, full(4, 4));
    }

    #[test]
    fn one_ring_keeps_the_interior() {
        let mut nodes = full(4, 4);
        BorderEroder::new(1).execute(&mut nodes);
        assert_eq!(nodes.valid_count(), 9);
        assert!(nodes.is_valid(1, 1));
        assert!(!nodes.is_valid(0, 2));
    }

    #[test]
    fn holes_erode_around_them() {
        let mut nodes = full(6, 6);
        *nodes.get_mut(3, 3).unwrap() = None;
        BorderEroder::new(1).execute(&mut nodes);
        assert_eq!(nodes.valid_count(), 25 - 9);
        assert!(!nodes.is_valid(2, 4));
        assert!(nodes.is_valid(1, 1));
    }

    #[test]
    fn enough_rings_clear_everything() {
        let mut nodes = full(5, 2);
        BorderEroder::new(5).execute(&mut nodes);
        assert_eq!(nodes.valid_count(), 0);
    }
}
