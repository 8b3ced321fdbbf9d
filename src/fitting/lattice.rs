use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::math::Point3;

/// A dense 2-D array of `(ny + 1) × (nx + 1)` values, one per lattice node,
/// stored row-major in `(y, x)` order.
///
/// Serialized as a list of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<Vec<T>>",
    into = "Vec<Vec<T>>",
    bound(serialize = "T: Clone + Serialize", deserialize = "T: Deserialize<'de>")
)]
pub struct Lattice<T> {
    nx: usize,
    ny: usize,
    cells: Vec<T>,
}

/// Node positions of a fitted grid; `None` marks an invalid node.
pub type NodeLattice = Lattice<Option<Point3>>;

impl<T> Lattice<T> {
    /// Builds a lattice with `nx` × `ny` cells by evaluating `f(x, y)` at
    /// every node.
    pub fn from_fn(nx: usize, ny: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity((nx + 1) * (ny + 1));
        for y in 0..=ny {
            for x in 0..=nx {
                cells.push(f(x, y));
            }
        }
        Self { nx, ny, cells }
    }

    /// Builds a lattice from rows of equal length. Needs at least two rows
    /// of at least two values.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Malformed`] for ragged or too small input.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, PersistError> {
        let width = rows.first().map_or(0, Vec::len);
        if rows.len() < 2 || width < 2 {
            return Err(PersistError::Malformed(
                "lattice needs at least 2 × 2 nodes".into(),
            ));
        }
        if rows.iter().any(|row| row.len() != width) {
            return Err(PersistError::Malformed("lattice rows differ in length".into()));
        }
        let ny = rows.len() - 1;
        Ok(Self {
            nx: width - 1,
            ny,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of cells along x (nodes per row minus one).
    #[must_use]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of cells along y (rows minus one).
    #[must_use]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.cells.len()
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x <= self.nx && y <= self.ny).then(|| y * (self.nx + 1) + x)
    }

    /// The value at node `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Mutable access to node `(x, y)`.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.index(x, y).map(|i| &mut self.cells[i])
    }

    /// Iterates `(x, y, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let stride = self.nx + 1;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (i % stride, i / stride, v))
    }

    /// Rows from `y = 0` upwards.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.nx + 1)
    }

    /// Applies `f` to every node, keeping the dimensions.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Lattice<U> {
        Lattice {
            nx: self.nx,
            ny: self.ny,
            cells: self.cells.iter().map(&mut f).collect(),
        }
    }

    /// `true` if both lattices have the same dimensions.
    #[must_use]
    pub fn same_shape<U>(&self, other: &Lattice<U>) -> bool {
        self.nx == other.nx && self.ny == other.ny
    }
}

impl<T: Clone> Lattice<T> {
    /// A lattice with every node set to `value`.
    pub fn filled(nx: usize, ny: usize, value: T) -> Self {
        Self {
            nx,
            ny,
            cells: vec![value; (nx + 1) * (ny + 1)],
        }
    }
}

impl NodeLattice {
    /// `true` if node `(x, y)` exists and is valid.
    #[must_use]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// Number of valid nodes.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.cells.iter().filter(|n| n.is_some()).count()
    }

    /// The validity of every node.
    #[must_use]
    pub fn validity(&self) -> Lattice<bool> {
        self.map(Option::is_some)
    }
}

impl<T> TryFrom<Vec<Vec<T>>> for Lattice<T> {
    type Error = PersistError;

    fn try_from(rows: Vec<Vec<T>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl<T: Clone> From<Lattice<T>> for Vec<Vec<T>> {
    fn from(lattice: Lattice<T>) -> Self {
        lattice.rows().map(<[T]>::to_vec).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout() {
        let lattice = Lattice::from_fn(2, 1, |x, y| (x, y));
        assert_eq!(lattice.node_count(), 6);
        assert_eq!(lattice.get(2, 1), Some(&(2, 1)));
        assert_eq!(lattice.get(3, 0), None);
        let order: Vec<_> = lattice.iter().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(order[..4], [(0, 0), (1, 0), (2, 0), (0, 1)]);
    }

    #[test]
    fn rows_round_trip() {
        let lattice = Lattice::from_fn(2, 2, |x, y| x + 10 * y);
        let rows: Vec<Vec<usize>> = lattice.clone().into();
        assert_eq!(rows[1], vec![10, 11, 12]);
        assert_eq!(Lattice::from_rows(rows).unwrap(), lattice);
    }

    #[test]
    fn ragged_rows_rejected() {
        assert!(Lattice::from_rows(vec![vec![1, 2], vec![3]]).is_err());
        assert!(Lattice::from_rows(vec![vec![1, 2]]).is_err());
    }

    #[test]
    fn serializes_as_rows() {
        let lattice = Lattice::filled(1, 1, -1.0_f64);
        let json = serde_json::to_string(&lattice).unwrap();
        assert_eq!(json, "[[-1.0,-1.0],[-1.0,-1.0]]");
        let back: Lattice<f64> = serde_json::from_str(&json).unwrap();
        assert!(back.same_shape(&lattice));
    }

    #[test]
    fn node_validity() {
        let nodes: NodeLattice =
            Lattice::from_fn(1, 1, |x, y| (x == y).then(|| Point3::new(0.0, 0.0, 0.0)));
        assert_eq!(nodes.valid_count(), 2);
        assert!(nodes.is_valid(1, 1));
        assert!(!nodes.is_valid(1, 0));
        assert!(!nodes.is_valid(5, 5));
    }
}
