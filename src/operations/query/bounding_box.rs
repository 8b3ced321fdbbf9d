use crate::error::{OperationError, Result};
use crate::math::{Point3, Vector3};
use crate::topology::{FaceId, TopologyStore};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// The smallest box containing all `points`, or `None` for no points.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            aabb.min = aabb.min.inf(p);
            aabb.max = aabb.max.sup(p);
        }
        Some(aabb)
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    /// Slab test: does the ray `origin + t * dir` (t ≥ 0) touch the box,
    /// widened by `margin` on every side?
    #[must_use]
    pub fn hit_by_ray(&self, origin: &Point3, dir: &Vector3, margin: f64) -> bool {
        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let lo = self.min[axis] - margin;
            let hi = self.max[axis] + margin;
            if dir[axis].abs() < f64::EPSILON {
                if origin[axis] < lo || origin[axis] > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let (t0, t1) = {
                let a = (lo - origin[axis]) * inv;
                let b = (hi - origin[axis]) * inv;
                if a < b { (a, b) } else { (b, a) }
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Computes the axis-aligned bounding box of a set of faces.
pub struct BoundingBox {
    faces: Vec<FaceId>,
}

impl BoundingBox {
    /// Creates a new `BoundingBox` query.
    #[must_use]
    pub fn new(faces: Vec<FaceId>) -> Self {
        Self { faces }
    }

    /// Executes the query, returning the AABB of every face vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if no faces were given or a face is missing.
    pub fn execute(&self, store: &TopologyStore) -> Result<Aabb> {
        let mut points = Vec::new();
        for &face in &self.faces {
            points.extend(store.loop_points(&store.face(face)?.outer)?);
        }
        Aabb::from_points(&points).ok_or_else(|| {
            OperationError::InvalidInput("bounding box of an empty face set".into()).into()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::MakeFace;

    #[test]
    fn box_of_tilted_face() {
        let mut store = TopologyStore::new();
        let face = MakeFace::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(2.0, 3.0, 1.0),
            Point3::new(0.0, 3.0, 0.0),
        ])
        .execute(&mut store)
        .unwrap();
        let aabb = BoundingBox::new(vec![face]).execute(&store).unwrap();
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Point3::new(2.0, 3.0, 1.0));
        assert_eq!(aabb.center(), Point3::new(1.0, 1.5, 0.5));
    }

    #[test]
    fn empty_set_is_an_error() {
        let store = TopologyStore::new();
        assert!(BoundingBox::new(vec![]).execute(&store).is_err());
    }

    #[test]
    fn slab_test() {
        let aabb = Aabb::from_points(&[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)])
            .unwrap();
        let up = Vector3::z();
        assert!(aabb.hit_by_ray(&Point3::new(0.5, 0.5, -5.0), &up, 0.0));
        assert!(!aabb.hit_by_ray(&Point3::new(2.0, 0.5, -5.0), &up, 0.0));
        assert!(!aabb.hit_by_ray(&Point3::new(0.5, 0.5, 5.0), &up, 0.0));
    }
}
