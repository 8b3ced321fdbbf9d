use tracing::warn;

use crate::error::Result;
use crate::math::{transform_direction, Matrix4, Point3, Vector3, TOLERANCE};
use crate::operations::query::BoundingBox;
use crate::operations::transform::rotation_about;
use crate::topology::{FaceId, TopologyStore};

/// Normals with a vertical component at or above this stay as they are, so
/// vertical faces are not flipped by floating-point noise.
const DOWNWARD_LIMIT: f64 = -0.001;

/// Placement of a face group relative to the horizontal.
#[derive(Debug, Clone, PartialEq)]
pub struct Orientation {
    /// Carries world-up onto `normal`, about `center`.
    pub rotation: Matrix4,
    /// Lays the group horizontal.
    pub inverse: Matrix4,
    /// Upward-facing unit normal of the group.
    pub normal: Vector3,
    /// Bounding-box center the rotations pivot about.
    pub center: Point3,
}

/// Computes the orientation of a face group from its first face's normal
/// and the bounding box of all its faces.
///
/// # Errors
///
/// Returns an error if `faces` is empty or references missing faces.
pub fn normalize(store: &TopologyStore, faces: &[FaceId]) -> Result<Orientation> {
    let center = BoundingBox::new(faces.to_vec()).execute(store)?.center();
    let normal = match faces.first() {
        Some(&face) => *store.face(face)?.plane.plane_normal(),
        None => Vector3::z(),
    };
    Orientation::from_normal(normal, center)
}

impl Orientation {
    /// Builds the orientation for a group with the given normal.
    ///
    /// # Errors
    ///
    /// Returns an error if a rotation cannot be built.
    pub fn from_normal(normal: Vector3, center: Point3) -> Result<Self> {
        let mut normal = match normal.try_normalize(TOLERANCE) {
            Some(n) => n,
            None => {
                warn!("group normal has no length; using vertical");
                Vector3::z()
            }
        };
        if normal.z < DOWNWARD_LIMIT {
            normal = -normal;
        }

        let y_angle = normal.x.clamp(-1.0, 1.0).asin();
        let cos_y = y_angle.cos();
        let x_angle = if cos_y.abs() < TOLERANCE {
            0.0
        } else {
            (-normal.y / cos_y).clamp(-1.0, 1.0).asin()
        };

        let rx = rotation_about(&center, &Vector3::x(), x_angle)?;
        let ry = rotation_about(&center, &Vector3::y(), y_angle)?;
        let rx_inv = rotation_about(&center, &Vector3::x(), -x_angle)?;
        let ry_inv = rotation_about(&center, &Vector3::y(), -y_angle)?;

        Ok(Self {
            rotation: rx * ry,
            inverse: ry_inv * rx_inv,
            normal,
            center,
        })
    }

    /// World-up carried by the rotation; equals `normal` up to rounding.
    #[must_use]
    pub fn rotated_up(&self) -> Vector3 {
        transform_direction(&self.rotation, &Vector3::z())
    }
}
