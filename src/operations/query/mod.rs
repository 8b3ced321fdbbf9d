mod bounding_box;
mod classify;
mod raytest;
mod surface_groups;

pub use bounding_box::{Aabb, BoundingBox};
pub use classify::{ClassifyPoint, PointClassification};
pub use raytest::{HitEntity, RayHit, RayTest, Scene, SceneIndex};
pub use surface_groups::{SurfaceGroup, SurfaceGroups};
