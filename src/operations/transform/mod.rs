mod general;
mod rotate;

pub use general::TransformFaces;
pub use rotate::{rotation_about, translation};
