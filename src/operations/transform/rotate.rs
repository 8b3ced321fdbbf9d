use crate::error::{OperationError, Result};
use crate::math::{Matrix4, Point3, Vector3, TOLERANCE};

/// Rotation by `angle` radians about the axis through `origin` along `axis`.
///
/// # Errors
///
/// Returns an error if the axis direction is zero-length.
pub fn rotation_about(origin: &Point3, axis: &Vector3, angle: f64) -> Result<Matrix4> {
    let len = axis.norm();
    if len < TOLERANCE {
        return Err(OperationError::InvalidInput("rotation axis must be non-zero".into()).into());
    }
    let axis = axis / len;

    let t_neg = Matrix4::new_translation(&(-origin.coords));
    let t_pos = Matrix4::new_translation(&origin.coords);
    Ok(t_pos * rotation_matrix(&axis, angle) * t_neg)
}

/// Translation by `offset`.
#[must_use]
pub fn translation(offset: &Vector3) -> Matrix4 {
    Matrix4::new_translation(offset)
}

/// Builds a 4x4 rotation matrix around a unit axis by an angle (Rodrigues).
#[allow(clippy::many_single_char_names)]
fn rotation_matrix(axis: &Vector3, angle: f64) -> Matrix4 {
    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);

    #[allow(clippy::suspicious_operation_groupings)]
    Matrix4::new(
        t * x * x + c,     t * x * y - s * z, t * x * z + s * y, 0.0,
        t * x * y + s * z, t * y * y + c,     t * y * z - s * x, 0.0,
        t * x * z - s * y, t * y * z + s * x, t * z * z + c,     0.0,
        0.0,               0.0,               0.0,               1.0,
    )
}
