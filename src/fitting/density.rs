use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::math::TOLERANCE;

/// How finely a grid is divided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DensitySpec {
    /// Approximate cell side length.
    CellWidth(f64),
    /// Exact number of cells along the shorter side.
    CellsOnShortSide(u32),
    /// Exact number of cells along the longer side.
    CellsOnLongSide(u32),
}

impl DensitySpec {
    /// Checks the value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::InvalidParameters`] for a non-positive width or a
    /// zero cell count.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::CellWidth(w) if !(w.is_finite() && w > 0.0) => Err(FitError::InvalidParameters(
                format!("cell width must be positive, got {w}"),
            )
            .into()),
            Self::CellsOnShortSide(0) | Self::CellsOnLongSide(0) => Err(
                FitError::InvalidParameters("cell count must be at least 1".into()).into(),
            ),
            _ => Ok(()),
        }
    }

    /// Resolves the cell counts `(nx, ny)` for a rectangle of the given
    /// extents. Cells are kept as close to square as the counts allow, and
    /// each count is at least 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the density is invalid.
    pub fn resolve(&self, width: f64, height: f64) -> Result<(usize, usize)> {
        self.validate()?;
        let wide = width > height;
        let (long, short) = if wide { (width, height) } else { (height, width) };

        let (n_long, n_short) = match *self {
            Self::CellWidth(w) => {
                let n_long = (long / w).round();
                (n_long, scaled(short, long, n_long))
            }
            Self::CellsOnLongSide(n) => {
                let n = f64::from(n);
                (n, scaled(short, long, n))
            }
            Self::CellsOnShortSide(n) => {
                let n = f64::from(n);
                (scaled(long, short, n), n)
            }
        };

        let (nx, ny) = if wide {
            (n_long, n_short)
        } else {
            (n_short, n_long)
        };
        let nx = if width < TOLERANCE { 1 } else { to_count(nx) };
        let ny = if height < TOLERANCE { 1 } else { to_count(ny) };
        Ok((nx, ny))
    }
}

/// `round(side / reference · n)`, or 1 when the reference side is empty.
fn scaled(side: f64, reference: f64, n: f64) -> f64 {
    if reference < TOLERANCE {
        1.0
    } else {
        (side / reference * n).round()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(n: f64) -> usize {
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}
