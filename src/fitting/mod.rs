//! Grid fitting: turning face groups into validated node lattices and
//! meshes.

pub mod builder;
pub mod density;
pub mod erode;
pub mod fit;
pub mod lattice;
pub mod mesh;
pub mod normalize;

pub use builder::LatticeBuilder;
pub use density::DensitySpec;
pub use erode::BorderEroder;
pub use fit::{merge_outlines, FitGrids, FitGroup, FittedGrid, Outline};
pub use lattice::{Lattice, NodeLattice};
pub use mesh::{GridMesh, MeshEmitter, MeshFace};
pub use normalize::{normalize, Orientation};

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::math::TOLERANCE;

/// Inset used when the requested boundary offset is zero, so nodes on the
/// outline never sit exactly on a face edge.
pub const MIN_OFFSET: f64 = 0.01;

/// User settings for fitting grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// How finely to divide each grid.
    pub density: DensitySpec,
    /// Distance the grid is raised off the surface, along its normal.
    pub standoff: f64,
    /// Rings of nodes to remove around every border, if any. TOML has no
    /// null, so configuration files disable erosion with `0`.
    #[serde(with = "erosion_rings")]
    pub erosion: Option<u32>,
    /// Inset applied to flat outlines before the lattice is laid out.
    pub offset: f64,
}

impl Default for FitParams {
    /// Indoor-environment-quality defaults: half-metre cells at desk height,
    /// with a 1.5 m perimeter zone excluded.
    fn default() -> Self {
        Self {
            density: DensitySpec::CellWidth(0.5),
            standoff: 0.72,
            erosion: Some(3),
            offset: 1.5,
        }
    }
}

impl FitParams {
    /// Checks the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::InvalidParameters`] for an invalid density or a
    /// non-finite distance.
    pub fn validate(&self) -> Result<()> {
        self.density.validate()?;
        if !self.standoff.is_finite() || !self.offset.is_finite() {
            return Err(FitError::InvalidParameters("distances must be finite".into()).into());
        }
        if self.offset < 0.0 {
            return Err(FitError::InvalidParameters(format!(
                "offset must not be negative, got {}",
                self.offset
            ))
            .into());
        }
        Ok(())
    }

    /// The inset actually applied to flat outlines.
    #[must_use]
    pub fn effective_offset(&self) -> f64 {
        if self.offset.abs() < TOLERANCE {
            MIN_OFFSET
        } else {
            self.offset
        }
    }
}

/// Stores disabled erosion as `0` rings.
mod erosion_rings {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(rings: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(rings.unwrap_or(0))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rings = Option::<u32>::deserialize(deserializer)?;
        Ok(rings.filter(|&n| n > 0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = FitParams::default();
        params.validate().unwrap();
        assert_eq!(params.erosion, Some(3));
    }

    #[test]
    fn zero_offset_becomes_minimum_inset() {
        let params = FitParams {
            offset: 0.0,
            ..FitParams::default()
        };
        assert!((params.effective_offset() - MIN_OFFSET).abs() < f64::EPSILON);
    }

    #[test]
    fn disabled_erosion_is_written_as_zero() {
        let params = FitParams {
            erosion: None,
            ..FitParams::default()
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["erosion"], 0);
        let back: FitParams = serde_json::from_value(json).unwrap();
        assert_eq!(back.erosion, None);

        let missing: FitParams = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.erosion, Some(3));
    }

    #[test]
    fn negative_offset_rejected() {
        let params = FitParams {
            offset: -1.0,
            ..FitParams::default()
        };
        assert!(params.validate().is_err());
    }
}
