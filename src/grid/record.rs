use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::GridResults;
use crate::color::ColorConfig;
use crate::error::{PersistError, Result};
use crate::fitting::{Lattice, NodeLattice};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::Stamp;

use super::Grid;

/// Version written by [`GridRecord::from_grid`].
pub const RECORD_VERSION: u32 = 2;

/// The persisted form of a grid. The mesh is not stored; it is emitted
/// again from the nodes on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRecord {
    pub version: u32,
    pub nodes: NodeLattice,
    pub normal: Vector3,
    pub curved: bool,
    #[serde(default)]
    pub stamp: Option<Stamp>,
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub results: Option<GridResults>,
    #[serde(default)]
    pub colors: Option<ColorConfig>,
    #[serde(default)]
    pub labeled: bool,
    #[serde(default)]
    pub legacy: bool,
}

/// Grid properties as stored by the first version: no version tag,
/// no stamp and no results.
#[derive(Debug, Clone, Deserialize)]
struct LegacyRecord {
    nodes: Vec<Vec<Option<LegacyNode>>>,
    norm: [f64; 3],
    is_surface: bool,
    #[serde(default)]
    id: Option<u32>,
}

/// A first-version node: a point, or `false` (sometimes `null`) where the
/// node missed the surface.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum LegacyNode {
    Point([f64; 3]),
    Missing(bool),
}

impl LegacyNode {
    fn point(self) -> Option<Point3> {
        match self {
            Self::Point(p) => Some(Point3::from(p)),
            Self::Missing(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current(GridRecord),
    Legacy(LegacyRecord),
}

impl TryFrom<LegacyRecord> for GridRecord {
    type Error = PersistError;

    fn try_from(old: LegacyRecord) -> std::result::Result<Self, Self::Error> {
        let rows = old
            .nodes
            .into_iter()
            .map(|row| row.into_iter().map(|n| n.and_then(LegacyNode::point)).collect())
            .collect();
        Ok(Self {
            version: RECORD_VERSION,
            nodes: Lattice::from_rows(rows)?,
            normal: Vector3::from(old.norm),
            curved: old.is_surface,
            stamp: None,
            id: old.id,
            results: None,
            colors: None,
            labeled: false,
            legacy: true,
        })
    }
}

impl StoredRecord {
    fn into_record(self) -> Result<GridRecord> {
        match self {
            Self::Current(record) => Ok(record),
            Self::Legacy(old) => Ok(old.try_into()?),
        }
    }
}

impl GridRecord {
    /// Captures the persisted state of `grid`.
    #[must_use]
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            version: RECORD_VERSION,
            nodes: grid.nodes.clone(),
            normal: grid.normal,
            curved: grid.curved,
            stamp: grid.stamp,
            id: grid.id,
            results: grid.results.clone(),
            colors: grid.colors.clone(),
            labeled: grid.labeled,
            legacy: grid.legacy,
        }
    }

    /// Parses a record of any known version. Legacy records come back
    /// flagged `legacy`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] if the text is neither shape and
    /// [`PersistError::Malformed`] for a ragged legacy lattice.
    pub fn from_json(text: &str) -> Result<Self> {
        let stored: StoredRecord = serde_json::from_str(text).map_err(PersistError::from)?;
        stored.into_record()
    }

    /// Serializes the record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] on serialization failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self).map_err(PersistError::from)?)
    }

    /// Rebuilds the grid. Results that do not fit the nodes are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Malformed`] for an unknown version or a
    /// zero normal.
    pub fn into_grid(self) -> Result<Grid> {
        if self.version > RECORD_VERSION {
            return Err(PersistError::Malformed(format!(
                "record version {} is newer than {RECORD_VERSION}",
                self.version
            ))
            .into());
        }
        let normal = self
            .normal
            .try_normalize(TOLERANCE)
            .ok_or_else(|| PersistError::Malformed("grid normal has no length".into()))?;
        let results = self.results.filter(|r| {
            let fits = r.fits(&self.nodes);
            if !fits {
                warn!(id = ?self.id, "stored results do not match the grid; dropped");
            }
            fits
        });
        if self.legacy {
            debug!(id = ?self.id, "loaded legacy grid");
        }
        let labeled = self.labeled && results.is_some();
        Ok(Grid::from_parts(
            self.nodes,
            normal,
            self.curved,
            self.stamp,
            self.id,
            results,
            self.colors,
            labeled,
            self.legacy,
        ))
    }
}

/// Parses a list of records of any known version.
///
/// # Errors
///
/// Returns [`PersistError::Json`] for malformed input.
pub fn records_from_json(text: &str) -> Result<Vec<GridRecord>> {
    let stored: Vec<StoredRecord> = serde_json::from_str(text).map_err(PersistError::from)?;
    stored.into_iter().map(StoredRecord::into_record).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::grid::tests::{sample_grid, sample_results};

    #[test]
    fn current_record_round_trips() {
        let mut grid = sample_grid();
        grid.commit_results(7, sample_results());
        grid.set_labeled(true);
        let json = GridRecord::from_grid(&grid).to_json().unwrap();
        let record = GridRecord::from_json(&json).unwrap();
        assert_eq!(record.version, RECORD_VERSION);
        assert_eq!(record, GridRecord::from_grid(&grid));

        let loaded = record.into_grid().unwrap();
        assert_eq!(loaded.id(), Some(7));
        assert!(loaded.is_labeled());
        assert_eq!(loaded.nodes(), grid.nodes());
        assert_eq!(loaded.mesh().len(), grid.mesh().len());
        assert_eq!(loaded.stamp(), grid.stamp());
    }

    #[test]
    fn legacy_record_is_migrated() {
        let json = r#"{
            "nodes": [[[0, 0, 0], [1, 0, 0]], [[0, 1, 0], null]],
            "norm": [0, 0, 2],
            "is_surface": false,
            "id": 4
        }"#;
        let grid = GridRecord::from_json(json).unwrap().into_grid().unwrap();
        assert!(grid.is_legacy());
        assert_eq!(grid.stamp(), None);
        assert_eq!(grid.id(), Some(4));
        assert_eq!(grid.nodes().valid_count(), 3);
        assert!((grid.normal().z - 1.0).abs() < 1e-12);
        assert!(grid.results().is_none());
    }

    #[test]
    fn legacy_false_marks_missing_node() {
        let json = r#"{
            "nodes": [[[0, 0, 0], [1, 0, 0]], [[0, 1, 0], false]],
            "norm": [0, 0, 1],
            "is_surface": false,
            "id": 4
        }"#;
        let grid = GridRecord::from_json(json).unwrap().into_grid().unwrap();
        assert!(grid.is_legacy());
        assert_eq!(grid.nodes().valid_count(), 3);
        assert_eq!(grid.nodes().get(1, 1), Some(&None));
    }

    #[test]
    fn mismatched_results_are_dropped() {
        let mut record = GridRecord::from_grid(&sample_grid());
        let mut results = sample_results();
        results.totals = Lattice::filled(2, 1, 1.0);
        record.results = Some(results);
        record.labeled = true;
        let grid = record.into_grid().unwrap();
        assert!(grid.results().is_none());
        assert!(!grid.is_labeled());
    }

    #[test]
    fn newer_version_rejected() {
        let mut record = GridRecord::from_grid(&sample_grid());
        record.version = RECORD_VERSION + 1;
        assert!(record.into_grid().is_err());
    }

    #[test]
    fn list_mixes_versions() {
        let current = GridRecord::from_grid(&sample_grid()).to_json().unwrap();
        let legacy = r#"{"nodes": [[[0,0,0],[1,0,0]],[[0,1,0],[1,1,0]]], "norm": [0,0,1], "is_surface": true}"#;
        let records = records_from_json(&format!("[{current}, {legacy}]")).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].legacy);
        assert!(records[1].legacy && records[1].curved);
    }
}
