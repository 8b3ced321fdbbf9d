//! Fitted grids, their analysis results and their persisted form.

pub mod project;
pub mod record;

pub use project::Project;
pub use record::{GridRecord, RECORD_VERSION};

use crate::analysis::GridResults;
use crate::color::{ColorConfig, GradeMesh, Legend};
use crate::error::{AnalysisError, Result, SunHoursError};
use crate::fitting::{FittedGrid, GridMesh, MeshEmitter, NodeLattice};
use crate::math::{Point3, Vector3};
use crate::topology::Stamp;

slotmap::new_key_type! {
    /// Unique identifier for a grid in a project.
    pub struct GridKey;
}

/// Labels sit this far off the grid along its normal.
pub const LABEL_LIFT: f64 = 0.2;

/// A result value shown next to its node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLabel {
    pub position: Point3,
    pub text: String,
}

/// A sampling lattice fitted to a surface, with its mesh and analysis
/// state.
#[derive(Debug, Clone)]
pub struct Grid {
    nodes: NodeLattice,
    normal: Vector3,
    curved: bool,
    stamp: Option<Stamp>,
    id: Option<u32>,
    results: Option<GridResults>,
    colors: Option<ColorConfig>,
    labeled: bool,
    legacy: bool,
    mesh: GridMesh,
}

impl Grid {
    /// A fresh grid from a fit, tied to its source faces by `stamp`.
    #[must_use]
    pub fn from_fit(fitted: FittedGrid, stamp: Stamp) -> Self {
        Self {
            nodes: fitted.nodes,
            normal: fitted.normal,
            curved: fitted.curved,
            stamp: Some(stamp),
            id: None,
            results: None,
            colors: None,
            labeled: false,
            legacy: false,
            mesh: fitted.mesh,
        }
    }

    /// Rebuilds a grid from stored parts. The mesh is emitted again from
    /// the nodes.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        nodes: NodeLattice,
        normal: Vector3,
        curved: bool,
        stamp: Option<Stamp>,
        id: Option<u32>,
        results: Option<GridResults>,
        colors: Option<ColorConfig>,
        labeled: bool,
        legacy: bool,
    ) -> Self {
        let mesh = MeshEmitter::new(curved).execute(&nodes);
        Self {
            nodes,
            normal,
            curved,
            stamp,
            id,
            results,
            colors,
            labeled,
            legacy,
            mesh,
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &NodeLattice {
        &self.nodes
    }

    /// Upward-facing unit normal.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    #[must_use]
    pub fn is_curved(&self) -> bool {
        self.curved
    }

    #[must_use]
    pub fn stamp(&self) -> Option<Stamp> {
        self.stamp
    }

    /// Identifier written to results files, assigned on first analysis.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    #[must_use]
    pub fn results(&self) -> Option<&GridResults> {
        self.results.as_ref()
    }

    /// The grid's own color scale, once it has been colored.
    #[must_use]
    pub fn colors(&self) -> Option<&ColorConfig> {
        self.colors.as_ref()
    }

    #[must_use]
    pub fn is_labeled(&self) -> bool {
        self.labeled
    }

    /// `true` for grids made by an older version, which lack a stamp and
    /// results.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    #[must_use]
    pub fn mesh(&self) -> &GridMesh {
        &self.mesh
    }

    /// The results, or the error explaining why there are none.
    ///
    /// # Errors
    ///
    /// Returns [`SunHoursError::LegacyGrid`] for a legacy grid and
    /// [`AnalysisError::NoResults`] for one never analysed.
    pub fn require_results(&self) -> Result<&GridResults> {
        match (&self.results, self.legacy) {
            (Some(results), _) => Ok(results),
            (None, true) => Err(SunHoursError::LegacyGrid { missing: "results" }),
            (None, false) => Err(AnalysisError::NoResults.into()),
        }
    }

    /// One label per valid node, showing its summed hours.
    ///
    /// # Errors
    ///
    /// Fails like [`Grid::require_results`].
    pub fn labels(&self) -> Result<Vec<NodeLabel>> {
        let results = self.require_results()?;
        let lift = self.normal * LABEL_LIFT;
        Ok(self
            .nodes
            .iter()
            .filter_map(|(x, y, node)| {
                let position = (*node)? + lift;
                let value = results.totals.get(x, y)?;
                Some(NodeLabel {
                    position,
                    text: format!("{value:.1}"),
                })
            })
            .collect())
    }

    /// The color scale legend.
    ///
    /// # Errors
    ///
    /// Fails like [`Grid::require_results`].
    pub fn legend(&self, defaults: &ColorConfig) -> Result<Legend> {
        let results = self.require_results()?;
        let colors = self.colors.as_ref().unwrap_or(defaults);
        Ok(colors.legend(results.total_time))
    }

    /// Colors the mesh from the results, adopting `defaults` if the grid
    /// has no scale of its own. Without results every cell is cleared.
    /// Returns the number of colored cells.
    pub(crate) fn recolor(&mut self, defaults: &ColorConfig) -> usize {
        let colors = self.colors.get_or_insert_with(|| defaults.clone());
        match &self.results {
            Some(results) => {
                GradeMesh::new(colors, results.total_time).execute(&mut self.mesh, &results.totals)
            }
            None => {
                for cell in self.mesh.faces_mut() {
                    cell.color = None;
                }
                0
            }
        }
    }

    pub(crate) fn set_colors(&mut self, colors: ColorConfig) {
        self.colors = Some(colors);
    }

    /// Stores fresh results: labels are dropped and the grid stops being
    /// legacy.
    pub(crate) fn commit_results(&mut self, id: u32, results: GridResults) {
        self.id = Some(id);
        self.results = Some(results);
        self.labeled = false;
        self.legacy = false;
    }

    pub(crate) fn set_labeled(&mut self, labeled: bool) {
        self.labeled = labeled;
    }
}
