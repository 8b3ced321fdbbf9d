use tracing::debug;

use crate::fitting::{GridMesh, Lattice};

use super::{ColorBasis, ColorConfig};

/// Combines the corner values of one cell.
#[must_use]
pub fn reduce(values: &[f64], basis: ColorBasis) -> f64 {
    match basis {
        ColorBasis::Average => {
            if values.is_empty() {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let n = values.len() as f64;
                values.iter().sum::<f64>() / n
            }
        }
        ColorBasis::Minimum => values.iter().copied().fold(f64::INFINITY, f64::min),
        ColorBasis::Maximum => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// Colors every cell of a mesh from a lattice of summed hours.
///
/// A cell with an invalid corner keeps no color.
pub struct GradeMesh<'a> {
    config: &'a ColorConfig,
    total_time: f64,
}

impl<'a> GradeMesh<'a> {
    /// Creates a new `GradeMesh` operation. `total_time` is the available
    /// sun time in hours.
    #[must_use]
    pub fn new(config: &'a ColorConfig, total_time: f64) -> Self {
        Self { config, total_time }
    }

    /// Executes the grading in place, returning the number of colored cells.
    pub fn execute(&self, mesh: &mut GridMesh, totals: &Lattice<f64>) -> usize {
        let mut colored = 0;
        for cell in mesh.faces_mut() {
            let values: Option<Vec<f64>> = cell
                .corners
                .iter()
                .map(|&(x, y)| totals.get(x, y).copied().filter(|v| *v >= 0.0))
                .collect();
            cell.color = values.map(|values| {
                let value = reduce(&values, self.config.basis);
                let fraction = if self.total_time > 0.0 {
                    value / self.total_time
                } else {
                    0.0
                };
                colored += 1;
                self.config.color_for(fraction)
            });
        }
        debug!(colored, cells = mesh.len(), "graded mesh");
        colored
    }
}
