//! Sunlight-hours analysis: the schedule, the sun, the sampler and the
//! results file.

pub mod export;
pub mod progress;
pub mod sampler;
pub mod schedule;
pub mod sun;

pub use export::{AnalysisReport, GridBlock, ResultsFile};
pub use progress::{keep_going, Progress, ProgressCallback};
pub use sampler::SolarSampler;
pub use schedule::{
    AnalysisSchedule, DateRange, DayMonth, DayType, TimeOfDay, TimeWindow, REFERENCE_YEAR,
};
pub use sun::{Daylight, FixedSun, SiteLocation, SolarModel, SunModel};

use serde::{Deserialize, Serialize};

use crate::fitting::{Lattice, NodeLattice};

/// Value written for nodes that are not sampled.
pub const INVALID_VALUE: f64 = -1.0;

/// Hours of sun per node, with the schedule totals they were measured
/// against. Invalid nodes hold [`INVALID_VALUE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridResults {
    /// Hours summed over all days.
    pub totals: Lattice<f64>,
    /// Lowest single-day hours; absent when only totals were imported.
    pub minimums: Option<Lattice<f64>>,
    /// Highest single-day hours; absent when only totals were imported.
    pub maximums: Option<Lattice<f64>>,
    /// Available sun time in hours.
    pub total_time: f64,
    /// Number of days processed.
    pub total_days: u32,
}

impl GridResults {
    /// `true` if every lattice has the shape of `nodes` and marks exactly
    /// its invalid nodes.
    #[must_use]
    pub fn fits(&self, nodes: &NodeLattice) -> bool {
        std::iter::once(&self.totals)
            .chain(self.minimums.as_ref())
            .chain(self.maximums.as_ref())
            .all(|lattice| pattern_matches(lattice, nodes))
    }
}

/// `true` if `values` has the shape of `nodes` and is negative exactly at
/// its invalid nodes.
#[must_use]
pub fn pattern_matches(values: &Lattice<f64>, nodes: &NodeLattice) -> bool {
    values.same_shape(nodes)
        && values
            .iter()
            .all(|(x, y, v)| (*v >= 0.0) == nodes.is_valid(x, y))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;

    #[test]
    fn pattern_follows_validity() {
        let mut nodes = Lattice::from_fn(1, 1, |_, _| Some(Point3::origin()));
        *nodes.get_mut(1, 1).unwrap() = None;
        let mut values = Lattice::filled(1, 1, 2.0);
        assert!(!pattern_matches(&values, &nodes));
        *values.get_mut(1, 1).unwrap() = INVALID_VALUE;
        assert!(pattern_matches(&values, &nodes));
        assert!(!pattern_matches(&Lattice::filled(2, 1, 2.0), &nodes));
    }
}
