use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::fitting::{Lattice, NodeLattice};
use crate::math::Vector3;
use crate::operations::query::Scene;

use super::progress::{Progress, ProgressCallback};
use super::schedule::AnalysisSchedule;
use super::sun::SunModel;
use super::{GridResults, INVALID_VALUE};

/// One sampling instant: where the sun is and how many hours the sample
/// stands for.
struct Sample {
    sun: Vector3,
    hours: f64,
}

/// The instants of one scheduled day.
struct PlannedDay {
    date: NaiveDate,
    samples: Vec<Sample>,
}

/// Days, daylight-clipped windows and sample instants of a schedule,
/// shared by every grid of a run.
struct Plan {
    days: Vec<PlannedDay>,
    total_time: f64,
}

/// Accumulates hours of direct sun per lattice node by casting a ray
/// toward the sun at every scheduled instant.
pub struct SolarSampler<'a, S, M> {
    scene: &'a S,
    sun: &'a M,
    schedule: &'a AnalysisSchedule,
}

impl<'a, S: Scene, M: SunModel> SolarSampler<'a, S, M> {
    /// Creates a new `SolarSampler`.
    #[must_use]
    pub fn new(scene: &'a S, sun: &'a M, schedule: &'a AnalysisSchedule) -> Self {
        Self {
            scene,
            sun,
            schedule,
        }
    }

    /// Samples every grid in turn.
    ///
    /// `progress` is called once per processed day and grid; returning
    /// `false` stops the run before the next day.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::InvalidSchedule`] for an unusable schedule
    /// - [`AnalysisError::Cancelled`] if the callback asked to stop
    pub fn execute(
        &self,
        grids: &[&NodeLattice],
        progress: ProgressCallback<'_>,
    ) -> Result<Vec<GridResults>> {
        self.schedule.validate()?;
        let plan = self.plan();
        let total_days = u32::try_from(plan.days.len()).unwrap_or(u32::MAX);
        let steps = (plan.days.len() * grids.len()) as u64;

        let mut done = 0u64;
        let mut results = Vec::with_capacity(grids.len());
        for (index, nodes) in grids.iter().enumerate() {
            let suffix = if grids.len() > 1 {
                format!(" for grid {} out of {}", index + 1, grids.len())
            } else {
                String::new()
            };
            let mut sampled = self.sample_grid(nodes, &plan, |date| {
                done += 1;
                let message = format!("Just analysed: {}{suffix}", date.format("%d %b"));
                progress(&Progress::new(done, steps, message))
            })?;
            sampled.total_days = total_days;
            debug!(grid = index + 1, nodes = nodes.valid_count(), "sampled grid");
            results.push(sampled);
        }
        info!(
            grids = grids.len(),
            days = total_days,
            total_time = plan.total_time,
            "analysis complete"
        );
        Ok(results)
    }

    fn plan(&self) -> Plan {
        let step = f64::from(self.schedule.time_step_secs);
        let mut days = Vec::new();
        let mut total_time = 0.0;
        for date in self.schedule.dates() {
            let Some(day_type) = self.schedule.day_type_for(date) else {
                continue;
            };
            let daylight = self.sun.daylight(date);
            let mut samples = Vec::new();
            for window in &day_type.windows {
                let start = f64::from(window.start.seconds()).max(daylight.sunrise);
                let end = f64::from(window.end.seconds()).min(daylight.sunset);
                total_time += (end - start).max(0.0) / 3600.0;
                let mut t = start;
                while t < end {
                    samples.push(Sample {
                        sun: self.sun.direction(date, t),
                        hours: step.min(end - t) / 3600.0,
                    });
                    t += step;
                }
            }
            days.push(PlannedDay { date, samples });
        }
        Plan { days, total_time }
    }

    fn sample_grid(
        &self,
        nodes: &NodeLattice,
        plan: &Plan,
        mut on_day: impl FnMut(NaiveDate) -> bool,
    ) -> Result<GridResults> {
        let mut totals = nodes.map(|_| 0.0);
        let mut minimums = nodes.map(|_| f64::INFINITY);
        let mut maximums = nodes.map(|_| 0.0);
        let mut day = nodes.map(|_| 0.0);

        for planned in &plan.days {
            for (x, y, node) in nodes.iter() {
                let Some(point) = node else {
                    continue;
                };
                let hours: f64 = planned
                    .samples
                    .iter()
                    .filter(|s| self.scene.raytest(point, &s.sun).is_none())
                    .map(|s| s.hours)
                    .sum();
                if let Some(cell) = day.get_mut(x, y) {
                    *cell = hours;
                }
            }
            for (x, y, &hours) in day.iter() {
                if let Some(v) = totals.get_mut(x, y) {
                    *v += hours;
                }
                if let Some(v) = maximums.get_mut(x, y) {
                    *v = f64::max(*v, hours);
                }
                if let Some(v) = minimums.get_mut(x, y) {
                    *v = f64::min(*v, hours);
                }
            }
            if !on_day(planned.date) {
                return Err(AnalysisError::Cancelled.into());
            }
        }

        let finish = |lattice: &Lattice<f64>| {
            Lattice::from_fn(nodes.nx(), nodes.ny(), |x, y| {
                if !nodes.is_valid(x, y) {
                    return INVALID_VALUE;
                }
                lattice
                    .get(x, y)
                    .copied()
                    .filter(|v| v.is_finite())
                    .unwrap_or(0.0)
            })
        };
        Ok(GridResults {
            totals: finish(&totals),
            minimums: Some(finish(&minimums)),
            maximums: Some(finish(&maximums)),
            total_time: plan.total_time,
            total_days: 0,
        })
    }
}
