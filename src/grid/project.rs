use std::fs;
use std::path::Path;

use slotmap::SlotMap;
use tracing::{debug, info, warn};

use crate::analysis::{
    AnalysisReport, AnalysisSchedule, GridBlock, ProgressCallback, ResultsFile, SolarModel,
    SolarSampler, SunModel,
};
use crate::color::{ColorConfig, Legend};
use crate::config::Settings;
use crate::error::{AnalysisError, PersistError, Result, SunHoursError, TopologyError};
use crate::fitting::{FitGrids, FitParams, FittedGrid};
use crate::operations::query::{SceneIndex, SurfaceGroup};
use crate::topology::{FaceId, Stamp, TopologyStore};

use super::record::{records_from_json, GridRecord};
use super::{Grid, GridKey, NodeLabel};

/// The state of one scene: its geometry, the grids fitted to it, the
/// counter handing out grid ids and the defaults in force.
///
/// Every mutating operation computes its outcome first and commits only
/// when nothing failed.
#[derive(Debug)]
pub struct Project {
    store: TopologyStore,
    grids: SlotMap<GridKey, Grid>,
    next_grid_id: u32,
    settings: Settings,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(TopologyStore::new(), Settings::default())
    }
}

impl Project {
    /// Creates a project over `store` with the given defaults.
    #[must_use]
    pub fn new(store: TopologyStore, settings: Settings) -> Self {
        Self {
            store,
            grids: SlotMap::with_key(),
            next_grid_id: 1,
            settings,
        }
    }

    #[must_use]
    pub fn store(&self) -> &TopologyStore {
        &self.store
    }

    /// Mutable access to the scene geometry. Grids are not updated when
    /// faces change; refit them afterwards.
    pub fn store_mut(&mut self) -> &mut TopologyStore {
        &mut self.store
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The id the next analysed grid will receive.
    #[must_use]
    pub fn next_grid_id(&self) -> u32 {
        self.next_grid_id
    }

    /// Returns the grid, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::GridNotFound`] for an unknown key.
    pub fn grid(&self, key: GridKey) -> Result<&Grid> {
        self.grids
            .get(key)
            .ok_or_else(|| AnalysisError::GridNotFound.into())
    }

    /// All grids.
    pub fn grids(&self) -> impl Iterator<Item = (GridKey, &Grid)> {
        self.grids.iter()
    }

    /// Keys of every grid, for selecting them all.
    #[must_use]
    pub fn select_all(&self) -> Vec<GridKey> {
        self.grids.keys().collect()
    }

    /// Keeps the known keys of `keys`, each once.
    fn resolve(&self, keys: &[GridKey]) -> Vec<GridKey> {
        let mut resolved: Vec<GridKey> = Vec::with_capacity(keys.len());
        for &key in keys {
            if self.grids.contains_key(key) && !resolved.contains(&key) {
                resolved.push(key);
            }
        }
        resolved
    }

    // --- Fitting ---

    /// Fits one grid per surface group of `selection`. Uses the default
    /// fit parameters unless `params` is given.
    ///
    /// # Errors
    ///
    /// Fails like [`FitGrids::execute`]; nothing is added on failure.
    pub fn fit_grids(
        &mut self,
        selection: &[FaceId],
        params: Option<&FitParams>,
    ) -> Result<Vec<GridKey>> {
        let params = params.unwrap_or(&self.settings.fit).clone();
        let fitted = FitGrids::new(selection.to_vec(), params).execute(&self.store)?;
        self.commit_fitted(fitted, &[])
    }

    /// Stamps the source faces of `fitted` and stores the grids in place of
    /// `replaced`. Nothing changes unless every source face still exists.
    fn commit_fitted(
        &mut self,
        fitted: Vec<(SurfaceGroup, FittedGrid)>,
        replaced: &[GridKey],
    ) -> Result<Vec<GridKey>> {
        let all_present = fitted
            .iter()
            .flat_map(|(group, _)| &group.faces)
            .all(|&face| self.store.contains_face(face));
        if !all_present {
            return Err(TopologyError::EntityNotFound("face".into()).into());
        }
        for &key in replaced {
            self.grids.remove(key);
        }
        let mut keys = Vec::with_capacity(fitted.len());
        for (group, grid) in fitted {
            let stamp = Stamp::new();
            for &face in &group.faces {
                self.store.set_stamp(face, stamp)?;
            }
            keys.push(self.grids.insert(Grid::from_fit(grid, stamp)));
        }
        info!(grids = keys.len(), "added grids");
        Ok(keys)
    }

    /// Fits the grids again from the faces they were made from, replacing
    /// them. Analysis results are lost.
    ///
    /// # Errors
    ///
    /// - [`SunHoursError::LegacyGrid`] if a grid has no stamp
    /// - [`AnalysisError::NoGrids`] if no key is known
    /// - [`crate::error::FitError::NoFaces`] if the source faces are gone
    pub fn refit(&mut self, keys: &[GridKey], params: Option<&FitParams>) -> Result<Vec<GridKey>> {
        let keys = self.resolve(keys);
        if keys.is_empty() {
            return Err(AnalysisError::NoGrids.into());
        }
        let mut faces = Vec::new();
        for &key in &keys {
            let stamp = self
                .grid(key)?
                .stamp()
                .ok_or(SunHoursError::LegacyGrid { missing: "stamp" })?;
            let source = self.store.faces_with_stamp(stamp);
            if source.is_empty() {
                warn!(?key, "source faces of grid are gone");
            }
            faces.extend(source);
        }
        let params = params.unwrap_or(&self.settings.fit).clone();
        let fitted = FitGrids::new(faces, params).execute(&self.store)?;
        self.commit_fitted(fitted, &keys)
    }

    /// Removes a grid.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::GridNotFound`] for an unknown key.
    pub fn delete_grid(&mut self, key: GridKey) -> Result<Grid> {
        self.grids
            .remove(key)
            .ok_or_else(|| AnalysisError::GridNotFound.into())
    }

    /// Removes every grid made by an older version. Returns how many went.
    pub fn delete_legacy_grids(&mut self) -> usize {
        let before = self.grids.len();
        self.grids.retain(|_, grid| !grid.is_legacy());
        let removed = before - self.grids.len();
        if removed > 0 {
            info!(removed, "deleted legacy grids");
        }
        removed
    }

    // --- Analysis ---

    /// Samples the sun hours of `keys` and commits the results to all of
    /// them together.
    ///
    /// Grids are never part of the scene; hidden faces are ignored. Each
    /// grid gets an id if it has none, loses its labels and is recolored.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::NoGrids`] if no key is known
    /// - [`AnalysisError::InvalidSchedule`] for an unusable schedule
    /// - [`AnalysisError::Cancelled`] if `progress` stopped the run
    pub fn analyse<M: SunModel>(
        &mut self,
        keys: &[GridKey],
        sun: &M,
        schedule: &AnalysisSchedule,
        progress: ProgressCallback<'_>,
    ) -> Result<AnalysisReport> {
        let keys = self.resolve(keys);
        if keys.is_empty() {
            return Err(AnalysisError::NoGrids.into());
        }
        let scene = SceneIndex::new(&self.store)?;
        let nodes = keys
            .iter()
            .map(|&key| self.grid(key).map(Grid::nodes))
            .collect::<Result<Vec<_>>>()?;
        let sampled = SolarSampler::new(&scene, sun, schedule).execute(&nodes, progress)?;

        let mut report = AnalysisReport {
            total_time: 0.0,
            total_days: 0,
            grids: Vec::with_capacity(keys.len()),
        };
        for (key, results) in keys.into_iter().zip(sampled) {
            let id = match self.grids[key].id() {
                Some(id) => id,
                None => {
                    let id = self.next_grid_id;
                    self.next_grid_id += 1;
                    id
                }
            };
            report.total_time = results.total_time;
            report.total_days = results.total_days;
            report.grids.push(GridBlock {
                id,
                totals: results.totals.clone(),
                minimums: results.minimums.clone().filter(|_| schedule.export_minimums),
                maximums: results.maximums.clone().filter(|_| schedule.export_maximums),
            });
            let grid = &mut self.grids[key];
            grid.commit_results(id, results);
            grid.recolor(&self.settings.color);
            debug!(id, "committed results");
        }
        Ok(report)
    }

    /// [`Project::analyse`] with the default schedule and the built-in sun
    /// model at the default location.
    ///
    /// # Errors
    ///
    /// Fails like [`Project::analyse`].
    pub fn analyse_with_defaults(
        &mut self,
        keys: &[GridKey],
        progress: ProgressCallback<'_>,
    ) -> Result<AnalysisReport> {
        let sun = SolarModel::new(self.settings.location);
        let schedule = self.settings.schedule.clone();
        self.analyse(keys, &sun, &schedule, progress)
    }

    /// Fits grids with the indoor-environment-quality parameters and
    /// analyses them over the indoor-environment-quality schedule.
    ///
    /// # Errors
    ///
    /// Fails like [`Project::fit_grids`] or [`Project::analyse`]. If the
    /// analysis fails the fitted grids stay in the project.
    pub fn ieq_wizard(
        &mut self,
        selection: &[FaceId],
        progress: ProgressCallback<'_>,
    ) -> Result<(Vec<GridKey>, AnalysisReport)> {
        let keys = self.fit_grids(selection, Some(&FitParams::default()))?;
        let sun = SolarModel::new(self.settings.location);
        let report = self.analyse(&keys, &sun, &AnalysisSchedule::default(), progress)?;
        Ok((keys, report))
    }

    // --- Import ---

    /// Ids of the blocks of `file` that fit the grid. Blocks that do not
    /// fit are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::GridNotFound`] for an unknown key.
    pub fn matching_blocks(&self, key: GridKey, file: &ResultsFile) -> Result<Vec<u32>> {
        let nodes = self.grid(key)?.nodes();
        let mut ids = Vec::new();
        for block in &file.blocks {
            if block.matches(nodes) {
                ids.push(block.id);
            } else {
                warn!(id = block.id, "block does not match the grid; skipped");
            }
        }
        Ok(ids)
    }

    /// Loads the results of one block of `file` into a grid. With several
    /// matching blocks, `id` picks one.
    ///
    /// The grid takes the block's id, is recolored, and is relabeled if it
    /// was labeled. Returns the imported id.
    ///
    /// # Errors
    ///
    /// - [`PersistError::NoMatchingBlock`] if no block fits
    /// - [`PersistError::ImportMismatch`] if `id` names a block that does
    ///   not fit
    /// - [`PersistError::AmbiguousImport`] if several blocks fit and `id`
    ///   is `None`
    pub fn import_analysis(
        &mut self,
        key: GridKey,
        file: &ResultsFile,
        id: Option<u32>,
    ) -> Result<u32> {
        let matching = self.matching_blocks(key, file)?;
        let chosen = match (id, matching.as_slice()) {
            (_, []) => return Err(PersistError::NoMatchingBlock.into()),
            (Some(id), ids) if ids.contains(&id) => id,
            (Some(id), _) => return Err(PersistError::ImportMismatch { id }.into()),
            (None, [only]) => *only,
            (None, ids) => return Err(PersistError::AmbiguousImport { ids: ids.to_vec() }.into()),
        };
        let block = file
            .blocks
            .iter()
            .find(|b| b.id == chosen)
            .ok_or(PersistError::NoMatchingBlock)?;
        let results = block.to_results(file.total_time, file.total_days);

        let grid = &mut self.grids[key];
        let was_labeled = grid.is_labeled();
        grid.commit_results(chosen, results);
        grid.recolor(&self.settings.color);
        grid.set_labeled(was_labeled);
        self.next_grid_id = self.next_grid_id.max(chosen.saturating_add(1));
        info!(id = chosen, "imported analysis");
        Ok(chosen)
    }

    // --- Color and labels ---

    /// Colors the grids again from their results. Returns the number of
    /// colored cells.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NoGrids`] if no key is known.
    pub fn recolor(&mut self, keys: &[GridKey]) -> Result<usize> {
        let keys = self.resolve(keys);
        if keys.is_empty() {
            return Err(AnalysisError::NoGrids.into());
        }
        Ok(keys
            .into_iter()
            .map(|key| self.grids[key].recolor(&self.settings.color))
            .sum())
    }

    /// Gives the grids their own color scale and recolors them.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::InvalidColors`] for an unusable scale
    /// - [`SunHoursError::LegacyGrid`] if a grid lacks results
    pub fn set_grid_colors(&mut self, keys: &[GridKey], colors: &ColorConfig) -> Result<()> {
        colors.validate()?;
        let keys = self.resolve(keys);
        for &key in &keys {
            let grid = &self.grids[key];
            if grid.is_legacy() {
                grid.require_results()?;
            }
        }
        for key in keys {
            let grid = &mut self.grids[key];
            grid.set_colors(colors.clone());
            grid.recolor(&self.settings.color);
        }
        Ok(())
    }

    /// The color scale legend of a grid.
    ///
    /// # Errors
    ///
    /// Fails like [`Grid::legend`].
    pub fn legend(&self, key: GridKey) -> Result<Legend> {
        self.grid(key)?.legend(&self.settings.color)
    }

    /// Shows result values at the nodes of the grids and returns the
    /// labels.
    ///
    /// # Errors
    ///
    /// Fails like [`Grid::labels`] if any grid lacks results; no grid is
    /// labeled then.
    pub fn add_labels(&mut self, keys: &[GridKey]) -> Result<Vec<NodeLabel>> {
        let keys = self.resolve(keys);
        let mut labels = Vec::new();
        for &key in &keys {
            labels.extend(self.grid(key)?.labels()?);
        }
        for key in keys {
            self.grids[key].set_labeled(true);
        }
        Ok(labels)
    }

    /// Hides the result values of the grids.
    pub fn remove_labels(&mut self, keys: &[GridKey]) {
        for key in self.resolve(keys) {
            self.grids[key].set_labeled(false);
        }
    }

    // --- Defaults ---

    /// Makes `params` the default for later fits.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FitError::InvalidParameters`] for unusable
    /// parameters.
    pub fn set_default_fit(&mut self, params: FitParams) -> Result<()> {
        params.validate()?;
        self.settings.fit = params;
        Ok(())
    }

    /// Makes `schedule` the default for later analyses.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidSchedule`] for an unusable schedule.
    pub fn set_default_schedule(&mut self, schedule: AnalysisSchedule) -> Result<()> {
        schedule.validate()?;
        self.settings.schedule = schedule;
        Ok(())
    }

    /// Makes `colors` the scale adopted by grids without their own.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidColors`] for an unusable scale.
    pub fn set_default_colors(&mut self, colors: ColorConfig) -> Result<()> {
        colors.validate()?;
        self.settings.color = colors;
        Ok(())
    }

    /// Replaces every default at once.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the first unusable section.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    // --- Persistence ---

    /// Writes every grid to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] or [`PersistError::Json`].
    pub fn save_grids(&self, path: &Path) -> Result<()> {
        let records: Vec<GridRecord> = self.grids.values().map(GridRecord::from_grid).collect();
        let text = serde_json::to_string_pretty(&records).map_err(PersistError::from)?;
        fs::write(path, text).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(grids = records.len(), path = %path.display(), "saved grids");
        Ok(())
    }

    /// Adds the grids stored in a JSON file, migrating legacy records.
    /// Grids with results are colored. Returns the new keys.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`], [`PersistError::Json`] or
    /// [`PersistError::Malformed`]; nothing is added on failure.
    pub fn load_grids(&mut self, path: &Path) -> Result<Vec<GridKey>> {
        let text = fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let grids = records_from_json(&text)?
            .into_iter()
            .map(GridRecord::into_grid)
            .collect::<Result<Vec<_>>>()?;
        let mut keys = Vec::with_capacity(grids.len());
        for mut grid in grids {
            if let Some(id) = grid.id() {
                self.next_grid_id = self.next_grid_id.max(id.saturating_add(1));
            }
            if grid.results().is_some() {
                grid.recolor(&self.settings.color);
            }
            keys.push(self.grids.insert(grid));
        }
        info!(grids = keys.len(), "loaded grids");
        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::analysis::{
        keep_going, DateRange, DayMonth, DayType, FixedSun, TimeOfDay, TimeWindow,
    };
    use crate::error::FitError;
    use crate::fitting::DensitySpec;
    use crate::math::{Point3, Vector3};
    use crate::operations::creation::MakeFace;

    /// Shows `warn!` and above, or whatever `RUST_LOG` asks for.
    fn init_logging() {
        let env_filter = tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    }

    fn floor(store: &mut TopologyStore) -> FaceId {
        MakeFace::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ])
        .execute(store)
        .unwrap()
    }

    fn params() -> FitParams {
        FitParams {
            density: DensitySpec::CellsOnShortSide(2),
            standoff: 0.5,
            erosion: None,
            offset: 0.0,
        }
    }

    fn one_hour() -> AnalysisSchedule {
        AnalysisSchedule {
            date_ranges: vec![DateRange::new(DayMonth::new(5, 1), DayMonth::new(5, 1))],
            day_types: vec![DayType {
                windows: vec![TimeWindow::new(TimeOfDay::new(10, 0), TimeOfDay::new(11, 0))],
                weekdays: [true; 7],
            }],
            time_step_secs: 3600,
            export_minimums: true,
            export_maximums: false,
        }
    }

    fn project_with_grid() -> (Project, FaceId, GridKey) {
        init_logging();
        let mut project = Project::default();
        let face = floor(project.store_mut());
        let keys = project.fit_grids(&[face], Some(&params())).unwrap();
        (project, face, keys[0])
    }

    fn analysed() -> (Project, GridKey, AnalysisReport) {
        let (mut project, _, key) = project_with_grid();
        let sun = FixedSun::new(Vector3::z());
        let report = project.analyse(&[key], &sun, &one_hour(), &mut keep_going).unwrap();
        (project, key, report)
    }

    #[test]
    fn fitting_stamps_source_faces() {
        let (project, face, key) = project_with_grid();
        let stamp = project.grid(key).unwrap().stamp().unwrap();
        assert_eq!(project.store().faces_with_stamp(stamp), vec![face]);
        assert_eq!(project.grid(key).unwrap().nodes().valid_count(), 9);
    }

    #[test]
    fn empty_selection_fits_nothing() {
        let mut project = Project::default();
        let err = project.fit_grids(&[], None).unwrap_err();
        assert!(matches!(err, SunHoursError::Fit(FitError::NoFaces)));
        assert_eq!(project.grids().count(), 0);
    }

    #[test]
    fn refit_keeps_dimensions_and_validity() {
        let (mut project, _, key) = project_with_grid();
        let before = project.grid(key).unwrap().nodes().validity();
        let keys = project.refit(&[key], Some(&params())).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(project.grid(key).is_err());
        assert_eq!(project.grid(keys[0]).unwrap().nodes().validity(), before);
    }

    #[test]
    fn fit_for_removed_face_commits_nothing() {
        init_logging();
        let mut project = Project::default();
        let kept = floor(project.store_mut());
        let gone = MakeFace::new(vec![
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(4.0, 0.0, 5.0),
            Point3::new(4.0, 4.0, 5.0),
            Point3::new(0.0, 4.0, 5.0),
        ])
        .execute(project.store_mut())
        .unwrap();
        let fitted = FitGrids::new(vec![kept, gone], params())
            .execute(project.store())
            .unwrap();
        assert_eq!(fitted.len(), 2);
        project.store_mut().remove_face(gone).unwrap();

        let err = project.commit_fitted(fitted, &[]).unwrap_err();
        assert!(matches!(
            err,
            SunHoursError::Topology(TopologyError::EntityNotFound(_))
        ));
        assert_eq!(project.grids().count(), 0);
        assert_eq!(project.store().face(kept).unwrap().stamp, None);
    }

    #[test]
    fn analysis_commits_ids_results_and_colors() {
        let (project, key, report) = analysed();
        let grid = project.grid(key).unwrap();
        assert_eq!(grid.id(), Some(1));
        assert_eq!(project.next_grid_id(), 2);
        let results = grid.results().unwrap();
        assert_relative_eq!(results.total_time, 1.0);
        assert_relative_eq!(*results.totals.get(1, 1).unwrap(), 1.0);
        assert!(grid.mesh().faces().iter().all(|c| c.color.is_some()));
        assert_eq!(report.grids.len(), 1);
        assert!(report.grids[0].minimums.is_some());
        assert!(report.grids[0].maximums.is_none());
    }

    #[test]
    fn grids_do_not_shade_each_other() {
        let (mut project, face, key) = project_with_grid();
        let other = project.fit_grids(&[face], Some(&params())).unwrap()[0];
        let sun = FixedSun::new(Vector3::z());
        project
            .analyse(&[key, other], &sun, &one_hour(), &mut keep_going)
            .unwrap();
        assert_eq!(project.grid(other).unwrap().id(), Some(2));
        let totals = &project.grid(key).unwrap().results().unwrap().totals;
        assert_relative_eq!(*totals.get(0, 0).unwrap(), 1.0);
    }

    #[test]
    fn analysing_nothing_is_an_error() {
        let mut project = Project::default();
        let sun = FixedSun::new(Vector3::z());
        let err = project
            .analyse(&[], &sun, &one_hour(), &mut keep_going)
            .unwrap_err();
        assert!(matches!(err, SunHoursError::Analysis(AnalysisError::NoGrids)));
    }

    #[test]
    fn cancelled_analysis_changes_nothing() {
        let (mut project, _, key) = project_with_grid();
        let sun = FixedSun::new(Vector3::z());
        let err = project
            .analyse(&[key], &sun, &one_hour(), &mut |_| false)
            .unwrap_err();
        assert!(matches!(err, SunHoursError::Analysis(AnalysisError::Cancelled)));
        assert!(project.grid(key).unwrap().results().is_none());
        assert_eq!(project.next_grid_id(), 1);
    }

    #[test]
    fn export_then_import_restores_totals() {
        let (project, key, report) = analysed();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        report.write_csv(&path).unwrap();

        let file = ResultsFile::read(&path).unwrap();
        let mut other = Project::default();
        let other_face = floor(other.store_mut());
        let target = other.fit_grids(&[other_face], Some(&params())).unwrap()[0];
        assert_eq!(other.matching_blocks(target, &file).unwrap(), vec![1]);
        assert_eq!(other.import_analysis(target, &file, None).unwrap(), 1);
        assert_eq!(
            other.grid(target).unwrap().results().unwrap().totals,
            project.grid(key).unwrap().results().unwrap().totals
        );
        assert_eq!(other.next_grid_id(), 2);
    }

    #[test]
    fn import_rejects_a_different_lattice() {
        let (_, _, report) = analysed();
        let file = report.results_file();
        let mut project = Project::default();
        let face = floor(project.store_mut());
        let coarse = FitParams {
            density: DensitySpec::CellsOnShortSide(3),
            ..params()
        };
        let key = project.fit_grids(&[face], Some(&coarse)).unwrap()[0];
        let err = project.import_analysis(key, &file, None).unwrap_err();
        assert!(matches!(err, SunHoursError::Persist(PersistError::NoMatchingBlock)));
    }

    #[test]
    fn import_keeps_labels() {
        let (mut project, key, report) = analysed();
        project.add_labels(&[key]).unwrap();
        let mut file = report.results_file();
        let mut second = file.blocks[0].clone();
        second.id = 9;
        file.blocks.push(second);
        assert!(matches!(
            project.import_analysis(key, &file, None),
            Err(SunHoursError::Persist(PersistError::AmbiguousImport { .. }))
        ));
        assert_eq!(project.import_analysis(key, &file, Some(9)).unwrap(), 9);
        let grid = project.grid(key).unwrap();
        assert!(grid.is_labeled());
        assert_eq!(grid.id(), Some(9));
        assert!(grid.results().unwrap().maximums.is_none());
    }

    #[test]
    fn labels_need_analysis() {
        let (mut project, _, key) = project_with_grid();
        assert!(project.add_labels(&[key]).is_err());
        assert!(!project.grid(key).unwrap().is_labeled());
    }

    #[test]
    fn labels_cover_valid_nodes() {
        let (mut project, key, _) = analysed();
        let labels = project.add_labels(&[key]).unwrap();
        assert_eq!(labels.len(), 9);
        assert!(labels.iter().all(|l| l.text == "1.0"));
        project.remove_labels(&[key]);
        assert!(!project.grid(key).unwrap().is_labeled());
    }

    #[test]
    fn legacy_grids_need_remedy() {
        let (mut project, _, _) = project_with_grid();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grids.json");
        fs::write(
            &path,
            r#"[{"nodes": [[[0,0,0],[1,0,0]],[[0,1,0],[1,1,0]]], "norm": [0,0,1], "is_surface": false, "id": 5}]"#,
        )
        .unwrap();
        let legacy = project.load_grids(&path).unwrap()[0];
        assert_eq!(project.next_grid_id(), 6);
        assert!(matches!(
            project.refit(&[legacy], None),
            Err(SunHoursError::LegacyGrid { .. })
        ));
        assert!(matches!(
            project.legend(legacy),
            Err(SunHoursError::LegacyGrid { .. })
        ));
        assert_eq!(project.delete_legacy_grids(), 1);
        assert_eq!(project.grids().count(), 1);
    }

    #[test]
    fn saved_grids_load_back() {
        let (project, key, _) = analysed();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grids.json");
        project.save_grids(&path).unwrap();

        let mut restored = Project::default();
        let keys = restored.load_grids(&path).unwrap();
        let grid = restored.grid(keys[0]).unwrap();
        let original = project.grid(key).unwrap();
        assert_eq!(grid.nodes(), original.nodes());
        assert_eq!(grid.results(), original.results());
        assert_eq!(grid.mesh(), original.mesh());
        assert_eq!(restored.next_grid_id(), 2);
    }

    #[test]
    fn grid_colors_override_defaults() {
        let (mut project, key, _) = analysed();
        let colors = ColorConfig {
            high: 100.0,
            ..ColorConfig::default()
        };
        project.set_grid_colors(&[key], &colors).unwrap();
        let grid = project.grid(key).unwrap();
        assert_eq!(grid.colors(), Some(&colors));
        // Every node saw the full hour: the top of the scale.
        assert_eq!(grid.mesh().faces()[0].color, Some(colors.stops[2]));
        let legend = project.legend(key).unwrap();
        assert_relative_eq!(legend.above.hours, 1.0);
    }

    #[test]
    fn defaults_are_validated() {
        let mut project = Project::default();
        let bad = FitParams {
            offset: -2.0,
            ..FitParams::default()
        };
        assert!(project.set_default_fit(bad).is_err());
        let mut schedule = AnalysisSchedule::default();
        schedule.time_step_secs = 7200;
        project.set_default_schedule(schedule.clone()).unwrap();
        assert_eq!(project.settings().schedule, schedule);
    }

    #[test]
    fn ieq_wizard_fits_and_analyses() {
        init_logging();
        let mut project = Project::default();
        let face = MakeFace::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(8.0, 0.0, 0.0),
            Point3::new(8.0, 6.0, 0.0),
            Point3::new(0.0, 6.0, 0.0),
        ])
        .execute(project.store_mut())
        .unwrap();
        let (keys, report) = project.ieq_wizard(&[face], &mut keep_going).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(report.total_days > 250);
        assert!(report.total_time > 0.0);
        // An open floor under an open sky sees every available hour.
        let results = project.grid(keys[0]).unwrap().results().unwrap();
        let (x, y, _) = project
            .grid(keys[0])
            .unwrap()
            .nodes()
            .iter()
            .find(|(_, _, n)| n.is_some())
            .unwrap();
        assert_relative_eq!(
            *results.totals.get(x, y).unwrap(),
            report.total_time,
            max_relative = 1e-9
        );
    }
}
