use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{PersistError, Result};
use crate::fitting::{Lattice, NodeLattice};

use super::{pattern_matches, GridResults};

const TOTAL_TIME_HEADER: &str = "Total time analysed in hours:";
const TOTAL_DAYS_HEADER: &str = "Total number of days:";
const GRID_HEADER: &str = "Grid ID:";
const TOTALS_HEADER: &str = "Totals:";
const MINIMUMS_HEADER: &str = "Minimums:";
const MAXIMUMS_HEADER: &str = "Maximums:";
const SEPARATOR: &str = ", ";

/// The results of one grid as written to a results file.
#[derive(Debug, Clone, PartialEq)]
pub struct GridBlock {
    pub id: u32,
    pub totals: Lattice<f64>,
    pub minimums: Option<Lattice<f64>>,
    pub maximums: Option<Lattice<f64>>,
}

impl GridBlock {
    /// `true` if the block's totals have the shape and validity pattern
    /// of `nodes`.
    #[must_use]
    pub fn matches(&self, nodes: &NodeLattice) -> bool {
        pattern_matches(&self.totals, nodes)
            && self.minimums.iter().all(|l| pattern_matches(l, nodes))
            && self.maximums.iter().all(|l| pattern_matches(l, nodes))
    }

    /// Results carrying this block's lattices and the file totals.
    #[must_use]
    pub fn to_results(&self, total_time: f64, total_days: u32) -> GridResults {
        GridResults {
            totals: self.totals.clone(),
            minimums: self.minimums.clone(),
            maximums: self.maximums.clone(),
            total_time,
            total_days,
        }
    }
}

/// A plain-text results file: schedule totals followed by one block per
/// grid.
///
/// Rows run from `y = 0` upwards; within a row, values run from `x = nx`
/// down to 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsFile {
    pub total_time: f64,
    pub total_days: u32,
    pub blocks: Vec<GridBlock>,
}

fn write_section(out: &mut String, lattice: &Lattice<f64>) {
    for row in lattice.rows() {
        let line: Vec<String> = row.iter().rev().map(ToString::to_string).collect();
        out.push_str(&line.join(SEPARATOR));
        out.push('\n');
    }
}

fn field<'t>(line: &'t str, header: &str) -> Option<&'t str> {
    line.strip_prefix(header)
        .map(|rest| rest.trim_start_matches(',').trim())
}

fn malformed(msg: impl Into<String>) -> PersistError {
    PersistError::Malformed(msg.into())
}

/// Reads rows from `lines` until a blank line or the end.
fn read_section<'t>(
    lines: &mut std::iter::Peekable<impl Iterator<Item = &'t str>>,
) -> Result<Lattice<f64>> {
    let mut rows = Vec::new();
    while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
        let mut row = line
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| malformed(format!("bad value in {line:?}: {e}")))?;
        row.reverse();
        rows.push(row);
    }
    Lattice::from_rows(rows).map_err(Into::into)
}

impl ResultsFile {
    /// Renders the file text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{TOTAL_TIME_HEADER}{SEPARATOR}{}\n", self.total_time));
        out.push_str(&format!("{TOTAL_DAYS_HEADER}{SEPARATOR}{}\n", self.total_days));
        for block in &self.blocks {
            out.push_str(&format!("\n{GRID_HEADER}{SEPARATOR}{}\n\n", block.id));
            out.push_str(&format!("{TOTALS_HEADER}\n\n"));
            write_section(&mut out, &block.totals);
            if let Some(minimums) = &block.minimums {
                out.push_str(&format!("\n{MINIMUMS_HEADER}\n\n"));
                write_section(&mut out, minimums);
            }
            if let Some(maximums) = &block.maximums {
                out.push_str(&format!("\n{MAXIMUMS_HEADER}\n\n"));
                write_section(&mut out, maximums);
            }
        }
        out
    }

    /// Parses file text.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Malformed`] for a missing header, a bad
    /// number or a ragged section.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().peekable();
        let total_time = lines
            .next()
            .and_then(|l| field(l, TOTAL_TIME_HEADER))
            .ok_or_else(|| malformed("missing total time"))?
            .parse::<f64>()
            .map_err(|e| malformed(format!("bad total time: {e}")))?;
        let total_days = match lines.peek().copied().and_then(|l| field(l, TOTAL_DAYS_HEADER)) {
            Some(days) => {
                let days = days
                    .parse::<u32>()
                    .map_err(|e| malformed(format!("bad day count: {e}")))?;
                lines.next();
                days
            }
            None => 0,
        };

        let mut blocks = Vec::new();
        while let Some(line) = lines.next() {
            let Some(id) = field(line, GRID_HEADER) else {
                continue;
            };
            let id = id
                .parse::<u32>()
                .map_err(|e| malformed(format!("bad grid id {id:?}: {e}")))?;
            let mut block = GridBlock {
                id,
                totals: Lattice::filled(1, 1, 0.0),
                minimums: None,
                maximums: None,
            };
            let mut has_totals = false;
            while let Some(header) = lines.next_if(|l| !l.starts_with(GRID_HEADER)) {
                let header = header.trim();
                let slot = match header {
                    TOTALS_HEADER => None,
                    MINIMUMS_HEADER => Some(&mut block.minimums),
                    MAXIMUMS_HEADER => Some(&mut block.maximums),
                    _ => continue,
                };
                while lines.next_if(|l| l.trim().is_empty()).is_some() {}
                let section = read_section(&mut lines)?;
                match slot {
                    Some(slot) => *slot = Some(section),
                    None => {
                        block.totals = section;
                        has_totals = true;
                    }
                }
            }
            if !has_totals {
                return Err(malformed(format!("grid {id} has no totals")).into());
            }
            blocks.push(block);
        }
        debug!(blocks = blocks.len(), "parsed results file");
        Ok(Self {
            total_time,
            total_days,
            blocks,
        })
    }

    /// Writes the file and makes it read-only. An existing read-only file
    /// is made writable first so it can be replaced.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let io = |source| PersistError::Io {
            path: path.display().to_string(),
            source,
        };
        if path.exists() {
            set_read_only(path, false).map_err(io)?;
        }
        fs::write(path, self.to_text()).map_err(io)?;
        set_read_only(path, true).map_err(io)?;
        info!(path = %path.display(), grids = self.blocks.len(), "wrote results file");
        Ok(())
    }

    /// Reads and parses a results file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] or [`PersistError::Malformed`].
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }
}

#[cfg(unix)]
fn set_read_only(path: &Path, read_only: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if read_only { 0o444 } else { 0o666 };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_read_only(path: &Path, read_only: bool) -> std::io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(read_only);
    fs::set_permissions(path, permissions)
}

/// Outcome of an analysis run, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Available sun time in hours.
    pub total_time: f64,
    pub total_days: u32,
    /// One block per analysed grid, in analysis order.
    pub grids: Vec<GridBlock>,
}

impl AnalysisReport {
    /// The report as a results file.
    #[must_use]
    pub fn results_file(&self) -> ResultsFile {
        ResultsFile {
            total_time: self.total_time,
            total_days: self.total_days,
            blocks: self.grids.clone(),
        }
    }

    /// Writes the report as a comma-separated results file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        self.results_file().write(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::Point3;

    fn block() -> GridBlock {
        GridBlock {
            id: 3,
            totals: Lattice::from_rows(vec![vec![1.5, 2.0, -1.0], vec![0.0, 4.25, 3.0]]).unwrap(),
            minimums: None,
            maximums: Some(
                Lattice::from_rows(vec![vec![1.0, 1.0, -1.0], vec![0.0, 1.0, 1.0]]).unwrap(),
            ),
        }
    }

    fn file() -> ResultsFile {
        ResultsFile {
            total_time: 12.5,
            total_days: 7,
            blocks: vec![block()],
        }
    }

    #[test]
    fn text_layout() {
        let text = file().to_text();
        let expected = "Total time analysed in hours:, 12.5\n\
                        Total number of days:, 7\n\
                        \n\
                        Grid ID:, 3\n\
                        \n\
                        Totals:\n\
                        \n\
                        -1, 2, 1.5\n\
                        3, 4.25, 0\n\
                        \n\
                        Maximums:\n\
                        \n\
                        -1, 1, 1\n\
                        1, 1, 0\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn parse_reads_back_blocks() {
        let parsed = ResultsFile::parse(&file().to_text()).unwrap();
        assert_eq!(parsed, file());
    }

    #[test]
    fn parse_accepts_float_formatting_of_other_writers() {
        let text = "Total time analysed in hours:, 3.0\n\
                    Total number of days:, 1\n\
                    \n\
                    Grid ID:, 1\n\
                    \n\
                    Totals:\n\
                    \n\
                    1.0, 2.0\n\
                    -1.0, 0.5\n";
        let parsed = ResultsFile::parse(text).unwrap();
        assert_eq!(parsed.blocks[0].totals.get(1, 0), Some(&1.0));
        assert_eq!(parsed.blocks[0].totals.get(1, 1), Some(&-1.0));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ResultsFile::parse("hello").is_err());
        let text = "Total time analysed in hours:, 1\n\nGrid ID:, 1\n\nTotals:\n\n1, x\n1, 1\n";
        assert!(ResultsFile::parse(text).is_err());
    }

    #[test]
    fn block_matches_validity_pattern() {
        let nodes =
            Lattice::from_fn(2, 1, |x, y| (x, y) != (2, 0)).map(|valid| valid.then(Point3::origin));
        assert!(block().matches(&nodes));
        let all_valid = nodes.map(|_| Some(Point3::origin()));
        assert!(!block().matches(&all_valid));
    }

    #[test]
    fn write_replaces_read_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        file().write(&path).unwrap();
        assert!(fs::metadata(&path).unwrap().permissions().readonly());

        let mut second = file();
        second.total_time = 99.0;
        second.write(&path).unwrap();
        assert_relative_eq!(ResultsFile::read(&path).unwrap().total_time, 99.0);
    }
}
