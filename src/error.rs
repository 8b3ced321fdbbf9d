use thiserror::Error;

/// Top-level error type for grid fitting and sunlight analysis.
#[derive(Debug, Error)]
pub enum SunHoursError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The grid was produced by an older fitting scheme and lacks the
    /// fields this operation needs.
    #[error("grid was created by an older version and lacks {missing}")]
    LegacyGrid { missing: &'static str },
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to topological operations.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),
}

/// Errors related to kernel operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised while fitting grids to faces.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("no face found in selection")]
    NoFaces,

    #[error("invalid fit parameters: {0}")]
    InvalidParameters(String),

    #[error("no grids were produced")]
    NothingFitted,
}

/// Errors raised by the sunlight analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no grid found in selection")]
    NoGrids,

    #[error("grid not found")]
    GridNotFound,

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("grid has no analysis results")]
    NoResults,

    #[error("invalid color scale: {0}")]
    InvalidColors(String),
}

/// Errors raised while saving, loading, exporting or importing state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed results file: {0}")]
    Malformed(String),

    #[error("imported block for grid {id} does not match the grid lattice")]
    ImportMismatch { id: u32 },

    #[error("the grid does not match any grid in the file")]
    NoMatchingBlock,

    #[error("the grid matches several grids in the file ({ids:?}); choose one by id")]
    AmbiguousImport { ids: Vec<u32> },

    #[error("invalid color {0:?}, expected six hex digits")]
    InvalidColor(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDecode(#[from] toml::de::Error),

    #[error(transparent)]
    TomlEncode(#[from] toml::ser::Error),
}

/// Convenience type alias for results using [`SunHoursError`].
pub type Result<T> = std::result::Result<T, SunHoursError>;
