use thiserror::Error;

/// Structural problems with a [`crate::table::Table`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Row has {found} cells but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },
}

/// Recoverable failure of the fetch stage. The source is skipped.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV decoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Series {code} returned no values")]
    EmptySeries { code: String },

    #[error("Script runtime failed ({status}): {stderr}")]
    Script { status: String, stderr: String },

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

/// Recoverable failure of the normalize stage. The source is skipped.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("No value column found (expected a column starting with {prefix:?})")]
    MissingValueColumn { prefix: String },

    #[error("No normalizer registered for source: {0}")]
    UnknownSource(String),
}

/// Consolidation failures are fatal for the run.
#[derive(Error, Debug, PartialEq)]
pub enum ConsolidationError {
    #[error("No normalized tables to consolidate")]
    NoTables,

    #[error("Column {column} is provided by more than one normalized table")]
    DuplicateColumn { column: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Consolidation failed: {0}")]
    Consolidation(#[from] ConsolidationError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
