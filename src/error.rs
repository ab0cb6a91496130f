use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::schema::ColumnKind;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong in the analysis pipeline.
///
/// Each variant renders a short, actionable message; the caller decides how
/// to surface it (the CLI prints it, a UI shell shows it next to the
/// affected widget). No component substitutes a default result for an
/// error.
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing downstream can be inferred from a dataset without rows.
    #[error("the dataset has no rows to analyze")]
    EmptyDataset,

    #[error("column '{column}' is {actual}, but the operation needs a {expected} column")]
    TypeMismatch {
        column: String,
        expected: ColumnKind,
        actual: ColumnKind,
    },

    #[error("no column named '{0}' in the dataset")]
    UnknownColumn(String),

    /// A chart request that does not satisfy its kind's role table.
    #[error("invalid chart request: {0}")]
    Validation(String),

    #[error("clustering needs at least {required} numeric columns, got {selected}")]
    InsufficientColumns { required: usize, selected: usize },

    #[error("cluster count k={k} is outside 1..={rows} for {rows} usable rows")]
    InvalidClusterCount { k: usize, rows: usize },

    #[error("row index {row} is out of range for a dataset with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("row has {got} cells but the dataset has {expected} columns")]
    RowArity { expected: usize, got: usize },

    #[error("could not parse input: {0}")]
    Parse(String),

    #[error("could not write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
