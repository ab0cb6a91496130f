use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::loader;
use crate::data::model::{CellValue, Column, Dataset};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Row edits
// ---------------------------------------------------------------------------

/// One row-level change. Raw text fields go through
/// [`CellValue::from_input`], the same interpretation the loader applies,
/// so "7" typed into a cell is the number 7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RowEdit {
    /// Add a row at the end; one raw field per column, in column order.
    Append { values: Vec<String> },
    /// Replace a single cell.
    Update {
        row: usize,
        column: String,
        value: String,
    },
    /// Remove a row; later rows shift up.
    Delete { row: usize },
}

/// Apply `edits` in order, producing a new dataset.
///
/// The input dataset is never touched. Every view derived from it (schema,
/// filter, charts, clustering) is stale after the swap and must be
/// recomputed against the result. Row indices in each edit address the
/// state left by the previous edit in the batch.
pub fn apply_edits(dataset: &Dataset, edits: &[RowEdit]) -> Result<Dataset> {
    let mut columns: Vec<Column> = dataset.columns().to_vec();
    for edit in edits {
        apply_one(&mut columns, edit)?;
    }
    Dataset::from_columns(columns)
}

fn apply_one(columns: &mut [Column], edit: &RowEdit) -> Result<()> {
    let rows = columns.first().map_or(0, |c| c.values.len());
    match edit {
        RowEdit::Append { values } => {
            if values.len() != columns.len() {
                return Err(Error::RowArity {
                    expected: columns.len(),
                    got: values.len(),
                });
            }
            for (col, raw) in columns.iter_mut().zip(values) {
                col.values.push(CellValue::from_input(raw));
            }
        }
        RowEdit::Update { row, column, value } => {
            if *row >= rows {
                return Err(Error::RowOutOfRange { row: *row, rows });
            }
            let col = columns
                .iter_mut()
                .find(|c| c.name == *column)
                .ok_or_else(|| Error::UnknownColumn(column.clone()))?;
            col.values[*row] = CellValue::from_input(value);
        }
        RowEdit::Delete { row } => {
            if *row >= rows {
                return Err(Error::RowOutOfRange { row: *row, rows });
            }
            for col in columns.iter_mut() {
                col.values.remove(*row);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write `dataset` into `dir` under a name that cannot collide.
///
/// The file name is `{base}_{n}.csv` with the lowest positive `n` free at
/// call time, checked against the directory contents. Existing files are
/// never overwritten; an empty directory gets `{base}_1.csv`.
pub fn export(dataset: &Dataset, base_name: &str, dir: &Path) -> Result<PathBuf> {
    let path = next_free_path(dir, base_name);
    let bytes = loader::serialize(dataset)?;
    std::fs::write(&path, bytes).map_err(|source| Error::Write {
        path: path.clone(),
        source,
    })?;
    log::info!("exported {} rows to {}", dataset.row_count(), path.display());
    Ok(path)
}

fn next_free_path(dir: &Path, base_name: &str) -> PathBuf {
    let mut n = 1usize;
    loop {
        let candidate = dir.join(format!("{base_name}_{n}.csv"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
