use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::model::{CellValue, Dataset};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Column kinds
// ---------------------------------------------------------------------------

/// The two kinds every column resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Inferred kind of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

// ---------------------------------------------------------------------------
// Schema – per-column kinds, in dataset column order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub columns: Vec<ColumnSchema>,
}

impl Schema {
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    /// Kind lookup that reports unknown columns as an error.
    pub(crate) fn require(&self, name: &str) -> Result<ColumnKind> {
        self.kind_of(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric)
            .map(|c| c.name.as_str())
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .map(|c| c.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

/// Classify every column of `dataset`.
///
/// A column is numeric when every non-missing cell is a number; a single
/// text cell makes it categorical. Missing cells never decide the kind, so
/// an all-missing column stays numeric. A dataset with zero rows is
/// reported instead of classified.
pub fn infer(dataset: &Dataset) -> Result<Schema> {
    if dataset.row_count() == 0 {
        return Err(Error::EmptyDataset);
    }
    let columns = dataset
        .columns()
        .iter()
        .map(|col| ColumnSchema {
            name: col.name.clone(),
            kind: column_kind(&col.values),
        })
        .collect();
    Ok(Schema { columns })
}

fn column_kind(values: &[CellValue]) -> ColumnKind {
    let all_numeric = values
        .iter()
        .filter(|v| !v.is_missing())
        .all(|v| matches!(v, CellValue::Number(_)));
    if all_numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
