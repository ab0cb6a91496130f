use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::model::{CellValue, Dataset};
use crate::data::schema::{ColumnKind, Schema};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// FilterSpec – the single active filter
// ---------------------------------------------------------------------------

/// One filter over one column. At most one is active at a time; `None`
/// upstream means "show everything".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FilterSpec {
    /// Keep rows with `min <= value <= max` in a numeric column.
    Range { column: String, min: f64, max: f64 },
    /// Keep rows whose value is in `allowed`. An empty set keeps every row:
    /// un-picking everything resets the view instead of hiding all data.
    Members {
        column: String,
        allowed: BTreeSet<CellValue>,
    },
}

impl FilterSpec {
    /// Build a range filter over a numeric column.
    ///
    /// Both bounds are clamped into the column's observed [min, max], so an
    /// out-of-domain request narrows to the data instead of silently
    /// emptying the view. A reversed request (`min > max`) is reported, not
    /// fixed up.
    pub fn range(
        dataset: &Dataset,
        schema: &Schema,
        column: &str,
        min: f64,
        max: f64,
    ) -> Result<Self> {
        let kind = schema.require(column)?;
        if kind != ColumnKind::Numeric {
            return Err(Error::TypeMismatch {
                column: column.to_string(),
                expected: ColumnKind::Numeric,
                actual: kind,
            });
        }
        if min > max {
            return Err(Error::Validation(format!(
                "range filter bounds are reversed: {min} > {max}"
            )));
        }
        let col = dataset
            .column(column)
            .ok_or_else(|| Error::UnknownColumn(column.to_string()))?;
        let (min, max) = match col.numeric_range() {
            Some((lo, hi)) => (min.clamp(lo, hi), max.clamp(lo, hi)),
            // No numeric cells to clamp against; the filter will match
            // nothing either way.
            None => (min, max),
        };
        Ok(FilterSpec::Range {
            column: column.to_string(),
            min,
            max,
        })
    }

    /// Build a set-membership filter over a categorical column.
    ///
    /// Values not present in the column are dropped from the set, keeping
    /// the selection a subset of the observed distinct values.
    pub fn members(
        dataset: &Dataset,
        schema: &Schema,
        column: &str,
        allowed: BTreeSet<CellValue>,
    ) -> Result<Self> {
        let kind = schema.require(column)?;
        if kind != ColumnKind::Categorical {
            return Err(Error::TypeMismatch {
                column: column.to_string(),
                expected: ColumnKind::Categorical,
                actual: kind,
            });
        }
        let col = dataset
            .column(column)
            .ok_or_else(|| Error::UnknownColumn(column.to_string()))?;
        let distinct = col.distinct_values();
        let allowed = allowed
            .into_iter()
            .filter(|v| distinct.contains(v))
            .collect();
        Ok(FilterSpec::Members {
            column: column.to_string(),
            allowed,
        })
    }

    pub fn column(&self) -> &str {
        match self {
            FilterSpec::Range { column, .. } | FilterSpec::Members { column, .. } => column,
        }
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Apply the active filter, if any, producing the working view.
///
/// `None` is the identity: the dataset comes back unchanged. The column
/// kind is re-checked against `schema` on every call because the dataset
/// may have been replaced (edited) since the filter was built.
pub fn apply(dataset: &Dataset, schema: &Schema, filter: Option<&FilterSpec>) -> Result<Dataset> {
    match filter {
        None => Ok(dataset.clone()),
        Some(spec) => {
            let indices = matching_indices(dataset, schema, spec)?;
            Ok(dataset.take_rows(&indices))
        }
    }
}

/// Indices of rows that pass `spec`, in row order.
///
/// Missing cells fail a range filter (a gap has no magnitude to compare)
/// but pass a membership filter when the missing marker itself is among
/// the selected values.
pub fn matching_indices(
    dataset: &Dataset,
    schema: &Schema,
    spec: &FilterSpec,
) -> Result<Vec<usize>> {
    let kind = schema.require(spec.column())?;
    let column = dataset
        .column(spec.column())
        .ok_or_else(|| Error::UnknownColumn(spec.column().to_string()))?;

    match spec {
        FilterSpec::Range { min, max, .. } => {
            if kind != ColumnKind::Numeric {
                return Err(Error::TypeMismatch {
                    column: spec.column().to_string(),
                    expected: ColumnKind::Numeric,
                    actual: kind,
                });
            }
            Ok(column
                .values
                .iter()
                .enumerate()
                .filter(|(_, v)| matches!(v.as_number(), Some(x) if *min <= x && x <= *max))
                .map(|(i, _)| i)
                .collect())
        }
        FilterSpec::Members { allowed, .. } => {
            if kind != ColumnKind::Categorical {
                return Err(Error::TypeMismatch {
                    column: spec.column().to_string(),
                    expected: ColumnKind::Categorical,
                    actual: kind,
                });
            }
            if allowed.is_empty() {
                return Ok((0..dataset.row_count()).collect());
            }
            Ok(column
                .values
                .iter()
                .enumerate()
                .filter(|(_, v)| allowed.contains(v))
                .map(|(i, _)| i)
                .collect())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
