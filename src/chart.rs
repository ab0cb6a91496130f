//! Chart requests, validation, and computation.
//!
//! A request names a chart kind and the columns filling its roles; the
//! builder validates the roles against the schema and computes a
//! [`ChartSpec`], a pure-data description a rendering shell can draw
//! without touching the dataset again.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::{generate_palette, Rgb};
use crate::data::model::{CellValue, Column, Dataset};
use crate::data::schema::{ColumnKind, Schema};
use crate::error::{Error, Result};
use crate::stats;

/// Histogram bin-count bounds; requests outside are clamped in.
pub const MIN_BINS: usize = 5;
pub const MAX_BINS: usize = 50;

// ---------------------------------------------------------------------------
// Kinds and requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Scatter,
    Histogram,
    Box,
    Heatmap,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Heatmap => "heatmap",
        };
        write!(f, "{name}")
    }
}

/// A chart kind together with its role → column assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartRequest {
    /// Count of rows per distinct value of a categorical column.
    Bar { category: String },
    /// Same counts as `Bar`, drawn as proportions.
    Pie { category: String },
    /// Two numeric columns, optionally partitioned by a third column.
    Scatter {
        x: String,
        y: String,
        group: Option<String>,
    },
    /// Binned distribution of one numeric column.
    Histogram { value: String, bins: usize },
    /// Five-number summaries of a numeric column, optionally per group.
    Box { y: String, x: Option<String> },
    /// Pairwise Pearson correlations over numeric columns.
    Heatmap { values: Vec<String> },
}

impl ChartRequest {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartRequest::Bar { .. } => ChartKind::Bar,
            ChartRequest::Pie { .. } => ChartKind::Pie,
            ChartRequest::Scatter { .. } => ChartKind::Scatter,
            ChartRequest::Histogram { .. } => ChartKind::Histogram,
            ChartRequest::Box { .. } => ChartKind::Box,
            ChartRequest::Heatmap { .. } => ChartKind::Heatmap,
        }
    }
}

// ---------------------------------------------------------------------------
// Computed specifications
// ---------------------------------------------------------------------------

/// One counted group in a bar or pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountedGroup {
    pub label: String,
    pub count: usize,
    pub color: Rgb,
}

/// One coloured point series in a scatter chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub color: Rgb,
    pub points: Vec<[f64; 2]>,
}

/// Five-number summary backing one box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub label: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// A fully computed chart, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartSpec {
    Bar {
        category: String,
        groups: Vec<CountedGroup>,
    },
    Pie {
        category: String,
        groups: Vec<CountedGroup>,
    },
    Scatter {
        x: String,
        y: String,
        series: Vec<Series>,
    },
    /// `edges` has one more entry than `counts`; the last bin is closed so
    /// the maximum value is counted.
    Histogram {
        value: String,
        edges: Vec<f64>,
        counts: Vec<usize>,
    },
    Box {
        y: String,
        x: Option<String>,
        boxes: Vec<BoxSummary>,
    },
    /// Symmetric matrix in `columns` order, diagonal exactly 1.0;
    /// degenerate pairs (zero variance, under two complete rows) are NaN.
    Heatmap {
        columns: Vec<String>,
        matrix: Vec<Vec<f64>>,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Validate `request` against the schema and compute the chart.
///
/// Column kinds come from `schema` as resolved at load or edit time, never
/// re-inferred here. A request that fails validation is reported; there is
/// no fallback chart.
pub fn build(dataset: &Dataset, schema: &Schema, request: &ChartRequest) -> Result<ChartSpec> {
    match request {
        ChartRequest::Bar { category } => {
            let col = require_kind(dataset, schema, category, ColumnKind::Categorical)?;
            Ok(ChartSpec::Bar {
                category: category.clone(),
                groups: count_groups(col),
            })
        }
        ChartRequest::Pie { category } => {
            let col = require_kind(dataset, schema, category, ColumnKind::Categorical)?;
            Ok(ChartSpec::Pie {
                category: category.clone(),
                groups: count_groups(col),
            })
        }
        ChartRequest::Scatter { x, y, group } => {
            build_scatter(dataset, schema, x, y, group.as_deref())
        }
        ChartRequest::Histogram { value, bins } => build_histogram(dataset, schema, value, *bins),
        ChartRequest::Box { y, x } => build_box(dataset, schema, y, x.as_deref()),
        ChartRequest::Heatmap { values } => build_heatmap(dataset, schema, values),
    }
}

fn require_kind<'a>(
    dataset: &'a Dataset,
    schema: &Schema,
    name: &str,
    expected: ColumnKind,
) -> Result<&'a Column> {
    let kind = schema.require(name)?;
    if kind != expected {
        return Err(Error::TypeMismatch {
            column: name.to_string(),
            expected,
            actual: kind,
        });
    }
    dataset
        .column(name)
        .ok_or_else(|| Error::UnknownColumn(name.to_string()))
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Exact row count per distinct value. Missing cells form their own group,
/// so the counts always sum to the row count.
fn count_groups(column: &Column) -> Vec<CountedGroup> {
    let mut counts: BTreeMap<&CellValue, usize> = BTreeMap::new();
    for value in &column.values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let palette = generate_palette(counts.len());
    counts
        .into_iter()
        .zip(palette)
        .map(|((value, count), color)| CountedGroup {
            label: value.to_string(),
            count,
            color,
        })
        .collect()
}

fn build_scatter(
    dataset: &Dataset,
    schema: &Schema,
    x: &str,
    y: &str,
    group: Option<&str>,
) -> Result<ChartSpec> {
    if x == y {
        return Err(Error::Validation(
            "scatter needs two distinct columns for x and y".to_string(),
        ));
    }
    let x_col = require_kind(dataset, schema, x, ColumnKind::Numeric)?;
    let y_col = require_kind(dataset, schema, y, ColumnKind::Numeric)?;

    // A point needs both coordinates; rows missing either are skipped.
    let point_at = |row: usize| -> Option<[f64; 2]> {
        Some([
            x_col.values[row].as_number()?,
            y_col.values[row].as_number()?,
        ])
    };

    let series = match group {
        Some(name) => {
            // Any kind may partition points; distinct values become series.
            schema.require(name)?;
            let group_col = dataset
                .column(name)
                .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
            let mut grouped: BTreeMap<&CellValue, Vec<[f64; 2]>> = BTreeMap::new();
            for (row, key) in group_col.values.iter().enumerate() {
                if let Some(point) = point_at(row) {
                    grouped.entry(key).or_default().push(point);
                }
            }
            let palette = generate_palette(grouped.len());
            grouped
                .into_iter()
                .zip(palette)
                .map(|((key, points), color)| Series {
                    label: key.to_string(),
                    color,
                    points,
                })
                .collect()
        }
        None => {
            let points: Vec<[f64; 2]> = (0..dataset.row_count()).filter_map(point_at).collect();
            let palette = generate_palette(1);
            vec![Series {
                label: "all rows".to_string(),
                color: palette[0],
                points,
            }]
        }
    };

    Ok(ChartSpec::Scatter {
        x: x.to_string(),
        y: y.to_string(),
        series,
    })
}

fn build_histogram(
    dataset: &Dataset,
    schema: &Schema,
    value: &str,
    bins: usize,
) -> Result<ChartSpec> {
    let col = require_kind(dataset, schema, value, ColumnKind::Numeric)?;
    let bins = bins.clamp(MIN_BINS, MAX_BINS);

    let numbers: Vec<f64> = col.numbers().filter(|v| v.is_finite()).collect();
    if numbers.is_empty() {
        return Ok(ChartSpec::Histogram {
            value: value.to_string(),
            edges: Vec::new(),
            counts: Vec::new(),
        });
    }

    let (mut lo, mut hi) = numbers
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        // All values identical: widen to a unit-wide range around them.
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in numbers {
        let mut idx = ((v - lo) / width) as usize;
        if idx >= bins {
            // The maximum lands on the last edge; the last bin is closed.
            idx = bins - 1;
        }
        counts[idx] += 1;
    }

    Ok(ChartSpec::Histogram {
        value: value.to_string(),
        edges,
        counts,
    })
}

fn build_box(
    dataset: &Dataset,
    schema: &Schema,
    y: &str,
    x: Option<&str>,
) -> Result<ChartSpec> {
    let y_col = require_kind(dataset, schema, y, ColumnKind::Numeric)?;

    let boxes = match x {
        None => box_summary(y.to_string(), y_col.numbers().collect())
            .into_iter()
            .collect(),
        Some(group_name) => {
            let group_col = require_kind(dataset, schema, group_name, ColumnKind::Categorical)?;
            let mut grouped: BTreeMap<&CellValue, Vec<f64>> = BTreeMap::new();
            for (key, cell) in group_col.values.iter().zip(&y_col.values) {
                if let Some(v) = cell.as_number() {
                    grouped.entry(key).or_default().push(v);
                }
            }
            grouped
                .into_iter()
                .filter_map(|(key, values)| box_summary(key.to_string(), values))
                .collect()
        }
    };

    Ok(ChartSpec::Box {
        y: y.to_string(),
        x: x.map(str::to_string),
        boxes,
    })
}

fn box_summary(label: String, mut values: Vec<f64>) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(BoxSummary {
        label,
        min: values[0],
        q1: stats::quantile(&values, 0.25)?,
        median: stats::quantile(&values, 0.5)?,
        q3: stats::quantile(&values, 0.75)?,
        max: values[values.len() - 1],
    })
}

fn build_heatmap(dataset: &Dataset, schema: &Schema, values: &[String]) -> Result<ChartSpec> {
    if values.len() < 2 {
        return Err(Error::Validation(format!(
            "correlation heatmap needs at least 2 numeric columns, got {}",
            values.len()
        )));
    }
    let distinct: BTreeSet<&String> = values.iter().collect();
    if distinct.len() != values.len() {
        return Err(Error::Validation(
            "correlation heatmap columns must be distinct".to_string(),
        ));
    }

    let mut columns = Vec::with_capacity(values.len());
    for name in values {
        columns.push(require_kind(dataset, schema, name, ColumnKind::Numeric)?);
    }

    let n = columns.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = stats::pearson(&complete_pairs(columns[i], columns[j]));
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    Ok(ChartSpec::Heatmap {
        columns: values.to_vec(),
        matrix,
    })
}

/// Rows where both columns have a value (pairwise-complete observations).
fn complete_pairs(a: &Column, b: &Column) -> Vec<(f64, f64)> {
    a.values
        .iter()
        .zip(&b.values)
        .filter_map(|(x, y)| Some((x.as_number()?, y.as_number()?)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
