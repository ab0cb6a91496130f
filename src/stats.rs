//! Numeric kernels and per-column summaries.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{CellValue, Column, Dataset};
use crate::data::schema::{ColumnKind, Schema};

// ---------------------------------------------------------------------------
// Kernels
// ---------------------------------------------------------------------------

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Linear-interpolation quantile over an already sorted slice, `q` in [0, 1].
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Pearson correlation over paired observations.
///
/// Fewer than two pairs, or a zero-variance side, has no defined
/// correlation and yields NaN.
pub fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x < 1e-15 || var_y < 1e-15 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

// ---------------------------------------------------------------------------
// Column summaries
// ---------------------------------------------------------------------------

/// Per-column descriptive statistics. `count` is the non-missing cell
/// count in both shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnSummary {
    Numeric {
        name: String,
        count: usize,
        mean: Option<f64>,
        std: Option<f64>,
        min: Option<f64>,
        q1: Option<f64>,
        median: Option<f64>,
        q3: Option<f64>,
        max: Option<f64>,
    },
    Categorical {
        name: String,
        count: usize,
        unique: usize,
        top: Option<String>,
        top_count: usize,
    },
}

/// Summarize every column of `dataset` according to its inferred kind.
pub fn describe(dataset: &Dataset, schema: &Schema) -> Vec<ColumnSummary> {
    dataset
        .columns()
        .iter()
        .map(|col| {
            match schema.kind_of(&col.name).unwrap_or(ColumnKind::Categorical) {
                ColumnKind::Numeric => numeric_summary(col),
                ColumnKind::Categorical => categorical_summary(col),
            }
        })
        .collect()
}

fn numeric_summary(col: &Column) -> ColumnSummary {
    let mut values: Vec<f64> = col.numbers().collect();
    values.sort_by(f64::total_cmp);
    ColumnSummary::Numeric {
        name: col.name.clone(),
        count: values.len(),
        mean: mean(&values),
        std: sample_std(&values),
        min: values.first().copied(),
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values.last().copied(),
    }
}

fn categorical_summary(col: &Column) -> ColumnSummary {
    let mut counts: BTreeMap<&CellValue, usize> = BTreeMap::new();
    for value in col.values.iter().filter(|v| !v.is_missing()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    // max_by_key keeps the last maximum; over a BTreeMap that makes ties
    // deterministic (largest value in cell order wins).
    let top = counts.iter().max_by_key(|(_, &n)| n);
    ColumnSummary::Categorical {
        name: col.name.clone(),
        count: counts.values().sum(),
        unique: counts.len(),
        top: top.map(|(value, _)| value.to_string()),
        top_count: top.map_or(0, |(_, &n)| n),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
