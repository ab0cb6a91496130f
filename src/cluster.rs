//! K-means clustering with a 2-D principal-axis projection.
//!
//! Both computations run on the same standardized matrix built from the
//! selected numeric columns; neither influences the other. Initialization
//! is driven by a fixed seed, so identical inputs produce identical
//! results run to run.

use serde::Serialize;

use crate::data::model::{Column, Dataset};
use crate::data::schema::{ColumnKind, Schema};
use crate::error::{Error, Result};

/// Fixed seed for centroid and start-vector selection.
const SEED: u64 = 42;
/// Assignment/update rounds before k-means stops chasing convergence.
const MAX_ITERS: usize = 100;
/// Power-iteration cap and convergence tolerance for the projection.
const POWER_ITERS: usize = 300;
const POWER_TOL: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Deterministic RNG
// ---------------------------------------------------------------------------

/// xorshift64 – tiny deterministic generator, enough for picking centroids
/// and start vectors.
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(if seed == 0 { 0x9e3779b9 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in [0, 1).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in [0, n). `n` must be positive.
    fn below(&mut self, n: usize) -> usize {
        ((self.next_f64() * n as f64) as usize).min(n - 1)
    }
}

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// Clustering and projection over the rows that had complete numeric data.
///
/// `retained_rows[i]` is the dataset row behind `assignments[i]` and
/// `projection[i]`; rows dropped for missing values appear in neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterResult {
    pub k: usize,
    pub retained_rows: Vec<usize>,
    /// Cluster id in `0..k` per retained row.
    pub assignments: Vec<usize>,
    /// 2-D coordinates per retained row, first axis dominant.
    pub projection: Vec<[f64; 2]>,
    /// Fraction of total variance captured by each projection axis.
    pub explained: [f64; 2],
}

impl ClusterResult {
    /// Cluster label per dataset row, `None` where the row was dropped.
    /// Lets a caller join labels back onto the table it clustered.
    pub fn row_labels(&self, row_count: usize) -> Vec<Option<usize>> {
        let mut labels = vec![None; row_count];
        for (&row, &cluster) in self.retained_rows.iter().zip(&self.assignments) {
            if let Some(slot) = labels.get_mut(row) {
                *slot = Some(cluster);
            }
        }
        labels
    }

    /// Retained-row count per cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &c in &self.assignments {
            sizes[c] += 1;
        }
        sizes
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Cluster the selected numeric columns into `k` groups and project the
/// same rows onto their two principal axes.
///
/// Rows with a missing (or non-finite) cell in any selected column are
/// excluded, not imputed. Each feature is standardized to zero mean and
/// unit variance before either computation so no column dominates by
/// scale alone.
pub fn cluster(
    dataset: &Dataset,
    schema: &Schema,
    columns: &[String],
    k: usize,
) -> Result<ClusterResult> {
    if columns.len() < 2 {
        return Err(Error::InsufficientColumns {
            required: 2,
            selected: columns.len(),
        });
    }
    let mut selected = Vec::with_capacity(columns.len());
    for name in columns {
        let kind = schema.require(name)?;
        if kind != ColumnKind::Numeric {
            return Err(Error::TypeMismatch {
                column: name.clone(),
                expected: ColumnKind::Numeric,
                actual: kind,
            });
        }
        selected.push(
            dataset
                .column(name)
                .ok_or_else(|| Error::UnknownColumn(name.clone()))?,
        );
    }

    let (retained_rows, matrix) = complete_rows(dataset.row_count(), &selected);
    let rows = retained_rows.len();
    if rows == 0 {
        return Err(Error::EmptyDataset);
    }
    if k < 1 || k > rows {
        return Err(Error::InvalidClusterCount { k, rows });
    }

    let matrix = standardize(matrix);
    let assignments = kmeans(&matrix, k);
    let (projection, explained) = project(&matrix);
    log::debug!(
        "clustered {rows} of {} rows into {k} groups over {} columns",
        dataset.row_count(),
        columns.len()
    );

    Ok(ClusterResult {
        k,
        retained_rows,
        assignments,
        projection,
        explained,
    })
}

/// Matrix of fully observed rows, plus the dataset row behind each.
fn complete_rows(row_count: usize, columns: &[&Column]) -> (Vec<usize>, Vec<Vec<f64>>) {
    let mut retained = Vec::new();
    let mut matrix = Vec::new();
    for row in 0..row_count {
        let mut features = Vec::with_capacity(columns.len());
        for col in columns {
            match col.values[row].as_number() {
                Some(v) if v.is_finite() => features.push(v),
                _ => {
                    features.clear();
                    break;
                }
            }
        }
        if features.len() == columns.len() {
            retained.push(row);
            matrix.push(features);
        }
    }
    (retained, matrix)
}

/// Z-score each feature; zero-variance features become all zero.
fn standardize(mut matrix: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let rows = matrix.len();
    if rows == 0 {
        return matrix;
    }
    let dims = matrix[0].len();
    for d in 0..dims {
        let mean = matrix.iter().map(|r| r[d]).sum::<f64>() / rows as f64;
        let var = matrix.iter().map(|r| (r[d] - mean) * (r[d] - mean)).sum::<f64>() / rows as f64;
        let std = var.sqrt();
        for r in matrix.iter_mut() {
            r[d] = if std > 1e-12 { (r[d] - mean) / std } else { 0.0 };
        }
    }
    matrix
}

// ---------------------------------------------------------------------------
// k-means
// ---------------------------------------------------------------------------

fn kmeans(matrix: &[Vec<f64>], k: usize) -> Vec<usize> {
    let mut rng = Rng::new(SEED);
    let mut centroids = initial_centroids(matrix, k, &mut rng);
    let mut assignments = vec![0usize; matrix.len()];

    for iter in 0..MAX_ITERS {
        let mut changed = false;
        for (row, point) in matrix.iter().enumerate() {
            let nearest = nearest_centroid(point, &centroids);
            if assignments[row] != nearest {
                assignments[row] = nearest;
                changed = true;
            }
        }
        if !changed {
            log::debug!("k-means converged after {iter} iterations");
            break;
        }
        update_centroids(matrix, &assignments, &mut centroids);
    }
    assignments
}

/// Pick `k` distinct rows as starting centroids: a partial Fisher–Yates
/// shuffle over the row indices, driven by the fixed-seed generator.
fn initial_centroids(matrix: &[Vec<f64>], k: usize, rng: &mut Rng) -> Vec<Vec<f64>> {
    let mut indices: Vec<usize> = (0..matrix.len()).collect();
    for i in 0..k {
        let j = i + rng.below(indices.len() - i);
        indices.swap(i, j);
    }
    indices[..k].iter().map(|&i| matrix[i].clone()).collect()
}

/// Index of the closest centroid; ties go to the lower id.
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best = idx;
            best_dist = dist;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Move each centroid to the mean of its members; a cluster that lost all
/// members keeps its previous position.
fn update_centroids(matrix: &[Vec<f64>], assignments: &[usize], centroids: &mut [Vec<f64>]) {
    let dims = matrix[0].len();
    let k = centroids.len();
    let mut sums = vec![vec![0.0; dims]; k];
    let mut counts = vec![0usize; k];
    for (point, &cluster) in matrix.iter().zip(assignments) {
        counts[cluster] += 1;
        for (s, v) in sums[cluster].iter_mut().zip(point) {
            *s += *v;
        }
    }
    for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
        if count > 0 {
            for (c, s) in centroid.iter_mut().zip(sum) {
                *c = s / count as f64;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Principal-axis projection
// ---------------------------------------------------------------------------

/// Project the standardized matrix onto its top two principal axes.
///
/// Power iteration over the covariance matrix, the second axis kept
/// orthogonal to the first on every step. Each axis is flipped so its
/// largest-magnitude loading is positive, keeping the orientation stable
/// across runs.
fn project(matrix: &[Vec<f64>]) -> (Vec<[f64; 2]>, [f64; 2]) {
    let rows = matrix.len();
    if rows < 2 {
        return (vec![[0.0, 0.0]; rows], [0.0, 0.0]);
    }
    let dims = matrix[0].len();

    let cov = covariance(matrix);
    let total: f64 = (0..dims).map(|d| cov[d][d]).sum();

    let mut rng = Rng::new(SEED);
    let (axis1, lambda1) = dominant_axis(&cov, None, &mut rng);
    let (axis2, lambda2) = dominant_axis(&cov, Some(&axis1), &mut rng);

    let projection = matrix
        .iter()
        .map(|row| [dot(row, &axis1), dot(row, &axis2)])
        .collect();
    let explained = if total > 1e-12 {
        [lambda1.max(0.0) / total, lambda2.max(0.0) / total]
    } else {
        [0.0, 0.0]
    };
    (projection, explained)
}

/// Sample covariance of the standardized matrix. The input has zero mean
/// per column, so plain cross products suffice.
fn covariance(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let rows = matrix.len();
    let dims = matrix[0].len();
    let mut cov = vec![vec![0.0; dims]; dims];
    for row in matrix {
        for i in 0..dims {
            for j in i..dims {
                cov[i][j] += row[i] * row[j];
            }
        }
    }
    let denom = (rows - 1) as f64;
    for i in 0..dims {
        for j in i..dims {
            cov[i][j] /= denom;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

fn dominant_axis(cov: &[Vec<f64>], orthogonal_to: Option<&[f64]>, rng: &mut Rng) -> (Vec<f64>, f64) {
    let dims = cov.len();
    let mut v: Vec<f64> = (0..dims).map(|_| rng.next_f64() - 0.5).collect();
    if let Some(prev) = orthogonal_to {
        subtract_component(&mut v, prev);
    }
    normalize(&mut v);

    let mut lambda = 0.0;
    for _ in 0..POWER_ITERS {
        let mut next = mat_vec(cov, &v);
        if let Some(prev) = orthogonal_to {
            subtract_component(&mut next, prev);
        }
        let norm = normalize(&mut next);
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        lambda = norm;
        if delta < POWER_TOL {
            break;
        }
    }
    orient(&mut v);
    (v, lambda)
}

/// Flip the axis so its largest-magnitude loading is positive.
fn orient(v: &mut [f64]) {
    let mut lead = 0.0f64;
    for &x in v.iter() {
        if x.abs() > lead.abs() {
            lead = x;
        }
    }
    if lead < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

/// Remove the component of `v` along the (unit) `axis`.
fn subtract_component(v: &mut [f64], axis: &[f64]) {
    let proj = dot(v, axis);
    for (x, a) in v.iter_mut().zip(axis) {
        *x -= proj * a;
    }
}

/// Scale `v` to unit length, returning its prior norm. A near-zero vector
/// is left as is.
fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter().map(|row| dot(row, v)).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column};
    use crate::data::schema;

    fn two_blobs() -> (Dataset, Schema) {
        // Five points near the origin, five near (100, 100).
        let offsets = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.5, 0.5)];
        let mut a = Vec::new();
        let mut b = Vec::new();
        for (dx, dy) in offsets {
            a.push(CellValue::Number(dx));
            b.push(CellValue::Number(dy));
        }
        for (dx, dy) in offsets {
            a.push(CellValue::Number(100.0 + dx));
            b.push(CellValue::Number(100.0 + dy));
        }
        let dataset =
            Dataset::from_columns(vec![Column::new("a", a), Column::new("b", b)]).unwrap();
        let schema = schema::infer(&dataset).unwrap();
        (dataset, schema)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn separated_blobs_get_separate_clusters() {
        let (dataset, schema) = two_blobs();
        let result = cluster(&dataset, &schema, &names(&["a", "b"]), 2).unwrap();
        assert_eq!(result.assignments.len(), 10);
        let first = result.assignments[0];
        let second = result.assignments[5];
        assert_ne!(first, second);
        assert!(result.assignments[..5].iter().all(|&c| c == first));
        assert!(result.assignments[5..].iter().all(|&c| c == second));
        assert_eq!(result.cluster_sizes().iter().sum::<usize>(), 10);
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let (dataset, schema) = two_blobs();
        let columns = names(&["a", "b"]);
        let r1 = cluster(&dataset, &schema, &columns, 3).unwrap();
        let r2 = cluster(&dataset, &schema, &columns, 3).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn rows_with_gaps_are_dropped_and_mapped_back() {
        let dataset = Dataset::from_columns(vec![
            Column::from_inputs("a", ["1", "2", "", "4", "5"]),
            Column::from_inputs("b", ["1", "2", "3", "", "5"]),
        ])
        .unwrap();
        let schema = schema::infer(&dataset).unwrap();
        let result = cluster(&dataset, &schema, &names(&["a", "b"]), 2).unwrap();

        assert_eq!(result.retained_rows, vec![0, 1, 4]);
        assert_eq!(result.assignments.len(), 3);
        assert_eq!(result.projection.len(), 3);

        let labels = result.row_labels(dataset.row_count());
        assert_eq!(labels.len(), 5);
        assert!(labels[2].is_none());
        assert!(labels[3].is_none());
        assert!(labels[0].is_some());
    }

    #[test]
    fn cluster_count_bounds_are_enforced() {
        let (dataset, schema) = two_blobs();
        let columns = names(&["a", "b"]);
        assert!(matches!(
            cluster(&dataset, &schema, &columns, 0),
            Err(Error::InvalidClusterCount { k: 0, rows: 10 })
        ));
        assert!(matches!(
            cluster(&dataset, &schema, &columns, 11),
            Err(Error::InvalidClusterCount { k: 11, rows: 10 })
        ));
        // k equal to the usable row count is allowed.
        assert!(cluster(&dataset, &schema, &columns, 10).is_ok());
    }

    #[test]
    fn needs_two_numeric_columns() {
        let (dataset, schema) = two_blobs();
        assert!(matches!(
            cluster(&dataset, &schema, &names(&["a"]), 2),
            Err(Error::InsufficientColumns {
                required: 2,
                selected: 1
            })
        ));
    }

    #[test]
    fn text_column_is_a_type_mismatch() {
        let dataset = Dataset::from_columns(vec![
            Column::from_inputs("a", ["1", "2", "3"]),
            Column::from_inputs("city", ["T", "K", "H"]),
        ])
        .unwrap();
        let schema = schema::infer(&dataset).unwrap();
        assert!(matches!(
            cluster(&dataset, &schema, &names(&["a", "city"]), 2),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn all_rows_incomplete_is_empty() {
        let dataset = Dataset::from_columns(vec![
            Column::from_inputs("a", ["", "1"]),
            Column::from_inputs("b", ["2", ""]),
        ])
        .unwrap();
        let schema = schema::infer(&dataset).unwrap();
        assert!(matches!(
            cluster(&dataset, &schema, &names(&["a", "b"]), 1),
            Err(Error::EmptyDataset)
        ));
    }

    #[test]
    fn single_retained_row_projects_to_the_origin() {
        let dataset = Dataset::from_columns(vec![
            Column::from_inputs("a", ["1", "2"]),
            Column::from_inputs("b", ["3", ""]),
        ])
        .unwrap();
        let schema = schema::infer(&dataset).unwrap();
        let result = cluster(&dataset, &schema, &names(&["a", "b"]), 1).unwrap();

        assert_eq!(result.retained_rows, vec![0]);
        assert_eq!(result.assignments, vec![0]);
        assert_eq!(result.projection, vec![[0.0, 0.0]]);
        assert_eq!(result.explained, [0.0, 0.0]);
    }

    #[test]
    fn k_of_one_puts_everything_together() {
        let (dataset, schema) = two_blobs();
        let result = cluster(&dataset, &schema, &names(&["a", "b"]), 1).unwrap();
        assert!(result.assignments.iter().all(|&c| c == 0));
        assert_eq!(result.cluster_sizes(), vec![10]);
    }

    #[test]
    fn projection_axes_capture_correlated_features() {
        // b moves exactly with a, so one axis carries all the variance.
        let dataset = Dataset::from_columns(vec![
            Column::from_inputs("a", ["1", "2", "3", "4", "5", "6", "7", "8"]),
            Column::from_inputs("b", ["2", "4", "6", "8", "10", "12", "14", "16"]),
        ])
        .unwrap();
        let schema = schema::infer(&dataset).unwrap();
        let result = cluster(&dataset, &schema, &names(&["a", "b"]), 2).unwrap();

        assert!(result.explained[0] > 0.99);
        assert!(result.explained[1] < 1e-6);
        for point in &result.projection {
            assert!(point[0].is_finite());
            assert!(point[1].abs() < 1e-6);
        }
    }

    #[test]
    fn explained_fractions_are_sane() {
        let (dataset, schema) = two_blobs();
        let result = cluster(&dataset, &schema, &names(&["a", "b"]), 2).unwrap();
        let [e1, e2] = result.explained;
        assert!((0.0..=1.0).contains(&e1));
        assert!((0.0..=1.0).contains(&e2));
        assert!(e1 + e2 <= 1.0 + 1e-9);
        assert!(e1 >= e2);
    }
}
