//! One interaction of the explore loop.
//!
//! The shell collects what the user picked into [`UserSelections`], hands
//! it to [`render`] together with the current dataset, and gets back every
//! artifact to show. Nothing is cached between calls; an interaction
//! recomputes the world from its two inputs.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chart::{self, ChartRequest, ChartSpec, Series};
use crate::cluster::{self, ClusterResult};
use crate::color::generate_palette;
use crate::data::filter::{self, FilterSpec};
use crate::data::model::Dataset;
use crate::data::schema::{self, Schema};
use crate::error::Result;
use crate::stats::{self, ColumnSummary};

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

/// Everything the user currently has selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSelections {
    /// At most one active filter.
    pub filter: Option<FilterSpec>,
    pub chart: Option<ChartRequest>,
    pub clustering: Option<ClusterRequest>,
}

/// Column selection and group count for the clustering branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub columns: Vec<String>,
    pub k: usize,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// The clustering branch artifact: the raw result plus a ready-to-draw
/// scatter of the projected rows, one coloured series per cluster.
#[derive(Debug)]
pub struct ClusteringView {
    pub result: ClusterResult,
    pub scatter: ChartSpec,
}

/// Everything one interaction produces.
///
/// The chart and clustering branches each carry their own `Result`: a
/// failure there is part of the output, and the table and summaries stay
/// usable around it.
#[derive(Debug)]
pub struct Artifacts {
    pub schema: Schema,
    /// The filtered working view all branches were computed from.
    pub table: Dataset,
    pub summaries: Vec<ColumnSummary>,
    pub chart: Option<Result<ChartSpec>>,
    pub clustering: Option<Result<ClusteringView>>,
}

impl Artifacts {
    /// JSON view with branch errors rendered as messages, for shells that
    /// consume the pipeline across a serialization boundary.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "schema": self.schema,
            "table": self.table,
            "summaries": self.summaries,
            "chart": branch_json(&self.chart),
            "clustering": self.clustering.as_ref().map_or(serde_json::Value::Null, |branch| {
                match branch {
                    Ok(view) => json!({
                        "result": view.result,
                        "scatter": view.scatter,
                    }),
                    Err(err) => json!({ "error": err.to_string() }),
                }
            }),
        })
    }
}

fn branch_json<T: Serialize>(branch: &Option<Result<T>>) -> serde_json::Value {
    match branch {
        None => serde_json::Value::Null,
        Some(Ok(value)) => json!(value),
        Some(Err(err)) => json!({ "error": err.to_string() }),
    }
}

// ---------------------------------------------------------------------------
// render – the one pipeline entry point
// ---------------------------------------------------------------------------

/// Recompute every artifact for the current dataset and selections.
///
/// Pure apart from logging: the same inputs produce the same artifacts.
/// The whole call fails only when nothing at all can be shown (no rows, or
/// the active filter no longer fits the data). A chart or clustering
/// failure is captured inside its branch and the rest of the output
/// stands.
pub fn render(dataset: &Dataset, selections: &UserSelections) -> Result<Artifacts> {
    let schema = schema::infer(dataset)?;
    let table = filter::apply(dataset, &schema, selections.filter.as_ref())?;
    let summaries = stats::describe(&table, &schema);

    let chart = selections.chart.as_ref().map(|request| {
        chart::build(&table, &schema, request).map_err(|err| {
            log::warn!("{} chart failed: {err}", request.kind());
            err
        })
    });

    let clustering = selections.clustering.as_ref().map(|request| {
        cluster::cluster(&table, &schema, &request.columns, request.k)
            .map(|result| {
                let scatter = projection_scatter(&result);
                ClusteringView { result, scatter }
            })
            .map_err(|err| {
                log::warn!("clustering failed: {err}");
                err
            })
    });

    log::info!(
        "rendered {} of {} rows",
        table.row_count(),
        dataset.row_count()
    );

    Ok(Artifacts {
        schema,
        table,
        summaries,
        chart,
        clustering,
    })
}

/// Scatter of the 2-D projection, one series per cluster id.
fn projection_scatter(result: &ClusterResult) -> ChartSpec {
    let palette = generate_palette(result.k);
    let mut series: Vec<Series> = palette
        .into_iter()
        .enumerate()
        .map(|(id, color)| Series {
            label: format!("cluster {id}"),
            color,
            points: Vec::new(),
        })
        .collect();
    for (&cluster, &point) in result.assignments.iter().zip(&result.projection) {
        series[cluster].points.push(point);
    }
    ChartSpec::Scatter {
        x: "pc1".to_string(),
        y: "pc2".to_string(),
        series,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
