//! tablescope – the analysis core of a CSV exploration tool.
//!
//! Everything a data-exploration shell needs, with no UI attached: load
//! delimited files into a typed [`Dataset`], infer per-column kinds,
//! filter, chart, cluster, edit, and export. The shell owns widgets and
//! event handling; this crate owns parsing, typing, statistics, and the
//! artifacts they produce. The single entry point for an interaction is
//! [`render`], which turns a dataset plus [`UserSelections`] into
//! [`Artifacts`].

pub mod chart;
pub mod cluster;
pub mod color;
pub mod data;
pub mod error;
pub mod session;
pub mod stats;

// Re-export the main types for easier access.
pub use chart::{ChartKind, ChartRequest, ChartSpec};
pub use cluster::ClusterResult;
pub use data::edit::RowEdit;
pub use data::filter::FilterSpec;
pub use data::model::{CellValue, Column, Dataset};
pub use data::schema::{ColumnKind, Schema};
pub use error::{Error, Result};
pub use session::{render, Artifacts, ClusterRequest, UserSelections};
pub use stats::ColumnSummary;
