use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use tablescope::data::loader;
use tablescope::session::{self, ClusterRequest, UserSelections};
use tablescope::{ChartRequest, ChartSpec, ColumnSummary, Dataset};

fn main() -> Result<()> {
    env_logger::init();

    let mut json_output = false;
    let mut path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json_output = true,
            other if path.is_none() => path = Some(PathBuf::from(other)),
            other => bail!("unexpected argument '{other}'"),
        }
    }
    let Some(path) = path else {
        bail!("usage: tablescope [--json] <data.csv>");
    };

    let dataset = loader::load_file(&path)
        .with_context(|| format!("loading {}", path.display()))?;

    let selections = default_selections(&dataset)?;
    let artifacts =
        session::render(&dataset, &selections).context("rendering artifacts")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&artifacts.to_json())?);
        return Ok(());
    }

    println!(
        "{} | {} rows x {} columns",
        path.display(),
        dataset.row_count(),
        dataset.column_count()
    );

    println!("\nschema:");
    for col in &artifacts.schema.columns {
        println!("  {:<20} {}", col.name, col.kind);
    }

    println!("\nfirst rows:");
    print_table(&artifacts.table.head(10));

    println!("\nsummaries:");
    for summary in &artifacts.summaries {
        print_summary(summary);
    }

    if let Some(branch) = &artifacts.chart {
        match branch {
            Ok(spec) => {
                println!("\nchart:");
                println!("{}", serde_json::to_string_pretty(spec)?);
            }
            Err(err) => println!("\nchart unavailable: {err}"),
        }
    }

    if let Some(branch) = &artifacts.clustering {
        match branch {
            Ok(view) => {
                println!(
                    "\nclustering: k={}, sizes {:?}, axis variance {:.1}% / {:.1}%",
                    view.result.k,
                    view.result.cluster_sizes(),
                    view.result.explained[0] * 100.0,
                    view.result.explained[1] * 100.0,
                );
                if let ChartSpec::Scatter { series, .. } = &view.scatter {
                    for s in series {
                        println!("  {:<12} {} points", s.label, s.points.len());
                    }
                }
            }
            Err(err) => println!("\nclustering unavailable: {err}"),
        }
    }

    Ok(())
}

/// A first look without flags: bar-chart the first categorical column and
/// cluster the numeric columns into up to three groups.
fn default_selections(dataset: &Dataset) -> Result<UserSelections> {
    let schema = tablescope::data::schema::infer(dataset)?;
    let chart = schema
        .categorical_columns()
        .next()
        .map(|name| ChartRequest::Bar {
            category: name.to_string(),
        });
    let numeric: Vec<String> = schema.numeric_columns().map(str::to_string).collect();
    let clustering = (numeric.len() >= 2).then(|| ClusterRequest {
        columns: numeric,
        k: 3.min(dataset.row_count()),
    });
    Ok(UserSelections {
        filter: None,
        chart,
        clustering,
    })
}

fn print_table(table: &Dataset) {
    let widths: Vec<usize> = table
        .columns()
        .iter()
        .map(|col| {
            col.values
                .iter()
                .map(|v| v.to_string().chars().count())
                .chain([col.name.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(widths.iter().copied())
        .map(|(col, w)| format!("{:<w$}", col.name))
        .collect();
    println!("  {}", header.join("  "));

    for row in 0..table.row_count() {
        let cells: Vec<String> = table
            .row(row)
            .iter()
            .zip(widths.iter().copied())
            .map(|(v, w)| format!("{:<w$}", v.to_string()))
            .collect();
        println!("  {}", cells.join("  "));
    }
}

fn print_summary(summary: &ColumnSummary) {
    match summary {
        ColumnSummary::Numeric {
            name,
            count,
            mean,
            std,
            min,
            median,
            max,
            ..
        } => {
            let fmt = |v: &Option<f64>| {
                v.map_or_else(|| "-".to_string(), |x| format!("{x:.3}"))
            };
            println!(
                "  {:<20} n={count} mean={} std={} min={} median={} max={}",
                name,
                fmt(mean),
                fmt(std),
                fmt(min),
                fmt(median),
                fmt(max),
            );
        }
        ColumnSummary::Categorical {
            name,
            count,
            unique,
            top,
            top_count,
        } => {
            println!(
                "  {:<20} n={count} unique={unique} top={} ({top_count})",
                name,
                top.as_deref().unwrap_or("-"),
            );
        }
    }
}
