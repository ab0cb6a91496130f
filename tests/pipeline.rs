//! End-to-end runs through the load → filter → render pipeline, the way a
//! shell would drive it.

use std::collections::BTreeSet;

use tablescope::data::{edit, filter, loader, schema};
use tablescope::session::{render, ClusterRequest, UserSelections};
use tablescope::{CellValue, ChartRequest, ChartSpec, ColumnKind, FilterSpec, RowEdit};

const DEMO_CSV: &[u8] = b"id,category,value\n\
1,A,1\n\
2,A,2\n\
3,A,3\n\
4,A,4\n\
5,A,5\n\
6,B,6\n\
7,B,7\n\
8,B,8\n\
9,B,9\n\
10,B,10\n";

#[test]
fn filter_then_bar_chart_walkthrough() {
    let dataset = loader::parse(DEMO_CSV).unwrap();
    let sch = schema::infer(&dataset).unwrap();
    assert_eq!(sch.kind_of("value"), Some(ColumnKind::Numeric));
    assert_eq!(sch.kind_of("category"), Some(ColumnKind::Categorical));

    let spec = FilterSpec::range(&dataset, &sch, "value", 3.0, 8.0).unwrap();
    let selections = UserSelections {
        filter: Some(spec),
        chart: Some(ChartRequest::Bar {
            category: "category".to_string(),
        }),
        clustering: None,
    };
    let artifacts = render(&dataset, &selections).unwrap();

    assert_eq!(artifacts.table.row_count(), 6);
    let chart = artifacts.chart.as_ref().unwrap().as_ref().unwrap();
    let ChartSpec::Bar { groups, .. } = chart else {
        panic!("expected a bar spec");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!((groups[0].label.as_str(), groups[0].count), ("A", 3));
    assert_eq!((groups[1].label.as_str(), groups[1].count), ("B", 3));
}

#[test]
fn disk_round_trip_keeps_values_and_bom() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = loader::parse(DEMO_CSV).unwrap();

    let path = edit::export(&dataset, "demo", dir.path()).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"\xef\xbb\xbf"));

    let reloaded = loader::load_file(&path).unwrap();
    assert_eq!(reloaded, dataset);
}

#[test]
fn export_never_overwrites_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = loader::parse(DEMO_CSV).unwrap();

    let first = edit::export(&dataset, "report", dir.path()).unwrap();
    let second = edit::export(&dataset, "report", dir.path()).unwrap();
    assert_eq!(first.file_name().unwrap(), "report_1.csv");
    assert_eq!(second.file_name().unwrap(), "report_2.csv");

    // A filtered subset exported next to the originals takes the next slot.
    let sch = schema::infer(&dataset).unwrap();
    let spec = FilterSpec::members(
        &dataset,
        &sch,
        "category",
        [CellValue::Text("A".to_string())].into_iter().collect(),
    )
    .unwrap();
    let subset = filter::apply(&dataset, &sch, Some(&spec)).unwrap();
    let third = edit::export(&subset, "report", dir.path()).unwrap();
    assert_eq!(third.file_name().unwrap(), "report_3.csv");

    let full = std::fs::read(&first).unwrap();
    let partial = std::fs::read(&third).unwrap();
    assert!(full.len() > partial.len());
}

#[test]
fn edits_replace_the_dataset_and_views_recompute() {
    let dataset = loader::parse(DEMO_CSV).unwrap();

    let edited = edit::apply_edits(
        &dataset,
        &[
            RowEdit::Append {
                values: vec!["11".to_string(), "C".to_string(), "11".to_string()],
            },
            // Typing text into a numeric column flips its kind on re-render.
            RowEdit::Update {
                row: 0,
                column: "value".to_string(),
                value: "low".to_string(),
            },
            RowEdit::Delete { row: 9 },
        ],
    )
    .unwrap();

    assert_eq!(edited.row_count(), 10);
    assert_eq!(dataset.row_count(), 10);
    assert_ne!(edited, dataset);

    let artifacts = render(&edited, &UserSelections::default()).unwrap();
    assert_eq!(artifacts.schema.kind_of("value"), Some(ColumnKind::Categorical));
    assert_eq!(artifacts.table.row_count(), 10);
}

#[test]
fn stale_filter_against_edited_dataset_fails_loudly() {
    let dataset = loader::parse(DEMO_CSV).unwrap();
    let sch = schema::infer(&dataset).unwrap();
    let spec = FilterSpec::range(&dataset, &sch, "value", 2.0, 9.0).unwrap();

    let edited = edit::apply_edits(
        &dataset,
        &[RowEdit::Update {
            row: 0,
            column: "value".to_string(),
            value: "low".to_string(),
        }],
    )
    .unwrap();

    let selections = UserSelections {
        filter: Some(spec),
        chart: None,
        clustering: None,
    };
    // The filter targets a column whose kind changed; the render reports it
    // instead of showing a half-right table.
    assert!(render(&edited, &selections).is_err());
}

#[test]
fn clustering_branch_joins_back_to_filtered_rows() {
    let csv = b"group,x,y\n\
a,0,0\n\
a,1,1\n\
a,0.5,0.5\n\
b,50,50\n\
b,51,49\n\
b,50.5,50.2\n\
a,,1\n";
    let dataset = loader::parse(csv).unwrap();

    let selections = UserSelections {
        filter: None,
        chart: None,
        clustering: Some(ClusterRequest {
            columns: vec!["x".to_string(), "y".to_string()],
            k: 2,
        }),
    };
    let artifacts = render(&dataset, &selections).unwrap();
    let view = artifacts.clustering.as_ref().unwrap().as_ref().unwrap();

    // The row with the gap is dropped; the rest split into the two blobs.
    assert_eq!(view.result.retained_rows, vec![0, 1, 2, 3, 4, 5]);
    let labels = view.result.row_labels(dataset.row_count());
    assert!(labels[6].is_none());
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[3], labels[5]);
    assert_ne!(labels[0], labels[3]);

    let mut sizes = view.result.cluster_sizes();
    sizes.sort();
    assert_eq!(sizes, vec![3, 3]);
}

#[test]
fn selections_survive_a_json_round_trip() {
    let dataset = loader::parse(DEMO_CSV).unwrap();
    let sch = schema::infer(&dataset).unwrap();
    let allowed: BTreeSet<CellValue> =
        [CellValue::Text("B".to_string())].into_iter().collect();
    let selections = UserSelections {
        filter: Some(FilterSpec::members(&dataset, &sch, "category", allowed).unwrap()),
        chart: Some(ChartRequest::Histogram {
            value: "value".to_string(),
            bins: 8,
        }),
        clustering: Some(ClusterRequest {
            columns: vec!["id".to_string(), "value".to_string()],
            k: 2,
        }),
    };

    let json = serde_json::to_string(&selections).unwrap();
    let back: UserSelections = serde_json::from_str(&json).unwrap();
    assert_eq!(back, selections);

    let a = render(&dataset, &selections).unwrap();
    let b = render(&dataset, &back).unwrap();
    assert_eq!(a.table, b.table);
}
