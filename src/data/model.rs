use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell in a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Interpret one raw field from a file or an edit box.
    ///
    /// An empty field (after trimming) is [`CellValue::Missing`]. A field
    /// that parses as `f64` is [`CellValue::Number`], except `NaN`, which is
    /// read as a missing-value marker. Everything else stays text.
    pub fn from_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_nan() => CellValue::Missing,
            Ok(v) => CellValue::Number(v),
            Err(_) => CellValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Missing => 0,
                Number(_) => 1,
                Text(_) => 2,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Number(v) => v.to_bits().hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Missing => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Missing => write!(f, "<missing>"),
        }
    }
}

// -- Serde: cells map to plain JSON scalars, not tagged variants --

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Number(v) => serializer.serialize_f64(*v),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Missing => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number, a string, or null")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
                Ok(if v.is_nan() {
                    CellValue::Missing
                } else {
                    CellValue::Number(v)
                })
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
                Ok(CellValue::Text(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Missing)
            }

            fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Missing)
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

// ---------------------------------------------------------------------------
// Column – one named sequence of cells
// ---------------------------------------------------------------------------

/// A named column: cells in row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    /// Build a column by running raw fields through [`CellValue::from_input`].
    pub fn from_inputs<I, S>(name: impl Into<String>, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = raw
            .into_iter()
            .map(|field| CellValue::from_input(field.as_ref()))
            .collect();
        Column::new(name, values)
    }

    /// Sorted set of distinct values, missing included when present.
    pub fn distinct_values(&self) -> BTreeSet<CellValue> {
        self.values.iter().cloned().collect()
    }

    /// Non-missing numeric values in row order.
    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(CellValue::as_number)
    }

    /// Observed (min, max) over the numeric cells, if there are any.
    /// `NaN` cells (constructible by hand, never by parsing) contribute
    /// nothing, keeping the bounds well ordered.
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for v in self.numbers().filter(|v| !v.is_nan()) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete working table
// ---------------------------------------------------------------------------

/// An ordered collection of equally long, uniquely named columns.
///
/// A `Dataset` is immutable once built: filtering and editing produce new
/// values instead of mutating in place, so derived views never alias a
/// table that changed under them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset, checking the column invariants: names unique,
    /// lengths equal.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::Parse(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }
        if let Some(first) = columns.first() {
            let rows = first.values.len();
            for col in &columns[1..] {
                if col.values.len() != rows {
                    return Err(Error::Parse(format!(
                        "column '{}' has {} rows, expected {}",
                        col.name,
                        col.values.len(),
                        rows
                    )));
                }
            }
        }
        Ok(Dataset { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// The cells of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.values[row]).collect()
    }

    /// New dataset keeping exactly the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let values = indices.iter().map(|&i| col.values[i].clone()).collect();
                Column::new(col.name.clone(), values)
            })
            .collect();
        Dataset { columns }
    }

    /// The first `n` rows (or fewer, if the dataset is shorter).
    pub fn head(&self, n: usize) -> Dataset {
        let indices: Vec<usize> = (0..self.row_count().min(n)).collect();
        self.take_rows(&indices)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_input_classifies_fields() {
        assert_eq!(CellValue::from_input("3.5"), CellValue::Number(3.5));
        assert_eq!(CellValue::from_input(" -2 "), CellValue::Number(-2.0));
        assert_eq!(CellValue::from_input("1e3"), CellValue::Number(1000.0));
        assert_eq!(
            CellValue::from_input("inf"),
            CellValue::Number(f64::INFINITY)
        );
        assert_eq!(
            CellValue::from_input("-inf"),
            CellValue::Number(f64::NEG_INFINITY)
        );
        assert_eq!(
            CellValue::from_input("Taipei"),
            CellValue::Text("Taipei".to_string())
        );
        assert_eq!(CellValue::from_input(""), CellValue::Missing);
        assert_eq!(CellValue::from_input("   "), CellValue::Missing);
        assert_eq!(CellValue::from_input("NaN"), CellValue::Missing);
    }

    #[test]
    fn ordering_is_total_and_by_kind() {
        let mut values = vec![
            CellValue::Text("b".to_string()),
            CellValue::Number(2.0),
            CellValue::Missing,
            CellValue::Number(-1.0),
            CellValue::Text("a".to_string()),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                CellValue::Missing,
                CellValue::Number(-1.0),
                CellValue::Number(2.0),
                CellValue::Text("a".to_string()),
                CellValue::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn display_formats_cells() {
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Number(10.0).to_string(), "10");
        assert_eq!(CellValue::Text("x".to_string()).to_string(), "x");
        assert_eq!(CellValue::Missing.to_string(), "<missing>");
    }

    #[test]
    fn from_columns_rejects_duplicate_names() {
        let result = Dataset::from_columns(vec![
            Column::from_inputs("a", ["1"]),
            Column::from_inputs("a", ["2"]),
        ]);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn from_columns_rejects_unequal_lengths() {
        let result = Dataset::from_columns(vec![
            Column::from_inputs("a", ["1", "2"]),
            Column::from_inputs("b", ["1"]),
        ]);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn numeric_range_ignores_nan_cells() {
        let column = Column::new(
            "x",
            vec![
                CellValue::Number(f64::NAN),
                CellValue::Number(4.0),
                CellValue::Number(1.0),
            ],
        );
        assert_eq!(column.numeric_range(), Some((1.0, 4.0)));

        let only_nan = Column::new("y", vec![CellValue::Number(f64::NAN)]);
        assert_eq!(only_nan.numeric_range(), None);
    }

    #[test]
    fn take_rows_keeps_order_and_identity() {
        let dataset = Dataset::from_columns(vec![
            Column::from_inputs("id", ["1", "2", "3", "4"]),
            Column::from_inputs("city", ["T", "K", "T", "H"]),
        ])
        .unwrap();
        let picked = dataset.take_rows(&[3, 1]);
        assert_eq!(picked.row_count(), 2);
        assert_eq!(picked.row(0)[0], &CellValue::Number(4.0));
        assert_eq!(picked.row(1)[1], &CellValue::Text("K".to_string()));
    }

    #[test]
    fn head_clamps_to_row_count() {
        let dataset =
            Dataset::from_columns(vec![Column::from_inputs("a", ["1", "2"])]).unwrap();
        assert_eq!(dataset.head(10).row_count(), 2);
        assert_eq!(dataset.head(1).row_count(), 1);
    }

    #[test]
    fn cell_json_round_trip() {
        let json = serde_json::to_string(&vec![
            CellValue::Number(1.5),
            CellValue::Text("a".to_string()),
            CellValue::Missing,
        ])
        .unwrap();
        assert_eq!(json, r#"[1.5,"a",null]"#);
        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0], CellValue::Number(1.5));
        assert_eq!(back[2], CellValue::Missing);
    }
}
