use std::path::Path;

use crate::data::model::{CellValue, Column, Dataset};
use crate::error::{Error, Result};

/// UTF-8 byte-order mark. Written on export so spreadsheet tools pick the
/// right encoding; stripped on load.
const BOM: &[u8] = b"\xef\xbb\xbf";

/// Delimiters the sniffer considers. Ties go to the comma, listed last.
const CANDIDATE_DELIMITERS: [u8; 4] = [b'|', b'\t', b';', b','];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse delimited UTF-8 bytes into a [`Dataset`].
///
/// Tolerates a leading byte-order mark and sniffs the delimiter from the
/// header line. The first row is always the header; every following field
/// goes through [`CellValue::from_input`], so numeric-looking fields become
/// numbers and empty fields become missing. A header-only file yields a
/// zero-row dataset.
pub fn parse(bytes: &[u8]) -> Result<Dataset> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::Parse("file is not valid UTF-8".to_string()))?;

    let header_line = text.lines().next().unwrap_or("");
    if header_line.trim().is_empty() {
        return Err(Error::Parse("file has no header row".to_string()));
    }
    let delimiter = sniff_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut columns: Vec<Column> = reader
        .headers()?
        .iter()
        .map(|name| Column::new(name.trim(), Vec::new()))
        .collect();

    for record in reader.records() {
        // The csv reader rejects rows whose field count differs from the
        // header's, with the row position in the message.
        let record = record?;
        for (col, field) in columns.iter_mut().zip(record.iter()) {
            col.values.push(CellValue::from_input(field));
        }
    }

    let dataset = Dataset::from_columns(columns)?;
    log::info!(
        "parsed {} rows x {} columns (delimiter {:?})",
        dataset.row_count(),
        dataset.column_count(),
        delimiter as char
    );
    Ok(dataset)
}

/// Pick the candidate delimiter that occurs most often in the header line.
fn sniff_delimiter(header: &str) -> u8 {
    CANDIDATE_DELIMITERS
        .into_iter()
        .max_by_key(|&d| header.matches(d as char).count())
        .unwrap_or(b',')
}

/// Read and parse a delimited file from disk.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Parse(format!("could not read {}: {e}", path.display())))?;
    parse(&bytes)
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize a dataset to delimited bytes.
///
/// Output is UTF-8 with a leading BOM, comma-separated, header row first.
/// Missing cells become empty fields, so the output parses back to the
/// same dataset. No synthetic index column is added.
pub fn serialize(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.column_names())?;

    for row in 0..dataset.row_count() {
        let fields: Vec<String> = dataset
            .columns()
            .iter()
            .map(|col| match &col.values[row] {
                CellValue::Missing => String::new(),
                value => value.to_string(),
            })
            .collect();
        writer.write_record(&fields)?;
    }

    let inner = writer
        .into_inner()
        .map_err(|e| Error::Parse(format!("could not flush csv writer: {e}")))?;

    let mut bytes = Vec::with_capacity(BOM.len() + inner.len());
    bytes.extend_from_slice(BOM);
    bytes.extend_from_slice(&inner);
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_comma_csv() {
        let ds = parse(b"id,city\n1,Taipei\n2,Kaohsiung\n").unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.row(0)[0], &CellValue::Number(1.0));
        assert_eq!(ds.row(1)[1], &CellValue::Text("Kaohsiung".to_string()));
    }

    #[test]
    fn strips_byte_order_mark() {
        let ds = parse(b"\xef\xbb\xbfid,v\n1,2\n").unwrap();
        assert_eq!(ds.column_names().next(), Some("id"));
    }

    #[test]
    fn sniffs_semicolon_and_tab() {
        let ds = parse(b"a;b;c\n1;2;3\n").unwrap();
        assert_eq!(ds.column_count(), 3);
        let ds = parse(b"a\tb\n1\tx\n").unwrap();
        assert_eq!(ds.column_count(), 2);
    }

    #[test]
    fn comma_wins_delimiter_ties() {
        assert_eq!(sniff_delimiter("a,b;c"), b',');
        assert_eq!(sniff_delimiter("plain"), b',');
    }

    #[test]
    fn empty_fields_become_missing() {
        let ds = parse(b"a,b\n1,\n,x\n").unwrap();
        assert_eq!(ds.row(0)[1], &CellValue::Missing);
        assert_eq!(ds.row(1)[0], &CellValue::Missing);
    }

    #[test]
    fn header_only_file_gives_zero_rows() {
        let ds = parse(b"a,b\n").unwrap();
        assert_eq!(ds.row_count(), 0);
        assert_eq!(ds.column_count(), 2);
    }

    #[test]
    fn rejects_empty_input_and_ragged_rows() {
        assert!(parse(b"").is_err());
        assert!(matches!(parse(b"a,b\n1\n"), Err(Error::Parse(_))));
    }

    #[test]
    fn rejects_duplicate_headers() {
        assert!(matches!(parse(b"a,a\n1,2\n"), Err(Error::Parse(_))));
    }

    #[test]
    fn rejects_undecodable_bytes() {
        assert!(matches!(
            parse(b"id,city\n1,\xff\xfe\n"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn serialized_output_has_bom_and_round_trips() {
        let original = parse(b"id,city,score\n1,Taipei,0.5\n2,,\n").unwrap();
        let bytes = serialize(&original).unwrap();
        assert!(bytes.starts_with(BOM));
        let reparsed = parse(&bytes).unwrap();
        assert_eq!(reparsed, original);
    }
}
