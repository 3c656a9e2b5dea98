use log::debug;

use super::model::{FieldValue, Record, RecordSet};
use crate::error::ParseError;

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Parse comma-separated text into a [`RecordSet`].
///
/// Layout: the first non-blank row is the header, every following row maps
/// positionally onto it.
///
/// * Header names and cells are trimmed; blank cells are absent.
/// * Rows shorter than the header leave the trailing fields absent.
/// * Blank rows (including rows of only separators) are skipped.
/// * RFC-4180 quoting is honoured, so quoted commas and newlines are data.
/// * A row with more non-empty cells than header columns is rejected.
pub fn parse(text: &str) -> Result<RecordSet, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();

    let columns = loop {
        let Some(result) = rows.next() else {
            return Err(ParseError::MissingHeader);
        };
        let row = result?;
        let width = used_width(&row);
        if width > 0 {
            break parse_header(&row, width)?;
        }
    };

    let mut records = Vec::new();
    for result in rows {
        let row = result?;
        let width = used_width(&row);
        if width == 0 {
            continue;
        }
        if width > columns.len() {
            return Err(ParseError::TooManyFields {
                line: row.position().map_or(0, |p| p.line()),
                expected: columns.len(),
                found: width,
            });
        }

        let mut record = Record::new();
        for (name, cell) in columns.iter().zip(row.iter()) {
            if let Some(value) = FieldValue::from_cell(cell) {
                record.insert(name.clone(), value);
            }
        }
        records.push(record);
    }

    debug!("parsed {} CSV records over {} columns", records.len(), columns.len());
    Ok(RecordSet::with_columns(columns, records))
}

/// Number of cells up to and including the last non-empty one.
fn used_width(row: &csv::StringRecord) -> usize {
    (0..row.len())
        .rev()
        .find(|&i| !row[i].is_empty())
        .map_or(0, |i| i + 1)
}

fn parse_header(row: &csv::StringRecord, width: usize) -> Result<Vec<String>, ParseError> {
    let mut names: Vec<String> = Vec::with_capacity(width);
    for (index, name) in row.iter().take(width).enumerate() {
        if name.is_empty() {
            return Err(ParseError::EmptyColumn { index });
        }
        if names.iter().any(|n| n == name) {
            return Err(ParseError::DuplicateColumn(name.to_string()));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

/// Serialize `set` as CSV in its column order. Absent values become empty cells.
///
/// A record with no value in any column would be written as a blank row, which
/// [`parse`] skips, so it is rejected with [`ParseError::EmptyRecord`].
pub fn to_csv_string(set: &RecordSet) -> Result<String, ParseError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(set.columns())?;

    for (index, record) in set.iter().enumerate() {
        if !set.columns().iter().any(|column| record.get(column).is_some()) {
            return Err(ParseError::EmptyRecord { index });
        }
        let row = set.columns().iter().map(|column| {
            record
                .get(column)
                .map(|value| value.to_string())
                .unwrap_or_default()
        });
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
