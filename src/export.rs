//! CSV export and import.
//!
//! Raw records are written with one column per top-level field, in the order
//! fields are first seen. Typed rows go through serde like any other CSV.

use crate::error::{OptionExt, Result};
use crate::work::{AuthorRef, Record};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Longest file stem produced by [`sanitize_file_name`]
pub const MAX_NAME_LEN: usize = 31;

/// Create `<base>/<timestamp>_<label>` and return its path.
pub fn output_folder(base: &Path, label: &str) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let folder = base.join(format!("{}_{}", timestamp, sanitize_file_name(label)));
    std::fs::create_dir_all(&folder)?;
    Ok(folder)
}

/// Reduce a display name to a safe file stem of at most [`MAX_NAME_LEN`] chars.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect::<String>()
        .trim()
        .replace(' ', "_");

    let truncated: String = cleaned.chars().take(MAX_NAME_LEN).collect();
    if truncated.is_empty() {
        "unnamed".to_string()
    } else {
        truncated
    }
}

/// Union of top-level keys across records, in first-seen order.
pub fn record_columns(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    columns
}

/// Render one field value as a CSV cell.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Write raw records, one row each. Returns the number of rows written.
pub fn write_records(path: &Path, records: &[Record]) -> Result<usize> {
    let columns = record_columns(records);
    let rows = records
        .iter()
        .map(|record| columns.iter().map(|c| cell(record.get(c))).collect::<Vec<String>>());
    write_rows(path, &columns, rows)
}

/// Write pre-rendered rows under the given headers.
pub fn write_rows<I>(path: &Path, headers: &[String], rows: I) -> Result<usize>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(headers)?;

    let mut written = 0;
    for row in rows {
        wtr.write_record(&row)?;
        written += 1;
    }

    wtr.flush()?;
    info!(path = %path.display(), rows = written, "Saved CSV");
    Ok(written)
}

/// Save serializable rows to a CSV file with headers.
///
/// Nothing is written for an empty slice.
pub fn save_csv<T: Serialize>(path: &Path, data: &[T]) -> Result<()> {
    if data.is_empty() {
        info!(path = %path.display(), "No data to save");
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    for item in data {
        wtr.serialize(item)?;
    }

    wtr.flush()?;
    info!(path = %path.display(), rows = data.len(), "Saved CSV");
    Ok(())
}

/// Read every value of `column`, skipping empty cells.
pub fn read_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let index = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_parse(&format!("{} has no '{}' column", path.display(), column))?;

    let mut values = Vec::new();
    for row in rdr.records() {
        if let Some(value) = row?.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

/// Work ids from the `id` column of a works CSV.
pub fn read_work_ids(path: &Path) -> Result<Vec<String>> {
    read_column(path, "id")
}

/// Authors from an `author_name`,`author_url` CSV.
pub fn read_authors(path: &Path) -> Result<Vec<AuthorRef>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut authors = Vec::new();
    for row in rdr.deserialize() {
        let author: AuthorRef = row?;
        authors.push(author);
    }
    Ok(authors)
}
