//! The `(path, type, value)` sheet format shared by CSV exports and the
//! Sheets values API.

use serde_json::{Map, Value};

use super::coerce::coerce_value;
use super::error::{ContentError, ContentResult};
use super::path::set_path;

const REQUIRED_COLUMNS: [&str; 3] = ["path", "type", "value"];

/// One data row of a content sheet, with missing cells already defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRow {
    pub path: String,
    pub kind: String,
    pub value: String,
}

/// ## Summary
/// Splits CSV text into rows of cells.
///
/// A leading byte-order mark is removed, rows may have different lengths, and
/// rows made of a single blank cell are dropped (the header is always kept).
///
/// ## Errors
/// Returns `ContentError::UnterminatedQuote` if a quoted field is still open
/// at the end of the input and `ContentError::Csv` if the reader rejects it.
pub fn parse_csv_rows(text: &str) -> ContentResult<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if has_open_quote(text) {
        return Err(ContentError::UnterminatedQuote);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let blank = record.len() <= 1 && record.get(0).is_none_or(|cell| cell.trim().is_empty());
        if blank && !rows.is_empty() {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

/// Walks `text` with RFC 4180 quoting: a quote only opens a field at its start
/// and `""` inside a quoted field is an escaped quote.
fn has_open_quote(text: &str) -> bool {
    let mut quoted = false;
    let mut field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    quoted = false;
                }
            }
            continue;
        }
        match c {
            '"' if field_start => {
                quoted = true;
                field_start = false;
            }
            ',' | '\n' | '\r' => field_start = true,
            _ => field_start = false,
        }
    }

    quoted
}

fn cell(row: &[String], at: usize) -> Option<&str> {
    row.get(at).map(String::as_str)
}

/// ## Summary
/// Interprets the first row as a header and returns the data rows.
///
/// ## Errors
/// Returns `ContentError::EmptySheet` when there are no rows and
/// `ContentError::MissingColumns` when the header lacks `path`, `type` or
/// `value`.
pub fn sheet_rows(rows: &[Vec<String>]) -> ContentResult<Vec<ContentRow>> {
    let Some((header, data)) = rows.split_first() else {
        return Err(ContentError::EmptySheet);
    };

    let header: Vec<String> = header
        .iter()
        .map(|cell| cell.trim().to_ascii_lowercase())
        .collect();
    let column = |name: &str| header.iter().position(|cell| cell == name);

    let missing: Vec<&'static str> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|name| column(*name).is_none())
        .collect();
    let (Some(path_at), Some(type_at), Some(value_at)) =
        (column("path"), column("type"), column("value"))
    else {
        return Err(ContentError::MissingColumns(missing));
    };

    Ok(data
        .iter()
        .filter_map(|row| {
            let path = cell(row, path_at).unwrap_or_default().trim();
            if path.is_empty() {
                return None;
            }
            let kind = cell(row, type_at).map(str::trim).unwrap_or_default();
            Some(ContentRow {
                path: path.to_string(),
                kind: (if kind.is_empty() { "string" } else { kind }).to_string(),
                value: cell(row, value_at).unwrap_or_default().to_string(),
            })
        })
        .collect())
}

/// ## Summary
/// Replays sheet rows, header first, into a content document.
///
/// ## Errors
/// Propagates header problems, coercion failures and path conflicts.
#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn content_from_rows(rows: &[Vec<String>]) -> ContentResult<Value> {
    let mut content = Value::Object(Map::new());

    for row in sheet_rows(rows)? {
        let value = coerce_value(&row.kind, &row.value).map_err(|source| ContentError::Coercion {
            path: row.path.clone(),
            kind: row.kind.clone(),
            source,
        })?;
        set_path(&mut content, &row.path, value)?;
    }

    tracing::debug!("Replayed content sheet");
    Ok(content)
}

/// ## Summary
/// Parses a content CSV export into a content document.
///
/// ## Errors
/// See [`parse_csv_rows`] and [`content_from_rows`].
pub fn content_from_csv(text: &str) -> ContentResult<Value> {
    content_from_rows(&parse_csv_rows(text)?)
}
