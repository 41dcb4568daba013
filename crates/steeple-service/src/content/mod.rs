//! Site content: bundled JSON, a JSON endpoint, or a spreadsheet of
//! `(path, type, value)` rows replayed into a nested document.

mod coerce;
mod error;
mod path;
mod resolver;
mod sheet;
mod source;

pub use coerce::{CoercionError, coerce_value};
pub use error::{ContentError, ContentResult};
pub use path::{PathToken, lookup_path, set_path, tokenize_path};
pub use resolver::{ContentResolver, SiteContent};
pub use sheet::{ContentRow, content_from_csv, content_from_rows, parse_csv_rows, sheet_rows};
pub use source::{ContentSource, resolve_content_source};
