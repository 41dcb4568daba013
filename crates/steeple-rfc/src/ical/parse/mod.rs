//! iCalendar parsing (RFC 5545).

mod error;
mod lexer;
mod parser;
mod values;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use parser::parse;
pub use values::unescape_text;
