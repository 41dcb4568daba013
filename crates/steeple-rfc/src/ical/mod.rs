//! iCalendar RFC 5545 reading support.
//!
//! - `core`: component tree, properties, parameters and typed values
//! - `parse`: content-line lexer and document parser
//! - `expand`: timezone resolution and recurrence iteration
//!
//! ## Example
//!
//! ```rust
//! use steeple_rfc::ical::parse;
//!
//! let input = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:a\r\nDTSTART:20260104T100000Z\r\nSUMMARY:Morning Prayer\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
//! let ical = parse(input).expect("valid calendar");
//! assert_eq!(ical.events()[0].summary(), Some("Morning Prayer"));
//! ```

pub mod core;
pub mod expand;
pub mod parse;

pub use core::{Component, ComponentKind, DateTime, DateTimeForm, ICalendar, Parameter, Property, Value};
pub use parse::{ParseError, ParseErrorKind, ParseResult, parse};
