//! iCalendar document parser (RFC 5545).
//!
//! Parses complete iCalendar documents into the component tree.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::{parse_content_line, split_lines};
use super::values::{parse_date, parse_datetime, parse_duration, unescape_text};
use crate::ical::core::{Component, ComponentKind, ContentLine, ICalendar, Property, Value};

/// Properties carrying a single DATE or DATE-TIME.
const DATE_OR_DATETIME: &[&str] = &[
    "DTSTART",
    "DTEND",
    "DUE",
    "RECURRENCE-ID",
    "DTSTAMP",
    "CREATED",
    "LAST-MODIFIED",
];

/// Properties carrying a comma-separated list of DATE or DATE-TIME.
const DATE_LISTS: &[&str] = &["EXDATE", "RDATE"];

/// Properties whose value is a URI unless `VALUE=BINARY` says otherwise.
const URI_PROPERTIES: &[&str] = &["ATTACH", "URL", "ORGANIZER", "ATTENDEE", "TZURL"];

/// Parses an iCalendar document from a string.
///
/// ## Errors
///
/// Returns an error if the input is not valid iCalendar.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<ICalendar> {
    tracing::debug!("Parsing iCalendar document");

    let lines = split_lines(input);

    if lines.is_empty() {
        tracing::warn!("Empty iCalendar input");
        return Err(ParseError::new(ParseErrorKind::MissingBegin, 1, 1));
    }

    tracing::trace!(count = lines.len(), "Split lines");

    let content_lines: Vec<(usize, ContentLine)> = lines
        .into_iter()
        .map(|(line_num, line)| parse_content_line(&line, line_num).map(|cl| (line_num, cl)))
        .collect::<ParseResult<_>>()?;

    let mut iter = content_lines.into_iter();

    let (line_num, first) = iter
        .next()
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingBegin, 1, 1))?;
    if first.name != "BEGIN" || !first.raw_value.eq_ignore_ascii_case("VCALENDAR") {
        tracing::warn!(line = line_num, "Document does not start with BEGIN:VCALENDAR");
        return Err(ParseError::new(ParseErrorKind::MissingBegin, line_num, 1)
            .with_context("expected BEGIN:VCALENDAR"));
    }

    let root = parse_component(&mut iter, line_num, &first.raw_value)?;

    tracing::debug!(
        events = root.children_of_kind(ComponentKind::Event).len(),
        "iCalendar document parsed"
    );

    Ok(ICalendar { root })
}

/// Parses the body of a component whose `BEGIN` line has been consumed.
fn parse_component(
    iter: &mut impl Iterator<Item = (usize, ContentLine)>,
    begin_line_num: usize,
    name: &str,
) -> ParseResult<Component> {
    let mut component = Component::named(name);
    let mut last_line_num = begin_line_num;

    loop {
        let Some((line_num, content_line)) = iter.next() else {
            return Err(ParseError::new(ParseErrorKind::MissingEnd, last_line_num, 1)
                .with_context(format!("missing END:{}", component.name)));
        };
        last_line_num = line_num;

        match content_line.name.as_str() {
            "BEGIN" => {
                let nested = parse_component(iter, line_num, &content_line.raw_value)?;
                component.children.push(nested);
            }
            "END" => {
                let end_name = content_line.raw_value.to_ascii_uppercase();
                if end_name != component.name {
                    return Err(
                        ParseError::new(ParseErrorKind::MismatchedComponent, line_num, 1)
                            .with_context(format!(
                                "expected END:{}, got END:{end_name}",
                                component.name
                            )),
                    );
                }
                return Ok(component);
            }
            _ => {
                let property = parse_property(content_line, line_num)?;
                component.properties.push(property);
            }
        }
    }
}

/// Parses a property from a content line, resolving the value type.
fn parse_property(cl: ContentLine, line_num: usize) -> ParseResult<Property> {
    let value = parse_value(&cl, line_num)?;

    Ok(Property {
        name: cl.name,
        params: cl.params,
        value,
        raw_value: cl.raw_value,
    })
}

fn parse_value(cl: &ContentLine, line_num: usize) -> ParseResult<Value> {
    let raw = cl.raw_value.as_str();
    let col = cl.name.len() + 2;
    let name = cl.name.as_str();
    let value_type = cl.value_type().map(str::to_ascii_uppercase);
    let is_date = |s: &str| match value_type.as_deref() {
        Some("DATE") => true,
        Some(_) => false,
        None => s.len() == 8,
    };

    if DATE_OR_DATETIME.contains(&name) {
        let raw = raw.trim();
        return if is_date(raw) {
            parse_date(raw, line_num, col).map(Value::Date)
        } else {
            parse_datetime(raw, cl.tzid(), line_num, col).map(Value::DateTime)
        };
    }

    if DATE_LISTS.contains(&name) {
        if value_type.as_deref() == Some("PERIOD") {
            return Ok(Value::Unknown(raw.to_string()));
        }
        let items: Vec<&str> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if items.first().copied().is_some_and(is_date) {
            return items
                .into_iter()
                .map(|s| parse_date(s, line_num, col))
                .collect::<ParseResult<_>>()
                .map(Value::DateList);
        }
        return items
            .into_iter()
            .map(|s| parse_datetime(s, cl.tzid(), line_num, col))
            .collect::<ParseResult<_>>()
            .map(Value::DateTimeList);
    }

    match name {
        "DURATION" => parse_duration(raw.trim(), line_num, col).map(Value::Duration),
        "RRULE" | "EXRULE" => Ok(Value::Recur(raw.trim().to_string())),
        _ if URI_PROPERTIES.contains(&name) => {
            if value_type.as_deref() == Some("BINARY") {
                Ok(Value::Binary(raw.to_string()))
            } else {
                Ok(Value::Uri(raw.trim().to_string()))
            }
        }
        "TRIGGER" | "TZOFFSETFROM" | "TZOFFSETTO" | "GEO" | "FREEBUSY" => {
            Ok(Value::Unknown(raw.to_string()))
        }
        _ => Ok(Value::Text(unescape_text(raw))),
    }
}
