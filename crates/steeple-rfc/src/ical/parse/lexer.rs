//! Unfolding and content-line tokenizing (RFC 5545 §3.1).
//!
//! Tolerant of what real feeds do: bare LF endings, a leading BOM, and
//! folds that lost their leading space.

use std::iter::Peekable;
use std::str::CharIndices;

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::ical::core::{ContentLine, Parameter};

type Chars<'a> = Peekable<CharIndices<'a>>;

/// ## Summary
/// Unfolds `input` into logical lines, each tagged with the 1-based number
/// of the physical line it started on.
///
/// A line starting with SP or HTAB continues the previous one, minus that
/// first character. A line without any `:` cannot be a property, so it is
/// appended to the previous line as-is.
#[must_use]
pub fn split_lines(input: &str) -> Vec<(usize, String)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (number, line) in input
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .enumerate()
        .map(|(i, l)| (i + 1, l))
    {
        if line.is_empty() {
            continue;
        }

        let continuation = line
            .strip_prefix([' ', '\t'])
            .or_else(|| (!line.contains(':')).then_some(line));

        match (continuation, lines.last_mut()) {
            (Some(rest), Some((_, previous))) => previous.push_str(rest),
            (Some(rest), None) => lines.push((number, rest.to_string())),
            (None, _) => lines.push((number, line.to_string())),
        }
    }

    lines
}

/// Consumes an identifier (`ALPHA / DIGIT / "-"`) up to the first
/// terminator, returning the terminator and its byte index.
fn scan_name(
    chars: &mut Chars<'_>,
    terminators: &[char],
    invalid: ParseErrorKind,
    line_num: usize,
) -> ParseResult<Option<(usize, char)>> {
    for (i, c) in chars.by_ref() {
        if terminators.contains(&c) {
            return Ok(Some((i, c)));
        }
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(ParseError::new(invalid, line_num, i + 1));
        }
    }
    Ok(None)
}

/// ## Summary
/// Splits one logical line into `name *(";" param) ":" value`.
///
/// ## Errors
/// Returns a `ParseError` for an empty or invalid name, a malformed
/// parameter, an unclosed quote, or a missing `:`.
pub fn parse_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let missing_colon = || ParseError::new(ParseErrorKind::MissingColon, line_num, line.len());
    let mut chars = line.char_indices().peekable();

    let (name_end, terminator) = scan_name(
        &mut chars,
        &[';', ':'],
        ParseErrorKind::InvalidPropertyName,
        line_num,
    )?
    .ok_or_else(missing_colon)?;
    if name_end == 0 {
        return Err(ParseError::new(ParseErrorKind::MissingPropertyName, line_num, 1));
    }

    let mut params = Vec::new();
    let mut colon_pos = (terminator == ':').then_some(name_end);
    while colon_pos.is_none() {
        let (param, colon) = parse_parameter(&mut chars, line, line_num)?;
        params.push(param);
        colon_pos = colon;
    }
    let colon_pos = colon_pos.ok_or_else(missing_colon)?;

    Ok(ContentLine {
        name: line[..name_end].to_ascii_uppercase(),
        params,
        raw_value: line[colon_pos + 1..].to_string(),
    })
}

/// Reads one `NAME=value[,value...]` parameter.
///
/// Also returns the byte index of the `:` when this was the last parameter.
fn parse_parameter(
    chars: &mut Chars<'_>,
    line: &str,
    line_num: usize,
) -> ParseResult<(Parameter, Option<usize>)> {
    let start = chars.peek().map_or(line.len(), |&(i, _)| i);

    let name_end = match scan_name(chars, &['='], ParseErrorKind::InvalidParameter, line_num)? {
        Some((end, _)) if end > start => end,
        _ => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidParameter,
                line_num,
                start + 1,
            ));
        }
    };
    let name = &line[start..name_end];

    let mut values = Vec::new();
    loop {
        values.push(parse_param_value(chars, line_num)?);

        match chars.next() {
            Some((_, ',')) => {}
            Some((_, ';')) => return Ok((Parameter::with_values(name, values), None)),
            Some((i, ':')) => return Ok((Parameter::with_values(name, values), Some(i))),
            Some((i, c)) => {
                return Err(
                    ParseError::new(ParseErrorKind::InvalidParameter, line_num, i + 1)
                        .with_context(format!("unexpected character '{c}'")),
                );
            }
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingColon,
                    line_num,
                    line.len(),
                ));
            }
        }
    }
}

/// Parses a parameter value, quoted or not.
///
/// Quoted values may contain `;`, `:` and `,`, and honour RFC 6868 caret
/// escapes (`^^`, `^n`, `^'`).
fn parse_param_value(chars: &mut Chars<'_>, line_num: usize) -> ParseResult<String> {
    let mut value = String::new();

    if let Some(&(start, '"')) = chars.peek() {
        chars.next();
        while let Some((_, c)) = chars.next() {
            match c {
                '"' => return Ok(value),
                '^' => match chars.peek() {
                    Some(&(_, '^')) => {
                        value.push('^');
                        chars.next();
                    }
                    Some(&(_, 'n')) => {
                        value.push('\n');
                        chars.next();
                    }
                    Some(&(_, '\'')) => {
                        value.push('"');
                        chars.next();
                    }
                    _ => value.push('^'),
                },
                other => value.push(other),
            }
        }
        return Err(ParseError::new(
            ParseErrorKind::UnclosedQuote,
            line_num,
            start + 1,
        ));
    }

    while let Some(&(_, c)) = chars.peek() {
        if matches!(c, ',' | ';' | ':') {
            break;
        }
        value.push(c);
        chars.next();
    }

    Ok(value)
}
