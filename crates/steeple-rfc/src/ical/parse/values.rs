//! Value type parsers for iCalendar (RFC 5545 §3.3).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::ical::core::DateTime;

/// Parses a DATE value (RFC 5545 §3.3.4).
///
/// Format: YYYYMMDD (e.g., "19970714")
///
/// ## Errors
/// Returns an error if the string is not a valid calendar date.
pub fn parse_date(s: &str, line: usize, col: usize) -> ParseResult<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(ParseErrorKind::InvalidDate, line, col).with_context(s));
    }

    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| ParseError::new(ParseErrorKind::InvalidDate, line, col).with_context(e.to_string()))
}

/// Parses a TIME value (RFC 5545 §3.3.12), returning the time and whether it
/// carried the UTC designator.
///
/// ## Errors
/// Returns an error if the string is not a valid 6-digit time.
fn parse_time(s: &str, line: usize, col: usize) -> ParseResult<(NaiveTime, bool)> {
    let (digits, is_utc) = match s.strip_suffix(['Z', 'z']) {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };

    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(ParseErrorKind::InvalidTime, line, col).with_context(s));
    }

    // Leap second 60 is clamped to 59; chrono has no representation for it here.
    let normalized = if &digits[4..6] == "60" {
        format!("{}59", &digits[..4])
    } else {
        digits.to_string()
    };

    let time = NaiveTime::parse_from_str(&normalized, "%H%M%S")
        .map_err(|e| ParseError::new(ParseErrorKind::InvalidTime, line, col).with_context(e.to_string()))?;
    Ok((time, is_utc))
}

/// Parses a DATE-TIME value (RFC 5545 §3.3.5).
///
/// Format: YYYYMMDD"T"HHMMSS[Z] (e.g., "19970714T133000Z")
///
/// A trailing `Z` wins over any `TZID` parameter.
///
/// ## Errors
/// Returns an error if the string is not a valid datetime format.
pub fn parse_datetime(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateTime> {
    let (date_str, time_str) = s
        .split_once(['T', 't'])
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidDateTime, line, col).with_context(s))?;

    let date = parse_date(date_str, line, col)?;
    let (time, is_utc) = parse_time(time_str, line, col + date_str.len() + 1)?;
    let local = NaiveDateTime::new(date, time);

    Ok(match (is_utc, tzid) {
        (true, _) => DateTime::utc(local),
        (false, Some(tz)) => DateTime::zoned(local, tz),
        (false, None) => DateTime::floating(local),
    })
}

/// Parses a DURATION value (RFC 5545 §3.3.6).
///
/// Format: [+|-]P[nW] or [+|-]P[nD][T[nH][nM][nS]]
///
/// ## Errors
/// Returns an error if the string is not a valid duration format.
pub fn parse_duration(s: &str, line: usize, col: usize) -> ParseResult<TimeDelta> {
    let invalid = || ParseError::new(ParseErrorKind::InvalidDuration, line, col).with_context(s);

    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let rest = rest.strip_prefix('P').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = TimeDelta::zero();
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;
    let mut saw_time_component = false;

    for c in rest.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        if c == 'T' {
            if in_time || !number.is_empty() {
                return Err(invalid());
            }
            in_time = true;
            continue;
        }

        let n = number.parse::<i64>().ok().ok_or_else(invalid)?;
        number.clear();
        let part = match (c, in_time) {
            ('W', false) => TimeDelta::try_weeks(n),
            ('D', false) => TimeDelta::try_days(n),
            ('H', true) => TimeDelta::try_hours(n),
            ('M', true) => TimeDelta::try_minutes(n),
            ('S', true) => TimeDelta::try_seconds(n),
            _ => None,
        }
        .ok_or_else(invalid)?;
        total = total.checked_add(&part).ok_or_else(invalid)?;
        saw_component = true;
        saw_time_component |= in_time;
    }

    if !number.is_empty() || !saw_component || (in_time && !saw_time_component) {
        return Err(invalid());
    }

    Ok(if negative { -total } else { total })
}

/// Unescapes text values (RFC 5545 §3.3.11).
///
/// Escape sequences: \\ \, \; \n \N
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n' | 'N') => result.push('\n'),
                Some(',') => result.push(','),
                Some(';') => result.push(';'),
                Some('\\') | None => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
