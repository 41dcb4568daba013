//! Recurrence iteration over the `rrule` crate.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use super::timezone::convert_to_utc_lenient;

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Error during recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpansionError {
    /// The rule engine rejected the assembled rule set.
    #[error("Failed to parse recurrence rule: {0}")]
    InvalidRule(String),
}

/// A recurring series ready to be walked in chronological order.
///
/// The series is anchored at the original `DTSTART` expressed in the series
/// zone, so wall-clock times survive DST transitions. `DTSTART` itself is
/// always the first instance unless an `EXDATE` removes it.
#[derive(Debug, Clone)]
pub struct OccurrenceRule {
    set: RRuleSet,
}

impl OccurrenceRule {
    /// ## Summary
    /// Builds a rule set from an optional `RRULE` value plus explicit
    /// inclusions (`RDATE`) and exclusions (`EXDATE`).
    ///
    /// `DTSTART` is the first of a rule's `COUNT` instances even when it
    /// falls off the rule's pattern.
    ///
    /// Date-only `UNTIL` values become the last second of that day in UTC;
    /// local `UNTIL` values are converted from `zone`.
    ///
    /// ## Errors
    ///
    /// Returns `ExpansionError::InvalidRule` if the rule engine rejects the
    /// rule text.
    pub fn new(
        rrule: Option<&str>,
        dtstart: DateTime<Utc>,
        zone: Tz,
        exdates: &[DateTime<Utc>],
        rdates: &[DateTime<Utc>],
    ) -> Result<Self, ExpansionError> {
        let rrule = match rrule {
            Some(rule) => count_from_dtstart(rule, dtstart, zone)?,
            None => None,
        };
        let text = rule_set_text(rrule.as_deref(), dtstart, zone, exdates, rdates);
        tracing::trace!(rule_set = %text, "Assembled recurrence rule set");

        let set = text
            .parse::<RRuleSet>()
            .map_err(|e| ExpansionError::InvalidRule(e.to_string()))?;

        Ok(Self { set })
    }

    /// ## Summary
    /// Lets the rule engine skip instances strictly before `instant`.
    ///
    /// Callers still filter; this only shortens the walk for long-running
    /// series.
    #[must_use]
    pub fn starting_at(self, instant: DateTime<Utc>) -> Self {
        let tz: rrule::Tz = Utc.into();
        let after = (instant - TimeDelta::seconds(1)).with_timezone(&tz);
        Self {
            set: self.set.after(after),
        }
    }

    /// Iterates occurrence starts in ascending order, without duplicates.
    pub fn occurrences(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let mut last = None;
        (&self.set)
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            .filter(move |dt| {
                let fresh = last != Some(*dt);
                last = Some(*dt);
                fresh
            })
    }
}

fn dtstart_line(dtstart: DateTime<Utc>, zone: Tz) -> String {
    if zone == Tz::UTC {
        format!("DTSTART:{}", dtstart.format(UTC_FORMAT))
    } else {
        format!(
            "DTSTART;TZID={}:{}",
            zone.name(),
            dtstart.with_timezone(&zone).format("%Y%m%dT%H%M%S")
        )
    }
}

/// The rule engine only yields `DTSTART` when it matches the pattern, while
/// the inclusion `RDATE` always yields it. When `DTSTART` is off-pattern and
/// the rule is counted, one instance of the count is handed to that `RDATE`.
fn count_from_dtstart(
    rule: &str,
    dtstart: DateTime<Utc>,
    zone: Tz,
) -> Result<Option<String>, ExpansionError> {
    let Some(count) = rule_count(rule) else {
        return Ok(Some(rule.to_string()));
    };

    let text = format!("{}\nRRULE:{}", dtstart_line(dtstart, zone), normalize_until(rule, zone));
    let set = text
        .parse::<RRuleSet>()
        .map_err(|e| ExpansionError::InvalidRule(e.to_string()))?;
    let first = (&set).into_iter().next().map(|dt| dt.with_timezone(&Utc));

    if first == Some(dtstart) {
        return Ok(Some(rule.to_string()));
    }
    Ok((count > 1).then(|| with_count(rule, count - 1)))
}

fn rule_count(rule: &str) -> Option<u32> {
    rule.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("COUNT") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn with_count(rule: &str, count: u32) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, _)) if key.trim().eq_ignore_ascii_case("COUNT") => format!("COUNT={count}"),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn rule_set_text(
    rrule: Option<&str>,
    dtstart: DateTime<Utc>,
    zone: Tz,
    exdates: &[DateTime<Utc>],
    rdates: &[DateTime<Utc>],
) -> String {
    let mut lines = Vec::with_capacity(4);
    lines.push(dtstart_line(dtstart, zone));

    if let Some(rule) = rrule {
        lines.push(format!("RRULE:{}", normalize_until(rule, zone)));
    }

    let inclusions: Vec<String> = std::iter::once(dtstart)
        .chain(rdates.iter().copied())
        .map(|dt| dt.format(UTC_FORMAT).to_string())
        .collect();
    lines.push(format!("RDATE:{}", inclusions.join(",")));

    if !exdates.is_empty() {
        let exclusions: Vec<String> = exdates
            .iter()
            .map(|dt| dt.format(UTC_FORMAT).to_string())
            .collect();
        lines.push(format!("EXDATE:{}", exclusions.join(",")));
    }

    lines.join("\n")
}

/// ## Summary
/// Rewrites the `UNTIL` part of a rule into the UTC form the rule engine
/// accepts alongside a zoned `DTSTART`.
///
/// `UNTIL=20260630` becomes `UNTIL=20260630T235959Z`; a local
/// `UNTIL=20260630T100000` is read in `zone`. Other parts are untouched.
#[must_use]
pub fn normalize_until(rule: &str, zone: Tz) -> String {
    rule.trim()
        .split(';')
        .map(|part| {
            let Some((key, value)) = part.split_once('=') else {
                return part.to_string();
            };
            if !key.trim().eq_ignore_ascii_case("UNTIL") {
                return part.to_string();
            }

            let value = value.trim();
            if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
                return format!("UNTIL={value}T235959Z");
            }
            if !value.ends_with(['Z', 'z'])
                && let Ok(local) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
                && let Ok(utc) = convert_to_utc_lenient(local, zone)
            {
                return format!("UNTIL={}", utc.format(UTC_FORMAT));
            }
            format!("UNTIL={value}")
        })
        .collect::<Vec<_>>()
        .join(";")
}
