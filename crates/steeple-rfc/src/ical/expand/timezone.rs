//! Timezone resolution and UTC conversion for iCalendar date-times.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ical::core::{self, DateTimeForm};

/// Error during timezone conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Unknown or invalid timezone identifier.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Non-existent time during DST gap.
    #[error("Non-existent time (DST gap): {0}")]
    NonExistentTime(String),
}

/// Windows zone names seen in Outlook/Exchange exports, mapped to IANA.
const WINDOWS_ZONES: &[(&str, &str)] = &[
    ("GMT Standard Time", "Europe/London"),
    ("Greenwich Standard Time", "Atlantic/Reykjavik"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("Central European Standard Time", "Europe/Warsaw"),
    ("E. Europe Standard Time", "Europe/Chisinau"),
    ("FLE Standard Time", "Europe/Kyiv"),
    ("GTB Standard Time", "Europe/Bucharest"),
    ("Irish Standard Time", "Europe/Dublin"),
    ("Eastern Standard Time", "America/New_York"),
    ("Central Standard Time", "America/Chicago"),
    ("Mountain Standard Time", "America/Denver"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("UTC", "UTC"),
    ("Coordinated Universal Time", "UTC"),
];

/// Resolver for timezone identifiers.
///
/// Caches resolved zones by the TZID exactly as written in the feed.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    cache: HashMap<String, Tz>,
}

impl TimeZoneResolver {
    /// Creates a new timezone resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// Vendor prefixes and common Windows zone names are mapped to their IANA
    /// equivalents first.
    ///
    /// ## Errors
    ///
    /// Returns `ConversionError::UnknownTimezone` if the TZID cannot be resolved.
    pub fn resolve(&mut self, tzid: &str) -> Result<Tz, ConversionError> {
        if let Some(tz) = self.cache.get(tzid) {
            return Ok(*tz);
        }

        let normalized = normalize_tzid(tzid);
        let tz = Tz::from_str(normalized)
            .map_err(|_e| ConversionError::UnknownTimezone(tzid.to_string()))?;

        self.cache.insert(tzid.to_string(), tz);

        Ok(tz)
    }

    /// ## Summary
    /// Returns the zone a DATE-TIME should be read in: its declared `TZID`
    /// when that resolves, otherwise `default`.
    ///
    /// UTC values report `default`, since that is the zone they are shown in.
    pub fn zone_for(&mut self, value: &core::DateTime, default: Tz) -> Tz {
        let Some(tzid) = value.tzid() else {
            return default;
        };
        match self.resolve(tzid) {
            Ok(tz) => tz,
            Err(e) => {
                tracing::warn!(tzid, fallback = %default, error = %e, "Unresolvable TZID");
                default
            }
        }
    }

    /// ## Summary
    /// Converts a parsed DATE-TIME to a UTC instant.
    ///
    /// Floating values and values with an unresolvable `TZID` are read in
    /// `default`. DST gaps shift forward one hour; folds take the earlier
    /// instant.
    ///
    /// ## Errors
    ///
    /// Returns `ConversionError::NonExistentTime` if the shifted time still
    /// does not exist.
    pub fn utc_instant(
        &mut self,
        value: &core::DateTime,
        default: Tz,
    ) -> Result<DateTime<Utc>, ConversionError> {
        match value.form {
            DateTimeForm::Utc => Ok(value.local.and_utc()),
            DateTimeForm::Floating | DateTimeForm::Zoned { .. } => {
                let tz = self.zone_for(value, default);
                convert_to_utc_lenient(value.local, tz)
            }
        }
    }
}

/// Normalizes common iCalendar timezone identifiers to IANA names.
///
/// Strips vendor prefixes (`/mozilla.org/`, `/softwarestudio.org/...`) and
/// maps Windows zone names. Unrecognized input is returned unchanged.
#[must_use]
pub fn normalize_tzid(tzid: &str) -> &str {
    let trimmed = tzid.trim().trim_matches('"');
    let stripped = trimmed
        .strip_prefix("/mozilla.org/")
        .or_else(|| {
            trimmed
                .strip_prefix("/softwarestudio.org/Olson_20011030_5/")
                .or_else(|| trimmed.strip_prefix("/softwarestudio.org/"))
        })
        .or_else(|| trimmed.strip_prefix('/'))
        .unwrap_or(trimmed);

    WINDOWS_ZONES
        .iter()
        .find(|(windows, _)| windows.eq_ignore_ascii_case(stripped))
        .map_or(stripped, |&(_, iana)| iana)
}

/// ## Summary
/// Converts a local datetime to UTC using the given zone.
///
/// Ambiguous times (DST fold) resolve to the first occurrence.
///
/// ## Errors
///
/// Returns `ConversionError::NonExistentTime` for times inside a DST gap.
pub fn convert_to_utc(local_time: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, ConversionError> {
    match tz.from_local_datetime(&local_time) {
        LocalResult::None => Err(ConversionError::NonExistentTime(format!(
            "{local_time} in timezone {tz}"
        ))),
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
    }
}

/// ## Summary
/// Converts a local datetime to UTC, shifting DST-gap times forward by one
/// hour instead of failing.
///
/// ## Errors
///
/// Returns an error only if the shifted time is also non-existent.
pub fn convert_to_utc_lenient(
    local_time: NaiveDateTime,
    tz: Tz,
) -> Result<DateTime<Utc>, ConversionError> {
    match convert_to_utc(local_time, tz) {
        Err(ConversionError::NonExistentTime(_)) => {
            convert_to_utc(local_time + TimeDelta::hours(1), tz)
        }
        other => other,
    }
}

/// ## Summary
/// Converts a DATE to the UTC instant of local midnight in `tz`.
///
/// ## Errors
///
/// Returns an error if midnight does not exist in `tz` even after shifting.
pub fn date_to_utc(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, ConversionError> {
    convert_to_utc_lenient(date.and_time(chrono::NaiveTime::MIN), tz)
}
