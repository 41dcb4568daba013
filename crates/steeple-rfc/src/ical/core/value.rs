//! Typed iCalendar property values (RFC 5545 §3.3).

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// How a DATE-TIME is anchored (RFC 5545 §3.3.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeForm {
    /// Form #2: trailing `Z`.
    Utc,
    /// Form #1: no zone; interpreted in the reader's zone.
    Floating,
    /// Form #3: local time with a `TZID` parameter.
    Zoned { tzid: String },
}

/// A DATE-TIME value as written in the feed, before zone resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTime {
    /// Wall-clock value exactly as written.
    pub local: NaiveDateTime,
    pub form: DateTimeForm,
}

impl DateTime {
    #[must_use]
    pub fn utc(local: NaiveDateTime) -> Self {
        Self {
            local,
            form: DateTimeForm::Utc,
        }
    }

    #[must_use]
    pub fn floating(local: NaiveDateTime) -> Self {
        Self {
            local,
            form: DateTimeForm::Floating,
        }
    }

    #[must_use]
    pub fn zoned(local: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self {
            local,
            form: DateTimeForm::Zoned { tzid: tzid.into() },
        }
    }

    /// Returns the `TZID` this value was declared with, if any.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            DateTimeForm::Utc | DateTimeForm::Floating => None,
        }
    }
}

/// A parsed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// TEXT, already unescaped.
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime),
    /// Multi-valued DATE (EXDATE/RDATE).
    DateList(Vec<NaiveDate>),
    /// Multi-valued DATE-TIME (EXDATE/RDATE).
    DateTimeList(Vec<DateTime>),
    Duration(TimeDelta),
    /// URI or CAL-ADDRESS, kept verbatim.
    Uri(String),
    /// RECUR, kept verbatim for the rule engine.
    Recur(String),
    /// BINARY payload, still base64 encoded.
    Binary(String),
    /// Anything the parser does not type.
    Unknown(String),
}

impl Value {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Self::Uri(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_recur(&self) -> Option<&str> {
        match self {
            Self::Recur(s) => Some(s),
            _ => None,
        }
    }
}
