use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sha2::{Digest, Sha256};
use steeple_core::util::slug::generate_slug;

/// Title used when an event has no `SUMMARY`.
pub const UNTITLED_EVENT: &str = "Untitled event";

/// An image attached to an event, with URLs a browser can load directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    /// Full-size URL.
    pub url: String,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One concrete occurrence of a calendar event, ready for a page renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// `uid@start`, unique per occurrence.
    pub id: String,
    pub uid: String,
    pub slug: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA name of the zone the occurrence is shown in.
    pub time_zone: String,
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Unescaped `DESCRIPTION` text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub images: Vec<ImageAttachment>,
}

/// Time range and per-event cap handed to the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Maximum occurrences emitted for any single event.
    pub per_event_limit: usize,
}

impl RecurrenceWindow {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, per_event_limit: usize) -> Self {
        Self {
            start,
            end,
            per_event_limit,
        }
    }

    /// Both bounds are inclusive.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// ## Summary
/// Builds the per-occurrence identifier: the feed UID and the UTC start in
/// RFC 3339 with second precision, joined by `@`.
#[must_use]
pub fn occurrence_id(uid: &str, start: DateTime<Utc>) -> String {
    format!("{uid}@{}", start.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// ## Summary
/// Builds a url-safe slug: the slugified title, the local start as
/// `YYYYMMDD-HHMM` in `zone`, and the first 8 hex chars of the UID's SHA-256.
#[must_use]
pub fn occurrence_slug(title: &str, uid: &str, start: DateTime<Utc>, zone: Tz) -> String {
    let mut title_slug = generate_slug(title);
    if title_slug.is_empty() {
        title_slug = "event".to_string();
    }

    let local = start.with_timezone(&zone).format("%Y%m%d-%H%M");
    let digest = hex::encode(Sha256::digest(uid.as_bytes()));

    format!("{title_slug}-{local}-{}", &digest[..8])
}
