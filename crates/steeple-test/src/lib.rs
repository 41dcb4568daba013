//! Fixtures shared by the steeple integration tests.
//!
//! Feeds are assembled from small VEVENT snippets and served by a local
//! `mockito` server, so tests exercise the real HTTP, parse and expansion
//! path end to end.

use chrono::{DateTime, TimeZone, Utc};
use steeple_core::config::{
    CalendarConfig, ContentConfig, FeedFailurePolicy, SheetsConfig,
};

pub use steeple_rfc as rfc;
pub use steeple_service as service;

pub const TEST_TIMEZONE: &str = "Europe/London";

/// Wraps VEVENT blocks in a Google-style VCALENDAR export.
#[must_use]
pub fn calendar(events: &[String]) -> String {
    format!(
        "BEGIN:VCALENDAR\r\n\
         PRODID:-//Google Inc//Google Calendar 70.9054//EN\r\n\
         VERSION:2.0\r\n\
         CALSCALE:GREGORIAN\r\n\
         X-WR-CALNAME:Parish Calendar\r\n\
         X-WR-TIMEZONE:{TEST_TIMEZONE}\r\n\
         {}\
         END:VCALENDAR\r\n",
        events.concat()
    )
}

/// One VEVENT; `extra` lines are inserted verbatim before `END:VEVENT`.
#[must_use]
pub fn vevent(uid: &str, summary: &str, dtstart: &str, extra: &[&str]) -> String {
    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("SUMMARY:{summary}"),
        format!("DTSTART{dtstart}"),
    ];
    lines.extend(extra.iter().map(ToString::to_string));
    lines.push("END:VEVENT".to_string());
    lines.iter().map(|line| format!("{line}\r\n")).collect()
}

#[must_use]
pub fn calendar_config(ics_url: String, feed_failure_policy: FeedFailurePolicy) -> CalendarConfig {
    CalendarConfig {
        ics_url,
        default_timezone: TEST_TIMEZONE.to_string(),
        feed_failure_policy,
    }
}

#[must_use]
pub fn content_config(source: &str, api_url: Option<String>) -> ContentConfig {
    ContentConfig {
        source: Some(source.to_string()),
        api_url,
        local_path: None,
    }
}

#[must_use]
pub fn sheets_config() -> SheetsConfig {
    SheetsConfig {
        csv_url: None,
        spreadsheet_id: None,
        gid: None,
        api_key: None,
        range: "Sheet1".to_string(),
    }
}

/// ## Panics
/// Panics if the arguments do not name a valid UTC instant.
#[must_use]
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid test instant {year}-{month}-{day} {hour}:{minute}"))
}
