use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_CALENDAR_URL, DEFAULT_SHEETS_RANGE, DEFAULT_SPREADSHEET_ID, DEFAULT_TIMEZONE,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub content: ContentConfig,
    pub sheets: SheetsConfig,
    pub logging: LoggingConfig,
}

/// What the feed cache does with a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFailurePolicy {
    /// The first outcome, success or failure, is kept for the process lifetime.
    #[default]
    Cache,
    /// Failures are not stored; the next caller fetches again.
    Retry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    pub ics_url: String,
    pub default_timezone: String,
    #[serde(default)]
    pub feed_failure_policy: FeedFailurePolicy,
}

impl CalendarConfig {
    /// ## Summary
    /// Resolves the configured default timezone to an IANA zone.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidConfiguration` if the name is not a known IANA zone.
    pub fn default_tz(&self) -> CoreResult<chrono_tz::Tz> {
        self.default_timezone.parse::<chrono_tz::Tz>().map_err(|e| {
            CoreError::InvalidConfiguration(format!(
                "calendar.default_timezone '{}': {e}",
                self.default_timezone
            ))
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentConfig {
    pub source: Option<String>,
    pub api_url: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    pub csv_url: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub gid: Option<String>,
    pub api_key: Option<String>,
    pub range: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Environment variables used by the original site build, mapped onto settings keys.
///
/// The first variable that is set wins for a given key.
const LEGACY_ENV_ALIASES: &[(&str, &[&str])] = &[
    ("calendar.ics_url", &["PUBLIC_CALENDAR_ICS_URL"]),
    ("content.source", &["CONTENT_SOURCE"]),
    ("content.api_url", &["CONTENT_API_URL"]),
    ("sheets.csv_url", &["GOOGLE_SHEETS_CSV_URL", "CONTENT_CSV_URL"]),
    (
        "sheets.spreadsheet_id",
        &["GOOGLE_SHEETS_SPREADSHEET_ID", "GOOGLE_SHEETS_ID"],
    ),
    ("sheets.gid", &["GOOGLE_SHEETS_GID"]),
    ("sheets.api_key", &["GOOGLE_SHEETS_API_KEY"]),
];

fn legacy_env_value(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Prefixed variables (`STEEPLE_CALENDAR__ICS_URL`) take precedence over the
    /// TOML file; legacy site variables override both.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("calendar.ics_url", DEFAULT_CALENDAR_URL)?
            .set_default("calendar.default_timezone", DEFAULT_TIMEZONE)?
            .set_default("calendar.feed_failure_policy", "cache")?
            .set_default("sheets.spreadsheet_id", DEFAULT_SPREADSHEET_ID)?
            .set_default("sheets.range", DEFAULT_SHEETS_RANGE)?
            .set_default("logging.level", "debug")?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env file
            .add_source(
                config::Environment::with_prefix("STEEPLE")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            );

        for (key, names) in LEGACY_ENV_ALIASES {
            builder = builder.set_override_option(*key, legacy_env_value(names))?;
        }

        Ok(builder.build()?.try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
