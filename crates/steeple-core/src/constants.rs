/// Public Google Calendar export used when no feed URL is configured.
pub const DEFAULT_CALENDAR_URL: &str = "https://calendar.google.com/calendar/ical/c_b253bc81383f7876a658ad71f516be079528043a755a7c79713cd2c4529b1a26%40group.calendar.google.com/public/basic.ics";

/// Zone used for floating and all-day times, and for month boundaries.
pub const DEFAULT_TIMEZONE: &str = "Europe/London";

/// Content spreadsheet used when `sheets` is selected without an explicit id.
pub const DEFAULT_SPREADSHEET_ID: &str = "1Ay1kS_--qmW9x0gSi5zSUQvkdQoeiGVQvu30PY6XUxM";

/// A1 range requested from the Sheets values API.
pub const DEFAULT_SHEETS_RANGE: &str = "Sheet1";

pub const GOOGLE_SHEETS_EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";
pub const GOOGLE_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const GOOGLE_DRIVE_THUMBNAIL_BASE: &str = "https://drive.google.com/thumbnail";
