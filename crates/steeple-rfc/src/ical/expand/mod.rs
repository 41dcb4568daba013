//! Timezone resolution and recurrence iteration for parsed events.

mod recurrence;
mod timezone;

pub use recurrence::{ExpansionError, OccurrenceRule, normalize_until};
pub use timezone::{
    ConversionError, TimeZoneResolver, convert_to_utc, convert_to_utc_lenient, date_to_utc,
    normalize_tzid,
};
