//! Services behind the parish website: the calendar feed turned into
//! renderable events, and the site content tree resolved from its source.

pub mod calendar;
pub mod content;
