//! iCalendar boundary for the steeple crates.
//!
//! Parses feed text into a component tree, resolves `TZID`s, and iterates
//! recurrence occurrences. Callers only need `ical::parse`, the component
//! accessors, and `ical::expand::OccurrenceRule`.

pub mod ical;
