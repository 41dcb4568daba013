//! Calendar ingestion: fetch the public iCalendar feed, expand each event
//! into concrete occurrences, enrich them for rendering, and answer the two
//! page queries (next few events, everything in the coming months).

pub mod aggregator;
pub mod attachment;
pub mod expander;
pub mod feed;
pub mod model;
pub mod sanitize;

pub use aggregator::EventAggregator;
pub use feed::{FeedCache, FeedError, FeedResult, FeedSource};
pub use model::{CalendarEvent, ImageAttachment, RecurrenceWindow};
