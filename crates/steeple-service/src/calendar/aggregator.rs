//! The two page queries over the expanded feed.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use steeple_core::config::CalendarConfig;
use steeple_core::error::CoreResult;
use steeple_rfc::ical::expand::date_to_utc;

use super::expander::RecurrenceExpander;
use super::feed::{FeedCache, FeedError, FeedSource};
use super::model::{CalendarEvent, RecurrenceWindow};

/// How far ahead the upcoming-events query looks.
pub const UPCOMING_HORIZON_DAYS: i64 = 366;
/// Per-event cap for the month query.
pub const MONTHS_PER_EVENT_LIMIT: usize = 300;

/// ## Summary
/// Answers the homepage and events-page queries from a feed source.
///
/// Feed failures never reach the caller: they are logged and the query
/// returns an empty list.
#[derive(Debug)]
pub struct EventAggregator<S = FeedCache> {
    source: S,
    default_tz: Tz,
}

impl EventAggregator<FeedCache> {
    /// ## Summary
    /// Builds an aggregator over the HTTP feed named in the configuration.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidConfiguration` if the default timezone is
    /// not a known IANA zone.
    pub fn from_config(config: &CalendarConfig) -> CoreResult<Self> {
        Ok(Self::new(FeedCache::from_config(config), config.default_tz()?))
    }
}

impl<S: FeedSource> EventAggregator<S> {
    #[must_use]
    pub fn new(source: S, default_tz: Tz) -> Self {
        Self { source, default_tz }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// ## Summary
    /// Returns the next `limit` occurrences starting from now.
    ///
    /// With `filter_duplicates`, only the first occurrence of each title is
    /// kept, so a weekly service does not crowd out everything else.
    pub async fn upcoming_events(&self, limit: usize, filter_duplicates: bool) -> Vec<CalendarEvent> {
        self.upcoming_events_at(Utc::now(), limit, filter_duplicates).await
    }

    /// [`Self::upcoming_events`] with an explicit clock.
    #[tracing::instrument(skip(self))]
    pub async fn upcoming_events_at(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        filter_duplicates: bool,
    ) -> Vec<CalendarEvent> {
        if limit == 0 {
            return Vec::new();
        }

        let window = RecurrenceWindow::new(
            now,
            now + TimeDelta::days(UPCOMING_HORIZON_DAYS),
            limit.saturating_mul(8).max(24),
        );
        let events = self.expanded_between(&window).await;

        if !filter_duplicates {
            return events.into_iter().take(limit).collect();
        }

        let mut seen_titles = HashSet::new();
        events
            .into_iter()
            .filter(|e| seen_titles.insert(e.title.clone()))
            .take(limit)
            .collect()
    }

    /// ## Summary
    /// Returns every occurrence from now to the end of the month `months - 1`
    /// months ahead, in the default timezone. `months` below 1 counts as 1.
    pub async fn events_for_next_months(&self, months: u32) -> Vec<CalendarEvent> {
        self.events_for_next_months_at(Utc::now(), months).await
    }

    /// [`Self::events_for_next_months`] with an explicit clock.
    #[tracing::instrument(skip(self))]
    pub async fn events_for_next_months_at(
        &self,
        now: DateTime<Utc>,
        months: u32,
    ) -> Vec<CalendarEvent> {
        let end = end_of_month_window(now, months, self.default_tz);
        let window = RecurrenceWindow::new(now, end, MONTHS_PER_EVENT_LIMIT);
        self.expanded_between(&window).await
    }

    /// Fetch, parse, expand, drop repeated ids, sort by start.
    async fn expanded_between(&self, window: &RecurrenceWindow) -> Vec<CalendarEvent> {
        let Some(text) = self.source.feed_text().await else {
            return Vec::new();
        };

        let ical = match steeple_rfc::ical::parse(&text) {
            Ok(ical) => ical,
            Err(e) => {
                let e = FeedError::from(e);
                tracing::error!(error = %e, "Calendar feed unusable");
                return Vec::new();
            }
        };

        let mut expander = RecurrenceExpander::new(self.default_tz);
        let mut seen_ids = HashSet::new();
        let mut events: Vec<CalendarEvent> = expander
            .expand_calendar(&ical, window)
            .into_iter()
            .filter(|e| seen_ids.insert(e.id.clone()))
            .collect();

        events.sort_by_key(|e| e.start);
        tracing::debug!(count = events.len(), "Aggregated calendar events");
        events
    }
}

/// ## Summary
/// Last millisecond of the month `months - 1` after the month containing
/// `now`, as seen in `tz`.
#[must_use]
pub fn end_of_month_window(now: DateTime<Utc>, months: u32, tz: Tz) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    let first_of_month = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)
        .unwrap_or_else(|| local.date_naive());
    let first_after = first_of_month
        .checked_add_months(Months::new(months.max(1)))
        .unwrap_or(NaiveDate::MAX);

    let next_midnight = date_to_utc(first_after, tz)
        .unwrap_or_else(|_| first_after.and_time(chrono::NaiveTime::MIN).and_utc());
    next_midnight - TimeDelta::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;

    use super::*;

    struct StaticFeed {
        text: Option<Arc<str>>,
        hits: AtomicUsize,
    }

    impl StaticFeed {
        fn new(body: &str) -> Self {
            Self {
                text: Some(Arc::from(body)),
                hits: AtomicUsize::new(0),
            }
        }
    }

    impl FeedSource for StaticFeed {
        async fn feed_text(&self) -> Option<Arc<str>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.text.clone()
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn vevent(uid: &str, title: &str, start: &str) -> String {
        format!("BEGIN:VEVENT\r\nUID:{uid}\r\nSUMMARY:{title}\r\nDTSTART:{start}\r\nEND:VEVENT\r\n")
    }

    fn feed(events: &[String]) -> StaticFeed {
        StaticFeed::new(&format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\n{}END:VCALENDAR\r\n",
            events.concat()
        ))
    }

    fn aggregator(events: &[String]) -> EventAggregator<StaticFeed> {
        EventAggregator::new(feed(events), Tz::Europe__London)
    }

    #[test_log::test(tokio::test)]
    async fn test_upcoming_limit_sorted() {
        let agg = aggregator(&[
            vevent("e", "Evensong", "20260305T180000Z"),
            vevent("a", "Alpha", "20260301T190000Z"),
            vevent("c", "Choir", "20260303T190000Z"),
            vevent("d", "Deanery Synod", "20260304T190000Z"),
            vevent("b", "Bible Study", "20260302T190000Z"),
        ]);

        let events = agg.upcoming_events_at(utc(2026, 2, 1, 0, 0), 3, false).await;
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Bible Study", "Choir"]);
    }

    #[test_log::test(tokio::test)]
    async fn test_upcoming_unique_titles_first_seen() {
        let agg = aggregator(&[
            vevent("1", "Mass", "20260301T100000Z"),
            vevent("2", "Mass", "20260302T100000Z"),
            vevent("3", "Coffee", "20260303T100000Z"),
            vevent("4", "Coffee", "20260304T100000Z"),
        ]);

        let events = agg.upcoming_events_at(utc(2026, 2, 1, 0, 0), 2, true).await;
        let picked: Vec<_> = events.iter().map(|e| (e.title.as_str(), e.uid.as_str())).collect();
        assert_eq!(picked, vec![("Mass", "1"), ("Coffee", "3")]);
    }

    #[test_log::test(tokio::test)]
    async fn test_duplicate_ids_collapse() {
        let agg = aggregator(&[
            vevent("same", "First copy", "20260301T100000Z"),
            vevent("same", "Second copy", "20260301T100000Z"),
        ]);

        let events = agg.upcoming_events_at(utc(2026, 2, 1, 0, 0), 10, false).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "First copy");
    }

    #[test_log::test(tokio::test)]
    async fn test_upcoming_zero_limit() {
        let agg = aggregator(&[vevent("a", "A", "20260301T100000Z")]);
        assert!(agg.upcoming_events_at(utc(2026, 2, 1, 0, 0), 0, false).await.is_empty());
        assert_eq!(agg.source().hits.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_upcoming_horizon() {
        let agg = aggregator(&[
            vevent("near", "Near", "20270101T100000Z"),
            vevent("far", "Far", "20270301T100000Z"),
        ]);
        let events = agg.upcoming_events_at(utc(2026, 2, 1, 0, 0), 10, false).await;
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Near"]);
    }

    #[test_log::test(tokio::test)]
    async fn test_months_window() {
        let agg = aggregator(&[
            vevent("past", "Past", "20260101T100000Z"),
            vevent("feb", "February", "20260220T100000Z"),
            vevent("mar", "March", "20260331T225959Z"),
            vevent("apr", "April", "20260401T100000Z"),
        ]);

        let events = agg.events_for_next_months_at(utc(2026, 2, 10, 12, 0), 2).await;
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["February", "March"]);
    }

    #[test_log::test(tokio::test)]
    async fn test_months_below_one_is_one() {
        let agg = aggregator(&[
            vevent("feb", "February", "20260220T100000Z"),
            vevent("mar", "March", "20260301T100000Z"),
        ]);
        let zero = agg.events_for_next_months_at(utc(2026, 2, 10, 12, 0), 0).await;
        let one = agg.events_for_next_months_at(utc(2026, 2, 10, 12, 0), 1).await;
        assert_eq!(zero, one);
        assert_eq!(zero.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_unparseable_feed_is_empty() {
        let agg = EventAggregator::new(StaticFeed::new("<html>maintenance</html>"), Tz::UTC);
        assert!(agg.upcoming_events_at(utc(2026, 2, 1, 0, 0), 3, false).await.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_feed_is_empty() {
        let source = StaticFeed {
            text: None,
            hits: AtomicUsize::new(0),
        };
        let agg = EventAggregator::new(source, Tz::UTC);
        assert!(agg.events_for_next_months_at(utc(2026, 2, 1, 0, 0), 2).await.is_empty());
    }

    #[test]
    fn test_end_of_month_window_in_summer_time() {
        // End of July London time is 22:59:59.999 UTC.
        let end = end_of_month_window(utc(2026, 6, 15, 12, 0), 2, Tz::Europe__London);
        assert_eq!(end, utc(2026, 7, 31, 23, 0) - TimeDelta::milliseconds(1));
    }

    #[test]
    fn test_end_of_month_window_uses_local_month() {
        // 23:30 UTC on 31 March is already April in London.
        let end = end_of_month_window(utc(2026, 3, 31, 23, 30), 1, Tz::Europe__London);
        assert_eq!(end, utc(2026, 4, 30, 23, 0) - TimeDelta::milliseconds(1));
    }
}
