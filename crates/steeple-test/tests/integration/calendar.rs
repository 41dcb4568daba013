use steeple_core::config::FeedFailurePolicy;
use steeple_test::service::calendar::{CalendarEvent, EventAggregator};
use steeple_test::{calendar, calendar_config, utc, vevent};

const EUCHARIST: &str = "Parish Eucharist";
const HARVEST: &str = "Harvest Supper";

fn parish_feed() -> String {
    calendar(&[
        vevent(
            "eucharist@stmarys",
            EUCHARIST,
            ";TZID=Europe/London:20260104T103000",
            &[
                "DTEND;TZID=Europe/London:20260104T113000",
                "RRULE:FREQ=WEEKLY;BYDAY=SU",
                "LOCATION:Nave",
            ],
        ),
        vevent(
            "harvest-2026@stmarys",
            HARVEST,
            ";TZID=Europe/London:20261024T190000",
            &[
                "DTEND;TZID=Europe/London:20261024T213000",
                "DESCRIPTION:<p>Bring a dish to share</p><script>alert(1)</script>",
                "ATTACH;FMTTYPE=image/png;FILENAME=harvest.png:https://drive.google.com/file/d/ABC123/view?usp=drive_web",
            ],
        ),
        vevent("all-saints@stmarys", "All Saints", ";VALUE=DATE:20261101", &[]),
    ])
}

async fn serve(server: &mut mockito::ServerGuard, body: &str, hits: usize) -> mockito::Mock {
    server
        .mock("GET", "/basic.ics")
        .with_status(200)
        .with_header("content-type", "text/calendar; charset=UTF-8")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

fn aggregator(server: &mockito::ServerGuard, policy: FeedFailurePolicy) -> EventAggregator {
    EventAggregator::from_config(&calendar_config(format!("{}/basic.ics", server.url()), policy))
        .expect("valid calendar config")
}

fn titles(events: &[CalendarEvent]) -> Vec<&str> {
    events.iter().map(|e| e.title.as_str()).collect()
}

#[test_log::test(tokio::test)]
async fn upcoming_events_over_http_feed() {
    let mut server = mockito::Server::new_async().await;
    let mock = serve(&mut server, &parish_feed(), 1).await;
    let aggregator = aggregator(&server, FeedFailurePolicy::Cache);
    let now = utc(2026, 10, 19, 12, 0);

    let events = aggregator.upcoming_events_at(now, 3, false).await;

    assert_eq!(titles(&events), vec![HARVEST, EUCHARIST, "All Saints"]);
    assert_eq!(events[0].start, utc(2026, 10, 24, 18, 0));
    // Clocks go back on 25 October; the service stays at 10:30 local
    assert_eq!(events[1].start, utc(2026, 10, 25, 10, 30));
    assert_eq!(events[1].end, utc(2026, 10, 25, 11, 30));
    assert_eq!(events[1].location.as_deref(), Some("Nave"));
    assert!(events[2].all_day);
    assert_eq!(events[2].start, utc(2026, 11, 1, 0, 0));

    let unique = aggregator.upcoming_events_at(now, 10, true).await;
    assert_eq!(titles(&unique), vec![HARVEST, EUCHARIST, "All Saints"]);

    mock.assert_async().await;
}

#[test_log::test(tokio::test)]
async fn upcoming_events_sanitizes_and_resolves_images() {
    let mut server = mockito::Server::new_async().await;
    let _mock = serve(&mut server, &parish_feed(), 1).await;
    let aggregator = aggregator(&server, FeedFailurePolicy::Cache);

    let events = aggregator
        .upcoming_events_at(utc(2026, 10, 19, 12, 0), 1, false)
        .await;
    let harvest = &events[0];

    let html = harvest.description_html.as_deref().unwrap();
    assert!(html.contains("<p>Bring a dish to share</p>"));
    assert!(!html.contains("script"));

    let thumbnail = harvest.thumbnail_url.as_deref().unwrap();
    assert!(thumbnail.starts_with("https://drive.google.com/thumbnail"));
    assert!(thumbnail.contains("id=ABC123"));
    assert_eq!(harvest.images[0].filename.as_deref(), Some("harvest.png"));
}

#[test_log::test(tokio::test)]
async fn events_for_next_months_respects_month_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = serve(&mut server, &parish_feed(), 1).await;
    let aggregator = aggregator(&server, FeedFailurePolicy::Cache);
    let now = utc(2026, 10, 19, 12, 0);

    let october = aggregator.events_for_next_months_at(now, 1).await;
    assert_eq!(titles(&october), vec![HARVEST, EUCHARIST]);

    let through_november = aggregator.events_for_next_months_at(now, 2).await;
    let sundays: Vec<_> = through_november
        .iter()
        .filter(|e| e.title == EUCHARIST)
        .map(|e| e.start)
        .collect();
    assert_eq!(
        sundays,
        vec![
            utc(2026, 10, 25, 10, 30),
            utc(2026, 11, 1, 10, 30),
            utc(2026, 11, 8, 10, 30),
            utc(2026, 11, 15, 10, 30),
            utc(2026, 11, 22, 10, 30),
            utc(2026, 11, 29, 10, 30),
        ]
    );
    assert_eq!(through_november.len(), 8);
    assert!(through_november.windows(2).all(|w| w[0].start <= w[1].start));

    mock.assert_async().await;
}

#[test_log::test(tokio::test)]
async fn moved_and_cancelled_occurrences() {
    let feed = calendar(&[
        vevent(
            "eucharist@stmarys",
            EUCHARIST,
            ";TZID=Europe/London:20260104T103000",
            &[
                "DTEND;TZID=Europe/London:20260104T113000",
                "RRULE:FREQ=WEEKLY;BYDAY=SU",
                "EXDATE;TZID=Europe/London:20261115T103000",
            ],
        ),
        vevent(
            "eucharist@stmarys",
            "Remembrance Sunday Eucharist",
            ";TZID=Europe/London:20261108T104500",
            &[
                "RECURRENCE-ID;TZID=Europe/London:20261108T103000",
                "DTEND;TZID=Europe/London:20261108T120000",
            ],
        ),
    ]);
    let mut server = mockito::Server::new_async().await;
    let _mock = serve(&mut server, &feed, 1).await;
    let aggregator = aggregator(&server, FeedFailurePolicy::Cache);

    let events = aggregator
        .events_for_next_months_at(utc(2026, 11, 1, 0, 0), 1)
        .await;

    assert_eq!(
        events.iter().map(|e| (e.title.as_str(), e.start)).collect::<Vec<_>>(),
        vec![
            (EUCHARIST, utc(2026, 11, 1, 10, 30)),
            ("Remembrance Sunday Eucharist", utc(2026, 11, 8, 10, 45)),
            (EUCHARIST, utc(2026, 11, 22, 10, 30)),
            (EUCHARIST, utc(2026, 11, 29, 10, 30)),
        ]
    );
    assert_eq!(events[1].end, utc(2026, 11, 8, 12, 0));
}

#[test_log::test(tokio::test)]
async fn unreachable_feed_yields_empty_and_is_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/basic.ics")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let aggregator = aggregator(&server, FeedFailurePolicy::Cache);
    let now = utc(2026, 10, 19, 12, 0);

    assert!(aggregator.upcoming_events_at(now, 3, false).await.is_empty());
    assert!(aggregator.events_for_next_months_at(now, 2).await.is_empty());

    mock.assert_async().await;
}

#[test_log::test(tokio::test)]
async fn unreachable_feed_recovers_under_retry_policy() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", "/basic.ics")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let aggregator = aggregator(&server, FeedFailurePolicy::Retry);
    let now = utc(2026, 10, 19, 12, 0);

    assert!(aggregator.upcoming_events_at(now, 3, false).await.is_empty());
    failing.assert_async().await;
    failing.remove_async().await;

    let ok = serve(&mut server, &parish_feed(), 1).await;
    assert_eq!(aggregator.upcoming_events_at(now, 3, false).await.len(), 3);
    assert_eq!(aggregator.upcoming_events_at(now, 1, false).await.len(), 1);
    ok.assert_async().await;
}

#[test_log::test(tokio::test)]
async fn malformed_feed_yields_empty() {
    let mut server = mockito::Server::new_async().await;
    let _mock = serve(&mut server, "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:x\r\n", 1).await;
    let aggregator = aggregator(&server, FeedFailurePolicy::Cache);

    assert!(
        aggregator
            .upcoming_events_at(utc(2026, 10, 19, 12, 0), 3, false)
            .await
            .is_empty()
    );
}
