use serde_json::json;
use steeple_core::config::SheetsConfig;
use steeple_test::service::content::{ContentError, ContentResolver, ContentSource};
use steeple_test::{content_config, sheets_config};

const SHEET_CSV: &str = "\u{feff}Path,Type,Value,Notes\r\n\
site.title,string,St Mary's Parish Church,Shown in the header\r\n\
site.subtitle,,\"Worship, welcome and community\",\r\n\
\r\n\
services[0].name,string,Parish Eucharist,\r\n\
services[0].time,string,10:30,\r\n\
services[1].name,string,Evensong,\r\n\
services[1].time,string,18:00,\r\n\
events.homepageLimit,number,3,\r\n\
events.uniqueTitles,boolean,TRUE,\r\n\
hero.body,html,\"<p>All are welcome</p>\",\r\n\
footer.links,json,\"[{\"\"label\"\":\"\"Safeguarding\"\",\"\"href\"\":\"\"/safeguarding\"\"}]\",\r\n\
footer.note,null,,\r\n";

#[test_log::test(tokio::test)]
async fn sheet_csv_replays_into_nested_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/pub")
        .match_header("accept", "text/csv,text/plain;q=0.9,*/*;q=0.8")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body(SHEET_CSV)
        .expect(1)
        .create_async()
        .await;

    let resolver = ContentResolver::new(
        content_config("sheets", None),
        SheetsConfig {
            csv_url: Some(format!("{}/pub", server.url())),
            ..sheets_config()
        },
    );
    assert_eq!(resolver.source(), ContentSource::Sheets);

    let content = resolver.get_site_content().await.unwrap();
    assert_eq!(
        content.as_value(),
        &json!({
            "site": {
                "title": "St Mary's Parish Church",
                "subtitle": "Worship, welcome and community"
            },
            "services": [
                {"name": "Parish Eucharist", "time": "10:30"},
                {"name": "Evensong", "time": "18:00"}
            ],
            "events": {"homepageLimit": 3, "uniqueTitles": true},
            "hero": {"body": "<p>All are welcome</p>"},
            "footer": {
                "links": [{"label": "Safeguarding", "href": "/safeguarding"}],
                "note": null
            }
        })
    );

    // Memoized: no second request
    let again = resolver.get_site_content().await.unwrap();
    assert_eq!(again.lookup("services[1].name"), Some(&json!("Evensong")));
    mock.assert_async().await;
}

#[test_log::test(tokio::test)]
async fn api_source_selected_by_url_alone() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/content")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_body(r#"{"site":{"title":"From the CMS"}}"#)
        .create_async()
        .await;

    let mut config = content_config("", Some(format!("{}/api/content", server.url())));
    config.source = None;
    let resolver = ContentResolver::new(config, sheets_config());

    assert_eq!(resolver.source(), ContentSource::Api);
    let content = resolver.get_site_content().await.unwrap();
    assert_eq!(content.lookup("site.title"), Some(&json!("From the CMS")));
    mock.assert_async().await;
}

#[test_log::test(tokio::test)]
async fn sheet_without_required_columns_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/pub")
        .with_status(200)
        .with_body("key,value\nsite.title,Hello\n")
        .create_async()
        .await;

    let err = ContentResolver::new(
        content_config("sheets", None),
        SheetsConfig {
            csv_url: Some(format!("{}/pub", server.url())),
            ..sheets_config()
        },
    )
    .get_site_content()
    .await
    .unwrap_err();

    assert!(matches!(err, ContentError::MissingColumns(_)));
    assert!(err.to_string().contains("path"));
}

#[test_log::test(tokio::test)]
async fn sheet_with_bad_number_names_the_row() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/pub")
        .with_status(200)
        .with_body("path,type,value\nevents.homepageLimit,number,three\n")
        .create_async()
        .await;

    let err = ContentResolver::new(
        content_config("sheets", None),
        SheetsConfig {
            csv_url: Some(format!("{}/pub", server.url())),
            ..sheets_config()
        },
    )
    .get_site_content()
    .await
    .unwrap_err();

    assert!(err.to_string().contains("events.homepageLimit"));
}

#[test_log::test(tokio::test)]
async fn bundled_content_when_nothing_configured() {
    let mut config = content_config("local", None);
    config.source = None;
    let resolver = ContentResolver::new(config, sheets_config());

    assert_eq!(resolver.source(), ContentSource::Local);
    let content = resolver.get_site_content().await.unwrap();
    assert!(content.lookup("site.title").is_some_and(serde_json::Value::is_string));
}
