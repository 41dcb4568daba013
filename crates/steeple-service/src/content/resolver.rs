//! Memoized site content resolution across the configured sources.

use serde::Deserialize;
use serde_json::Value;
use steeple_core::config::{ContentConfig, SheetsConfig, Settings};
use steeple_core::constants::{GOOGLE_SHEETS_API_BASE, GOOGLE_SHEETS_EXPORT_BASE};
use tokio::sync::OnceCell;
use url::Url;

use super::error::{ContentError, ContentResult};
use super::path::lookup_path;
use super::sheet::{content_from_csv, content_from_rows};
use super::source::{ContentSource, resolve_content_source};

const BUNDLED_CONTENT: &str = include_str!("../../data/content.json");

const JSON_ACCEPT: &str = "application/json";
const CSV_ACCEPT: &str = "text/csv,text/plain;q=0.9,*/*;q=0.8";

/// The resolved content document.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct SiteContent(Value);

impl SiteContent {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Reads a value by locator path, e.g. `services[0].name`.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.0, path)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Body of a Sheets values API response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).map(str::trim).filter(|v| !v.is_empty())
}

/// ## Summary
/// Resolves site content once per process.
///
/// Concurrent callers share one in-flight resolution. Only success is
/// remembered; a failed attempt is retried by the next caller.
#[derive(Debug)]
pub struct ContentResolver {
    client: reqwest::Client,
    content: ContentConfig,
    sheets: SheetsConfig,
    sheets_api_base: String,
    sheets_export_base: String,
    cell: OnceCell<SiteContent>,
}

impl ContentResolver {
    #[must_use]
    pub fn new(content: ContentConfig, sheets: SheetsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            content,
            sheets,
            sheets_api_base: GOOGLE_SHEETS_API_BASE.to_string(),
            sheets_export_base: GOOGLE_SHEETS_EXPORT_BASE.to_string(),
            cell: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.content.clone(), settings.sheets.clone())
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Points the Sheets values API and CSV export at other hosts.
    #[must_use]
    pub fn with_google_endpoints(
        mut self,
        sheets_api_base: impl Into<String>,
        sheets_export_base: impl Into<String>,
    ) -> Self {
        self.sheets_api_base = sheets_api_base.into();
        self.sheets_export_base = sheets_export_base.into();
        self
    }

    #[must_use]
    pub fn source(&self) -> ContentSource {
        resolve_content_source(self.content.source.as_deref(), self.content.api_url.as_deref())
    }

    /// ## Summary
    /// Returns the site content, resolving it on first use.
    ///
    /// ## Errors
    /// Returns `ContentError` if the selected source cannot be read, is not
    /// valid JSON, or holds a malformed sheet.
    pub async fn get_site_content(&self) -> ContentResult<&SiteContent> {
        self.cell.get_or_try_init(|| self.load()).await
    }

    #[tracing::instrument(skip(self), fields(source = %self.source()))]
    async fn load(&self) -> ContentResult<SiteContent> {
        let value = match self.source() {
            ContentSource::Local => self.load_local().await?,
            ContentSource::Api => self.load_api().await?,
            ContentSource::Sheets => self.load_sheets().await?,
        };

        tracing::info!("Resolved site content");
        Ok(SiteContent::new(value))
    }

    async fn load_local(&self) -> ContentResult<Value> {
        let Some(path) = non_blank(self.content.local_path.as_ref()) else {
            return parse_json(BUNDLED_CONTENT, "bundled content.json");
        };

        tracing::debug!(path, "Reading site content file");
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ContentError::Io {
                path: path.to_string(),
                source,
            })?;
        parse_json(&text, path)
    }

    async fn load_api(&self) -> ContentResult<Value> {
        let url = non_blank(self.content.api_url.as_ref()).ok_or_else(|| {
            ContentError::Configuration(
                "content.api_url is required when the api source is selected".to_string(),
            )
        })?;

        let text = self.fetch_text(url, JSON_ACCEPT).await?;
        parse_json(&text, url)
    }

    async fn load_sheets(&self) -> ContentResult<Value> {
        if let Some(csv_url) = non_blank(self.sheets.csv_url.as_ref()) {
            return content_from_csv(&self.fetch_text(csv_url, CSV_ACCEPT).await?);
        }

        let id = non_blank(self.sheets.spreadsheet_id.as_ref()).ok_or_else(|| {
            ContentError::Configuration(
                "set sheets.csv_url or sheets.spreadsheet_id when the sheets source is selected"
                    .to_string(),
            )
        })?;

        if let Some(key) = non_blank(self.sheets.api_key.as_ref()) {
            let url = self.values_url(id, key)?;
            let text = self.fetch_text(url.as_str(), JSON_ACCEPT).await?;
            let range: ValueRange = serde_json::from_str(&text).map_err(|source| ContentError::Json {
                origin: url.to_string(),
                source,
            })?;
            return content_from_rows(&range.values);
        }

        let url = self.export_url(id)?;
        content_from_csv(&self.fetch_text(url.as_str(), CSV_ACCEPT).await?)
    }

    fn values_url(&self, id: &str, key: &str) -> ContentResult<Url> {
        let mut url = parse_url(&self.sheets_api_base)?;
        url.path_segments_mut()
            .map_err(|()| ContentError::Configuration(format!("{} cannot take a path", self.sheets_api_base)))?
            .pop_if_empty()
            .extend([id, "values", self.sheets.range.trim()]);
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }

    fn export_url(&self, id: &str) -> ContentResult<Url> {
        let mut url = parse_url(&self.sheets_export_base)?;
        url.path_segments_mut()
            .map_err(|()| ContentError::Configuration(format!("{} cannot take a path", self.sheets_export_base)))?
            .pop_if_empty()
            .extend([id, "export"]);
        url.query_pairs_mut().append_pair("format", "csv");
        if let Some(gid) = non_blank(self.sheets.gid.as_ref()) {
            url.query_pairs_mut().append_pair("gid", gid);
        }
        Ok(url)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_text(&self, url: &str, accept: &str) -> ContentResult<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|source| ContentError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| ContentError::Transport {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(bytes = text.len(), "Fetched site content");
        Ok(text)
    }
}

fn parse_json(text: &str, origin: &str) -> ContentResult<Value> {
    serde_json::from_str(text).map_err(|source| ContentError::Json {
        origin: origin.to_string(),
        source,
    })
}

fn parse_url(raw: &str) -> ContentResult<Url> {
    Url::parse(raw).map_err(|e| ContentError::Configuration(format!("invalid URL {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn sheets() -> SheetsConfig {
        SheetsConfig {
            csv_url: None,
            spreadsheet_id: None,
            gid: None,
            api_key: None,
            range: "Sheet1".to_string(),
        }
    }

    fn content(source: Option<&str>, api_url: Option<String>) -> ContentConfig {
        ContentConfig {
            source: source.map(str::to_string),
            api_url,
            local_path: None,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_bundled_content_by_default() {
        let resolver = ContentResolver::new(ContentConfig::default(), sheets());
        assert_eq!(resolver.source(), ContentSource::Local);

        let site = resolver.get_site_content().await.unwrap();
        assert_eq!(
            site.lookup("site.title"),
            Some(&json!("St Mary's Parish Church"))
        );
        assert!(site.lookup("services[0].name").is_some());
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_local_file_is_error() {
        let config = ContentConfig {
            source: Some("local".into()),
            api_url: None,
            local_path: Some("/nonexistent/steeple/content.json".into()),
        };
        let err = ContentResolver::new(config, sheets())
            .get_site_content()
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::Io { .. }));
    }

    #[test_log::test(tokio::test)]
    async fn test_api_content_is_memoized() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/content.json")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"site":{"title":"From the API"}}"#)
            .expect(1)
            .create_async()
            .await;

        let resolver = ContentResolver::new(
            content(None, Some(format!("{}/content.json", server.url()))),
            sheets(),
        );
        assert_eq!(resolver.source(), ContentSource::Api);

        let first = resolver.get_site_content().await.unwrap();
        assert_eq!(first.lookup("site.title"), Some(&json!("From the API")));
        let second = resolver.get_site_content().await.unwrap();
        assert_eq!(first, second);

        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn test_api_status_is_error_and_not_memoized() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/content.json")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let resolver = ContentResolver::new(
            content(Some("api"), Some(format!("{}/content.json", server.url()))),
            sheets(),
        );
        let err = resolver.get_site_content().await.unwrap_err();
        assert!(matches!(err, ContentError::Status { status: 502, .. }));
        assert!(err.to_string().contains("/content.json"));
        failing.assert_async().await;
        failing.remove_async().await;

        let ok = server
            .mock("GET", "/content.json")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;
        assert_eq!(
            resolver.get_site_content().await.unwrap().lookup("ok"),
            Some(&json!(true))
        );
        ok.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn test_api_without_url_is_configuration_error() {
        let err = ContentResolver::new(content(Some("api"), None), sheets())
            .get_site_content()
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::Configuration(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_api_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/content.json")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = ContentResolver::new(
            content(Some("api"), Some(format!("{}/content.json", server.url()))),
            sheets(),
        )
        .get_site_content()
        .await
        .unwrap_err();

        assert!(matches!(err, ContentError::Json { .. }));
    }

    #[test_log::test(tokio::test)]
    async fn test_sheets_csv_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pub.csv")
            .match_header("accept", CSV_ACCEPT)
            .with_status(200)
            .with_body("path,type,value\nsite.title,string,Sheet title\nevents.homepageLimit,number,4\n")
            .create_async()
            .await;

        let sheets = SheetsConfig {
            csv_url: Some(format!("{}/pub.csv", server.url())),
            ..sheets()
        };
        let site = ContentResolver::new(content(Some("sheets"), None), sheets)
            .get_site_content()
            .await
            .unwrap()
            .clone();

        assert_eq!(
            site.into_value(),
            json!({"site": {"title": "Sheet title"}, "events": {"homepageLimit": 4}})
        );
        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn test_sheets_values_api_when_key_configured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v4/spreadsheets/sheet-123/values/Content")
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .with_status(200)
            .with_body(
                r#"{"range":"Content!A1:C3","majorDimension":"ROWS","values":[["path","type","value"],["site.title","string","Values title"],["site.open","boolean","TRUE"]]}"#,
            )
            .create_async()
            .await;

        let sheets = SheetsConfig {
            spreadsheet_id: Some("sheet-123".into()),
            api_key: Some("secret".into()),
            range: "Content".into(),
            ..sheets()
        };
        let resolver = ContentResolver::new(content(Some("sheets"), None), sheets)
            .with_google_endpoints(format!("{}/v4/spreadsheets", server.url()), server.url());
        let site = resolver.get_site_content().await.unwrap();

        assert_eq!(
            site.as_value(),
            &json!({"site": {"title": "Values title", "open": true}})
        );
        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn test_sheets_export_with_gid() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/spreadsheets/d/sheet-123/export")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "csv".into()),
                Matcher::UrlEncoded("gid".into(), "42".into()),
            ]))
            .with_status(200)
            .with_body("\u{feff}path,type,value\r\nsite.title,,Exported\r\n")
            .create_async()
            .await;

        let sheets = SheetsConfig {
            spreadsheet_id: Some("sheet-123".into()),
            gid: Some("42".into()),
            ..sheets()
        };
        let resolver = ContentResolver::new(content(Some("sheets"), None), sheets)
            .with_google_endpoints(server.url(), format!("{}/spreadsheets/d", server.url()));

        assert_eq!(
            resolver.get_site_content().await.unwrap().lookup("site.title"),
            Some(&json!("Exported"))
        );
        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn test_sheets_path_conflict_surfaces() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/pub.csv")
            .with_status(200)
            .with_body("path,type,value\nsite,string,flat\nsite.title,string,nested\n")
            .create_async()
            .await;

        let sheets = SheetsConfig {
            csv_url: Some(format!("{}/pub.csv", server.url())),
            ..sheets()
        };
        let err = ContentResolver::new(content(Some("sheets"), None), sheets)
            .get_site_content()
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::PathConflict { .. }));
    }
}
