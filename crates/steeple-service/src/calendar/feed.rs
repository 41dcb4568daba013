//! Calendar feed retrieval with a process-wide single-slot cache.

use std::future::Future;
use std::sync::Arc;

use steeple_core::config::{CalendarConfig, FeedFailurePolicy};
use tokio::sync::OnceCell;

/// Error while obtaining the calendar feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Failed to fetch calendar feed from {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Calendar feed {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse calendar feed: {0}")]
    Parse(#[from] steeple_rfc::ical::ParseError),
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Something that can hand out the raw iCalendar text.
///
/// `None` means the feed is unavailable; the failure has already been logged.
pub trait FeedSource: Send + Sync {
    fn feed_text(&self) -> impl Future<Output = Option<Arc<str>>> + Send;
}

/// Fetches the configured feed over HTTP at most once per process.
///
/// Concurrent callers share one in-flight request. Under
/// [`FeedFailurePolicy::Cache`] a failed fetch is remembered as `None`; under
/// [`FeedFailurePolicy::Retry`] only success is stored.
#[derive(Debug)]
pub struct FeedCache {
    client: reqwest::Client,
    url: String,
    policy: FeedFailurePolicy,
    cell: OnceCell<Option<Arc<str>>>,
}

impl FeedCache {
    #[must_use]
    pub fn new(url: impl Into<String>, policy: FeedFailurePolicy) -> Self {
        Self::with_client(reqwest::Client::new(), url, policy)
    }

    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        url: impl Into<String>,
        policy: FeedFailurePolicy,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            policy,
            cell: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(config.ics_url.clone(), config.feed_failure_policy)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// ## Summary
    /// Performs one HTTP GET of the feed, bypassing the cache.
    ///
    /// ## Errors
    /// Returns `FeedError::Transport` if the request or body read fails, and
    /// `FeedError::Status` for non-2xx responses.
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> FeedResult<Arc<str>> {
        tracing::debug!("Fetching calendar feed");

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/calendar,text/plain;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|source| FeedError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| FeedError::Transport {
            url: self.url.clone(),
            source,
        })?;

        tracing::info!(bytes = text.len(), "Fetched calendar feed");
        Ok(Arc::from(text))
    }
}

impl FeedSource for FeedCache {
    async fn feed_text(&self) -> Option<Arc<str>> {
        match self.policy {
            FeedFailurePolicy::Cache => self
                .cell
                .get_or_init(|| async {
                    self.fetch()
                        .await
                        .inspect_err(|e| tracing::error!(error = %e, "Calendar feed unavailable"))
                        .ok()
                })
                .await
                .clone(),
            FeedFailurePolicy::Retry => self
                .cell
                .get_or_try_init(|| async { self.fetch().await.map(Some) })
                .await
                .inspect_err(|e| tracing::error!(error = %e, "Calendar feed unavailable"))
                .ok()
                .and_then(Clone::clone),
        }
    }
}
