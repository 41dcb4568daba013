use super::coerce::CoercionError;

/// Error while resolving site content.
///
/// Unlike the calendar path, every one of these reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Failed to fetch site content from {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Site content request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON in site content from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read site content file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid CSV: unterminated quoted field")]
    UnterminatedQuote,

    #[error("Content sheet is empty")]
    EmptySheet,

    #[error(
        "Content sheet header must include \"path\", \"type\" and \"value\" columns (missing: {})",
        .0.join(", ")
    )]
    MissingColumns(Vec<&'static str>),

    #[error("Invalid content path: {0:?}")]
    InvalidPath(String),

    #[error("Invalid {kind} value for {path}: {source}")]
    Coercion {
        path: String,
        kind: String,
        #[source]
        source: CoercionError,
    },

    #[error("Path {path} expected {expected} before {segment}")]
    PathConflict {
        path: String,
        expected: &'static str,
        segment: String,
    },

    #[error("Invalid content configuration: {0}")]
    Configuration(String),
}

pub type ContentResult<T> = std::result::Result<T, ContentError>;
