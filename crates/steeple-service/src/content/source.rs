/// Where site content is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// JSON bundled with the crate, or a local file.
    Local,
    /// A JSON endpoint.
    Api,
    /// A Google Sheet of `(path, type, value)` rows.
    Sheets,
}

impl ContentSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Api => "api",
            Self::Sheets => "sheets",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "api" => Some(Self::Api),
            "sheets" => Some(Self::Sheets),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ## Summary
/// Picks the content source from configuration.
///
/// A recognised explicit choice wins. Otherwise a configured API URL selects
/// [`ContentSource::Api`], and everything else falls back to
/// [`ContentSource::Local`]. Unrecognised choices are ignored.
#[must_use]
pub fn resolve_content_source(explicit: Option<&str>, api_url: Option<&str>) -> ContentSource {
    if let Some(source) = explicit.and_then(ContentSource::parse) {
        return source;
    }

    if api_url.is_some_and(|url| !url.trim().is_empty()) {
        ContentSource::Api
    } else {
        ContentSource::Local
    }
}
