//! Property parameters (RFC 5545 §3.2).

/// One `NAME=value[,value...]` parameter, e.g. `FMTTYPE=image/png` on an
/// `ATTACH` or `TZID=Europe/London` on a `DTSTART`.
///
/// Values are stored unquoted with RFC 6868 escapes already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<String>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_values(name, vec![value.into()])
    }

    #[must_use]
    pub fn with_values(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            values,
        }
    }

    /// The first value; multi-valued parameters such as `MEMBER` are rare in
    /// calendar feeds.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}
