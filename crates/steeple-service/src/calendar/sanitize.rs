//! Event description to HTML.
//!
//! Organizers type descriptions into Google Calendar, which stores either
//! plain text or a small HTML fragment. Both become an HTML fragment a page
//! can embed.

use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?[a-z][a-z0-9-]*(?:[\s/][^<>]*)?/?>").expect("valid html tag regex")
});

/// Paired blocks removed together with their content. One pattern per tag
/// since the regex engine has no backreferences.
static BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "iframe", "object", "embed"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("valid block regex")
        })
        .collect()
});

static STANDALONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:script|style|iframe|object|embed|link|meta)\b[^>]*>")
        .expect("valid standalone tag regex")
});

/// HTML accepts `/` as well as whitespace before an attribute name.
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s/]+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("valid event handler regex")
});

static JAVASCRIPT_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)([\s/])(href|src)\s*=\s*(?:"\s*javascript:[^"]*"|'\s*javascript:[^']*'|javascript:[^\s>]*)"#,
    )
    .expect("valid javascript uri regex")
});

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid paragraph break regex"));

/// Returns whether the text contains at least one HTML tag.
#[must_use]
pub fn looks_like_html(text: &str) -> bool {
    HTML_TAG.is_match(text)
}

/// ## Summary
/// Turns a raw `DESCRIPTION` into an HTML fragment.
///
/// HTML input is passed through a denylist filter: script, style and embedded
/// content is removed, `on*` handlers are dropped and `javascript:` links
/// become `#`. Plain text is escaped and split into paragraphs.
///
/// This is a best-effort filter, not a security-grade HTML sanitizer. Pages
/// that render untrusted feeds must apply their own policy.
///
/// Returns `None` for empty or whitespace-only input.
#[must_use]
pub fn sanitize_description(raw: &str) -> Option<String> {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }

    let html = if looks_like_html(trimmed) {
        sanitize_html(trimmed)
    } else {
        text_to_html(trimmed)
    };

    let html = html.trim();
    (!html.is_empty()).then(|| html.to_string())
}

fn sanitize_html(html: &str) -> String {
    let mut out = html.to_string();
    for block in BLOCKS.iter() {
        out = block.replace_all(&out, "").into_owned();
    }
    out = STANDALONE.replace_all(&out, "").into_owned();
    out = EVENT_HANDLER.replace_all(&out, "").into_owned();
    JAVASCRIPT_URI.replace_all(&out, r##"$1$2="#""##).into_owned()
}

fn text_to_html(text: &str) -> String {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| format!("<p>{}</p>", escape_html(paragraph).replace('\n', "<br />")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
