//! Image attachments on calendar events.
//!
//! Classification and URL rewriting are pure functions so pages and tests can
//! use them without a feed.

use std::sync::LazyLock;

use regex::Regex;
use steeple_core::constants::GOOGLE_DRIVE_THUMBNAIL_BASE;
use steeple_rfc::ical::{Component, Property};
use url::Url;

use super::model::ImageAttachment;

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(avif|bmp|gif|heic|jpeg|jpg|png|svg|webp)(\?|$)")
        .expect("valid image extension regex")
});

static DRIVE_PATH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:file/)?d/([^/]+)").expect("valid drive path regex")
});

const DRIVE_HOSTS: &[&str] = &[
    "drive.google.com",
    "docs.google.com",
    "drive.usercontent.google.com",
];

const FULL_SIZE: &str = "w1600";
const THUMBNAIL_SIZE: &str = "w800";

/// ## Summary
/// Returns whether an `ATTACH` property looks like an image.
///
/// True when `FMTTYPE` is `image/*`, or `FILENAME`/`X-FILENAME` or the URL
/// itself ends in a known image extension (optionally before a query).
#[must_use]
pub fn is_image_attachment(prop: &Property, raw_value: &str) -> bool {
    let mime_is_image = prop
        .get_param_value("FMTTYPE")
        .is_some_and(|fmt| fmt.trim().to_ascii_lowercase().starts_with("image/"));

    mime_is_image
        || attachment_filename(prop).is_some_and(|name| IMAGE_EXTENSION.is_match(name))
        || IMAGE_EXTENSION.is_match(raw_value)
}

fn attachment_filename(prop: &Property) -> Option<&str> {
    prop.get_param_value("FILENAME")
        .or_else(|| prop.get_param_value("X-FILENAME"))
}

/// ## Summary
/// Extracts a Google Drive file id from a sharing or download URL.
///
/// Looks at the `id` query parameter first, then `/file/d/<id>` and `/d/<id>`
/// path forms. Returns `None` for other hosts and unparseable URLs.
#[must_use]
pub fn drive_file_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    if !DRIVE_HOSTS.contains(&host.as_str()) {
        return None;
    }

    if let Some((_, id)) = url
        .query_pairs()
        .find(|(key, value)| *key == "id" && !value.is_empty())
    {
        return Some(id.into_owned());
    }

    DRIVE_PATH_ID
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// ## Summary
/// Returns `(full_size_url, thumbnail_url)` for an attachment URL.
///
/// Drive links become thumbnail-endpoint URLs; anything else is used as-is
/// for both.
#[must_use]
pub fn resolve_image_urls(raw: &str) -> (String, String) {
    let raw = raw.trim();
    match drive_file_id(raw) {
        Some(id) => (drive_thumbnail(&id, FULL_SIZE), drive_thumbnail(&id, THUMBNAIL_SIZE)),
        None => (raw.to_string(), raw.to_string()),
    }
}

fn drive_thumbnail(id: &str, size: &str) -> String {
    let mut url = String::from(GOOGLE_DRIVE_THUMBNAIL_BASE);
    url.push_str("?id=");
    url.extend(url::form_urlencoded::byte_serialize(id.as_bytes()));
    url.push_str("&sz=");
    url.push_str(size);
    url
}

/// ## Summary
/// Collects the image attachments of an event in feed order.
///
/// Blank values and inline `VALUE=BINARY` payloads are skipped.
#[must_use]
pub fn image_attachments(component: &Component) -> Vec<ImageAttachment> {
    component
        .attachments()
        .into_iter()
        .filter_map(|prop| {
            let raw = prop.value.as_uri()?.trim();
            if raw.is_empty() || !is_image_attachment(prop, raw) {
                return None;
            }

            let (url, thumbnail_url) = resolve_image_urls(raw);
            Some(ImageAttachment {
                url,
                thumbnail_url,
                filename: attachment_filename(prop).map(str::to_string),
                mime_type: prop.get_param_value("FMTTYPE").map(str::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use steeple_rfc::ical::parse;

    use super::*;

    fn event_with(attach_lines: &str) -> Component {
        let input = format!(
            "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:a\r\nDTSTART:20260104T100000Z\r\n{attach_lines}END:VEVENT\r\nEND:VCALENDAR\r\n"
        );
        parse(&input).unwrap().root.children.remove(0)
    }

    #[test]
    fn test_png_url_with_query_is_image() {
        let event = event_with("ATTACH:https://example.org/poster.PNG?x=1\r\n");
        let prop = event.attachments()[0];
        assert!(is_image_attachment(prop, "https://example.org/poster.PNG?x=1"));
    }

    #[test]
    fn test_pdf_without_image_mime_is_not_image() {
        let event = event_with("ATTACH;FMTTYPE=application/pdf:https://example.org/rota.pdf\r\n");
        let prop = event.attachments()[0];
        assert!(!is_image_attachment(prop, "https://example.org/rota.pdf"));
    }

    #[test]
    fn test_mime_or_filename_marks_image() {
        let event = event_with(
            "ATTACH;FMTTYPE=IMAGE/JPEG:https://example.org/download?f=1\r\n\
ATTACH;FILENAME=flyer.webp:https://example.org/download?f=2\r\n\
ATTACH;X-FILENAME=flyer.heic:https://example.org/download?f=3\r\n",
        );
        let attachments = event.attachments();
        assert!(is_image_attachment(attachments[0], "https://example.org/download?f=1"));
        assert!(is_image_attachment(attachments[1], "https://example.org/download?f=2"));
        assert!(is_image_attachment(attachments[2], "https://example.org/download?f=3"));
    }

    #[test]
    fn test_drive_file_id_forms() {
        assert_eq!(
            drive_file_id("https://drive.google.com/file/d/ABC123/view?usp=sharing").as_deref(),
            Some("ABC123")
        );
        assert_eq!(
            drive_file_id("https://drive.google.com/open?id=XYZ").as_deref(),
            Some("XYZ")
        );
        assert_eq!(
            drive_file_id("https://docs.google.com/document/d/DOC9/edit").as_deref(),
            Some("DOC9")
        );
        assert_eq!(
            drive_file_id("https://drive.usercontent.google.com/download?id=U1&export=view")
                .as_deref(),
            Some("U1")
        );
        assert_eq!(drive_file_id("https://example.org/file/d/ABC123/view"), None);
        assert_eq!(drive_file_id("not a url"), None);
    }

    #[test]
    fn test_resolve_image_urls_for_drive() {
        let (full, thumb) = resolve_image_urls("https://drive.google.com/file/d/ABC123/view");
        assert_eq!(full, "https://drive.google.com/thumbnail?id=ABC123&sz=w1600");
        assert_eq!(thumb, "https://drive.google.com/thumbnail?id=ABC123&sz=w800");
    }

    #[test]
    fn test_resolve_image_urls_passthrough() {
        let (full, thumb) = resolve_image_urls(" https://example.org/a.jpg ");
        assert_eq!(full, "https://example.org/a.jpg");
        assert_eq!(thumb, full);
    }

    #[test]
    fn test_image_attachments_skip_binary_blank_and_non_images() {
        let event = event_with(
            "ATTACH;ENCODING=BASE64;VALUE=BINARY;FMTTYPE=image/png:aGVsbG8=\r\n\
ATTACH: \r\n\
ATTACH:https://example.org/notes.pdf\r\n\
ATTACH;FMTTYPE=image/png;FILENAME=banner.png:https://drive.google.com/file/d/B1/view\r\n\
ATTACH:https://example.org/second.jpg\r\n",
        );

        let images = image_attachments(&event);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].thumbnail_url, "https://drive.google.com/thumbnail?id=B1&sz=w800");
        assert_eq!(images[0].filename.as_deref(), Some("banner.png"));
        assert_eq!(images[0].mime_type.as_deref(), Some("image/png"));
        assert_eq!(images[1].url, "https://example.org/second.jpg");
        assert_eq!(images[1].filename, None);
    }
}
