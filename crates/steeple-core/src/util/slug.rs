//! Slug generation for human-readable, url-safe identifiers.
//!
//! ## Summary
//! Slugs are lowercase ASCII alphanumerics joined by single hyphens. Anything
//! outside that set (accents, punctuation, emoji) acts as a separator.

/// Lowercases `name` and joins its ASCII alphanumeric runs with single hyphens.
///
/// - "Sunday Service" -> "sunday-service"
/// - "Parents & Toddlers" -> "parents-toddlers"
/// - "St John's Carols" -> "st-john-s-carols"
///
/// A result that parses as a UUID gets a `res-` prefix so title slugs never
/// collide with the bare UUIDs many feeds use as `UID`.
#[must_use]
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if uuid::Uuid::parse_str(&slug).is_ok() {
        slug.insert_str(0, "res-");
    }
    slug
}
