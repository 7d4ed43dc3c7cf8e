//! Clinical free-text sanitization
//!
//! Accession numbers and study descriptions end up as `dcmodify` arguments.
//! Anything outside ASCII letters, digits, space and hyphen is dropped, never
//! escaped. Tabs and newlines count as "anything else".

/// Strip a clinical field down to `[A-Za-z0-9 -]`
///
/// `None` (a field the caller never filled in) yields an empty string.
pub fn sanitize(text: Option<&str>) -> String {
    text.map(|s| s.chars().filter(|c| is_allowed(*c)).collect())
        .unwrap_or_default()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || c == '-'
}
