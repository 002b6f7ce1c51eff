//! Recovery of a candidate HTML document from raw model output.
//!
//! Models routinely wrap the document in a markdown fence even when told not
//! to. Stripping the fence is total and idempotent; a missing fence is not an
//! error, and output that does not look like HTML only earns a warning.

/// Strip a surrounding ```` ```html ```` fence, if present, and trim.
pub fn extract_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```html") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Loose sniff: does this start like an HTML document?
pub fn looks_like_html(code: &str) -> bool {
    let lower = code.trim_start().to_lowercase();
    lower.starts_with("<!doctype html") || lower.starts_with("<html")
}

/// `extract_code` plus the downstream warning condition from the pipeline's
/// point of view: keep whatever we got, but note when it doesn't sniff as a
/// document.
pub fn extract_document(raw: &str) -> String {
    let code = extract_code(raw);
    if !looks_like_html(&code) {
        tracing::warn!("cleaned response may not be valid HTML");
    }
    code
}
