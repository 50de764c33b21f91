//! Path-segment sanitization for archive entries.

/// Characters that are illegal in at least one target filesystem or in zip
/// entry names.
const ILLEGAL: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Make a user-supplied name safe as a single path segment: illegal
/// characters become `-`, surrounding whitespace is trimmed, interior
/// whitespace becomes `_`, and a name with nothing left falls back to a
/// fixed literal so no entry ever gets an empty segment.
pub fn sanitize(name: &str) -> String {
    let replaced: String =
        name.chars().map(|c| if ILLEGAL.contains(&c) { '-' } else { c }).collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }
    trimmed.chars().map(|c| if c.is_whitespace() { '_' } else { c }).collect()
}
