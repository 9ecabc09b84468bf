//! Canonical phone representation.

/// Trim whitespace and ensure a leading `+`. Empty input is returned as-is.
///
/// Every entry point that accepts a phone number goes through this, so the same
/// physical number resolves to the same identity regardless of client
/// formatting.
pub fn normalize(raw: &str) -> String {
  if raw.is_empty() {
    return String::new();
  }
  let trimmed = raw.trim();
  if trimmed.starts_with('+') {
    trimmed.to_owned()
  } else {
    format!("+{trimmed}")
  }
}
