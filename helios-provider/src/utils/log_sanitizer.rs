//! Log sanitization utilities
//!
//! Catalog listings can be large (every photograph in an album), so bodies
//! are cut down and folded onto one line before they reach debug logs.

/// Maximum number of characters to include in truncated log output.
const TRUNCATE_LIMIT: usize = 256;

/// Truncate a response body for logging.
///
/// Line breaks become spaces so one body is one log line. Bodies longer than
/// `TRUNCATE_LIMIT` characters keep their head plus the total byte length.
pub fn truncate_for_log(s: &str) -> String {
    let cut = s
        .char_indices()
        .nth(TRUNCATE_LIMIT)
        .map_or(s.len(), |(index, _)| index);
    let head: String = s[..cut]
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if cut == s.len() {
        head
    } else {
        format!("{head}... [truncated, total {} bytes]", s.len())
    }
}
