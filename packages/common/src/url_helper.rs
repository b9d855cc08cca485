//! Link detection inside free text.
//!
//! A link starts with `http://`, `https://` or `www.` and runs until the next
//! whitespace, so query strings, fragments and non-ASCII paths are kept whole.

use regex::Regex;
use std::sync::OnceLock;

const LINK_PATTERN: &str = r"(?i)(?:https?://|www\.)\S+";

fn link_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(LINK_PATTERN).ok()).as_ref()
}

/// True if the text contains at least one link
pub fn contains_link(text: &str) -> bool {
    link_pattern().is_some_and(|re| re.is_match(text))
}

/// Remove the first link and trim what is left
pub fn strip_link(text: &str) -> String {
    match link_pattern() {
        Some(re) => re.replace(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// The first link in the text, with `http://` added to bare `www.` links
pub fn get_link(text: &str) -> Option<String> {
    let found = link_pattern()?.find(text)?.as_str();
    if found.to_ascii_lowercase().starts_with("www.") {
        Some(format!("http://{found}"))
    } else {
        Some(found.to_string())
    }
}
