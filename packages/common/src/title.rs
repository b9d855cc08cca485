//! Display formatting for idea titles.

use crate::url_helper::strip_link;
use regex::Regex;
use std::sync::OnceLock;

fn horizontal_space() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[ \t]+").ok()).as_ref()
}

/// Title as shown on a node.
///
/// A title made only of a link keeps the link, cut to `max_url_length`
/// characters followed by `...` when longer. Otherwise the first link is
/// removed. Runs of spaces and tabs collapse to one space and every line is
/// trimmed.
pub fn formatted_node_title(title: &str, max_url_length: Option<usize>) -> String {
    let visible = without_link(title, max_url_length);
    let collapsed = match horizontal_space() {
        Some(re) => re.replace_all(&visible, " ").into_owned(),
        None => visible,
    };
    collapsed
        .replace('\r', "")
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

fn without_link(title: &str, max_url_length: Option<usize>) -> String {
    if title.is_empty() {
        return String::new();
    }
    let stripped = strip_link(title);
    if !stripped.trim().is_empty() {
        return stripped;
    }
    match max_url_length {
        Some(max) if max > 0 && title.chars().count() >= max => {
            let mut shortened: String = title.chars().take(max).collect();
            shortened.push_str("...");
            shortened
        }
        _ => title.to_string(),
    }
}
