//! `@handle` extraction and linking.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `@` at the start or after a non-word character, then a handle.
static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w@])@([A-Za-z0-9_][A-Za-z0-9_.\-]*)").unwrap());

/// Bare handles mentioned in `content`, first occurrence order, without
/// case-insensitive duplicates.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut handles: Vec<String> = Vec::new();

    for caps in MENTION_PATTERN.captures_iter(content) {
        let handle = caps[2].trim_end_matches('.');
        if handle.is_empty() {
            continue;
        }
        if !handles.iter().any(|h| h.eq_ignore_ascii_case(handle)) {
            handles.push(handle.to_string());
        }
    }

    handles
}

/// Replaces every mention in already-escaped text with a profile link.
pub(crate) fn link_mentions(escaped: &str) -> String {
    MENTION_PATTERN
        .replace_all(escaped, |caps: &Captures| {
            let raw = &caps[2];
            let handle = raw.trim_end_matches('.');
            let tail = &raw[handle.len()..];
            format!(
                "{}<a href=\"/{}\">@{}</a>{}",
                &caps[1],
                handle.to_lowercase(),
                handle,
                tail
            )
        })
        .into_owned()
}
