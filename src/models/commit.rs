use serde::{Deserialize, Serialize};

use super::Account;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
}

/// A commit as read from the repository. Only `account` is ever filled in
/// after the fact, by author resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub oid: String,
    pub message: String,
    pub author: AuthorInfo,
    pub committer: AuthorInfo,
    pub timestamp: i64,
    pub relative_time: String,
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl Commit {
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

pub fn short_sha(oid: &str) -> &str {
    match oid.char_indices().nth(10) {
        Some((idx, _)) => &oid[..idx],
        None => oid,
    }
}

/// One page of history, newest first.
///
/// `previous_page` and `next_page` use 0 for "no such page".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub commits: Vec<Commit>,
    pub total: usize,
    pub page: usize,
    pub previous_page: usize,
    pub next_page: usize,
}
