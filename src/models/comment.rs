//! Commit comment DTOs and the line anchor they hang off.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Account;
use crate::error::AppError;

static ANCHOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)L([0-9]+)$").unwrap());

/// A diff line reference of the form `{side}L{line}`.
///
/// `side` picks the diff column, `line` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommentAnchor {
    pub side: u32,
    pub line: u64,
}

impl FromStr for CommentAnchor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("invalid line anchor: {:?}", s));

        let caps = ANCHOR_PATTERN.captures(s).ok_or_else(invalid)?;
        let side: u32 = caps[1].parse().map_err(|_| invalid())?;
        let line: u64 = caps[2].parse().map_err(|_| invalid())?;
        if line == 0 {
            return Err(invalid());
        }

        Ok(Self { side, line })
    }
}

impl TryFrom<String> for CommentAnchor {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommentAnchor> for String {
    fn from(anchor: CommentAnchor) -> Self {
        anchor.to_string()
    }
}

impl fmt::Display for CommentAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}L{}", self.side, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Comment,
    System,
}

/// A comment before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub poster_id: i64,
    pub repo_id: i64,
    /// 0 when attached to a raw commit rather than an issue.
    pub issue_id: i64,
    pub commit_id: String,
    pub anchor: CommentAnchor,
    pub kind: CommentKind,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub poster_id: i64,
    pub repo_id: i64,
    pub issue_id: i64,
    pub commit_id: String,
    pub anchor: CommentAnchor,
    pub kind: CommentKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn from_new(id: i64, new: NewComment, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            poster_id: new.poster_id,
            repo_id: new.repo_id,
            issue_id: new.issue_id,
            commit_id: new.commit_id,
            anchor: new.anchor,
            kind: new.kind,
            content: new.content,
            created_at,
        }
    }

    pub fn first_line(&self) -> &str {
        self.content.lines().next().unwrap_or("")
    }
}

/// A comment ready for display on the diff page.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedComment {
    pub comment: Comment,
    pub poster: Option<Account>,
    pub html: String,
}

/// Repository context a comment is created in.
#[derive(Debug, Clone)]
pub struct RepoRef {
    pub id: i64,
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    CommentCommit,
}

/// Feed entry shown to every watcher of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub actor_id: i64,
    pub actor_name: String,
    pub actor_email: String,
    pub repo_id: i64,
    pub repo_owner: String,
    pub repo_name: String,
    /// `"{commit_id}|{first line of content}"`.
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MailKind {
    Watchers,
    Mention,
}

#[derive(Debug, Clone, Serialize)]
pub struct MailPayload {
    pub kind: MailKind,
    pub subject: String,
    pub body: String,
    pub link: String,
}
