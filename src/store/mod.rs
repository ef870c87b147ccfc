//! External collaborators of the core: accounts, comment persistence and
//! notification delivery.
//!
//! The traits are the seams the navigator, diff engine and comment
//! pipeline are built against. `memory` holds the implementations the
//! binary runs with and the tests stub through.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Account, ActivityEvent, Comment, MailPayload, NewComment, Requester};

pub use memory::{LogNotifier, MemoryAccounts, MemoryCommentStore, SentMail};

#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Maps each known email to its account. Unknown emails are absent.
    async fn resolve_accounts_by_email(&self, emails: &[String]) -> Result<HashMap<String, Account>>;

    /// Accounts for the given handles. Unknown handles are skipped.
    async fn resolve_accounts_by_name(&self, names: &[String]) -> Result<Vec<Account>>;

    async fn get_account(&self, id: i64) -> Result<Option<Account>>;

    /// Accounts watching the repository.
    async fn list_watchers(&self, repo_id: i64) -> Result<Vec<Account>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persists the comment and returns it with its assigned id.
    async fn insert(&self, comment: NewComment) -> Result<Comment>;

    /// Removes the comment if `requester` may delete it. `false` covers both
    /// "no such comment" and "not yours".
    async fn delete(&self, id: i64, requester: &Requester) -> Result<bool>;

    /// Comments on the commit in insertion order.
    async fn list_by_commit(&self, commit_id: &str) -> Result<Vec<Comment>>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn record_activity(&self, event: ActivityEvent) -> Result<()>;

    async fn send_mail(&self, recipients: &[Account], payload: &MailPayload) -> Result<()>;
}
