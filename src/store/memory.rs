//! In-process implementations of the collaborator traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Account, ActivityEvent, Comment, MailPayload, NewComment, Requester};
use crate::store::{AccountResolver, CommentStore, NotificationSink};

fn poisoned() -> AppError {
    AppError::Upstream("store lock poisoned".to_string())
}

#[derive(Default)]
pub struct MemoryAccounts {
    accounts: RwLock<Vec<Account>>,
    /// repo id -> watching account ids
    watchers: RwLock<HashMap<i64, Vec<i64>>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, account: Account) -> Result<()> {
        self.accounts.write().map_err(|_| poisoned())?.push(account);
        Ok(())
    }

    pub fn watch(&self, repo_id: i64, account_id: i64) -> Result<()> {
        let mut watchers = self.watchers.write().map_err(|_| poisoned())?;
        let list = watchers.entry(repo_id).or_default();
        if !list.contains(&account_id) {
            list.push(account_id);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountResolver for MemoryAccounts {
    async fn resolve_accounts_by_email(&self, emails: &[String]) -> Result<HashMap<String, Account>> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        let mut resolved = HashMap::new();
        for email in emails {
            if let Some(account) = accounts.iter().find(|a| a.email.eq_ignore_ascii_case(email)) {
                resolved.insert(email.clone(), account.clone());
            }
        }
        Ok(resolved)
    }

    async fn resolve_accounts_by_name(&self, names: &[String]) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(names
            .iter()
            .filter_map(|name| accounts.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
            .cloned()
            .collect())
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_watchers(&self, repo_id: i64) -> Result<Vec<Account>> {
        let ids = self
            .watchers
            .read()
            .map_err(|_| poisoned())?
            .get(&repo_id)
            .cloned()
            .unwrap_or_default();
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(ids
            .iter()
            .filter_map(|id| accounts.iter().find(|a| a.id == *id))
            .cloned()
            .collect())
    }
}

pub struct MemoryCommentStore {
    next_id: AtomicI64,
    comments: RwLock<Vec<Comment>>,
}

impl Default for MemoryCommentStore {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            comments: RwLock::new(Vec::new()),
        }
    }
}

impl MemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.comments.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn insert(&self, comment: NewComment) -> Result<Comment> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let comment = Comment::from_new(id, comment, chrono::Utc::now());
        self.comments
            .write()
            .map_err(|_| poisoned())?
            .push(comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: i64, requester: &Requester) -> Result<bool> {
        let mut comments = self.comments.write().map_err(|_| poisoned())?;
        let position = comments
            .iter()
            .position(|c| c.id == id && (requester.is_admin || c.poster_id == requester.account_id));
        match position {
            Some(idx) => {
                comments.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_commit(&self, commit_id: &str) -> Result<Vec<Comment>> {
        let comments = self.comments.read().map_err(|_| poisoned())?;
        Ok(comments
            .iter()
            .filter(|c| c.commit_id == commit_id)
            .cloned()
            .collect())
    }
}

/// A mail the sink was asked to deliver.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipients: Vec<String>,
    pub payload: MailPayload,
}

/// Notification sink without a mail transport: activity and mail are logged
/// and kept in memory.
#[derive(Default)]
pub struct LogNotifier {
    activities: Mutex<Vec<ActivityEvent>>,
    mails: Mutex<Vec<SentMail>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activities(&self) -> Vec<ActivityEvent> {
        self.activities.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn mails(&self) -> Vec<SentMail> {
        self.mails.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn record_activity(&self, event: ActivityEvent) -> Result<()> {
        tracing::info!(
            "activity {:?} by {} on {}/{}: {}",
            event.kind,
            event.actor_name,
            event.repo_owner,
            event.repo_name,
            event.content
        );
        self.activities.lock().map_err(|_| poisoned())?.push(event);
        Ok(())
    }

    async fn send_mail(&self, recipients: &[Account], payload: &MailPayload) -> Result<()> {
        let recipients: Vec<String> = recipients.iter().map(|a| a.email.clone()).collect();
        tracing::info!(
            "mail ({:?}) to {}: {}",
            payload.kind,
            recipients.join(", "),
            payload.subject
        );
        self.mails.lock().map_err(|_| poisoned())?.push(SentMail {
            recipients,
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommentAnchor, CommentKind};

    fn new_comment(poster_id: i64, commit: &str) -> NewComment {
        NewComment {
            poster_id,
            repo_id: 1,
            issue_id: 0,
            commit_id: commit.to_string(),
            anchor: CommentAnchor { side: 0, line: 3 },
            kind: CommentKind::Comment,
            content: "looks fine".to_string(),
        }
    }

    #[tokio::test]
    async fn comment_ids_are_assigned_in_order() {
        let store = MemoryCommentStore::new();
        let a = store.insert(new_comment(1, "abc")).await.unwrap();
        let b = store.insert(new_comment(2, "abc")).await.unwrap();
        store.insert(new_comment(2, "def")).await.unwrap();

        assert!(a.id < b.id);
        let listed = store.list_by_commit("abc").await.unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn only_poster_or_admin_deletes() {
        let store = MemoryCommentStore::new();
        let c = store.insert(new_comment(1, "abc")).await.unwrap();

        assert!(!store.delete(c.id, &Requester::user(2)).await.unwrap());
        assert!(store.delete(c.id, &Requester::user(1)).await.unwrap());
        assert!(!store.delete(c.id, &Requester::user(1)).await.unwrap());

        let c = store.insert(new_comment(1, "abc")).await.unwrap();
        assert!(store.delete(c.id, &Requester::admin(99)).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn email_lookup_ignores_case_and_skips_unknown() {
        let accounts = MemoryAccounts::new();
        accounts
            .add(Account { id: 1, name: "alice".into(), email: "Alice@Example.com".into() })
            .unwrap();

        let resolved = accounts
            .resolve_accounts_by_email(&["alice@example.com".into(), "nobody@example.com".into()])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["alice@example.com"].id, 1);
    }

    #[tokio::test]
    async fn watchers_are_listed_once() {
        let accounts = MemoryAccounts::new();
        accounts
            .add(Account { id: 7, name: "bob".into(), email: "bob@example.com".into() })
            .unwrap();
        accounts.watch(1, 7).unwrap();
        accounts.watch(1, 7).unwrap();

        let watchers = accounts.list_watchers(1).await.unwrap();
        assert_eq!(watchers.len(), 1);
        assert!(accounts.list_watchers(2).await.unwrap().is_empty());
    }
}
