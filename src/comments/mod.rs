//! Line comments on commits and the notifications they trigger.
//!
//! Creation is a short pipeline with a fixed order:
//!
//! 1. validate content and anchor (nothing written on failure)
//! 2. persist the comment
//! 3. record the repository activity event
//! 4. mail watchers, if mail is enabled
//! 5. mail mentioned accounts not already covered, if mail is enabled
//!
//! A failure in 2 aborts the request. Failures in 3-5 surface as
//! `AppError::Delivery`; the comment stays persisted.

pub mod mention;
pub mod render;

use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    short_sha, Account, ActivityEvent, ActivityKind, Comment, CommentAnchor, CommentKind, MailKind,
    MailPayload, NewComment, RepoRef, Requester,
};
use crate::store::{AccountResolver, CommentStore, NotificationSink};

pub use mention::extract_mentions;
pub use render::render_comment;

/// Result of a successful comment creation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommentCreated {
    pub comment: Comment,
    /// Handles found in the persisted content.
    pub mentions: Vec<String>,
    /// Accounts the watcher mail went to.
    pub watcher_recipients: Vec<Account>,
    /// Accounts the mention mail went to.
    pub mention_recipients: Vec<Account>,
    /// Anchor of the comment on the commit page, e.g. `/owner/repo/commit/<id>#comment-3`.
    pub link: String,
}

pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    accounts: Arc<dyn AccountResolver>,
    notifier: Arc<dyn NotificationSink>,
    config: Config,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        accounts: Arc<dyn AccountResolver>,
        notifier: Arc<dyn NotificationSink>,
        config: Config,
    ) -> Self {
        Self { comments, accounts, notifier, config }
    }

    pub async fn create_commit_comment(
        &self,
        author: &Account,
        repo: &RepoRef,
        commit_id: &str,
        line: &str,
        content: &str,
    ) -> Result<CommentCreated> {
        if content.is_empty() {
            return Err(AppError::Validation("comment content is required".to_string()));
        }
        let anchor: CommentAnchor = line.parse()?;

        let comment = self
            .comments
            .insert(NewComment {
                poster_id: author.id,
                repo_id: repo.id,
                issue_id: 0,
                commit_id: commit_id.to_string(),
                anchor,
                kind: CommentKind::Comment,
                content: content.to_string(),
            })
            .await?;
        tracing::info!("comment {} created on {} at {}", comment.id, commit_id, anchor);

        let mentions = extract_mentions(&comment.content);
        let link = format!(
            "/{}/{}/commit/{}#comment-{}",
            repo.owner, repo.name, commit_id, comment.id
        );

        let comment_id = comment.id;
        let delivery = move |err: AppError| AppError::Delivery {
            comment_id,
            message: err.to_string(),
        };

        self.notifier
            .record_activity(ActivityEvent {
                kind: ActivityKind::CommentCommit,
                actor_id: author.id,
                actor_name: author.name.clone(),
                actor_email: author.email.clone(),
                repo_id: repo.id,
                repo_owner: repo.owner.clone(),
                repo_name: repo.name.clone(),
                content: format!("{}|{}", commit_id, comment.first_line()),
            })
            .await
            .map_err(delivery)?;

        let mut created = CommentCreated {
            comment,
            mentions,
            watcher_recipients: Vec::new(),
            mention_recipients: Vec::new(),
            link,
        };

        if !self.config.mail_enabled {
            return Ok(created);
        }

        let watchers: Vec<Account> = self
            .accounts
            .list_watchers(repo.id)
            .await
            .map_err(delivery)?
            .into_iter()
            .filter(|w| w.id != author.id)
            .collect();

        if !watchers.is_empty() {
            let payload = self.payload(MailKind::Watchers, author, repo, &created);
            self.notifier
                .send_mail(&watchers, &payload)
                .await
                .map_err(delivery)?;
        }

        let residual = residual_mentions(&created.mentions, &watchers, author);
        let mention_recipients: Vec<Account> = if residual.is_empty() {
            Vec::new()
        } else {
            self.accounts
                .resolve_accounts_by_name(&residual)
                .await
                .map_err(delivery)?
                .into_iter()
                .filter(|a| a.id != author.id && !watchers.iter().any(|w| w.id == a.id))
                .collect()
        };

        if !mention_recipients.is_empty() {
            let payload = self.payload(MailKind::Mention, author, repo, &created);
            self.notifier
                .send_mail(&mention_recipients, &payload)
                .await
                .map_err(delivery)?;
        }

        created.watcher_recipients = watchers;
        created.mention_recipients = mention_recipients;
        Ok(created)
    }

    /// Deletes a comment owned by `requester` (or any comment for an admin).
    /// Missing and foreign comments fail the same way.
    pub async fn delete_commit_comment(&self, comment_id: i64, requester: &Requester) -> Result<()> {
        if self.comments.delete(comment_id, requester).await? {
            tracing::info!("comment {} deleted by {}", comment_id, requester.account_id);
            Ok(())
        } else {
            tracing::debug!(
                "comment {} not deleted for {}",
                comment_id,
                requester.account_id
            );
            Err(AppError::Unauthorized)
        }
    }

    fn payload(
        &self,
        kind: MailKind,
        author: &Account,
        repo: &RepoRef,
        created: &CommentCreated,
    ) -> MailPayload {
        let short = short_sha(&created.comment.commit_id);
        let subject = match kind {
            MailKind::Watchers => format!(
                "[{}/{}] New comment on commit {}",
                repo.owner, repo.name, short
            ),
            MailKind::Mention => format!(
                "[{}/{}] {} mentioned you on commit {}",
                repo.owner, repo.name, author.name, short
            ),
        };
        MailPayload {
            kind,
            subject,
            body: created.comment.content.clone(),
            link: created.link.clone(),
        }
    }
}

/// Mentioned handles not already reached through the watcher mail and not
/// the author's own.
fn residual_mentions(mentions: &[String], watchers: &[Account], author: &Account) -> Vec<String> {
    mentions
        .iter()
        .filter(|m| !m.eq_ignore_ascii_case(&author.name))
        .filter(|m| !watchers.iter().any(|w| w.name.eq_ignore_ascii_case(m)))
        .cloned()
        .collect()
}
