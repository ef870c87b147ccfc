//! Diff views for a single commit and for a before/after range.
//!
//! Both views are bounded by `Config::max_diff_lines`. The budget is passed
//! to the reader so it can stop early, then re-applied here. Each changed
//! file is sniffed for image content; sniffing is best effort and never
//! fails the request.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::comments::render_comment;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::git::RepositoryReader;
use crate::history::resolve_authors;
use crate::models::{
    Account, CommitDiffView, CommentKind, DiffResult, DiffStatus, RangeDiffView, RenderedComment,
    SubResult,
};
use crate::store::{AccountResolver, CommentStore};

const IMAGE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"II*\x00", "image/tiff"),
    (b"MM\x00*", "image/tiff"),
];

/// Image MIME type for the leading bytes of a file, if they carry a known
/// image signature.
pub fn sniff_image(prefix: &[u8]) -> Option<&'static str> {
    if prefix.len() >= 12 && &prefix[..4] == b"RIFF" && &prefix[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    IMAGE_SIGNATURES
        .iter()
        .find(|(magic, _)| prefix.starts_with(magic))
        .map(|(_, mime)| *mime)
}

/// A diff that cannot be produced is reported as not found; the cause is
/// only logged.
fn diff_unavailable(what: &str, err: AppError) -> AppError {
    if !err.is_not_found() {
        tracing::error!("diff {} failed: {}", what, err);
    }
    AppError::NotFound(format!("diff {}", what))
}

pub struct DiffEngine {
    reader: Arc<dyn RepositoryReader>,
    accounts: Arc<dyn AccountResolver>,
    comments: Arc<dyn CommentStore>,
    config: Config,
}

impl DiffEngine {
    pub fn new(
        reader: Arc<dyn RepositoryReader>,
        accounts: Arc<dyn AccountResolver>,
        comments: Arc<dyn CommentStore>,
        config: Config,
    ) -> Self {
        Self { reader, accounts, comments, config }
    }

    pub async fn get_commit_diff(&self, commit_id: &str) -> Result<CommitDiffView> {
        let max_lines = self.config.max_diff_lines;
        tracing::debug!("diff for {} (budget {})", commit_id, max_lines);

        let mut commit = self.reader.get_commit(commit_id).await?;
        let mut diff = self
            .reader
            .diff_for_commit(&commit.oid, max_lines)
            .await
            .map_err(|e| diff_unavailable(&commit.oid, e))?;
        diff.enforce_budget(max_lines);

        let before_id = commit.first_parent().map(str::to_string);
        self.classify_images(&mut diff, &commit.oid, before_id.as_deref())
            .await;

        let comments = self.comments_by_anchor(&commit.oid).await?;

        resolve_authors(self.accounts.as_ref(), std::slice::from_mut(&mut commit)).await;

        Ok(CommitDiffView {
            title: commit.summary().to_string(),
            parents: commit.parents.clone(),
            before_id,
            diff_not_available: diff.is_empty(),
            diff,
            comments,
            commit,
        })
    }

    /// Diff from `before_id` to `after_id` plus the commits in between.
    ///
    /// A failing diff fails the view. A failing commit listing only marks
    /// that part of the view as failed.
    pub async fn get_range_diff(&self, before_id: &str, after_id: &str) -> Result<RangeDiffView> {
        let max_lines = self.config.max_diff_lines;
        tracing::debug!("compare {}...{} (budget {})", before_id, after_id, max_lines);

        let commit = self.reader.get_commit(after_id).await?;
        let mut diff = self
            .reader
            .diff_for_range(before_id, after_id, max_lines)
            .await
            .map_err(|e| diff_unavailable(&format!("{}...{}", before_id, after_id), e))?;
        diff.enforce_budget(max_lines);
        self.classify_images(&mut diff, after_id, Some(before_id)).await;

        let commits = match self.reader.commits_between(before_id, after_id).await {
            Ok(mut commits) => {
                resolve_authors(self.accounts.as_ref(), &mut commits).await;
                SubResult::Ok { value: commits }
            }
            Err(e) => {
                tracing::warn!("commits between {} and {} unavailable: {}", before_id, after_id, e);
                SubResult::Failed { error: "commit list unavailable".to_string() }
            }
        };

        Ok(RangeDiffView {
            before_id: before_id.to_string(),
            after_id: after_id.to_string(),
            commit,
            diff_not_available: diff.is_empty(),
            diff,
            commits,
        })
    }

    /// Marks image files. Deleted files are read from the before side.
    async fn classify_images(&self, diff: &mut DiffResult, after_id: &str, before_id: Option<&str>) {
        for file in &mut diff.files {
            let commit_id = match file.status {
                DiffStatus::Deleted => match before_id {
                    Some(before) => before,
                    None => continue,
                },
                _ => after_id,
            };
            if file.path().is_empty() {
                continue;
            }
            let is_image = self.is_image_file(commit_id, file.path()).await;
            file.is_image = is_image;
        }
    }

    async fn is_image_file(&self, commit_id: &str, path: &str) -> bool {
        match self
            .reader
            .blob_prefix(commit_id, path, self.config.sniff_bytes)
            .await
        {
            Ok(prefix) => sniff_image(&prefix).is_some(),
            Err(e) => {
                tracing::debug!("not sniffing {} at {}: {}", path, commit_id, e);
                false
            }
        }
    }

    /// Comments on the commit grouped by anchor, posters resolved and plain
    /// comments rendered.
    async fn comments_by_anchor(&self, commit_id: &str) -> Result<BTreeMap<String, Vec<RenderedComment>>> {
        let comments = self.comments.list_by_commit(commit_id).await?;

        let mut posters: HashMap<i64, Option<Account>> = HashMap::new();
        for comment in &comments {
            if !posters.contains_key(&comment.poster_id) {
                let poster = self.accounts.get_account(comment.poster_id).await?;
                posters.insert(comment.poster_id, poster);
            }
        }

        let mut grouped: BTreeMap<String, Vec<RenderedComment>> = BTreeMap::new();
        for comment in comments {
            let html = match comment.kind {
                CommentKind::Comment => render_comment(&comment.content),
                CommentKind::System => comment.content.clone(),
            };
            let poster = posters.get(&comment.poster_id).cloned().flatten();
            grouped
                .entry(comment.anchor.to_string())
                .or_default()
                .push(RenderedComment { comment, poster, html });
        }

        Ok(grouped)
    }
}
