use async_trait::async_trait;
use git2::{BranchType, Repository};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::git::reader::RepositoryReader;
use crate::git::{diff, history};
use crate::models::{AuthorInfo, Commit, DiffResult};

/// git2-backed repository reader.
///
/// Cloning is cheap; clones share the underlying handle.
#[derive(Clone)]
pub struct GitRepository {
    repo: Arc<Mutex<Repository>>,
    pub path: String,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let repo = Repository::discover(&path)
            .map_err(|_| AppError::NotFound(format!("repository {}", path_str)))?;

        Ok(Self {
            repo: Arc::new(Mutex::new(repo)),
            path: path_str,
        })
    }

    pub fn name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Name of the branch HEAD points at, if any.
    pub fn head_branch(&self) -> Result<Option<String>> {
        self.with_repo(|repo| {
            Ok(repo.head().ok().and_then(|h| {
                if h.is_branch() {
                    h.shorthand().map(|s| s.to_string())
                } else {
                    None
                }
            }))
        })
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self
            .repo
            .lock()
            .map_err(|_| AppError::Upstream("repository lock poisoned".to_string()))?;
        f(&repo)
    }

    /// Runs `f` on the blocking pool. The handle is locked only inside the
    /// closure, so every git2 object it creates is dropped before the lock is.
    ///
    /// Dropping the returned future cancels the token handed to `f`; long
    /// walks check it between commits and give the handle back early.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository, &CancellationToken) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            this.with_repo(|repo| {
                ensure_active(&cancel)?;
                f(repo, &cancel)
            })
        })
        .await?
    }
}

/// Fails once the caller has gone away.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(AppError::Upstream("request cancelled".to_string()));
    }
    Ok(())
}

/// Resolves a branch, tag or (abbreviated) commit id to a commit.
pub(crate) fn resolve_commit<'r>(repo: &'r Repository, refname: &str) -> Result<git2::Commit<'r>> {
    let object = repo
        .revparse_single(refname)
        .map_err(|_| AppError::NotFound(format!("revision {}", refname)))?;
    object
        .peel_to_commit()
        .map_err(|_| AppError::NotFound(format!("commit {}", refname)))
}

pub fn commit_to_model(commit: &git2::Commit) -> Commit {
    let timestamp = commit.time().seconds();
    let author = commit.author();
    let committer = commit.committer();

    Commit {
        oid: commit.id().to_string(),
        message: commit.message().unwrap_or("").trim().to_string(),
        author: AuthorInfo {
            name: author.name().unwrap_or("Unknown").to_string(),
            email: author.email().unwrap_or("").to_string(),
        },
        committer: AuthorInfo {
            name: committer.name().unwrap_or("Unknown").to_string(),
            email: committer.email().unwrap_or("").to_string(),
        },
        timestamp,
        relative_time: format_relative_time(timestamp),
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
        account: None,
    }
}

pub fn format_relative_time(timestamp: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let diff = now - timestamp;

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        let mins = diff / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff < 86400 {
        let hours = diff / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if diff < 2592000 {
        let days = diff / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else if diff < 31536000 {
        let months = diff / 2592000;
        format!("{} month{} ago", months, if months == 1 { "" } else { "s" })
    } else {
        let years = diff / 31536000;
        format!("{} year{} ago", years, if years == 1 { "" } else { "s" })
    }
}

#[async_trait]
impl RepositoryReader for GitRepository {
    async fn list_branches(&self) -> Result<Vec<String>> {
        self.run(|repo, _| {
            let mut names = Vec::new();
            for branch in repo.branches(Some(BranchType::Local))? {
                let (branch, _) = branch?;
                if let Some(name) = branch.name()? {
                    names.push(name.to_string());
                }
            }
            Ok(names)
        })
        .await
    }

    async fn count_commits(&self, start_ref: &str) -> Result<usize> {
        let start_ref = start_ref.to_string();
        self.run(move |repo, cancel| history::count_commits(repo, &start_ref, cancel)).await
    }

    async fn commits_in_range(
        &self,
        start_ref: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        let start_ref = start_ref.to_string();
        self.run(move |repo, cancel| {
            history::commits_in_range(repo, &start_ref, offset, limit, cancel)
        })
            .await
    }

    async fn count_commits_for_path(&self, start_ref: &str, path: &str) -> Result<usize> {
        let start_ref = start_ref.to_string();
        let path = path.to_string();
        self.run(move |repo, cancel| {
            history::count_commits_for_path(repo, &start_ref, &path, cancel)
        })
            .await
    }

    async fn commits_for_path(
        &self,
        start_ref: &str,
        path: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        let start_ref = start_ref.to_string();
        let path = path.to_string();
        self.run(move |repo, cancel| {
            history::commits_for_path(repo, &start_ref, &path, offset, limit, cancel)
        })
            .await
    }

    async fn search_commits(&self, start_ref: &str, query: &str) -> Result<Vec<Commit>> {
        let start_ref = start_ref.to_string();
        let query = query.to_string();
        self.run(move |repo, cancel| history::search_commits(repo, &start_ref, &query, cancel))
            .await
    }

    async fn get_commit(&self, id: &str) -> Result<Commit> {
        let id = id.to_string();
        self.run(move |repo, _| Ok(commit_to_model(&resolve_commit(repo, &id)?)))
            .await
    }

    async fn diff_for_commit(&self, id: &str, max_lines: usize) -> Result<DiffResult> {
        let id = id.to_string();
        self.run(move |repo, cancel| diff::diff_for_commit(repo, &id, max_lines, cancel))
            .await
    }

    async fn diff_for_range(
        &self,
        before_id: &str,
        after_id: &str,
        max_lines: usize,
    ) -> Result<DiffResult> {
        let before_id = before_id.to_string();
        let after_id = after_id.to_string();
        self.run(move |repo, cancel| {
            diff::diff_for_range(repo, &before_id, &after_id, max_lines, cancel)
        })
            .await
    }

    async fn commits_between(&self, before_id: &str, after_id: &str) -> Result<Vec<Commit>> {
        let before_id = before_id.to_string();
        let after_id = after_id.to_string();
        self.run(move |repo, cancel| history::commits_between(repo, &before_id, &after_id, cancel))
            .await
    }

    async fn blob_prefix(&self, commit_id: &str, path: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let commit_id = commit_id.to_string();
        let path = path.to_string();
        self.run(move |repo, _| diff::blob_prefix(repo, &commit_id, &path, max_bytes))
            .await
    }
}
