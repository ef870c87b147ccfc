//! Repository reader capability.
//!
//! Everything the core needs from the version-control store. `GitRepository`
//! is the git2-backed implementation; tests substitute in-memory readers.
//!
//! Implementations report a missing ref, commit or path as
//! `AppError::NotFound` and any other fault as `AppError::Upstream`.
//! Dropping a returned future abandons the call.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Commit, DiffResult};

#[async_trait]
pub trait RepositoryReader: Send + Sync {
    /// Local branch names.
    async fn list_branches(&self) -> Result<Vec<String>>;

    /// Commits reachable from `start_ref` (branch name or commit id).
    async fn count_commits(&self, start_ref: &str) -> Result<usize>;

    /// Newest-first slice of the history reachable from `start_ref`.
    async fn commits_in_range(&self, start_ref: &str, offset: usize, limit: usize)
        -> Result<Vec<Commit>>;

    /// Commits reachable from `start_ref` that touched `path`.
    async fn count_commits_for_path(&self, start_ref: &str, path: &str) -> Result<usize>;

    async fn commits_for_path(
        &self,
        start_ref: &str,
        path: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Commit>>;

    /// Commits whose message contains `query`, case-insensitively.
    async fn search_commits(&self, start_ref: &str, query: &str) -> Result<Vec<Commit>>;

    async fn get_commit(&self, id: &str) -> Result<Commit>;

    /// Diff of a commit against its first parent (or the empty tree),
    /// materialising at most `max_lines` hunk lines.
    async fn diff_for_commit(&self, id: &str, max_lines: usize) -> Result<DiffResult>;

    async fn diff_for_range(&self, before_id: &str, after_id: &str, max_lines: usize)
        -> Result<DiffResult>;

    /// Commits reachable from `after_id` but not from `before_id`, newest first.
    async fn commits_between(&self, before_id: &str, after_id: &str) -> Result<Vec<Commit>>;

    /// Up to `max_bytes` from the start of the blob at `path` in `commit_id`.
    async fn blob_prefix(&self, commit_id: &str, path: &str, max_bytes: usize) -> Result<Vec<u8>>;
}
