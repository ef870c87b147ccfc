//! In-memory repository reader for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::git::RepositoryReader;
use crate::models::{AuthorInfo, Commit, DiffResult};

/// Commit `i` of a linear history; `i - 1` is its parent.
pub(crate) fn commit(i: usize) -> Commit {
    let email = if i % 2 == 0 {
        "alice@example.com".to_string()
    } else {
        format!("dev{}@example.com", i)
    };
    Commit {
        oid: format!("{:040x}", i + 1),
        message: format!("commit {}", i),
        author: AuthorInfo { name: format!("dev {}", i), email: email.clone() },
        committer: AuthorInfo { name: format!("dev {}", i), email },
        timestamp: 1_700_000_000 + i as i64,
        relative_time: String::new(),
        parents: if i == 0 { Vec::new() } else { vec![format!("{:040x}", i)] },
        account: None,
    }
}

#[derive(Default)]
pub(crate) struct StubReader {
    pub branches: Vec<String>,
    /// Newest first.
    pub commits: Vec<Commit>,
    pub path_commits: HashMap<String, Vec<Commit>>,
    /// Keyed by commit id, or `"before..after"` for ranges.
    pub diffs: HashMap<String, DiffResult>,
    /// Keyed by `(commit id, path)`.
    pub blobs: HashMap<(String, String), Vec<u8>>,
    pub fail_between: bool,
    pub fail_diff: bool,
    pub calls: Mutex<Vec<String>>,
}

impl StubReader {
    pub fn linear(n: usize) -> Self {
        Self {
            branches: vec!["main".to_string()],
            commits: (0..n).rev().map(commit).collect(),
            ..Self::default()
        }
    }

    fn record(&self, call: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.to_string());
        }
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.calls
            .lock()
            .map(|calls| calls.iter().any(|c| c == call))
            .unwrap_or(false)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.commits
            .iter()
            .position(|c| c.oid == id)
            .ok_or_else(|| AppError::NotFound(format!("commit {}", id)))
    }
}

#[async_trait]
impl RepositoryReader for StubReader {
    async fn list_branches(&self) -> Result<Vec<String>> {
        self.record("list_branches");
        Ok(self.branches.clone())
    }

    async fn count_commits(&self, _start_ref: &str) -> Result<usize> {
        self.record("count_commits");
        Ok(self.commits.len())
    }

    async fn commits_in_range(&self, _start_ref: &str, offset: usize, limit: usize) -> Result<Vec<Commit>> {
        self.record("commits_in_range");
        Ok(self.commits.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count_commits_for_path(&self, _start_ref: &str, path: &str) -> Result<usize> {
        self.record("count_commits_for_path");
        Ok(self.path_commits.get(path).map(Vec::len).unwrap_or(0))
    }

    async fn commits_for_path(
        &self,
        _start_ref: &str,
        path: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        self.record("commits_for_path");
        Ok(self
            .path_commits
            .get(path)
            .map(|list| list.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn search_commits(&self, _start_ref: &str, query: &str) -> Result<Vec<Commit>> {
        self.record("search_commits");
        let needle = query.to_lowercase();
        Ok(self
            .commits
            .iter()
            .filter(|c| c.message.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get_commit(&self, id: &str) -> Result<Commit> {
        self.record("get_commit");
        let idx = self.position(id)?;
        Ok(self.commits[idx].clone())
    }

    async fn diff_for_commit(&self, id: &str, max_lines: usize) -> Result<DiffResult> {
        self.record("diff_for_commit");
        if self.fail_diff {
            return Err(AppError::Upstream("diff process died".to_string()));
        }
        self.position(id)?;
        let mut diff = self.diffs.get(id).cloned().unwrap_or_else(|| DiffResult::empty(max_lines));
        diff.max_lines = max_lines;
        Ok(diff)
    }

    async fn diff_for_range(&self, before_id: &str, after_id: &str, max_lines: usize) -> Result<DiffResult> {
        self.record("diff_for_range");
        if self.fail_diff {
            return Err(AppError::Upstream("diff process died".to_string()));
        }
        self.position(before_id)?;
        self.position(after_id)?;
        let key = format!("{}..{}", before_id, after_id);
        let mut diff = self.diffs.get(&key).cloned().unwrap_or_else(|| DiffResult::empty(max_lines));
        diff.max_lines = max_lines;
        Ok(diff)
    }

    async fn commits_between(&self, before_id: &str, after_id: &str) -> Result<Vec<Commit>> {
        self.record("commits_between");
        if self.fail_between {
            return Err(AppError::Upstream("rev-list failed".to_string()));
        }
        let before = self.position(before_id)?;
        let after = self.position(after_id)?;
        if after > before {
            return Ok(Vec::new());
        }
        Ok(self.commits[after..before].to_vec())
    }

    async fn blob_prefix(&self, commit_id: &str, path: &str, max_bytes: usize) -> Result<Vec<u8>> {
        self.record("blob_prefix");
        let blob = self
            .blobs
            .get(&(commit_id.to_string(), path.to_string()))
            .ok_or_else(|| AppError::NotFound(format!("{} at {}", path, commit_id)))?;
        Ok(blob[..blob.len().min(max_bytes)].to_vec())
    }
}
