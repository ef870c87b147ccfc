use git2::{DiffOptions, Oid, Repository, Revwalk, Sort};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::git::repository::{commit_to_model, ensure_active, resolve_commit};
use crate::models::Commit;

/// Time-sorted walk from `start`, optionally hiding everything reachable
/// from `hide`.
fn walk_from<'r>(repo: &'r Repository, start: Oid, hide: Option<Oid>) -> Result<Revwalk<'r>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push(start)?;
    if let Some(hide) = hide {
        revwalk.hide(hide)?;
    }
    Ok(revwalk)
}

pub fn count_commits(
    repo: &Repository,
    start_ref: &str,
    cancel: &CancellationToken,
) -> Result<usize> {
    let start = resolve_commit(repo, start_ref)?.id();
    let mut count = 0;
    for oid in walk_from(repo, start, None)? {
        ensure_active(cancel)?;
        oid?;
        count += 1;
    }
    Ok(count)
}

pub fn commits_in_range(
    repo: &Repository,
    start_ref: &str,
    offset: usize,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Commit>> {
    let start = resolve_commit(repo, start_ref)?.id();
    let mut commits = Vec::with_capacity(limit);

    for oid in walk_from(repo, start, None)?.skip(offset).take(limit) {
        ensure_active(cancel)?;
        let commit = repo.find_commit(oid?)?;
        commits.push(commit_to_model(&commit));
    }

    Ok(commits)
}

pub fn count_commits_for_path(
    repo: &Repository,
    start_ref: &str,
    path: &str,
    cancel: &CancellationToken,
) -> Result<usize> {
    let start = resolve_commit(repo, start_ref)?.id();
    let mut count = 0;

    for oid in walk_from(repo, start, None)? {
        ensure_active(cancel)?;
        let commit = repo.find_commit(oid?)?;
        if commit_touches_path(repo, &commit, path)? {
            count += 1;
        }
    }

    Ok(count)
}

pub fn commits_for_path(
    repo: &Repository,
    start_ref: &str,
    path: &str,
    offset: usize,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Commit>> {
    let start = resolve_commit(repo, start_ref)?.id();
    let mut commits = Vec::with_capacity(limit);
    let mut skipped = 0;

    for oid in walk_from(repo, start, None)? {
        ensure_active(cancel)?;
        if commits.len() == limit {
            break;
        }
        let commit = repo.find_commit(oid?)?;
        if !commit_touches_path(repo, &commit, path)? {
            continue;
        }
        if skipped < offset {
            skipped += 1;
            continue;
        }
        commits.push(commit_to_model(&commit));
    }

    Ok(commits)
}

/// Case-insensitive substring match on the full message.
pub fn search_commits(
    repo: &Repository,
    start_ref: &str,
    query: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Commit>> {
    let start = resolve_commit(repo, start_ref)?.id();
    let needle = query.to_lowercase();
    let mut commits = Vec::new();

    for oid in walk_from(repo, start, None)? {
        ensure_active(cancel)?;
        let commit = repo.find_commit(oid?)?;
        let matches = commit
            .message()
            .map(|m| m.to_lowercase().contains(&needle))
            .unwrap_or(false);
        if matches {
            commits.push(commit_to_model(&commit));
        }
    }

    Ok(commits)
}

/// Commits from `after_id` back to, but excluding, `before_id`.
pub fn commits_between(
    repo: &Repository,
    before_id: &str,
    after_id: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Commit>> {
    let before = resolve_commit(repo, before_id)?.id();
    let after = resolve_commit(repo, after_id)?.id();
    let mut commits = Vec::new();

    for oid in walk_from(repo, after, Some(before))? {
        ensure_active(cancel)?;
        let commit = repo.find_commit(oid?)?;
        commits.push(commit_to_model(&commit));
    }

    Ok(commits)
}

/// Whether the commit's diff against its first parent touches `path`.
pub(crate) fn commit_touches_path(repo: &Repository, commit: &git2::Commit, path: &str) -> Result<bool> {
    let tree = commit.tree()?;

    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut opts = DiffOptions::new();
    opts.pathspec(path);

    let diff = repo.diff_tree_to_tree(
        parent_tree.as_ref(),
        Some(&tree),
        Some(&mut opts),
    )?;

    Ok(diff.deltas().len() > 0)
}
