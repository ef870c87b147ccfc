use git2::{Delta, DiffOptions, ObjectType, Repository, Tree};
use std::io::Read;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::git::repository::{ensure_active, resolve_commit};
use crate::models::{DiffFile, DiffHunk, DiffLine, DiffResult, DiffStats, DiffStatus, LineType};

pub fn diff_for_commit(
    repo: &Repository,
    id: &str,
    max_lines: usize,
    cancel: &CancellationToken,
) -> Result<DiffResult> {
    let commit = resolve_commit(repo, id)?;
    let to_tree = commit.tree()?;
    let from_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    build_diff(repo, from_tree.as_ref(), &to_tree, max_lines, cancel)
}

pub fn diff_for_range(
    repo: &Repository,
    before_id: &str,
    after_id: &str,
    max_lines: usize,
    cancel: &CancellationToken,
) -> Result<DiffResult> {
    let before = resolve_commit(repo, before_id)?;
    let after = resolve_commit(repo, after_id)?;
    let from_tree = before.tree()?;
    let to_tree = after.tree()?;

    build_diff(repo, Some(&from_tree), &to_tree, max_lines, cancel)
}

/// Tree-to-tree diff that stops materialising hunk lines once `max_lines`
/// have been emitted. Later files keep their header and counts.
fn build_diff(
    repo: &Repository,
    from_tree: Option<&Tree>,
    to_tree: &Tree,
    max_lines: usize,
    cancel: &CancellationToken,
) -> Result<DiffResult> {
    let mut opts = DiffOptions::new();
    opts.context_lines(3);

    let mut diff = repo.diff_tree_to_tree(from_tree, Some(to_tree), Some(&mut opts))?;
    diff.find_similar(None)?;

    let mut files: Vec<DiffFile> = Vec::new();
    let mut stats = DiffStats::default();
    let mut remaining = max_lines;
    let mut truncated = false;

    for delta_idx in 0..diff.deltas().len() {
        ensure_active(cancel)?;
        let Some(delta) = diff.get_delta(delta_idx) else {
            continue;
        };

        let status = match delta.status() {
            Delta::Added => DiffStatus::Added,
            Delta::Deleted => DiffStatus::Deleted,
            Delta::Modified => DiffStatus::Modified,
            Delta::Renamed => DiffStatus::Renamed,
            Delta::Copied => DiffStatus::Copied,
            Delta::Typechange => DiffStatus::TypeChanged,
            _ => DiffStatus::Unmodified,
        };

        let old_path = delta.old_file().path().map(|p| p.to_string_lossy().to_string());
        let new_path = delta.new_file().path().map(|p| p.to_string_lossy().to_string());

        let mut file = DiffFile {
            old_path: if status == DiffStatus::Added { None } else { old_path },
            new_path: if status == DiffStatus::Deleted { None } else { new_path },
            status,
            additions: 0,
            deletions: 0,
            hunks: Vec::new(),
            is_binary: delta.flags().is_binary(),
            is_image: false,
            truncated: false,
        };

        if let Some(patch) = git2::Patch::from_diff(&diff, delta_idx)? {
            // Binary detection is only settled once the patch has loaded content.
            file.is_binary = file.is_binary || patch.delta().flags().is_binary();
            let (_, additions, deletions) = patch.line_stats()?;
            file.additions = additions;
            file.deletions = deletions;

            'hunks: for hunk_idx in 0..patch.num_hunks() {
                if remaining == 0 {
                    file.truncated = true;
                    break;
                }
                ensure_active(cancel)?;

                let (hunk, _) = patch.hunk(hunk_idx)?;
                let mut lines: Vec<DiffLine> = Vec::new();
                let line_count = patch.num_lines_in_hunk(hunk_idx)?;

                for line_idx in 0..line_count {
                    if remaining == 0 {
                        file.truncated = true;
                        push_hunk(&mut file, &hunk, lines);
                        break 'hunks;
                    }

                    let line = patch.line_in_hunk(hunk_idx, line_idx)?;
                    let line_type = match line.origin() {
                        '+' => LineType::Addition,
                        '-' => LineType::Deletion,
                        ' ' => LineType::Context,
                        _ => LineType::Header,
                    };

                    lines.push(DiffLine {
                        line_type,
                        old_lineno: line.old_lineno(),
                        new_lineno: line.new_lineno(),
                        content: String::from_utf8_lossy(line.content()).to_string(),
                    });
                    remaining -= 1;
                }

                push_hunk(&mut file, &hunk, lines);
            }
        }

        stats.files_changed += 1;
        stats.insertions += file.additions;
        stats.deletions += file.deletions;
        truncated |= file.truncated;
        files.push(file);
    }

    Ok(DiffResult {
        files,
        stats,
        max_lines,
        truncated,
    })
}

fn push_hunk(file: &mut DiffFile, hunk: &git2::DiffHunk, lines: Vec<DiffLine>) {
    if lines.is_empty() {
        return;
    }
    file.hunks.push(DiffHunk {
        old_start: hunk.old_start(),
        old_lines: hunk.old_lines(),
        new_start: hunk.new_start(),
        new_lines: hunk.new_lines(),
        header: String::from_utf8_lossy(hunk.header()).trim_end().to_string(),
        lines,
    });
}

/// Reads at most `max_bytes` of the blob at `path` in `commit_id`.
///
/// Streams from the object database when the backend supports it so large
/// blobs are never fully inflated; packed objects fall back to the blob.
pub fn blob_prefix(repo: &Repository, commit_id: &str, path: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let commit = resolve_commit(repo, commit_id)?;
    let tree = commit.tree()?;
    let entry = tree
        .get_path(Path::new(path))
        .map_err(|_| AppError::NotFound(format!("path {} at {}", path, commit_id)))?;
    if entry.kind() != Some(ObjectType::Blob) {
        return Err(AppError::NotFound(format!("{} is not a file", path)));
    }

    let odb = repo.odb()?;
    if let Ok((reader, _, _)) = odb.reader(entry.id()) {
        let mut buf = Vec::with_capacity(max_bytes);
        reader
            .take(max_bytes as u64)
            .read_to_end(&mut buf)
            .map_err(AppError::upstream)?;
        return Ok(buf);
    }

    let blob = repo.find_blob(entry.id())?;
    let content = blob.content();
    Ok(content[..content.len().min(max_bytes)].to_vec())
}
