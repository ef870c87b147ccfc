//! Diff-related DTOs.
//!
//! - `DiffResult`: Files of one diff plus the line budget that was applied
//! - `DiffFile`: Single file's changes with hunks, counts and content flags
//! - `DiffHunk`: Contiguous block of changes with context
//! - `DiffLine`: Single line (addition, deletion, or context)
//! - `CommitDiffView` / `RangeDiffView`: What the diff pages render

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Commit, RenderedComment};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChanged,
    Unmodified,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Context,
    Addition,
    Deletion,
    Header,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: LineType,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub header: String,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffFile {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub status: DiffStatus,
    /// Full counts from the patch, even when hunks were cut by the budget.
    pub additions: usize,
    pub deletions: usize,
    pub hunks: Vec<DiffHunk>,
    pub is_binary: bool,
    #[serde(default)]
    pub is_image: bool,
    /// Hunks were cut short or omitted because the budget ran out.
    #[serde(default)]
    pub truncated: bool,
}

impl DiffFile {
    /// New path for additions and modifications, old path for deletions.
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("")
    }

    pub fn rendered_lines(&self) -> usize {
        self.hunks.iter().map(|h| h.lines.len()).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub files: Vec<DiffFile>,
    pub stats: DiffStats,
    /// Budget the diff was built with.
    pub max_lines: usize,
    pub truncated: bool,
}

impl DiffResult {
    pub fn empty(max_lines: usize) -> Self {
        Self {
            files: Vec::new(),
            stats: DiffStats::default(),
            max_lines,
            truncated: false,
        }
    }

    /// No files changed. Not an error.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn rendered_lines(&self) -> usize {
        self.files.iter().map(DiffFile::rendered_lines).sum()
    }

    /// Clips hunk lines so at most `max_lines` are rendered across all files.
    /// Files past the budget keep their header and are flagged truncated.
    pub fn enforce_budget(&mut self, max_lines: usize) {
        let mut remaining = max_lines;

        for file in &mut self.files {
            let mut kept = Vec::with_capacity(file.hunks.len());
            for mut hunk in file.hunks.drain(..) {
                if remaining == 0 {
                    file.truncated = true;
                    break;
                }
                if hunk.lines.len() > remaining {
                    hunk.lines.truncate(remaining);
                    file.truncated = true;
                }
                remaining -= hunk.lines.len();
                kept.push(hunk);
            }
            file.hunks = kept;
            if file.truncated {
                self.truncated = true;
            }
        }

        self.max_lines = max_lines;
    }
}

/// Outcome of a secondary lookup that must not fail the whole view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubResult<T> {
    Ok { value: T },
    Failed { error: String },
}

impl<T> SubResult<T> {
    pub fn ok(&self) -> Option<&T> {
        match self {
            SubResult::Ok { value } => Some(value),
            SubResult::Failed { .. } => None,
        }
    }
}

/// Single-commit diff page.
#[derive(Debug, Clone, Serialize)]
pub struct CommitDiffView {
    /// Page title, the commit summary.
    pub title: String,
    pub commit: Commit,
    pub parents: Vec<String>,
    /// First parent, the "before" side. None for a root commit.
    pub before_id: Option<String>,
    pub diff: DiffResult,
    pub diff_not_available: bool,
    /// Comments keyed by anchor, e.g. `"1L12"`.
    pub comments: BTreeMap<String, Vec<RenderedComment>>,
}

/// Compare page between two commits.
#[derive(Debug, Clone, Serialize)]
pub struct RangeDiffView {
    pub before_id: String,
    pub after_id: String,
    pub commit: Commit,
    pub diff: DiffResult,
    pub diff_not_available: bool,
    pub commits: SubResult<Vec<Commit>>,
}
