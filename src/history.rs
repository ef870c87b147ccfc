//! History navigation: paginated commit listings for a branch or commit,
//! a file path, a keyword search, or a before/after range.
//!
//! Pagination is derived entirely from the requested page number, so
//! concurrent callers paging the same history never share state.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::git::RepositoryReader;
use crate::models::{Commit, HistoryPage};
use crate::store::AccountResolver;

/// Which history to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalMode {
    /// History reachable from a branch name or raw commit id.
    ByBranchOrCommit { reference: String },
    /// Commits under `reference` that touched `path`.
    ByFilePath { reference: String, path: String },
    /// Message search starting at `reference` (the current branch).
    ByKeyword { reference: String, query: String },
    /// Commits after `before` up to and including `after`.
    ByRange { before: String, after: String },
}

#[derive(Debug, Clone)]
pub enum HistoryOutcome {
    Page(HistoryPage),
    /// The request should be re-issued in this mode instead, e.g. an empty
    /// keyword search falls back to the branch listing.
    Fallback(RetrievalMode),
}

impl HistoryOutcome {
    pub fn into_page(self) -> Option<HistoryPage> {
        match self {
            HistoryOutcome::Page(page) => Some(page),
            HistoryOutcome::Fallback(_) => None,
        }
    }
}

/// Any page below 1 is page 1. There is no upper clamp.
pub fn normalize_page(page: i64) -> usize {
    if page < 1 { 1 } else { page as usize }
}

pub fn previous_page(page: usize) -> usize {
    page.saturating_sub(1)
}

/// Branch listing: no next page once `page * page_size` exceeds the total.
pub fn next_page_for_branch(page: usize, page_size: usize, total: usize) -> usize {
    if page.saturating_mul(page_size) > total {
        0
    } else {
        page + 1
    }
}

/// Path listing checks the following page instead: no next page once
/// `(page + 1) * page_size` exceeds the total.
pub fn next_page_for_path(page: usize, page_size: usize, total: usize) -> usize {
    if page.saturating_add(1).saturating_mul(page_size) > total {
        0
    } else {
        page + 1
    }
}

pub struct HistoryNavigator {
    reader: Arc<dyn RepositoryReader>,
    accounts: Arc<dyn AccountResolver>,
    config: Config,
}

impl HistoryNavigator {
    pub fn new(
        reader: Arc<dyn RepositoryReader>,
        accounts: Arc<dyn AccountResolver>,
        config: Config,
    ) -> Self {
        Self { reader, accounts, config }
    }

    pub async fn get_history_page(&self, mode: &RetrievalMode, page: i64) -> Result<HistoryOutcome> {
        if let RetrievalMode::ByKeyword { reference, query } = mode {
            if query.trim().is_empty() {
                tracing::debug!("empty keyword, falling back to {}", reference);
                return Ok(HistoryOutcome::Fallback(RetrievalMode::ByBranchOrCommit {
                    reference: reference.clone(),
                }));
            }
        }

        self.ensure_branches().await?;

        let page = normalize_page(page);
        let size = self.config.page_size;
        let offset = (page - 1).saturating_mul(size);
        tracing::debug!("history {:?} page {} (offset {})", mode, page, offset);

        let mut history = match mode {
            RetrievalMode::ByBranchOrCommit { reference } => {
                let total = self.reader.count_commits(reference).await?;
                let commits = self.reader.commits_in_range(reference, offset, size).await?;
                HistoryPage {
                    commits,
                    total,
                    page,
                    previous_page: previous_page(page),
                    next_page: next_page_for_branch(page, size, total),
                }
            }
            RetrievalMode::ByFilePath { reference, path } => {
                let total = self.reader.count_commits_for_path(reference, path).await?;
                if total == 0 {
                    return Err(AppError::NotFound(format!("no history for path {}", path)));
                }
                let commits = self
                    .reader
                    .commits_for_path(reference, path, offset, size)
                    .await?;
                HistoryPage {
                    commits,
                    total,
                    page,
                    previous_page: previous_page(page),
                    next_page: next_page_for_path(page, size, total),
                }
            }
            RetrievalMode::ByKeyword { reference, query } => {
                let commits = self.reader.search_commits(reference, query.trim()).await?;
                flat_page(commits)
            }
            RetrievalMode::ByRange { before, after } => {
                let commits = self.reader.commits_between(before, after).await?;
                flat_page(commits)
            }
        };

        resolve_authors(self.accounts.as_ref(), &mut history.commits).await;
        Ok(HistoryOutcome::Page(history))
    }

    async fn ensure_branches(&self) -> Result<()> {
        let branches = self.reader.list_branches().await?;
        if branches.is_empty() {
            return Err(AppError::NotFound("repository has no branches".to_string()));
        }
        Ok(())
    }
}

/// Search and range results come back whole: one page, no neighbours.
fn flat_page(commits: Vec<Commit>) -> HistoryPage {
    HistoryPage {
        total: commits.len(),
        commits,
        page: 1,
        previous_page: 0,
        next_page: 0,
    }
}

/// Attaches the matching account to each commit by author email.
///
/// Best effort: a resolver failure leaves every commit undecorated.
pub async fn resolve_authors(accounts: &dyn AccountResolver, commits: &mut [Commit]) {
    let mut seen = HashSet::new();
    let emails: Vec<String> = commits
        .iter()
        .map(|c| c.author.email.clone())
        .filter(|email| !email.is_empty() && seen.insert(email.clone()))
        .collect();
    if emails.is_empty() {
        return;
    }

    match accounts.resolve_accounts_by_email(&emails).await {
        Ok(resolved) => {
            for commit in commits.iter_mut() {
                commit.account = resolved.get(&commit.author.email).cloned();
            }
        }
        Err(e) => tracing::warn!("author resolution failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use crate::store::MemoryAccounts;
    use crate::test_support::{commit, StubReader};

    fn navigator(reader: StubReader) -> HistoryNavigator {
        let accounts = MemoryAccounts::new();
        accounts
            .add(Account { id: 1, name: "alice".into(), email: "alice@example.com".into() })
            .unwrap();
        HistoryNavigator::new(Arc::new(reader), Arc::new(accounts), Config::default())
    }

    fn branch(reference: &str) -> RetrievalMode {
        RetrievalMode::ByBranchOrCommit { reference: reference.to_string() }
    }

    async fn page_of(nav: &HistoryNavigator, mode: &RetrievalMode, page: i64) -> HistoryPage {
        nav.get_history_page(mode, page).await.unwrap().into_page().unwrap()
    }

    #[test]
    fn page_normalization() {
        assert_eq!(normalize_page(-7), 1);
        assert_eq!(normalize_page(0), 1);
        assert_eq!(normalize_page(3), 3);
        assert_eq!(previous_page(1), 0);
        assert_eq!(previous_page(5), 4);
    }

    #[test]
    fn branch_boundary_arithmetic() {
        // exactly 50 * k commits
        assert_eq!(next_page_for_branch(1, 50, 100), 2);
        assert_eq!(next_page_for_branch(2, 50, 100), 3);
        assert_eq!(next_page_for_branch(3, 50, 100), 0);
        // 50 * k + 1 commits
        assert_eq!(next_page_for_branch(2, 50, 101), 3);
        assert_eq!(next_page_for_branch(3, 50, 101), 0);
    }

    #[test]
    fn path_boundary_arithmetic() {
        // exactly 50 * k commits
        assert_eq!(next_page_for_path(1, 50, 100), 2);
        assert_eq!(next_page_for_path(2, 50, 100), 0);
        // 50 * k + 1 commits: the one-commit tail page is not offered
        assert_eq!(next_page_for_path(1, 50, 101), 2);
        assert_eq!(next_page_for_path(2, 50, 101), 0);
        assert_eq!(next_page_for_path(1, 50, 150), 2);
    }

    #[test]
    fn boundary_arithmetic_survives_huge_pages() {
        assert_eq!(next_page_for_branch(usize::MAX - 1, 50, 10), 0);
        assert_eq!(next_page_for_path(usize::MAX - 1, 50, 10), 0);
    }

    #[tokio::test]
    async fn non_positive_pages_behave_like_page_one() {
        let nav = navigator(StubReader::linear(120));
        let first = page_of(&nav, &branch("main"), 1).await;
        for p in [0, -1, -100] {
            let page = page_of(&nav, &branch("main"), p).await;
            assert_eq!(page.page, 1);
            assert_eq!(page.previous_page, first.previous_page);
            assert_eq!(page.next_page, first.next_page);
            assert_eq!(
                page.commits.iter().map(|c| &c.oid).collect::<Vec<_>>(),
                first.commits.iter().map(|c| &c.oid).collect::<Vec<_>>()
            );
        }
    }

    #[tokio::test]
    async fn fifty_commit_branch() {
        let nav = navigator(StubReader::linear(50));

        let first = page_of(&nav, &branch("main"), 1).await;
        assert_eq!(first.commits.len(), 50);
        assert_eq!(first.total, 50);
        assert_eq!(first.previous_page, 0);
        // Departs from the usual "exactly one full page has no next page"
        // expectation: 1 * 50 does not exceed 50, so the branch rule still
        // offers an (empty) second page. Path listings do not.
        assert_eq!(first.next_page, 2);

        let second = page_of(&nav, &branch("main"), 2).await;
        assert!(second.commits.is_empty());
        assert_eq!(second.next_page, 0);
        assert_eq!(second.previous_page, 1);
    }

    #[tokio::test]
    async fn pages_beyond_the_end_are_empty() {
        let nav = navigator(StubReader::linear(30));
        let page = page_of(&nav, &branch("main"), 9).await;
        assert!(page.commits.is_empty());
        assert_eq!(page.next_page, 0);
        assert_eq!(page.previous_page, 8);
    }

    #[tokio::test]
    async fn second_page_starts_at_offset() {
        let nav = navigator(StubReader::linear(120));
        let page = page_of(&nav, &branch("main"), 2).await;
        assert_eq!(page.commits.len(), 50);
        assert_eq!(page.commits[0].oid, commit(69).oid);
        assert_eq!(page.next_page, 3);
    }

    #[tokio::test]
    async fn no_branches_is_not_found() {
        let mut reader = StubReader::linear(3);
        reader.branches.clear();
        let nav = navigator(reader);
        let err = nav.get_history_page(&branch("main"), 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn untouched_path_is_not_found() {
        let nav = navigator(StubReader::linear(3));
        let mode = RetrievalMode::ByFilePath {
            reference: "main".into(),
            path: "missing.txt".into(),
        };
        let err = nav.get_history_page(&mode, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("missing.txt")));
    }

    #[tokio::test]
    async fn path_history_uses_following_page_check() {
        let mut reader = StubReader::linear(200);
        let touched: Vec<_> = reader.commits.iter().take(100).cloned().collect();
        reader.path_commits.insert("src/lib.rs".into(), touched);
        let nav = navigator(reader);
        let mode = RetrievalMode::ByFilePath {
            reference: "main".into(),
            path: "src/lib.rs".into(),
        };

        let first = page_of(&nav, &mode, 1).await;
        assert_eq!(first.total, 100);
        assert_eq!(first.next_page, 2);

        let second = page_of(&nav, &mode, 2).await;
        assert_eq!(second.commits.len(), 50);
        assert_eq!(second.next_page, 0);
    }

    #[tokio::test]
    async fn empty_keyword_falls_back_to_branch() {
        let nav = navigator(StubReader::linear(3));
        let mode = RetrievalMode::ByKeyword {
            reference: "develop".into(),
            query: "  ".into(),
        };
        match nav.get_history_page(&mode, 1).await.unwrap() {
            HistoryOutcome::Fallback(fallback) => assert_eq!(fallback, branch("develop")),
            HistoryOutcome::Page(_) => panic!("expected fallback"),
        }
    }

    #[tokio::test]
    async fn keyword_results_are_flat() {
        let nav = navigator(StubReader::linear(75));
        let mode = RetrievalMode::ByKeyword {
            reference: "main".into(),
            query: "commit 1".into(),
        };
        let page = page_of(&nav, &mode, 4).await;
        // "commit 1", "commit 10".."commit 19"
        assert_eq!(page.total, 11);
        assert_eq!(page.commits.len(), 11);
        assert_eq!(page.page, 1);
        assert_eq!(page.next_page, 0);
        assert_eq!(page.previous_page, 0);
    }

    #[tokio::test]
    async fn range_lists_commits_between() {
        let nav = navigator(StubReader::linear(10));
        let mode = RetrievalMode::ByRange {
            before: commit(2).oid,
            after: commit(6).oid,
        };
        let page = page_of(&nav, &mode, 1).await;
        assert_eq!(page.total, 4);
        assert_eq!(page.commits[0].oid, commit(6).oid);
        assert_eq!(page.commits[3].oid, commit(3).oid);
    }

    #[tokio::test]
    async fn authors_are_resolved_by_email() {
        let nav = navigator(StubReader::linear(4));
        let page = page_of(&nav, &branch("main"), 1).await;
        // even-numbered commits are authored by alice
        for c in &page.commits {
            if c.author.email == "alice@example.com" {
                assert_eq!(c.account.as_ref().map(|a| a.id), Some(1));
            } else {
                assert!(c.account.is_none());
            }
        }
        assert!(page.commits.iter().any(|c| c.account.is_some()));
    }
}
