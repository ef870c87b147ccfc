//! API route handlers - maps HTTP endpoints to the core components.
//!
//! Each submodule defines routes for a feature area:
//! - `commits`: Paginated history by ref, path, keyword, or range
//! - `diff`: Single-commit diff and before/after compare
//! - `comments`: Line comments on commits (create, delete)
//!
//! Authentication is handled upstream; the acting account arrives in the
//! `x-account-id` header and the privilege flag in `x-account-admin`.

pub mod comments;
pub mod commits;
pub mod diff;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Router;

use crate::comments::CommentService;
use crate::config::Config;
use crate::diff::DiffEngine;
use crate::error::{AppError, Result};
use crate::git::RepositoryReader;
use crate::history::HistoryNavigator;
use crate::models::{Account, RepoRef, Requester};
use crate::store::{AccountResolver, CommentStore, NotificationSink};

pub struct AppState {
    pub navigator: HistoryNavigator,
    pub diffs: DiffEngine,
    pub comments: CommentService,
    pub reader: Arc<dyn RepositoryReader>,
    pub accounts: Arc<dyn AccountResolver>,
    pub repo: RepoRef,
    /// Ref used when a request names none.
    pub default_branch: String,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        reader: Arc<dyn RepositoryReader>,
        accounts: Arc<dyn AccountResolver>,
        store: Arc<dyn CommentStore>,
        notifier: Arc<dyn NotificationSink>,
        config: Config,
        repo: RepoRef,
        default_branch: String,
    ) -> Self {
        Self {
            navigator: HistoryNavigator::new(reader.clone(), accounts.clone(), config.clone()),
            diffs: DiffEngine::new(reader.clone(), accounts.clone(), store.clone(), config.clone()),
            comments: CommentService::new(store, accounts.clone(), notifier, config),
            reader,
            accounts,
            repo,
            default_branch,
        }
    }

    /// The account acting on the request.
    pub(crate) async fn requester(&self, headers: &HeaderMap) -> Result<(Account, Requester)> {
        let account_id: i64 = headers
            .get("x-account-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .ok_or(AppError::Unauthorized)?;
        let account = self
            .accounts
            .get_account(account_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        let is_admin = headers
            .get("x-account-admin")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok((account, Requester { account_id, is_admin }))
    }
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .merge(commits::routes(state.clone()))
        .merge(diff::routes(state.clone()))
        .merge(comments::routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::store::{LogNotifier, MemoryAccounts, MemoryCommentStore};
    use crate::test_support::{commit, StubReader};

    fn app() -> Router {
        app_with(StubReader::linear(60))
    }

    fn app_with(reader: StubReader) -> Router {
        let accounts = MemoryAccounts::new();
        accounts
            .add(Account { id: 1, name: "alice".into(), email: "alice@example.com".into() })
            .unwrap();
        accounts
            .add(Account { id: 2, name: "bob".into(), email: "bob@example.com".into() })
            .unwrap();

        let state = AppState::new(
            Arc::new(reader),
            Arc::new(accounts),
            Arc::new(MemoryCommentStore::new()),
            Arc::new(LogNotifier::new()),
            Config::default(),
            RepoRef { id: 1, owner: "acme".into(), name: "widgets".into() },
            "main".to_string(),
        );
        create_router(Arc::new(state))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn history_page_is_served() {
        let response = app()
            .oneshot(Request::get("/api/v1/repository/commits?p=2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["page"], 2);
        assert_eq!(body["total"], 60);
        assert_eq!(body["commits"].as_array().unwrap().len(), 10);
        assert_eq!(body["next_page"], 0);
    }

    #[tokio::test]
    async fn empty_search_redirects_to_branch_history() {
        let response = app()
            .oneshot(Request::get("/api/v1/repository/commits?q=").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()["location"],
            "/api/v1/repository/commits?ref=main"
        );
    }

    #[tokio::test]
    async fn empty_search_redirect_keeps_odd_branch_names() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/repository/commits?ref=feat%26q%3Dx%23top&q=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()["location"],
            "/api/v1/repository/commits?ref=feat%26q%3Dx%23top"
        );

        let response = app()
            .oneshot(
                Request::get("/api/v1/repository/commits?ref=a%0Ab&q=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()["location"], "/api/v1/repository/commits?ref=a%0Ab");
    }

    #[tokio::test]
    async fn unknown_commit_is_404() {
        let response = app()
            .oneshot(Request::get("/api/v1/repository/commit/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_diffs_answer_404() {
        let mut reader = StubReader::linear(60);
        reader.fail_diff = true;
        let app = app_with(reader);

        let single = app
            .clone()
            .oneshot(
                Request::get(format!("/api/v1/repository/commit/{}", commit(3).oid))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(single.status(), StatusCode::NOT_FOUND);

        let compare = app
            .oneshot(
                Request::get(format!(
                    "/api/v1/repository/compare?before={}&after={}",
                    commit(1).oid,
                    commit(3).oid
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(compare.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn comment_lifecycle_over_http() {
        let app = app();
        let oid = commit(5).oid;

        let bad = app
            .clone()
            .oneshot(
                Request::post(format!("/api/v1/repository/commit/{}/comments", oid))
                    .header("content-type", "application/json")
                    .header("x-account-id", "1")
                    .body(Body::from(r#"{"line": "L5", "content": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let created = app
            .clone()
            .oneshot(
                Request::post(format!("/api/v1/repository/commit/{}/comments", oid))
                    .header("content-type", "application/json")
                    .header("x-account-id", "1")
                    .body(Body::from(r#"{"line": "0L5", "content": "hi @bob"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::OK);
        let body = json_body(created).await;
        let id = body["comment"]["id"].as_i64().unwrap();
        assert_eq!(body["comment"]["anchor"], "0L5");

        let foreign = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/v1/repository/comments/{}", id))
                    .header("x-account-id", "2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

        let own = app
            .oneshot(
                Request::delete(format!("/api/v1/repository/comments/{}", id))
                    .header("x-account-id", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(own.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_comment_is_refused() {
        let response = app()
            .oneshot(
                Request::post(format!("/api/v1/repository/commit/{}/comments", commit(1).oid))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"line": "0L5", "content": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
