//! Commit history endpoint.
//!
//! GET /api/v1/repository/commits?ref=&path=&q=&p=
//!
//! - `q` present: keyword search from `ref` (empty `q` redirects to the
//!   branch listing)
//! - `path` present: history of that path under `ref`
//! - otherwise: history of `ref` (branch name or commit id)
//!
//! `ref` defaults to the repository's current branch, `p` to 1.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::history::{HistoryOutcome, RetrievalMode};
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/repository/commits", get(get_commits))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CommitsQuery {
    #[serde(rename = "ref")]
    reference: Option<String>,
    path: Option<String>,
    q: Option<String>,
    #[serde(default)]
    p: Option<String>,
}

/// Unparseable page numbers count as page 1.
fn parse_page(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse().ok()).unwrap_or(1)
}

async fn get_commits(
    State(state): State<SharedState>,
    Query(query): Query<CommitsQuery>,
) -> Result<Response> {
    let reference = query
        .reference
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| state.default_branch.clone());

    let mode = match (query.q, query.path.filter(|p| !p.is_empty())) {
        (Some(q), _) => RetrievalMode::ByKeyword { reference, query: q },
        (None, Some(path)) => RetrievalMode::ByFilePath { reference, path },
        (None, None) => RetrievalMode::ByBranchOrCommit { reference },
    };

    let page = parse_page(query.p.as_deref());
    match state.navigator.get_history_page(&mode, page).await? {
        HistoryOutcome::Page(page) => Ok(Json(page).into_response()),
        HistoryOutcome::Fallback(mode) => {
            Ok(Redirect::temporary(&fallback_location(&mode)).into_response())
        }
    }
}

fn fallback_location(mode: &RetrievalMode) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let base = match mode {
        RetrievalMode::ByBranchOrCommit { reference } => {
            query.append_pair("ref", reference);
            "/api/v1/repository/commits"
        }
        RetrievalMode::ByFilePath { reference, path } => {
            query.append_pair("ref", reference).append_pair("path", path);
            "/api/v1/repository/commits"
        }
        RetrievalMode::ByKeyword { reference, query: q } => {
            query.append_pair("ref", reference).append_pair("q", q);
            "/api/v1/repository/commits"
        }
        RetrievalMode::ByRange { before, after } => {
            query.append_pair("before", before).append_pair("after", after);
            "/api/v1/repository/compare"
        }
    };
    format!("{}?{}", base, query.finish())
}
