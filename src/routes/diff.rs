//! Diff endpoints.
//!
//! - GET /api/v1/repository/commit/{id}
//!   Diff of one commit against its first parent, with line comments.
//!
//! - GET /api/v1/repository/compare?before=&after=
//!   Diff between two commits plus the commits in between.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::models::{CommitDiffView, RangeDiffView};
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/repository/commit/{id}", get(get_commit_diff))
        .route("/api/v1/repository/compare", get(get_range_diff))
        .with_state(state)
}

async fn get_commit_diff(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CommitDiffView>> {
    let view = state.diffs.get_commit_diff(&id).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct CompareQuery {
    before: String,
    after: String,
}

async fn get_range_diff(
    State(state): State<SharedState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<RangeDiffView>> {
    let view = state.diffs.get_range_diff(&query.before, &query.after).await?;
    Ok(Json(view))
}
