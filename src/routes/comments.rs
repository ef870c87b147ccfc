//! Commit comment endpoints.
//!
//! - POST /api/v1/repository/commit/{id}/comments { line: "1L12", content }
//!   Creates a line comment and notifies watchers and mentioned users.
//!   A 502 means the comment was saved but notification failed.
//!
//! - DELETE /api/v1/repository/comments/{id}
//!   Deletes the caller's own comment. Missing and foreign comments both
//!   answer 403.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::comments::CommentCreated;
use crate::error::Result;
use crate::routes::SharedState;

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/repository/commit/{id}/comments", post(create_comment))
        .route("/api/v1/repository/comments/{id}", delete(delete_comment))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateCommentRequest {
    #[serde(default)]
    line: String,
    #[serde(default)]
    content: String,
}

async fn create_comment(
    State(state): State<SharedState>,
    Path(commit_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Json<CommentCreated>> {
    let (author, _) = state.requester(&headers).await?;
    let commit = state.reader.get_commit(&commit_id).await?;

    let created = state
        .comments
        .create_commit_comment(&author, &state.repo, &commit.oid, &request.line, &request.content)
        .await?;
    Ok(Json(created))
}

async fn delete_comment(
    State(state): State<SharedState>,
    Path(comment_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let (_, requester) = state.requester(&headers).await?;
    state.comments.delete_commit_comment(comment_id, &requester).await?;
    Ok(Json(json!({ "ok": true })))
}
