//! Pull request handlers: create, merge, reassign.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::{require, AppState};

#[derive(Deserialize)]
pub struct CreatePrRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

#[derive(Deserialize)]
pub struct MergePrRequest {
    pub pull_request_id: String,
}

#[derive(Deserialize)]
pub struct ReassignRequest {
    pub pull_request_id: String,
    pub old_reviewer_id: String,
}

/// POST /pullRequest/create
pub async fn create_pull_request(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePrRequest>,
) -> Response {
    if let Err(e) = require(&req.pull_request_id, "pull_request_id")
        .and_then(|_| require(&req.pull_request_name, "pull_request_name"))
        .and_then(|_| require(&req.author_id, "author_id"))
    {
        return e.into_response();
    }

    match state
        .service
        .create_pull_request(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await
    {
        Ok(pr) => (StatusCode::CREATED, Json(json!({ "pr": pr }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /pullRequest/merge
pub async fn merge_pull_request(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MergePrRequest>,
) -> Response {
    if let Err(e) = require(&req.pull_request_id, "pull_request_id") {
        return e.into_response();
    }

    match state
        .service
        .merge_pull_request(&req.pull_request_id)
        .await
    {
        Ok(pr) => Json(json!({ "pr": pr })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /pullRequest/reassign
pub async fn reassign_reviewer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReassignRequest>,
) -> Response {
    if let Err(e) = require(&req.pull_request_id, "pull_request_id")
        .and_then(|_| require(&req.old_reviewer_id, "old_reviewer_id"))
    {
        return e.into_response();
    }

    match state
        .service
        .reassign_reviewer(&req.pull_request_id, &req.old_reviewer_id)
        .await
    {
        Ok((pr, replaced_by)) => Json(json!({
            "pr": pr,
            "replaced_by": replaced_by,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
