//! User, team, stats, and health handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use super::require;
use crate::error::ServiceError;
use crate::review::ReviewService;
use crate::store::TeamMember;

/// Application state shared across handlers
pub struct AppState {
    pub service: ReviewService,
    pub db: DatabaseConnection,
}

#[derive(Deserialize)]
pub struct AddUserRequest {
    pub user_id: String,
    pub username: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "teamName")]
    pub team_name: String,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct CreateTeamRequest {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

#[derive(Deserialize)]
pub struct ReviewQuery {
    pub user_id: Option<String>,
}

/// POST /users/addNew
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddUserRequest>,
) -> Response {
    if let Err(e) = require(&req.user_id, "user_id")
        .and_then(|_| require(&req.username, "username"))
        .and_then(|_| require(&req.team_name, "teamName"))
    {
        return e.into_response();
    }

    match state
        .service
        .add_user(&req.user_id, &req.username, req.is_active, &req.team_name)
        .await
    {
        Ok(user) => Json(user).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /users/getById/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Response {
    match state.service.get_user(&user_id).await {
        Ok(user) => Json(json!({ "user": user })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /users/setIsActive
pub async fn set_user_active(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetActiveRequest>,
) -> Response {
    if let Err(e) = require(&req.user_id, "user_id") {
        return e.into_response();
    }

    match state
        .service
        .set_user_active(&req.user_id, req.is_active)
        .await
    {
        Ok(user) => Json(json!({ "user": user })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /users/getReview?user_id=...
pub async fn get_user_reviews(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewQuery>,
) -> Response {
    let user_id = match query.user_id.as_deref() {
        Some(id) if !id.trim().is_empty() => id,
        _ => {
            return ServiceError::Validation("user_id parameter is required".to_string())
                .into_response()
        }
    };

    match state.service.list_assigned_pull_requests(user_id).await {
        Ok(prs) => Json(json!({
            "user_id": user_id,
            "pull_requests": prs,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /team/add
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTeamRequest>,
) -> Response {
    if let Err(e) = require(&req.team_name, "team_name") {
        return e.into_response();
    }

    match state.service.create_team(&req.team_name, &req.members).await {
        Ok(team) => Json(json!({ "team": team })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /team/get/:team_name
pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(team_name): Path<String>,
) -> Response {
    match state.service.get_team(&team_name).await {
        Ok(team) => Json(team).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /stats/getAllStats
pub async fn get_all_stats(State(state): State<Arc<AppState>>) -> Response {
    match state.service.collect_stats().await {
        Ok(stats) => Json(json!({ "stats": stats })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.db.ping().await {
        Ok(()) => Json(json!({ "status": "healthy" })).into_response(),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "unhealthy" })),
            )
                .into_response()
        }
    }
}
