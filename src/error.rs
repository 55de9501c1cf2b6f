use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("user not found")]
    UserNotFound,

    #[error("author not found")]
    AuthorNotFound,

    #[error("reviewer not found")]
    ReviewerNotFound,

    #[error("team not found")]
    TeamNotFound,

    #[error("pull request not found")]
    PrNotFound,

    #[error("PR id already exists")]
    PrExists,

    #[error("user already exists")]
    UserExists,

    #[error("team_name already exists")]
    TeamExists,

    #[error("cannot reassign on merged PR")]
    PrMerged,

    #[error("reviewer is not assigned to this PR")]
    NotAssigned,

    #[error("no active replacement candidate in team")]
    NoCandidate,

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Machine-readable code included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound
            | ServiceError::AuthorNotFound
            | ServiceError::ReviewerNotFound
            | ServiceError::PrNotFound => "NOT_FOUND",
            ServiceError::TeamNotFound => "TEAM_NOT_FOUND",
            ServiceError::PrExists => "PR_EXISTS",
            ServiceError::UserExists => "USER_EXISTS",
            ServiceError::TeamExists => "TEAM_EXISTS",
            ServiceError::PrMerged => "PR_MERGED",
            ServiceError::NotAssigned => "NOT_ASSIGNED",
            ServiceError::NoCandidate => "NO_CANDIDATE",
            ServiceError::Validation(_) => "INVALID_INPUT",
            ServiceError::Db(_) | ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Db(e) => ServiceError::Db(e),
            // Conflicts are mapped in context by the service; one reaching
            // this path means a write raced something we did not expect.
            StoreError::Conflict => ServiceError::Internal("unexpected conflict".to_string()),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::UserNotFound
            | ServiceError::AuthorNotFound
            | ServiceError::ReviewerNotFound
            | ServiceError::TeamNotFound
            | ServiceError::PrNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ServiceError::PrExists
            | ServiceError::UserExists
            | ServiceError::PrMerged
            | ServiceError::NotAssigned
            | ServiceError::NoCandidate => (StatusCode::CONFLICT, self.to_string()),
            // Duplicate team names are reported as a bad request, not a conflict.
            ServiceError::TeamExists => (StatusCode::BAD_REQUEST, self.to_string()),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServiceError::Db(e) => {
                tracing::error!("database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ServiceError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
