pub mod handlers;
pub mod pr_handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

pub use handlers::AppState;

use crate::error::{Result, ServiceError};

/// Routes follow the original service layout: team and user management,
/// pull-request operations, stats, and a DB-backed health check.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/team/add", post(handlers::create_team))
        .route("/team/get/:team_name", get(handlers::get_team))
        .route("/users/addNew", post(handlers::add_user))
        .route("/users/getById/:id", get(handlers::get_user))
        .route("/users/setIsActive", post(handlers::set_user_active))
        .route("/users/getReview", get(handlers::get_user_reviews))
        .route("/pullRequest/create", post(pr_handlers::create_pull_request))
        .route("/pullRequest/merge", post(pr_handlers::merge_pull_request))
        .route("/pullRequest/reassign", post(pr_handlers::reassign_reviewer))
        .route("/stats/getAllStats", get(handlers::get_all_stats))
        .route("/health", get(handlers::health))
}

/// Reject blank required fields before they reach the service.
pub(crate) fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(())
}
