mod api;
mod db;
mod error;
mod review;
mod stats;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use review::ReviewService;
use store::{DbDirectoryStore, DbPullRequestStore};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:review-hub.db?mode=rwc".to_string());
    let db = db::init_database(&db_url)
        .await
        .expect("Failed to initialize database");

    // Wire the stores and the review service
    let directory = Arc::new(DbDirectoryStore::new(db.clone()));
    let prs = Arc::new(DbPullRequestStore::new(db.clone()));
    let service = ReviewService::new(directory, prs);

    let state = Arc::new(AppState { service, db });

    let app = api::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .expect("invalid BIND_ADDR");
    tracing::info!("review-hub starting on http://{}", addr);
    tracing::info!("");
    tracing::info!("API Endpoints:");
    tracing::info!("  POST /team/add             - Create team with members");
    tracing::info!("  POST /users/addNew         - Register user into a team");
    tracing::info!("  POST /pullRequest/create   - Open PR and auto-assign reviewers");
    tracing::info!("  POST /pullRequest/merge    - Merge PR (idempotent)");
    tracing::info!("  POST /pullRequest/reassign - Rotate one reviewer");
    tracing::info!("  GET  /users/getReview      - PRs assigned to a user");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
