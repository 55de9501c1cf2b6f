//! Database module for SQLite persistence using SeaORM

pub mod entities;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Initialize database connection and create tables
pub async fn init_database(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    tracing::info!("Connecting to database: {}", db_url);

    let db = Database::connect(db_url).await?;

    create_tables(&db).await?;

    Ok(db)
}

/// Create all tables if they don't exist
async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Teams table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#
        .to_string(),
    ))
    .await?;

    // Users table (id is caller-supplied and globally unique)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            team_id INTEGER NOT NULL,
            FOREIGN KEY (team_id) REFERENCES teams(id) ON DELETE CASCADE
        )
        "#
        .to_string(),
    ))
    .await?;

    // Create index for team membership lookups
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"CREATE INDEX IF NOT EXISTS idx_users_team ON users(team_id)"#.to_string(),
    ))
    .await?;

    // Pull requests table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS pull_requests (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'OPEN',
            created_at INTEGER NOT NULL,
            merged_at INTEGER,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#
        .to_string(),
    ))
    .await?;

    // Create index for recency-ordered listings
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"CREATE INDEX IF NOT EXISTS idx_prs_created ON pull_requests(created_at)"#.to_string(),
    ))
    .await?;

    // Reviewer assignments table (one row per PR/reviewer pair)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS pull_request_reviewers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pull_request_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            FOREIGN KEY (pull_request_id) REFERENCES pull_requests(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            UNIQUE(pull_request_id, user_id)
        )
        "#
        .to_string(),
    ))
    .await?;

    // Create indexes for reviewer lookups in both directions
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"CREATE INDEX IF NOT EXISTS idx_reviewers_pr ON pull_request_reviewers(pull_request_id)"#
            .to_string(),
    ))
    .await?;
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"CREATE INDEX IF NOT EXISTS idx_reviewers_user ON pull_request_reviewers(user_id)"#
            .to_string(),
    ))
    .await?;

    tracing::info!("Database tables initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_database_creates_schema() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("review-hub.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let db = init_database(&db_url).await.unwrap();

        // Second init is a no-op thanks to IF NOT EXISTS
        create_tables(&db).await.unwrap();

        let row = db
            .query_one(Statement::from_string(
                db.get_database_backend(),
                "SELECT COUNT(*) AS n FROM pull_request_reviewers".to_string(),
            ))
            .await
            .unwrap()
            .unwrap();
        let n: i64 = row.try_get("", "n").unwrap();
        assert_eq!(n, 0);
    }
}
