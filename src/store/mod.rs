//! Storage capability traits consumed by the review service.
//!
//! The directory store owns users and teams, the pull request store owns
//! pull requests and the reviewer-assignment relation. Both are narrow
//! interfaces so the assignment logic can be exercised against the
//! in-memory implementations without a database.

pub mod directory;
#[cfg(test)]
pub mod memory;
pub mod pull_requests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use directory::DbDirectoryStore;
pub use pull_requests::DbPullRequestStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write (duplicate id or name).
    #[error("duplicate key")]
    Conflict,

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

/// A directory user. `team_name` is resolved on read and only serialized
/// when present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: String,
    pub username: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(skip)]
    pub team_id: i32,
    #[serde(rename = "teamName", skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<User>,
}

/// Member payload for team creation. Existing users are re-homed onto the
/// new team, matching the upsert the original service performs.
#[derive(Clone, Debug, Deserialize)]
pub struct TeamMember {
    #[serde(rename = "user_id")]
    pub id: String,
    pub username: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(PrStatus::Open),
            "MERGED" => Some(PrStatus::Merged),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    #[serde(rename = "pull_request_id")]
    pub id: String,
    #[serde(rename = "pull_request_name")]
    pub title: String,
    pub author_id: String,
    pub status: PrStatus,
    /// Reviewer ids in assignment-insertion order.
    pub assigned_reviewers: Vec<String>,
    /// Unix seconds.
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullRequestSummary {
    #[serde(rename = "pull_request_id")]
    pub id: String,
    #[serde(rename = "pull_request_name")]
    pub title: String,
    pub author_id: String,
    pub status: PrStatus,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub is_active: bool,
    pub team_id: i32,
}

#[derive(Clone, Debug)]
pub struct NewPullRequest {
    pub id: String,
    pub title: String,
    pub author_id: String,
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Look up a user by id, with its team name resolved.
    async fn resolve(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Active members of a team, excluding one user id (typically the PR
    /// author or the outgoing reviewer), ordered by id.
    async fn active_members(
        &self,
        team_id: i32,
        exclude_user_id: &str,
    ) -> Result<Vec<User>, StoreError>;

    /// Insert a user; `Conflict` on a duplicate id.
    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError>;

    /// Flip the active flag. Returns affected row count; zero means the
    /// user does not exist.
    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<u64, StoreError>;

    async fn team_id_by_name(&self, name: &str) -> Result<Option<i32>, StoreError>;

    /// Create a team and upsert its members as one transaction; `Conflict`
    /// on a duplicate name. Partial failure leaves no team behind.
    async fn create_team(&self, name: &str, members: &[TeamMember]) -> Result<(), StoreError>;

    /// Team with members ordered by username.
    async fn team_by_name(&self, name: &str) -> Result<Option<Team>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError>;
}

#[async_trait]
pub trait PullRequestStore: Send + Sync {
    async fn exists(&self, pr_id: &str) -> Result<bool, StoreError>;

    /// Insert a pull request as OPEN; `Conflict` on a duplicate id.
    async fn insert(&self, pr: &NewPullRequest) -> Result<(), StoreError>;

    /// Pull request with its reviewer list, in assignment-insertion order.
    async fn get(&self, pr_id: &str) -> Result<Option<PullRequest>, StoreError>;

    /// Transition to MERGED and stamp the merge time, conditioned on the
    /// PR not already being merged. Returns affected row count; zero means
    /// the PR is unknown or a concurrent merge already won.
    async fn set_merged(&self, pr_id: &str) -> Result<u64, StoreError>;

    async fn insert_assignments(
        &self,
        pr_id: &str,
        reviewer_ids: &[String],
    ) -> Result<(), StoreError>;

    /// Swap one reviewer row for another, conditioned on the old row still
    /// existing. Returns affected row count; zero means a concurrent
    /// reassignment removed it first.
    async fn replace_assignment(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<u64, StoreError>;

    /// Pull requests the user is currently assigned to review, most
    /// recently created first.
    async fn list_by_reviewer(&self, user_id: &str)
        -> Result<Vec<PullRequestSummary>, StoreError>;

    async fn list_all(&self) -> Result<Vec<PullRequest>, StoreError>;
}
