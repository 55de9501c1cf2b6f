//! Orchestration layer: sequences directory and pull-request store calls
//! around the assignment engine and owns the caller-visible error
//! semantics. The engine itself never raises domain errors.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Result, ServiceError};
use crate::stats::{self, StatsResponse};
use crate::store::{
    DirectoryStore, NewPullRequest, NewUser, PrStatus, PullRequest, PullRequestStore,
    PullRequestSummary, StoreError, Team, TeamMember, User,
};

use super::engine;

#[derive(Clone)]
pub struct ReviewService {
    directory: Arc<dyn DirectoryStore>,
    prs: Arc<dyn PullRequestStore>,
}

impl ReviewService {
    pub fn new(directory: Arc<dyn DirectoryStore>, prs: Arc<dyn PullRequestStore>) -> Self {
        Self { directory, prs }
    }

    /// Create an OPEN pull request and atomically pick its initial
    /// reviewers from the author's active teammates.
    pub async fn create_pull_request(
        &self,
        pr_id: &str,
        title: &str,
        author_id: &str,
    ) -> Result<PullRequest> {
        if self.prs.exists(pr_id).await? {
            return Err(ServiceError::PrExists);
        }

        let author = self
            .directory
            .resolve(author_id)
            .await?
            .ok_or(ServiceError::AuthorNotFound)?;

        let new_pr = NewPullRequest {
            id: pr_id.to_string(),
            title: title.to_string(),
            author_id: author_id.to_string(),
        };
        match self.prs.insert(&new_pr).await {
            Ok(()) => {}
            // Lost a race with another create using the same id.
            Err(StoreError::Conflict) => return Err(ServiceError::PrExists),
            Err(e) => return Err(e.into()),
        }

        let pool = self
            .directory
            .active_members(author.team_id, author_id)
            .await?;
        let reviewers = engine::select_initial_reviewers(&pool);
        tracing::debug!(
            "assigning {} reviewer(s) to pull request {}",
            reviewers.len(),
            pr_id
        );

        if !reviewers.is_empty() {
            // The PR row already exists; a failure here leaves it OPEN with
            // zero reviewers and surfaces as an internal error.
            self.prs.insert_assignments(pr_id, &reviewers).await?;
        }

        self.get_pr(pr_id).await
    }

    /// Transition a pull request to MERGED. Merging an already-merged PR
    /// is a no-op success that returns it unchanged.
    pub async fn merge_pull_request(&self, pr_id: &str) -> Result<PullRequest> {
        let pr = self
            .prs
            .get(pr_id)
            .await?
            .ok_or(ServiceError::PrNotFound)?;

        if pr.status == PrStatus::Merged {
            return Ok(pr);
        }

        // Zero rows affected means a concurrent merge won the race; either
        // way the PR reads back as MERGED.
        self.prs.set_merged(pr_id).await?;

        self.get_pr(pr_id).await
    }

    /// Rotate one reviewer off an OPEN pull request, replacing them with a
    /// random eligible member of their own team.
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<(PullRequest, String)> {
        let pr = self
            .prs
            .get(pr_id)
            .await?
            .ok_or(ServiceError::PrNotFound)?;

        if pr.status == PrStatus::Merged {
            return Err(ServiceError::PrMerged);
        }

        if !pr.assigned_reviewers.iter().any(|r| r == old_reviewer_id) {
            return Err(ServiceError::NotAssigned);
        }

        let outgoing = self
            .directory
            .resolve(old_reviewer_id)
            .await?
            .ok_or(ServiceError::ReviewerNotFound)?;

        let mut exclude: HashSet<&str> =
            pr.assigned_reviewers.iter().map(String::as_str).collect();
        exclude.insert(pr.author_id.as_str());
        exclude.insert(old_reviewer_id);

        let pool = self
            .directory
            .active_members(outgoing.team_id, old_reviewer_id)
            .await?;
        let replacement =
            engine::select_replacement(&pool, &exclude).ok_or(ServiceError::NoCandidate)?;

        let rows = self
            .prs
            .replace_assignment(pr_id, old_reviewer_id, &replacement)
            .await?;
        if rows == 0 {
            // A concurrent reassignment removed the outgoing reviewer first.
            return Err(ServiceError::NotAssigned);
        }

        tracing::debug!(
            "replaced reviewer {} with {} on pull request {}",
            old_reviewer_id,
            replacement,
            pr_id
        );

        let updated = self.get_pr(pr_id).await?;
        Ok((updated, replacement))
    }

    /// Pull requests the user is currently assigned to review, most
    /// recently created first.
    pub async fn list_assigned_pull_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<PullRequestSummary>> {
        self.directory
            .resolve(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        Ok(self.prs.list_by_reviewer(user_id).await?)
    }

    pub async fn add_user(
        &self,
        user_id: &str,
        username: &str,
        is_active: bool,
        team_name: &str,
    ) -> Result<User> {
        let team_id = self
            .directory
            .team_id_by_name(team_name)
            .await?
            .ok_or(ServiceError::TeamNotFound)?;

        let new_user = NewUser {
            id: user_id.to_string(),
            username: username.to_string(),
            is_active,
            team_id,
        };
        match self.directory.insert_user(&new_user).await {
            Ok(user) => Ok(user),
            Err(StoreError::Conflict) => Err(ServiceError::UserExists),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.directory
            .resolve(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    pub async fn set_user_active(
        &self,
        user_id: &str,
        is_active: bool,
    ) -> Result<User> {
        let rows = self.directory.set_active(user_id, is_active).await?;
        if rows == 0 {
            return Err(ServiceError::UserNotFound);
        }
        self.get_user(user_id).await
    }

    pub async fn create_team(
        &self,
        team_name: &str,
        members: &[TeamMember],
    ) -> Result<Team> {
        match self.directory.create_team(team_name, members).await {
            Ok(()) => {}
            Err(StoreError::Conflict) => return Err(ServiceError::TeamExists),
            Err(e) => return Err(e.into()),
        }

        self.directory
            .team_by_name(team_name)
            .await?
            .ok_or_else(|| ServiceError::Internal(format!("team {team_name} missing after create")))
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team> {
        self.directory
            .team_by_name(team_name)
            .await?
            .ok_or(ServiceError::TeamNotFound)
    }

    pub async fn collect_stats(&self) -> Result<StatsResponse> {
        stats::collect(self.directory.as_ref(), self.prs.as_ref()).await
    }

    async fn get_pr(&self, pr_id: &str) -> Result<PullRequest> {
        self.prs
            .get(pr_id)
            .await?
            .ok_or_else(|| ServiceError::Internal(format!("pull request {pr_id} missing after write")))
    }
}
