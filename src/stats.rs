//! Read-only statistics over the directory and pull-request stores.
//!
//! Everything here is computed from point-in-time reads; "reviewed" counts
//! reflect current assignments only, since reviewer history is not kept.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::Result;
use crate::store::{DirectoryStore, PrStatus, PullRequestStore};

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub pr_count: usize,
    pub merged_pr_count: usize,
}

#[derive(Debug, Serialize)]
pub struct TeamStats {
    pub team_name: String,
    pub member_count: usize,
    pub authored_pr_count: usize,
    pub reviewed_pr_count: usize,
    pub merged_pr_count: usize,
}

#[derive(Debug, Serialize)]
pub struct PrStats {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub status: PrStatus,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<i64>,
    pub author_name: String,
    pub author_team: String,
    pub reviewer_count: usize,
    pub reviewer_names: String,
}

#[derive(Debug, Serialize)]
pub struct StatsSummary {
    pub total_users: usize,
    pub total_teams: usize,
    pub total_prs: usize,
    pub open_prs: usize,
    pub merged_prs: usize,
    pub total_reviews: usize,
    pub avg_reviews_per_pr: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_stats: Vec<UserStats>,
    pub pr_stats: Vec<PrStats>,
    pub team_stats: Vec<TeamStats>,
    pub summary: StatsSummary,
}

pub async fn collect(
    directory: &dyn DirectoryStore,
    pr_store: &dyn PullRequestStore,
) -> Result<StatsResponse> {
    let users = directory.list_users().await?;
    let teams = directory.list_teams().await?;
    let prs = pr_store.list_all().await?;

    let username_by_id: HashMap<&str, &str> = users
        .iter()
        .map(|u| (u.id.as_str(), u.username.as_str()))
        .collect();

    let user_stats = users
        .iter()
        .map(|user| {
            let assigned: Vec<_> = prs
                .iter()
                .filter(|pr| pr.assigned_reviewers.contains(&user.id))
                .collect();
            UserStats {
                user_id: user.id.clone(),
                username: user.username.clone(),
                team_name: user.team_name.clone().unwrap_or_default(),
                pr_count: assigned.len(),
                merged_pr_count: assigned
                    .iter()
                    .filter(|pr| pr.status == PrStatus::Merged)
                    .count(),
            }
        })
        .collect();

    let pr_stats = prs
        .iter()
        .map(|pr| {
            let author = users.iter().find(|u| u.id == pr.author_id);
            let reviewer_names: Vec<&str> = pr
                .assigned_reviewers
                .iter()
                .map(|id| username_by_id.get(id.as_str()).copied().unwrap_or(id))
                .collect();
            PrStats {
                pull_request_id: pr.id.clone(),
                pull_request_name: pr.title.clone(),
                status: pr.status,
                created_at: pr.created_at,
                merged_at: pr.merged_at,
                author_name: author.map(|u| u.username.clone()).unwrap_or_default(),
                author_team: author
                    .and_then(|u| u.team_name.clone())
                    .unwrap_or_default(),
                reviewer_count: pr.assigned_reviewers.len(),
                reviewer_names: reviewer_names.join(", "),
            }
        })
        .collect();

    let team_stats = teams
        .iter()
        .map(|team| {
            let member_ids: HashSet<&str> =
                team.members.iter().map(|m| m.id.as_str()).collect();
            let authored: Vec<_> = prs
                .iter()
                .filter(|pr| member_ids.contains(pr.author_id.as_str()))
                .collect();
            TeamStats {
                team_name: team.team_name.clone(),
                member_count: team.members.len(),
                authored_pr_count: authored.len(),
                reviewed_pr_count: prs
                    .iter()
                    .filter(|pr| {
                        pr.assigned_reviewers
                            .iter()
                            .any(|r| member_ids.contains(r.as_str()))
                    })
                    .count(),
                merged_pr_count: authored
                    .iter()
                    .filter(|pr| pr.status == PrStatus::Merged)
                    .count(),
            }
        })
        .collect();

    let merged_prs = prs.iter().filter(|pr| pr.status == PrStatus::Merged).count();
    let total_reviews: usize = prs.iter().map(|pr| pr.assigned_reviewers.len()).sum();
    let summary = StatsSummary {
        total_users: users.len(),
        total_teams: teams.len(),
        total_prs: prs.len(),
        open_prs: prs.len() - merged_prs,
        merged_prs,
        total_reviews,
        avg_reviews_per_pr: if prs.is_empty() {
            0
        } else {
            total_reviews / prs.len()
        },
    };

    Ok(StatsResponse {
        user_stats,
        pr_stats,
        team_stats,
        summary,
    })
}
