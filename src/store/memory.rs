//! In-memory implementations of the store traits.
//!
//! State is held in `HashMap`s behind a `RwLock`, mirroring what the
//! SQLite-backed stores do per table. Unit tests run the review service
//! against these instead of a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sea_orm::DbErr;
use tokio::sync::RwLock;

use super::{
    DirectoryStore, NewPullRequest, NewUser, PrStatus, PullRequest, PullRequestStore,
    PullRequestSummary, StoreError, Team, TeamMember, User,
};

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Default)]
struct DirectoryData {
    next_team_id: i32,
    teams: HashMap<i32, String>,
    users: HashMap<String, StoredUser>,
}

#[derive(Clone)]
struct StoredUser {
    username: String,
    is_active: bool,
    team_id: i32,
}

#[derive(Default)]
pub struct MemoryDirectoryStore {
    inner: RwLock<DirectoryData>,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_user(id: &str, stored: &StoredUser, team_name: Option<String>) -> User {
    User {
        id: id.to_string(),
        username: stored.username.clone(),
        is_active: stored.is_active,
        team_id: stored.team_id,
        team_name,
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    async fn resolve(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let data = self.inner.read().await;
        Ok(data.users.get(user_id).map(|stored| {
            let team_name = data.teams.get(&stored.team_id).cloned();
            to_user(user_id, stored, team_name)
        }))
    }

    async fn active_members(
        &self,
        team_id: i32,
        exclude_user_id: &str,
    ) -> Result<Vec<User>, StoreError> {
        let data = self.inner.read().await;
        let mut members: Vec<User> = data
            .users
            .iter()
            .filter(|(id, stored)| {
                stored.team_id == team_id && stored.is_active && id.as_str() != exclude_user_id
            })
            .map(|(id, stored)| to_user(id, stored, None))
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(members)
    }

    async fn insert_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let mut data = self.inner.write().await;
        if data.users.contains_key(&new_user.id) {
            return Err(StoreError::Conflict);
        }
        let stored = StoredUser {
            username: new_user.username.clone(),
            is_active: new_user.is_active,
            team_id: new_user.team_id,
        };
        let team_name = data.teams.get(&new_user.team_id).cloned();
        let user = to_user(&new_user.id, &stored, team_name);
        data.users.insert(new_user.id.clone(), stored);
        Ok(user)
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<u64, StoreError> {
        let mut data = self.inner.write().await;
        match data.users.get_mut(user_id) {
            Some(stored) => {
                stored.is_active = is_active;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn team_id_by_name(&self, name: &str) -> Result<Option<i32>, StoreError> {
        let data = self.inner.read().await;
        Ok(data
            .teams
            .iter()
            .find(|(_, team_name)| team_name.as_str() == name)
            .map(|(id, _)| *id))
    }

    async fn create_team(&self, name: &str, members: &[TeamMember]) -> Result<(), StoreError> {
        let mut data = self.inner.write().await;
        if data.teams.values().any(|n| n == name) {
            return Err(StoreError::Conflict);
        }
        data.next_team_id += 1;
        let team_id = data.next_team_id;
        data.teams.insert(team_id, name.to_string());
        for member in members {
            data.users.insert(
                member.id.clone(),
                StoredUser {
                    username: member.username.clone(),
                    is_active: member.is_active,
                    team_id,
                },
            );
        }
        Ok(())
    }

    async fn team_by_name(&self, name: &str) -> Result<Option<Team>, StoreError> {
        let data = self.inner.read().await;
        let team_id = match data.teams.iter().find(|(_, n)| n.as_str() == name) {
            Some((id, _)) => *id,
            None => return Ok(None),
        };
        let mut members: Vec<User> = data
            .users
            .iter()
            .filter(|(_, stored)| stored.team_id == team_id)
            .map(|(id, stored)| to_user(id, stored, Some(name.to_string())))
            .collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(Some(Team {
            team_name: name.to_string(),
            members,
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let data = self.inner.read().await;
        let mut users: Vec<User> = data
            .users
            .iter()
            .map(|(id, stored)| {
                let team_name = data.teams.get(&stored.team_id).cloned();
                to_user(id, stored, team_name)
            })
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        let data = self.inner.read().await;
        let mut teams: Vec<Team> = data
            .teams
            .iter()
            .map(|(team_id, name)| {
                let mut members: Vec<User> = data
                    .users
                    .iter()
                    .filter(|(_, stored)| stored.team_id == *team_id)
                    .map(|(id, stored)| to_user(id, stored, Some(name.clone())))
                    .collect();
                members.sort_by(|a, b| a.username.cmp(&b.username));
                Team {
                    team_name: name.clone(),
                    members,
                }
            })
            .collect();
        teams.sort_by(|a, b| a.team_name.cmp(&b.team_name));
        Ok(teams)
    }
}

struct StoredPr {
    title: String,
    author_id: String,
    status: PrStatus,
    reviewers: Vec<String>,
    created_at: i64,
    merged_at: Option<i64>,
    /// Insertion sequence, tie-breaker for same-second creations.
    seq: i64,
}

#[derive(Default)]
struct PrData {
    seq: i64,
    prs: HashMap<String, StoredPr>,
}

#[derive(Default)]
pub struct MemoryPullRequestStore {
    inner: RwLock<PrData>,
    /// When set, `insert_assignments` fails, simulating a partial write
    /// after the PR row landed.
    fail_assignments: AtomicBool,
}

impl MemoryPullRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_assignments(&self, fail: bool) {
        self.fail_assignments.store(fail, Ordering::SeqCst);
    }
}

fn to_pr(id: &str, stored: &StoredPr) -> PullRequest {
    PullRequest {
        id: id.to_string(),
        title: stored.title.clone(),
        author_id: stored.author_id.clone(),
        status: stored.status,
        assigned_reviewers: stored.reviewers.clone(),
        created_at: stored.created_at,
        merged_at: stored.merged_at,
    }
}

#[async_trait]
impl PullRequestStore for MemoryPullRequestStore {
    async fn exists(&self, pr_id: &str) -> Result<bool, StoreError> {
        let data = self.inner.read().await;
        Ok(data.prs.contains_key(pr_id))
    }

    async fn insert(&self, pr: &NewPullRequest) -> Result<(), StoreError> {
        let mut data = self.inner.write().await;
        if data.prs.contains_key(&pr.id) {
            return Err(StoreError::Conflict);
        }
        data.seq += 1;
        let seq = data.seq;
        data.prs.insert(
            pr.id.clone(),
            StoredPr {
                title: pr.title.clone(),
                author_id: pr.author_id.clone(),
                status: PrStatus::Open,
                reviewers: Vec::new(),
                created_at: now_secs(),
                merged_at: None,
                seq,
            },
        );
        Ok(())
    }

    async fn get(&self, pr_id: &str) -> Result<Option<PullRequest>, StoreError> {
        let data = self.inner.read().await;
        Ok(data.prs.get(pr_id).map(|stored| to_pr(pr_id, stored)))
    }

    async fn set_merged(&self, pr_id: &str) -> Result<u64, StoreError> {
        let mut data = self.inner.write().await;
        match data.prs.get_mut(pr_id) {
            Some(stored) if stored.status == PrStatus::Open => {
                stored.status = PrStatus::Merged;
                stored.merged_at = Some(now_secs());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn insert_assignments(
        &self,
        pr_id: &str,
        reviewer_ids: &[String],
    ) -> Result<(), StoreError> {
        if self.fail_assignments.load(Ordering::SeqCst) {
            return Err(StoreError::Db(DbErr::Custom(
                "assignment write failed".to_string(),
            )));
        }
        let mut data = self.inner.write().await;
        let stored = data
            .prs
            .get_mut(pr_id)
            .ok_or_else(|| StoreError::Db(DbErr::Custom("no such pull request".to_string())))?;
        for reviewer in reviewer_ids {
            if stored.reviewers.iter().any(|r| r == reviewer) {
                return Err(StoreError::Conflict);
            }
            stored.reviewers.push(reviewer.clone());
        }
        Ok(())
    }

    async fn replace_assignment(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<u64, StoreError> {
        let mut data = self.inner.write().await;
        let stored = match data.prs.get_mut(pr_id) {
            Some(s) => s,
            None => return Ok(0),
        };
        match stored.reviewers.iter().position(|r| r == old_reviewer_id) {
            Some(idx) => {
                if stored.reviewers.iter().any(|r| r == new_reviewer_id) {
                    return Err(StoreError::Conflict);
                }
                stored.reviewers[idx] = new_reviewer_id.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_by_reviewer(
        &self,
        user_id: &str,
    ) -> Result<Vec<PullRequestSummary>, StoreError> {
        let data = self.inner.read().await;
        let mut assigned: Vec<(&String, &StoredPr)> = data
            .prs
            .iter()
            .filter(|(_, stored)| stored.reviewers.iter().any(|r| r == user_id))
            .collect();
        assigned.sort_by(|a, b| (b.1.created_at, b.1.seq).cmp(&(a.1.created_at, a.1.seq)));
        Ok(assigned
            .into_iter()
            .map(|(id, stored)| PullRequestSummary {
                id: id.clone(),
                title: stored.title.clone(),
                author_id: stored.author_id.clone(),
                status: stored.status,
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<PullRequest>, StoreError> {
        let data = self.inner.read().await;
        let mut prs: Vec<(&String, &StoredPr)> = data.prs.iter().collect();
        prs.sort_by(|a, b| (b.1.created_at, b.1.seq).cmp(&(a.1.created_at, a.1.seq)));
        Ok(prs.into_iter().map(|(id, stored)| to_pr(id, stored)).collect())
    }
}
