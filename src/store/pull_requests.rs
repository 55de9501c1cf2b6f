//! SeaORM-backed store for pull requests and reviewer assignments.
//!
//! Merge and reassignment writes are conditioned on the previously-read
//! state and report affected-row counts, so concurrent writers lose cleanly
//! instead of corrupting the reviewer set.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

use super::{NewPullRequest, PrStatus, PullRequest, PullRequestStore, PullRequestSummary, StoreError};
use crate::db::entities::{pr_reviewer, pull_request};

pub struct DbPullRequestStore {
    db: DatabaseConnection,
}

impl DbPullRequestStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Current unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn parse_status(raw: &str) -> Result<PrStatus, StoreError> {
    PrStatus::parse(raw)
        .ok_or_else(|| StoreError::Db(DbErr::Custom(format!("unknown PR status: {raw}"))))
}

fn to_pull_request(
    model: pull_request::Model,
    reviewers: Vec<String>,
) -> Result<PullRequest, StoreError> {
    let status = parse_status(&model.status)?;
    Ok(PullRequest {
        id: model.id,
        title: model.title,
        author_id: model.author_id,
        status,
        assigned_reviewers: reviewers,
        created_at: model.created_at,
        merged_at: model.merged_at,
    })
}

#[async_trait]
impl PullRequestStore for DbPullRequestStore {
    async fn exists(&self, pr_id: &str) -> Result<bool, StoreError> {
        let found = pull_request::Entity::find_by_id(pr_id).one(&self.db).await?;
        Ok(found.is_some())
    }

    async fn insert(&self, pr: &NewPullRequest) -> Result<(), StoreError> {
        let model = pull_request::ActiveModel {
            id: Set(pr.id.clone()),
            title: Set(pr.title.clone()),
            author_id: Set(pr.author_id.clone()),
            status: Set(PrStatus::Open.as_str().to_string()),
            created_at: Set(now_secs()),
            merged_at: Set(None),
        };

        match model.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(StoreError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, pr_id: &str) -> Result<Option<PullRequest>, StoreError> {
        let model = match pull_request::Entity::find_by_id(pr_id).one(&self.db).await? {
            Some(m) => m,
            None => return Ok(None),
        };

        let reviewers = pr_reviewer::Entity::find()
            .filter(pr_reviewer::Column::PullRequestId.eq(pr_id))
            .order_by_asc(pr_reviewer::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();

        Ok(Some(to_pull_request(model, reviewers)?))
    }

    async fn set_merged(&self, pr_id: &str) -> Result<u64, StoreError> {
        let result = pull_request::Entity::update_many()
            .col_expr(
                pull_request::Column::Status,
                Expr::value(PrStatus::Merged.as_str()),
            )
            .col_expr(pull_request::Column::MergedAt, Expr::value(now_secs()))
            .filter(pull_request::Column::Id.eq(pr_id))
            .filter(pull_request::Column::Status.ne(PrStatus::Merged.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn insert_assignments(
        &self,
        pr_id: &str,
        reviewer_ids: &[String],
    ) -> Result<(), StoreError> {
        if reviewer_ids.is_empty() {
            return Ok(());
        }

        let models = reviewer_ids.iter().map(|user_id| pr_reviewer::ActiveModel {
            pull_request_id: Set(pr_id.to_string()),
            user_id: Set(user_id.clone()),
            ..Default::default()
        });

        pr_reviewer::Entity::insert_many(models).exec(&self.db).await?;
        Ok(())
    }

    async fn replace_assignment(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<u64, StoreError> {
        let result = pr_reviewer::Entity::update_many()
            .col_expr(pr_reviewer::Column::UserId, Expr::value(new_reviewer_id))
            .filter(pr_reviewer::Column::PullRequestId.eq(pr_id))
            .filter(pr_reviewer::Column::UserId.eq(old_reviewer_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn list_by_reviewer(
        &self,
        user_id: &str,
    ) -> Result<Vec<PullRequestSummary>, StoreError> {
        let pr_ids: Vec<String> = pr_reviewer::Entity::find()
            .filter(pr_reviewer::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.pull_request_id)
            .collect();

        if pr_ids.is_empty() {
            return Ok(Vec::new());
        }

        let prs = pull_request::Entity::find()
            .filter(pull_request::Column::Id.is_in(pr_ids))
            .order_by_desc(pull_request::Column::CreatedAt)
            .all(&self.db)
            .await?;

        prs.into_iter()
            .map(|m| {
                let status = parse_status(&m.status)?;
                Ok(PullRequestSummary {
                    id: m.id,
                    title: m.title,
                    author_id: m.author_id,
                    status,
                })
            })
            .collect()
    }

    async fn list_all(&self) -> Result<Vec<PullRequest>, StoreError> {
        let assignments = pr_reviewer::Entity::find()
            .order_by_asc(pr_reviewer::Column::Id)
            .all(&self.db)
            .await?;

        let mut reviewers_by_pr: HashMap<String, Vec<String>> = HashMap::new();
        for row in assignments {
            reviewers_by_pr
                .entry(row.pull_request_id)
                .or_default()
                .push(row.user_id);
        }

        let prs = pull_request::Entity::find()
            .order_by_desc(pull_request::Column::CreatedAt)
            .all(&self.db)
            .await?;

        prs.into_iter()
            .map(|m| {
                let reviewers = reviewers_by_pr.remove(&m.id).unwrap_or_default();
                to_pull_request(m, reviewers)
            })
            .collect()
    }
}
