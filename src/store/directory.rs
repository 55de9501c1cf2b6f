//! SeaORM-backed directory store for users and teams.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};

use super::{DirectoryStore, NewUser, StoreError, Team, TeamMember, User};
use crate::db::entities::{team, user};

pub struct DbDirectoryStore {
    db: DatabaseConnection,
}

impl DbDirectoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_user(model: user::Model, team_name: Option<String>) -> User {
    User {
        id: model.id,
        username: model.username,
        is_active: model.is_active,
        team_id: model.team_id,
        team_name,
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl DirectoryStore for DbDirectoryStore {
    async fn resolve(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let model = match user::Entity::find_by_id(user_id).one(&self.db).await? {
            Some(m) => m,
            None => return Ok(None),
        };

        let team_name = team::Entity::find_by_id(model.team_id)
            .one(&self.db)
            .await?
            .map(|t| t.name);

        Ok(Some(to_user(model, team_name)))
    }

    async fn active_members(
        &self,
        team_id: i32,
        exclude_user_id: &str,
    ) -> Result<Vec<User>, StoreError> {
        let members = user::Entity::find()
            .filter(user::Column::TeamId.eq(team_id))
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::Id.ne(exclude_user_id))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(members.into_iter().map(|m| to_user(m, None)).collect())
    }

    async fn insert_user(&self, new_user: &NewUser) -> Result<User, StoreError> {
        let model = user::ActiveModel {
            id: Set(new_user.id.clone()),
            username: Set(new_user.username.clone()),
            is_active: Set(new_user.is_active),
            team_id: Set(new_user.team_id),
        };

        let inserted = match model.insert(&self.db).await {
            Ok(m) => m,
            Err(e) if is_unique_violation(&e) => return Err(StoreError::Conflict),
            Err(e) => return Err(e.into()),
        };

        let team_name = team::Entity::find_by_id(inserted.team_id)
            .one(&self.db)
            .await?
            .map(|t| t.name);

        Ok(to_user(inserted, team_name))
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> Result<u64, StoreError> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::IsActive, Expr::value(is_active))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn team_id_by_name(&self, name: &str) -> Result<Option<i32>, StoreError> {
        let team = team::Entity::find()
            .filter(team::Column::Name.eq(name))
            .one(&self.db)
            .await?;

        Ok(team.map(|t| t.id))
    }

    async fn create_team(&self, name: &str, members: &[TeamMember]) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        let team_model = team::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };
        let created = match team_model.insert(&txn).await {
            Ok(t) => t,
            Err(e) if is_unique_violation(&e) => return Err(StoreError::Conflict),
            Err(e) => return Err(e.into()),
        };

        // Members may already exist; re-home them onto the new team. Any
        // failure here rolls the team row back with the transaction.
        for member in members {
            let model = user::ActiveModel {
                id: Set(member.id.clone()),
                username: Set(member.username.clone()),
                is_active: Set(member.is_active),
                team_id: Set(created.id),
            };
            user::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(user::Column::Id)
                        .update_columns([
                            user::Column::Username,
                            user::Column::IsActive,
                            user::Column::TeamId,
                        ])
                        .to_owned(),
                )
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn team_by_name(&self, name: &str) -> Result<Option<Team>, StoreError> {
        let team = match team::Entity::find()
            .filter(team::Column::Name.eq(name))
            .one(&self.db)
            .await?
        {
            Some(t) => t,
            None => return Ok(None),
        };

        let members = user::Entity::find()
            .filter(user::Column::TeamId.eq(team.id))
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await?;

        Ok(Some(Team {
            team_name: team.name.clone(),
            members: members
                .into_iter()
                .map(|m| to_user(m, Some(team.name.clone())))
                .collect(),
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let teams: HashMap<i32, String> = team::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let users = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(users
            .into_iter()
            .map(|m| {
                let team_name = teams.get(&m.team_id).cloned();
                to_user(m, team_name)
            })
            .collect())
    }

    async fn list_teams(&self) -> Result<Vec<Team>, StoreError> {
        let teams = team::Entity::find()
            .order_by_asc(team::Column::Name)
            .all(&self.db)
            .await?;

        let users = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&self.db)
            .await?;

        let mut members_by_team: HashMap<i32, Vec<user::Model>> = HashMap::new();
        for u in users {
            members_by_team.entry(u.team_id).or_default().push(u);
        }

        Ok(teams
            .into_iter()
            .map(|t| {
                let members = members_by_team
                    .remove(&t.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| to_user(m, Some(t.name.clone())))
                    .collect();
                Team {
                    team_name: t.name,
                    members,
                }
            })
            .collect())
    }
}
