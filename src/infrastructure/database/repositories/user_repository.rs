use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::domain::{DomainError, DomainResult, User, UserStore};
use crate::infrastructure::database::entities::user;

pub struct SeaOrmUserStore {
    db: DatabaseConnection,
}

impl SeaOrmUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        password_hash: model.password_hash,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Persistence(e.to_string())
}

/// Unique-index violations become `Conflict`, anything else `Persistence`.
fn write_err(username: &str, e: sea_orm::DbErr) -> DomainError {
    let msg = e.to_string();
    if msg.contains("UNIQUE") || msg.contains("duplicate") {
        DomainError::Conflict(format!("username '{}' is taken", username))
    } else {
        db_err(e)
    }
}

/// Ids are UUIDs; anything else cannot name a stored user.
fn parse_id(id: &str) -> DomainResult<String> {
    Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| DomainError::user_not_found(id))
}

// ── Store implementation ────────────────────────────────────────

#[async_trait]
impl UserStore for SeaOrmUserStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> DomainResult<User> {
        let now = Utc::now();

        let new_user = user::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = new_user
            .insert(&self.db)
            .await
            .map_err(|e| write_err(username, e))?;

        Ok(user_model_to_domain(model))
    }

    async fn get_user(&self, id: &str) -> DomainResult<User> {
        let key = parse_id(id)?;
        user::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(user_model_to_domain)
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(user_model_to_domain).collect())
    }

    async fn update_user(
        &self,
        id: &str,
        username: &str,
        password_hash: Option<&str>,
    ) -> DomainResult<()> {
        let key = parse_id(id)?;
        let existing = user::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Err(DomainError::user_not_found(id));
        };

        let mut active: user::ActiveModel = existing.into();
        active.username = Set(username.to_string());
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash.to_string());
        }
        active.updated_at = Set(Utc::now());

        active
            .update(&self.db)
            .await
            .map_err(|e| write_err(username, e))?;

        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let key = parse_id(id)?;
        let result = user::Entity::delete_by_id(key)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::user_not_found(id));
        }

        Ok(())
    }
}
