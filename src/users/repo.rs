use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    users::{
        repo_types::{Projection, User},
        validation::{NewUser, UserUpdate},
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive username match.
    async fn find_by_username(
        &self,
        username: &str,
        projection: Projection,
    ) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid, projection: Projection)
        -> Result<Option<User>, AppError>;

    /// All users ordered by username.
    async fn list(&self) -> Result<Vec<User>, AppError>;

    async fn create(&self, user: &NewUser) -> Result<User, AppError>;

    /// Read-modify-write with no version check; the last write wins.
    async fn update(&self, update: &UserUpdate) -> Result<User, AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn columns(projection: Projection) -> &'static str {
    match projection {
        Projection::Public => "id, username, name, email, NULL::text AS password_hash, created_at",
        Projection::WithPasswordHash => "id, username, name, email, password_hash, created_at",
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(
        &self,
        username: &str,
        projection: Projection,
    ) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", columns(projection));
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        projection: Projection,
    ) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", columns(projection));
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY username ASC",
            columns(Projection::Public)
        );
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.db).await?;
        Ok(users)
    }

    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let profile = user.profile();
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, name, email, NULL::text AS password_hash, created_at
            "#,
        )
        .bind(&profile.username)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(user.password_hash())
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    async fn update(&self, update: &UserUpdate) -> Result<User, AppError> {
        let profile = update.profile();
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = $2,
                   name = $3,
                   email = $4,
                   password_hash = COALESCE($5, password_hash)
             WHERE id = $1
            RETURNING id, username, name, email, NULL::text AS password_hash, created_at
            "#,
        )
        .bind(update.id())
        .bind(&profile.username)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(update.password_hash())
        .fetch_optional(&self.db)
        .await?;
        updated.ok_or(AppError::NotFound)
    }
}
