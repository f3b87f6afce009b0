use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    posts::repo_types::{Post, PostDraft},
};

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<Post>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Post>, AppError>;

    async fn create(&self, draft: &PostDraft) -> Result<Post, AppError>;

    /// Overwrites title and body and stamps `updated_at`.
    async fn update(&self, id: Uuid, draft: &PostDraft) -> Result<Post, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgPostStore {
    db: PgPool,
}

impl PgPostStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn list(&self) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, body, created_at, updated_at
              FROM posts
             ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, body, created_at, updated_at
              FROM posts
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(post)
    }

    async fn create(&self, draft: &PostDraft) -> Result<Post, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, body)
            VALUES ($1, $2)
            RETURNING id, title, body, created_at, updated_at
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.body)
        .fetch_one(&self.db)
        .await?;
        Ok(post)
    }

    async fn update(&self, id: Uuid, draft: &PostDraft) -> Result<Post, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
               SET title = $2, body = $3, updated_at = now()
             WHERE id = $1
            RETURNING id, title, body, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.body)
        .fetch_optional(&self.db)
        .await?;
        post.ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
