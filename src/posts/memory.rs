use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    posts::{
        repo::PostStore,
        repo_types::{Post, PostDraft},
    },
};

#[derive(Debug, Default, Clone)]
pub struct InMemoryPostStore {
    posts: Arc<RwLock<HashMap<Uuid, Post>>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn list(&self) -> Result<Vec<Post>, AppError> {
        let posts = self.posts.read().await;
        let mut all: Vec<Post> = posts.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn create(&self, draft: &PostDraft) -> Result<Post, AppError> {
        let post = Post {
            id: Uuid::new_v4(),
            title: draft.title.clone(),
            body: draft.body.clone(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        self.posts.write().await.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, id: Uuid, draft: &PostDraft) -> Result<Post, AppError> {
        let mut posts = self.posts.write().await;
        let post = posts.get_mut(&id).ok_or(AppError::NotFound)?;
        post.title = draft.title.clone();
        post.body = draft.body.clone();
        post.updated_at = Some(OffsetDateTime::now_utc());
        Ok(post.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.posts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }
}
