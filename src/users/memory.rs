use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    users::{
        repo::UserStore,
        repo_types::{Projection, User},
        validation::{NewUser, UserUpdate},
    },
};

/// Process-local user store, used in tests and when no database is configured.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn project(user: &User, projection: Projection) -> User {
    match projection {
        Projection::Public => user.public(),
        Projection::WithPasswordHash => user.clone(),
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(
        &self,
        username: &str,
        projection: Projection,
    ) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username == username)
            .map(|u| project(u, projection)))
    }

    async fn find_by_id(
        &self,
        id: Uuid,
        projection: Projection,
    ) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.get(&id).map(|u| project(u, projection)))
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().map(User::public).collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }

    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let profile = user.profile();
        if users.values().any(|u| u.username == profile.username) {
            return Err(AppError::UniquenessConflict {
                field: "username".into(),
            });
        }
        let record = User {
            id: Uuid::new_v4(),
            username: profile.username.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            password_hash: Some(user.password_hash().to_string()),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record.public())
    }

    async fn update(&self, update: &UserUpdate) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let profile = update.profile();
        if users
            .values()
            .any(|u| u.id != update.id() && u.username == profile.username)
        {
            return Err(AppError::UniquenessConflict {
                field: "username".into(),
            });
        }
        let record = users.get_mut(&update.id()).ok_or(AppError::NotFound)?;
        record.username = profile.username.clone();
        record.name = profile.name.clone();
        record.email = profile.email.clone();
        if let Some(hash) = update.password_hash() {
            record.password_hash = Some(hash.to_string());
        }
        Ok(record.public())
    }
}
