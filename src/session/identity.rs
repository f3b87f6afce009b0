use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    users::{
        repo::UserStore,
        repo_types::{Projection, User},
    },
};

/// Maps the id kept in a session to the full user record.
///
/// Every authenticated request pays one store lookup so the current user always
/// reflects the latest record. A read-through cache would slot in here.
#[derive(Clone)]
pub struct IdentityStore {
    users: Arc<dyn UserStore>,
}

impl IdentityStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Session payload for `user`: its id and nothing else.
    pub fn serialize(user: &User) -> Uuid {
        user.id
    }

    pub async fn deserialize(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(id, Projection::Public)
            .await?
            .ok_or(AppError::NotFound)
    }
}
