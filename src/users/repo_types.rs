use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    /// Only loaded by `Projection::WithPasswordHash` reads; never sent to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Copy of the record with the hash stripped, as a default read returns it.
    pub fn public(&self) -> User {
        User {
            password_hash: None,
            ..self.clone()
        }
    }
}

/// Which columns a read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Public,
    WithPasswordHash,
}
