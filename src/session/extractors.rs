use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::services::Identity,
    session::store::{SessionId, SessionStore},
    users::repo_types::User,
};

/// Who is making the request, resolved once by `attach_identity`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestIdentity {
    pub is_authenticated: bool,
    pub current_user: Option<User>,
}

impl RequestIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            is_authenticated: true,
            current_user: Some(user),
        }
    }
}

/// Handle on the current request's session.
///
/// Clones share the id, so a rotation made by a handler is visible to the middleware
/// when it writes the cookie.
#[derive(Debug, Clone)]
pub struct Session {
    id: Arc<RwLock<SessionId>>,
    store: SessionStore,
}

impl Session {
    pub(crate) fn new(id: SessionId, store: SessionStore) -> Self {
        Self {
            id: Arc::new(RwLock::new(id)),
            store,
        }
    }

    pub async fn id(&self) -> SessionId {
        self.id.read().await.clone()
    }

    /// Binds `identity` to a new session id.
    pub async fn login(&self, identity: &Identity) {
        self.rotate(Some(identity.user_id)).await;
    }

    pub async fn logout(&self) {
        self.rotate(None).await;
    }

    async fn rotate(&self, user_id: Option<Uuid>) {
        let mut id = self.id.write().await;
        *id = self.store.rotate(&id, user_id).await;
    }

    pub async fn flash(&self, key: &str, value: impl Serialize) {
        match serde_json::to_value(value) {
            Ok(v) => self.store.push_flash(&self.id().await, key, v).await,
            Err(e) => warn!(error = %e, key, "flash value not serializable"),
        }
    }

    pub async fn take_flash(&self, key: &str) -> Vec<Value> {
        self.store.take_flash(&self.id().await, key).await
    }

    /// First value flashed under `key`, if it decodes as `T`. Drains the key.
    pub async fn take_first_flash<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.take_flash(key)
            .await
            .into_iter()
            .next()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

fn missing_layer() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "session layer not installed".to_string(),
    )
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .ok_or_else(missing_layer)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(missing_layer)
    }
}
