use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::warn;

use crate::{
    auth::{
        password::{Argon2Hasher, PasswordHasher},
        services::Authenticator,
    },
    config::AppConfig,
    posts::{
        memory::InMemoryPostStore,
        repo::{PgPostStore, PostStore},
    },
    session::{identity::IdentityStore, store::SessionStore},
    users::{
        memory::InMemoryUserStore,
        repo::{PgUserStore, UserStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<PgPool>,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub authenticator: Authenticator,
    pub sessions: SessionStore,
    pub identities: IdentityStore,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let Some(url) = config.database_url.clone() else {
            warn!("DATABASE_URL not set; using in-memory storage");
            let users = Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>;
            let posts = Arc::new(InMemoryPostStore::new()) as Arc<dyn PostStore>;
            return Self::from_parts(config, None, users, posts);
        };

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&url)
            .await
            .context("connect to database")?;

        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let posts = Arc::new(PgPostStore::new(db.clone())) as Arc<dyn PostStore>;
        Self::from_parts(config, Some(db), users, posts)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        db: Option<PgPool>,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
    ) -> anyhow::Result<Self> {
        let hasher = Arc::new(Argon2Hasher::new()) as Arc<dyn PasswordHasher>;
        let authenticator = Authenticator::new(users.clone(), hasher.clone())?;
        let identities = IdentityStore::new(users.clone());
        let sessions = SessionStore::new(config.session.idle_ttl);
        Ok(Self {
            config,
            db,
            users,
            posts,
            hasher,
            authenticator,
            sessions,
            identities,
        })
    }

    /// In-memory wiring for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let users = Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>;
        let posts = Arc::new(InMemoryPostStore::new()) as Arc<dyn PostStore>;
        Self::from_parts(Arc::new(AppConfig::test()), None, users, posts)
            .expect("in-memory state")
    }
}
