use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    session::identity::IdentityStore,
    users::{repo::UserStore, repo_types::Projection},
};

// Verified against when the username is unknown so both failure paths cost one hash check.
const DUMMY_PASSWORD: &str = "postboard-dummy-password-0";

/// Minimal authenticated reference to a user, as kept in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    /// Unknown username and wrong password are deliberately the same case.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] AppError),
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::InvalidCredentials => "invalid_credentials",
            Rejection::Storage(_) => "storage_error",
        }
    }
}

/// Username/password strategy.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: Arc<str>,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> anyhow::Result<Self> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?.into();
        Ok(Self {
            users,
            hasher,
            dummy_hash,
        })
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, Rejection> {
        let user = self
            .users
            .find_by_username(username, Projection::WithPasswordHash)
            .await?;

        let Some((user, hash)) = user.and_then(|u| {
            let hash = u.password_hash.clone()?;
            Some((u, hash))
        }) else {
            let _ = self.hasher.verify(password, &self.dummy_hash);
            debug!("login unknown username");
            return Err(Rejection::InvalidCredentials);
        };

        if !self.hasher.verify(password, &hash) {
            warn!(user_id = %user.id, "login invalid password");
            return Err(Rejection::InvalidCredentials);
        }

        debug!(user_id = %user.id, "credentials verified");
        Ok(Identity {
            user_id: IdentityStore::serialize(&user),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        auth::password::Argon2Hasher,
        users::{
            memory::InMemoryUserStore,
            services::create_user,
            validation::{PasswordChange, UserProfile},
        },
    };

    async fn authenticator_with_alice() -> (Authenticator, Uuid) {
        let users = Arc::new(InMemoryUserStore::new());
        let hasher = Arc::new(Argon2Hasher::new());
        let alice = create_user(
            users.as_ref(),
            hasher.as_ref(),
            UserProfile {
                username: "alice".into(),
                name: "Alice".into(),
                email: None,
            },
            PasswordChange {
                password: Some("abc12345".into()),
                password_confirmation: Some("abc12345".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let auth = Authenticator::new(users, hasher).unwrap();
        (auth, alice.id)
    }

    #[tokio::test]
    async fn correct_credentials_yield_identity() {
        let (auth, alice) = authenticator_with_alice().await;
        let identity = auth.authenticate("alice", "abc12345").await.unwrap();
        assert_eq!(identity.user_id, alice);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let (auth, _) = authenticator_with_alice().await;
        let unknown = auth.authenticate("nobody", "abc12345").await.unwrap_err();
        let wrong = auth.authenticate("alice", "wrong123").await.unwrap_err();
        assert!(matches!(unknown, Rejection::InvalidCredentials));
        assert!(matches!(wrong, Rejection::InvalidCredentials));
        assert_eq!(unknown.reason(), "invalid_credentials");
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[derive(Debug, Default)]
    struct CountingHasher {
        inner: Argon2Hasher,
        verifies: AtomicUsize,
    }

    impl PasswordHasher for CountingHasher {
        fn hash(&self, plain: &str) -> anyhow::Result<String> {
            self.inner.hash(plain)
        }

        fn verify(&self, plain: &str, hash: &str) -> bool {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(plain, hash)
        }
    }

    #[tokio::test]
    async fn every_failed_login_costs_exactly_one_verify() {
        let users = Arc::new(InMemoryUserStore::new());
        let hasher = Arc::new(CountingHasher::default());
        create_user(
            users.as_ref(),
            hasher.as_ref(),
            UserProfile {
                username: "alice".into(),
                name: "Alice".into(),
                email: None,
            },
            PasswordChange {
                password: Some("abc12345".into()),
                password_confirmation: Some("abc12345".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let auth = Authenticator::new(users, hasher.clone()).unwrap();

        hasher.verifies.store(0, Ordering::SeqCst);
        auth.authenticate("nobody", "abc12345").await.unwrap_err();
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 1);

        hasher.verifies.store(0, Ordering::SeqCst);
        auth.authenticate("alice", "wrong123").await.unwrap_err();
        assert_eq!(hasher.verifies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn username_match_is_case_sensitive() {
        let (auth, _) = authenticator_with_alice().await;
        let err = auth.authenticate("Alice", "abc12345").await.unwrap_err();
        assert_eq!(err.reason(), "invalid_credentials");
    }
}
