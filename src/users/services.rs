use tracing::{info, warn};

use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    users::{
        repo::UserStore,
        repo_types::{Projection, User},
        validation::{prepare_new_user, prepare_update, PasswordChange, UserProfile},
    },
};

/// Validate, hash, insert.
pub async fn create_user(
    users: &dyn UserStore,
    hasher: &dyn PasswordHasher,
    profile: UserProfile,
    change: PasswordChange,
) -> Result<User, AppError> {
    let new_user = prepare_new_user(profile, change, hasher)?;
    let user = users.create(&new_user).await?;
    info!(user_id = %user.id, username = %user.username, "user created");
    Ok(user)
}

/// Load with the hash, re-authenticate, validate, hash if changed, save.
pub async fn update_user(
    users: &dyn UserStore,
    hasher: &dyn PasswordHasher,
    username: &str,
    profile: UserProfile,
    change: PasswordChange,
) -> Result<User, AppError> {
    let existing = users
        .find_by_username(username, Projection::WithPasswordHash)
        .await?
        .ok_or(AppError::NotFound)?;

    let update = match prepare_update(&existing, profile, change, hasher) {
        Ok(u) => u,
        Err(e) => {
            warn!(user_id = %existing.id, error = %e, "user update rejected");
            return Err(e);
        }
    };
    let password_changed = update.password_hash().is_some();
    let user = users.update(&update).await?;
    info!(user_id = %user.id, username = %user.username, password_changed, "user updated");
    Ok(user)
}

pub async fn find_user(users: &dyn UserStore, username: &str) -> Result<User, AppError> {
    users
        .find_by_username(username, Projection::Public)
        .await?
        .ok_or(AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::Argon2Hasher, users::memory::InMemoryUserStore};

    fn profile(username: &str) -> UserProfile {
        UserProfile {
            username: username.into(),
            name: "Tester".into(),
            email: None,
        }
    }

    fn signup(password: &str) -> PasswordChange {
        PasswordChange {
            password: Some(password.into()),
            password_confirmation: Some(password.into()),
            ..Default::default()
        }
    }

    async fn stored_hash(store: &InMemoryUserStore, username: &str) -> String {
        store
            .find_by_username(username, Projection::WithPasswordHash)
            .await
            .unwrap()
            .unwrap()
            .password_hash
            .unwrap()
    }

    #[tokio::test]
    async fn created_user_hash_verifies_and_is_hidden_by_default() {
        let store = InMemoryUserStore::new();
        let hasher = Argon2Hasher::new();
        let user = create_user(&store, &hasher, profile("alice"), signup("abc12345"))
            .await
            .expect("create");
        assert!(user.password_hash.is_none());

        let public = find_user(&store, "alice").await.unwrap();
        assert!(public.password_hash.is_none());

        let hash = stored_hash(&store, "alice").await;
        assert!(hasher.verify("abc12345", &hash));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = InMemoryUserStore::new();
        let hasher = Argon2Hasher::new();
        create_user(&store, &hasher, profile("alice"), signup("abc12345"))
            .await
            .unwrap();
        let err = create_user(&store, &hasher, profile("alice"), signup("xyz12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UniquenessConflict { ref field } if field == "username"));
    }

    #[tokio::test]
    async fn wrong_current_password_leaves_record_unchanged() {
        let store = InMemoryUserStore::new();
        let hasher = Argon2Hasher::new();
        create_user(&store, &hasher, profile("alice"), signup("old12345"))
            .await
            .unwrap();
        let before = store
            .find_by_username("alice", Projection::WithPasswordHash)
            .await
            .unwrap();

        let mut renamed = profile("alice");
        renamed.name = "Renamed".into();
        let change = PasswordChange {
            current_password: Some("wrong".into()),
            new_password: Some("new12345".into()),
            password_confirmation: Some("new12345".into()),
            ..Default::default()
        };
        let err = update_user(&store, &hasher, "alice", renamed, change)
            .await
            .unwrap_err();
        assert!(err.to_field_errors().has("currentPassword"));

        let after = store
            .find_by_username("alice", Projection::WithPasswordHash)
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn password_change_swaps_hash() {
        let store = InMemoryUserStore::new();
        let hasher = Argon2Hasher::new();
        create_user(&store, &hasher, profile("alice"), signup("old12345"))
            .await
            .unwrap();
        let change = PasswordChange {
            current_password: Some("old12345".into()),
            new_password: Some("new12345".into()),
            password_confirmation: Some("new12345".into()),
            ..Default::default()
        };
        update_user(&store, &hasher, "alice", profile("alice"), change)
            .await
            .expect("update");

        let hash = stored_hash(&store, "alice").await;
        assert!(hasher.verify("new12345", &hash));
        assert!(!hasher.verify("old12345", &hash));
    }

    #[tokio::test]
    async fn rename_to_taken_username_is_a_conflict() {
        let store = InMemoryUserStore::new();
        let hasher = Argon2Hasher::new();
        create_user(&store, &hasher, profile("alice"), signup("abc12345"))
            .await
            .unwrap();
        create_user(&store, &hasher, profile("bobby"), signup("abc12345"))
            .await
            .unwrap();
        let change = PasswordChange {
            current_password: Some("abc12345".into()),
            ..Default::default()
        };
        let err = update_user(&store, &hasher, "bobby", profile("alice"), change)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_field_errors().message("username"),
            Some("This username already exists!")
        );
    }

    #[tokio::test]
    async fn updating_missing_user_is_not_found() {
        let store = InMemoryUserStore::new();
        let hasher = Argon2Hasher::new();
        let err = update_user(
            &store,
            &hasher,
            "ghost",
            profile("ghost"),
            PasswordChange::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
