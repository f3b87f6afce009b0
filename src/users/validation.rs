//! Validation and hashing steps for creating and updating users.
//!
//! Callers run the pipeline explicitly: [`prepare_new_user`] / [`prepare_update`]
//! validate the submitted fields, hash the plaintext password if one is being set,
//! and hand back a persist-ready value. The store only accepts those values, so a
//! user can't be written without passing through here.

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::{
    auth::password::PasswordHasher,
    error::{AppError, FieldErrors},
    users::repo_types::User,
};

pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 4..=12;
pub const NAME_LEN: std::ops::RangeInclusive<usize> = 4..=12;
pub const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=16;

/// Persisted, user-editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub email: Option<String>,
}

/// Plaintext password inputs for a single create or update. Never stored.
#[derive(Debug, Clone, Default)]
pub struct PasswordChange {
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum Mode<'a> {
    Create,
    Update { stored_hash: &'a str },
}

/// A validated user ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    profile: UserProfile,
    password_hash: String,
}

impl NewUser {
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

/// A validated change to an existing user.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    id: Uuid,
    profile: UserProfile,
    password_hash: Option<String>,
}

impl UserUpdate {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// New hash when the password changed, `None` to keep the stored one.
    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }
}

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// 8-16 characters with at least one letter and one digit.
pub fn is_strong_password(password: &str) -> bool {
    PASSWORD_LEN.contains(&password.chars().count())
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn validate_profile(profile: &UserProfile, errors: &mut FieldErrors) {
    if profile.username.is_empty() {
        errors.add("username", "Username is required!");
    } else if !USERNAME_LEN.contains(&profile.username.chars().count()) {
        errors.add("username", "Username should be 4-12 characters!");
    }

    if profile.name.is_empty() {
        errors.add("name", "Name is required!");
    } else if !NAME_LEN.contains(&profile.name.chars().count()) {
        errors.add("name", "Name should be 4-12 characters!");
    }

    if let Some(email) = profile.email.as_deref() {
        if !is_valid_email(email) {
            errors.add("email", "Should be a valid email address!");
        }
    }
}

const STRENGTH_MESSAGE: &str =
    "Should be 8-16 characters with at least one letter and one number!";

/// Password rules for the given mode, in order. Returns the plaintext that
/// should be hashed once validation succeeds.
pub fn validate_password<'c>(
    mode: Mode<'_>,
    change: &'c PasswordChange,
    hasher: &dyn PasswordHasher,
    errors: &mut FieldErrors,
) -> Option<&'c str> {
    let confirmation = change.password_confirmation.as_deref();
    match mode {
        Mode::Create => {
            let password = change.password.as_deref();
            match password {
                None => errors.add("password", "Password is required!"),
                Some(p) if !is_strong_password(p) => errors.add("password", STRENGTH_MESSAGE),
                Some(_) => {}
            }
            match confirmation {
                None => errors.add(
                    "passwordConfirmation",
                    "Password Confirmation is required!",
                ),
                Some(c) if password != Some(c) => errors.add(
                    "passwordConfirmation",
                    "Password Confirmation does not match!",
                ),
                Some(_) => {}
            }
            password
        }
        Mode::Update { stored_hash } => {
            match change.current_password.as_deref() {
                None => errors.add("currentPassword", "Current Password is required!"),
                Some(current) if !hasher.verify(current, stored_hash) => {
                    errors.add("currentPassword", "Current Password is invalid!")
                }
                Some(_) => {}
            }
            let new_password = change.new_password.as_deref()?;
            if !is_strong_password(new_password) {
                errors.add("newPassword", STRENGTH_MESSAGE);
            }
            if confirmation != Some(new_password) {
                errors.add(
                    "passwordConfirmation",
                    "Password Confirmation does not match!",
                );
            }
            Some(new_password)
        }
    }
}

/// Runs every rule for `mode`, collecting one error per field.
pub fn validate<'c>(
    mode: Mode<'_>,
    profile: &UserProfile,
    change: &'c PasswordChange,
    hasher: &dyn PasswordHasher,
) -> Result<Option<&'c str>, FieldErrors> {
    let mut errors = FieldErrors::new();
    validate_profile(profile, &mut errors);
    let plaintext = validate_password(mode, change, hasher, &mut errors);
    errors.into_result().map(|()| plaintext)
}

pub fn prepare_new_user(
    profile: UserProfile,
    change: PasswordChange,
    hasher: &dyn PasswordHasher,
) -> Result<NewUser, AppError> {
    let plaintext = validate(Mode::Create, &profile, &change, hasher)?
        .ok_or_else(|| anyhow::anyhow!("validated create without a password"))?;
    let password_hash = hasher.hash(plaintext)?;
    Ok(NewUser {
        profile,
        password_hash,
    })
}

/// `existing` must have been read with `Projection::WithPasswordHash`.
pub fn prepare_update(
    existing: &User,
    profile: UserProfile,
    change: PasswordChange,
    hasher: &dyn PasswordHasher,
) -> Result<UserUpdate, AppError> {
    let stored_hash = existing
        .password_hash
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("user {} loaded without password hash", existing.id))?;
    let plaintext = validate(Mode::Update { stored_hash }, &profile, &change, hasher)?;
    let password_hash = plaintext.map(|p| hasher.hash(p)).transpose()?;
    Ok(UserUpdate {
        id: existing.id,
        profile,
        password_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::Argon2Hasher;
    use time::OffsetDateTime;

    fn profile() -> UserProfile {
        UserProfile {
            username: "alice".into(),
            name: "Alice".into(),
            email: Some("alice@example.com".into()),
        }
    }

    fn create(password: &str, confirmation: &str) -> PasswordChange {
        PasswordChange {
            password: Some(password.into()),
            password_confirmation: Some(confirmation.into()),
            ..Default::default()
        }
    }

    fn stored(hasher: &Argon2Hasher, password: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            name: "Alice".into(),
            email: None,
            password_hash: Some(hasher.hash(password).unwrap()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn strength_rule() {
        assert!(is_strong_password("abc12345"));
        assert!(is_strong_password("a1b2c3d4e5f6g7h8"));
        assert!(!is_strong_password("short1"));
        assert!(!is_strong_password("abcdefgh"));
        assert!(!is_strong_password("12345678"));
        assert!(!is_strong_password("a1b2c3d4e5f6g7h8i"));
    }

    #[test]
    fn create_with_matching_strong_password_is_hashed() {
        let hasher = Argon2Hasher::new();
        let user = prepare_new_user(profile(), create("abc12345", "abc12345"), &hasher)
            .expect("valid user");
        assert_ne!(user.password_hash(), "abc12345");
        assert!(hasher.verify("abc12345", user.password_hash()));
    }

    #[test]
    fn create_with_short_password_fails_on_password() {
        let hasher = Argon2Hasher::new();
        let errors = validate(Mode::Create, &profile(), &create("short1", "short1"), &hasher)
            .unwrap_err();
        assert!(errors.has("password"));
        assert!(!errors.has("passwordConfirmation"));
    }

    #[test]
    fn create_with_mismatched_confirmation_fails_on_confirmation() {
        let hasher = Argon2Hasher::new();
        let errors = validate(
            Mode::Create,
            &profile(),
            &create("abc12345", "different"),
            &hasher,
        )
        .unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["passwordConfirmation"]);
    }

    #[test]
    fn create_without_confirmation_reports_required() {
        let hasher = Argon2Hasher::new();
        let change = PasswordChange {
            password: Some("abc12345".into()),
            ..Default::default()
        };
        let errors = validate(Mode::Create, &profile(), &change, &hasher).unwrap_err();
        assert_eq!(
            errors.message("passwordConfirmation"),
            Some("Password Confirmation is required!")
        );
    }

    #[test]
    fn update_with_wrong_current_password_fails() {
        let hasher = Argon2Hasher::new();
        let existing = stored(&hasher, "old12345");
        let change = PasswordChange {
            current_password: Some("wrong".into()),
            ..Default::default()
        };
        let err = prepare_update(&existing, profile(), change, &hasher).unwrap_err();
        let errors = err.to_field_errors();
        assert_eq!(errors.message("currentPassword"), Some("Current Password is invalid!"));
    }

    #[test]
    fn update_without_current_password_is_required() {
        let hasher = Argon2Hasher::new();
        let existing = stored(&hasher, "old12345");
        let err = prepare_update(&existing, profile(), PasswordChange::default(), &hasher)
            .unwrap_err();
        assert_eq!(
            err.to_field_errors().message("currentPassword"),
            Some("Current Password is required!")
        );
    }

    #[test]
    fn update_with_new_password_replaces_hash() {
        let hasher = Argon2Hasher::new();
        let existing = stored(&hasher, "old12345");
        let change = PasswordChange {
            current_password: Some("old12345".into()),
            new_password: Some("new12345".into()),
            password_confirmation: Some("new12345".into()),
            ..Default::default()
        };
        let update = prepare_update(&existing, profile(), change, &hasher).expect("valid");
        let hash = update.password_hash().expect("hash replaced");
        assert!(hasher.verify("new12345", hash));
        assert!(!hasher.verify("old12345", hash));
    }

    #[test]
    fn update_without_new_password_keeps_hash() {
        let hasher = Argon2Hasher::new();
        let existing = stored(&hasher, "old12345");
        let change = PasswordChange {
            current_password: Some("old12345".into()),
            ..Default::default()
        };
        let update = prepare_update(&existing, profile(), change, &hasher).expect("valid");
        assert!(update.password_hash().is_none());
        assert_eq!(update.id(), existing.id);
    }

    #[test]
    fn update_collects_one_error_per_field() {
        let hasher = Argon2Hasher::new();
        let existing = stored(&hasher, "old12345");
        let change = PasswordChange {
            current_password: Some("wrong".into()),
            new_password: Some("weak".into()),
            password_confirmation: Some("other".into()),
            ..Default::default()
        };
        let errors = validate(
            Mode::Update {
                stored_hash: existing.password_hash.as_deref().unwrap(),
            },
            &profile(),
            &change,
            &hasher,
        )
        .unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["currentPassword", "newPassword", "passwordConfirmation"]
        );
    }

    #[test]
    fn profile_rules() {
        let mut errors = FieldErrors::new();
        validate_profile(
            &UserProfile {
                username: "abc".into(),
                name: String::new(),
                email: Some("not-an-email".into()),
            },
            &mut errors,
        );
        assert_eq!(
            errors.message("username"),
            Some("Username should be 4-12 characters!")
        );
        assert_eq!(errors.message("name"), Some("Name is required!"));
        assert!(errors.has("email"));

        let mut errors = FieldErrors::new();
        validate_profile(&profile(), &mut errors);
        assert!(errors.is_empty());
    }
}
