use serde::{Deserialize, Serialize};

use crate::{
    error::FieldErrors,
    users::{
        repo_types::User,
        validation::{PasswordChange, UserProfile},
    },
};

/// Empty form inputs count as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn profile(username: String, name: String, email: Option<String>) -> UserProfile {
    UserProfile {
        username: username.trim().to_string(),
        name: name.trim().to_string(),
        email: present(email.map(|e| e.trim().to_string())),
    }
}

/// `POST /users` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserForm {
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

impl CreateUserForm {
    pub fn into_parts(self) -> (UserProfile, PasswordChange) {
        let change = PasswordChange {
            password: present(self.password),
            password_confirmation: present(self.password_confirmation),
            ..Default::default()
        };
        (profile(self.username, self.name, self.email), change)
    }
}

/// `PUT /users/:username` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserForm {
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub password_confirmation: Option<String>,
}

impl UpdateUserForm {
    pub fn into_parts(self) -> (UserProfile, PasswordChange) {
        let change = PasswordChange {
            current_password: present(self.current_password),
            new_password: present(self.new_password),
            password_confirmation: present(self.password_confirmation),
            ..Default::default()
        };
        (profile(self.username, self.name, self.email), change)
    }
}

/// Form values echoed back after a failed submit. Passwords are never included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFormValues {
    pub username: String,
    pub name: String,
    pub email: Option<String>,
}

impl From<&UserProfile> for UserFormValues {
    fn from(p: &UserProfile) -> Self {
        Self {
            username: p.username.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
        }
    }
}

impl From<&User> for UserFormValues {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewUserView {
    pub user: UserFormValues,
    pub errors: FieldErrors,
}

#[derive(Debug, Serialize)]
pub struct EditUserView {
    pub username: String,
    pub user: UserFormValues,
    pub errors: FieldErrors,
}
