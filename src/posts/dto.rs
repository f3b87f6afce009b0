use serde::{Deserialize, Serialize};

use crate::{error::FieldErrors, posts::repo_types::PostDraft};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub body: Option<String>,
}

impl From<PostForm> for PostDraft {
    fn from(form: PostForm) -> Self {
        Self {
            title: form.title.trim().to_string(),
            body: form.body.filter(|b| !b.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostFormView {
    pub post: PostForm,
    pub errors: FieldErrors,
}
