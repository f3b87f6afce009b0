use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{macros::format_description, OffsetDateTime};
use uuid::Uuid;

use crate::error::FieldErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

/// Fields a client may set on a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub body: Option<String>,
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.add("title", "Title is required!");
        }
        errors.into_result()
    }
}

/// Post as returned to clients, with display-ready date and time strings.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub created_date: Option<String>,
    pub created_time: Option<String>,
    pub updated_date: Option<String>,
    pub updated_time: Option<String>,
}

fn date(at: OffsetDateTime) -> Option<String> {
    at.format(format_description!("[year]-[month]-[day]")).ok()
}

fn clock(at: OffsetDateTime) -> Option<String> {
    at.format(format_description!("[hour]:[minute]:[second]")).ok()
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            created_date: date(post.created_at),
            created_time: clock(post.created_at),
            updated_date: post.updated_at.and_then(date),
            updated_time: post.updated_at.and_then(clock),
            post,
        }
    }
}
