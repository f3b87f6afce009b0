use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::get,
    Form, Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    error::{AppError, FieldErrors},
    session::extractors::Session,
    state::AppState,
    users::{
        dto::{CreateUserForm, EditUserView, NewUserView, UpdateUserForm, UserFormValues},
        repo_types::User,
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/new", get(new_user))
        .route("/users/:username", get(show_user).put(update_user))
        .route("/users/:username/edit", get(edit_user))
}

/// Percent-encodes a username for use as a path segment.
pub(crate) fn user_path(username: &str) -> String {
    let mut out = String::from("/users/");
    for b in username.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Puts the submitted values and the translated errors in the flash.
async fn flash_failure(session: &Session, values: &UserFormValues, err: &AppError) {
    match err {
        AppError::Storage(e) => error!(error = %e, "user write failed"),
        other => warn!(error = %other, "user form rejected"),
    }
    session.flash("user", values).await;
    session.flash("errors", err.to_field_errors()).await;
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list().await?))
}

#[instrument(skip(session))]
pub async fn new_user(session: Session) -> Json<NewUserView> {
    let user: UserFormValues = session.take_first_flash("user").await.unwrap_or_default();
    let errors: FieldErrors = session.take_first_flash("errors").await.unwrap_or_default();
    Json(NewUserView { user, errors })
}

#[instrument(skip(state, session, form))]
pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CreateUserForm>,
) -> Redirect {
    let (profile, change) = form.into_parts();
    let values = UserFormValues::from(&profile);
    match services::create_user(state.users.as_ref(), state.hasher.as_ref(), profile, change).await
    {
        Ok(_) => Redirect::to("/users"),
        Err(e) => {
            flash_failure(&session, &values, &e).await;
            Redirect::to("/users/new")
        }
    }
}

#[instrument(skip(state))]
pub async fn show_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = services::find_user(state.users.as_ref(), &username).await?;
    Ok(Json(user))
}

#[instrument(skip(state, session))]
pub async fn edit_user(
    State(state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
) -> Result<Json<EditUserView>, AppError> {
    let errors: FieldErrors = session.take_first_flash("errors").await.unwrap_or_default();
    let user = match session.take_first_flash::<UserFormValues>("user").await {
        Some(values) => values,
        None => {
            let user = services::find_user(state.users.as_ref(), &username).await?;
            UserFormValues::from(&user)
        }
    };
    Ok(Json(EditUserView {
        username,
        user,
        errors,
    }))
}

#[instrument(skip(state, session, form))]
pub async fn update_user(
    State(state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
    Form(form): Form<UpdateUserForm>,
) -> Result<Redirect, AppError> {
    let (profile, change) = form.into_parts();
    let values = UserFormValues::from(&profile);
    let result = services::update_user(
        state.users.as_ref(),
        state.hasher.as_ref(),
        &username,
        profile,
        change,
    )
    .await;
    match result {
        Ok(user) => Ok(Redirect::to(&user_path(&user.username))),
        Err(AppError::NotFound) => Err(AppError::NotFound),
        Err(e) => {
            flash_failure(&session, &values, &e).await;
            Ok(Redirect::to(&format!("{}/edit", user_path(&username))))
        }
    }
}
