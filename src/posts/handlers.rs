use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::get,
    Form, Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    posts::{
        dto::{PostForm, PostFormView},
        repo_types::{PostDraft, PostView},
    },
    session::extractors::Session,
    state::AppState,
};

pub fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/new", get(new_post))
        .route(
            "/posts/:id",
            get(show_post).put(update_post).delete(delete_post),
        )
        .route("/posts/:id/edit", get(edit_post))
}

async fn flash_failure(session: &Session, form: &PostForm, err: &AppError) {
    match err {
        AppError::Storage(e) => error!(error = %e, "post write failed"),
        other => warn!(error = %other, "post form rejected"),
    }
    session.flash("post", form).await;
    session.flash("errors", err.to_field_errors()).await;
}

async fn take_form_view(session: &Session) -> (Option<PostForm>, FieldErrors) {
    let errors = session.take_first_flash("errors").await.unwrap_or_default();
    let post = session.take_first_flash("post").await;
    (post, errors)
}

#[instrument(skip(state))]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = state.posts.list().await?;
    Ok(Json(posts.into_iter().map(PostView::from).collect()))
}

#[instrument(skip(session))]
pub async fn new_post(session: Session) -> Json<PostFormView> {
    let (post, errors) = take_form_view(&session).await;
    Json(PostFormView {
        post: post.unwrap_or_default(),
        errors,
    })
}

#[instrument(skip(state, session, form))]
pub async fn create_post(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PostForm>,
) -> Redirect {
    let draft = PostDraft::from(form.clone());
    let result = match draft.validate() {
        Ok(()) => state.posts.create(&draft).await,
        Err(errors) => Err(AppError::Validation(errors)),
    };
    match result {
        Ok(post) => {
            info!(post_id = %post.id, "post created");
            Redirect::to("/posts")
        }
        Err(e) => {
            flash_failure(&session, &form, &e).await;
            Redirect::to("/posts/new")
        }
    }
}

#[instrument(skip(state))]
pub async fn show_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostView>, AppError> {
    let post = state.posts.get(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(PostView::from(post)))
}

#[instrument(skip(state, session))]
pub async fn edit_post(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<PostFormView>, AppError> {
    let (flashed, errors) = take_form_view(&session).await;
    let post = match flashed {
        Some(form) => form,
        None => {
            let post = state.posts.get(id).await?.ok_or(AppError::NotFound)?;
            PostForm {
                title: post.title,
                body: post.body,
            }
        }
    };
    Ok(Json(PostFormView { post, errors }))
}

#[instrument(skip(state, session, form))]
pub async fn update_post(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<PostForm>,
) -> Result<Redirect, AppError> {
    let draft = PostDraft::from(form.clone());
    let result = match draft.validate() {
        Ok(()) => state.posts.update(id, &draft).await,
        Err(errors) => Err(AppError::Validation(errors)),
    };
    match result {
        Ok(post) => {
            info!(post_id = %post.id, "post updated");
            Ok(Redirect::to(&format!("/posts/{}", post.id)))
        }
        Err(AppError::NotFound) => Err(AppError::NotFound),
        Err(e) => {
            flash_failure(&session, &form, &e).await;
            Ok(Redirect::to(&format!("/posts/{id}/edit")))
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    state.posts.delete(id).await?;
    info!(post_id = %id, "post deleted");
    Ok(Redirect::to("/posts"))
}
