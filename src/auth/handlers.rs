use axum::{extract::State, response::Redirect, routing::get, Form, Json, Router};
use tracing::{error, info, instrument};

use crate::{
    auth::{
        dto::{LoginForm, LoginView},
        services::Rejection,
    },
    error::{AppError, FieldErrors},
    session::extractors::Session,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_view).post(login))
        .route("/logout", get(logout))
}

#[instrument(skip(session))]
pub async fn login_view(session: Session) -> Json<LoginView> {
    let username = session.take_first_flash("username").await;
    let errors: FieldErrors = session.take_first_flash("errors").await.unwrap_or_default();
    Json(LoginView { username, errors })
}

#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Redirect {
    if let Err(errors) = form.validate() {
        session.flash("username", &form.username).await;
        session.flash("errors", errors).await;
        return Redirect::to("/login");
    }

    match state
        .authenticator
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(identity) => {
            session.login(&identity).await;
            info!(user_id = %identity.user_id, "user logged in");
            Redirect::to("/")
        }
        Err(rejection) => {
            let reason = rejection.reason();
            let err = match rejection {
                Rejection::InvalidCredentials => AppError::AuthenticationRejected,
                Rejection::Storage(e) => {
                    error!(error = %e, reason, "login lookup failed");
                    e
                }
            };
            session.flash("username", &form.username).await;
            session.flash("errors", err.to_field_errors()).await;
            Redirect::to("/login")
        }
    }
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Redirect {
    session.logout().await;
    Redirect::to("/")
}
