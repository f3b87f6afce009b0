use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{session::extractors::RequestIdentity, state::AppState};

#[derive(Debug, Serialize)]
pub struct WelcomeView {
    #[serde(flatten)]
    pub identity: RequestIdentity,
}

pub fn home_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/about", get(about))
        .route("/health", get(|| async { "ok" }))
}

pub async fn welcome(identity: RequestIdentity) -> Json<WelcomeView> {
    Json(WelcomeView { identity })
}

pub async fn about(identity: RequestIdentity) -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "is_authenticated": identity.is_authenticated,
    }))
}
