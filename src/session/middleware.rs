use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::{
    config::SessionConfig,
    error::AppError,
    session::{
        extractors::{RequestIdentity, Session},
        store::SessionId,
    },
    state::AppState,
};

/// Finds the session id in the `Cookie` header.
fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|c| c.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| SessionId::parse(value))
}

fn set_cookie_value(config: &SessionConfig, id: &SessionId) -> Option<HeaderValue> {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    let raw = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        config.cookie_name,
        id.as_str(),
        config.idle_ttl.as_secs(),
        secure
    );
    match HeaderValue::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            error!(error = %e, "invalid session cookie");
            None
        }
    }
}

async fn resolve_identity(state: &AppState, id: &SessionId) -> Result<RequestIdentity, AppError> {
    let Some(user_id) = state.sessions.user_id(id).await else {
        return Ok(RequestIdentity::anonymous());
    };
    match state.identities.deserialize(user_id).await {
        Ok(user) => Ok(RequestIdentity::authenticated(user)),
        Err(AppError::NotFound) => {
            warn!(%user_id, "session refers to a missing user; treating as anonymous");
            Ok(RequestIdentity::anonymous())
        }
        Err(e) => Err(e),
    }
}

/// Attaches the session handle and the caller's identity to every request.
///
/// The cookie is re-sent on every response so its expiry slides with use and a
/// session rotated by the handler reaches the client.
pub async fn attach_identity(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let cookie_name = &state.config.session.cookie_name;
    let known = match session_cookie(req.headers(), cookie_name) {
        Some(id) => state.sessions.resume(&id).await.then_some(id),
        None => None,
    };
    let id = match known {
        Some(id) => id,
        None => state.sessions.create().await,
    };

    let identity = match resolve_identity(&state, &id).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };
    debug!(is_authenticated = identity.is_authenticated, "request identity");

    let session = Session::new(id, state.sessions.clone());
    req.extensions_mut().insert(session.clone());
    req.extensions_mut().insert(identity);

    let mut res = next.run(req).await;
    if let Some(cookie) = set_cookie_value(&state.config.session, &session.id().await) {
        res.headers_mut().append(header::SET_COOKIE, cookie);
    }
    res
}
