use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

const SESSION_ID_LEN: usize = 48;

/// Opaque random session identifier carried in the session cookie.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    /// Accepts only values shaped like ids this store hands out.
    pub fn parse(raw: &str) -> Option<Self> {
        (raw.len() == SESSION_ID_LEN && raw.chars().all(|c| c.is_ascii_alphanumeric()))
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// keep ids out of logs
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({}…)", &self.0[..6])
    }
}

#[derive(Debug)]
struct SessionData {
    user_id: Option<Uuid>,
    flash: HashMap<String, Vec<Value>>,
    last_seen: Instant,
}

impl SessionData {
    fn new() -> Self {
        Self {
            user_id: None,
            flash: HashMap::new(),
            last_seen: Instant::now(),
        }
    }
}

/// Server-side sessions: the authenticated user id plus the flash channel.
///
/// A session idle for longer than `idle_ttl` is gone: lookups treat it as unknown
/// and `create` sweeps it out of the map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionData>>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_ttl,
        }
    }

    fn expired(&self, session: &SessionData, now: Instant) -> bool {
        now.saturating_duration_since(session.last_seen) > self.idle_ttl
    }

    pub async fn create(&self) -> SessionId {
        let id = SessionId::generate();
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, s| !self.expired(s, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, "expired sessions removed");
        }
        sessions.insert(id.clone(), SessionData::new());
        id
    }

    /// Marks the session as seen. `false` if it is unknown or has expired.
    pub async fn resume(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        match sessions.get_mut(id) {
            Some(s) if !self.expired(s, now) => {
                s.last_seen = now;
                true
            }
            Some(_) => {
                sessions.remove(id);
                false
            }
            None => false,
        }
    }

    pub async fn user_id(&self, id: &SessionId) -> Option<Uuid> {
        self.sessions.read().await.get(id).and_then(|s| s.user_id)
    }

    /// Replaces `old` with a freshly generated id carrying `user_id` and any pending
    /// flash. The old id stops resolving.
    pub async fn rotate(&self, old: &SessionId, user_id: Option<Uuid>) -> SessionId {
        let id = SessionId::generate();
        let mut sessions = self.sessions.write().await;
        let mut data = sessions.remove(old).unwrap_or_else(SessionData::new);
        data.user_id = user_id;
        data.last_seen = Instant::now();
        sessions.insert(id.clone(), data);
        id
    }

    /// Appends `value` under `key`; visible to the next `take_flash`.
    pub async fn push_flash(&self, id: &SessionId, key: &str, value: Value) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session
                .flash
                .entry(key.to_string())
                .or_default()
                .push(value);
        }
    }

    /// Returns and clears everything flashed under `key`.
    pub async fn take_flash(&self, id: &SessionId, key: &str) -> Vec<Value> {
        self.sessions
            .write()
            .await
            .get_mut(id)
            .and_then(|s| s.flash.remove(key))
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
