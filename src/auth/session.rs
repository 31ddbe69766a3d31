use crate::core::error::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One bearer session. Tokens are opaque v4 UUIDs.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remember: bool,
}

/// In-memory session table. "Remember me" sessions live fourteen days,
/// everything else twelve hours.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    remember_ttl: Duration,
    default_ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_lifetimes(Duration::days(14), Duration::hours(12))
    }

    pub fn with_lifetimes(remember_ttl: Duration, default_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            remember_ttl,
            default_ttl,
        }
    }

    pub async fn open(&self, username: &str, remember: bool) -> Session {
        let now = Utc::now();
        let ttl = if remember {
            self.remember_ttl
        } else {
            self.default_ttl
        };
        let session = Session {
            token: Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: now,
            expires_at: now + ttl,
            remember,
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        session
    }

    /// Resolve a token to its username. Expired sessions are dropped on
    /// the way out.
    pub async fn resolve(&self, token: &str) -> Result<String> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(token) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.username.clone()),
            Some(_) => {
                sessions.remove(token);
                Err(EngineError::Unauthorized("Session expired".into()))
            }
            None => Err(EngineError::Unauthorized(
                "Missing or invalid session token".into(),
            )),
        }
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop every session held by one user (account switch, deactivation).
    pub async fn revoke_all(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.username != username);
        before - sessions.len()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        before - sessions.len()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
