use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::error::{EngineError, Result};

lazy_static! {
    static ref OTP_RE: Regex = Regex::new(r"^\d{4,8}$").unwrap();
}

/// A one-time code is acceptable when it is 4 to 8 digits.
pub fn otp_matches(code: &str) -> bool {
    OTP_RE.is_match(code.trim())
}

/// Throttle bucket: one per (client address, username) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey {
    pub client: String,
    pub username: String,
}

impl ThrottleKey {
    pub fn new(client: &str, username: &str) -> Self {
        Self {
            client: client.to_string(),
            username: username.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThrottlePolicy {
    /// Failures before the pair locks.
    pub max_failures: u32,
    /// Failures before a one-time code is demanded.
    pub otp_after: u32,
    pub lock_seconds: i64,
    /// Idle time after which the failure counter resets.
    pub decay_seconds: i64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            otp_after: 3,
            lock_seconds: 60,
            decay_seconds: 180,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttemptState {
    pub failures: u32,
    pub last_failure: DateTime<Utc>,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Storage behind the throttle. In-memory by default; anything shared
/// (an external cache) can slot in behind the same trait.
#[async_trait]
pub trait ThrottleStore: Send + Sync {
    async fn load(&self, key: &ThrottleKey) -> Option<AttemptState>;
    async fn save(&self, key: ThrottleKey, state: AttemptState);
    async fn clear(&self, key: &ThrottleKey);
}

#[derive(Default)]
pub struct MemoryThrottleStore {
    entries: Mutex<HashMap<ThrottleKey, AttemptState>>,
}

#[async_trait]
impl ThrottleStore for MemoryThrottleStore {
    async fn load(&self, key: &ThrottleKey) -> Option<AttemptState> {
        self.entries.lock().await.get(key).copied()
    }

    async fn save(&self, key: ThrottleKey, state: AttemptState) {
        self.entries.lock().await.insert(key, state);
    }

    async fn clear(&self, key: &ThrottleKey) {
        self.entries.lock().await.remove(key);
    }
}

/// What the throttle demands before the next attempt may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub otp_required: bool,
}

/// Advisory login rate limiter. Best-effort by design: it slows password
/// guessing, it is not a strict security boundary.
pub struct LoginThrottle {
    store: Arc<dyn ThrottleStore>,
    policy: ThrottlePolicy,
}

impl LoginThrottle {
    pub fn new(store: Arc<dyn ThrottleStore>, policy: ThrottlePolicy) -> Self {
        Self { store, policy }
    }

    pub fn in_memory(policy: ThrottlePolicy) -> Self {
        Self::new(Arc::new(MemoryThrottleStore::default()), policy)
    }

    fn decayed(&self, state: &AttemptState, now: DateTime<Utc>) -> bool {
        now - state.last_failure > Duration::seconds(self.policy.decay_seconds)
            && state.locked_until.map(|until| until <= now).unwrap_or(true)
    }

    /// Gate an attempt. Locked pairs fail with `Locked`; pairs past the
    /// step-up threshold require a one-time code.
    pub async fn check(&self, key: &ThrottleKey, now: DateTime<Utc>) -> Result<Gate> {
        let state = match self.store.load(key).await {
            Some(state) if !self.decayed(&state, now) => state,
            Some(_) => {
                self.store.clear(key).await;
                return Ok(Gate {
                    otp_required: false,
                });
            }
            None => {
                return Ok(Gate {
                    otp_required: false,
                });
            }
        };
        if let Some(until) = state.locked_until {
            if until > now {
                let wait = (until - now).num_seconds().max(1);
                return Err(EngineError::Locked(format!(
                    "Too many failed attempts. Try again in {} seconds",
                    wait
                )));
            }
        }
        Ok(Gate {
            otp_required: state.failures >= self.policy.otp_after,
        })
    }

    pub async fn record_failure(&self, key: &ThrottleKey, now: DateTime<Utc>) {
        let mut state = match self.store.load(key).await {
            Some(state) if !self.decayed(&state, now) => state,
            _ => AttemptState {
                failures: 0,
                last_failure: now,
                locked_until: None,
            },
        };
        state.failures += 1;
        state.last_failure = now;
        if state.failures >= self.policy.max_failures {
            state.locked_until = Some(now + Duration::seconds(self.policy.lock_seconds));
            tracing::warn!(
                client = %key.client,
                username = %key.username,
                failures = state.failures,
                "login throttle engaged"
            );
        }
        self.store.save(key.clone(), state).await;
    }

    pub async fn record_success(&self, key: &ThrottleKey) {
        self.store.clear(key).await;
    }
}
