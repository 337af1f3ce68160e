//! Per-user bounded conversation history.
//!
//! Sessions are created lazily on first use, live for the process lifetime
//! and are only mutated through the [`SessionStore`] operations. After every
//! append the history is checked against [`SessionLimits`]: once it grows past
//! `max_turns` it is replaced by its last `retain_turns` entries.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::TurnRole;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Apply the cap. Returns true when the history was cut.
    pub fn truncate_if_needed(&mut self, limits: SessionLimits) -> bool {
        if self.history.len() <= limits.max_turns {
            return false;
        }
        let keep = limits.retain_turns.min(self.history.len());
        let drop = self.history.len() - keep;
        self.history.drain(..drop);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_turns: usize,
    pub retain_turns: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_turns: 50,
            retain_turns: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Storage backend for sessions. Implementations must be safe to share
/// between concurrent turns of different users.
pub trait SessionStore: Send + Sync {
    /// Return the session for `user_id`, creating an empty one if needed.
    fn get_or_create(&self, user_id: &str) -> Session;

    /// Append a turn and enforce the cap. Returns the history length after.
    fn append(&self, user_id: &str, turn: Turn) -> usize;

    /// Enforce the cap without appending. Returns true when the history was cut.
    fn truncate_if_needed(&self, user_id: &str) -> bool;

    /// Up to `n` most recent turns, oldest first.
    fn recent(&self, user_id: &str, n: usize) -> Vec<Turn>;

    /// Drop the session. Returns true if one existed.
    fn reset(&self, user_id: &str) -> bool;

    /// Copy of the session, if one exists.
    fn snapshot(&self, user_id: &str) -> Option<Session>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// InMemorySessionStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    limits: SessionLimits,
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, user_id: &str) -> Session {
        self.lock()
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "creating session");
                Session::new(user_id)
            })
            .clone()
    }

    fn append(&self, user_id: &str, turn: Turn) -> usize {
        let mut sessions = self.lock();
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id));
        session.history.push(turn);
        if session.truncate_if_needed(self.limits) {
            info!(
                user_id,
                retained = session.history.len(),
                "session history truncated"
            );
        }
        session.history.len()
    }

    fn truncate_if_needed(&self, user_id: &str) -> bool {
        self.lock()
            .get_mut(user_id)
            .map(|s| s.truncate_if_needed(self.limits))
            .unwrap_or(false)
    }

    fn recent(&self, user_id: &str, n: usize) -> Vec<Turn> {
        self.lock()
            .get(user_id)
            .map(|s| {
                let start = s.history.len().saturating_sub(n);
                s.history[start..].to_vec()
            })
            .unwrap_or_default()
    }

    fn reset(&self, user_id: &str) -> bool {
        let existed = self.lock().remove(user_id).is_some();
        if existed {
            info!(user_id, "session reset");
        }
        existed
    }

    fn snapshot(&self, user_id: &str) -> Option<Session> {
        self.lock().get(user_id).cloned()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
