//! Session store: session ids to boards, with idle eviction.
//!
//! ARCHITECTURE
//! ============
//! A session is created by the first `join` for an unseen id and restored by
//! every later `join`. Disconnecting does not end a session; only the
//! periodic sweep does, once the session has been idle past the timeout.
//!
//! DESIGN
//! ======
//! The map sits behind an `RwLock` and each session behind its own `Mutex`,
//! so moves on one board serialize while different sessions run in parallel.
//! The sweep skips a session that is in use: one whose lock is held, or whose
//! handle has been cloned out of the map by a request that has not locked it
//! yet. Handles are only cloned under the map lock, which the sweep holds
//! exclusively, so neither check can race a lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::board::{Board, MoveRule};

pub const SESSION_ID_MIN_LEN: usize = 10;
pub const SESSION_ID_MAX_LEN: usize = 50;
pub const DISPLAY_NAME_MAX_CHARS: usize = 20;
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session id (expected {SESSION_ID_MIN_LEN}-{SESSION_ID_MAX_LEN} lowercase alphanumerics)")]
    InvalidSessionId,
}

#[derive(Debug)]
pub struct Session {
    pub session_id: String,
    pub display_name: String,
    pub last_activity: Instant,
    pub board: Board,
}

impl Session {
    /// Refresh the activity timestamp.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Result of a join: the session plus whether it was just created.
pub struct Joined {
    pub session: SessionHandle,
    pub created: bool,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    move_rule: MoveRule,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Whether `id` matches `^[a-z0-9]{10,50}$`.
#[must_use]
pub fn is_valid_session_id(id: &str) -> bool {
    (SESSION_ID_MIN_LEN..=SESSION_ID_MAX_LEN).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Strip HTML tags, trim, cap length. Empty input becomes `Anonymous`.
#[must_use]
pub fn sanitize_display_name(raw: &str) -> String {
    let mut stripped = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_control() => {}
            c => stripped.push(c),
        }
    }
    let name: String = stripped
        .trim()
        .chars()
        .take(DISPLAY_NAME_MAX_CHARS)
        .collect();
    let name = name.trim_end();
    if name.is_empty() {
        DEFAULT_DISPLAY_NAME.to_owned()
    } else {
        name.to_owned()
    }
}

// =============================================================================
// STORE
// =============================================================================

impl SessionStore {
    #[must_use]
    pub fn new(move_rule: MoveRule) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), move_rule }
    }

    /// Create or restore a session.
    ///
    /// A known session keeps its board untouched; its name is replaced only
    /// when a non-empty one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSessionId` if the id does not match the required format.
    pub async fn join(&self, session_id: &str, name: Option<&str>) -> Result<Joined, SessionError> {
        self.join_at(session_id, name, Instant::now()).await
    }

    pub(crate) async fn join_at(
        &self,
        session_id: &str,
        name: Option<&str>,
        now: Instant,
    ) -> Result<Joined, SessionError> {
        if !is_valid_session_id(session_id) {
            return Err(SessionError::InvalidSessionId);
        }
        let supplied = name.filter(|n| !n.trim().is_empty()).map(sanitize_display_name);

        let existing = self.sessions.read().await.get(session_id).cloned();
        if let Some(handle) = existing {
            restore(&handle, supplied, now).await;
            return Ok(Joined { session: handle, created: false });
        }

        let mut sessions = self.sessions.write().await;
        // Another connection may have created it between the two locks.
        if let Some(handle) = sessions.get(session_id).cloned() {
            drop(sessions);
            restore(&handle, supplied, now).await;
            return Ok(Joined { session: handle, created: false });
        }

        let session = Session {
            session_id: session_id.to_owned(),
            display_name: supplied.unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_owned()),
            last_activity: now,
            board: Board::new(1, self.move_rule),
        };
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(session_id.to_owned(), handle.clone());
        info!(session_id, total = sessions.len(), "session created");
        Ok(Joined { session: handle, created: true })
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Evict sessions idle longer than `timeout`. Returns the evicted ids.
    pub async fn sweep_at(&self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, handle)| {
                Arc::strong_count(handle) == 1
                    && handle
                        .try_lock()
                        .is_ok_and(|s| now.saturating_duration_since(s.last_activity) > timeout)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired
    }
}

async fn restore(handle: &SessionHandle, name: Option<String>, now: Instant) {
    let mut session = handle.lock().await;
    if let Some(name) = name {
        session.display_name = name;
    }
    session.touch(now);
    info!(session_id = %session.session_id, level = session.board.level(), "session restored");
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
