//! Leaderboard service: global top-5 of per-session high scores.
//!
//! DESIGN
//! ======
//! Entries are independent copies of the ranking fields; nothing here points
//! at live board state. The high-score table and the ranked list live under
//! one mutex so check → replace → sort → truncate is a single atomic step.
//!
//! Broadcast pushes a snapshot to every connected socket with `try_send`.
//! A full or closed channel skips that client; nobody waits on a slow peer.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use crate::frame::Envelope;
use crate::state::AppState;

/// Number of ranked entries kept and broadcast.
pub const LEADERBOARD_SIZE: usize = 5;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub session_id: String,
    pub score: u64,
    pub level: u32,
    pub name: String,
    /// Milliseconds since Unix epoch. Breaks score ties, earliest first.
    #[serde(skip)]
    pub recorded_at: i64,
}

impl LeaderboardEntry {
    pub fn new(session_id: impl Into<String>, score: u64, level: u32, name: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), score, level, name: name.into(), recorded_at: now_ms() }
    }
}

#[derive(Clone, Default)]
pub struct Leaderboard {
    inner: Arc<Mutex<LeaderboardInner>>,
}

#[derive(Default)]
struct LeaderboardInner {
    entries: Vec<LeaderboardEntry>,
    /// Best score ever recorded per session, ranked or not.
    high_scores: HashMap<String, u64>,
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Leaderboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a score. Returns `true` when the ranked list changed.
    ///
    /// Scores that do not strictly beat the session's previous best are
    /// ignored entirely.
    pub fn record(&self, session_id: &str, score: u64, level: u32, name: &str) -> bool {
        let mut inner = self.lock();
        if inner
            .high_scores
            .get(session_id)
            .is_some_and(|&best| score <= best)
        {
            return false;
        }
        inner.high_scores.insert(session_id.to_owned(), score);

        let before = inner.entries.clone();
        inner.entries.retain(|e| e.session_id != session_id);
        inner
            .entries
            .push(LeaderboardEntry::new(session_id, score, level, name));
        inner
            .entries
            .sort_by_key(|e| (Reverse(e.score), e.recorded_at));
        inner.entries.truncate(LEADERBOARD_SIZE);

        inner.entries != before
    }

    /// Rename a ranked session. Returns `true` when an entry changed.
    pub fn rename(&self, session_id: &str, name: &str) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner
            .entries
            .iter_mut()
            .find(|e| e.session_id == session_id)
        else {
            return false;
        };
        if entry.name == name {
            return false;
        }
        name.clone_into(&mut entry.name);
        true
    }

    /// Forget a session's entry and high score. Returns `true` when the
    /// ranked list changed.
    pub fn remove(&self, session_id: &str) -> bool {
        let mut inner = self.lock();
        inner.high_scores.remove(session_id);
        let before = inner.entries.len();
        inner.entries.retain(|e| e.session_id != session_id);
        inner.entries.len() != before
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn high_score(&self, session_id: &str) -> Option<u64> {
        self.lock().high_scores.get(session_id).copied()
    }

    /// Snapshot of the ranked entries, best first.
    #[must_use]
    pub fn top(&self) -> Vec<LeaderboardEntry> {
        self.lock().entries.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LeaderboardInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Push the current ranking to every connected client.
pub async fn broadcast_leaderboard(state: &AppState) {
    let frame = Envelope::leaderboard(&state.leaderboard.top());
    let clients = state.clients.read().await;
    for (client_id, tx) in clients.iter() {
        // Best-effort: if a client's channel is full, skip it.
        if tx.try_send(frame.clone()).is_err() {
            debug!(%client_id, "leaderboard broadcast skipped client");
        }
    }
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "leaderboard_test.rs"]
mod tests;
