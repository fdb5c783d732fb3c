//! Sweep service: periodic eviction of idle sessions.
//!
//! DESIGN
//! ======
//! A background task ticks every `sweep_interval`, evicts sessions idle past
//! `session_timeout`, and drops their leaderboard entries and high scores.
//! The interval is independent of the timeout; sweeping less often only
//! delays eviction. Missed ticks are skipped rather than bunched.

use std::time::Instant;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::services::leaderboard;
use crate::state::AppState;

/// Run one sweep at `now`. Returns the number of evicted sessions.
pub async fn sweep_idle_sessions(state: &AppState, now: Instant) -> usize {
    let evicted = state
        .sessions
        .sweep_at(now, state.config.session_timeout)
        .await;
    if evicted.is_empty() {
        return 0;
    }

    let mut leaderboard_changed = false;
    for session_id in &evicted {
        leaderboard_changed |= state.leaderboard.remove(session_id);
    }
    let remaining = state.sessions.len().await;
    info!(
        evicted = evicted.len(),
        remaining,
        leaderboard_changed,
        "swept idle sessions"
    );

    if leaderboard_changed {
        leaderboard::broadcast_leaderboard(state).await;
    }
    evicted.len()
}

/// Spawn the background sweep task. Returns a handle for shutdown.
pub fn spawn_sweep_task(state: AppState) -> JoinHandle<()> {
    let period = state.config.sweep_interval;
    info!(
        sweep_interval_secs = period.as_secs(),
        session_timeout_secs = state.config.session_timeout.as_secs(),
        "session sweep configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; nothing can be idle yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_idle_sessions(&state, Instant::now()).await;
        }
    })
}

#[cfg(test)]
#[path = "sweep_test.rs"]
mod tests;
