//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It owns every cross-connection store: sessions (one board each), the
//! leaderboard, the broadcast channels of live sockets, and per-connection
//! rate-limit windows. Nothing lives in globals, so tests build isolated
//! instances.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::frame::Envelope;
use crate::rate_limit::RateLimiter;
use crate::services::leaderboard::Leaderboard;
use crate::services::session::SessionStore;

/// Outbound queue depth per socket. Broadcasts beyond this are dropped.
pub const CLIENT_CHANNEL_CAPACITY: usize = 64;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GameConfig>,
    pub sessions: SessionStore,
    pub leaderboard: Leaderboard,
    /// Connected sockets: `client_id` -> sender for outgoing envelopes.
    pub clients: Arc<RwLock<HashMap<Uuid, mpsc::Sender<Envelope>>>>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_max_messages, config.rate_limit_window);
        let sessions = SessionStore::new(config.move_rule);
        Self {
            config: Arc::new(config),
            sessions,
            leaderboard: Leaderboard::new(),
            clients: Arc::new(RwLock::new(HashMap::new())),
            rate_limiter,
        }
    }

    /// Register a socket for broadcasts.
    pub async fn register_client(&self, client_id: Uuid, tx: mpsc::Sender<Envelope>) {
        self.clients.write().await.insert(client_id, tx);
    }

    /// Drop a socket's broadcast channel and rate-limit window.
    pub async fn unregister_client(&self, client_id: Uuid) {
        self.clients.write().await.remove(&client_id);
        self.rate_limiter.forget(client_id);
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_state_is_empty() {
        let state = test_helpers::test_app_state();
        assert!(state.clients.read().await.is_empty());
        assert!(state.sessions.is_empty().await);
        assert!(state.leaderboard.top().is_empty());
    }

    #[tokio::test]
    async fn register_and_unregister_client() {
        let state = test_helpers::test_app_state();
        let (client_id, _rx) = test_helpers::connect_client(&state).await;
        assert!(state.clients.read().await.contains_key(&client_id));

        state.unregister_client(client_id).await;
        assert!(!state.clients.read().await.contains_key(&client_id));
    }
}
