//! In-memory rate limiting for inbound socket messages.
//!
//! DESIGN
//! ======
//! Fixed-window counters keyed by connection id. Each window starts with the
//! first message after the previous window expired; messages beyond the cap
//! inside a window are rejected and the caller drops them without a reply.
//! Windows are forgotten when the connection closes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded (max {limit} messages/{window_ms}ms)")]
    Exceeded { limit: u32, window_ms: u128 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<Uuid, Window>>>,
    limit: u32,
    window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), limit, window }
    }

    /// Count one message for `client_id`, rejecting it past the window cap.
    pub fn check_and_record(&self, client_id: Uuid) -> Result<(), RateLimitError> {
        self.check_and_record_at(client_id, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    pub(crate) fn check_and_record_at(&self, client_id: Uuid, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let window = inner
            .entry(client_id)
            .or_insert(Window { started: now, count: 0 });

        if now.saturating_duration_since(window.started) >= self.window {
            *window = Window { started: now, count: 0 };
        }
        if window.count >= self.limit {
            return Err(RateLimitError::Exceeded { limit: self.limit, window_ms: self.window.as_millis() });
        }
        window.count += 1;
        Ok(())
    }

    /// Drop the window for a closed connection.
    pub fn forget(&self, client_id: Uuid) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&client_id);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
