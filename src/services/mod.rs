//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the shared stores and background work so the route
//! handler can stay focused on protocol translation.

pub mod leaderboard;
pub mod session;
pub mod sweep;
