//! Server-authoritative ball-sort puzzle.
//!
//! The server owns every board. Clients send intents over a websocket and
//! render whatever state comes back; the only state shared between players
//! is the leaderboard.

pub mod board;
pub mod config;
pub mod frame;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;
