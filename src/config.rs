//! Server configuration parsed from environment variables.
//!
//! Every knob has a default so the server starts with an empty environment.
//! `MOVE_RULE` is strict: a typo there silently changes puzzle difficulty,
//! so it fails start-up instead of falling back. The sweep interval, rate
//! window and rate cap must be non-zero.

use std::path::PathBuf;
use std::time::Duration;

use crate::board::MoveRule;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_RATE_LIMIT_MAX_MESSAGES: u32 = 30;
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 1000;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid MOVE_RULE `{0}` (expected `any` or `match`)")]
    InvalidMoveRule(String),
    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub port: u16,
    /// Directory holding the browser client bundle.
    pub static_dir: PathBuf,
    /// Idle age after which the sweep evicts a session.
    pub session_timeout: Duration,
    pub sweep_interval: Duration,
    /// Messages accepted per connection within one rate window.
    pub rate_limit_max_messages: u32,
    pub rate_limit_window: Duration,
    /// Inbound text frames longer than this are dropped.
    pub max_payload_bytes: usize,
    pub move_rule: MoveRule,
}

impl GameConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `STATIC_DIR`: default `public`
    /// - `SESSION_TIMEOUT_SECS`: default 3600
    /// - `SWEEP_INTERVAL_SECS`: default 300, non-zero
    /// - `RATE_LIMIT_MAX_MESSAGES`: default 30, non-zero
    /// - `RATE_LIMIT_WINDOW_MS`: default 1000, non-zero
    /// - `MAX_PAYLOAD_BYTES`: default 1024
    /// - `MOVE_RULE`: `any` (default) or `match`
    ///
    /// # Errors
    ///
    /// Returns `InvalidMoveRule` for an unknown rule and `NotPositive` when a
    /// non-zero knob is set to zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let move_rule = parse_move_rule(std::env::var("MOVE_RULE").ok().as_deref())?;
        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR));
        let sweep_interval = positive(
            "SWEEP_INTERVAL_SECS",
            Duration::from_secs(env_parse("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)),
        )?;
        let rate_limit_window = positive(
            "RATE_LIMIT_WINDOW_MS",
            Duration::from_millis(env_parse("RATE_LIMIT_WINDOW_MS", DEFAULT_RATE_LIMIT_WINDOW_MS)),
        )?;
        let rate_limit_max_messages = positive(
            "RATE_LIMIT_MAX_MESSAGES",
            env_parse("RATE_LIMIT_MAX_MESSAGES", DEFAULT_RATE_LIMIT_MAX_MESSAGES),
        )?;

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            static_dir,
            session_timeout: Duration::from_secs(env_parse("SESSION_TIMEOUT_SECS", DEFAULT_SESSION_TIMEOUT_SECS)),
            sweep_interval,
            rate_limit_max_messages,
            rate_limit_window,
            max_payload_bytes: env_parse("MAX_PAYLOAD_BYTES", DEFAULT_MAX_PAYLOAD_BYTES),
            move_rule,
        })
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            rate_limit_max_messages: DEFAULT_RATE_LIMIT_MAX_MESSAGES,
            rate_limit_window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            move_rule: MoveRule::Any,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Reject a zero value; `tokio::time::interval` panics on a zero period and a
/// zero window or cap disables the limiter.
fn positive<T: PartialEq + Default>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::NotPositive { key });
    }
    Ok(value)
}

fn parse_move_rule(raw: Option<&str>) -> Result<MoveRule, ConfigError> {
    match raw.map(str::trim).unwrap_or("any") {
        "" | "any" => Ok(MoveRule::Any),
        "match" | "match_top" => Ok(MoveRule::MatchTop),
        other => Err(ConfigError::InvalidMoveRule(other.to_owned())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
