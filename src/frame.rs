//! Envelope: the message type on the game socket.
//!
//! ARCHITECTURE
//! ============
//! Every WebSocket text frame in either direction is a JSON envelope
//! `{ "type": string, "data": any }`. Inbound envelopes are parsed into a
//! typed `ClientMessage`; outbound envelopes are built from serializable
//! views by the constructors below.
//!
//! DESIGN
//! ======
//! - `data` stays an untyped `serde_json::Value` at the envelope layer so the
//!   leaderboard (an array) and game state (an object) share one shape.
//! - Field extraction mirrors the protocol names (`fromColumn`, `sessionId`).
//! - Column indices are kept signed here; range checks belong to the board,
//!   where an out-of-range index is a rejected move rather than a bad frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::board::{GameStateView, LevelComplete};
use crate::services::leaderboard::LeaderboardEntry;

// =============================================================================
// TYPE CONSTANTS
// =============================================================================

pub const TYPE_JOIN: &str = "join";
pub const TYPE_MOVE: &str = "move";
pub const TYPE_NEXT_LEVEL: &str = "nextLevel";
pub const TYPE_RESTART: &str = "restart";
pub const TYPE_UPDATE_NAME: &str = "updateName";
pub const TYPE_GET_STATE: &str = "getState";
pub const TYPE_SELECT_COLUMN: &str = "selectColumn";

pub const TYPE_GAME_STATE: &str = "gameState";
pub const TYPE_LEVEL_COMPLETE: &str = "levelComplete";
pub const TYPE_LEADERBOARD: &str = "leaderboard";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Inbound messages after envelope validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Join { session_id: String, name: Option<String> },
    Move { from: i64, to: i64 },
    NextLevel,
    Restart,
    UpdateName { name: String },
    GetState,
    SelectColumn { column: Option<i64> },
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("{kind}: missing or invalid field `{field}`")]
    MissingField { kind: &'static str, field: &'static str },
}

// =============================================================================
// PARSING
// =============================================================================

impl Envelope {
    /// Parse a raw text frame into an envelope.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Interpret the envelope as a client message.
    pub fn to_client_message(&self) -> Result<ClientMessage, FrameError> {
        match self.kind.as_str() {
            TYPE_JOIN => Ok(ClientMessage::Join {
                session_id: self.required_str(TYPE_JOIN, "sessionId")?.to_owned(),
                name: self.optional_str("name").map(ToOwned::to_owned),
            }),
            TYPE_MOVE => Ok(ClientMessage::Move {
                from: self.required_i64(TYPE_MOVE, "fromColumn")?,
                to: self.required_i64(TYPE_MOVE, "toColumn")?,
            }),
            TYPE_NEXT_LEVEL => Ok(ClientMessage::NextLevel),
            TYPE_RESTART => Ok(ClientMessage::Restart),
            TYPE_UPDATE_NAME => Ok(ClientMessage::UpdateName {
                name: self.required_str(TYPE_UPDATE_NAME, "name")?.to_owned(),
            }),
            TYPE_GET_STATE => Ok(ClientMessage::GetState),
            TYPE_SELECT_COLUMN => match self.data.get("column") {
                None | Some(Value::Null) => Ok(ClientMessage::SelectColumn { column: None }),
                Some(v) => v
                    .as_i64()
                    .map(|column| ClientMessage::SelectColumn { column: Some(column) })
                    .ok_or(FrameError::MissingField { kind: TYPE_SELECT_COLUMN, field: "column" }),
            },
            other => Err(FrameError::UnknownType(other.to_owned())),
        }
    }

    fn optional_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    fn required_str(&self, kind: &'static str, field: &'static str) -> Result<&str, FrameError> {
        self.optional_str(field)
            .ok_or(FrameError::MissingField { kind, field })
    }

    fn required_i64(&self, kind: &'static str, field: &'static str) -> Result<i64, FrameError> {
        self.data
            .get(field)
            .and_then(Value::as_i64)
            .ok_or(FrameError::MissingField { kind, field })
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self { kind: kind.into(), data }
    }

    #[must_use]
    pub fn game_state(view: &GameStateView) -> Self {
        Self::new(TYPE_GAME_STATE, serde_json::to_value(view).unwrap_or_default())
    }

    #[must_use]
    pub fn level_complete(summary: &LevelComplete) -> Self {
        Self::new(TYPE_LEVEL_COMPLETE, serde_json::to_value(summary).unwrap_or_default())
    }

    #[must_use]
    pub fn leaderboard(entries: &[LeaderboardEntry]) -> Self {
        Self::new(TYPE_LEADERBOARD, serde_json::to_value(entries).unwrap_or_default())
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
