//! WebSocket handler: per-connection game protocol.
//!
//! DESIGN
//! ======
//! On upgrade, registers a broadcast channel and enters a `select!` loop:
//! - Incoming client frames → limit checks → parse → dispatch by type
//! - Leaderboard broadcasts from other connections → forward to client
//!
//! Handler functions are pure business logic: they resolve the session,
//! mutate its board under the session lock, and return an `Outcome`. The
//! dispatch layer owns all outbound concerns: replies to the sender, the
//! leaderboard broadcast, and policy closes.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → connection is Unjoined; only `join` is honored
//! 2. `join` → bound to a session, reply `gameState`, broadcast leaderboard
//! 3. Game messages → handler returns Outcome → dispatch applies it
//! 4. Close → unregister channel; the session lives on until swept
//!
//! ERROR HANDLING
//! ==============
//! Rate-limited, oversized, malformed and pre-join frames are dropped with
//! no reply. A bad session id closes with 1008. A panic inside one message
//! is caught at the dispatch boundary and logged; the socket stays open.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::response::Response;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::board::Board;
use crate::frame::{ClientMessage, Envelope};
use crate::services::leaderboard;
use crate::services::session::{SessionHandle, sanitize_display_name};
use crate::state::{AppState, CLIENT_CHANNEL_CAPACITY};

pub const CLOSE_REASON_INVALID_SESSION: &str = "invalid session id";

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// Drop the message without a reply.
    Ignore,
    /// Send frames to the sender, optionally pushing the leaderboard to all.
    Reply { frames: Vec<Envelope>, broadcast_leaderboard: bool },
    /// Close the socket with a policy-violation code.
    Close(&'static str),
}

impl Outcome {
    fn state(board: &Board) -> Self {
        Self::Reply { frames: vec![Envelope::game_state(&board.view())], broadcast_leaderboard: false }
    }
}

// =============================================================================
// CONNECTION STATE
// =============================================================================

/// Per-socket protocol state. `session == None` is the Unjoined state.
pub(crate) struct Connection {
    pub(crate) client_id: Uuid,
    session: Option<BoundSession>,
}

struct BoundSession {
    session_id: String,
    /// Last known name, used if the session is evicted while connected.
    display_name: String,
}

impl Connection {
    pub(crate) fn new(client_id: Uuid) -> Self {
        Self { client_id, session: None }
    }

    pub(crate) fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION LOOP
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for leaderboard broadcasts.
    let (client_tx, mut client_rx) = mpsc::channel::<Envelope>(CLIENT_CHANNEL_CAPACITY);
    state.register_client(client_id, client_tx).await;
    info!(%client_id, "ws: client connected");

    let mut conn = Connection::new(client_id);

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        if dispatch_frame(&state, &mut socket, &mut conn, &text).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    state.unregister_client(client_id).await;
    info!(%client_id, session_id = conn.session_id().unwrap_or("-"), "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Process one inbound frame and apply its outcome. `Err` ends the connection.
async fn dispatch_frame(
    state: &AppState,
    socket: &mut WebSocket,
    conn: &mut Connection,
    text: &str,
) -> Result<(), ()> {
    let client_id = conn.client_id;
    let Some(outcome) = guard_frame(client_id, process_inbound_text(state, conn, text)).await else {
        return Ok(());
    };

    match outcome {
        Outcome::Ignore => Ok(()),
        Outcome::Reply { frames, broadcast_leaderboard } => {
            for frame in &frames {
                send_frame(socket, frame).await?;
            }
            if broadcast_leaderboard {
                leaderboard::broadcast_leaderboard(state).await;
            }
            Ok(())
        }
        Outcome::Close(reason) => {
            warn!(%client_id, reason, "ws: closing connection (policy violation)");
            let close = CloseFrame { code: close_code::POLICY, reason: reason.into() };
            let _ = socket.send(Message::Close(Some(close))).await;
            Err(())
        }
    }
}

/// Run one frame's handling behind a panic boundary. `None` means the
/// handler panicked; the frame is dropped and the connection carries on.
pub(crate) async fn guard_frame<F>(client_id: Uuid, handling: F) -> Option<Outcome>
where
    F: Future<Output = Outcome>,
{
    match AssertUnwindSafe(handling).catch_unwind().await {
        Ok(outcome) => Some(outcome),
        Err(_) => {
            error!(%client_id, "ws: panic while handling frame; frame dropped");
            None
        }
    }
}

/// Validate and handle one inbound text frame, returning what to send.
///
/// Transport-free so tests can drive the protocol without a socket.
pub(crate) async fn process_inbound_text(state: &AppState, conn: &mut Connection, text: &str) -> Outcome {
    let client_id = conn.client_id;

    if let Err(e) = state.rate_limiter.check_and_record(client_id) {
        debug!(%client_id, error = %e, "ws: frame dropped");
        return Outcome::Ignore;
    }
    if text.len() > state.config.max_payload_bytes {
        debug!(%client_id, bytes = text.len(), limit = state.config.max_payload_bytes, "ws: oversized frame dropped");
        return Outcome::Ignore;
    }

    let message = match Envelope::parse(text).and_then(|env| env.to_client_message()) {
        Ok(m) => m,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return Outcome::Ignore;
        }
    };

    match message {
        ClientMessage::Join { session_id, name } => handle_join(state, conn, &session_id, name.as_deref()).await,
        other => handle_game(state, conn, other).await,
    }
}

// =============================================================================
// JOIN
// =============================================================================

async fn handle_join(state: &AppState, conn: &mut Connection, session_id: &str, name: Option<&str>) -> Outcome {
    let joined = match state.sessions.join(session_id, name).await {
        Ok(j) => j,
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: join rejected");
            return Outcome::Close(CLOSE_REASON_INVALID_SESSION);
        }
    };

    let session = joined.session.lock().await;
    info!(
        client_id = %conn.client_id,
        session_id,
        created = joined.created,
        level = session.board.level(),
        "ws: joined session"
    );
    conn.session = Some(BoundSession {
        session_id: session.session_id.clone(),
        display_name: session.display_name.clone(),
    });

    Outcome::Reply { frames: vec![Envelope::game_state(&session.board.view())], broadcast_leaderboard: true }
}

/// Look up the bound session, recreating it if it was swept while this
/// socket stayed open.
async fn resolve_session(state: &AppState, conn: &Connection) -> Option<SessionHandle> {
    let bound = conn.session.as_ref()?;
    if let Some(handle) = state.sessions.get(&bound.session_id).await {
        return Some(handle);
    }
    match state
        .sessions
        .join(&bound.session_id, Some(&bound.display_name))
        .await
    {
        Ok(joined) => {
            info!(client_id = %conn.client_id, session_id = %bound.session_id, "ws: session expired while connected; recreated");
            Some(joined.session)
        }
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: could not recreate session");
            None
        }
    }
}

// =============================================================================
// GAME HANDLERS
// =============================================================================

async fn handle_game(state: &AppState, conn: &mut Connection, message: ClientMessage) -> Outcome {
    let Some(handle) = resolve_session(state, conn).await else {
        // Silently ignore everything but join before joining.
        debug!(client_id = %conn.client_id, ?message, "ws: frame before join ignored");
        return Outcome::Ignore;
    };

    let mut session = handle.lock().await;
    session.touch(Instant::now());

    match message {
        ClientMessage::Move { from, to } => {
            let (Ok(from), Ok(to)) = (usize::try_from(from), usize::try_from(to)) else {
                return Outcome::state(&session.board);
            };
            if !session.board.try_move(from, to) {
                debug!(session_id = %session.session_id, from, to, "move rejected");
                return Outcome::state(&session.board);
            }

            let mut frames = Vec::with_capacity(2);
            let mut broadcast_leaderboard = false;
            if let Some(summary) = session.board.complete_level() {
                info!(
                    session_id = %session.session_id,
                    level = summary.level,
                    moves = summary.moves,
                    time = summary.time,
                    level_score = summary.level_score,
                    total_score = summary.total_score,
                    game_reset = summary.game_reset,
                    "level complete"
                );
                broadcast_leaderboard = state.leaderboard.record(
                    &session.session_id,
                    summary.total_score,
                    summary.level,
                    &session.display_name,
                );
                frames.push(Envelope::level_complete(&summary));
            }
            frames.push(Envelope::game_state(&session.board.view()));
            Outcome::Reply { frames, broadcast_leaderboard }
        }
        ClientMessage::NextLevel => {
            if !session.board.next_level() {
                debug!(session_id = %session.session_id, "next level refused: board not complete");
            }
            Outcome::state(&session.board)
        }
        ClientMessage::Restart => {
            session.board.restart();
            Outcome::state(&session.board)
        }
        ClientMessage::UpdateName { name } => {
            let name = sanitize_display_name(&name);
            session.display_name.clone_from(&name);
            let changed = state.leaderboard.rename(&session.session_id, &name);
            if let Some(bound) = conn.session.as_mut() {
                bound.display_name = name;
            }
            Outcome::Reply { frames: Vec::new(), broadcast_leaderboard: changed }
        }
        ClientMessage::GetState => Outcome::state(&session.board),
        ClientMessage::SelectColumn { column } => {
            match column.map(usize::try_from) {
                None => {
                    session.board.select_column(None);
                }
                Some(Ok(index)) => {
                    session.board.select_column(Some(index));
                }
                Some(Err(_)) => {}
            }
            Outcome::state(&session.board)
        }
        ClientMessage::Join { .. } => Outcome::Ignore,
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Envelope) -> Result<(), ()> {
    let json = match frame.to_json() {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    debug!(kind = %frame.kind, "ws: send frame");
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
