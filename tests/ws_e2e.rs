//! End-to-end protocol checks over a real websocket.

use std::time::Duration;

use ballsort::config::GameConfig;
use ballsort::routes;
use ballsort::state::AppState;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ID_A: &str = "e2ealpha12345";
const ID_B: &str = "e2ebravo67890";

async fn spawn_server() -> std::net::SocketAddr {
    let state = AppState::new(GameConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, routes::app(state))
            .await
            .expect("server failed");
    });
    addr
}

async fn connect(addr: std::net::SocketAddr) -> Client {
    let (stream, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket connect");
    stream
}

async fn send(client: &mut Client, kind: &str, data: Value) {
    let text = json!({ "type": kind, "data": data }).to_string();
    client
        .send(Message::Text(text.into()))
        .await
        .expect("send frame");
}

/// Wait for the next envelope of `kind`, skipping anything else.
async fn recv_kind(client: &mut Client, kind: &str) -> Value {
    let fut = async {
        loop {
            let message = client
                .next()
                .await
                .expect("stream ended")
                .expect("websocket error");
            let Message::Text(text) = message else {
                continue;
            };
            let envelope: Value = serde_json::from_str(&text).expect("server sent invalid json");
            if envelope["type"] == kind {
                return envelope["data"].clone();
            }
        }
    };
    timeout(Duration::from_secs(2), fut)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {kind}"))
}

#[tokio::test]
async fn join_move_and_reconnect_resume_progress() {
    let addr = spawn_server().await;

    let mut first = connect(addr).await;
    send(&mut first, "join", json!({ "sessionId": ID_A, "name": "Ann" })).await;
    let joined = recv_kind(&mut first, "gameState").await;
    assert_eq!(joined["level"], 1);
    assert_eq!(joined["columns"].as_array().map(Vec::len), Some(4));

    send(&mut first, "move", json!({ "fromColumn": 0, "toColumn": 3 })).await;
    let moved = recv_kind(&mut first, "gameState").await;
    assert_eq!(moved["moves"], 1);
    first.close(None).await.expect("close");

    let mut second = connect(addr).await;
    send(&mut second, "join", json!({ "sessionId": ID_A })).await;
    let resumed = recv_kind(&mut second, "gameState").await;
    assert_eq!(resumed["moves"], 1);
    assert_eq!(resumed["level"], moved["level"]);
    assert_eq!(resumed["columns"], moved["columns"]);
}

#[tokio::test]
async fn invalid_session_id_closes_with_policy_code() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;
    send(&mut client, "join", json!({ "sessionId": "NOT-VALID" })).await;

    let message = timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for close")
        .expect("stream ended")
        .expect("websocket error");
    let Message::Close(Some(frame)) = message else {
        panic!("expected close frame, got {message:?}");
    };
    assert_eq!(frame.code, CloseCode::Policy);
}

#[tokio::test]
async fn join_broadcasts_leaderboard_to_other_sockets() {
    let addr = spawn_server().await;

    let mut a = connect(addr).await;
    send(&mut a, "join", json!({ "sessionId": ID_A })).await;
    recv_kind(&mut a, "gameState").await;
    recv_kind(&mut a, "leaderboard").await;

    let mut b = connect(addr).await;
    send(&mut b, "join", json!({ "sessionId": ID_B })).await;
    recv_kind(&mut b, "gameState").await;

    let board = recv_kind(&mut a, "leaderboard").await;
    assert!(board.as_array().is_some_and(|entries| entries.len() <= 5));
}

#[tokio::test]
async fn garbage_before_join_keeps_socket_open() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    client
        .send(Message::Text("{{{".into()))
        .await
        .expect("send garbage");
    send(&mut client, "getState", json!({})).await;
    send(&mut client, "join", json!({ "sessionId": ID_B })).await;

    let state = recv_kind(&mut client, "gameState").await;
    assert_eq!(state["level"], 1);
}

#[tokio::test]
async fn healthz_responds_ok() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("tcp connect");
    stream
        .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("write request");

    let mut response = Vec::new();
    timeout(Duration::from_secs(2), stream.read_to_end(&mut response))
        .await
        .expect("timed out reading response")
        .expect("read response");
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
}
