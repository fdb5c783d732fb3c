use super::*;
use crate::board::{Board, MoveRule};
use serde_json::json;

fn parse(text: &str) -> Result<ClientMessage, FrameError> {
    Envelope::parse(text)?.to_client_message()
}

#[test]
fn join_with_and_without_name() {
    let msg = parse(r#"{"type":"join","data":{"sessionId":"abcdefghij","name":"Ann"}}"#).unwrap();
    assert_eq!(msg, ClientMessage::Join { session_id: "abcdefghij".into(), name: Some("Ann".into()) });

    let msg = parse(r#"{"type":"join","data":{"sessionId":"abcdefghij"}}"#).unwrap();
    assert_eq!(msg, ClientMessage::Join { session_id: "abcdefghij".into(), name: None });
}

#[test]
fn join_without_session_id_is_missing_field() {
    let err = parse(r#"{"type":"join","data":{"name":"Ann"}}"#).unwrap_err();
    assert!(matches!(err, FrameError::MissingField { kind: "join", field: "sessionId" }));
}

#[test]
fn move_keeps_negative_indices() {
    let msg = parse(r#"{"type":"move","data":{"fromColumn":-1,"toColumn":2}}"#).unwrap();
    assert_eq!(msg, ClientMessage::Move { from: -1, to: 2 });
}

#[test]
fn move_with_string_index_is_rejected() {
    let err = parse(r#"{"type":"move","data":{"fromColumn":"1","toColumn":2}}"#).unwrap_err();
    assert!(matches!(err, FrameError::MissingField { field: "fromColumn", .. }));
}

#[test]
fn empty_payload_messages_parse_without_data() {
    assert_eq!(parse(r#"{"type":"nextLevel","data":{}}"#).unwrap(), ClientMessage::NextLevel);
    assert_eq!(parse(r#"{"type":"restart"}"#).unwrap(), ClientMessage::Restart);
    assert_eq!(parse(r#"{"type":"getState","data":{}}"#).unwrap(), ClientMessage::GetState);
}

#[test]
fn select_column_accepts_null_and_int() {
    assert_eq!(
        parse(r#"{"type":"selectColumn","data":{"column":null}}"#).unwrap(),
        ClientMessage::SelectColumn { column: None }
    );
    assert_eq!(
        parse(r#"{"type":"selectColumn","data":{"column":3}}"#).unwrap(),
        ClientMessage::SelectColumn { column: Some(3) }
    );
    assert!(parse(r#"{"type":"selectColumn","data":{"column":"x"}}"#).is_err());
}

#[test]
fn unknown_type_and_bad_json() {
    assert!(matches!(parse(r#"{"type":"cheat","data":{}}"#), Err(FrameError::UnknownType(t)) if t == "cheat"));
    assert!(matches!(parse("not json"), Err(FrameError::InvalidJson(_))));
    assert!(matches!(parse(r#"{"data":{}}"#), Err(FrameError::InvalidJson(_))));
}

#[test]
fn game_state_envelope_shape() {
    let board = Board::new(1, MoveRule::Any);
    let env = Envelope::game_state(&board.view());
    let json: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "gameState");
    assert_eq!(json["data"]["level"], 1);
    assert_eq!(json["data"]["columns"].as_array().map(Vec::len), Some(4));
}

#[test]
fn leaderboard_envelope_is_array() {
    let entry = LeaderboardEntry::new("abcdefghij", 10, 2, "Ann");
    let env = Envelope::leaderboard(&[entry]);
    assert_eq!(env.kind, TYPE_LEADERBOARD);
    assert_eq!(env.data, json!([{"sessionId": "abcdefghij", "score": 10, "level": 2, "name": "Ann"}]));
}
