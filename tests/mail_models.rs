//! Mail Model Tests
//!
//! Typed load/dump of the mail schemas shipped with the crate.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use apimodel::engine::Engine;
use apimodel::mail::{self, Message, MessagePart};
use apimodel::schema::{wire_map_from_json, ApiModel, ErrorKind, Value, WireMap};

fn wire(value: serde_json::Value) -> WireMap {
    match value {
        serde_json::Value::Object(map) => wire_map_from_json(map),
        other => panic!("fixture must be an object, got {}", other),
    }
}

fn engine() -> Engine {
    let engine = Engine::default();
    mail::register(&engine).unwrap();
    engine
}

fn created() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(18, 30, 0)
        .unwrap()
}

fn part_json(id: i64, body: &str) -> serde_json::Value {
    json!({
        "id": id,
        "part_type": "text/plain",
        "is_attachment": 0,
        "file_name": "",
        "charset": "utf-8",
        "body": body,
        "size": body.len(),
        "created": "2024/03/09 18:30:00"
    })
}

fn message_json() -> serde_json::Value {
    json!({
        "id": 7,
        "from": "alice@example.com",
        "preview": "Hi Bob",
        "subject": "Lunch",
        "date": "2024/03/09 18:30:00",
        "size": 2048,
        "recipients": {"to": ["bob@example.com"], "cc": []},
        "parts": [part_json(1, "Hi Bob"), part_json(2, "<p>Hi Bob</p>")]
    })
}

// =============================================================================
// TYPED ROUND-TRIP
// =============================================================================

/// Test: A full message loads into typed structs.
#[test]
fn test_load_typed_message() {
    let engine = engine();
    let message: Message = engine.load_model(&wire(message_json())).unwrap();

    assert_eq!(message.id, 7);
    assert_eq!(message.from_, "alice@example.com");
    assert_eq!(message.date, created());
    assert_eq!(message.parts.len(), 2);
    assert_eq!(message.parts[0].body, "Hi Bob");
    assert_eq!(message.parts[1].body, "<p>Hi Bob</p>");
    assert_eq!(message.parts[1].created, created());
    assert_eq!(
        message.recipients.get("to"),
        Some(&Value::List(vec![Value::from("bob@example.com")]))
    );
}

/// Test: Dumping a typed message reproduces the payload.
#[test]
fn test_typed_roundtrip() {
    let engine = engine();
    let message: Message = engine.load_model(&wire(message_json())).unwrap();
    let dumped = engine.dump_model(&message).unwrap();
    assert_eq!(dumped, wire(message_json()));

    let reloaded: Message = engine.load_model(&dumped).unwrap();
    assert_eq!(reloaded, message);
}

/// Test: Typed parts dump on their own.
#[test]
fn test_part_dump() {
    let engine = engine();
    let part = MessagePart {
        id: 9,
        part_type: "application/pdf".into(),
        is_attachment: 1,
        file_name: "invoice.pdf".into(),
        charset: "".into(),
        body: "".into(),
        size: 0,
        created: created(),
    };
    let dumped = engine.dump_model(&part).unwrap();
    assert_eq!(dumped.get("file_name"), Some(&Value::from("invoice.pdf")));
    assert_eq!(dumped.get("created"), Some(&Value::from("2024/03/09 18:30:00")));
    assert_eq!(engine.load_model::<MessagePart>(&dumped).unwrap(), part);
}

// =============================================================================
// REJECTIONS
// =============================================================================

/// Test: An invalid part deep in the list is reported with its path.
#[test]
fn test_invalid_part_path() {
    let engine = engine();
    let mut payload = message_json();
    payload["parts"][1]["is_attachment"] = json!(5);

    let err = engine.load_model::<Message>(&wire(payload)).unwrap_err();
    assert_eq!(err.path_string(), "parts[1]");
    match err.kind() {
        ErrorKind::InvalidProperty { model, property, constraint, .. } => {
            assert_eq!(model, MessagePart::NAME);
            assert_eq!(property, "is_attachment");
            assert_eq!(constraint, "in set {0, 1}");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Test: A bad timestamp in a part names the part's property, not a deeper path.
#[test]
fn test_bad_part_timestamp() {
    let engine = engine();
    let mut payload = message_json();
    payload["parts"][1]["created"] = json!("09.03.2024");

    let err = engine.load_json(Message::NAME, &payload).unwrap_err();
    assert_eq!(err.code(), "APIMODEL_FORMAT");
    assert_eq!(err.path_string(), "parts[1]");
    match err.kind() {
        ErrorKind::Format { model, property, .. } => {
            assert_eq!(model, MessagePart::NAME);
            assert_eq!(property, "created");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Test: An empty sender violates the not-empty constraint.
#[test]
fn test_empty_sender_rejected() {
    let engine = engine();
    let mut payload = message_json();
    payload["from"] = json!("");
    let err = engine.load_json(Message::NAME, &payload).unwrap_err();
    assert_eq!(err.kind().property(), Some("from"));
    assert_eq!(err.code(), "APIMODEL_INVALID_PROPERTY");
}

/// Test: A negative size is rejected on dump as well as load.
#[test]
fn test_negative_size_rejected_on_dump() {
    let engine = engine();
    let mut message: Message = engine.load_model(&wire(message_json())).unwrap();
    message.size = -1;
    let err = engine.dump_model(&message).unwrap_err();
    assert_eq!(err.kind().property(), Some("size"));
}

/// Test: Parts must be a list of maps.
#[test]
fn test_parts_must_be_list() {
    let engine = engine();
    let mut payload = message_json();
    payload["parts"] = json!({"id": 1});
    let err = engine.load_json(Message::NAME, &payload).unwrap_err();
    match err.kind() {
        ErrorKind::InvalidProperty { model, property, constraint, .. } => {
            assert_eq!(model, Message::NAME);
            assert_eq!(property, "parts");
            assert_eq!(constraint, "type list");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
