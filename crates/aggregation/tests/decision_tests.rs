use aggregation::Decision;
use serde_json::json;

#[test]
fn payload_excludes_id_and_roundtrips() {
    let decision = Decision {
        id: "1234".to_string(),
        latitude: json!(52.52),
        longitude: json!(13.40),
        cn: "DE".to_string(),
        timestamp: "2026-08-04T12:00:00+02:00".to_string(),
    };
    let payload = decision.payload_json().expect("serialize");
    assert!(!payload.contains("\"id\""));

    let restored = Decision::from_payload("1234", &payload).expect("parse");
    assert_eq!(restored, decision);
}

#[test]
fn garbage_coordinates_are_preserved_verbatim() {
    let payload = r#"{"latitude":"nonsense","cn":"US","timestamp":"2026-08-04T12:00:00+02:00"}"#;
    let decision = Decision::from_payload("x", payload).expect("parse");
    assert_eq!(decision.latitude, json!("nonsense"));
    assert_eq!(decision.longitude, serde_json::Value::Null);
}

#[test]
fn history_member_roundtrips() {
    let decision = Decision {
        id: "77".to_string(),
        latitude: json!(1.0),
        longitude: json!(2.0),
        cn: "FR".to_string(),
        timestamp: "2026-08-04T12:00:00+02:00".to_string(),
    };
    let payload = decision.payload_json().expect("serialize");
    let member = decision.history_member(&payload);
    let restored = Decision::from_history_member(&member).expect("parse");
    assert_eq!(restored, decision);
}

#[test]
fn corrupt_history_members_are_rejected() {
    assert!(Decision::from_history_member("no-separator").is_none());
    assert!(Decision::from_history_member("id:not-json").is_none());
}
