use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("session:register", Data::new());
    assert_eq!(frame.syscall, "session:register");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request("canvas:action", Data::new()).with_from("alice");
    let done = req.done_with(Data::new());

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.syscall, "canvas:action");
    assert_eq!(done.status, Status::Done);
}

#[test]
fn done_is_terminal() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(!Status::Request.is_terminal());
}

#[test]
fn prefix_extraction() {
    let frame = Frame::request("canvas:undo", Data::new());
    assert_eq!(frame.prefix(), "canvas");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
}

#[test]
fn json_round_trip() {
    let original = Frame::request("session:register", Data::new())
        .with_from("alice")
        .with_data("name", "alice");

    let json = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.syscall, "session:register");
    assert_eq!(restored.from.as_deref(), Some("alice"));
    assert_eq!(restored.data.get("name").and_then(|v| v.as_str()), Some("alice"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("name is taken")]
    struct NameTaken;

    impl ErrorCode for NameTaken {
        fn error_code(&self) -> &'static str {
            "E_NAME_TAKEN"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    let req = Frame::request("session:register", Data::new());
    let err = req.error_from(&NameTaken);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_NAME_TAKEN"));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("name is taken"));
    assert_eq!(
        err.data
            .get("retryable")
            .and_then(serde_json::Value::as_bool),
        Some(true)
    );
}

#[test]
fn plain_error_carries_message() {
    let req = Frame::request("chat:send", Data::new());
    let err = req.error("text required");

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.parent_id, Some(req.id));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("text required"));
}
