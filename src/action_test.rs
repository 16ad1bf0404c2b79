use super::*;

fn point(x: f64, y: f64) -> Point {
    Point { x, y }
}

#[test]
fn shape_serde_round_trip() {
    let shapes = vec![
        Shape::Line { from: point(0.0, 0.0), to: point(10.0, 10.0) },
        Shape::Triangle { from: point(1.0, 1.0), to: point(5.0, 9.0) },
        Shape::Rectangle { from: point(2.0, 2.0), to: point(8.0, 4.0) },
        Shape::Oval { from: point(0.0, 0.0), to: point(6.0, 3.0) },
        Shape::Text { from: point(1.0, 1.0), to: point(90.0, 20.0), content: "hello".into() },
        Shape::FreeDraw { points: vec![point(0.0, 0.0), point(1.0, 1.0)] },
        Shape::Eraser { points: vec![point(4.0, 4.0)] },
    ];

    for shape in shapes {
        let json = serde_json::to_string(&shape).expect("serialize shape");
        let restored: Shape = serde_json::from_str(&json).expect("deserialize shape");
        assert_eq!(restored, shape);
    }
}

#[test]
fn shape_tag_is_snake_case() {
    let shape = Shape::FreeDraw { points: vec![point(0.0, 0.0)] };
    let json = serde_json::to_value(&shape).expect("serialize shape");
    assert_eq!(json.get("kind").and_then(|v| v.as_str()), Some("free_draw"));
}

#[test]
fn action_serde_round_trip() {
    let action = CanvasAction {
        stroke_id: 7,
        owner: "alice".into(),
        color: "#1F1A17".into(),
        stroke_width: 2.5,
        shape: Shape::Rectangle { from: point(0.0, 0.0), to: point(4.0, 4.0) },
    };

    let json = serde_json::to_string(&action).expect("serialize action");
    let restored: CanvasAction = serde_json::from_str(&json).expect("deserialize action");
    assert_eq!(restored, action);
}

#[test]
fn validate_rejects_empty_path() {
    let action = CanvasAction {
        stroke_id: 1,
        owner: "alice".into(),
        color: "#000000".into(),
        stroke_width: 1.0,
        shape: Shape::FreeDraw { points: vec![] },
    };
    assert!(matches!(action.validate(), Err(ActionError::EmptyPath)));

    let action = CanvasAction { shape: Shape::Eraser { points: vec![] }, ..action };
    assert!(matches!(action.validate(), Err(ActionError::EmptyPath)));
}

#[test]
fn validate_accepts_single_point_path() {
    let action = CanvasAction {
        stroke_id: 1,
        owner: "alice".into(),
        color: "#000000".into(),
        stroke_width: 1.0,
        shape: Shape::FreeDraw { points: vec![point(3.0, 3.0)] },
    };
    assert!(action.validate().is_ok());
}

#[test]
fn in_group_matches_owner_and_stroke() {
    let action = CanvasAction {
        stroke_id: 3,
        owner: "bob".into(),
        color: "#22c55e".into(),
        stroke_width: 1.0,
        shape: Shape::Line { from: point(0.0, 0.0), to: point(1.0, 1.0) },
    };

    assert!(action.in_group("bob", 3));
    assert!(!action.in_group("bob", 4));
    assert!(!action.in_group("alice", 3));
}
