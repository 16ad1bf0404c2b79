//! Drawing actions: the immutable records that make up the room history.
//!
//! An action describes one drawing operation as it travels over the wire and
//! as it is stored in the room log. Actions are never edited in place — undo
//! and redo remove and re-add whole actions. Free-draw and eraser gestures
//! produce one action per drag segment, all sharing a `stroke_id`, so a
//! gesture can be undone atomically.

use serde::{Deserialize, Serialize};

/// Identifier shared by every segment-action of one drawing gesture,
/// unique per owner.
pub type StrokeId = u64;

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Geometry of a drawing action. Each variant carries only the fields it
/// needs: two-endpoint shapes never have a point path, path shapes never
/// have endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Straight line segment.
    Line { from: Point, to: Point },
    /// Isosceles triangle spanned by a bounding box.
    Triangle { from: Point, to: Point },
    /// Axis-aligned rectangle.
    Rectangle { from: Point, to: Point },
    /// Ellipse inscribed within the bounding box.
    Oval { from: Point, to: Point },
    /// Text placed inside the bounding box.
    Text { from: Point, to: Point, content: String },
    /// Freehand path, one action per drag segment. At least one point.
    FreeDraw { points: Vec<Point> },
    /// Eraser path, rendered in the background color. At least one point.
    Eraser { points: Vec<Point> },
}

/// One immutable drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasAction {
    /// Groups segment-actions of one gesture into an undoable unit.
    pub stroke_id: StrokeId,
    /// Username of the member who drew it.
    pub owner: String,
    /// Stroke color as a CSS hex string.
    pub color: String,
    /// Stroke width in canvas units.
    pub stroke_width: f64,
    /// What was drawn.
    pub shape: Shape,
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("path shape must contain at least one point")]
    EmptyPath,
}

impl crate::frame::ErrorCode for ActionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyPath => "E_EMPTY_PATH",
        }
    }
}

impl CanvasAction {
    /// Check the geometry invariants an action must satisfy before it may
    /// enter the log.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::EmptyPath` if a free-draw or eraser action
    /// carries no points.
    pub fn validate(&self) -> Result<(), ActionError> {
        match &self.shape {
            Shape::FreeDraw { points } | Shape::Eraser { points } if points.is_empty() => {
                Err(ActionError::EmptyPath)
            }
            _ => Ok(()),
        }
    }

    /// Whether this action belongs to the stroke group `(owner, stroke_id)`.
    #[must_use]
    pub fn in_group(&self, owner: &str, stroke_id: StrokeId) -> bool {
        self.owner == owner && self.stroke_id == stroke_id
    }
}

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;
