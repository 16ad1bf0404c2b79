//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the one live room behind a single mutex. Every state-changing
//! operation acquires that mutex, mutates, and fans out to members before
//! releasing it — that single ordering point is what makes the event
//! sequence observed by every member identical.
//!
//! `RoomState` itself is plain data: the action log, the per-user redo
//! ledger, and the membership registry, with the invariant-preserving
//! operations the services are built from. Nothing in here sends frames.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::action::{CanvasAction, StrokeId};
use crate::frame::Frame;

/// Outgoing frame channel for one connected client. Bounded so a stalled
/// client can never block the room lock.
pub type ClientHandle = mpsc::Sender<Frame>;

/// Capacity of each member's outgoing channel.
pub const CLIENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// An admitted member of the room.
pub struct Member {
    pub name: String,
    pub tx: ClientHandle,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// All mutable room state: log, redo ledger, and membership registry.
pub struct RoomState {
    /// Username of the first registered member. Never changes once set.
    pub admin: Option<String>,
    /// Admitted members in join order. Join order is also the order
    /// reported by the user list. Names are unique.
    pub members: Vec<Member>,
    /// Join requests awaiting an admin decision, keyed by requested name.
    /// Disjoint from `members`.
    pub pending: HashMap<String, ClientHandle>,
    /// Ordered drawing history. Insertion order is render order.
    pub history: Vec<CanvasAction>,
    /// Per-user stacks of undone stroke groups, created lazily on first
    /// undo. Stack top is the last element.
    pub redo: HashMap<String, Vec<Vec<CanvasAction>>>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            admin: None,
            members: Vec::new(),
            pending: HashMap::new(),
            history: Vec::new(),
            redo: HashMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Membership registry
    // -------------------------------------------------------------------------

    /// A name is taken while it is active or awaiting approval.
    #[must_use]
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.member(name).is_some() || self.pending.contains_key(name)
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn is_admin(&self, name: &str) -> bool {
        self.admin.as_deref() == Some(name)
    }

    /// Add an active member at the end of the join order.
    pub fn insert_member(&mut self, name: impl Into<String>, tx: ClientHandle) {
        self.members.push(Member { name: name.into(), tx });
    }

    /// Remove an active member. Returns false if the name was not active.
    pub fn remove_member(&mut self, name: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.name != name);
        self.members.len() != before
    }

    /// Active usernames in join order.
    #[must_use]
    pub fn user_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    // -------------------------------------------------------------------------
    // Action log
    // -------------------------------------------------------------------------

    /// Independent copy of the full history, safe to hand to callers.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CanvasAction> {
        self.history.clone()
    }

    /// Stroke id of the owner's most recent action still in the log.
    #[must_use]
    pub fn last_stroke_of(&self, owner: &str) -> Option<StrokeId> {
        self.history
            .iter()
            .rev()
            .find(|action| action.owner == owner)
            .map(|action| action.stroke_id)
    }

    /// Remove every action of the stroke group `(owner, stroke_id)`,
    /// preserving the relative order of the remaining actions. Returns the
    /// removed actions in their original order.
    pub fn remove_stroke(&mut self, owner: &str, stroke_id: StrokeId) -> Vec<CanvasAction> {
        let mut removed = Vec::new();
        self.history.retain(|action| {
            if action.in_group(owner, stroke_id) {
                removed.push(action.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    // -------------------------------------------------------------------------
    // Redo ledger
    // -------------------------------------------------------------------------

    /// Push an undone stroke group onto the owner's redo stack, creating the
    /// stack on first use.
    pub fn push_redo(&mut self, owner: impl Into<String>, group: Vec<CanvasAction>) {
        self.redo.entry(owner.into()).or_default().push(group);
    }

    /// Pop the owner's most recently undone stroke group, if any.
    pub fn pop_redo(&mut self, owner: &str) -> Option<Vec<CanvasAction>> {
        self.redo.get_mut(owner).and_then(Vec::pop)
    }

    /// Drop the owner's redo stack. A new action makes any forward history
    /// unreachable.
    pub fn clear_redo_for(&mut self, owner: &str) {
        self.redo.remove(owner);
    }

    /// Drop every user's redo stack. Used when the whole board is cleared
    /// or reloaded.
    pub fn clear_ledgers(&mut self) {
        self.redo.clear();
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    /// The single serialization point for every room operation.
    pub room: Arc<Mutex<RoomState>>,
    /// Signals the serve loop to stop once the board has been closed.
    pub shutdown: mpsc::Sender<()>,
}

impl AppState {
    #[must_use]
    pub fn new(shutdown: mpsc::Sender<()>) -> Self {
        Self { room: Arc::new(Mutex::new(RoomState::new())), shutdown }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::action::{Point, Shape};

    /// Create a test `AppState` plus the receiving end of its shutdown
    /// channel.
    #[must_use]
    pub fn test_app_state() -> (AppState, mpsc::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (AppState::new(shutdown_tx), shutdown_rx)
    }

    /// A bounded member channel sized like production connections.
    #[must_use]
    pub fn member_channel() -> (ClientHandle, mpsc::Receiver<Frame>) {
        mpsc::channel(CLIENT_CHANNEL_CAPACITY)
    }

    /// A one-shape action (rectangle) for log tests.
    #[must_use]
    pub fn rect_action(owner: &str, stroke_id: StrokeId) -> CanvasAction {
        CanvasAction {
            stroke_id,
            owner: owner.into(),
            color: "#1F1A17".into(),
            stroke_width: 2.0,
            shape: Shape::Rectangle {
                from: Point { x: 0.0, y: 0.0 },
                to: Point { x: 10.0, y: 10.0 },
            },
        }
    }

    /// One free-draw segment-action of a multi-segment gesture.
    #[must_use]
    pub fn segment_action(owner: &str, stroke_id: StrokeId, seq: u32) -> CanvasAction {
        let start = f64::from(seq);
        CanvasAction {
            stroke_id,
            owner: owner.into(),
            color: "#D94B4B".into(),
            stroke_width: 1.0,
            shape: Shape::FreeDraw {
                points: vec![
                    Point { x: start, y: start },
                    Point { x: start + 1.0, y: start + 1.0 },
                ],
            },
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
