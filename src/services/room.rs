//! Room-wide concerns: observer fan-out, chat relay, and board lifecycle.
//!
//! DESIGN
//! ======
//! Fan-out is non-blocking: every member has a bounded outgoing channel and
//! delivery uses `try_send`, so one slow or dead client can never stall the
//! room lock. Per-recipient failures are logged and swallowed — the call
//! that triggered the delivery still succeeds for everyone else.
//!
//! `broadcast` is only ever called while the room lock is held. Together
//! with FIFO member channels that gives every member the same view of the
//! operation order.

use std::time::Duration;

use tracing::{debug, info};

use crate::action::CanvasAction;
use crate::frame::{Data, Frame};
use crate::state::{AppState, ClientHandle, RoomState};

/// Delay between the closed notice and process shutdown, so final
/// deliveries can flush.
const CLOSE_GRACE: Duration = Duration::from_millis(200);

// =============================================================================
// FAN-OUT
// =============================================================================

/// Deliver a frame to a single client handle. Best-effort: a full or closed
/// channel drops the frame for that recipient only.
pub(crate) fn deliver(name: &str, tx: &ClientHandle, frame: &Frame) {
    if let Err(e) = tx.try_send(frame.clone()) {
        debug!(user = %name, syscall = %frame.syscall, error = %e, "dropping frame for unreachable client");
    }
}

/// Broadcast a frame to every active member.
pub(crate) fn broadcast(room: &RoomState, frame: &Frame) {
    for member in &room.members {
        deliver(&member.name, &member.tx, frame);
    }
}

// =============================================================================
// EVENT BUILDERS
// =============================================================================

/// User-list event reflecting the current membership, in join order.
pub(crate) fn user_list_event(room: &RoomState) -> Frame {
    Frame::request("session:users", Data::new())
        .with_data("users", serde_json::json!(room.user_names()))
}

/// Full-history replace event. Used whenever a non-local edit (undo, clear,
/// load) invalidates incremental diffing.
pub(crate) fn full_history_event(room: &RoomState) -> Frame {
    Frame::request("canvas:history", Data::new())
        .with_data("actions", serde_json::to_value(room.snapshot()).unwrap_or_default())
}

/// Incremental single-action event.
pub(crate) fn action_event(action: &CanvasAction) -> Frame {
    Frame::request("canvas:action", Data::new())
        .with_from(action.owner.clone())
        .with_data("action", serde_json::to_value(action).unwrap_or_default())
}

// =============================================================================
// CHAT
// =============================================================================

/// Relay a chat message to every active member, the sender included.
/// Messages are not stored; a silent no-op if the sender is not a member.
pub async fn send_chat(state: &AppState, sender: &str, text: &str) {
    let room = state.room.lock().await;
    if room.member(sender).is_none() {
        debug!(%sender, "dropping chat from non-member");
        return;
    }

    let frame = Frame::request("chat:message", Data::new())
        .with_from(sender)
        .with_data("sender", sender)
        .with_data("text", text);
    broadcast(&room, &frame);
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Close the board for good: notify every member, then signal the serve
/// loop to stop after a short grace period. There is no reopen.
pub async fn close_board(state: &AppState) {
    {
        let room = state.room.lock().await;
        broadcast(&room, &Frame::request("room:closed", Data::new()));
    }
    info!("room closed, scheduling shutdown");

    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(CLOSE_GRACE).await;
        let _ = shutdown.send(()).await;
    });
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
