//! Action log operations: append, per-user undo/redo, replace, clear.
//!
//! DESIGN
//! ======
//! Undo and redo operate on stroke groups — every action sharing the same
//! `(owner, stroke_id)` — so a free-draw gesture made of many segment
//! actions undoes atomically as one user gesture.
//!
//! Undo removes actions from the middle of the log, a non-local edit, so it
//! broadcasts the entire resulting history. Redo only ever appends, so it
//! re-broadcasts just the restored actions. A redone group lands at the end
//! of the log: it now draws over anything drawn since its removal. That
//! z-order change is the documented behavior, not an accident to correct.

use tracing::{debug, info};

use crate::action::CanvasAction;
use crate::state::AppState;

use super::room;

/// Append a new action and echo it to every member, the sender included.
/// The sending client already applied it locally and treats the echo as an
/// idempotent append. Drawing something new makes the owner's redo history
/// unreachable, so their redo stack is cleared.
///
/// Actions from names that are not active members are dropped: the owner
/// raced an unregister or was never admitted.
pub async fn broadcast_action(state: &AppState, action: CanvasAction) {
    let mut room = state.room.lock().await;
    if room.member(&action.owner).is_none() {
        debug!(owner = %action.owner, "dropping action from non-member");
        return;
    }

    room.clear_redo_for(&action.owner);
    let event = room::action_event(&action);
    room.history.push(action);
    room::broadcast(&room, &event);
}

/// Undo the caller's most recent stroke group still in the log. No-op if
/// the user has nothing left to undo. The removed group is parked on the
/// user's redo stack and everyone receives the full resulting history.
pub async fn undo(state: &AppState, username: &str) {
    let mut room = state.room.lock().await;
    let Some(stroke_id) = room.last_stroke_of(username) else {
        return;
    };

    let removed = room.remove_stroke(username, stroke_id);
    debug!(%username, stroke_id, actions = removed.len(), "stroke undone");
    room.push_redo(username, removed);

    let event = room::full_history_event(&room);
    room::broadcast(&room, &event);
}

/// Restore the caller's most recently undone stroke group. No-op if their
/// redo stack is empty. The group is appended at the end of the log and
/// only the restored actions are re-broadcast.
pub async fn redo(state: &AppState, username: &str) {
    let mut room = state.room.lock().await;
    let Some(group) = room.pop_redo(username) else {
        return;
    };
    debug!(%username, actions = group.len(), "stroke redone");

    room.history.extend(group.iter().cloned());
    for action in &group {
        let event = room::action_event(action);
        room::broadcast(&room, &event);
    }
}

/// Replace the entire history (board load). Every redo stack is cleared and
/// everyone receives the new full history.
pub async fn load_history(state: &AppState, new_history: Vec<CanvasAction>) {
    let mut room = state.room.lock().await;
    room.history = new_history;
    room.clear_ledgers();

    let event = room::full_history_event(&room);
    room::broadcast(&room, &event);
    info!(actions = room.history.len(), "history replaced");
}

/// Wipe the board: empty log, empty ledgers for every user, full (empty)
/// history to every member.
pub async fn clear_board(state: &AppState) {
    let mut room = state.room.lock().await;
    room.history.clear();
    room.clear_ledgers();

    let event = room::full_history_event(&room);
    room::broadcast(&room, &event);
    info!("board cleared");
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
