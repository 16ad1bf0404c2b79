//! Membership registry operations: admission, eviction, and presence.
//!
//! DESIGN
//! ======
//! The first successful registration makes that user the admin for the life
//! of the session. Everyone else asks to join: their handle is parked in the
//! pending queue and the admin is notified. A name that is already active or
//! pending is rejected before the admin ever sees the request.
//!
//! ERROR HANDLING
//! ==============
//! Only identity collisions surface as errors — the caller must pick a new
//! name. Operations that reference a username with no matching entry
//! (approve, kick, unregister) degrade to silent no-ops, because concurrent
//! disconnect races are expected and benign.

use tracing::{info, warn};

use crate::action::CanvasAction;
use crate::frame::{Data, Frame};
use crate::state::{AppState, ClientHandle};

use super::room;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("name already in use: {0}")]
    NameTaken(String),
}

impl crate::frame::ErrorCode for RosterError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NameTaken(_) => "E_NAME_TAKEN",
        }
    }

    // The caller can retry with a different name.
    fn retryable(&self) -> bool {
        true
    }
}

/// Snapshot handed to a newly admitted member: the full drawing history and
/// the current user list. Both are independent copies.
pub struct Registration {
    pub history: Vec<CanvasAction>,
    pub users: Vec<String>,
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// Register a member directly. The first registration in the session makes
/// the caller admin. Broadcasts the updated user list to everyone.
///
/// # Errors
///
/// Returns `RosterError::NameTaken` if the name is already active or
/// pending.
pub async fn register(
    state: &AppState,
    name: &str,
    tx: ClientHandle,
) -> Result<Registration, RosterError> {
    let mut room = state.room.lock().await;

    if room.is_name_taken(name) {
        return Err(RosterError::NameTaken(name.to_string()));
    }

    if room.admin.is_none() {
        room.admin = Some(name.to_string());
        info!(%name, "first registration, member becomes admin");
    }
    room.insert_member(name, tx);

    let event = room::user_list_event(&room);
    room::broadcast(&room, &event);

    info!(%name, members = room.members.len(), "member registered");
    Ok(Registration { history: room.snapshot(), users: room.user_names() })
}

/// Remove an active member and broadcast the updated user list. Idempotent:
/// unknown names leave the room untouched and broadcast nothing.
pub async fn unregister(state: &AppState, name: &str) {
    let mut room = state.room.lock().await;
    if !room.remove_member(name) {
        return;
    }

    let event = room::user_list_event(&room);
    room::broadcast(&room, &event);
    info!(%name, remaining = room.members.len(), "member unregistered");
}

/// Connection-loss cleanup. A vanished transport ends that client's
/// session, whether the name was admitted or still awaiting approval.
pub async fn disconnect(state: &AppState, name: &str) {
    let mut room = state.room.lock().await;
    if room.pending.remove(name).is_some() {
        info!(%name, "pending join abandoned");
        return;
    }
    if room.remove_member(name) {
        let event = room::user_list_event(&room);
        room::broadcast(&room, &event);
        info!(%name, remaining = room.members.len(), "member unregistered");
    }
}

// =============================================================================
// ADMISSION
// =============================================================================

/// Ask to join the room. A colliding name is turned away immediately with a
/// negative join decision; the admin is never involved. Otherwise the
/// handle is parked pending and the admin is notified.
///
/// Returns whether the request was queued, so the transport layer knows if
/// this connection now owns the name.
pub async fn request_join(state: &AppState, name: &str, tx: ClientHandle) -> bool {
    let mut room = state.room.lock().await;

    if room.is_name_taken(name) {
        room::deliver(name, &tx, &join_decision_event(false));
        info!(%name, "join request rejected, name taken");
        return false;
    }

    room.pending.insert(name.to_string(), tx);
    match room.admin.clone() {
        Some(admin) => {
            if let Some(member) = room.member(&admin) {
                room::deliver(&member.name, &member.tx, &join_request_event(name));
            }
            info!(%name, "join request queued");
        }
        // Should not happen in a live session; the request stays parked.
        None => warn!(%name, "join request with no admin registered"),
    }
    true
}

/// Admit a pending member: move them to active, broadcast the user list,
/// and send them the full history plus a positive decision. No-op if the
/// name is not pending.
pub async fn approve_join(state: &AppState, name: &str) {
    let mut room = state.room.lock().await;
    let Some(tx) = room.pending.remove(name) else {
        return;
    };
    room.insert_member(name, tx);

    let event = room::user_list_event(&room);
    room::broadcast(&room, &event);

    if let Some(member) = room.member(name) {
        room::deliver(&member.name, &member.tx, &room::full_history_event(&room));
        room::deliver(&member.name, &member.tx, &join_decision_event(true));
    }
    info!(%name, members = room.members.len(), "join approved");
}

/// Turn a pending member away with a negative decision. No-op if the name
/// is not pending.
pub async fn reject_join(state: &AppState, name: &str) {
    let mut room = state.room.lock().await;
    let Some(tx) = room.pending.remove(name) else {
        return;
    };
    room::deliver(name, &tx, &join_decision_event(false));
    info!(%name, "join rejected");
}

// =============================================================================
// EVICTION
// =============================================================================

/// Kick an active member: send them a removal notice, then unregister them
/// and broadcast the updated user list. No-op if the name is not active.
pub async fn kick(state: &AppState, name: &str) {
    let mut room = state.room.lock().await;
    let Some(member) = room.member(name) else {
        return;
    };
    room::deliver(&member.name, &member.tx, &Frame::request("session:kicked", Data::new()));
    room.remove_member(name);

    let event = room::user_list_event(&room);
    room::broadcast(&room, &event);
    info!(%name, remaining = room.members.len(), "member kicked");
}

// =============================================================================
// PRESENCE
// =============================================================================

/// Active usernames in join order, from a consistent point-in-time view.
pub async fn list_active_users(state: &AppState) -> Vec<String> {
    state.room.lock().await.user_names()
}

/// Whether the given name holds the admin role.
pub async fn is_admin(state: &AppState, name: &str) -> bool {
    state.room.lock().await.is_admin(name)
}

// =============================================================================
// HELPERS
// =============================================================================

fn join_request_event(name: &str) -> Frame {
    Frame::request("session:join-request", Data::new()).with_data("name", name)
}

fn join_decision_event(approved: bool) -> Frame {
    Frame::request("session:join-decision", Data::new()).with_data("approved", approved)
}

#[cfg(test)]
#[path = "roster_test.rs"]
mod tests;
