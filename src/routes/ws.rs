//! WebSocket handler — frame dispatch for the room protocol.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Event frames from the room → forward to the client
//!
//! Handlers translate frames into service calls. Broadcasts already happen
//! inside the services, under the room lock, so the dispatch layer only
//! ever answers the sender. The connection's registered name is the caller
//! identity for every operation: clients cannot speak for other users, and
//! admin-only syscalls are refused for everyone else.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. `session:register` or `session:join` binds a name to the connection
//! 3. Frames dispatch until the socket closes or the member is kicked
//! 4. Close → the bound name is released (active or pending)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::{info, warn};
use uuid::Uuid;

use crate::action::CanvasAction;
use crate::frame::{Data, Frame, Status};
use crate::services;
use crate::state::{AppState, CLIENT_CHANNEL_CAPACITY, ClientHandle};

// =============================================================================
// TYPES
// =============================================================================

/// Result returned by handler functions. Broadcasts to other members are
/// the services' business; handlers only decide what the sender gets back.
enum Outcome {
    /// Send done+data to the sender.
    Reply(Data),
    /// Send empty done to the sender.
    Done,
}

/// Per-connection context.
struct Connection {
    client_id: Uuid,
    /// The name this connection registered or requested. Bound once.
    user: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum WsError {
    #[error("register or join before issuing this call")]
    NotRegistered,
    #[error("only the admin may perform this operation")]
    AdminOnly,
}

impl crate::frame::ErrorCode for WsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotRegistered => "E_NOT_REGISTERED",
            Self::AdminOnly => "E_ADMIN_ONLY",
        }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel: the room pushes event frames here.
    let (client_tx, mut client_rx) = tokio::sync::mpsc::channel::<Frame>(CLIENT_CHANNEL_CAPACITY);

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, "ws: client connected");
    let mut conn = Connection { client_id, user: None };

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for frame in process_frame(&state, &mut conn, &client_tx, &text).await {
                            let _ = send_frame(&mut socket, &frame).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            frame = client_rx.recv() => {
                let Some(frame) = frame else { break };
                let evicted = frame.syscall == "session:kicked";
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
                // A kicked member's connection ends once the notice is out.
                if evicted {
                    break;
                }
            }
        }
    }

    // A lost transport ends this client's session: release the name so
    // peers see an updated user list and the name becomes available again.
    if let Some(name) = conn.user.take() {
        services::roster::disconnect(&state, &name).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse one inbound text frame, dispatch by syscall prefix, and return the
/// frames owed to the sender. Split from the socket loop so tests can drive
/// dispatch without a websocket.
async fn process_frame(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &ClientHandle,
    text: &str,
) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new())
                .with_data("code", "E_BAD_FRAME")
                .with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // The connection's bound name is the caller identity, whatever the
    // client put in `from`.
    req.from = conn.user.clone();

    info!(client_id = %conn.client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let result = match req.prefix() {
        "session" => handle_session(state, conn, client_tx, &req).await,
        "canvas" => handle_canvas(state, conn, &req).await,
        "chat" => handle_chat(state, conn, &req).await,
        "room" => handle_room(state, conn, &req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

async fn handle_session(
    state: &AppState,
    conn: &mut Connection,
    client_tx: &ClientHandle,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);

    match op {
        "register" => {
            let name = require_name(req)?;
            if conn.user.is_some() {
                return Err(req.error("connection already has an identity"));
            }
            match services::roster::register(state, name, client_tx.clone()).await {
                Ok(registration) => {
                    conn.user = Some(name.to_string());
                    let mut data = Data::new();
                    data.insert(
                        "history".into(),
                        serde_json::to_value(&registration.history).unwrap_or_default(),
                    );
                    data.insert("users".into(), serde_json::json!(registration.users));
                    Ok(Outcome::Reply(data))
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "join" => {
            let name = require_name(req)?;
            if conn.user.is_some() {
                return Err(req.error("connection already has an identity"));
            }
            // The connection owns the name only if the request was queued;
            // a turned-away requester may try again with another name.
            if services::roster::request_join(state, name, client_tx.clone()).await {
                conn.user = Some(name.to_string());
            }
            Ok(Outcome::Done)
        }
        "approve" => {
            require_admin(state, conn, req).await?;
            let name = require_name(req)?;
            services::roster::approve_join(state, name).await;
            Ok(Outcome::Done)
        }
        "reject" => {
            require_admin(state, conn, req).await?;
            let name = require_name(req)?;
            services::roster::reject_join(state, name).await;
            Ok(Outcome::Done)
        }
        "kick" => {
            require_admin(state, conn, req).await?;
            let name = require_name(req)?;
            services::roster::kick(state, name).await;
            Ok(Outcome::Done)
        }
        "leave" => {
            if let Some(name) = conn.user.take() {
                services::roster::unregister(state, &name).await;
            }
            Ok(Outcome::Done)
        }
        "users" => {
            let users = services::roster::list_active_users(state).await;
            let mut data = Data::new();
            data.insert("users".into(), serde_json::json!(users));
            Ok(Outcome::Reply(data))
        }
        _ => Err(req.error(format!("unknown session op: {op}"))),
    }
}

// =============================================================================
// CANVAS HANDLERS
// =============================================================================

async fn handle_canvas(
    state: &AppState,
    conn: &Connection,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(user) = conn.user.clone() else {
        return Err(req.error_from(&WsError::NotRegistered));
    };

    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);

    match op {
        "action" => {
            let Some(value) = req.data.get("action") else {
                return Err(req.error("action required"));
            };
            let mut action: CanvasAction = match serde_json::from_value(value.clone()) {
                Ok(a) => a,
                Err(e) => return Err(req.error(format!("invalid action: {e}"))),
            };
            // Ownership comes from the connection identity, not the payload.
            action.owner = user;
            if let Err(e) = action.validate() {
                return Err(req.error_from(&e));
            }
            services::canvas::broadcast_action(state, action).await;
            Ok(Outcome::Done)
        }
        "undo" => {
            services::canvas::undo(state, &user).await;
            Ok(Outcome::Done)
        }
        "redo" => {
            services::canvas::redo(state, &user).await;
            Ok(Outcome::Done)
        }
        "load" => {
            let Some(value) = req.data.get("actions") else {
                return Err(req.error("actions required"));
            };
            let actions: Vec<CanvasAction> = match serde_json::from_value(value.clone()) {
                Ok(a) => a,
                Err(e) => return Err(req.error(format!("invalid actions: {e}"))),
            };
            for action in &actions {
                if let Err(e) = action.validate() {
                    return Err(req.error_from(&e));
                }
            }
            services::canvas::load_history(state, actions).await;
            Ok(Outcome::Done)
        }
        "clear" => {
            services::canvas::clear_board(state).await;
            Ok(Outcome::Done)
        }
        _ => Err(req.error(format!("unknown canvas op: {op}"))),
    }
}

// =============================================================================
// CHAT HANDLER
// =============================================================================

async fn handle_chat(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    let Some(user) = conn.user.as_deref() else {
        return Err(req.error_from(&WsError::NotRegistered));
    };

    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);
    match op {
        "send" => {
            let Some(text) = req.data.get("text").and_then(|v| v.as_str()) else {
                return Err(req.error("text required"));
            };
            services::room::send_chat(state, user, text).await;
            Ok(Outcome::Done)
        }
        _ => Err(req.error(format!("unknown chat op: {op}"))),
    }
}

// =============================================================================
// ROOM HANDLER
// =============================================================================

async fn handle_room(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);
    match op {
        "close" => {
            require_admin(state, conn, req).await?;
            services::room::close_board(state).await;
            Ok(Outcome::Done)
        }
        _ => Err(req.error(format!("unknown room op: {op}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn require_name(req: &Frame) -> Result<&str, Frame> {
    req.data
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| req.error("name required"))
}

async fn require_admin(state: &AppState, conn: &Connection, req: &Frame) -> Result<(), Frame> {
    let Some(user) = conn.user.as_deref() else {
        return Err(req.error_from(&WsError::NotRegistered));
    };
    if services::roster::is_admin(state, user).await {
        Ok(())
    } else {
        Err(req.error_from(&WsError::AdminOnly))
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
