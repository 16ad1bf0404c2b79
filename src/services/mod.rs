//! Domain services used by the websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the room's business logic so the route handlers can
//! stay focused on protocol translation and identity plumbing. Every
//! state-changing entry point here locks the room once, mutates, and fans
//! out to members before releasing the lock — the serialization discipline
//! the whole server depends on.

pub mod canvas;
pub mod room;
pub mod roster;
