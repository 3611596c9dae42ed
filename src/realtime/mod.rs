//! Presence/broadcast layer: a room per conversation over WebSocket.

pub mod events;
pub mod hub;
pub mod websocket;

pub use events::{ClientEvent, ServerEvent};
pub use hub::RoomHub;
