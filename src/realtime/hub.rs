//! Room-per-conversation fan-out registry. Injected into the chat
//! service at construction time; connections register their outbound
//! channel on join and are dropped from every room on disconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::ServerEvent;

/// Per-connection outbound queue depth. A slow consumer loses events
/// once this fills; the list fetch remains authoritative.
const OUTBOUND_BUFFER: usize = 64;

pub struct RoomHub {
    rooms: Mutex<HashMap<Uuid, HashMap<u64, mpsc::Sender<ServerEvent>>>>,
    next_conn: AtomicU64,
}

impl RoomHub {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            next_conn: AtomicU64::new(1),
        }
    }

    pub fn outbound_channel() -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(OUTBOUND_BUFFER)
    }

    pub fn next_connection_id(&self) -> u64 {
        self.next_conn.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a connection to a room. Joining twice replaces the sender.
    pub fn join(&self, conversation_id: Uuid, conn_id: u64, tx: mpsc::Sender<ServerEvent>) {
        let mut rooms = match self.rooms.lock() {
            Ok(rooms) => rooms,
            Err(_) => return,
        };
        rooms.entry(conversation_id).or_default().insert(conn_id, tx);
    }

    pub fn leave(&self, conversation_id: &Uuid, conn_id: u64) {
        let mut rooms = match self.rooms.lock() {
            Ok(rooms) => rooms,
            Err(_) => return,
        };
        if let Some(room) = rooms.get_mut(conversation_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                rooms.remove(conversation_id);
            }
        }
    }

    /// Remove a connection from every room it joined.
    pub fn disconnect(&self, conn_id: u64) {
        let mut rooms = match self.rooms.lock() {
            Ok(rooms) => rooms,
            Err(_) => return,
        };
        rooms.retain(|_, room| {
            room.remove(&conn_id);
            !room.is_empty()
        });
    }

    /// Fire-and-forget delivery to every connection in the room, the
    /// sender's own other connections included. Never blocks; a full or
    /// closed channel drops the event for that connection only. Returns
    /// the number of queues reached.
    pub fn broadcast(&self, conversation_id: &Uuid, event: ServerEvent) -> usize {
        let mut rooms = match self.rooms.lock() {
            Ok(rooms) => rooms,
            Err(_) => {
                tracing::error!("room registry lock poisoned, broadcast dropped");
                return 0;
            }
        };

        let Some(room) = rooms.get_mut(conversation_id) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (conn_id, tx) in room.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(conn_id, %conversation_id, "outbound queue full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*conn_id),
            }
        }
        for conn_id in dead {
            room.remove(&conn_id);
        }
        if room.is_empty() {
            rooms.remove(conversation_id);
        }
        delivered
    }

    pub fn room_size(&self, conversation_id: &Uuid) -> usize {
        self.rooms
            .lock()
            .map(|rooms| rooms.get(conversation_id).map_or(0, HashMap::len))
            .unwrap_or(0)
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked_event() -> ServerEvent {
        ServerEvent::ConversationLocked {
            conversation_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn broadcast_reaches_every_member_including_extra_connections() {
        let hub = RoomHub::new();
        let room = Uuid::new_v4();
        let (tx_a, mut rx_a) = RoomHub::outbound_channel();
        let (tx_b, mut rx_b) = RoomHub::outbound_channel();

        hub.join(room, hub.next_connection_id(), tx_a);
        hub.join(room, hub.next_connection_id(), tx_b);

        assert_eq!(hub.broadcast(&room, locked_event()), 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn broadcast_to_empty_room_is_zero() {
        let hub = RoomHub::new();
        assert_eq!(hub.broadcast(&Uuid::new_v4(), locked_event()), 0);
    }

    #[test]
    fn leave_removes_only_that_connection() {
        let hub = RoomHub::new();
        let room = Uuid::new_v4();
        let (tx_a, _rx_a) = RoomHub::outbound_channel();
        let (tx_b, _rx_b) = RoomHub::outbound_channel();

        let a = hub.next_connection_id();
        let b = hub.next_connection_id();
        hub.join(room, a, tx_a);
        hub.join(room, b, tx_b);
        hub.leave(&room, a);

        assert_eq!(hub.room_size(&room), 1);
    }

    #[test]
    fn disconnect_clears_all_rooms() {
        let hub = RoomHub::new();
        let room_1 = Uuid::new_v4();
        let room_2 = Uuid::new_v4();
        let (tx, _rx) = RoomHub::outbound_channel();

        let conn = hub.next_connection_id();
        hub.join(room_1, conn, tx.clone());
        hub.join(room_2, conn, tx);
        hub.disconnect(conn);

        assert_eq!(hub.room_size(&room_1), 0);
        assert_eq!(hub.room_size(&room_2), 0);
    }

    #[test]
    fn closed_receiver_is_reaped_on_broadcast() {
        let hub = RoomHub::new();
        let room = Uuid::new_v4();
        let (tx, rx) = RoomHub::outbound_channel();
        drop(rx);

        hub.join(room, hub.next_connection_id(), tx);
        assert_eq!(hub.broadcast(&room, locked_event()), 0);
        assert_eq!(hub.room_size(&room), 0);
    }

    #[test]
    fn full_queue_drops_event_but_keeps_member() {
        let hub = RoomHub::new();
        let room = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);

        hub.join(room, hub.next_connection_id(), tx);
        assert_eq!(hub.broadcast(&room, locked_event()), 1);
        // Queue now full: event dropped, membership kept
        assert_eq!(hub.broadcast(&room, locked_event()), 0);
        assert_eq!(hub.room_size(&room), 1);
    }
}
