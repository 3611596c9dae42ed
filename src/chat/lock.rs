//! Lock trigger: reacts to the report-upload domain event. The booking
//! row is stamped and every room referencing it is told to go
//! read-only; enforcement stays with the derived check in the posting
//! path.

use uuid::Uuid;

use crate::db::{now, repository};
use crate::realtime::ServerEvent;

use super::{ChatError, ChatService};

impl ChatService {
    /// Called by the hosting application when a booking's report lands.
    /// Idempotent: repeated events keep the first timestamp and re-send
    /// the advisory broadcast. Returns the ids of the conversations
    /// notified.
    pub fn on_report_uploaded(&self, booking_id: &str) -> Result<Vec<Uuid>, ChatError> {
        let conversations = {
            let conn = self.conn()?;
            repository::get_booking(&conn, booking_id)?
                .ok_or_else(|| ChatError::BookingNotFound(booking_id.to_string()))?;

            let stamped = repository::set_report_uploaded(&conn, booking_id, &now())?;
            if stamped {
                tracing::info!(booking_id, "report uploaded, locking conversations");
            }

            repository::find_by_booking(&conn, booking_id)?
        };

        let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
        for id in &ids {
            self.hub.broadcast(
                id,
                ServerEvent::ConversationLocked {
                    conversation_id: *id,
                },
            );
        }
        Ok(ids)
    }
}
