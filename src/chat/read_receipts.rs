//! Read-receipt processing: coarse bulk status flip plus the reader's
//! counter reset, then a room broadcast.

use uuid::Uuid;

use crate::db::repository;
use crate::models::Identity;
use crate::realtime::ServerEvent;

use super::{ChatError, ChatService};

impl ChatService {
    /// Mark the reader's unread backlog as read. Every message not
    /// authored by the reader becomes `read` regardless of age; the
    /// reader-role counter drops to zero. Idempotent. Returns how many
    /// messages actually changed.
    pub fn mark_read(&self, conversation_id: &Uuid, reader: &Identity) -> Result<usize, ChatError> {
        let changed = {
            let conn = self.conn()?;
            let conversation = repository::get_conversation(&conn, conversation_id)?
                .ok_or(ChatError::ConversationNotFound)?;
            if !conversation.is_participant(reader) {
                return Err(ChatError::NotParticipant);
            }

            let changed = repository::mark_read_bulk(&conn, conversation_id, &reader.user_id)?;
            repository::reset_unread(&conn, conversation_id, reader.role)?;
            changed
        };

        self.hub.broadcast(
            conversation_id,
            ServerEvent::MessagesRead {
                conversation_id: *conversation_id,
                reader_id: reader.user_id.clone(),
            },
        );

        Ok(changed)
    }
}
