//! Chat domain layer: conversation lifecycle, message posting, read
//! receipts, the attachment codec, the report-upload lock trigger, and
//! notification fan-out.
//!
//! `ChatService` owns the store handle and the injected realtime hub
//! and notifier; the HTTP and WebSocket layers sit on top of it.

pub mod attachments;
pub mod authorization;
pub mod lock;
pub mod notify;
pub mod posting;
pub mod read_receipts;

pub use attachments::UploadedFile;
pub use notify::{Notifier, SqliteNotifier};

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{format_timestamp, repository, DatabaseError};
use crate::models::enums::Role;
use crate::models::{Conversation, Identity, MessageView, UnreadCounts};
use crate::realtime::RoomHub;

/// Domain-level outcomes. The API layer maps these onto HTTP statuses.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Conversation not found")]
    ConversationNotFound,
    #[error("Message not found")]
    MessageNotFound,
    #[error("Attachment not found")]
    AttachmentNotFound,
    #[error("Booking not found: {0}")]
    BookingNotFound(String),
    #[error("Not a participant of this conversation")]
    NotParticipant,
    #[error("No booking history between these participants")]
    NoBookingHistory,
    #[error("No common booking joining these participants")]
    NoCommonBooking,
    #[error("Invalid participant combination")]
    InvalidParticipants,
    #[error("Conversation is read-only: the report for its booking has been uploaded")]
    Locked,
    #[error("Message must contain text or at least one attachment")]
    EmptyMessage,
    #[error("Attachment rejected: {0}")]
    AttachmentRejected(String),
    #[error("lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A conversation participant reference expanded to its display name.
#[derive(Debug, Clone, Serialize)]
pub struct Party {
    pub id: String,
    pub display_name: Option<String>,
}

/// Conversation as returned to HTTP callers: references expanded to
/// display-name fields only, counters included.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub patient: Party,
    pub lab: Option<Party>,
    pub phlebotomist: Option<Party>,
    pub participants: [Role; 2],
    pub booking_id: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub unread_count: UnreadCounts,
    pub is_active: bool,
}

pub struct ChatService {
    db: Arc<Mutex<Connection>>,
    hub: Arc<RoomHub>,
    notifier: Arc<dyn Notifier>,
}

impl ChatService {
    pub fn new(db: Arc<Mutex<Connection>>, hub: Arc<RoomHub>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, hub, notifier }
    }

    pub fn hub(&self) -> &RoomHub {
        &self.hub
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, ChatError> {
        self.db.lock().map_err(|_| ChatError::LockPoisoned)
    }

    /// Load a conversation or fail with `ConversationNotFound`.
    pub fn conversation(&self, id: &Uuid) -> Result<Conversation, ChatError> {
        let conn = self.conn()?;
        repository::get_conversation(&conn, id)?.ok_or(ChatError::ConversationNotFound)
    }

    /// Membership check used by the realtime join path.
    pub fn is_participant(&self, conversation_id: &Uuid, identity: &Identity) -> Result<bool, ChatError> {
        Ok(self.conversation(conversation_id)?.is_participant(identity))
    }

    /// Conversations where the caller converses, most recent first.
    pub fn list_conversations(
        &self,
        caller: &Identity,
    ) -> Result<Vec<ConversationSummary>, ChatError> {
        let conn = self.conn()?;
        let conversations =
            repository::list_conversations_for_user(&conn, &caller.user_id, caller.role)?;
        conversations
            .into_iter()
            .map(|conv| summarize(&conn, conv))
            .collect()
    }

    pub fn summary(&self, conversation: Conversation) -> Result<ConversationSummary, ChatError> {
        let conn = self.conn()?;
        summarize(&conn, conversation)
    }

    /// Full thread, oldest first, attachment binary always excluded.
    pub fn list_messages(
        &self,
        conversation_id: &Uuid,
        caller: &Identity,
    ) -> Result<Vec<MessageView>, ChatError> {
        let conn = self.conn()?;
        let conversation = repository::get_conversation(&conn, conversation_id)?
            .ok_or(ChatError::ConversationNotFound)?;
        if !conversation.is_participant(caller) {
            return Err(ChatError::NotParticipant);
        }

        let messages = repository::list_messages_for_conversation(&conn, conversation_id)?;
        let mut metas = repository::attachment_metas_for_conversation(&conn, conversation_id)?;

        Ok(messages
            .into_iter()
            .map(|m| {
                let attachments = metas.remove(&m.id).unwrap_or_default();
                MessageView::from_parts(m, attachments)
            })
            .collect())
    }
}

fn summarize(conn: &Connection, conv: Conversation) -> Result<ConversationSummary, ChatError> {
    let party = |id: &str| -> Result<Party, ChatError> {
        Ok(Party {
            id: id.to_string(),
            display_name: repository::display_name(conn, id)?,
        })
    };

    Ok(ConversationSummary {
        id: conv.id,
        patient: party(&conv.patient_id)?,
        lab: conv.lab_id.as_deref().map(&party).transpose()?,
        phlebotomist: conv.phlebotomist_id.as_deref().map(&party).transpose()?,
        participants: conv.participants.roles(),
        booking_id: conv.booking_id,
        last_message: conv.last_message,
        last_message_at: conv.last_message_at.as_ref().map(format_timestamp),
        unread_count: conv.unread,
        is_active: conv.is_active,
    })
}
