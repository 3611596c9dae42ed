//! Notification fan-out. One notification per recipient participant,
//! best-effort: failures are logged and swallowed, never surfaced to
//! the sender.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{now, repository, DatabaseError};
use crate::models::{Conversation, Identity, MessageView, Notification};

/// Seam to the marketplace's notification collaborator. The default
/// implementation persists rows; a push-gateway implementation would
/// slot in here unchanged.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        recipient: &Identity,
        conversation_id: &Uuid,
        message_id: &Uuid,
        preview: &str,
    ) -> Result<(), DatabaseError>;
}

pub struct SqliteNotifier {
    db: Arc<Mutex<Connection>>,
}

impl SqliteNotifier {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

impl Notifier for SqliteNotifier {
    fn notify(
        &self,
        recipient: &Identity,
        conversation_id: &Uuid,
        message_id: &Uuid,
        preview: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self
            .db
            .lock()
            .map_err(|_| DatabaseError::ConstraintViolation("lock poisoned".into()))?;
        repository::insert_notification(
            &conn,
            &Notification {
                id: Uuid::new_v4(),
                user_id: recipient.user_id.clone(),
                user_role: recipient.role,
                conversation_id: *conversation_id,
                message_id: *message_id,
                body: preview.to_string(),
                is_read: false,
                created_at: now(),
            },
        )
    }
}

/// Notify every conversing participant other than the sender. Must be
/// called with no store guard held: the default sink takes the same
/// lock.
pub(crate) fn fan_out(notifier: &dyn Notifier, conversation: &Conversation, message: &MessageView) {
    let preview = message.content.as_deref().unwrap_or("Attachment");

    for role in conversation.participants.roles() {
        if role == message.sender_role {
            continue;
        }
        let Some(recipient_id) = conversation.reference_id(role) else {
            continue;
        };
        let recipient = Identity::new(recipient_id, role);
        if let Err(e) = notifier.notify(&recipient, &conversation.id, &message.id, preview) {
            tracing::warn!(
                error = %e,
                recipient = %recipient.user_id,
                conversation_id = %conversation.id,
                "notification fan-out failed"
            );
        }
    }
}
