use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MessageStatus, Role};

/// A stored attachment, binary payload included. Only the dedicated
/// single-attachment fetch ever serializes this; every list and
/// broadcast path goes through [`AttachmentMeta`] instead.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: Uuid,
    pub message_id: Uuid,
    pub seq: i64,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn meta(&self) -> AttachmentMeta {
        AttachmentMeta {
            id: self.id,
            seq: self.seq,
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            size: self.size,
        }
    }
}

/// Attachment record with the binary payload stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub id: Uuid,
    pub seq: i64,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
}

/// One entry in a conversation's append-only log. Immutable after
/// creation except for the `status` scalar, which read-receipt
/// processing flips to `read` in bulk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_role: Role,
    pub sender_id: String,
    pub content: Option<String>,
    pub status: MessageStatus,
    pub created_at: NaiveDateTime,
}

/// Message as returned to HTTP callers and broadcast to rooms:
/// attachment metadata only, never bytes.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_role: Role,
    pub sender_id: String,
    pub content: Option<String>,
    pub status: MessageStatus,
    pub attachments: Vec<AttachmentMeta>,
    pub created_at: String,
}

impl MessageView {
    pub fn from_parts(message: Message, attachments: Vec<AttachmentMeta>) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_role: message.sender_role,
            sender_id: message.sender_id,
            content: message.content,
            status: message.status,
            attachments,
            created_at: crate::db::format_timestamp(&message.created_at),
        }
    }
}
