//! Attachment codec: turns uploaded multipart parts into stored
//! attachment records, and serves the single-attachment fetch — the one
//! path that ever returns binary data.

use uuid::Uuid;

use crate::config::{ALLOWED_ATTACHMENT_TYPES, MAX_ATTACHMENTS_PER_MESSAGE, MAX_ATTACHMENT_BYTES};
use crate::db::repository;
use crate::models::{Attachment, Identity};

use super::{ChatError, ChatService};

/// One uploaded multipart file part, as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Validate and convert uploads into attachment records for `message_id`.
/// Any rejection fails the whole batch; the caller persists all or
/// nothing.
pub fn encode_uploads(
    message_id: &Uuid,
    files: Vec<UploadedFile>,
) -> Result<Vec<Attachment>, ChatError> {
    if files.len() > MAX_ATTACHMENTS_PER_MESSAGE {
        return Err(ChatError::AttachmentRejected(format!(
            "at most {MAX_ATTACHMENTS_PER_MESSAGE} files per message"
        )));
    }

    files
        .into_iter()
        .enumerate()
        .map(|(seq, file)| {
            let filename = file
                .filename
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| format!("attachment-{seq}"));

            let content_type = match file.content_type {
                Some(ct) => ct,
                None => mime_guess::from_path(&filename)
                    .first_raw()
                    .unwrap_or("application/octet-stream")
                    .to_string(),
            };

            if !ALLOWED_ATTACHMENT_TYPES.contains(&content_type.as_str()) {
                return Err(ChatError::AttachmentRejected(format!(
                    "unsupported file type {content_type}"
                )));
            }
            if file.data.is_empty() {
                return Err(ChatError::AttachmentRejected(format!(
                    "{filename} is empty"
                )));
            }
            if file.data.len() > MAX_ATTACHMENT_BYTES {
                return Err(ChatError::AttachmentRejected(format!(
                    "{filename} exceeds the 10 MB limit"
                )));
            }

            Ok(Attachment {
                id: Uuid::new_v4(),
                message_id: *message_id,
                seq: seq as i64,
                size: file.data.len() as i64,
                filename,
                content_type,
                data: file.data,
            })
        })
        .collect()
}

impl ChatService {
    /// Fetch one attachment's raw bytes by position within its message.
    /// The requester must be a conversing participant of the owning
    /// conversation.
    pub fn get_attachment(
        &self,
        message_id: &Uuid,
        index: i64,
        requester: &Identity,
    ) -> Result<Attachment, ChatError> {
        let conn = self.conn()?;

        let message =
            repository::get_message(&conn, message_id)?.ok_or(ChatError::MessageNotFound)?;
        let conversation = repository::get_conversation(&conn, &message.conversation_id)?
            .ok_or(ChatError::ConversationNotFound)?;
        if !conversation.is_participant(requester) {
            return Err(ChatError::NotParticipant);
        }

        repository::get_attachment(&conn, message_id, index)?.ok_or(ChatError::AttachmentNotFound)
    }
}
