//! Message endpoints.
//!
//! - `POST /api/messages` — multipart post (text and/or up to 5 files)
//! - `GET /api/messages/:id` — full thread, oldest first
//! - `PUT /api/messages/:id/read` — mark the caller's backlog read
//! - `GET /api/messages/:id/attachments/:index` — raw attachment bytes

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::chat::UploadedFile;
use crate::config::MAX_ATTACHMENTS_PER_MESSAGE;
use crate::models::{Identity, MessageView};

/// `POST /api/messages` — multipart form with `conversation_id`,
/// optional `content`, and up to 5 `files` parts. The response (like
/// the room broadcast) carries attachment metadata only.
pub async fn post(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<Json<MessageView>, ApiError> {
    let mut conversation_id: Option<Uuid> = None;
    let mut content: Option<String> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("conversation_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable field: {e}")))?;
                conversation_id = Some(
                    Uuid::parse_str(text.trim())
                        .map_err(|_| ApiError::BadRequest("invalid conversation_id".into()))?,
                );
            }
            Some("content") => {
                content = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("unreadable field: {e}")))?,
                );
            }
            Some("files") => {
                if files.len() >= MAX_ATTACHMENTS_PER_MESSAGE {
                    return Err(ApiError::BadRequest(format!(
                        "at most {MAX_ATTACHMENTS_PER_MESSAGE} files per message"
                    )));
                }
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable file part: {e}")))?
                    .to_vec();
                files.push(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            _ => {} // unknown parts ignored
        }
    }

    let conversation_id =
        conversation_id.ok_or(ApiError::BadRequest("conversation_id is required".into()))?;

    let view = ctx
        .chat
        .post_message(&conversation_id, &identity, content, files)?;
    Ok(Json(view))
}

#[derive(Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
}

/// `GET /api/messages/:id` — every message in the conversation, oldest
/// first, attachment binary always excluded.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = ctx.chat.list_messages(&conversation_id, &identity)?;
    Ok(Json(MessagesResponse { messages }))
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

/// `PUT /api/messages/:id/read` — mark the caller's unread backlog as
/// read. Idempotent; no body.
pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let updated = ctx.chat.mark_read(&conversation_id, &identity)?;
    Ok(Json(MarkReadResponse { updated }))
}

/// `GET /api/messages/:id/attachments/:index` — raw bytes with the
/// stored content type and an inline disposition carrying the filename.
pub async fn attachment(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path((message_id, index)): Path<(Uuid, i64)>,
) -> Result<Response, ApiError> {
    let attachment = ctx.chat.get_attachment(&message_id, index, &identity)?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        sanitize_filename(&attachment.filename)
    );
    Ok((
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        attachment.data,
    )
        .into_response())
}

/// Keep the disposition header parseable whatever the upload called
/// itself.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_sanitizer_strips_quotes_and_controls() {
        assert_eq!(sanitize_filename("scan.png"), "scan.png");
        assert_eq!(sanitize_filename("a\"b\\c\n.pdf"), "abc.pdf");
    }
}
