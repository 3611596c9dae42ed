//! Conversation endpoints.
//!
//! - `POST /api/conversations` — resolve or create the thread with a
//!   target identity (authorized by booking history)
//! - `GET /api/conversations` — the caller's threads, most recent first

use axum::extract::State;
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::chat::ConversationSummary;
use crate::models::enums::Role;
use crate::models::Identity;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub target_user_id: String,
    pub target_user_type: Role,
}

/// `POST /api/conversations` — find or create the conversation between
/// the caller and the target. Idempotent.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<Json<ConversationSummary>, ApiError> {
    if req.target_user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("target_user_id cannot be empty".into()));
    }

    let conversation = ctx.chat.resolve_or_create_conversation(
        &identity,
        req.target_user_id.trim(),
        req.target_user_type,
    )?;
    let summary = ctx.chat.summary(conversation)?;
    Ok(Json(summary))
}

#[derive(Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// `GET /api/conversations` — threads where the caller converses,
/// sorted by last activity, references expanded to display names.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conversations = ctx.chat.list_conversations(&identity)?;
    Ok(Json(ConversationsResponse { conversations }))
}
