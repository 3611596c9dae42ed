use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;

/// A per-recipient notification created on message send. Best-effort:
/// the sender's request never fails because one of these could not be
/// written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub user_role: Role,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub body: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}
