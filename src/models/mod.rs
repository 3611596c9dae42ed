pub mod enums;

mod booking;
mod conversation;
mod message;
mod notification;

pub use booking::Booking;
pub use conversation::{Conversation, UnreadCounts};
pub use message::{Attachment, AttachmentMeta, Message, MessageView};
pub use notification::Notification;

use serde::{Deserialize, Serialize};

use enums::Role;

/// Authenticated caller identity, resolved by the session registry from
/// the bearer credential the authentication collaborator issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
