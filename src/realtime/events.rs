use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MessageView;

/// Client-to-server room control frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinConversation { conversation_id: Uuid },
    LeaveConversation { conversation_id: Uuid },
}

/// Server-to-client pushes. Payloads carry attachment metadata only;
/// binary data never crosses this channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage {
        message: MessageView,
    },
    MessagesRead {
        conversation_id: Uuid,
        reader_id: String,
    },
    ConversationLocked {
        conversation_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_parse_snake_case_tags() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"join_conversation","conversation_id":"{id}"}}"#);
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, ClientEvent::JoinConversation { conversation_id: id });

        let json = format!(r#"{{"type":"leave_conversation","conversation_id":"{id}"}}"#);
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, ClientEvent::LeaveConversation { conversation_id: id });
    }

    #[test]
    fn unknown_client_frame_fails_to_parse() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"shutdown"}"#).is_err());
    }

    #[test]
    fn server_events_use_wire_tag_names() {
        let id = Uuid::new_v4();
        let read = serde_json::to_value(ServerEvent::MessagesRead {
            conversation_id: id,
            reader_id: "patient-1".into(),
        })
        .unwrap();
        assert_eq!(read["type"], "messages_read");
        assert_eq!(read["reader_id"], "patient-1");

        let locked = serde_json::to_value(ServerEvent::ConversationLocked {
            conversation_id: id,
        })
        .unwrap();
        assert_eq!(locked["type"], "conversation_locked");
        assert_eq!(locked["conversation_id"], id.to_string());
    }
}
