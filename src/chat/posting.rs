//! Message posting: validate, persist, denormalize, fan out.

use uuid::Uuid;

use crate::db::{now, repository};
use crate::models::enums::MessageStatus;
use crate::models::{Identity, Message, MessageView};
use crate::realtime::ServerEvent;

use super::{attachments, notify, ChatError, ChatService};

/// Preview text recorded when a message carries no text.
const ATTACHMENT_PLACEHOLDER: &str = "Attachment";

impl ChatService {
    /// Validate and persist a message, update the conversation's
    /// denormalized summary, then fan out notifications and the room
    /// broadcast. The returned view (and the broadcast payload) never
    /// contain attachment bytes.
    pub fn post_message(
        &self,
        conversation_id: &Uuid,
        sender: &Identity,
        content: Option<String>,
        files: Vec<attachments::UploadedFile>,
    ) -> Result<MessageView, ChatError> {
        let content = content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if content.is_none() && files.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let message_id = Uuid::new_v4();
        let encoded = attachments::encode_uploads(&message_id, files)?;

        let (view, conversation) = {
            let mut conn = self.conn()?;

            let conversation = repository::get_conversation(&conn, conversation_id)?
                .ok_or(ChatError::ConversationNotFound)?;
            if !conversation.is_participant(sender) {
                return Err(ChatError::NotParticipant);
            }

            // Lock state is derived from the booking row on every post;
            // the booking record is the single source of truth.
            if let Some(booking_id) = &conversation.booking_id {
                if let Some(booking) = repository::get_booking(&conn, booking_id)? {
                    if booking.is_locked() {
                        return Err(ChatError::Locked);
                    }
                }
            }

            let message = Message {
                id: message_id,
                conversation_id: *conversation_id,
                sender_role: sender.role,
                sender_id: sender.user_id.clone(),
                content: content.clone(),
                status: MessageStatus::Sent,
                created_at: now(),
            };
            repository::insert_message_with_attachments(&mut conn, &message, &encoded)?;

            let preview = content.as_deref().unwrap_or(ATTACHMENT_PLACEHOLDER);
            repository::set_last_message(&conn, conversation_id, preview, &message.created_at)?;
            for role in conversation.participants.roles() {
                if role != sender.role {
                    repository::increment_unread(&conn, conversation_id, role)?;
                }
            }

            let metas = encoded.iter().map(|a| a.meta()).collect();
            (MessageView::from_parts(message, metas), conversation)
        };

        // Best-effort side effects after the store guard is released;
        // neither may turn a persisted message into an error response.
        notify::fan_out(self.notifier.as_ref(), &conversation, &view);
        self.hub.broadcast(
            conversation_id,
            ServerEvent::NewMessage {
                message: view.clone(),
            },
        );

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::models::enums::{ParticipantPair, Role};

    fn patient() -> Identity {
        Identity::new("patient-1", Role::Patient)
    }

    fn lab() -> Identity {
        Identity::new("lab-1", Role::Lab)
    }

    fn booked_conversation(
        service: &ChatService,
        db: &std::sync::Arc<std::sync::Mutex<rusqlite::Connection>>,
    ) -> Uuid {
        seed_booking(db, "b1", "patient-1", Some("lab-1"), None);
        service
            .resolve_or_create_conversation(&patient(), "lab-1", Role::Lab)
            .unwrap()
            .id
    }

    #[test]
    fn posts_update_preview_and_counters() {
        let (service, db, _hub) = service_with_parts();
        let conv_id = booked_conversation(&service, &db);

        let view = service
            .post_message(&conv_id, &patient(), Some("Hello".into()), vec![])
            .unwrap();
        assert_eq!(view.content.as_deref(), Some("Hello"));
        assert_eq!(view.status, MessageStatus::Sent);

        let conv = service.conversation(&conv_id).unwrap();
        assert_eq!(conv.last_message.as_deref(), Some("Hello"));
        assert_eq!(conv.unread.lab, 1);
        assert_eq!(conv.unread.patient, 0);
        assert_eq!(conv.unread.phlebotomist, 0);
    }

    #[test]
    fn attachment_only_post_uses_placeholder_preview() {
        let (service, db, _hub) = service_with_parts();
        let conv_id = booked_conversation(&service, &db);

        let view = service
            .post_message(&conv_id, &patient(), None, vec![png_file("scan.png")])
            .unwrap();
        assert!(view.content.is_none());
        assert_eq!(view.attachments.len(), 1);

        let conv = service.conversation(&conv_id).unwrap();
        assert_eq!(conv.last_message.as_deref(), Some("Attachment"));
    }

    #[test]
    fn whitespace_content_with_no_files_is_empty() {
        let (service, db, _hub) = service_with_parts();
        let conv_id = booked_conversation(&service, &db);

        let err = service
            .post_message(&conv_id, &patient(), Some("   ".into()), vec![])
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }

    #[test]
    fn non_participant_cannot_post() {
        let (service, db, _hub) = service_with_parts();
        let conv_id = booked_conversation(&service, &db);

        let err = service
            .post_message(
                &conv_id,
                &Identity::new("lab-2", Role::Lab),
                Some("hi".into()),
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, ChatError::NotParticipant));

        // Role must match the stored slot, not just the id
        let err = service
            .post_message(
                &conv_id,
                &Identity::new("lab-1", Role::Phlebotomist),
                Some("hi".into()),
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, ChatError::NotParticipant));
    }

    #[test]
    fn unread_counters_track_alternating_senders() {
        let (service, db, _hub) = service_with_parts();
        let conv_id = booked_conversation(&service, &db);

        for i in 0..4 {
            let (sender, text) = if i % 2 == 0 {
                (patient(), format!("p{i}"))
            } else {
                (lab(), format!("l{i}"))
            };
            service
                .post_message(&conv_id, &sender, Some(text), vec![])
                .unwrap();
        }

        let conv = service.conversation(&conv_id).unwrap();
        assert_eq!(conv.unread.lab, 2);
        assert_eq!(conv.unread.patient, 2);

        service.mark_read(&conv_id, &lab()).unwrap();
        let conv = service.conversation(&conv_id).unwrap();
        assert_eq!(conv.unread.lab, 0);
        assert_eq!(conv.unread.patient, 2);

        service
            .post_message(&conv_id, &patient(), Some("again".into()), vec![])
            .unwrap();
        let conv = service.conversation(&conv_id).unwrap();
        assert_eq!(conv.unread.lab, 1);
    }

    #[test]
    fn bridged_thread_increments_only_the_other_conversing_role() {
        let (service, db, _hub) = service_with_parts();
        seed_booking(&db, "b2", "patient-3", Some("lab-1"), Some("phleb-1"));
        let conv = service
            .resolve_or_create_conversation(&lab(), "phleb-1", Role::Phlebotomist)
            .unwrap();

        service
            .post_message(&conv.id, &lab(), Some("pickup at 9".into()), vec![])
            .unwrap();

        let conv = service.conversation(&conv.id).unwrap();
        assert_eq!(conv.participants, ParticipantPair::LabPhlebotomist);
        assert_eq!(conv.unread.phlebotomist, 1);
        // The anchor patient converses in neither direction here
        assert_eq!(conv.unread.patient, 0);
    }

    #[test]
    fn locked_booking_rejects_every_post() {
        let (service, db, _hub) = service_with_parts();
        let conv_id = booked_conversation(&service, &db);
        service
            .post_message(&conv_id, &patient(), Some("before".into()), vec![])
            .unwrap();

        service.on_report_uploaded("b1").unwrap();

        for sender in [patient(), lab()] {
            let err = service
                .post_message(&conv_id, &sender, Some("after".into()), vec![])
                .unwrap_err();
            assert!(matches!(err, ChatError::Locked));
        }

        // No unlock path: still rejected on retry
        let err = service
            .post_message(&conv_id, &patient(), Some("retry".into()), vec![])
            .unwrap_err();
        assert!(matches!(err, ChatError::Locked));
    }

    #[test]
    fn notifications_created_for_recipients_only() {
        let (service, db, _hub) = service_with_parts();
        let conv_id = booked_conversation(&service, &db);

        service
            .post_message(&conv_id, &patient(), Some("Hello".into()), vec![])
            .unwrap();

        let conn = db.lock().unwrap();
        let for_lab = crate::db::repository::list_notifications_for_user(&conn, "lab-1").unwrap();
        assert_eq!(for_lab.len(), 1);
        assert_eq!(for_lab[0].body, "Hello");
        assert!(
            crate::db::repository::list_notifications_for_user(&conn, "patient-1")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn notifier_failure_does_not_fail_the_post() {
        struct FailingNotifier;
        impl super::notify::Notifier for FailingNotifier {
            fn notify(
                &self,
                _recipient: &Identity,
                _conversation_id: &Uuid,
                _message_id: &Uuid,
                _preview: &str,
            ) -> Result<(), crate::db::DatabaseError> {
                Err(crate::db::DatabaseError::ConstraintViolation(
                    "sink unavailable".into(),
                ))
            }
        }

        let db = std::sync::Arc::new(std::sync::Mutex::new(
            crate::db::open_memory_database().unwrap(),
        ));
        let hub = std::sync::Arc::new(crate::realtime::RoomHub::new());
        let service = ChatService::new(db.clone(), hub, std::sync::Arc::new(FailingNotifier));

        seed_booking(&db, "b1", "patient-1", Some("lab-1"), None);
        let conv = service
            .resolve_or_create_conversation(&patient(), "lab-1", Role::Lab)
            .unwrap();

        // The message is durably persisted; the notifier failure is logged
        let view = service
            .post_message(&conv.id, &patient(), Some("still works".into()), vec![])
            .unwrap();
        assert_eq!(view.content.as_deref(), Some("still works"));
    }
}
