//! Authorization gate: decides whether two identities may converse and
//! computes the canonical patient/lab/phlebotomist triple for the
//! thread. Booking history is the sole source of entitlement.

use uuid::Uuid;

use crate::db::{now, repository};
use crate::models::enums::{ParticipantPair, Role};
use crate::models::{Conversation, Identity, UnreadCounts};

use super::{ChatError, ChatService};

impl ChatService {
    /// Find or create the conversation between the caller and a target
    /// identity. Symmetric in caller/target order; idempotent. No
    /// broadcast and no side effect beyond at most one inserted row.
    pub fn resolve_or_create_conversation(
        &self,
        caller: &Identity,
        target_id: &str,
        target_role: Role,
    ) -> Result<Conversation, ChatError> {
        let pair = ParticipantPair::from_roles(caller.role, target_role)
            .ok_or(ChatError::InvalidParticipants)?;

        let conn = self.conn()?;

        // Resolve the anchor triple and the justifying booking for the
        // pair. Every arm requires booking history before anything is
        // created.
        let (patient_id, lab_id, phlebotomist_id, booking_id) = match pair {
            ParticipantPair::PatientLab => {
                let (patient, lab) = order_ids(caller, target_id, Role::Patient);
                let booking = repository::find_patient_lab(&conn, &patient, &lab)?
                    .ok_or(ChatError::NoBookingHistory)?;
                (patient, Some(lab), None, booking.id)
            }
            ParticipantPair::PatientPhlebotomist => {
                let (patient, phlebotomist) = order_ids(caller, target_id, Role::Patient);
                let booking =
                    repository::find_patient_phlebotomist(&conn, &patient, &phlebotomist)?
                        .ok_or(ChatError::NoBookingHistory)?;
                (patient, None, Some(phlebotomist), booking.id)
            }
            ParticipantPair::LabPhlebotomist => {
                let (lab, phlebotomist) = order_ids(caller, target_id, Role::Lab);
                let booking = repository::find_lab_phlebotomist(&conn, &lab, &phlebotomist)?
                    .ok_or(ChatError::NoCommonBooking)?;
                // The shared patient anchors the bridged thread
                (booking.patient_id.clone(), Some(lab), Some(phlebotomist), booking.id)
            }
        };

        let (first_key, second_key) = match pair {
            ParticipantPair::PatientLab => (patient_id.as_str(), lab_id.as_deref().unwrap_or("")),
            ParticipantPair::PatientPhlebotomist => {
                (patient_id.as_str(), phlebotomist_id.as_deref().unwrap_or(""))
            }
            ParticipantPair::LabPhlebotomist => (
                lab_id.as_deref().unwrap_or(""),
                phlebotomist_id.as_deref().unwrap_or(""),
            ),
        };

        if let Some(existing) = repository::find_by_pair(&conn, pair, first_key, second_key)? {
            return Ok(existing);
        }

        let conversation = Conversation {
            id: Uuid::new_v4(),
            patient_id,
            lab_id,
            phlebotomist_id,
            participants: pair,
            booking_id: Some(booking_id),
            last_message: None,
            last_message_at: None,
            unread: UnreadCounts::default(),
            is_active: true,
            created_at: now(),
        };
        repository::insert_conversation(&conn, &conversation)?;

        tracing::info!(
            conversation_id = %conversation.id,
            participants = conversation.participants.as_str(),
            "conversation created"
        );
        Ok(conversation)
    }
}

/// Order (caller, target) so the id holding `first_role` comes first.
fn order_ids(caller: &Identity, target_id: &str, first_role: Role) -> (String, String) {
    if caller.role == first_role {
        (caller.user_id.clone(), target_id.to_string())
    } else {
        (target_id.to_string(), caller.user_id.clone())
    }
}
