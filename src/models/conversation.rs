use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ParticipantPair, Role};
use super::Identity;

/// Per-role unread counters. One slot per possible role; the slot for a
/// role outside the conversing pair stays at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    pub patient: i64,
    pub lab: i64,
    pub phlebotomist: i64,
}

impl UnreadCounts {
    pub fn get(&self, role: Role) -> i64 {
        match role {
            Role::Patient => self.patient,
            Role::Lab => self.lab,
            Role::Phlebotomist => self.phlebotomist,
        }
    }
}

/// A chat thread between exactly two of {patient, lab, phlebotomist},
/// always anchored to a patient. The third stored id, when present, is
/// context only (the shared patient on a lab-phlebotomist thread).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub patient_id: String,
    pub lab_id: Option<String>,
    pub phlebotomist_id: Option<String>,
    pub participants: ParticipantPair,
    pub booking_id: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<NaiveDateTime>,
    pub unread: UnreadCounts,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Conversation {
    /// The stored reference for a role slot, whether conversing or context.
    pub fn reference_id(&self, role: Role) -> Option<&str> {
        match role {
            Role::Patient => Some(self.patient_id.as_str()),
            Role::Lab => self.lab_id.as_deref(),
            Role::Phlebotomist => self.phlebotomist_id.as_deref(),
        }
    }

    /// Whether `identity` is one of the two conversing parties. A patient
    /// who merely anchors a lab-phlebotomist thread is not a participant.
    pub fn is_participant(&self, identity: &Identity) -> bool {
        self.participants.contains(identity.role)
            && self.reference_id(identity.role) == Some(identity.user_id.as_str())
    }
}
