use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Read-mostly projection of a marketplace booking. The chat core
/// consults it for authorization and lock state; the only field it ever
/// writes is `report_uploaded_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub patient_id: String,
    pub lab_id: Option<String>,
    pub phlebotomist_id: Option<String>,
    pub report_uploaded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Booking {
    /// A conversation referencing this booking is read-only once the
    /// report has landed. Derived here, never cached on the conversation.
    pub fn is_locked(&self) -> bool {
        self.report_uploaded_at.is_some()
    }
}
