use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, DatabaseError};
use crate::models::enums::{ParticipantPair, Role};
use crate::models::{Conversation, UnreadCounts};

const COLUMNS: &str = "id, patient_id, lab_id, phlebotomist_id, participants, booking_id, \
     last_message, last_message_at, unread_patient, unread_lab, unread_phlebotomist, \
     is_active, created_at";

pub fn insert_conversation(conn: &Connection, conv: &Conversation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO conversations (id, patient_id, lab_id, phlebotomist_id, participants, \
         booking_id, last_message, last_message_at, unread_patient, unread_lab, \
         unread_phlebotomist, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            conv.id.to_string(),
            conv.patient_id,
            conv.lab_id,
            conv.phlebotomist_id,
            conv.participants.as_str(),
            conv.booking_id,
            conv.last_message,
            conv.last_message_at.as_ref().map(format_timestamp),
            conv.unread.patient,
            conv.unread.lab,
            conv.unread.phlebotomist,
            conv.is_active,
            format_timestamp(&conv.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_conversation(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Conversation>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
        params![id.to_string()],
        row_to_raw,
    );

    match result {
        Ok(row) => Ok(Some(conversation_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Find the conversation for an unordered identity pair, scoped by
/// participant class. The pair decides which reference columns key the
/// lookup; the anchor patient on a lab-phlebotomist thread is not part
/// of the key.
pub fn find_by_pair(
    conn: &Connection,
    pair: ParticipantPair,
    first_id: &str,
    second_id: &str,
) -> Result<Option<Conversation>, DatabaseError> {
    let sql = match pair {
        ParticipantPair::PatientLab => format!(
            "SELECT {COLUMNS} FROM conversations \
             WHERE participants = 'patient_lab' AND patient_id = ?1 AND lab_id = ?2"
        ),
        ParticipantPair::PatientPhlebotomist => format!(
            "SELECT {COLUMNS} FROM conversations \
             WHERE participants = 'patient_phlebotomist' AND patient_id = ?1 AND phlebotomist_id = ?2"
        ),
        ParticipantPair::LabPhlebotomist => format!(
            "SELECT {COLUMNS} FROM conversations \
             WHERE participants = 'lab_phlebotomist' AND lab_id = ?1 AND phlebotomist_id = ?2"
        ),
    };

    let result = conn.query_row(&sql, params![first_id, second_id], row_to_raw);
    match result {
        Ok(row) => Ok(Some(conversation_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Conversations where the caller is a conversing party, most recent
/// activity first; never-messaged threads sort last.
pub fn list_conversations_for_user(
    conn: &Connection,
    user_id: &str,
    role: Role,
) -> Result<Vec<Conversation>, DatabaseError> {
    let (column, pairs) = match role {
        Role::Patient => ("patient_id", ["patient_lab", "patient_phlebotomist"]),
        Role::Lab => ("lab_id", ["patient_lab", "lab_phlebotomist"]),
        Role::Phlebotomist => (
            "phlebotomist_id",
            ["patient_phlebotomist", "lab_phlebotomist"],
        ),
    };

    let sql = format!(
        "SELECT {COLUMNS} FROM conversations \
         WHERE {column} = ?1 AND participants IN (?2, ?3) \
         ORDER BY last_message_at IS NULL, last_message_at DESC, created_at DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, pairs[0], pairs[1]], row_to_raw)?;

    let mut conversations = Vec::new();
    for row in rows {
        conversations.push(conversation_from_row(row?)?);
    }
    Ok(conversations)
}

pub fn find_by_booking(
    conn: &Connection,
    booking_id: &str,
) -> Result<Vec<Conversation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM conversations WHERE booking_id = ?1"
    ))?;
    let rows = stmt.query_map(params![booking_id], row_to_raw)?;

    let mut conversations = Vec::new();
    for row in rows {
        conversations.push(conversation_from_row(row?)?);
    }
    Ok(conversations)
}

/// Denormalized preview fields, written after each post. Concurrent
/// posts race here and the later write wins.
pub fn set_last_message(
    conn: &Connection,
    id: &Uuid,
    preview: &str,
    at: &chrono::NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE conversations SET last_message = ?2, last_message_at = ?3 WHERE id = ?1",
        params![id.to_string(), preview, format_timestamp(at)],
    )?;
    Ok(())
}

/// Single atomic increment; no increment is lost under concurrent posts.
pub fn increment_unread(conn: &Connection, id: &Uuid, role: Role) -> Result<(), DatabaseError> {
    let sql = match role {
        Role::Patient => {
            "UPDATE conversations SET unread_patient = unread_patient + 1 WHERE id = ?1"
        }
        Role::Lab => "UPDATE conversations SET unread_lab = unread_lab + 1 WHERE id = ?1",
        Role::Phlebotomist => {
            "UPDATE conversations SET unread_phlebotomist = unread_phlebotomist + 1 WHERE id = ?1"
        }
    };
    conn.execute(sql, params![id.to_string()])?;
    Ok(())
}

pub fn reset_unread(conn: &Connection, id: &Uuid, role: Role) -> Result<(), DatabaseError> {
    let sql = match role {
        Role::Patient => "UPDATE conversations SET unread_patient = 0 WHERE id = ?1",
        Role::Lab => "UPDATE conversations SET unread_lab = 0 WHERE id = ?1",
        Role::Phlebotomist => "UPDATE conversations SET unread_phlebotomist = 0 WHERE id = ?1",
    };
    conn.execute(sql, params![id.to_string()])?;
    Ok(())
}

struct ConversationRow {
    id: String,
    patient_id: String,
    lab_id: Option<String>,
    phlebotomist_id: Option<String>,
    participants: String,
    booking_id: Option<String>,
    last_message: Option<String>,
    last_message_at: Option<String>,
    unread_patient: i64,
    unread_lab: i64,
    unread_phlebotomist: i64,
    is_active: bool,
    created_at: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        lab_id: row.get(2)?,
        phlebotomist_id: row.get(3)?,
        participants: row.get(4)?,
        booking_id: row.get(5)?,
        last_message: row.get(6)?,
        last_message_at: row.get(7)?,
        unread_patient: row.get(8)?,
        unread_lab: row.get(9)?,
        unread_phlebotomist: row.get(10)?,
        is_active: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn conversation_from_row(row: ConversationRow) -> Result<Conversation, DatabaseError> {
    Ok(Conversation {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: row.patient_id,
        lab_id: row.lab_id,
        phlebotomist_id: row.phlebotomist_id,
        participants: ParticipantPair::from_str(&row.participants)?,
        booking_id: row.booking_id,
        last_message: row.last_message,
        last_message_at: row.last_message_at.as_deref().map(parse_timestamp),
        unread: UnreadCounts {
            patient: row.unread_patient,
            lab: row.unread_lab,
            phlebotomist: row.unread_phlebotomist,
        },
        is_active: row.is_active,
        created_at: parse_timestamp(&row.created_at),
    })
}
