use std::collections::HashMap;
use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, DatabaseError};
use crate::models::enums::MessageStatus;
use crate::models::{Attachment, AttachmentMeta, Message};

/// Persist a message and all of its attachments in one transaction.
/// This is the single commit point: a failure anywhere rolls the whole
/// message back, so no partial message is ever visible.
pub fn insert_message_with_attachments(
    conn: &mut Connection,
    msg: &Message,
    attachments: &[Attachment],
) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO messages (id, conversation_id, sender_role, sender_id, content, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            msg.id.to_string(),
            msg.conversation_id.to_string(),
            msg.sender_role.as_str(),
            msg.sender_id,
            msg.content,
            msg.status.as_str(),
            format_timestamp(&msg.created_at),
        ],
    )?;

    for attachment in attachments {
        tx.execute(
            "INSERT INTO attachments (id, message_id, seq, filename, content_type, size, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                attachment.id.to_string(),
                attachment.message_id.to_string(),
                attachment.seq,
                attachment.filename,
                attachment.content_type,
                attachment.size,
                attachment.data,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub fn get_message(conn: &Connection, id: &Uuid) -> Result<Option<Message>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, conversation_id, sender_role, sender_id, content, status, created_at
         FROM messages WHERE id = ?1",
        params![id.to_string()],
        row_to_raw,
    );

    match result {
        Ok(row) => Ok(Some(message_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Full thread, oldest first. The fixed-width timestamp text makes the
/// ORDER BY chronological.
pub fn list_messages_for_conversation(
    conn: &Connection,
    conversation_id: &Uuid,
) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_role, sender_id, content, status, created_at
         FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![conversation_id.to_string()], row_to_raw)?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(message_from_row(row?)?);
    }
    Ok(messages)
}

/// Attachment metadata for every message in a conversation, keyed by
/// message id. The data column is never selected here.
pub fn attachment_metas_for_conversation(
    conn: &Connection,
    conversation_id: &Uuid,
) -> Result<HashMap<Uuid, Vec<AttachmentMeta>>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.message_id, a.seq, a.filename, a.content_type, a.size
         FROM attachments a JOIN messages m ON a.message_id = m.id
         WHERE m.conversation_id = ?1 ORDER BY a.message_id, a.seq",
    )?;

    let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    let mut by_message: HashMap<Uuid, Vec<AttachmentMeta>> = HashMap::new();
    for row in rows {
        let (id, message_id, seq, filename, content_type, size) = row?;
        let message_id = Uuid::parse_str(&message_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        by_message.entry(message_id).or_default().push(AttachmentMeta {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            seq,
            filename,
            content_type,
            size,
        });
    }
    Ok(by_message)
}

pub fn attachment_metas_for_message(
    conn: &Connection,
    message_id: &Uuid,
) -> Result<Vec<AttachmentMeta>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, seq, filename, content_type, size
         FROM attachments WHERE message_id = ?1 ORDER BY seq",
    )?;

    let rows = stmt.query_map(params![message_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut metas = Vec::new();
    for row in rows {
        let (id, seq, filename, content_type, size) = row?;
        metas.push(AttachmentMeta {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            seq,
            filename,
            content_type,
            size,
        });
    }
    Ok(metas)
}

/// The only path that reads attachment bytes back out.
pub fn get_attachment(
    conn: &Connection,
    message_id: &Uuid,
    seq: i64,
) -> Result<Option<Attachment>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, message_id, seq, filename, content_type, size, data
         FROM attachments WHERE message_id = ?1 AND seq = ?2",
        params![message_id.to_string(), seq],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Vec<u8>>(6)?,
            ))
        },
    );

    match result {
        Ok((id, msg_id, seq, filename, content_type, size, data)) => Ok(Some(Attachment {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            message_id: Uuid::parse_str(&msg_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            seq,
            filename,
            content_type,
            size,
            data,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Coarse bulk read: everything in the conversation not authored by the
/// reader becomes `read`. Idempotent; returns the number of rows that
/// actually changed.
pub fn mark_read_bulk(
    conn: &Connection,
    conversation_id: &Uuid,
    reader_id: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE messages SET status = 'read'
         WHERE conversation_id = ?1 AND sender_id != ?2 AND status != 'read'",
        params![conversation_id.to_string(), reader_id],
    )?;
    Ok(changed)
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_role: row.get(2)?,
        sender_id: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

struct MessageRow {
    id: String,
    conversation_id: String,
    sender_role: String,
    sender_id: String,
    content: Option<String>,
    status: String,
    created_at: String,
}

fn message_from_row(row: MessageRow) -> Result<Message, DatabaseError> {
    Ok(Message {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        conversation_id: Uuid::parse_str(&row.conversation_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        sender_role: crate::models::enums::Role::from_str(&row.sender_role)?,
        sender_id: row.sender_id,
        content: row.content,
        status: MessageStatus::from_str(&row.status)?,
        created_at: parse_timestamp(&row.created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::conversation::insert_conversation;
    use crate::db::{now, open_memory_database};
    use crate::models::enums::{ParticipantPair, Role};
    use crate::models::{Conversation, UnreadCounts};

    fn seed_conversation(conn: &Connection) -> Uuid {
        let conv = Conversation {
            id: Uuid::new_v4(),
            patient_id: "patient-1".into(),
            lab_id: Some("lab-1".into()),
            phlebotomist_id: None,
            participants: ParticipantPair::PatientLab,
            booking_id: None,
            last_message: None,
            last_message_at: None,
            unread: UnreadCounts::default(),
            is_active: true,
            created_at: now(),
        };
        insert_conversation(conn, &conv).unwrap();
        conv.id
    }

    fn sample_message(conversation_id: Uuid, sender_id: &str, role: Role) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_role: role,
            sender_id: sender_id.into(),
            content: Some("hello".into()),
            status: MessageStatus::Sent,
            created_at: now(),
        }
    }

    #[test]
    fn insert_with_attachments_round_trips() {
        let mut conn = open_memory_database().unwrap();
        let conv_id = seed_conversation(&conn);
        let msg = sample_message(conv_id, "patient-1", Role::Patient);
        let attachment = Attachment {
            id: Uuid::new_v4(),
            message_id: msg.id,
            seq: 0,
            filename: "scan.png".into(),
            content_type: "image/png".into(),
            size: 4,
            data: vec![0x89, 0x50, 0x4E, 0x47],
        };

        insert_message_with_attachments(&mut conn, &msg, &[attachment.clone()]).unwrap();

        let loaded = get_attachment(&conn, &msg.id, 0).unwrap().unwrap();
        assert_eq!(loaded.data, attachment.data);
        assert_eq!(loaded.content_type, "image/png");
        assert_eq!(loaded.filename, "scan.png");

        let metas = attachment_metas_for_message(&conn, &msg.id).unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].size, 4);
    }

    #[test]
    fn missing_attachment_index_is_none() {
        let mut conn = open_memory_database().unwrap();
        let conv_id = seed_conversation(&conn);
        let msg = sample_message(conv_id, "patient-1", Role::Patient);
        insert_message_with_attachments(&mut conn, &msg, &[]).unwrap();

        assert!(get_attachment(&conn, &msg.id, 0).unwrap().is_none());
    }

    #[test]
    fn list_orders_oldest_first() {
        let mut conn = open_memory_database().unwrap();
        let conv_id = seed_conversation(&conn);

        let mut first = sample_message(conv_id, "patient-1", Role::Patient);
        first.created_at = now();
        let mut second = sample_message(conv_id, "lab-1", Role::Lab);
        second.created_at = first.created_at + chrono::Duration::microseconds(5);

        // Insert newest first to prove ordering comes from timestamps
        insert_message_with_attachments(&mut conn, &second, &[]).unwrap();
        insert_message_with_attachments(&mut conn, &first, &[]).unwrap();

        let listed = list_messages_for_conversation(&conn, &conv_id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[test]
    fn mark_read_bulk_skips_own_messages_and_is_idempotent() {
        let mut conn = open_memory_database().unwrap();
        let conv_id = seed_conversation(&conn);

        let mine = sample_message(conv_id, "patient-1", Role::Patient);
        let theirs = sample_message(conv_id, "lab-1", Role::Lab);
        insert_message_with_attachments(&mut conn, &mine, &[]).unwrap();
        insert_message_with_attachments(&mut conn, &theirs, &[]).unwrap();

        let changed = mark_read_bulk(&conn, &conv_id, "patient-1").unwrap();
        assert_eq!(changed, 1);

        let listed = list_messages_for_conversation(&conn, &conv_id).unwrap();
        let by_id: HashMap<Uuid, MessageStatus> =
            listed.iter().map(|m| (m.id, m.status)).collect();
        assert_eq!(by_id[&mine.id], MessageStatus::Sent);
        assert_eq!(by_id[&theirs.id], MessageStatus::Read);

        // Second pass changes nothing
        let changed = mark_read_bulk(&conn, &conv_id, "patient-1").unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn conversation_metas_group_by_message() {
        let mut conn = open_memory_database().unwrap();
        let conv_id = seed_conversation(&conn);
        let msg = sample_message(conv_id, "patient-1", Role::Patient);
        let attachments: Vec<Attachment> = (0..2)
            .map(|seq| Attachment {
                id: Uuid::new_v4(),
                message_id: msg.id,
                seq,
                filename: format!("file-{seq}.pdf"),
                content_type: "application/pdf".into(),
                size: 1,
                data: vec![seq as u8],
            })
            .collect();
        insert_message_with_attachments(&mut conn, &msg, &attachments).unwrap();

        let metas = attachment_metas_for_conversation(&conn, &conv_id).unwrap();
        assert_eq!(metas[&msg.id].len(), 2);
        assert_eq!(metas[&msg.id][0].seq, 0);
        assert_eq!(metas[&msg.id][1].seq, 1);
    }
}
