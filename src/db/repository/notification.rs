use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, DatabaseError};
use crate::models::enums::Role;
use crate::models::Notification;

pub fn insert_notification(conn: &Connection, n: &Notification) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, user_role, conversation_id, message_id, body, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            n.id.to_string(),
            n.user_id,
            n.user_role.as_str(),
            n.conversation_id.to_string(),
            n.message_id.to_string(),
            n.body,
            n.is_read,
            format_timestamp(&n.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_notifications_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, user_role, conversation_id, message_id, body, is_read, created_at
         FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, bool>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut notifications = Vec::new();
    for row in rows {
        let (id, user_id, user_role, conversation_id, message_id, body, is_read, created_at) =
            row?;
        notifications.push(Notification {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            user_id,
            user_role: Role::from_str(&user_role)?,
            conversation_id: Uuid::parse_str(&conversation_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            message_id: Uuid::parse_str(&message_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            body,
            is_read,
            created_at: parse_timestamp(&created_at),
        });
    }
    Ok(notifications)
}
