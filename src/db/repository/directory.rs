use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::Role;

/// Display-name projection, maintained by the marketplace's profile
/// surfaces. Conversation listings expand references through it.
pub fn upsert_entry(
    conn: &Connection,
    user_id: &str,
    role: Role,
    display_name: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO directory (user_id, role, display_name) VALUES (?1, ?2, ?3)
         ON CONFLICT (user_id) DO UPDATE SET role = excluded.role, display_name = excluded.display_name",
        params![user_id, role.as_str(), display_name],
    )?;
    Ok(())
}

pub fn display_name(conn: &Connection, user_id: &str) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        "SELECT display_name FROM directory WHERE user_id = ?1",
        params![user_id],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(name) => Ok(Some(name)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
