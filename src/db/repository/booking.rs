use rusqlite::{params, Connection};

use crate::db::{format_timestamp, parse_timestamp, DatabaseError};
use crate::models::Booking;

/// Projection upsert, driven by the marketplace's booking lifecycle.
pub fn upsert_booking(conn: &Connection, booking: &Booking) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bookings (id, patient_id, lab_id, phlebotomist_id, report_uploaded_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (id) DO UPDATE SET
             patient_id = excluded.patient_id,
             lab_id = excluded.lab_id,
             phlebotomist_id = excluded.phlebotomist_id",
        params![
            booking.id,
            booking.patient_id,
            booking.lab_id,
            booking.phlebotomist_id,
            booking.report_uploaded_at.as_ref().map(format_timestamp),
            format_timestamp(&booking.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> Result<Option<Booking>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, patient_id, lab_id, phlebotomist_id, report_uploaded_at, created_at
         FROM bookings WHERE id = ?1",
        params![id],
        row_to_booking,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Earliest booking joining a patient and a lab, if any.
pub fn find_patient_lab(
    conn: &Connection,
    patient_id: &str,
    lab_id: &str,
) -> Result<Option<Booking>, DatabaseError> {
    first_booking(
        conn,
        "SELECT id, patient_id, lab_id, phlebotomist_id, report_uploaded_at, created_at
         FROM bookings WHERE patient_id = ?1 AND lab_id = ?2 ORDER BY created_at LIMIT 1",
        patient_id,
        lab_id,
    )
}

pub fn find_patient_phlebotomist(
    conn: &Connection,
    patient_id: &str,
    phlebotomist_id: &str,
) -> Result<Option<Booking>, DatabaseError> {
    first_booking(
        conn,
        "SELECT id, patient_id, lab_id, phlebotomist_id, report_uploaded_at, created_at
         FROM bookings WHERE patient_id = ?1 AND phlebotomist_id = ?2 ORDER BY created_at LIMIT 1",
        patient_id,
        phlebotomist_id,
    )
}

/// Earliest booking joining a lab and a phlebotomist. Its patient
/// becomes the anchor of a bridged conversation.
pub fn find_lab_phlebotomist(
    conn: &Connection,
    lab_id: &str,
    phlebotomist_id: &str,
) -> Result<Option<Booking>, DatabaseError> {
    first_booking(
        conn,
        "SELECT id, patient_id, lab_id, phlebotomist_id, report_uploaded_at, created_at
         FROM bookings WHERE lab_id = ?1 AND phlebotomist_id = ?2 ORDER BY created_at LIMIT 1",
        lab_id,
        phlebotomist_id,
    )
}

/// Stamp the report-upload time. The first timestamp wins; repeated
/// events leave the row unchanged. Returns whether this call stamped it.
pub fn set_report_uploaded(
    conn: &Connection,
    id: &str,
    at: &chrono::NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE bookings SET report_uploaded_at = ?2 WHERE id = ?1 AND report_uploaded_at IS NULL",
        params![id, format_timestamp(at)],
    )?;
    Ok(changed > 0)
}

fn first_booking(
    conn: &Connection,
    sql: &str,
    first: &str,
    second: &str,
) -> Result<Option<Booking>, DatabaseError> {
    let result = conn.query_row(sql, params![first, second], row_to_booking);
    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn row_to_booking(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        lab_id: row.get(2)?,
        phlebotomist_id: row.get(3)?,
        report_uploaded_at: row.get::<_, Option<String>>(4)?.as_deref().map(parse_timestamp),
        created_at: parse_timestamp(&row.get::<_, String>(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{now, open_memory_database};

    fn seed(conn: &Connection, id: &str, lab: Option<&str>, phleb: Option<&str>) {
        let booking = Booking {
            id: id.into(),
            patient_id: "patient-1".into(),
            lab_id: lab.map(Into::into),
            phlebotomist_id: phleb.map(Into::into),
            report_uploaded_at: None,
            created_at: now(),
        };
        upsert_booking(conn, &booking).unwrap();
    }

    #[test]
    fn existence_checks_by_pair() {
        let conn = open_memory_database().unwrap();
        seed(&conn, "b1", Some("lab-1"), None);
        seed(&conn, "b2", None, Some("phleb-1"));
        seed(&conn, "b3", Some("lab-2"), Some("phleb-2"));

        assert!(find_patient_lab(&conn, "patient-1", "lab-1")
            .unwrap()
            .is_some());
        assert!(find_patient_lab(&conn, "patient-1", "lab-x")
            .unwrap()
            .is_none());
        assert!(find_patient_phlebotomist(&conn, "patient-1", "phleb-1")
            .unwrap()
            .is_some());

        let shared = find_lab_phlebotomist(&conn, "lab-2", "phleb-2")
            .unwrap()
            .unwrap();
        assert_eq!(shared.patient_id, "patient-1");
        assert!(find_lab_phlebotomist(&conn, "lab-1", "phleb-1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn report_upload_stamps_once() {
        let conn = open_memory_database().unwrap();
        seed(&conn, "b1", Some("lab-1"), None);

        let first = now();
        assert!(set_report_uploaded(&conn, "b1", &first).unwrap());

        let later = first + chrono::Duration::seconds(60);
        assert!(!set_report_uploaded(&conn, "b1", &later).unwrap());

        let booking = get_booking(&conn, "b1").unwrap().unwrap();
        assert_eq!(booking.report_uploaded_at, Some(first));
        assert!(booking.is_locked());
    }

    #[test]
    fn upsert_does_not_clear_report_stamp() {
        let conn = open_memory_database().unwrap();
        seed(&conn, "b1", Some("lab-1"), None);
        set_report_uploaded(&conn, "b1", &now()).unwrap();

        // Marketplace re-syncs the booking; the stamp survives
        seed(&conn, "b1", Some("lab-1"), Some("phleb-9"));
        let booking = get_booking(&conn, "b1").unwrap().unwrap();
        assert!(booking.report_uploaded_at.is_some());
        assert_eq!(booking.phlebotomist_id.as_deref(), Some("phleb-9"));
    }
}
