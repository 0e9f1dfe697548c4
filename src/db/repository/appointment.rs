use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use super::parse_datetime;
use crate::db::DatabaseError;
use crate::models::{
    Appointment, AppointmentWithPatient, NewAppointment, APPOINTMENT_SCHEDULED,
};

pub fn insert_appointment(
    conn: &Connection,
    patient_id: i64,
    appointment: &NewAppointment,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (
            patient_id, appointment_date, appointment_time, reason, status, notes
         )
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            patient_id,
            appointment.appointment_date.to_string(),
            appointment.appointment_time,
            appointment.reason,
            appointment
                .status
                .as_deref()
                .unwrap_or(APPOINTMENT_SCHEDULED),
            appointment.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All appointments joined with patient name and phone, ordered by date
/// then time.
pub fn list_appointments(
    conn: &Connection,
) -> Result<Vec<AppointmentWithPatient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.patient_id, a.appointment_date, a.appointment_time,
                a.reason, a.status, a.notes, a.created_date,
                p.name, p.phone
         FROM appointments a
         JOIN patients p ON a.patient_id = p.id
         ORDER BY a.appointment_date, a.appointment_time",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppointmentWithPatient {
                appointment: appointment_from_row(row)?,
                patient_name: row.get(8)?,
                patient_phone: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrite the status unconditionally — any string is accepted, there
/// is no transition state machine.
pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    status: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity: "appointment",
            id,
        });
    }
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity: "appointment",
            id,
        });
    }
    Ok(())
}

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        appointment_date: NaiveDate::parse_from_str(&row.get::<_, String>(2)?, "%Y-%m-%d")
            .unwrap_or_default(),
        appointment_time: row.get(3)?,
        reason: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        created_date: parse_datetime(&row.get::<_, String>(7)?),
    })
}
