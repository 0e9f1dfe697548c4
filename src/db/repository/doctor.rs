use rusqlite::{params, Connection, Row};

use super::{parse_datetime, require_nonblank};
use crate::db::DatabaseError;
use crate::models::{Doctor, NewDoctor};

pub fn insert_doctor(conn: &Connection, doctor: &NewDoctor) -> Result<i64, DatabaseError> {
    require_nonblank("name", &doctor.name)?;

    conn.execute(
        "INSERT INTO doctors (name, specialization, phone, email, license_number)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            doctor.name,
            doctor.specialization,
            doctor.phone,
            doctor.email,
            doctor.license_number,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, specialization, phone, email, license_number, created_date
         FROM doctors WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id], doctor_from_row);
    match result {
        Ok(doctor) => Ok(Some(doctor)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, specialization, phone, email, license_number, created_date
         FROM doctors ORDER BY name",
    )?;
    let doctors = stmt
        .query_map([], doctor_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(doctors)
}

/// Delete the doctor row only. Visits and visit_doctors rows referencing
/// it keep their dangling ids.
pub fn delete_doctor(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity: "doctor",
            id,
        });
    }
    Ok(())
}

fn doctor_from_row(row: &Row) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        specialization: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        license_number: row.get(5)?,
        created_date: parse_datetime(&row.get::<_, String>(6)?),
    })
}
