use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{parse_datetime, require_nonblank};
use crate::db::DatabaseError;
use crate::models::{NewPatient, Patient};

/// Row counts removed by a patient cascade delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSummary {
    pub payments: usize,
    pub visits: usize,
    pub appointments: usize,
}

pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, DatabaseError> {
    require_nonblank("name", &patient.name)?;

    conn.execute(
        "INSERT INTO patients (
            name, age, gender, phone, address, email, national_id,
            blood_type, allergies, chronic_diseases, current_medications,
            emergency_contact, emergency_phone, insurance_company,
            insurance_number, notes
         )
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            patient.name,
            patient.age,
            patient.gender,
            patient.phone,
            patient.address,
            patient.email,
            patient.national_id,
            patient.blood_type,
            patient.allergies,
            patient.chronic_diseases,
            patient.current_medications,
            patient.emergency_contact,
            patient.emergency_phone,
            patient.insurance_company,
            patient.insurance_number,
            patient.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, age, gender, phone, address, email, national_id,
                blood_type, allergies, chronic_diseases, current_medications,
                emergency_contact, emergency_phone, insurance_company,
                insurance_number, notes, created_date
         FROM patients WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id], patient_from_row);
    match result {
        Ok(patient) => Ok(Some(patient)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn patient_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Delete a patient and everything it owns: payments of its visits, then
/// visits, then appointments, then the patient row. The caller wraps this
/// in a transaction — a partial cascade must never commit.
pub fn cascade_delete_patient(
    conn: &Connection,
    id: i64,
) -> Result<CascadeSummary, DatabaseError> {
    if !patient_exists(conn, id)? {
        return Err(DatabaseError::NotFound {
            entity: "patient",
            id,
        });
    }

    let payments = conn.execute(
        "DELETE FROM payments
         WHERE visit_id IN (SELECT id FROM visits WHERE patient_id = ?1)",
        params![id],
    )?;
    // visit_doctors rows go with their visit via ON DELETE CASCADE.
    let visits = conn.execute("DELETE FROM visits WHERE patient_id = ?1", params![id])?;
    let appointments = conn.execute(
        "DELETE FROM appointments WHERE patient_id = ?1",
        params![id],
    )?;
    conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;

    Ok(CascadeSummary {
        payments,
        visits,
        appointments,
    })
}

/// Map a row whose first 18 columns are the patients table in catalog
/// order. Shared with the aggregation queries, which append computed
/// columns after these.
pub(crate) fn patient_from_row(row: &Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        email: row.get(6)?,
        national_id: row.get(7)?,
        blood_type: row.get(8)?,
        allergies: row.get(9)?,
        chronic_diseases: row.get(10)?,
        current_medications: row.get(11)?,
        emergency_contact: row.get(12)?,
        emergency_phone: row.get(13)?,
        insurance_company: row.get(14)?,
        insurance_number: row.get(15)?,
        notes: row.get(16)?,
        created_date: parse_datetime(&row.get::<_, String>(17)?),
    })
}
