use rusqlite::{params, Connection, Row};

use super::{conflict_on_unique, parse_date, parse_datetime};
use crate::db::DatabaseError;
use crate::models::{NewVisit, Visit, VisitDoctor};

pub fn insert_visit(
    conn: &Connection,
    patient_id: i64,
    visit: &NewVisit,
    doctor_id: Option<i64>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO visits (
            patient_id, doctor_id, diagnosis, symptoms, treatment,
            prescriptions, lab_tests, vital_signs, notes, total_cost,
            paid_amount, next_visit_date
         )
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            patient_id,
            doctor_id,
            visit.diagnosis,
            visit.symptoms,
            visit.treatment,
            visit.prescriptions,
            visit.lab_tests,
            visit.vital_signs,
            visit.notes,
            visit.total_cost,
            visit.paid_amount,
            visit.next_visit_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_visit(conn: &Connection, id: i64) -> Result<Option<Visit>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id], visit_from_row);
    match result {
        Ok(visit) => Ok(Some(visit)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A patient's visits, newest first.
pub fn list_patient_visits(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<Visit>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits
         WHERE patient_id = ?1
         ORDER BY visit_date DESC, id DESC"
    ))?;
    let visits = stmt
        .query_map(params![patient_id], visit_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(visits)
}

pub fn visit_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM visits WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Link a doctor to a visit. At most one row may exist per (visit,
/// doctor) pair; a second insert fails with `Conflict` and leaves the
/// first row untouched.
pub fn insert_visit_doctor(
    conn: &Connection,
    visit_id: i64,
    doctor_id: i64,
    role: &str,
    is_primary: bool,
    notes: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO visit_doctors (visit_id, doctor_id, role, is_primary, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![visit_id, doctor_id, role, is_primary as i64, notes],
    )
    .map_err(|e| {
        conflict_on_unique(
            e,
            &format!("doctor {doctor_id} already participates in visit {visit_id}"),
        )
    })?;
    Ok(())
}

/// Doctors participating in a visit, primary first.
pub fn list_visit_doctors(
    conn: &Connection,
    visit_id: i64,
) -> Result<Vec<VisitDoctor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, visit_id, doctor_id, role, is_primary, notes
         FROM visit_doctors
         WHERE visit_id = ?1
         ORDER BY is_primary DESC, id",
    )?;
    let rows = stmt
        .query_map(params![visit_id], |row| {
            Ok(VisitDoctor {
                id: row.get(0)?,
                visit_id: row.get(1)?,
                doctor_id: row.get(2)?,
                role: row.get(3)?,
                is_primary: row.get::<_, i64>(4)? != 0,
                notes: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Advance the stored running total. Only ever called in the same
/// transaction as the matching payment insert.
pub fn increment_paid_amount(
    conn: &Connection,
    visit_id: i64,
    amount: f64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE visits SET paid_amount = paid_amount + ?1 WHERE id = ?2",
        params![amount, visit_id],
    )?;
    Ok(())
}

const VISIT_COLUMNS: &str = "id, patient_id, doctor_id, visit_date, diagnosis, symptoms, \
     treatment, prescriptions, lab_tests, vital_signs, notes, total_cost, \
     paid_amount, next_visit_date";

fn visit_from_row(row: &Row) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        visit_date: parse_datetime(&row.get::<_, String>(3)?),
        diagnosis: row.get(4)?,
        symptoms: row.get(5)?,
        treatment: row.get(6)?,
        prescriptions: row.get(7)?,
        lab_tests: row.get(8)?,
        vital_signs: row.get(9)?,
        notes: row.get(10)?,
        total_cost: row.get(11)?,
        paid_amount: row.get(12)?,
        next_visit_date: row
            .get::<_, Option<String>>(13)?
            .as_deref()
            .and_then(parse_date),
    })
}
