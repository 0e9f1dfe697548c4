//! Financial aggregation — debts, collections and clinic totals.
//!
//! Everything here is compute-on-read: figures are reduced from visit and
//! payment rows on every call and never stored, so there is no cached
//! aggregate to invalidate. Empty inputs yield zero-valued totals, never
//! an error. All functions operate on the store's SQLite database via
//! rusqlite.

use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::db::repository::patient_from_row;
use crate::db::DatabaseError;
use crate::models::Patient;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A patient with their lifetime charge/payment totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub patient: Patient,
    pub total_charges: f64,
    pub total_paid: f64,
    pub total_debt: f64,
}

/// Clinic-wide counters and sums. All zero under no data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicTotals {
    pub total_patients: i64,
    pub total_visits: i64,
    pub total_revenue: f64,
    pub total_collected: f64,
    pub total_outstanding: f64,
}

/// Clinic totals plus the two "today" figures for the dashboard header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub totals: ClinicTotals,
    pub today_collected: f64,
    pub today_appointments: i64,
}

/// One entry in the top-debtors ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debtor {
    pub patient_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub debt: f64,
}

// ---------------------------------------------------------------------------
// Aggregation queries
// ---------------------------------------------------------------------------

const PATIENT_COLUMNS: &str = "p.id, p.name, p.age, p.gender, p.phone, p.address, p.email, \
     p.national_id, p.blood_type, p.allergies, p.chronic_diseases, \
     p.current_medications, p.emergency_contact, p.emergency_phone, \
     p.insurance_company, p.insurance_number, p.notes, p.created_date";

fn summary_from_row(row: &rusqlite::Row) -> rusqlite::Result<PatientSummary> {
    Ok(PatientSummary {
        patient: patient_from_row(row)?,
        total_charges: row.get(18)?,
        total_paid: row.get(19)?,
        total_debt: row.get(20)?,
    })
}

/// Outstanding debt for one patient: Σ total_cost − Σ paid_amount over
/// their visits. Zero visits means zero debt, not null.
pub fn patient_debt(conn: &Connection, patient_id: i64) -> Result<f64, DatabaseError> {
    let debt = conn.query_row(
        "SELECT COALESCE(SUM(total_cost - paid_amount), 0)
         FROM visits WHERE patient_id = ?1",
        params![patient_id],
        |row| row.get(0),
    )?;
    Ok(debt)
}

/// All patients with charge/paid/debt totals, newest registration first.
pub fn list_patient_summaries(
    conn: &Connection,
) -> Result<Vec<PatientSummary>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS},
                COALESCE(SUM(v.total_cost), 0) AS total_charges,
                COALESCE(SUM(v.paid_amount), 0) AS total_paid,
                COALESCE(SUM(v.total_cost - v.paid_amount), 0) AS total_debt
         FROM patients p
         LEFT JOIN visits v ON p.id = v.patient_id
         GROUP BY p.id
         ORDER BY p.created_date DESC, p.id DESC"
    ))?;
    let summaries = stmt
        .query_map([], summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}

/// Substring search (case-insensitive for ASCII) over name, phone,
/// national id and email, with computed debt. Capped at 20 results,
/// ordered by name. A blank query matches nothing.
pub fn search_patients(
    conn: &Connection,
    query: &str,
) -> Result<Vec<PatientSummary>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let pattern = format!("%{query}%");

    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS},
                COALESCE(SUM(v.total_cost), 0) AS total_charges,
                COALESCE(SUM(v.paid_amount), 0) AS total_paid,
                COALESCE(SUM(v.total_cost - v.paid_amount), 0) AS total_debt
         FROM patients p
         LEFT JOIN visits v ON p.id = v.patient_id
         WHERE p.name LIKE ?1
            OR p.phone LIKE ?1
            OR p.national_id LIKE ?1
            OR p.email LIKE ?1
         GROUP BY p.id
         ORDER BY p.name
         LIMIT 20"
    ))?;
    let results = stmt
        .query_map(params![pattern], summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Advanced search: optional text filter plus a visit-date range, capped
/// at 50 results ordered by name.
pub fn search_patients_by_date(
    conn: &Connection,
    query: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<PatientSummary>, DatabaseError> {
    let mut sql = format!(
        "SELECT {PATIENT_COLUMNS},
                COALESCE(SUM(v.total_cost), 0) AS total_charges,
                COALESCE(SUM(v.paid_amount), 0) AS total_paid,
                COALESCE(SUM(v.total_cost - v.paid_amount), 0) AS total_debt
         FROM patients p
         LEFT JOIN visits v ON p.id = v.patient_id
         WHERE 1=1"
    );
    let mut bindings: Vec<String> = Vec::new();

    if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
        let n = bindings.len() + 1;
        sql.push_str(&format!(
            " AND (p.name LIKE ?{n} OR p.phone LIKE ?{n} OR p.national_id LIKE ?{n})"
        ));
        bindings.push(format!("%{q}%"));
    }
    if let Some(start) = start_date {
        sql.push_str(&format!(" AND DATE(v.visit_date) >= ?{}", bindings.len() + 1));
        bindings.push(start.to_string());
    }
    if let Some(end) = end_date {
        sql.push_str(&format!(" AND DATE(v.visit_date) <= ?{}", bindings.len() + 1));
        bindings.push(end.to_string());
    }
    sql.push_str(" GROUP BY p.id ORDER BY p.name LIMIT 50");

    let mut stmt = conn.prepare(&sql)?;
    let results = stmt
        .query_map(params_from_iter(bindings.iter()), summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Clinic-wide counts and sums across all patients and visits.
pub fn clinic_totals(conn: &Connection) -> Result<ClinicTotals, DatabaseError> {
    let totals = conn.query_row(
        "SELECT COUNT(DISTINCT p.id),
                COUNT(v.id),
                COALESCE(SUM(v.total_cost), 0),
                COALESCE(SUM(v.paid_amount), 0),
                COALESCE(SUM(v.total_cost - v.paid_amount), 0)
         FROM patients p
         LEFT JOIN visits v ON p.id = v.patient_id",
        [],
        |row| {
            Ok(ClinicTotals {
                total_patients: row.get(0)?,
                total_visits: row.get(1)?,
                total_revenue: row.get(2)?,
                total_collected: row.get(3)?,
                total_outstanding: row.get(4)?,
            })
        },
    )?;
    Ok(totals)
}

/// Dashboard header figures: overall totals, today's collected amount
/// (calendar-date comparison on visit_date) and today's still-scheduled
/// appointment count.
pub fn dashboard_stats(conn: &Connection) -> Result<DashboardStats, DatabaseError> {
    let totals = clinic_totals(conn)?;

    let today_collected: f64 = conn.query_row(
        "SELECT COALESCE(SUM(paid_amount), 0)
         FROM visits
         WHERE DATE(visit_date) = DATE('now')",
        [],
        |row| row.get(0),
    )?;

    let today_appointments: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM appointments
         WHERE appointment_date = DATE('now')
           AND status = 'scheduled'",
        [],
        |row| row.get(0),
    )?;

    Ok(DashboardStats {
        totals,
        today_collected,
        today_appointments,
    })
}

/// Patients ranked by outstanding debt, strictly positive only,
/// descending, capped at `limit`.
pub fn top_debtors(conn: &Connection, limit: u32) -> Result<Vec<Debtor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.phone,
                COALESCE(SUM(v.total_cost - v.paid_amount), 0) AS debt
         FROM patients p
         LEFT JOIN visits v ON p.id = v.patient_id
         GROUP BY p.id
         HAVING debt > 0
         ORDER BY debt DESC
         LIMIT ?1",
    )?;
    let debtors = stmt
        .query_map(params![limit], |row| {
            Ok(Debtor {
                patient_id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                debt: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(debtors)
}
