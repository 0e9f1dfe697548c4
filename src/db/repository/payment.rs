use rusqlite::{params, Connection, Row};

use super::parse_datetime;
use crate::db::DatabaseError;
use crate::models::Payment;

/// Append a ledger entry against a visit. Amount validation and the
/// matching `paid_amount` update are the store's responsibility; this is
/// the raw insert.
pub fn insert_payment(
    conn: &Connection,
    visit_id: i64,
    amount: f64,
    method: Option<&str>,
    notes: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO payments (visit_id, amount, payment_method, notes)
         VALUES (?1, ?2, ?3, ?4)",
        params![visit_id, amount, method, notes],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A visit's ledger entries, oldest first.
pub fn list_visit_payments(
    conn: &Connection,
    visit_id: i64,
) -> Result<Vec<Payment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, visit_id, payment_date, amount, payment_method, notes
         FROM payments
         WHERE visit_id = ?1
         ORDER BY payment_date, id",
    )?;
    let payments = stmt
        .query_map(params![visit_id], payment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(payments)
}

fn payment_from_row(row: &Row) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        visit_id: row.get(1)?,
        payment_date: parse_datetime(&row.get::<_, String>(2)?),
        amount: row.get(3)?,
        payment_method: row.get(4)?,
        notes: row.get(5)?,
    })
}
