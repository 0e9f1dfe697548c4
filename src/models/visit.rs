use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A medical visit, owned by exactly one patient.
///
/// `doctor_id` is the legacy single-doctor column kept for backward
/// compatibility; the authoritative doctor participation lives in
/// [`VisitDoctor`] rows. `paid_amount` is a stored running total that the
/// store reconciles with the payment ledger inside the same transaction as
/// every payment insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub visit_date: NaiveDateTime,
    pub diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<String>,
    pub lab_tests: Option<String>,
    pub vital_signs: Option<String>,
    pub notes: Option<String>,
    pub total_cost: f64,
    pub paid_amount: f64,
    pub next_visit_date: Option<NaiveDate>,
}

impl Visit {
    /// Outstanding balance for this visit. May be negative when the visit
    /// was overpaid; callers display it as-is.
    pub fn remaining(&self) -> f64 {
        self.total_cost - self.paid_amount
    }
}

/// Clinical and billing fields accepted when recording a visit.
///
/// `paid_amount > 0` makes the store append an "initial payment" ledger
/// entry (using `payment_method`, defaulting to cash) in the same
/// transaction as the visit insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVisit {
    pub diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    pub prescriptions: Option<String>,
    pub lab_tests: Option<String>,
    pub vital_signs: Option<String>,
    pub notes: Option<String>,
    pub total_cost: f64,
    pub paid_amount: f64,
    pub payment_method: Option<String>,
    pub next_visit_date: Option<NaiveDate>,
}

/// Join row linking one visit to one doctor. At most one row may exist per
/// (visit, doctor) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitDoctor {
    pub id: i64,
    pub visit_id: i64,
    pub doctor_id: i64,
    pub role: String,
    pub is_primary: bool,
    pub notes: Option<String>,
}

/// A participating doctor supplied when recording a visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitDoctorEntry {
    pub doctor_id: i64,
    pub role: Option<String>,
    pub notes: Option<String>,
}

impl VisitDoctorEntry {
    pub fn new(doctor_id: i64) -> Self {
        Self {
            doctor_id,
            role: None,
            notes: None,
        }
    }
}
