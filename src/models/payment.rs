use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An append-only ledger entry against a visit. Payments are never edited
/// or deleted individually; they disappear only when the owning patient is
/// deleted with a full cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub visit_id: i64,
    pub payment_date: NaiveDateTime,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}
