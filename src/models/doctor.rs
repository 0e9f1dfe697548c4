use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A doctor on the clinic's roster. Referenced by visits (legacy primary
/// column) and by [`super::VisitDoctor`] participation rows; never owned
/// by any single visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub license_number: Option<String>,
    pub created_date: NaiveDateTime,
}

/// Fields accepted when adding a doctor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub license_number: Option<String>,
}

impl NewDoctor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
