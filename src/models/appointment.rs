use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Default status for newly booked appointments.
pub const APPOINTMENT_SCHEDULED: &str = "scheduled";

/// A booked appointment, owned by exactly one patient.
///
/// `status` is an open string set ("scheduled", "completed", "cancelled",
/// ...); the store applies no transition rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub reason: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_date: NaiveDateTime,
}

/// Fields accepted when booking an appointment. A missing `status`
/// defaults to [`APPOINTMENT_SCHEDULED`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub reason: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Appointment joined with the owning patient's name and phone, for the
/// schedule listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentWithPatient {
    pub appointment: Appointment,
    pub patient_name: String,
    pub patient_phone: Option<String>,
}
