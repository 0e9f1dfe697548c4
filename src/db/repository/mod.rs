//! Repository layer — entity-scoped database operations.
//!
//! Every function takes a plain `&Connection`, so the same code runs
//! standalone or inside a `rusqlite::Transaction` (which derefs to
//! `Connection`). Multi-table units of work are composed by the store
//! ([`crate::store::ClinicStore`]), not here.

mod appointment;
mod clinic;
mod doctor;
mod patient;
mod payment;
mod visit;

pub use appointment::*;
pub use clinic::*;
pub use doctor::*;
pub use patient::*;
pub use payment::*;
pub use visit::*;

use chrono::{NaiveDate, NaiveDateTime};

use super::DatabaseError;

/// Parse a stored timestamp in either SQLite's `CURRENT_TIMESTAMP` format
/// or the ISO 'T' variant.
pub(crate) fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .unwrap_or_default()
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Reject blank required text fields.
pub(crate) fn require_nonblank(field: &str, value: &str) -> Result<(), DatabaseError> {
    if value.trim().is_empty() {
        return Err(DatabaseError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Map a UNIQUE-constraint failure to a typed conflict; everything else
/// stays a storage error.
pub(crate) fn conflict_on_unique(err: rusqlite::Error, message: &str) -> DatabaseError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::Conflict(message.to_string())
        }
        _ => DatabaseError::Sqlite(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::*;

    fn test_db() -> rusqlite::Connection {
        open_memory_database().unwrap()
    }

    #[test]
    fn patient_insert_and_retrieve() {
        let conn = test_db();
        let id = insert_patient(
            &conn,
            &NewPatient {
                age: Some(40),
                blood_type: Some("O+".into()),
                ..NewPatient::named("Ahmed")
            },
        )
        .unwrap();

        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(patient.name, "Ahmed");
        assert_eq!(patient.age, Some(40));
        assert_eq!(patient.blood_type.as_deref(), Some("O+"));
        assert_eq!(patient.email, None);
    }

    #[test]
    fn patient_blank_name_rejected() {
        let conn = test_db();
        let err = insert_patient(&conn, &NewPatient::named("   ")).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[test]
    fn missing_patient_is_none() {
        let conn = test_db();
        assert!(get_patient(&conn, 999).unwrap().is_none());
        assert!(!patient_exists(&conn, 999).unwrap());
    }

    #[test]
    fn doctor_roundtrip_and_delete() {
        let conn = test_db();
        let id = insert_doctor(
            &conn,
            &NewDoctor {
                specialization: Some("cardiology".into()),
                ..NewDoctor::named("Dr. Salma")
            },
        )
        .unwrap();

        let doctors = list_doctors(&conn).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].specialization.as_deref(), Some("cardiology"));

        delete_doctor(&conn, id).unwrap();
        assert!(list_doctors(&conn).unwrap().is_empty());

        let err = delete_doctor(&conn, id).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "doctor", .. }));
    }

    #[test]
    fn doctors_listed_by_name() {
        let conn = test_db();
        insert_doctor(&conn, &NewDoctor::named("Ziad")).unwrap();
        insert_doctor(&conn, &NewDoctor::named("Amal")).unwrap();

        let names: Vec<_> = list_doctors(&conn).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Amal", "Ziad"]);
    }

    #[test]
    fn duplicate_visit_doctor_pair_is_conflict() {
        let conn = test_db();
        let patient = insert_patient(&conn, &NewPatient::named("Ahmed")).unwrap();
        let doctor = insert_doctor(&conn, &NewDoctor::named("Dr. Salma")).unwrap();
        let visit = insert_visit(&conn, patient, &NewVisit::default(), Some(doctor)).unwrap();

        insert_visit_doctor(&conn, visit, doctor, "primary", true, None).unwrap();
        let err = insert_visit_doctor(&conn, visit, doctor, "consultant", false, None).unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        // First row unaffected.
        let rows = list_visit_doctors(&conn, visit).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, "primary");
        assert!(rows[0].is_primary);
    }

    #[test]
    fn appointment_status_update_and_not_found() {
        let conn = test_db();
        let patient = insert_patient(&conn, &NewPatient::named("Mona")).unwrap();
        let id = insert_appointment(
            &conn,
            patient,
            &NewAppointment {
                appointment_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                appointment_time: "10:30".into(),
                reason: Some("follow-up".into()),
                status: None,
                notes: None,
            },
        )
        .unwrap();

        let list = list_appointments(&conn).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].appointment.status, APPOINTMENT_SCHEDULED);
        assert_eq!(list[0].patient_name, "Mona");

        update_appointment_status(&conn, id, "completed").unwrap();
        let list = list_appointments(&conn).unwrap();
        assert_eq!(list[0].appointment.status, "completed");

        let err = update_appointment_status(&conn, 999, "cancelled").unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "appointment", .. }));

        delete_appointment(&conn, id).unwrap();
        let err = delete_appointment(&conn, id).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn clinic_settings_partial_update() {
        let conn = test_db();
        let before = get_clinic_settings(&conn).unwrap();
        assert_eq!(before.clinic_name, "Medical Clinic");

        update_clinic_settings(
            &conn,
            &ClinicSettingsUpdate {
                clinic_name: Some("Nile Clinic".into()),
                clinic_phone: Some("0100".into()),
                ..ClinicSettingsUpdate::default()
            },
        )
        .unwrap();

        let after = get_clinic_settings(&conn).unwrap();
        assert_eq!(after.clinic_name, "Nile Clinic");
        assert_eq!(after.clinic_phone.as_deref(), Some("0100"));
        // Untouched fields keep their previous values.
        assert_eq!(after.header_text, before.header_text);
    }

    #[test]
    fn visit_payments_listed_in_order() {
        let conn = test_db();
        let patient = insert_patient(&conn, &NewPatient::named("Ahmed")).unwrap();
        let visit = insert_visit(
            &conn,
            patient,
            &NewVisit {
                total_cost: 500.0,
                ..NewVisit::default()
            },
            None,
        )
        .unwrap();

        insert_payment(&conn, visit, 100.0, Some("cash"), None).unwrap();
        insert_payment(&conn, visit, 50.0, Some("card"), Some("copay")).unwrap();

        let payments = list_visit_payments(&conn, visit).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].amount, 100.0);
        assert_eq!(payments[1].payment_method.as_deref(), Some("card"));
    }
}
