//! Clinic store — the single handle the presentation layer talks to.
//!
//! Wraps one SQLite connection behind a mutex; every operation that
//! touches more than one table (visit recording with doctors and an
//! initial payment, payment append with running-total update, the patient
//! delete cascade) runs inside one `rusqlite::Transaction`, so concurrent
//! callers never observe a partially applied unit of work. The schema
//! migration barrier runs inside [`ClinicStore::open`] before the handle
//! exists — no operation can reach an unmigrated table.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::repository::{self, CascadeSummary};
use crate::db::{sqlite, DatabaseError};
use crate::models::*;
use crate::reports::{self, ClinicTotals, DashboardStats, Debtor, PatientSummary};

const DEFAULT_PAYMENT_METHOD: &str = "cash";
const PRIMARY_ROLE: &str = "primary";
const PARTICIPATING_ROLE: &str = "participating";

pub struct ClinicStore {
    conn: Mutex<Connection>,
    /// Backing file, if any; in-memory stores cannot be snapshotted.
    path: Option<PathBuf>,
}

impl ClinicStore {
    /// Open (or create) the clinic database at `path`. Fails if any
    /// table's schema cannot be safely brought up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = sqlite::open_database(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an isolated in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = sqlite::open_memory_database()?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panicked holder cannot leave a half-applied unit of work
        // behind: transactions roll back on drop.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- patients ----------------------------------------------------------

    pub fn create_patient(&self, patient: &NewPatient) -> Result<i64, DatabaseError> {
        repository::insert_patient(&self.lock(), patient)
    }

    pub fn get_patient(&self, id: i64) -> Result<Option<Patient>, DatabaseError> {
        repository::get_patient(&self.lock(), id)
    }

    /// All patients with charge/paid/debt totals, newest first.
    pub fn list_patients(&self) -> Result<Vec<PatientSummary>, DatabaseError> {
        reports::list_patient_summaries(&self.lock())
    }

    pub fn search_patients(&self, query: &str) -> Result<Vec<PatientSummary>, DatabaseError> {
        reports::search_patients(&self.lock(), query)
    }

    pub fn search_patients_by_date(
        &self,
        query: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PatientSummary>, DatabaseError> {
        reports::search_patients_by_date(&self.lock(), query, start_date, end_date)
    }

    /// Delete a patient and cascade to its payments, visits and
    /// appointments as one atomic unit. All-or-nothing: an interrupted
    /// cascade removes no rows.
    pub fn delete_patient(&self, id: i64) -> Result<CascadeSummary, DatabaseError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let summary = repository::cascade_delete_patient(&tx, id)?;
        tx.commit()?;
        tracing::info!(
            patient_id = id,
            payments = summary.payments,
            visits = summary.visits,
            appointments = summary.appointments,
            "patient deleted with cascade"
        );
        Ok(summary)
    }

    // -- visits and payments -----------------------------------------------

    /// Record a visit: the visit row, the primary doctor link, the
    /// participating doctor links and (when `paid_amount > 0`) the
    /// initial payment, committed together or not at all.
    pub fn record_visit(
        &self,
        patient_id: i64,
        visit: &NewVisit,
        primary_doctor_id: Option<i64>,
        participating: &[VisitDoctorEntry],
    ) -> Result<i64, DatabaseError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        if !repository::patient_exists(&tx, patient_id)? {
            return Err(DatabaseError::NotFound {
                entity: "patient",
                id: patient_id,
            });
        }

        let visit_id = repository::insert_visit(&tx, patient_id, visit, primary_doctor_id)?;

        if let Some(doctor_id) = primary_doctor_id {
            repository::insert_visit_doctor(&tx, visit_id, doctor_id, PRIMARY_ROLE, true, None)?;
        }
        for entry in participating {
            if Some(entry.doctor_id) == primary_doctor_id {
                continue;
            }
            repository::insert_visit_doctor(
                &tx,
                visit_id,
                entry.doctor_id,
                entry.role.as_deref().unwrap_or(PARTICIPATING_ROLE),
                false,
                entry.notes.as_deref(),
            )?;
        }

        if visit.paid_amount > 0.0 {
            repository::insert_payment(
                &tx,
                visit_id,
                visit.paid_amount,
                Some(
                    visit
                        .payment_method
                        .as_deref()
                        .unwrap_or(DEFAULT_PAYMENT_METHOD),
                ),
                Some("initial payment"),
            )?;
        }

        tx.commit()?;
        Ok(visit_id)
    }

    pub fn get_visit(&self, id: i64) -> Result<Option<Visit>, DatabaseError> {
        repository::get_visit(&self.lock(), id)
    }

    pub fn get_patient_visits(&self, patient_id: i64) -> Result<Vec<Visit>, DatabaseError> {
        repository::list_patient_visits(&self.lock(), patient_id)
    }

    pub fn get_visit_doctors(&self, visit_id: i64) -> Result<Vec<VisitDoctor>, DatabaseError> {
        repository::list_visit_doctors(&self.lock(), visit_id)
    }

    pub fn get_visit_payments(&self, visit_id: i64) -> Result<Vec<Payment>, DatabaseError> {
        repository::list_visit_payments(&self.lock(), visit_id)
    }

    /// Append a payment and advance the visit's stored running total in
    /// the same transaction. Amounts must be strictly positive; refunds
    /// are out of scope.
    pub fn add_payment(
        &self,
        visit_id: i64,
        amount: f64,
        method: Option<&str>,
        notes: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        if amount <= 0.0 {
            return Err(DatabaseError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        if !repository::visit_exists(&tx, visit_id)? {
            return Err(DatabaseError::NotFound {
                entity: "visit",
                id: visit_id,
            });
        }

        let payment_id = repository::insert_payment(
            &tx,
            visit_id,
            amount,
            Some(method.unwrap_or(DEFAULT_PAYMENT_METHOD)),
            notes,
        )?;
        repository::increment_paid_amount(&tx, visit_id, amount)?;

        tx.commit()?;
        Ok(payment_id)
    }

    // -- doctors -----------------------------------------------------------

    pub fn create_doctor(&self, doctor: &NewDoctor) -> Result<i64, DatabaseError> {
        repository::insert_doctor(&self.lock(), doctor)
    }

    pub fn get_doctor(&self, id: i64) -> Result<Option<Doctor>, DatabaseError> {
        repository::get_doctor(&self.lock(), id)
    }

    pub fn list_doctors(&self) -> Result<Vec<Doctor>, DatabaseError> {
        repository::list_doctors(&self.lock())
    }

    pub fn delete_doctor(&self, id: i64) -> Result<(), DatabaseError> {
        repository::delete_doctor(&self.lock(), id)
    }

    // -- appointments ------------------------------------------------------

    pub fn create_appointment(
        &self,
        patient_id: i64,
        appointment: &NewAppointment,
    ) -> Result<i64, DatabaseError> {
        let conn = self.lock();
        if !repository::patient_exists(&conn, patient_id)? {
            return Err(DatabaseError::NotFound {
                entity: "patient",
                id: patient_id,
            });
        }
        repository::insert_appointment(&conn, patient_id, appointment)
    }

    pub fn list_appointments(&self) -> Result<Vec<AppointmentWithPatient>, DatabaseError> {
        repository::list_appointments(&self.lock())
    }

    pub fn update_appointment_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<(), DatabaseError> {
        repository::update_appointment_status(&self.lock(), id, status)
    }

    pub fn delete_appointment(&self, id: i64) -> Result<(), DatabaseError> {
        repository::delete_appointment(&self.lock(), id)
    }

    // -- settings and reports ----------------------------------------------

    pub fn clinic_settings(&self) -> Result<ClinicSettings, DatabaseError> {
        repository::get_clinic_settings(&self.lock())
    }

    pub fn update_clinic_settings(
        &self,
        update: &ClinicSettingsUpdate,
    ) -> Result<(), DatabaseError> {
        repository::update_clinic_settings(&self.lock(), update)
    }

    pub fn get_patient_debt(&self, patient_id: i64) -> Result<f64, DatabaseError> {
        reports::patient_debt(&self.lock(), patient_id)
    }

    pub fn clinic_totals(&self) -> Result<ClinicTotals, DatabaseError> {
        reports::clinic_totals(&self.lock())
    }

    pub fn dashboard_stats(&self) -> Result<DashboardStats, DatabaseError> {
        reports::dashboard_stats(&self.lock())
    }

    pub fn top_debtors(&self, limit: u32) -> Result<Vec<Debtor>, DatabaseError> {
        reports::top_debtors(&self.lock(), limit)
    }

    // -- snapshot export ----------------------------------------------------

    /// Copy the persisted database file to `dest` for download. Holds the
    /// store lock for the duration so no write lands mid-copy.
    pub fn snapshot_to(&self, dest: impl AsRef<Path>) -> Result<(), DatabaseError> {
        let source = self.path.as_deref().ok_or_else(|| {
            DatabaseError::Validation("in-memory store has no snapshot source".to_string())
        })?;

        let _guard = self.lock();
        std::fs::copy(source, dest.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ClinicStore {
        // RUST_LOG=clinic_ledger=info surfaces migration/cascade logs.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        ClinicStore::open_in_memory().unwrap()
    }

    fn visit_costing(total: f64, paid: f64) -> NewVisit {
        NewVisit {
            total_cost: total,
            paid_amount: paid,
            ..NewVisit::default()
        }
    }

    #[test]
    fn payment_reduces_patient_debt() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let visit = store
            .record_visit(patient, &visit_costing(500.0, 0.0), None, &[])
            .unwrap();

        store.add_payment(visit, 200.0, None, None).unwrap();

        assert_eq!(store.get_patient_debt(patient).unwrap(), 300.0);
        let visit = store.get_visit(visit).unwrap().unwrap();
        assert_eq!(visit.paid_amount, 200.0);
        assert_eq!(visit.remaining(), 300.0);
    }

    #[test]
    fn paid_amount_stays_reconciled_with_ledger() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let visit_id = store
            .record_visit(patient, &visit_costing(500.0, 100.0), None, &[])
            .unwrap();
        store.add_payment(visit_id, 150.0, Some("card"), None).unwrap();

        let ledger_sum: f64 = store
            .get_visit_payments(visit_id)
            .unwrap()
            .iter()
            .map(|p| p.amount)
            .sum();
        let visit = store.get_visit(visit_id).unwrap().unwrap();
        assert_eq!(ledger_sum, visit.paid_amount);
        assert_eq!(ledger_sum, 250.0);
    }

    #[test]
    fn record_visit_with_initial_payment_appends_ledger_entry() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let visit_id = store
            .record_visit(patient, &visit_costing(500.0, 200.0), None, &[])
            .unwrap();

        let payments = store.get_visit_payments(visit_id).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, 200.0);
        assert_eq!(payments[0].payment_method.as_deref(), Some("cash"));
        assert_eq!(payments[0].notes.as_deref(), Some("initial payment"));
    }

    #[test]
    fn record_visit_links_primary_and_participating_doctors() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let d1 = store.create_doctor(&NewDoctor::named("Dr. Salma")).unwrap();
        let d2 = store.create_doctor(&NewDoctor::named("Dr. Karim")).unwrap();

        let visit_id = store
            .record_visit(
                patient,
                &visit_costing(500.0, 0.0),
                Some(d1),
                &[VisitDoctorEntry::new(d2)],
            )
            .unwrap();

        let doctors = store.get_visit_doctors(visit_id).unwrap();
        assert_eq!(doctors.len(), 2);
        assert_eq!(doctors[0].doctor_id, d1);
        assert!(doctors[0].is_primary);
        assert_eq!(doctors[0].role, "primary");
        assert_eq!(doctors[1].doctor_id, d2);
        assert!(!doctors[1].is_primary);
    }

    #[test]
    fn record_visit_skips_participant_equal_to_primary() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let d1 = store.create_doctor(&NewDoctor::named("Dr. Salma")).unwrap();

        let visit_id = store
            .record_visit(
                patient,
                &visit_costing(100.0, 0.0),
                Some(d1),
                &[VisitDoctorEntry::new(d1)],
            )
            .unwrap();

        assert_eq!(store.get_visit_doctors(visit_id).unwrap().len(), 1);
    }

    #[test]
    fn record_visit_rolls_back_on_duplicate_participant() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let d1 = store.create_doctor(&NewDoctor::named("Dr. Salma")).unwrap();
        let d2 = store.create_doctor(&NewDoctor::named("Dr. Karim")).unwrap();

        let err = store
            .record_visit(
                patient,
                &visit_costing(500.0, 200.0),
                Some(d1),
                &[VisitDoctorEntry::new(d2), VisitDoctorEntry::new(d2)],
            )
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        // Nothing committed: no visit, no links, no initial payment.
        assert!(store.get_patient_visits(patient).unwrap().is_empty());
        let totals = store.clinic_totals().unwrap();
        assert_eq!(totals.total_visits, 0);
        assert_eq!(totals.total_collected, 0.0);
    }

    #[test]
    fn record_visit_for_missing_patient_is_not_found() {
        let store = store();
        let err = store
            .record_visit(999, &visit_costing(100.0, 0.0), None, &[])
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "patient", .. }));
    }

    #[test]
    fn add_payment_rejects_non_positive_amounts() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let visit = store
            .record_visit(patient, &visit_costing(100.0, 0.0), None, &[])
            .unwrap();

        for amount in [0.0, -50.0] {
            let err = store.add_payment(visit, amount, None, None).unwrap_err();
            assert!(matches!(err, DatabaseError::Validation(_)));
        }
        assert!(store.get_visit_payments(visit).unwrap().is_empty());
    }

    #[test]
    fn add_payment_to_missing_visit_is_not_found() {
        let store = store();
        let err = store.add_payment(999, 50.0, None, None).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "visit", .. }));
    }

    #[test]
    fn delete_patient_cascades_exact_counts() {
        let store = store();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        let keeper = store.create_patient(&NewPatient::named("Mona")).unwrap();

        let v1 = store
            .record_visit(patient, &visit_costing(500.0, 100.0), None, &[])
            .unwrap();
        let v2 = store
            .record_visit(patient, &visit_costing(300.0, 0.0), None, &[])
            .unwrap();
        store.add_payment(v1, 50.0, None, None).unwrap();
        store.add_payment(v2, 25.0, None, None).unwrap();
        store
            .create_appointment(
                patient,
                &NewAppointment {
                    appointment_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    appointment_time: "09:00".into(),
                    reason: None,
                    status: None,
                    notes: None,
                },
            )
            .unwrap();
        store
            .record_visit(keeper, &visit_costing(200.0, 0.0), None, &[])
            .unwrap();

        let summary = store.delete_patient(patient).unwrap();
        assert_eq!(
            summary,
            CascadeSummary {
                payments: 3,
                visits: 2,
                appointments: 1
            }
        );

        assert!(store.get_patient(patient).unwrap().is_none());
        // Unrelated patient untouched.
        assert_eq!(store.get_patient_visits(keeper).unwrap().len(), 1);
        assert_eq!(store.clinic_totals().unwrap().total_visits, 1);
    }

    #[test]
    fn delete_missing_patient_is_not_found() {
        let store = store();
        let err = store.delete_patient(4242).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "patient", .. }));
    }

    #[test]
    fn appointment_requires_existing_patient() {
        let store = store();
        let err = store
            .create_appointment(
                7,
                &NewAppointment {
                    appointment_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    appointment_time: "09:00".into(),
                    reason: None,
                    status: None,
                    notes: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { entity: "patient", .. }));
    }

    #[test]
    fn settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");

        {
            let store = ClinicStore::open(&path).unwrap();
            store
                .update_clinic_settings(&ClinicSettingsUpdate {
                    clinic_name: Some("Nile Clinic".into()),
                    ..ClinicSettingsUpdate::default()
                })
                .unwrap();
        }

        let store = ClinicStore::open(&path).unwrap();
        assert_eq!(store.clinic_settings().unwrap().clinic_name, "Nile Clinic");
    }

    #[test]
    fn snapshot_copies_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let snapshot = dir.path().join("backup.db");

        let store = ClinicStore::open(&path).unwrap();
        let patient = store.create_patient(&NewPatient::named("Ahmed")).unwrap();
        store.snapshot_to(&snapshot).unwrap();

        let restored = ClinicStore::open(&snapshot).unwrap();
        assert_eq!(
            restored.get_patient(patient).unwrap().unwrap().name,
            "Ahmed"
        );
    }

    #[test]
    fn in_memory_store_cannot_snapshot() {
        let store = store();
        let err = store.snapshot_to("/tmp/nowhere.db").unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }
}
