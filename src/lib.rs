//! Clinic ledger — the record store behind a small clinic application.
//!
//! Owns the SQLite schema for patients, doctors, visits, appointments and
//! the payment ledger, evolves that schema in place on startup without
//! losing rows, and computes all financial figures (debts, collections,
//! clinic totals) fresh from source rows on every read.
//!
//! The presentation layer (routing, templates, export formatting) lives
//! elsewhere and consumes this crate only through [`store::ClinicStore`].

pub mod db;
pub mod models;
pub mod reports;
pub mod store;

pub use db::DatabaseError;
pub use store::ClinicStore;
