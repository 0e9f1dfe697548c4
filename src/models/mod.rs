//! Domain model types — one file per persisted entity.
//!
//! Identifiers are SQLite rowids (`i64`), assigned by the store on insert.
//! `New*` structs carry caller-supplied fields for inserts; the persisted
//! structs mirror full table rows.

pub mod appointment;
pub mod clinic;
pub mod doctor;
pub mod patient;
pub mod payment;
pub mod visit;

pub use appointment::*;
pub use clinic::*;
pub use doctor::*;
pub use patient::*;
pub use payment::*;
pub use visit::*;
