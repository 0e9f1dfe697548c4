//! Schema catalog — the column set the current application code expects
//! for every persisted table.
//!
//! Pure and static: no I/O, no failure mode. The migrator
//! ([`super::migrate`]) compares live tables against these specs and
//! evolves them forward; each spec carries an explicit version counter
//! that is recorded per table only after a verified migration.

/// One column of a table spec. `decl` is the SQL type plus any column
/// constraints (NOT NULL, PRIMARY KEY); `default` is the declared default
/// value, rendered verbatim into the DEFAULT clause.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub decl: &'static str,
    pub default: Option<&'static str>,
}

const fn col(name: &'static str, decl: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        decl,
        default: None,
    }
}

const fn col_default(
    name: &'static str,
    decl: &'static str,
    default: &'static str,
) -> ColumnSpec {
    ColumnSpec {
        name,
        decl,
        default: Some(default),
    }
}

/// Full required shape of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    /// Advanced whenever columns are added; recorded in `schema_versions`
    /// after a verified migration so unchanged tables skip the column diff.
    pub version: i64,
    pub columns: &'static [ColumnSpec],
    /// Table-level constraints (foreign keys, UNIQUE pairs), appended after
    /// the column list.
    pub constraints: &'static [&'static str],
}

impl TableSpec {
    /// Render the full CREATE TABLE statement for a fresh table.
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| match c.default {
                Some(d) => format!("{} {} DEFAULT {}", c.name, c.decl, d),
                None => format!("{} {}", c.name, c.decl),
            })
            .collect();
        parts.extend(self.constraints.iter().map(|s| s.to_string()));
        format!("CREATE TABLE {} (\n    {}\n)", self.name, parts.join(",\n    "))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    pub fn backup_name(&self) -> String {
        format!("{}_backup", self.name)
    }
}

/// Version 2 reflects the demographic/medical expansion (email,
/// national_id, blood_type, allergies and friends) that older databases
/// in the field predate.
pub const PATIENTS: TableSpec = TableSpec {
    name: "patients",
    version: 2,
    columns: &[
        col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
        col("name", "TEXT NOT NULL"),
        col("age", "INTEGER"),
        col("gender", "TEXT"),
        col("phone", "TEXT"),
        col("address", "TEXT"),
        col("email", "TEXT"),
        col("national_id", "TEXT"),
        col("blood_type", "TEXT"),
        col("allergies", "TEXT"),
        col("chronic_diseases", "TEXT"),
        col("current_medications", "TEXT"),
        col("emergency_contact", "TEXT"),
        col("emergency_phone", "TEXT"),
        col("insurance_company", "TEXT"),
        col("insurance_number", "TEXT"),
        col("notes", "TEXT"),
        col_default("created_date", "TIMESTAMP", "CURRENT_TIMESTAMP"),
    ],
    constraints: &[],
};

pub const DOCTORS: TableSpec = TableSpec {
    name: "doctors",
    version: 1,
    columns: &[
        col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
        col("name", "TEXT NOT NULL"),
        col("specialization", "TEXT"),
        col("phone", "TEXT"),
        col("email", "TEXT"),
        col("license_number", "TEXT"),
        col_default("created_date", "TIMESTAMP", "CURRENT_TIMESTAMP"),
    ],
    constraints: &[],
};

/// Version 2 reflects the clinical-detail expansion (symptoms, vital
/// signs, prescriptions, lab tests) plus the legacy primary doctor column.
pub const VISITS: TableSpec = TableSpec {
    name: "visits",
    version: 2,
    columns: &[
        col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
        col("patient_id", "INTEGER NOT NULL"),
        col("doctor_id", "INTEGER"),
        col_default("visit_date", "TIMESTAMP", "CURRENT_TIMESTAMP"),
        col("diagnosis", "TEXT"),
        col("symptoms", "TEXT"),
        col("treatment", "TEXT"),
        col("prescriptions", "TEXT"),
        col("lab_tests", "TEXT"),
        col("vital_signs", "TEXT"),
        col("notes", "TEXT"),
        col_default("total_cost", "REAL", "0"),
        col_default("paid_amount", "REAL", "0"),
        col("next_visit_date", "TEXT"),
    ],
    // doctor_id is deliberately unconstrained: deleting a doctor leaves a
    // dangling reference that read paths tolerate.
    constraints: &["FOREIGN KEY (patient_id) REFERENCES patients (id)"],
};

pub const VISIT_DOCTORS: TableSpec = TableSpec {
    name: "visit_doctors",
    version: 1,
    columns: &[
        col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
        col("visit_id", "INTEGER NOT NULL"),
        col("doctor_id", "INTEGER NOT NULL"),
        col_default("role", "TEXT", "'participating'"),
        col_default("is_primary", "INTEGER", "0"),
        col("notes", "TEXT"),
    ],
    constraints: &[
        "FOREIGN KEY (visit_id) REFERENCES visits (id) ON DELETE CASCADE",
        "UNIQUE(visit_id, doctor_id)",
    ],
};

pub const APPOINTMENTS: TableSpec = TableSpec {
    name: "appointments",
    version: 1,
    columns: &[
        col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
        col("patient_id", "INTEGER NOT NULL"),
        col("appointment_date", "TEXT NOT NULL"),
        col("appointment_time", "TEXT NOT NULL"),
        col("reason", "TEXT"),
        col_default("status", "TEXT", "'scheduled'"),
        col("notes", "TEXT"),
        col_default("created_date", "TIMESTAMP", "CURRENT_TIMESTAMP"),
    ],
    constraints: &["FOREIGN KEY (patient_id) REFERENCES patients (id)"],
};

pub const PAYMENTS: TableSpec = TableSpec {
    name: "payments",
    version: 1,
    columns: &[
        col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
        col("visit_id", "INTEGER NOT NULL"),
        col_default("payment_date", "TIMESTAMP", "CURRENT_TIMESTAMP"),
        col("amount", "REAL NOT NULL"),
        col("payment_method", "TEXT"),
        col("notes", "TEXT"),
    ],
    constraints: &["FOREIGN KEY (visit_id) REFERENCES visits (id)"],
};

pub const CLINIC_SETTINGS: TableSpec = TableSpec {
    name: "clinic_settings",
    version: 1,
    columns: &[
        col("id", "INTEGER PRIMARY KEY CHECK (id = 1)"),
        col_default("clinic_name", "TEXT", "'Medical Clinic'"),
        col("clinic_address", "TEXT"),
        col("clinic_phone", "TEXT"),
        col("clinic_email", "TEXT"),
        col_default("header_text", "TEXT", "'Specialized Medical Clinic'"),
        col_default("footer_text", "TEXT", "'Wishing you continued good health'"),
        col("logo_path", "TEXT"),
    ],
    constraints: &[],
};

/// Every persisted table, parents before children so fresh creation
/// satisfies foreign keys.
pub const CATALOG: &[TableSpec] = &[
    PATIENTS,
    DOCTORS,
    VISITS,
    VISIT_DOCTORS,
    APPOINTMENTS,
    PAYMENTS,
    CLINIC_SETTINGS,
];

/// Look up the required shape of a table by name.
pub fn table_spec(name: &str) -> Option<&'static TableSpec> {
    CATALOG.iter().find(|t| t.name == name)
}
