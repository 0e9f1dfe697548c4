use serde::{Deserialize, Serialize};

/// Singleton clinic display metadata (row id fixed at 1). Seeded with
/// defaults on first open; always present afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: i64,
    pub clinic_name: String,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub clinic_email: Option<String>,
    pub header_text: String,
    pub footer_text: String,
    pub logo_path: Option<String>,
}

/// Partial update for the settings row — only `Some` fields overwrite the
/// stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicSettingsUpdate {
    pub clinic_name: Option<String>,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub clinic_email: Option<String>,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub logo_path: Option<String>,
}
