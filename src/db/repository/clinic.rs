use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{ClinicSettings, ClinicSettingsUpdate};

/// The settings singleton. Seeded at open, so absence means the store was
/// bypassed — surfaced as not-found rather than silently recreated.
pub fn get_clinic_settings(conn: &Connection) -> Result<ClinicSettings, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, clinic_name, clinic_address, clinic_phone, clinic_email,
                header_text, footer_text, logo_path
         FROM clinic_settings WHERE id = 1",
        [],
        |row| {
            Ok(ClinicSettings {
                id: row.get(0)?,
                clinic_name: row.get(1)?,
                clinic_address: row.get(2)?,
                clinic_phone: row.get(3)?,
                clinic_email: row.get(4)?,
                header_text: row.get(5)?,
                footer_text: row.get(6)?,
                logo_path: row.get(7)?,
            })
        },
    );

    match result {
        Ok(settings) => Ok(settings),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(DatabaseError::NotFound {
            entity: "clinic_settings",
            id: 1,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Overwrite only the supplied fields; `None` keeps the stored value.
pub fn update_clinic_settings(
    conn: &Connection,
    update: &ClinicSettingsUpdate,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE clinic_settings
         SET clinic_name = COALESCE(?1, clinic_name),
             clinic_address = COALESCE(?2, clinic_address),
             clinic_phone = COALESCE(?3, clinic_phone),
             clinic_email = COALESCE(?4, clinic_email),
             header_text = COALESCE(?5, header_text),
             footer_text = COALESCE(?6, footer_text),
             logo_path = COALESCE(?7, logo_path)
         WHERE id = 1",
        params![
            update.clinic_name,
            update.clinic_address,
            update.clinic_phone,
            update.clinic_email,
            update.header_text,
            update.footer_text,
            update.logo_path,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity: "clinic_settings",
            id: 1,
        });
    }
    Ok(())
}
