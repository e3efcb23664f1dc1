// models/src/doctor.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator profile as stored in the `doctors` collection.
///
/// Field names follow the platform's wire format (camelCase), so a document
/// written by any other client of the same store round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub name: String,
    pub email: String,
    pub hospital: String,
    pub phone: String,
    pub specialty: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Doctor {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        hospital: impl Into<String>,
        phone: impl Into<String>,
        specialty: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Doctor {
            name: name.into(),
            email: email.into(),
            hospital: hospital.into(),
            phone: phone.into(),
            specialty: specialty.into(),
            created_at,
            is_active: true,
        }
    }
}
