// models/src/prescription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One medicine line on a prescription. All fields are free text; no unit
/// validation is attempted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

impl Medicine {
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Issuer-authored prescription as stored in the `prescriptions` collection.
/// Append-only; read back in descending `createdAt` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub patient_id: String,
    pub issuer_name: String,
    pub issuer_org: String,
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
