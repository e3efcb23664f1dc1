// models/src/upload.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry in a patient account's embedded upload list.
///
/// When the dashboard mirrors a prescription image here, `id` equals the
/// prescription's document id so the two can be correlated later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub uri: String,
    pub severity: String,
    pub hospital: String,
    pub uploaded_at: DateTime<Utc>,
}
