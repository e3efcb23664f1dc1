// models/src/hospital.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry in the `hospitals` collection, deduplicated by name at doctor
/// registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Hospital {
    pub fn new(name: impl Into<String>, added_at: DateTime<Utc>) -> Self {
        Hospital {
            name: name.into(),
            added_at,
            is_active: true,
        }
    }
}
