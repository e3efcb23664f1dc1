// models/src/account.rs

use serde::{Deserialize, Serialize};

use crate::patient::PatientIdentity;
use crate::upload::UploadRecord;

/// Patient-owned account as stored in the `users` collection.
///
/// The embedded `uploads` list is owned by the patient's own app; the
/// dashboard only appends to it (prescription mirroring) and reads it for
/// the uploads tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAccount {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default)]
    pub uploads: Vec<UploadRecord>,
}

impl PatientAccount {
    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            history: self.history.clone(),
        }
    }
}
