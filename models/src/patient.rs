// models/src/patient.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal patient identity surfaced by the secure access flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientIdentity {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub history: Option<String>,
}

/// Which source a displayed patient record currently originates from.
///
/// Mutation semantics hang off this tag: only `Stored` records may be
/// updated in place, `AppointmentDerived` records have no stable identifier
/// of their own and an edit materializes a new stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum Provenance {
    #[serde(rename = "stored")]
    Stored { id: String },
    #[serde(rename = "external-user")]
    ExternalUser { id: String },
    #[serde(rename = "appointment-derived", rename_all = "camelCase")]
    AppointmentDerived { appointment_id: String },
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Stored { .. } => "stored",
            Provenance::ExternalUser { .. } => "external-user",
            Provenance::AppointmentDerived { .. } => "appointment-derived",
        }
    }
}

/// A patient record resolved by the contact search: identity plus the
/// source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(flatten)]
    pub identity: PatientIdentity,
    pub provenance: Provenance,
}

impl PatientRecord {
    pub fn is_stored(&self) -> bool {
        matches!(self.provenance, Provenance::Stored { .. })
    }
}

/// Partial edit submitted from the secure access form. `None` means the
/// field is left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientEdit {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub history: Option<String>,
}

impl PatientEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.history.is_none()
    }

    /// Folds the edit into an identity, yielding the merged result.
    pub fn apply(&self, mut identity: PatientIdentity) -> PatientIdentity {
        if let Some(ref name) = self.name {
            identity.name = name.clone();
        }
        if let Some(ref email) = self.email {
            identity.email = email.clone();
        }
        if let Some(ref phone) = self.phone {
            identity.phone = Some(phone.clone());
        }
        if let Some(ref history) = self.history {
            identity.history = Some(history.clone());
        }
        identity
    }
}

/// Document shape written to the `patients` collection when a record is
/// first materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPatientDocument {
    #[serde(flatten)]
    pub identity: PatientIdentity,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> PatientIdentity {
        PatientIdentity {
            name: "Jane Roe".to_string(),
            email: "jane@example.com".to_string(),
            phone: Some("555-0100".to_string()),
            history: None,
        }
    }

    #[test]
    fn should_tag_provenance_in_json() {
        let record = PatientRecord {
            identity: identity(),
            provenance: Provenance::AppointmentDerived {
                appointment_id: "A1".to_string(),
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["provenance"]["source"], "appointment-derived");
        assert_eq!(value["provenance"]["appointmentId"], "A1");
        assert_eq!(value["email"], "jane@example.com");
    }

    #[test]
    fn should_apply_partial_edits_only() {
        let edit = PatientEdit {
            history: Some("penicillin allergy".to_string()),
            ..PatientEdit::default()
        };
        let merged = edit.apply(identity());
        assert_eq!(merged.name, "Jane Roe");
        assert_eq!(merged.history.as_deref(), Some("penicillin allergy"));
    }

    #[test]
    fn should_detect_empty_edit() {
        assert!(PatientEdit::default().is_empty());
        let edit = PatientEdit {
            name: Some("J. Roe".to_string()),
            ..PatientEdit::default()
        };
        assert!(!edit.is_empty());
    }
}
