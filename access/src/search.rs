// access/src/search.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use models::{Appointment, PatientAccount, PatientIdentity, PatientRecord, Provenance};
use storage::{collections, DocumentStore};

use crate::errors::Result;

/// Contact field the operator searches by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupKey {
    Email,
    Phone,
}

impl LookupKey {
    /// Field name in the `patients` and `users` collections.
    pub fn contact_field(&self) -> &'static str {
        match self {
            LookupKey::Email => "email",
            LookupKey::Phone => "phone",
        }
    }

    /// Field name in the `appointments` collection.
    pub fn appointment_field(&self) -> &'static str {
        match self {
            LookupKey::Email => "patientEmail",
            LookupKey::Phone => "patientPhone",
        }
    }
}

/// Resolves a contact to a patient record across the three sources.
///
/// Precedence is fixed: canonical `patients` records, then patient-owned
/// `users` accounts, then an identity derived from the operator's own
/// appointment history. First non-empty source wins; sources are never
/// merged. Derived matches are scoped to the operator's organization.
pub(crate) async fn resolve_patient(
    store: &dyn DocumentStore,
    operator_org: &str,
    key: LookupKey,
    value: &str,
) -> Result<Option<PatientRecord>> {
    let needle = Value::String(value.to_string());

    let hits = store.find(collections::PATIENTS, key.contact_field(), &needle).await?;
    if let Some(doc) = hits.first() {
        let identity: PatientIdentity = doc.decode()?;
        return Ok(Some(PatientRecord {
            identity,
            provenance: Provenance::Stored { id: doc.id.clone() },
        }));
    }

    let hits = store.find(collections::USERS, key.contact_field(), &needle).await?;
    if let Some(doc) = hits.first() {
        let account: PatientAccount = doc.decode()?;
        return Ok(Some(PatientRecord {
            identity: account.identity(),
            provenance: Provenance::ExternalUser { id: doc.id.clone() },
        }));
    }

    let hits = store
        .find(collections::APPOINTMENTS, key.appointment_field(), &needle)
        .await?;
    for doc in &hits {
        let appointment: Appointment = doc.decode()?;
        if appointment.hospital_name == operator_org {
            return Ok(Some(PatientRecord {
                identity: PatientIdentity {
                    name: appointment.patient_name,
                    email: appointment.patient_email,
                    phone: appointment.patient_phone,
                    history: None,
                },
                provenance: Provenance::AppointmentDerived {
                    appointment_id: doc.id.clone(),
                },
            }));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::InMemoryStore;

    async fn seed_appointment(store: &InMemoryStore, id: &str, email: &str, hospital: &str) {
        store
            .seed(
                collections::APPOINTMENTS,
                id,
                json!({
                    "patientName": "Jane Roe",
                    "patientEmail": email,
                    "patientPhone": "555-0100",
                    "appointmentDate": "2025-03-14",
                    "appointmentTime": "10:30",
                    "reason": "checkup",
                    "status": "confirmed",
                    "hospitalName": hospital,
                }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_prefer_stored_over_all_other_sources() {
        let store = InMemoryStore::new();
        store
            .seed(collections::PATIENTS, "p1", json!({"name": "Jane Roe", "email": "j@x.com"}))
            .await
            .unwrap();
        store
            .seed(collections::USERS, "u1", json!({"name": "Jane Roe", "email": "j@x.com"}))
            .await
            .unwrap();
        seed_appointment(&store, "A1", "j@x.com", "Acme").await;

        let record = resolve_patient(&store, "Acme", LookupKey::Email, "j@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.provenance, Provenance::Stored { id: "p1".to_string() });
    }

    #[tokio::test]
    async fn should_fall_back_to_external_user_before_deriving() {
        let store = InMemoryStore::new();
        store
            .seed(collections::USERS, "u1", json!({"name": "Jane Roe", "email": "j@x.com"}))
            .await
            .unwrap();
        seed_appointment(&store, "A1", "j@x.com", "Acme").await;

        let record = resolve_patient(&store, "Acme", LookupKey::Email, "j@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.provenance, Provenance::ExternalUser { id: "u1".to_string() });
    }

    #[tokio::test]
    async fn should_derive_from_own_org_appointments_last() {
        let store = InMemoryStore::new();
        seed_appointment(&store, "A1", "j@x.com", "Acme").await;

        let record = resolve_patient(&store, "Acme", LookupKey::Email, "j@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            record.provenance,
            Provenance::AppointmentDerived { appointment_id: "A1".to_string() }
        );
        assert_eq!(record.identity.name, "Jane Roe");
        assert_eq!(record.identity.email, "j@x.com");
        assert_eq!(record.identity.phone.as_deref(), Some("555-0100"));
        assert!(record.identity.history.is_none());
    }

    #[tokio::test]
    async fn should_not_derive_from_other_organizations() {
        let store = InMemoryStore::new();
        seed_appointment(&store, "A1", "j@x.com", "Other Clinic").await;

        let record = resolve_patient(&store, "Acme", LookupKey::Email, "j@x.com")
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn should_search_by_phone_field() {
        let store = InMemoryStore::new();
        store
            .seed(
                collections::PATIENTS,
                "p1",
                json!({"name": "Jane Roe", "email": "j@x.com", "phone": "555-0100"}),
            )
            .await
            .unwrap();

        let record = resolve_patient(&store, "Acme", LookupKey::Phone, "555-0100")
            .await
            .unwrap()
            .unwrap();
        assert!(record.is_stored());
    }
}
