// access/src/machine.rs

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use models::{OtpNotification, PatientEdit, PatientRecord, Provenance, StoredPatientDocument};
use storage::{collections, DocumentStore, NotificationChannel};

use crate::errors::{AccessError, Result};
use crate::otp;
use crate::search::{resolve_patient, LookupKey};
use crate::session::{apply_tick, AccessState, SessionSnapshot, SessionState, ACCESS_TTL_SECS};
use crate::timer::{SessionTimer, TickOutcome};
use crate::OperatorContext;

/// What a save did to the target record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SaveOutcome {
    /// Partial update applied to the existing stored record.
    Updated { id: String },
    /// First-write materialization: a new stored record was created from a
    /// derived or account-backed identity plus the submitted edits.
    Materialized { id: String },
    /// Empty submission; refused locally with no store call.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DeleteOutcome {
    /// The stored patient record itself was removed.
    RecordDeleted { id: String },
    /// Proxy deletion: the derived identity had no stored record, so the
    /// source appointment was removed instead.
    SourceAppointmentDeleted { appointment_id: String },
}

/// Orchestrates the consent-gated record flow:
/// `search → contact_found → verifying → accessing → (search)`.
///
/// At most one session is live per controller; a new search destroys the
/// previous one. The countdown runs only while in `accessing` and is
/// cancelled on every exit path.
#[derive(Debug)]
pub struct SecureAccessController {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn NotificationChannel>,
    operator: OperatorContext,
    session: Arc<Mutex<SessionState>>,
    timer: Mutex<SessionTimer>,
}

impl SecureAccessController {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn NotificationChannel>,
        operator: OperatorContext,
    ) -> Self {
        SecureAccessController {
            store,
            notifier,
            operator,
            session: Arc::new(Mutex::new(SessionState::new())),
            timer: Mutex::new(SessionTimer::new()),
        }
    }

    pub fn operator(&self) -> &OperatorContext {
        &self.operator
    }

    /// Current session as the shell may see it. Never carries the issued
    /// code.
    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let session = self.lock_session()?;
        Ok(SessionSnapshot {
            state: session.state,
            patient: session.target.clone(),
            remaining_seconds: session.ttl,
        })
    }

    /// Looks up a patient by contact. Any prior session is destroyed
    /// before the query goes out; on a miss the machine stays in `search`.
    pub async fn search(&self, key: LookupKey, value: &str) -> Result<PatientRecord> {
        self.end_session()?;

        let resolved =
            resolve_patient(self.store.as_ref(), &self.operator.hospital, key, value).await?;
        match resolved {
            Some(record) => {
                let mut session = self.lock_session()?;
                session.state = AccessState::ContactFound;
                session.target = Some(record.clone());
                tracing::debug!(provenance = record.provenance.label(), "contact found");
                Ok(record)
            }
            None => Err(AccessError::NotFound),
        }
    }

    /// Issues a code to the found contact and moves to `verifying`. A
    /// failed publish leaves the machine in `contact_found`; there is no
    /// retry here, re-sending is the operator's call.
    pub async fn send_otp(&self) -> Result<()> {
        let (email, epoch) = {
            let session = self.lock_session()?;
            match (session.state, &session.target) {
                (AccessState::ContactFound, Some(target)) => {
                    (target.identity.email.clone(), session.epoch)
                }
                _ => return Err(AccessError::InvalidState("send-otp requires a found contact")),
            }
        };

        let code = otp::generate_code();
        let notification = OtpNotification::access_request(
            &email,
            &code,
            &self.operator.name,
            &self.operator.hospital,
            Utc::now(),
        );
        self.notifier.publish(&notification).await?;

        let mut session = self.lock_session()?;
        if session.epoch == epoch && session.state == AccessState::ContactFound {
            session.code = Some(code);
            session.state = AccessState::Verifying;
        }
        Ok(())
    }

    /// Verbatim comparison of the submitted code. A match opens the timed
    /// edit window; a mismatch changes nothing.
    pub fn verify(&self, submitted: &str) -> Result<()> {
        let epoch = {
            let mut session = self.lock_session()?;
            if session.state != AccessState::Verifying {
                return Err(AccessError::InvalidState("verification requires a pending code"));
            }
            if session.code.as_deref() != Some(submitted) {
                return Err(AccessError::InvalidCode);
            }
            session.state = AccessState::Accessing;
            session.ttl = ACCESS_TTL_SECS;
            session.epoch
        };

        let session_handle = Arc::clone(&self.session);
        let mut timer = self.lock_timer()?;
        timer.start(move || match session_handle.lock() {
            Ok(mut session) => apply_tick(&mut session, epoch),
            Err(_) => TickOutcome::Stop,
        });
        Ok(())
    }

    /// Abandons the flow from `contact_found` or `verifying`.
    pub fn cancel(&self) -> Result<()> {
        self.end_session()
    }

    /// Manual close of the edit window. The caller is responsible for
    /// having confirmed with the operator; the reset is identical to
    /// expiry.
    pub fn close(&self) -> Result<()> {
        self.end_session()
    }

    /// Applies edits to the target record. Stored records update in place;
    /// everything else materializes a new stored record merging the
    /// original fields with the edits. State is left in `accessing`.
    pub async fn save(&self, edit: &PatientEdit) -> Result<SaveOutcome> {
        let (target, epoch) = self.accessing_target()?;

        if edit.is_empty() {
            return Ok(SaveOutcome::Unchanged);
        }

        match target.provenance {
            Provenance::Stored { ref id } => {
                self.store
                    .update(collections::PATIENTS, id, edit_partial(edit))
                    .await?;
                let mut session = self.lock_session()?;
                if session.epoch == epoch {
                    if let Some(ref mut record) = session.target {
                        record.identity = edit.apply(record.identity.clone());
                    }
                }
                Ok(SaveOutcome::Updated { id: id.clone() })
            }
            _ => {
                let merged = edit.apply(target.identity.clone());
                let document = StoredPatientDocument {
                    identity: merged.clone(),
                    created_at: Utc::now(),
                };
                let id = self
                    .store
                    .create(collections::PATIENTS, serde_json::to_value(&document)?)
                    .await?;
                tracing::info!(id = %id, from = target.provenance.label(), "materialized stored patient record");

                // Re-tag the live session so a second save updates the new
                // record instead of materializing a duplicate.
                let mut session = self.lock_session()?;
                if session.epoch == epoch && session.state == AccessState::Accessing {
                    session.target = Some(PatientRecord {
                        identity: merged,
                        provenance: Provenance::Stored { id: id.clone() },
                    });
                }
                Ok(SaveOutcome::Materialized { id })
            }
        }
    }

    /// Removes the target record, or its source appointment when the
    /// record only ever existed as a derivation. A successful delete always
    /// ends the session; a failed one leaves the window open.
    pub async fn delete(&self) -> Result<DeleteOutcome> {
        let (target, _) = self.accessing_target()?;

        let outcome = match target.provenance {
            Provenance::Stored { id } => {
                self.store.delete(collections::PATIENTS, &id).await?;
                DeleteOutcome::RecordDeleted { id }
            }
            Provenance::AppointmentDerived { appointment_id } => {
                self.store
                    .delete(collections::APPOINTMENTS, &appointment_id)
                    .await?;
                DeleteOutcome::SourceAppointmentDeleted { appointment_id }
            }
            Provenance::ExternalUser { .. } => {
                return Err(AccessError::AccountDeletionRefused);
            }
        };

        self.end_session()?;
        Ok(outcome)
    }

    fn accessing_target(&self) -> Result<(PatientRecord, u64)> {
        let session = self.lock_session()?;
        match (session.state, &session.target) {
            (AccessState::Accessing, Some(target)) => Ok((target.clone(), session.epoch)),
            _ => Err(AccessError::InvalidState("record access has not been granted")),
        }
    }

    fn end_session(&self) -> Result<()> {
        {
            let mut session = self.lock_session()?;
            session.reset();
        }
        let mut timer = self.lock_timer()?;
        timer.cancel();
        Ok(())
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.session
            .lock()
            .map_err(|e| AccessError::Lock(e.to_string()))
    }

    fn lock_timer(&self) -> Result<MutexGuard<'_, SessionTimer>> {
        self.timer
            .lock()
            .map_err(|e| AccessError::Lock(e.to_string()))
    }
}

fn edit_partial(edit: &PatientEdit) -> Value {
    let mut fields = Map::new();
    if let Some(ref name) = edit.name {
        fields.insert("name".to_string(), Value::String(name.clone()));
    }
    if let Some(ref email) = edit.email {
        fields.insert("email".to_string(), Value::String(email.clone()));
    }
    if let Some(ref phone) = edit.phone {
        fields.insert("phone".to_string(), Value::String(phone.clone()));
    }
    if let Some(ref history) = edit.history {
        fields.insert("history".to_string(), Value::String(history.clone()));
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use storage::{InMemoryStore, StorageError, StoreNotificationChannel};

    fn operator() -> OperatorContext {
        OperatorContext {
            doctor_id: "d1".to_string(),
            name: "Dr. Smith".to_string(),
            hospital: "Acme".to_string(),
        }
    }

    fn controller_over(store: Arc<InMemoryStore>) -> SecureAccessController {
        let notifier = Arc::new(StoreNotificationChannel::new(store.clone()));
        SecureAccessController::new(store, notifier, operator())
    }

    async fn seed_stored_patient(store: &InMemoryStore) {
        store
            .seed(
                collections::PATIENTS,
                "p1",
                json!({"name": "Jane Roe", "email": "j@x.com", "phone": "555-0100"}),
            )
            .await
            .unwrap();
    }

    async fn seed_derived_appointment(store: &InMemoryStore) {
        store
            .seed(
                collections::APPOINTMENTS,
                "A1",
                json!({
                    "patientName": "Jane Roe",
                    "patientEmail": "j@x.com",
                    "patientPhone": "555-0100",
                    "appointmentDate": "2025-03-14",
                    "appointmentTime": "10:30",
                    "reason": "checkup",
                    "status": "completed",
                    "hospitalName": "Acme",
                }),
            )
            .await
            .unwrap();
    }

    /// Drives search → send-otp → verify using the code captured from the
    /// published notification.
    async fn open_access(
        controller: &SecureAccessController,
        store: &InMemoryStore,
    ) -> PatientRecord {
        let record = controller.search(LookupKey::Email, "j@x.com").await.unwrap();
        controller.send_otp().await.unwrap();
        let code = issued_code(store).await;
        controller.verify(&code).unwrap();
        record
    }

    async fn issued_code(store: &InMemoryStore) -> String {
        let docs = store
            .find(collections::NOTIFICATIONS, "kind", &json!("access_request"))
            .await
            .unwrap();
        let doc = docs.last().expect("no notification published");
        doc.fields["code"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn should_walk_the_full_handshake() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());

        let record = controller.search(LookupKey::Email, "j@x.com").await.unwrap();
        assert!(record.is_stored());
        assert_eq!(controller.snapshot().unwrap().state, AccessState::ContactFound);

        controller.send_otp().await.unwrap();
        assert_eq!(controller.snapshot().unwrap().state, AccessState::Verifying);

        let code = issued_code(&store).await;
        controller.verify(&code).unwrap();

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.state, AccessState::Accessing);
        assert_eq!(snapshot.remaining_seconds, ACCESS_TTL_SECS);
    }

    #[tokio::test]
    async fn should_surface_not_found_and_stay_in_search() {
        let store = Arc::new(InMemoryStore::new());
        let controller = controller_over(store);

        let err = controller.search(LookupKey::Email, "nobody@x.com").await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound));
        assert_eq!(controller.snapshot().unwrap().state, AccessState::Search);
    }

    #[tokio::test]
    async fn should_keep_session_unchanged_on_wrong_code() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());

        controller.search(LookupKey::Email, "j@x.com").await.unwrap();
        controller.send_otp().await.unwrap();

        let before = controller.snapshot().unwrap();
        let err = controller.verify("000000").unwrap_err();
        assert!(matches!(err, AccessError::InvalidCode));

        let after = controller.snapshot().unwrap();
        assert_eq!(after.state, AccessState::Verifying);
        assert_eq!(after.patient, before.patient);

        // The real code still works afterwards.
        let code = issued_code(&store).await;
        controller.verify(&code).unwrap();
        assert_eq!(controller.snapshot().unwrap().state, AccessState::Accessing);
    }

    #[tokio::test]
    async fn should_stay_in_contact_found_when_publish_fails() {
        #[derive(Debug)]
        struct DeadChannel;

        #[async_trait]
        impl NotificationChannel for DeadChannel {
            async fn publish(&self, _n: &OtpNotification) -> storage::Result<String> {
                Err(StorageError::Backend("channel unavailable".to_string()))
            }
        }

        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller =
            SecureAccessController::new(store.clone(), Arc::new(DeadChannel), operator());

        controller.search(LookupKey::Email, "j@x.com").await.unwrap();
        let err = controller.send_otp().await.unwrap_err();
        assert!(matches!(err, AccessError::Storage(_)));
        assert_eq!(controller.snapshot().unwrap().state, AccessState::ContactFound);
    }

    #[tokio::test]
    async fn should_update_stored_records_in_place() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        let edit = PatientEdit {
            history: Some("penicillin allergy".to_string()),
            ..PatientEdit::default()
        };
        let outcome = controller.save(&edit).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Updated { id: "p1".to_string() });

        let doc = store.get(collections::PATIENTS, "p1").await.unwrap().unwrap();
        assert_eq!(doc.fields["history"], "penicillin allergy");
        assert_eq!(doc.fields["name"], "Jane Roe");

        // Still accessing; the live target reflects the edit.
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.state, AccessState::Accessing);
        assert_eq!(
            snapshot.patient.unwrap().identity.history.as_deref(),
            Some("penicillin allergy")
        );
    }

    #[tokio::test]
    async fn should_materialize_derived_records_instead_of_touching_the_source() {
        let store = Arc::new(InMemoryStore::new());
        seed_derived_appointment(&store).await;
        let controller = controller_over(store.clone());

        let record = open_access(&controller, &store).await;
        assert_eq!(
            record.provenance,
            Provenance::AppointmentDerived { appointment_id: "A1".to_string() }
        );

        let edit = PatientEdit {
            history: Some("asthma".to_string()),
            ..PatientEdit::default()
        };
        let outcome = controller.save(&edit).await.unwrap();
        let SaveOutcome::Materialized { id } = outcome else {
            panic!("expected materialization, got {outcome:?}");
        };

        // The source appointment is untouched.
        let appointment = store.get(collections::APPOINTMENTS, "A1").await.unwrap().unwrap();
        assert_eq!(appointment.fields["patientEmail"], "j@x.com");

        let patient = store.get(collections::PATIENTS, &id).await.unwrap().unwrap();
        assert_eq!(patient.fields["history"], "asthma");
        assert_eq!(patient.fields["email"], "j@x.com");
        assert!(patient.fields.get("createdAt").is_some());

        // A second save updates the materialized record, no duplicate.
        let outcome = controller
            .save(&PatientEdit {
                history: Some("asthma, mild".to_string()),
                ..PatientEdit::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Updated { id });
        assert_eq!(store.len(collections::PATIENTS).await, 1);

        // Subsequent searches now resolve to the stored record.
        let record = controller.search(LookupKey::Email, "j@x.com").await.unwrap();
        assert!(record.is_stored());
    }

    #[tokio::test]
    async fn should_refuse_empty_edits_without_store_calls() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        let outcome = controller.save(&PatientEdit::default()).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);

        let doc = store.get(collections::PATIENTS, "p1").await.unwrap().unwrap();
        assert!(doc.fields.get("history").is_none());
    }

    #[tokio::test]
    async fn should_delete_stored_records_and_end_the_session() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        let outcome = controller.delete().await.unwrap();
        assert_eq!(outcome, DeleteOutcome::RecordDeleted { id: "p1".to_string() });
        assert_eq!(store.len(collections::PATIENTS).await, 0);

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.state, AccessState::Search);
        assert!(snapshot.patient.is_none());
    }

    #[tokio::test]
    async fn should_proxy_delete_the_source_appointment_for_derived_records() {
        let store = Arc::new(InMemoryStore::new());
        seed_derived_appointment(&store).await;
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        let outcome = controller.delete().await.unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::SourceAppointmentDeleted { appointment_id: "A1".to_string() }
        );
        assert_eq!(store.len(collections::APPOINTMENTS).await, 0);
        assert_eq!(store.len(collections::PATIENTS).await, 0);
        assert_eq!(controller.snapshot().unwrap().state, AccessState::Search);
    }

    #[tokio::test]
    async fn should_refuse_deleting_patient_owned_accounts() {
        let store = Arc::new(InMemoryStore::new());
        store
            .seed(collections::USERS, "u1", json!({"name": "Jane Roe", "email": "j@x.com"}))
            .await
            .unwrap();
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        let err = controller.delete().await.unwrap_err();
        assert!(matches!(err, AccessError::AccountDeletionRefused));
        assert_eq!(store.len(collections::USERS).await, 1);
        assert_eq!(controller.snapshot().unwrap().state, AccessState::Accessing);
    }

    #[tokio::test]
    async fn should_never_expose_the_code_in_snapshots() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());

        controller.search(LookupKey::Email, "j@x.com").await.unwrap();
        controller.send_otp().await.unwrap();

        let value = serde_json::to_value(controller.snapshot().unwrap()).unwrap();
        assert!(value.get("code").is_none());
        assert_eq!(value["state"], "verifying");
    }

    #[tokio::test(start_paused = true)]
    async fn should_count_down_and_silently_log_out_at_zero() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        tokio::time::sleep(Duration::from_millis(599_500)).await;
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.state, AccessState::Accessing);
        assert_eq!(snapshot.remaining_seconds, 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.state, AccessState::Search);
        assert!(snapshot.patient.is_none());
        assert_eq!(snapshot.remaining_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_the_clock_on_manual_close() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        controller.close().unwrap();
        assert_eq!(controller.snapshot().unwrap().state, AccessState::Search);

        // Closing twice is fine, and no stray tick revives the session.
        controller.close().unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.state, AccessState::Search);
        assert_eq!(snapshot.remaining_seconds, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_destroy_the_previous_session_on_a_new_search() {
        let store = Arc::new(InMemoryStore::new());
        seed_stored_patient(&store).await;
        let controller = controller_over(store.clone());
        open_access(&controller, &store).await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        controller.search(LookupKey::Email, "j@x.com").await.unwrap();

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.state, AccessState::ContactFound);
        assert_eq!(snapshot.remaining_seconds, 0);

        // The old countdown is gone; nothing ticks the new session down.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.snapshot().unwrap().state, AccessState::ContactFound);
    }
}
