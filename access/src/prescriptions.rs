// access/src/prescriptions.rs

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use models::{Medicine, PatientAccount, Prescription, UploadRecord};
use storage::{collections, BlobStore, DocumentStore};

use crate::errors::Result;
use crate::OperatorContext;

/// Severity stamped onto mirrored uploads; the patient app treats
/// doctor-pushed images as important by convention.
const MIRRORED_SEVERITY: &str = "Important";

/// Image attached to a prescription before upload.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Operator-submitted prescription form.
#[derive(Debug, Clone, Default)]
pub struct PrescriptionDraft {
    pub medicines: Vec<Medicine>,
    pub notes: String,
    pub image: Option<ImageAttachment>,
}

/// Result of a successful create, including the optimistic local mirror of
/// the upload entry when cross-system sync went through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPrescription {
    pub id: String,
    pub prescription: Prescription,
    pub mirrored_upload: Option<UploadRecord>,
}

/// Issuer-side prescription log plus the best-effort mirror into the
/// patient account's upload list.
///
/// The two read models stay independent: prescriptions are keyed by patient
/// id in the store, uploads live embedded in the `users` account found by
/// email. They are never merged into one ordering.
#[derive(Debug)]
pub struct PrescriptionService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    operator: OperatorContext,
}

impl PrescriptionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        operator: OperatorContext,
    ) -> Self {
        PrescriptionService { store, blobs, operator }
    }

    /// Persists a prescription. A draft with neither a named medicine nor
    /// an image is refused silently: `Ok(None)`, zero network calls.
    ///
    /// The image (if any) uploads first; the prescription references the
    /// resulting URL. Mirroring into the patient's upload list is
    /// best-effort and can never fail the create.
    pub async fn create(
        &self,
        patient_id: &str,
        patient_email: &str,
        draft: PrescriptionDraft,
    ) -> Result<Option<CreatedPrescription>> {
        let medicines: Vec<Medicine> = draft
            .medicines
            .into_iter()
            .filter(|medicine| medicine.has_name())
            .collect();
        if medicines.is_empty() && draft.image.is_none() {
            return Ok(None);
        }

        let image_url = match draft.image {
            Some(image) => Some(self.blobs.upload(&image.bytes, &image.content_type).await?),
            None => None,
        };

        let prescription = Prescription {
            patient_id: patient_id.to_string(),
            issuer_name: self.operator.name.clone(),
            issuer_org: self.operator.hospital.clone(),
            medicines,
            notes: draft.notes,
            image_url: image_url.clone(),
            created_at: Utc::now(),
        };
        let id = self
            .store
            .create(collections::PRESCRIPTIONS, serde_json::to_value(&prescription)?)
            .await?;

        let mirrored_upload = match image_url {
            Some(ref uri) => self.mirror_upload(&id, uri, patient_email).await,
            None => None,
        };

        Ok(Some(CreatedPrescription { id, prescription, mirrored_upload }))
    }

    /// Issuer-authored prescriptions for a patient, newest first.
    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<(String, Prescription)>> {
        let docs = self
            .store
            .find(collections::PRESCRIPTIONS, "patientId", &json!(patient_id))
            .await?;
        let mut prescriptions = Vec::with_capacity(docs.len());
        for doc in docs {
            prescriptions.push((doc.id.clone(), doc.decode::<Prescription>()?));
        }
        prescriptions.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(prescriptions)
    }

    /// Patient-authored uploads read from the account's embedded list,
    /// newest first. Patients without an account have none.
    pub async fn patient_uploads(&self, email: &str) -> Result<Vec<UploadRecord>> {
        let docs = self.store.find(collections::USERS, "email", &json!(email)).await?;
        let Some(doc) = docs.first() else {
            return Ok(Vec::new());
        };
        let account: PatientAccount = doc.decode()?;
        let mut uploads = account.uploads;
        uploads.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(uploads)
    }

    /// Best-effort append of the prescription image into the patient's own
    /// upload list. Failure is logged and swallowed; the two stores are
    /// allowed to diverge.
    async fn mirror_upload(
        &self,
        prescription_id: &str,
        uri: &str,
        patient_email: &str,
    ) -> Option<UploadRecord> {
        match self.try_mirror_upload(prescription_id, uri, patient_email).await {
            Ok(mirrored) => mirrored,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    patient_email,
                    prescription_id,
                    "upload mirroring failed; prescription kept without mirror"
                );
                None
            }
        }
    }

    async fn try_mirror_upload(
        &self,
        prescription_id: &str,
        uri: &str,
        patient_email: &str,
    ) -> Result<Option<UploadRecord>> {
        let docs = self
            .store
            .find(collections::USERS, "email", &json!(patient_email))
            .await?;
        let Some(doc) = docs.first() else {
            return Ok(None);
        };
        let account: PatientAccount = doc.decode()?;

        let record = UploadRecord {
            id: prescription_id.to_string(),
            uri: uri.to_string(),
            severity: MIRRORED_SEVERITY.to_string(),
            hospital: self.operator.hospital.clone(),
            uploaded_at: Utc::now(),
        };
        let mut uploads = account.uploads;
        uploads.push(record.clone());
        self.store
            .update(
                collections::USERS,
                &doc.id,
                json!({ "uploads": serde_json::to_value(&uploads)? }),
            )
            .await?;
        Ok(Some(record))
    }
}
