// access/src/dashboard.rs
// Rollup and CRUD operations behind the dashboard shell: appointment
// listing and status updates, headline stats, the aggregated patient view,
// and operator profile bootstrap.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde_json::json;

use models::{
    Appointment, AppointmentStats, AppointmentStatus, Doctor, Hospital, PatientSummary,
};
use storage::{collections, DocumentStore};

use crate::errors::Result;

/// Appointments for the operator's organization, most recent first.
pub async fn load_appointments(
    store: &dyn DocumentStore,
    hospital: &str,
) -> Result<Vec<(String, Appointment)>> {
    let docs = store
        .find(collections::APPOINTMENTS, "hospitalName", &json!(hospital))
        .await?;
    let mut appointments = Vec::with_capacity(docs.len());
    for doc in docs {
        appointments.push((doc.id.clone(), doc.decode::<Appointment>()?));
    }
    appointments.sort_by(|a, b| b.1.starts_at().cmp(&a.1.starts_at()));
    Ok(appointments)
}

/// Headline counters for the overview cards.
pub fn compute_stats(appointments: &[(String, Appointment)], today: NaiveDate) -> AppointmentStats {
    AppointmentStats {
        total: appointments.len(),
        pending: appointments
            .iter()
            .filter(|(_, a)| a.status == AppointmentStatus::Pending)
            .count(),
        confirmed_today: appointments
            .iter()
            .filter(|(_, a)| a.status == AppointmentStatus::Confirmed && a.appointment_date == today)
            .count(),
        completed: appointments
            .iter()
            .filter(|(_, a)| a.status == AppointmentStatus::Completed)
            .count(),
    }
}

/// Aggregates unique patients across the appointment list: first-seen name
/// and phone, visit count, most recent visit. Insertion order is kept.
pub fn summarize_patients(appointments: &[(String, Appointment)]) -> Vec<PatientSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut summaries: Vec<PatientSummary> = Vec::new();

    for (_, appointment) in appointments {
        match index.get(appointment.patient_email.as_str()) {
            Some(&at) => {
                let summary = &mut summaries[at];
                summary.visits += 1;
                if appointment.appointment_date > summary.last_visit {
                    summary.last_visit = appointment.appointment_date;
                }
            }
            None => {
                index.insert(appointment.patient_email.as_str(), summaries.len());
                summaries.push(PatientSummary {
                    name: appointment.patient_name.clone(),
                    email: appointment.patient_email.clone(),
                    phone: appointment.patient_phone.clone(),
                    visits: 1,
                    last_visit: appointment.appointment_date,
                });
            }
        }
    }

    summaries
}

/// Sets an appointment's status. The shell renders which transitions it
/// offers; the write itself is an unconditional partial update.
pub async fn update_appointment_status(
    store: &dyn DocumentStore,
    id: &str,
    status: AppointmentStatus,
) -> Result<()> {
    store
        .update(collections::APPOINTMENTS, id, json!({ "status": status.as_str() }))
        .await?;
    Ok(())
}

pub async fn load_doctor(store: &dyn DocumentStore, id: &str) -> Result<Option<Doctor>> {
    let Some(doc) = store.get(collections::DOCTORS, id).await? else {
        return Ok(None);
    };
    Ok(Some(doc.decode()?))
}

/// Adds the hospital to the shared list unless an entry with the same name
/// already exists.
pub async fn ensure_hospital(store: &dyn DocumentStore, name: &str) -> Result<()> {
    let existing = store.find(collections::HOSPITALS, "name", &json!(name)).await?;
    if existing.is_empty() {
        let hospital = Hospital::new(name, Utc::now());
        store
            .create(collections::HOSPITALS, serde_json::to_value(&hospital)?)
            .await?;
    }
    Ok(())
}

/// Finds the operator's doctor profile by email, creating profile and
/// hospital entry on first run. Returns the profile's document id.
pub async fn ensure_operator_profile(store: &dyn DocumentStore, profile: &Doctor) -> Result<String> {
    let existing = store
        .find(collections::DOCTORS, "email", &json!(profile.email))
        .await?;
    if let Some(doc) = existing.first() {
        return Ok(doc.id.clone());
    }

    let id = store
        .create(collections::DOCTORS, serde_json::to_value(profile)?)
        .await?;
    ensure_hospital(store, &profile.hospital).await?;
    tracing::info!(id = %id, hospital = %profile.hospital, "registered operator profile");
    Ok(id)
}
