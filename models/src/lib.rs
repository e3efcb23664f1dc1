// models/src/lib.rs
// Shared domain types for the dashboard core. Data only; no I/O here.

pub mod account;
pub mod appointment;
pub mod doctor;
pub mod errors;
pub mod hospital;
pub mod notification;
pub mod patient;
pub mod prescription;
pub mod rollup;
pub mod upload;

// Explicit re-exports
pub use crate::account::PatientAccount;
pub use crate::appointment::{Appointment, AppointmentStatus};
pub use crate::doctor::Doctor;
pub use crate::errors::ValidationError;
pub use crate::hospital::Hospital;
pub use crate::notification::{NotificationKind, NotificationStatus, OtpNotification};
pub use crate::patient::{PatientEdit, PatientIdentity, PatientRecord, Provenance, StoredPatientDocument};
pub use crate::prescription::{Medicine, Prescription};
pub use crate::rollup::{AppointmentStats, PatientSummary};
pub use crate::upload::UploadRecord;
