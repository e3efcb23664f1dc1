// access/src/lib.rs
// Secure patient access core: consent-gated lookup/edit state machine,
// session timer, prescription subsystem, and the dashboard rollup
// operations the shell calls into.

pub mod dashboard;
pub mod errors;
pub mod machine;
pub mod otp;
pub mod prescriptions;
pub mod search;
pub mod session;
pub mod timer;

use serde::{Deserialize, Serialize};

// Explicit re-exports
pub use crate::errors::{AccessError, Result};
pub use crate::machine::{DeleteOutcome, SaveOutcome, SecureAccessController};
pub use crate::prescriptions::{
    CreatedPrescription, ImageAttachment, PrescriptionDraft, PrescriptionService,
};
pub use crate::search::LookupKey;
pub use crate::session::{AccessState, SessionSnapshot, ACCESS_TTL_SECS};

/// Identity context supplied by the session layer at construction time.
/// The core trusts it without re-validation per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorContext {
    pub doctor_id: String,
    pub name: String,
    pub hospital: String,
}
