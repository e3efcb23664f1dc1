// models/src/errors.rs

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown appointment status: {0}")]
    UnknownStatus(String),

    #[error("unknown notification kind: {0}")]
    UnknownNotificationKind(String),
}
