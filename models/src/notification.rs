// models/src/notification.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "access_request")]
    AccessRequest,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NotificationKind::AccessRequest => write!(f, "access_request"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access_request" => Ok(NotificationKind::AccessRequest),
            other => Err(ValidationError::UnknownNotificationKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Delivered,
}

/// Outbound one-time-passcode message written to the shared notification
/// channel for the patient's mobile client to pick up. Delivery is never
/// confirmed back to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpNotification {
    pub target_email: String,
    pub code: String,
    pub kind: NotificationKind,
    pub issuer_name: String,
    pub issuer_org: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl OtpNotification {
    pub fn access_request(
        target_email: impl Into<String>,
        code: impl Into<String>,
        issuer_name: impl Into<String>,
        issuer_org: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        OtpNotification {
            target_email: target_email.into(),
            code: code.into(),
            kind: NotificationKind::AccessRequest,
            issuer_name: issuer_name.into(),
            issuer_org: issuer_org.into(),
            status: NotificationStatus::Pending,
            created_at,
        }
    }
}
