// models/src/appointment.rs

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// A booked appointment as stored in the `appointments` collection.
///
/// `appointment_time` is a free-form clock string written by the booking
/// client ("10:30", "10:30:00", "10:30 AM" all occur in practice); it is
/// parsed leniently when ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub patient_name: String,
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub reason: String,
    pub status: AppointmentStatus,
    pub hospital_name: String,
}

impl Appointment {
    /// Combined start instant used for ordering. Unparsable clock strings
    /// fall back to midnight so the appointment still sorts by date.
    pub fn starts_at(&self) -> NaiveDateTime {
        let time = parse_clock(&self.appointment_time).unwrap_or(NaiveTime::MIN);
        self.appointment_date.and_time(time)
    }
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    for format in ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"] {
        if let Ok(t) = NaiveTime::parse_from_str(raw, format) {
            return Some(t);
        }
    }
    None
}
