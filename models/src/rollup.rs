// models/src/rollup.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Headline counters for the dashboard overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed_today: usize,
    pub completed: usize,
}

/// One row of the aggregated patient view: a unique patient across the
/// operator's appointment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub visits: u32,
    pub last_visit: NaiveDate,
}
