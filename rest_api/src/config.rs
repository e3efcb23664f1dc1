// rest_api/src/config.rs

use std::env;

use anyhow::{Context, Result};
use chrono::Utc;

use models::Doctor;

/// Server configuration, read from the environment (optionally populated
/// from a `.env` file by the binary).
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub operator: OperatorProfileConfig,
}

/// Bootstrap fields for the operator's doctor profile. The identity
/// provider owns authentication; this only describes who the dashboard
/// instance belongs to.
#[derive(Debug, Clone)]
pub struct OperatorProfileConfig {
    pub name: String,
    pub email: String,
    pub hospital: String,
    pub phone: String,
    pub specialty: String,
}

impl OperatorProfileConfig {
    pub fn to_doctor(&self) -> Doctor {
        Doctor::new(
            self.name.clone(),
            self.email.clone(),
            self.hospital.clone(),
            self.phone.clone(),
            self.specialty.clone(),
            Utc::now(),
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn load_rest_api_config() -> Result<RestApiConfig> {
    let port = env_or("DASHBOARD_PORT", "8082")
        .parse::<u16>()
        .context("DASHBOARD_PORT must be a valid port number")?;

    Ok(RestApiConfig {
        host: env_or("DASHBOARD_HOST", "127.0.0.1"),
        port,
        jwt_secret: env_or("DASHBOARD_JWT_SECRET", "dev-only-secret"),
        operator: OperatorProfileConfig {
            name: env_or("DASHBOARD_OPERATOR_NAME", "Dr. Dev Operator"),
            email: env_or("DASHBOARD_OPERATOR_EMAIL", "operator@example.org"),
            hospital: env_or("DASHBOARD_OPERATOR_HOSPITAL", "Example General"),
            phone: env_or("DASHBOARD_OPERATOR_PHONE", "+1 (555) 000-0000"),
            specialty: env_or("DASHBOARD_OPERATOR_SPECIALTY", "General Medicine"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fall_back_to_defaults() {
        let config = load_rest_api_config().unwrap();
        assert!(!config.host.is_empty());
        assert!(config.port > 0);
        assert!(!config.operator.hospital.is_empty());
    }
}
