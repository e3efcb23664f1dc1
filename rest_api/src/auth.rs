// rest_api/src/auth.rs
// Bearer-token validation for the protected routes. Tokens come from the
// platform's identity provider; this module only consumes them. The claim
// shape carries the operator identity the core trusts per call.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use access::OperatorContext;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid bearer token: {0}")]
    InvalidToken(String),
    #[error("token issuing failed: {0}")]
    Issuing(String),
}

/// Claims for JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (operator document id)
    pub name: String,
    pub hospital: String,
    pub exp: u64, // Expiration time
    pub iat: u64, // Issued at
}

pub fn issue_token(
    operator: &OperatorContext,
    secret: &[u8],
    valid_for: chrono::Duration,
) -> Result<String, AuthError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: operator.doctor_id.clone(),
        name: operator.name.clone(),
        hospital: operator.hospital.clone(),
        exp: (now + valid_for).timestamp() as u64,
        iat: now.timestamp() as u64,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AuthError::Issuing(e.to_string()))
}

pub fn verify_token(token: &str, secret: &[u8]) -> Result<Claims, AuthError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Pulls and validates the `Authorization: Bearer` header.
pub fn verify_bearer(headers: &HeaderMap, secret: &[u8]) -> Result<Claims, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    let token = header.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)?;
    verify_token(token, secret)
}
