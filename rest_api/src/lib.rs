// rest_api/src/lib.rs
// Thin dashboard shell over the access core: axum routes, bearer-token
// checks, and error-to-response mapping. All flow logic lives in the
// `access` crate; handlers translate HTTP in and out.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tower_http::cors::{Any, CorsLayer};

use access::{
    dashboard, AccessError, ImageAttachment, LookupKey, OperatorContext, PrescriptionDraft,
    PrescriptionService, SecureAccessController,
};
use anyhow::Context;
use anyhow::Error as AnyhowError;
use models::{AppointmentStatus, Medicine, PatientEdit};
use storage::{BlobStore, DocumentStore, StorageError, StoreNotificationChannel};

pub mod auth;
pub mod config;

use crate::auth::AuthError;
use crate::config::RestApiConfig;

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error("Access flow error: {0}")]
    Access(#[from] AccessError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("General error: {0}")]
    GeneralError(String),
}

impl From<AuthError> for RestApiError {
    fn from(err: AuthError) -> Self {
        RestApiError::Unauthorized(err.to_string())
    }
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            RestApiError::Access(AccessError::NotFound) => {
                (StatusCode::NOT_FOUND, AccessError::NotFound.to_string())
            }
            RestApiError::Access(AccessError::InvalidCode) => {
                (StatusCode::BAD_REQUEST, AccessError::InvalidCode.to_string())
            }
            RestApiError::Access(AccessError::InvalidState(msg)) => (StatusCode::CONFLICT, msg.to_string()),
            RestApiError::Access(AccessError::AccountDeletionRefused) => (
                StatusCode::BAD_REQUEST,
                AccessError::AccountDeletionRefused.to_string(),
            ),
            RestApiError::Access(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Access flow error: {}", e)),
            RestApiError::Storage(StorageError::PermissionDenied(msg)) => {
                (StatusCode::FORBIDDEN, format!("Permission denied: {}", msg))
            }
            RestApiError::Storage(StorageError::NotFound(msg)) => (StatusCode::NOT_FOUND, format!("Not found: {}", msg)),
            RestApiError::Storage(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Storage error: {}", e)),
            RestApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            RestApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            RestApiError::SerdeJson(e) => (StatusCode::BAD_REQUEST, format!("JSON error: {}", e)),
            RestApiError::GeneralError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "status": "error",
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

// Shared state for the Axum application
#[derive(Clone)]
struct AppState {
    store: Arc<dyn DocumentStore>,
    controller: Arc<SecureAccessController>,
    prescriptions: Arc<PrescriptionService>,
    operator: OperatorContext,
    operator_email: String,
    jwt_secret: Arc<Vec<u8>>,
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), RestApiError> {
    auth::verify_bearer(headers, &state.jwt_secret)?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AuthRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    key: LookupKey,
    value: String,
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    code: String,
}

#[derive(Debug, Deserialize)]
struct CloseRequest {
    confirm: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePrescriptionRequest {
    patient_id: String,
    patient_email: String,
    #[serde(default)]
    medicines: Vec<Medicine>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    image_base64: Option<String>,
    #[serde(default)]
    image_content_type: Option<String>,
}

// Handler for the /api/v1/health endpoint
async fn health_check_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "message": "Dashboard API is healthy" })))
}

// Handler for the /api/v1/version endpoint
async fn version_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "version": "0.1.0", "api_level": 1 })))
}

// Handler for /api/v1/auth. Token issuance is keyed to the operator this
// dashboard instance was bootstrapped for; credentials live with the
// external identity provider, not here.
async fn auth_handler(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<Value>, RestApiError> {
    if !payload.email.eq_ignore_ascii_case(&state.operator_email) {
        return Err(RestApiError::Unauthorized("unknown operator".to_string()));
    }
    let token = auth::issue_token(&state.operator, &state.jwt_secret, chrono::Duration::hours(8))?;
    Ok(Json(json!({
        "status": "success",
        "token": token,
        "operator": state.operator,
    })))
}

// Handler for the /api/v1/shutdown endpoint
async fn shutdown_handler(State(state): State<AppState>) -> Result<Json<Value>, RestApiError> {
    let mut tx_guard = state.shutdown_tx.lock().await;
    if let Some(tx) = tx_guard.take() {
        let _ = tx.send(());
        Ok(Json(json!({
            "status": "success",
            "message": "Shutting down dashboard API server."
        })))
    } else {
        Err(RestApiError::GeneralError("Shutdown signal already sent or not available.".to_string()))
    }
}

// Handler for the /api/v1/appointments endpoint
async fn list_appointments_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let appointments =
        dashboard::load_appointments(state.store.as_ref(), &state.operator.hospital).await?;

    let mut rows = Vec::with_capacity(appointments.len());
    for (id, appointment) in appointments {
        let mut value = serde_json::to_value(&appointment)?;
        if let Value::Object(ref mut map) = value {
            map.insert("id".to_string(), Value::String(id));
        }
        rows.push(value);
    }
    Ok(Json(json!({ "status": "success", "appointments": rows })))
}

// Handler for the /api/v1/appointments/:id/status endpoint
async fn update_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let status: AppointmentStatus = payload
        .status
        .parse()
        .map_err(|e: models::ValidationError| RestApiError::InvalidInput(e.to_string()))?;
    dashboard::update_appointment_status(state.store.as_ref(), &id, status).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Appointment {} is now {}.", id, status)
    })))
}

// Handler for the /api/v1/dashboard/stats endpoint
async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let appointments =
        dashboard::load_appointments(state.store.as_ref(), &state.operator.hospital).await?;
    let stats = dashboard::compute_stats(&appointments, Utc::now().date_naive());
    Ok(Json(json!({ "status": "success", "stats": stats })))
}

// Handler for the /api/v1/patients endpoint (aggregated rollup)
async fn patients_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let appointments =
        dashboard::load_appointments(state.store.as_ref(), &state.operator.hospital).await?;
    let patients = dashboard::summarize_patients(&appointments);
    Ok(Json(json!({ "status": "success", "patients": patients })))
}

// Handler for the /api/v1/access/session endpoint
async fn session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let snapshot = state.controller.snapshot()?;
    Ok(Json(json!({ "status": "success", "session": snapshot })))
}

// Handler for the /api/v1/access/search endpoint
async fn search_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let record = state.controller.search(payload.key, &payload.value).await?;
    Ok(Json(json!({ "status": "success", "patient": record })))
}

// Handler for the /api/v1/access/cancel endpoint
async fn cancel_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    state.controller.cancel()?;
    Ok(Json(json!({ "status": "success", "message": "Search reset." })))
}

// Handler for the /api/v1/access/otp/send endpoint
async fn send_otp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    state.controller.send_otp().await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Access code sent to the patient's device."
    })))
}

// Handler for the /api/v1/access/otp/verify endpoint
async fn verify_otp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    state.controller.verify(&payload.code)?;
    let snapshot = state.controller.snapshot()?;
    Ok(Json(json!({ "status": "success", "session": snapshot })))
}

// Handler for the /api/v1/access/close endpoint. The confirm flag is the
// operator's explicit confirmation from the shell.
async fn close_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CloseRequest>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    if !payload.confirm {
        return Err(RestApiError::InvalidInput(
            "Closing the connection requires confirmation.".to_string(),
        ));
    }
    state.controller.close()?;
    Ok(Json(json!({ "status": "success", "message": "Connection closed." })))
}

// Handler for the /api/v1/access/record/save endpoint
async fn save_record_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PatientEdit>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let outcome = state.controller.save(&payload).await?;
    Ok(Json(json!({ "status": "success", "result": outcome })))
}

// Handler for DELETE /api/v1/access/record
async fn delete_record_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let outcome = state.controller.delete().await?;
    Ok(Json(json!({ "status": "success", "result": outcome })))
}

// Handler for the /api/v1/prescriptions endpoint
async fn create_prescription_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePrescriptionRequest>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;

    let image = match payload.image_base64 {
        Some(ref data) => Some(ImageAttachment {
            bytes: BASE64_STANDARD
                .decode(data.as_bytes())
                .map_err(|e| RestApiError::InvalidInput(format!("invalid image encoding: {}", e)))?,
            content_type: payload
                .image_content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        }),
        None => None,
    };

    let draft = PrescriptionDraft {
        medicines: payload.medicines,
        notes: payload.notes,
        image,
    };
    match state
        .prescriptions
        .create(&payload.patient_id, &payload.patient_email, draft)
        .await?
    {
        Some(created) => Ok(Json(json!({ "status": "success", "prescription": created }))),
        None => Ok(Json(json!({
            "status": "ignored",
            "message": "Nothing to prescribe: add a medicine or attach an image."
        }))),
    }
}

// Handler for the /api/v1/prescriptions/:patient_id endpoint
async fn list_prescriptions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let prescriptions = state.prescriptions.list_for_patient(&patient_id).await?;

    let mut rows = Vec::with_capacity(prescriptions.len());
    for (id, prescription) in prescriptions {
        let mut value = serde_json::to_value(&prescription)?;
        if let Value::Object(ref mut map) = value {
            map.insert("id".to_string(), Value::String(id));
        }
        rows.push(value);
    }
    Ok(Json(json!({ "status": "success", "prescriptions": rows })))
}

// Handler for the /api/v1/uploads/:email endpoint (patient-authored tab)
async fn patient_uploads_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Result<Json<Value>, RestApiError> {
    authorize(&state, &headers)?;
    let uploads = state.prescriptions.patient_uploads(&email).await?;
    Ok(Json(json!({ "status": "success", "uploads": uploads })))
}

// Main function to start the dashboard API server
pub async fn start_server(
    config: RestApiConfig,
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), AnyhowError> {
    let profile = config.operator.to_doctor();
    let doctor_id = dashboard::ensure_operator_profile(store.as_ref(), &profile)
        .await
        .context("Failed to bootstrap the operator profile")?;
    let operator = OperatorContext {
        doctor_id,
        name: profile.name.clone(),
        hospital: profile.hospital.clone(),
    };

    let notifier = Arc::new(StoreNotificationChannel::new(store.clone()));
    let controller = Arc::new(SecureAccessController::new(
        store.clone(),
        notifier,
        operator.clone(),
    ));
    let prescriptions = Arc::new(PrescriptionService::new(
        store.clone(),
        blobs,
        operator.clone(),
    ));

    let app_state = AppState {
        store,
        controller,
        prescriptions,
        operator,
        operator_email: config.operator.email.clone(),
        jwt_secret: Arc::new(config.jwt_secret.clone().into_bytes()),
        shutdown_tx: Arc::new(Mutex::new(None)),
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = Router::new()
        .route("/api/v1/health", get(health_check_handler))
        .route("/api/v1/version", get(version_handler))
        .route("/api/v1/auth", post(auth_handler))
        .route("/api/v1/shutdown", get(shutdown_handler))
        .route("/api/v1/appointments", get(list_appointments_handler))
        .route("/api/v1/appointments/:id/status", post(update_status_handler))
        .route("/api/v1/dashboard/stats", get(stats_handler))
        .route("/api/v1/patients", get(patients_handler))
        .route("/api/v1/access/session", get(session_handler))
        .route("/api/v1/access/search", post(search_handler))
        .route("/api/v1/access/cancel", post(cancel_handler))
        .route("/api/v1/access/otp/send", post(send_otp_handler))
        .route("/api/v1/access/otp/verify", post(verify_otp_handler))
        .route("/api/v1/access/close", post(close_handler))
        .route("/api/v1/access/record/save", post(save_record_handler))
        .route("/api/v1/access/record", delete(delete_record_handler))
        .route("/api/v1/prescriptions", post(create_prescription_handler))
        .route("/api/v1/prescriptions/:patient_id", get(list_prescriptions_handler))
        .route("/api/v1/uploads/:email", get(patient_uploads_handler))
        .with_state(app_state.clone())
        .layer(cors);

    let addr = SocketAddr::new(
        config
            .host
            .parse()
            .context(format!("Invalid host address: {}", config.host))?,
        config.port,
    );
    tracing::info!(%addr, "dashboard API server listening");

    let (tx, rx_internal) = oneshot::channel();
    *app_state.shutdown_tx.lock().await = Some(tx);

    let combined_shutdown_signal = async {
        tokio::select! {
            _ = shutdown_rx => {
                tracing::info!("received external shutdown signal");
            }
            _ = rx_internal => {
                tracing::info!("received internal shutdown signal");
            }
        }
    };

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(combined_shutdown_signal)
        .await
        .context("Dashboard API server failed to start or run")?;

    tracing::info!("dashboard API server stopped");
    Ok(())
}
