//! HTTP API for registrations, approvals and logins

use crate::registration::{
    ApprovedDriver, AuthError, PassengerAccount, RegistrationError, RegistrationInput,
    RegistrationRecord, RegistrationStats, Registry, Session,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Registry>>,
}

impl AppState {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
        }
    }
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "phone")]
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PassengerRegisterRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PassengerResponse {
    pub name: String,
    pub phone: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct DriverResponse {
    pub login_identifier: String,
    pub display_name: String,
    pub license_number: String,
    pub rating: f32,
    pub total_rides: u32,
}

#[derive(Debug, Serialize)]
pub struct RegistrationListResponse {
    pub registrations: Vec<RegistrationRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub pending: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    code: &'static str,
}

impl From<PassengerAccount> for PassengerResponse {
    fn from(account: PassengerAccount) -> Self {
        Self {
            name: account.name,
            phone: account.phone,
            active: account.active,
        }
    }
}

impl From<ApprovedDriver> for DriverResponse {
    fn from(driver: ApprovedDriver) -> Self {
        Self {
            login_identifier: driver.login_identifier,
            display_name: driver.display_name,
            license_number: driver.license_number,
            rating: driver.rating,
            total_rides: driver.total_rides,
        }
    }
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        let status = match &self {
            RegistrationError::ValidationError(_) => StatusCode::BAD_REQUEST,
            RegistrationError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistrationError::DuplicatePhone(_) => StatusCode::CONFLICT,
            RegistrationError::Auth(
                AuthError::PendingApproval | AuthError::NotApproved | AuthError::Inactive,
            ) => StatusCode::FORBIDDEN,
            RegistrationError::Auth(_) | RegistrationError::NotLoggedIn(_) => {
                StatusCode::UNAUTHORIZED
            }
            RegistrationError::Storage(_) | RegistrationError::ConfigError(_) => {
                error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

// Configure routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/drivers/registrations", post(submit_registration))
        .route("/drivers/login", post(login_driver))
        .route("/passengers", post(register_passenger))
        .route("/passengers/login", post(login_passenger))
        .route("/admin/registrations", get(list_pending))
        .route("/admin/registrations/:id/approve", post(approve_registration))
        .route("/admin/registrations/:id/reject", post(reject_registration))
        .route("/admin/stats", get(registration_stats))
        .route("/session", get(current_session).delete(logout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let pending = state.registry.read().await.stats().pending;

    Json(StatusResponse {
        status: "ok".to_string(),
        service: "mototaxi-registry".to_string(),
        pending,
    })
}

async fn submit_registration(
    State(state): State<AppState>,
    Json(input): Json<RegistrationInput>,
) -> Result<(StatusCode, Json<RegistrationRecord>), RegistrationError> {
    let record = state.registry.write().await.submit_registration(input)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn login_driver(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>, RegistrationError> {
    let session = state
        .registry
        .write()
        .await
        .login_driver(&payload.login, &payload.password)?;
    Ok(Json(session))
}

async fn register_passenger(
    State(state): State<AppState>,
    Json(payload): Json<PassengerRegisterRequest>,
) -> Result<(StatusCode, Json<PassengerResponse>), RegistrationError> {
    let account = state.registry.write().await.register_passenger(
        &payload.name,
        &payload.phone,
        &payload.password,
    )?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

async fn login_passenger(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>, RegistrationError> {
    let session = state
        .registry
        .write()
        .await
        .login_passenger(&payload.login, &payload.password)?;
    Ok(Json(session))
}

async fn list_pending(State(state): State<AppState>) -> Json<RegistrationListResponse> {
    let registrations = state.registry.read().await.pending_registrations().to_vec();
    let count = registrations.len();
    Json(RegistrationListResponse {
        registrations,
        count,
    })
}

async fn approve_registration(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DriverResponse>, RegistrationError> {
    let driver = state.registry.write().await.approve(id)?;
    info!("Approved registration {} via API", id);
    Ok(Json(driver.into()))
}

async fn reject_registration(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RegistrationRecord>, RegistrationError> {
    let record = state.registry.write().await.reject(id)?;
    info!("Rejected registration {} via API", id);
    Ok(Json(record))
}

async fn registration_stats(State(state): State<AppState>) -> Json<RegistrationStats> {
    Json(state.registry.read().await.stats())
}

async fn current_session(State(state): State<AppState>) -> Json<Option<Session>> {
    Json(state.registry.read().await.current_session().cloned())
}

async fn logout(State(state): State<AppState>) -> Result<StatusCode, RegistrationError> {
    state.registry.write().await.logout()?;
    Ok(StatusCode::NO_CONTENT)
}
