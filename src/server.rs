//! HTTP API server.
//!
//! Thin mapping from routes to [`BmaService`] operations. Handlers validate
//! the request shape, delegate, and serialize a typed response.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/extension/page-data` | Ingest a listing page from the extension |
//! | `GET` | `/api/addresses` | List addresses with detail summaries |
//! | `POST` | `/api/addresses` | Create an address by hand |
//! | `PATCH` | `/api/addresses/{id}` | Set `enabled` / `primary` |
//! | `DELETE` | `/api/addresses/{id}` | Delete an address and its raw page |
//! | `GET` | `/api/bma-report` | Cached or freshly generated report |
//! | `POST` | `/api/bma-report/refresh` | Force regeneration |
//! | `GET` | `/api/llm-instructions` | Current prompt instructions |
//! | `POST` | `/api/llm-instructions` | Replace instructions, clear report cache |
//! | `GET` | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Invalid address ID" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream_error` (500),
//! `store_error` (500), `internal` (500).
//!
//! # CORS
//!
//! Only the configured frontend origin is allowed, with the `Origin`,
//! `Content-Type`, and `Accept` request headers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use bma_core::models::{AddressWithDetails, BmaReport};

use crate::addresses::{AddressFlags, NewAddress};
use crate::config::{Config, ServerConfig};
use crate::error::BmaError;
use crate::service::BmaService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<BmaService>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Opens (and migrates) the database first; runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(BmaService::open(config).await?);
    let app = build_router(service, &config.server)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router around an already-wired service.
pub fn build_router(service: Arc<BmaService>, config: &ServerConfig) -> anyhow::Result<Router> {
    let origin: HeaderValue = config.allowed_origin.parse()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::PUT,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT]);

    let state = AppState { service };

    Ok(Router::new()
        .route("/api/extension/page-data", post(handle_page_data))
        .route(
            "/api/addresses",
            get(handle_list_addresses).post(handle_create_address),
        )
        .route(
            "/api/addresses/{id}",
            patch(handle_update_address).delete(handle_delete_address),
        )
        .route("/api/bma-report", get(handle_report))
        .route("/api/bma-report/refresh", post(handle_refresh_report))
        .route(
            "/api/llm-instructions",
            get(handle_get_instructions).post(handle_update_instructions),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
}

impl From<BmaError> for AppError {
    fn from(err: BmaError) -> Self {
        let (status, code) = match &err {
            BmaError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            BmaError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            BmaError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error"),
            BmaError::Instructions(_) | BmaError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
            BmaError::MissingDetails { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

// ============ Response shapes ============

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct PageDataResponse {
    message: &'static str,
    upserted: bool,
}

#[derive(Serialize)]
struct CreatedResponse {
    message: &'static str,
    id: String,
}

#[derive(Serialize, Deserialize)]
struct InstructionsBody {
    instructions: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// ============ Handlers ============

/// Page submitted by the browser extension.
#[derive(Deserialize)]
struct PageDataRequest {
    #[serde(default)]
    url: String,
    content: String,
}

async fn handle_page_data(
    State(state): State<AppState>,
    payload: Result<Json<PageDataRequest>, JsonRejection>,
) -> Result<Json<PageDataResponse>, AppError> {
    let req = body(payload)?;
    let outcome = state.service.ingest(&req.url, &req.content).await?;
    Ok(Json(PageDataResponse {
        message: "Page data processed and property details extracted.",
        upserted: outcome.upserted,
    }))
}

async fn handle_list_addresses(
    State(state): State<AppState>,
) -> Result<Json<Vec<AddressWithDetails>>, AppError> {
    Ok(Json(state.service.list_addresses().await?))
}

async fn handle_create_address(
    State(state): State<AppState>,
    payload: Result<Json<NewAddress>, JsonRejection>,
) -> Result<Json<CreatedResponse>, AppError> {
    let new = body(payload)?;
    let id = state.service.create_address(new).await?;
    Ok(Json(CreatedResponse {
        message: "Address created",
        id,
    }))
}

async fn handle_update_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddressFlags>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let flags = body(payload)?;
    state.service.update_address(&id, flags).await?;
    Ok(Json(MessageResponse {
        message: "Address updated",
    }))
}

async fn handle_delete_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.service.delete_address(&id).await?;
    Ok(Json(MessageResponse {
        message: "Address deleted successfully",
    }))
}

async fn handle_report(State(state): State<AppState>) -> Result<Json<BmaReport>, AppError> {
    Ok(Json(state.service.get_report(false).await?.report))
}

async fn handle_refresh_report(
    State(state): State<AppState>,
) -> Result<Json<BmaReport>, AppError> {
    Ok(Json(state.service.get_report(true).await?.report))
}

async fn handle_get_instructions(
    State(state): State<AppState>,
) -> Result<Json<InstructionsBody>, AppError> {
    Ok(Json(InstructionsBody {
        instructions: state.service.get_instructions().await?,
    }))
}

async fn handle_update_instructions(
    State(state): State<AppState>,
    payload: Result<Json<InstructionsBody>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let req = body(payload)?;
    state.service.update_instructions(&req.instructions).await?;
    Ok(Json(StatusResponse { status: "success" }))
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
