#![deny(unsafe_code)]

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ledger_bridge_core::{
    BridgeConfig, BridgeError, LedgerInvoker, SubmittedTransaction, TransactionInvoker,
    TransactionRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ServiceState {
    pub invoker: Arc<dyn TransactionInvoker>,
}

impl ServiceState {
    pub fn new(invoker: Arc<dyn TransactionInvoker>) -> Self {
        Self { invoker }
    }

    /// Loads credentials and trust roots once; every request then dials its own session.
    pub fn bootstrap(config: BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self::new(Arc::new(LedgerInvoker::from_config(config)?)))
    }
}

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/api/log-event", post(log_event))
        .route("/api/increment-token", post(increment_token))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
        .with_state(state)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEventRequest {
    pub event_id: String,
    pub event_type: String,
    pub event_details: String,
    pub user: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncrementTokenRequest {
    pub user_id: String,
    pub token: String,
    pub amount: i64,
}

/// Optional peer selector; only names from the configured peer directory are honoured.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerQuery {
    pub peer: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request payload: {0}")]
    InvalidPayload(String),

    #[error("{context}: {source}")]
    Pipeline {
        context: &'static str,
        #[source]
        source: BridgeError,
    },
}

impl ApiError {
    fn invalid_payload(rejection: JsonRejection) -> Self {
        Self::InvalidPayload(rejection.body_text())
    }

    fn pipeline(context: &'static str) -> impl FnOnce(BridgeError) -> Self {
        move |source| Self::Pipeline { context, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline { source, .. } if source.class().is_client_fault() => {
                StatusCode::BAD_REQUEST
            }
            Self::Pipeline { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Pipeline { source, .. } = &self {
            warn!(
                %status,
                class = ?source.class(),
                retriable = source.is_retriable(),
                error = %source,
                "ledger call failed"
            );
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    channel: String,
    contract: String,
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "ledger-bridge-service",
        channel: state.invoker.channel().to_string(),
        contract: state.invoker.contract().to_string(),
    })
}

async fn invoke(
    state: &ServiceState,
    query: &PeerQuery,
    request: TransactionRequest,
    context: &'static str,
) -> Result<SubmittedTransaction, ApiError> {
    state
        .invoker
        .invoke(query.peer.as_deref(), request)
        .await
        .map_err(ApiError::pipeline(context))
}

async fn log_event(
    State(state): State<ServiceState>,
    Query(query): Query<PeerQuery>,
    payload: Result<Json<LogEventRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(event) = payload.map_err(ApiError::invalid_payload)?;
    let request = TransactionRequest::new(
        "LogEvent",
        [
            event.event_id,
            event.event_type,
            event.event_details,
            event.user,
            event.timestamp,
        ],
    );

    let committed = invoke(&state, &query, request, "Failed to log event").await?;
    info!(transaction_id = %committed.transaction_id, "event logged");
    Ok("Event logged successfully")
}

async fn increment_token(
    State(state): State<ServiceState>,
    Query(query): Query<PeerQuery>,
    payload: Result<Json<IncrementTokenRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(increment) = payload.map_err(ApiError::invalid_payload)?;
    let request = TransactionRequest::new(
        "IncrementToken",
        [
            json!(increment.user_id),
            json!(increment.token),
            json!(increment.amount),
        ],
    );

    let committed = invoke(&state, &query, request, "Failed to increment token").await?;
    info!(transaction_id = %committed.transaction_id, "token incremented");
    Ok("Token incremented successfully")
}
