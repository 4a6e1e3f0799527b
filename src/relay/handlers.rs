//! Request handlers for the relay endpoints

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::error::RelayError;
use super::helpers::client_key;
use super::models::{ChatRequest, ChatResponse, ErrorBody, HealthResponse};
use super::rate_limit::Admission;
use super::sanitize;
use super::state::RelayState;
use super::upstream::CompletionRequest;

const SERVICE_NAME: &str = "Relationship Advice API";

/// POST /api/chat
///
/// Validates the conversation, forwards it with the system prompt, and
/// returns the cleaned reply. Every outcome is logged with its status and
/// elapsed time.
pub async fn chat_handler(State(state): State<RelayState>, body: Bytes) -> Response {
    let started = Instant::now();
    let result = relay_chat(&state, &body, started).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(reply) => {
            tracing::info!(
                status = StatusCode::OK.as_u16(),
                elapsed_ms,
                chars = reply.content.chars().count(),
                "Chat relayed"
            );
            Json(reply).into_response()
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(status = status.as_u16(), elapsed_ms, error = %err, "Chat failed");
            } else {
                tracing::warn!(status = status.as_u16(), elapsed_ms, error = %err, "Chat rejected");
            }
            err.into_response()
        }
    }
}

async fn relay_chat(
    state: &RelayState,
    body: &[u8],
    started: Instant,
) -> Result<ChatResponse, RelayError> {
    let request = ChatRequest::from_body(body).ok_or(RelayError::InvalidRequest)?;
    let messages = request.with_system_prompt(&state.system_prompt);

    let dispatch = &state.dispatch;
    let completion = CompletionRequest {
        model: &dispatch.model,
        messages: &messages,
        max_tokens: dispatch.max_tokens,
        temperature: dispatch.temperature,
    };

    tracing::debug!(
        messages = messages.len(),
        model = %dispatch.model,
        "Dispatching to upstream"
    );

    let raw = state.upstream.send(&completion, dispatch.timeout).await?;
    let content = sanitize::clean(&raw);

    Ok(ChatResponse::new(
        content,
        started.elapsed().as_millis() as u64,
    ))
}

/// GET /health
pub async fn health_handler(State(state): State<RelayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        environment: state.environment.to_string(),
    })
}

/// Fallback for unknown routes
pub async fn not_found(method: Method, uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(
            "Not found",
            format!("Cannot {} {}", method, uri.path()),
        )),
    )
        .into_response()
}

/// Per-client sliding window check, applied before any route runs
pub async fn rate_limit_middleware(
    State(state): State<RelayState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(
        request.headers(),
        connect_info.as_ref(),
        state.trust_forwarded_for,
    );

    match state.limiter.check(&client) {
        Admission::Admitted => next.run(request).await,
        Admission::Rejected { retry_after } => {
            tracing::warn!(
                client = %client,
                path = %request.uri().path(),
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            RelayError::RateLimited { retry_after }.into_response()
        }
    }
}
