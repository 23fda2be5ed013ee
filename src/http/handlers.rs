use super::socket::handle_socket;
use super::state::AppState;
use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SocketParams {
    /// Credential presented by the participant
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub active_sessions: usize,
    pub connections: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /interview/ws?token=...
/// Authenticate and upgrade to the participant socket
pub async fn interview_socket(
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Some(token) = params.token else {
        return unauthorized("Missing token");
    };

    let identity = match state.identity.verify(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejected interview socket: {}", e);
            return unauthorized(&e.to_string());
        }
    };

    info!("Upgrading interview socket for participant {}", identity.participant_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
        .into_response()
}

fn unauthorized(message: &str) -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// GET /sessions
/// Count of live sessions and connections
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(SessionsResponse {
        active_sessions: state.registry.active_count(),
        connections: state.relay.connection_count(),
    })
}

/// GET /sessions/:participant_id
/// Status of one participant's session
pub async fn get_session(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.snapshot(&participant_id).await {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No session for participant {}", participant_id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
