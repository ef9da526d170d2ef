//! voxloop call-pipeline server: SignalingRouter HTTP/WS surface (spec §4.10)
//! plus per-call orchestration.

pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use rate_limit::{ConnectionRateLimiter, RateLimitError};
pub use session::{spawn_call_session, CallSessionHandle, ControlEvent};
pub use state::{AppState, Directory};

use thiserror::Error;

/// Errors surfaced by SignalingRouter HTTP handlers, mapped to the HTTP
/// status a carrier or operator tool sees.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("call not found: {0}")]
    CallNotFound(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("no phone number assigned to agent: {0}")]
    NoPhoneNumberAssigned(String),

    #[error("provider error: {0}")]
    Provider(#[from] voxloop_provider::ProviderError),

    #[error("store error: {0}")]
    Store(#[from] voxloop_store::StoreError),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> axum::http::StatusCode {
        match self {
            ServerError::CallNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::AgentNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::NoPhoneNumberAssigned(_) => axum::http::StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Provider(_) => axum::http::StatusCode::BAD_GATEWAY,
            ServerError::Store(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::RateLimit => axum::http::StatusCode::TOO_MANY_REQUESTS,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        err.status()
    }
}

impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
