//! HTTP endpoints: the SignalingRouter surface (spec §4.10). Carrier-facing
//! call setup and webhooks, plus the ambient operator endpoints (health,
//! readiness, metrics, config reload).

use axum::{
    extract::{Json, Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use voxloop_core::{Call, CallDirection, CallStatus};
use voxloop_provider::{build_driver, initiate_call_with_retry, normalize_digits};

use crate::state::AppState;
use crate::websocket::media_stream_handler;
use crate::ServerError;

pub fn create_router(state: AppState) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/call/outbound", post(start_outbound_call))
        .route("/call-status", post(call_status_webhook))
        .route("/recording-status", post(recording_status_webhook))
        .route("/media-callback/:callId", get(media_callback).post(media_callback))
        .route("/media-stream/:callId", get(media_stream_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/admin/reload-config", post(reload_config))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct OutboundCallRequest {
    #[serde(rename = "agentId")]
    agent_id: String,
    #[serde(rename = "toPhone")]
    to_phone: String,
    #[serde(rename = "leadId")]
    #[allow(dead_code)]
    lead_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutboundCallResponse {
    #[serde(rename = "callId")]
    call_id: String,
    status: String,
    #[serde(rename = "providerCallId")]
    provider_call_id: Option<String>,
}

/// `POST /call/outbound {agentId, toPhone, leadId?}` (spec §4.10). Resolves
/// the agent's assigned provider and caller-id from the in-memory
/// `Directory`, dials through `ProviderDriver.initiate_call`, and persists
/// the `Call` in its initial status.
async fn start_outbound_call(
    State(state): State<AppState>,
    Json(req): Json<OutboundCallRequest>,
) -> Result<Json<OutboundCallResponse>, ServerError> {
    let agent = state
        .directory
        .agents
        .get(&req.agent_id)
        .ok_or_else(|| ServerError::AgentNotFound(req.agent_id.clone()))?
        .clone();

    let phone = state
        .directory
        .phone_numbers
        .get(&req.agent_id)
        .ok_or_else(|| ServerError::NoPhoneNumberAssigned(req.agent_id.clone()))?
        .clone();

    let provider = state
        .directory
        .providers
        .get(&phone.provider_config_id)
        .ok_or_else(|| ServerError::Internal(format!("provider {} not registered", phone.provider_config_id)))?
        .clone();

    let _ = &agent;

    let to_e164 = normalize_digits(&req.to_phone);
    let settings = state.settings();
    let call_id = uuid::Uuid::new_v4().to_string();
    let mut call = Call::new(
        call_id.clone(),
        agent.id.clone(),
        provider.id.clone(),
        phone.e164.clone(),
        to_e164.clone(),
        CallDirection::Outbound,
        Utc::now(),
    );

    let driver = build_driver(&provider, &state.vault, &state.factory_config)?;

    let media_callback_url = format!("{}/media-callback/{}", settings.server.public_base_url, call_id);
    let status_callback_url = format!("{}/call-status", settings.server.public_base_url);

    let result = match initiate_call_with_retry(
        driver.as_ref(),
        &to_e164,
        &phone.e164,
        &media_callback_url,
        &status_callback_url,
    )
    .await
    {
        Ok(result) => result,
        Err(err) => {
            call.transition_status(CallStatus::Failed, Utc::now());
            let _ = state.call_store.create_call(&call).await;
            tracing::warn!(call_id = %call.id, error = %err, "outbound call initiation failed");
            return Err(ServerError::from(err));
        }
    };

    call.provider_call_id = Some(result.provider_call_id.clone());
    call.transition_status(CallStatus::Dialing, Utc::now());
    state.call_store.create_call(&call).await?;

    Ok(Json(OutboundCallResponse {
        call_id: call.id,
        status: format!("{:?}", call.status).to_lowercase(),
        provider_call_id: Some(result.provider_call_id),
    }))
}

#[derive(Debug, Deserialize)]
struct CallStatusWebhook {
    #[serde(rename = "callId")]
    call_id: String,
    status: String,
}

fn parse_status(raw: &str) -> Option<CallStatus> {
    match raw.to_lowercase().as_str() {
        "init" => Some(CallStatus::Init),
        "dialing" | "queued" | "initiated" => Some(CallStatus::Dialing),
        "ringing" => Some(CallStatus::Ringing),
        "answered" => Some(CallStatus::Answered),
        "in_progress" | "in-progress" | "inprogress" => Some(CallStatus::InProgress),
        "completed" | "complete" => Some(CallStatus::Completed),
        "failed" => Some(CallStatus::Failed),
        "no_answer" | "no-answer" | "noanswer" => Some(CallStatus::NoAnswer),
        "busy" => Some(CallStatus::Busy),
        "voicemail" => Some(CallStatus::Voicemail),
        _ => None,
    }
}

/// `POST /call-status` carrier webhook → `Call.TransitionStatus` (spec
/// §4.10). Re-delivered or stale statuses are silently ignored by
/// `Call::transition_status`'s monotonic guard; this handler always
/// answers 200 so the carrier doesn't retry a webhook we've already acted
/// on (or intentionally ignored).
async fn call_status_webhook(
    State(state): State<AppState>,
    Json(webhook): Json<CallStatusWebhook>,
) -> Result<StatusCode, ServerError> {
    let Some(mut call) = state.call_store.get_call(&webhook.call_id).await? else {
        return Err(ServerError::CallNotFound(webhook.call_id));
    };

    if let Some(status) = parse_status(&webhook.status) {
        call.transition_status(status, Utc::now());
        state.call_store.save_call(&call).await?;
    } else {
        tracing::warn!(call_id = %webhook.call_id, status = %webhook.status, "unrecognized call-status webhook value");
    }

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct RecordingStatusWebhook {
    #[serde(rename = "callId")]
    call_id: String,
    #[serde(rename = "recordingUrl")]
    recording_url: String,
}

/// `POST /recording-status` → `CallStore.AttachRecording` (spec §4.10).
async fn recording_status_webhook(
    State(state): State<AppState>,
    Json(webhook): Json<RecordingStatusWebhook>,
) -> Result<StatusCode, ServerError> {
    state
        .call_store
        .attach_recording(&webhook.call_id, &webhook.recording_url)
        .await?;
    Ok(StatusCode::OK)
}

/// `GET|POST /media-callback/:callId` → `ProviderDriver.AnswerScript` (spec
/// §4.10): returns the carrier-specific payload pointing it at
/// `<publicWsBase>/media-stream/<callId>`.
async fn media_callback(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Vec<u8>, ServerError> {
    let call = state
        .call_store
        .get_call(&call_id)
        .await?
        .ok_or_else(|| ServerError::CallNotFound(call_id.clone()))?;

    let provider = state
        .directory
        .providers
        .get(&call.provider_id)
        .ok_or_else(|| ServerError::Internal(format!("provider {} not registered", call.provider_id)))?
        .clone();

    let driver = build_driver(&provider, &state.vault, &state.factory_config)?;
    let settings = state.settings();
    Ok(driver.answer_script(&call_id, &settings.server.public_ws_base))
}

async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /ready` — readiness beyond process-liveness: the call store must
/// answer, and at least one provider must be registered to dial with.
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let store_ok = state.call_store.get_call("__readiness_probe__").await.is_ok();
    let providers_registered = !state.directory.providers.is_empty();
    let active_sessions = state.sessions.len();

    let ready = store_ok;
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "store": store_ok,
            "providersRegistered": providers_registered,
            "activeSessions": active_sessions,
        })),
    )
}

/// `POST /admin/reload-config` — re-reads layered config from disk/env
/// without restarting; only safe-to-change-live fields take effect for
/// calls already in flight (spec §2.2 ambient hot-reload).
async fn reload_config(State(state): State<AppState>) -> impl IntoResponse {
    let env = std::env::var("VOXLOOP_ENV").ok();
    match state.reload_settings(env.as_deref()) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "success" })),
        ),
        Err(err) => {
            tracing::error!(error = %err, "config reload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": "error", "message": err.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_status_aliases() {
        assert_eq!(parse_status("in-progress"), Some(CallStatus::InProgress));
        assert_eq!(parse_status("INITIATED"), Some(CallStatus::Dialing));
        assert_eq!(parse_status("bogus"), None);
    }
}
