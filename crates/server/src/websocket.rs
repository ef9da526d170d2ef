//! Carrier media-stream WebSocket upgrade handler (spec §4.9/§4.10): wires a
//! fresh `CallSessionHandle` to the socket, polling the bridge's outbound
//! wire-frame queue on one side and feeding parsed carrier envelopes into
//! it on the other.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};

use voxloop_core::Call;
use voxloop_llm::{FakeLlmSession, LlmSession, RealtimeSession, VoiceConfig};
use voxloop_media::{CarrierEvent, MediaError};

use crate::rate_limit::ConnectionRateLimiter;
use crate::session::{spawn_call_session, ControlEvent};
use crate::state::AppState;
use crate::ServerError;

/// `GET /media-stream/:callId` (spec §4.10). The call must already exist
/// (created by `start_outbound_call` or an inbound-call webhook) before the
/// carrier opens this socket.
pub async fn media_stream_handler(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ServerError> {
    let call = state
        .call_store
        .get_call(&call_id)
        .await?
        .ok_or_else(|| ServerError::CallNotFound(call_id.clone()))?;

    let agent = state
        .directory
        .agents
        .get(&call.agent_id)
        .ok_or_else(|| ServerError::AgentNotFound(call.agent_id.clone()))?
        .clone();

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, call_id, call, agent)))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    call_id: String,
    call: Call,
    agent: voxloop_core::AgentConfig,
) {
    let settings = state.settings();
    let mut rate_limiter = ConnectionRateLimiter::new(&settings.rate_limit);

    let voice = VoiceConfig {
        voice_id: agent.voice_profile.voice_id.clone(),
        language_code: agent.voice_profile.language_code.clone(),
    };
    let base_prompt = format!("{} Characteristics: {}.", agent.prompt, agent.characteristics.join(", "));
    let connect_timeout = Duration::from_secs(settings.pipeline.timeouts.llm_connect_secs);
    let dead_session_timeout = Duration::from_secs(settings.pipeline.timeouts.llm_dead_session_secs);

    let connect_result = tokio::time::timeout(
        connect_timeout,
        RealtimeSession::open(
            &settings.llm.endpoint,
            &settings.llm.api_key,
            &settings.llm.model,
            base_prompt,
            voice,
            connect_timeout,
            dead_session_timeout,
        ),
    )
    .await;

    let (initial_llm_session, setup_ok): (Arc<dyn LlmSession>, bool) = match connect_result {
        Ok(Ok(session)) => (Arc::new(session), true),
        Ok(Err(err)) => {
            tracing::warn!(call_id = %call_id, error = %err, "initial llm connect failed");
            (Arc::new(FakeLlmSession::new(Vec::new())), false)
        }
        Err(_) => {
            tracing::warn!(call_id = %call_id, "initial llm connect timed out");
            (Arc::new(FakeLlmSession::new(Vec::new())), false)
        }
    };

    let handle = spawn_call_session(
        call_id.clone(),
        agent,
        call,
        state.hedge_engine.clone(),
        state.call_store.clone(),
        Arc::new(settings.clone()),
        initial_llm_session,
    )
    .await;

    state.sessions.insert(call_id.clone(), handle.clone());

    if setup_ok {
        handle.send_control(ControlEvent::SetupOk).await;
    } else {
        handle.send_control(ControlEvent::SetupFailed).await;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();
    let bridge = handle.bridge.clone();
    let writer_bridge = bridge.clone();

    let writer_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(10));
        loop {
            interval.tick().await;
            while let Some(wire) = writer_bridge.next_outbound_wire_frame() {
                let text = String::from_utf8_lossy(&wire).into_owned();
                if ws_tx.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };
        let bytes = match msg {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bin) => bin,
            Message::Close(_) => break,
            _ => continue,
        };

        if let Err(err) = rate_limiter.check(bytes.len()) {
            tracing::warn!(call_id = %call_id, error = %err, "media-stream rate limit exceeded, closing connection");
            break;
        }

        match CarrierEvent::parse(&bytes) {
            Ok(event) => {
                if let Err(err) = bridge.handle_event(event).await {
                    tracing::warn!(call_id = %call_id, error = %err, "media bridge rejected carrier frame");
                    if matches!(err, MediaError::CarrierTooSlow) {
                        break;
                    }
                }
            }
            Err(err) => tracing::warn!(call_id = %call_id, error = %err, "malformed carrier envelope"),
        }
    }

    writer_task.abort();
    state.sessions.remove(&call_id);
    let deadline = Duration::from_secs(settings.pipeline.timeouts.manual_hangup_cleanup_secs);
    handle.shutdown(deadline).await;
}
