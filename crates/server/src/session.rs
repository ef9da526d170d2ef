//! Per-call orchestration (spec §5): one state-machine tick driver per call,
//! fed by two cooperating workers — an inbound media reader and an LLM event
//! consumer — over bounded channels. The driver owns the `CallStateMachine`
//! and is the only place that executes its `CallAction`s.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex as PLMutex;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;

use voxloop_codec::SampleRate;
use voxloop_config::Settings;
use voxloop_core::{AgentConfig, Call, CallOutcome, CallStatus};
use voxloop_fsm::{CallAction, CallEvent, CallState, CallStateMachine, TimerKind};
use voxloop_intelligence::HedgeEngine;
use voxloop_llm::{reconnect_once, LlmEvent, LlmSession, VoiceConfig};
use voxloop_media::MediaBridge;
use voxloop_provider::AnsweredBy;
use voxloop_store::{retry_persist, CallStore};
use voxloop_vad::{VadConfig, VadEvent, VoiceActivityDetector};
use voxloop_latency::LatencyTracker;

/// External control inputs the HTTP layer and media socket feed into a
/// running session. VAD and LLM events reach the driver on their own
/// channels, so this only carries the carrier-webhook and manual-hangup
/// signals.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    SetupOk,
    SetupFailed,
    AnsweredByDetected(AnsweredBy),
    ManualHangup,
}

/// The caller-facing parts of a running session: enough to feed it frames,
/// signal it, and read back its current state.
pub struct CallSessionHandle {
    pub call_id: String,
    pub bridge: Arc<MediaBridge>,
    pub latency: Arc<LatencyTracker>,
    call: Arc<PLMutex<Call>>,
    control_tx: mpsc::Sender<ControlEvent>,
    driver_task: JoinHandle<()>,
    inbound_task: JoinHandle<()>,
}

impl CallSessionHandle {
    pub async fn send_control(&self, event: ControlEvent) {
        let _ = self.control_tx.send(event).await;
    }

    pub fn snapshot_call(&self) -> Call {
        self.call.lock().clone()
    }

    /// Tears down the session's workers. Spec §5: cleanup should finish
    /// within `manual_hangup_cleanup_secs`; past that, the tasks are aborted
    /// outright rather than left to drain.
    pub async fn shutdown(&self, deadline: Duration) {
        let _ = self.control_tx.send(ControlEvent::ManualHangup).await;

        let abort = tokio::time::sleep(deadline);
        tokio::pin!(abort);
        tokio::select! {
            _ = &mut abort => {
                self.driver_task.abort();
                self.inbound_task.abort();
            }
            _ = wait_finished(&self.driver_task) => {}
        }
    }
}

async fn wait_finished(handle: &JoinHandle<()>) {
    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Static connection parameters needed to reconnect the LLM session
/// mid-call (spec §4.8/§7: one reconnect attempt, same system instruction).
struct LlmConnectParams {
    endpoint: String,
    api_key: String,
    model: String,
    voice: VoiceConfig,
    connect_timeout: Duration,
    dead_session_timeout: Duration,
    reconnect_deadline: Duration,
}

/// Runs one `LlmSession`'s event stream: forwards `AudioChunk` bytes
/// straight to the media bridge (they are not gated by the state machine)
/// and relays every event to the driver over `tx` for FSM translation.
fn spawn_llm_consumer(
    session: Arc<dyn LlmSession>,
    bridge: Arc<MediaBridge>,
) -> (JoinHandle<()>, mpsc::Receiver<LlmEvent>) {
    let (tx, rx) = mpsc::channel(64);
    let handle = tokio::spawn(async move {
        loop {
            match session.next_event().await {
                Some(LlmEvent::AudioChunk(bytes)) => {
                    bridge.enqueue_outbound_pcm16(&bytes, SampleRate::Hz24000);
                    if tx.send(LlmEvent::AudioChunk(bytes)).await.is_err() {
                        break;
                    }
                }
                Some(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    });
    (handle, rx)
}

/// Constructs a fresh session and spawns its workers. Returns immediately;
/// the driver arms the INIT setup timer on its first tick.
pub async fn spawn_call_session(
    call_id: String,
    agent_config: AgentConfig,
    call: Call,
    hedge_engine: Arc<HedgeEngine>,
    call_store: Arc<dyn CallStore>,
    settings: Arc<Settings>,
    initial_llm_session: Arc<dyn LlmSession>,
) -> Arc<CallSessionHandle> {
    let bridge = Arc::new(MediaBridge::new(settings.pipeline.media.clone()));
    let vad = Arc::new(VoiceActivityDetector::new(VadConfig {
        energy_threshold_db: settings.pipeline.vad.energy_threshold_db,
        silence_hangover_ms: settings.pipeline.vad.silence_hangover_ms,
        min_speech_ms: settings.pipeline.vad.min_speech_ms,
        frame_ms: settings.pipeline.vad.frame_ms,
    }));

    let latency = Arc::new(LatencyTracker::new(call_id.clone()));
    latency.record_call_start(call.started_at);
    latency.record_session_ready(Utc::now());

    let interruption_debounce = Duration::from_millis(agent_config.speech.interruption_debounce_ms());

    let base_prompt = format!(
        "{} Characteristics: {}.",
        agent_config.prompt,
        agent_config.characteristics.join(", ")
    );
    let llm_params = LlmConnectParams {
        endpoint: settings.llm.endpoint.clone(),
        api_key: settings.llm.api_key.clone(),
        model: settings.llm.model.clone(),
        voice: VoiceConfig {
            voice_id: agent_config.voice_profile.voice_id.clone(),
            language_code: agent_config.voice_profile.language_code.clone(),
        },
        connect_timeout: Duration::from_secs(settings.pipeline.timeouts.llm_connect_secs),
        dead_session_timeout: Duration::from_secs(settings.pipeline.timeouts.llm_dead_session_secs),
        reconnect_deadline: Duration::from_secs(settings.pipeline.fsm.llm_reconnect_deadline_secs),
    };

    let fsm =
        CallStateMachine::new(call_id.clone(), agent_config, hedge_engine, base_prompt.clone(), call.started_at);

    let (control_tx, control_rx) = mpsc::channel(16);
    let (vad_tx, vad_rx) = mpsc::channel(64);

    let inbound_vad = vad.clone();
    let inbound_rx = bridge.take_inbound_receiver();
    let inbound_task = tokio::spawn(async move {
        let Some(mut rx) = inbound_rx else { return };
        while let Some(frame) = rx.recv().await {
            for event in inbound_vad.process_frame(frame) {
                if vad_tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    });

    let (llm_task, llm_rx) = spawn_llm_consumer(initial_llm_session.clone(), bridge.clone());

    let call = Arc::new(PLMutex::new(call));
    let driver = Driver {
        fsm,
        call: call.clone(),
        call_store,
        bridge: bridge.clone(),
        llm: Arc::new(Mutex::new(initial_llm_session)),
        llm_task,
        llm_params,
        latency: latency.clone(),
        turn_transcript: String::new(),
        turn_audio_seen: false,
        interruption_debounce,
        last_system_instruction: base_prompt,
    };

    let driver_task = tokio::spawn(driver.run(control_rx, vad_rx, llm_rx));

    Arc::new(CallSessionHandle {
        call_id,
        bridge,
        latency,
        call,
        control_tx,
        driver_task,
        inbound_task,
    })
}

struct Driver {
    fsm: CallStateMachine,
    call: Arc<PLMutex<Call>>,
    call_store: Arc<dyn CallStore>,
    bridge: Arc<MediaBridge>,
    llm: Arc<Mutex<Arc<dyn LlmSession>>>,
    llm_task: JoinHandle<()>,
    llm_params: LlmConnectParams,
    latency: Arc<LatencyTracker>,
    turn_transcript: String,
    turn_audio_seen: bool,
    interruption_debounce: Duration,
    /// The most recent instruction sent via `UpdateSystemInstruction`,
    /// falling back to the base prompt before the first turn. Replayed on
    /// LLM reconnect (spec §7: "with the same system instruction").
    last_system_instruction: String,
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.llm_task.abort();
    }
}

impl Driver {
    async fn run(
        mut self,
        mut control_rx: mpsc::Receiver<ControlEvent>,
        mut vad_rx: mpsc::Receiver<VadEvent>,
        mut llm_rx: mpsc::Receiver<LlmEvent>,
    ) {
        let mut timers: HashMap<TimerKind, TokioInstant> = HashMap::new();
        let mut interruption_started: Option<TokioInstant> = None;

        for action in self.fsm.start() {
            self.apply(action, &mut timers).await;
        }

        'driver: loop {
            if self.fsm.state().is_terminal() {
                break;
            }

            let next_deadline = timers.values().min().copied();
            let sleep = async move {
                match next_deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                maybe = control_rx.recv() => {
                    match maybe {
                        Some(ControlEvent::SetupOk) => self.tick(CallEvent::SetupOk, &mut timers).await,
                        Some(ControlEvent::SetupFailed) => self.tick(CallEvent::SetupFailed, &mut timers).await,
                        Some(ControlEvent::AnsweredByDetected(by)) => {
                            self.tick(CallEvent::AnsweredByDetected(by), &mut timers).await;
                        }
                        Some(ControlEvent::ManualHangup) => self.tick(CallEvent::ManualHangup, &mut timers).await,
                        None => break 'driver,
                    }
                }
                maybe = vad_rx.recv() => {
                    match maybe {
                        Some(VadEvent::SpeechStart) => {
                            match self.fsm.state() {
                                CallState::Listening => self.tick(CallEvent::SpeechStart, &mut timers).await,
                                CallState::Responding => {
                                    interruption_started.get_or_insert_with(TokioInstant::now);
                                }
                                _ => {}
                            }
                        }
                        Some(VadEvent::AudioChunk(frame)) => {
                            match self.fsm.state() {
                                CallState::HumanSpeaking => {
                                    let pcm = frame.to_pcm16();
                                    let _ = self.llm.lock().await.send_audio(&pcm).await;
                                    self.tick(CallEvent::AudioChunk, &mut timers).await;
                                }
                                CallState::Responding => {
                                    if let Some(started) = interruption_started {
                                        if started.elapsed() >= self.interruption_debounce {
                                            interruption_started = None;
                                            let _ = self.llm.lock().await.cancel().await;
                                            self.tick(CallEvent::InterruptionDetected, &mut timers).await;
                                        }
                                    }
                                }
                                _ => {}
                            }
                        }
                        Some(VadEvent::SpeechEnd { .. }) => {
                            match self.fsm.state() {
                                CallState::HumanSpeaking => {
                                    interruption_started = None;
                                    let transcript = std::mem::take(&mut self.turn_transcript);
                                    self.latency.begin_turn(Utc::now());
                                    self.turn_audio_seen = false;
                                    self.tick(CallEvent::SpeechEnd { transcript }, &mut timers).await;
                                }
                                CallState::Responding => {
                                    // Burst ended without crossing the debounce: don't let a
                                    // stale start time carry into the next burst.
                                    interruption_started = None;
                                }
                                _ => {}
                            }
                        }
                        None => break 'driver,
                    }
                }
                maybe = llm_rx.recv() => {
                    match maybe {
                        Some(LlmEvent::ResponseStart) => {
                            if self.fsm.state() == CallState::Thinking {
                                self.latency.record_response_start(Utc::now());
                                self.tick(CallEvent::LlmResponseStart, &mut timers).await;
                            }
                        }
                        Some(LlmEvent::ResponseComplete) => {
                            match self.fsm.state() {
                                CallState::Welcome => self.tick(CallEvent::WelcomeAudioFinished, &mut timers).await,
                                CallState::Responding => self.tick(CallEvent::ResponseComplete, &mut timers).await,
                                _ => {}
                            }
                        }
                        Some(LlmEvent::TranscriptPartial(text)) => {
                            self.turn_transcript.push_str(&text);
                        }
                        Some(LlmEvent::AudioChunk(_)) => {
                            if !self.turn_audio_seen {
                                self.turn_audio_seen = true;
                                self.latency.record_first_response_audio(Utc::now());
                            }
                            self.latency.record_first_outbound_audio(Utc::now());
                        }
                        Some(LlmEvent::ResponseTextPartial(_)) => {}
                        Some(LlmEvent::Error(reason)) => {
                            match self.reconnect_llm(reason, &mut timers).await {
                                Some(new_rx) => llm_rx = new_rx,
                                None => {
                                    self.force_end_call(CallOutcome::LlmUnavailable, CallStatus::Failed).await;
                                    break 'driver;
                                }
                            }
                        }
                        None => {
                            match self.reconnect_llm("llm consumer channel closed".into(), &mut timers).await {
                                Some(new_rx) => llm_rx = new_rx,
                                None => {
                                    self.force_end_call(CallOutcome::LlmUnavailable, CallStatus::Failed).await;
                                    break 'driver;
                                }
                            }
                        }
                    }
                }
                _ = sleep => {
                    let now = TokioInstant::now();
                    let fired: Vec<TimerKind> = timers
                        .iter()
                        .filter(|(_, &deadline)| deadline <= now)
                        .map(|(kind, _)| *kind)
                        .collect();
                    for kind in fired {
                        timers.remove(&kind);
                        self.tick(CallEvent::Timeout(kind), &mut timers).await;
                    }
                }
            }
        }

        self.llm.lock().await.close().await;
        tracing::debug!(
            call_id = %self.call.lock().id,
            depth_ms = self.bridge.outbound_queue_depth_ms(),
            "media bridge drained at call end"
        );
        self.persist_final().await;
    }

    async fn tick(&mut self, event: CallEvent, timers: &mut HashMap<TimerKind, TokioInstant>) {
        let at = Utc::now();
        match self.fsm.transition(event, at) {
            Ok(actions) => {
                for action in actions {
                    self.apply(action, timers).await;
                }
            }
            Err(e) => tracing::warn!(call_id = %self.call.lock().id, error = %e, "ignoring invalid fsm transition"),
        }
    }

    async fn apply(&mut self, action: CallAction, timers: &mut HashMap<TimerKind, TokioInstant>) {
        match action {
            CallAction::PlayWelcome { text } => {
                let _ = self.llm.lock().await.send_text(&text).await;
            }
            CallAction::PersistStatus(status) => self.persist_status(status).await,
            CallAction::StartVad | CallAction::StartBuffering | CallAction::ForwardAudioToLlm => {}
            CallAction::UpdateSystemInstruction(instruction) => {
                self.last_system_instruction = instruction.clone();
                let _ = self.llm.lock().await.update_system_instruction(&instruction).await;
            }
            CallAction::StartFiller(clip) => {
                if !clip.is_synthetic_silence() {
                    match tokio::fs::read(&clip.audio_path).await {
                        Ok(bytes) => self.bridge.enqueue_outbound_pcm16(&bytes, SampleRate::Hz24000),
                        Err(e) => tracing::warn!(clip = %clip.id, error = %e, "failed to read filler clip"),
                    }
                }
            }
            CallAction::StopFiller => {
                let flushed = self.bridge.flush_outbound();
                if flushed > 0 {
                    tracing::debug!(call_id = %self.call.lock().id, flushed, "flushed queued filler audio");
                }
            }
            CallAction::CancelLlmResponse => {
                let _ = self.llm.lock().await.cancel().await;
            }
            CallAction::SendText(text) => {
                let _ = self.llm.lock().await.send_text(&text).await;
            }
            CallAction::CloseLlmSession => self.llm.lock().await.close().await,
            CallAction::FinalizeCall => self.persist_final().await,
            CallAction::EmitWebhook => {
                tracing::info!(call_id = %self.call.lock().id, "call ended, webhook collaborator notified");
            }
            CallAction::ArmTimer(kind, duration) => {
                timers.insert(kind, TokioInstant::now() + duration);
            }
            CallAction::CancelTimer(kind) => {
                timers.remove(&kind);
            }
            CallAction::LogError(message) => {
                tracing::warn!(call_id = %self.call.lock().id, %message, "fsm error");
            }
        }
    }

    async fn persist_status(&self, status: CallStatus) {
        let call = {
            let mut call = self.call.lock();
            call.transition_status(status, Utc::now());
            call.clone()
        };
        self.save(call).await;
    }

    /// Marks the call `Completed` unless a carrier webhook already set a
    /// terminal status (spec §4.6: carrier status callbacks are the source
    /// of truth for `Failed`/`NoAnswer`/`Busy`; the conversation loop only
    /// supplies the default "it ended normally" outcome).
    async fn persist_final(&self) {
        let bottleneck = self.latency.bottleneck();
        let call = {
            let mut call = self.call.lock();
            if !call.status.is_terminal() {
                call.transition_status(CallStatus::Completed, Utc::now());
            }
            if let Some(stage) = bottleneck {
                call.metrics.bottleneck_stage = Some(stage.as_str().to_string());
            }
            call.clone()
        };
        self.save(call).await;
    }

    async fn force_end_call(&self, outcome: CallOutcome, status: CallStatus) {
        let call = {
            let mut call = self.call.lock();
            call.outcome = Some(outcome);
            call.transition_status(status, Utc::now());
            call.clone()
        };
        self.save(call).await;
    }

    async fn save(&self, call: Call) {
        let call_store = self.call_store.clone();
        let call_id = call.id.clone();
        retry_persist("save_call", &call_id, move || {
            let store = call_store.clone();
            let call = call.clone();
            async move { store.save_call(&call).await.map_err(Into::into) }
        })
        .await;
    }

    /// Spec §4.8/§7: one reconnect attempt with the same system instruction.
    /// `Some` carries the new session's event receiver for the caller to
    /// swap in; `None` means the reconnect failed or timed out and the call
    /// should end with `outcome=llm_unavailable`.
    async fn reconnect_llm(
        &mut self,
        reason: String,
        timers: &mut HashMap<TimerKind, TokioInstant>,
    ) -> Option<mpsc::Receiver<LlmEvent>> {
        tracing::warn!(call_id = %self.call.lock().id, reason, "llm session dropped, attempting one reconnect");

        let result = reconnect_once(
            &self.llm_params.endpoint,
            &self.llm_params.api_key,
            &self.llm_params.model,
            self.last_system_instruction.clone(),
            self.llm_params.voice.clone(),
            self.llm_params.connect_timeout,
            self.llm_params.dead_session_timeout,
            self.llm_params.reconnect_deadline,
        )
        .await;

        match result {
            Ok(session) => {
                let session: Arc<dyn LlmSession> = Arc::new(session);
                *self.llm.lock().await = session.clone();
                let (task, rx) = spawn_llm_consumer(session, self.bridge.clone());
                self.llm_task.abort();
                self.llm_task = task;

                // Scenario 6: a successful reconnect resumes in LISTENING
                // regardless of which state the drop interrupted, and
                // cancels whatever THINKING/RESPONDING timer was armed.
                for action in self.fsm.recover_to_listening() {
                    self.apply(action, timers).await;
                }

                Some(rx)
            }
            Err(e) => {
                tracing::error!(call_id = %self.call.lock().id, error = %e, "llm reconnect failed, ending call");
                None
            }
        }
    }
}
