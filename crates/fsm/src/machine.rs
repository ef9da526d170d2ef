//! `CallStateMachine`: the INIT→ENDED conversation loop (spec §4.8). One
//! instance per call, driven by the state-machine tick worker over the
//! merged event channel. Transitions are synchronous and side-effect-free;
//! every effect the caller must carry out comes back as a `CallAction`.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use voxloop_core::{AgentConfig, CallStatus, FillerClip, VoicemailAction};
use voxloop_intelligence::{
    AnalyzerState, ConversationAnalyzer, HedgeEngine, PrincipleEngine, PrincipleEngineState,
};
use voxloop_provider::AnsweredBy;

use crate::action::CallAction;
use crate::checkpoint::{CallStateCheckpoint, FsmMetrics};
use crate::error::{FsmError, Result};
use crate::event::{CallEvent, TimerKind};
use crate::state::CallState;

struct TurnAnalysis {
    instruction: String,
    principle: voxloop_core::Principle,
    language: voxloop_core::Language,
    profile: voxloop_core::CustomerProfile,
}

/// Everything about a completed turn that isn't already known to the
/// caller (user text, agent text, timestamp): the classifier/principle
/// output computed at `SpeechEnd`, plus the filler clip actually played
/// during `THINKING`, if any. The per-call worker combines this with the
/// accumulated agent transcript to build a `voxloop_core::Turn`.
#[derive(Debug, Clone)]
pub struct TurnMetadata {
    pub stage: voxloop_core::Stage,
    pub profile: voxloop_core::CustomerProfile,
    pub objections: Vec<voxloop_core::Objection>,
    pub applied_principle: voxloop_core::Principle,
    pub language: voxloop_core::Language,
    pub sentiment: f32,
    pub filler_clip_id: Option<String>,
}

pub struct CallStateMachine {
    call_id: String,
    agent_config: AgentConfig,
    hedge_engine: Arc<HedgeEngine>,
    base_prompt: String,

    state: CallState,
    call_start: DateTime<Utc>,

    analyzer_state: AnalyzerState,
    principle_state: PrincipleEngineState,
    used_fillers: HashSet<String>,
    pending_filler: Option<FillerClip>,

    turn_number: u32,
    last_user_text: Option<String>,
    last_turn_metadata: Option<TurnMetadata>,

    checkpoints: Vec<CallStateCheckpoint>,
    metrics: FsmMetrics,
}

impl CallStateMachine {
    pub fn new(
        call_id: impl Into<String>,
        agent_config: AgentConfig,
        hedge_engine: Arc<HedgeEngine>,
        base_prompt: impl Into<String>,
        call_start: DateTime<Utc>,
    ) -> Self {
        let mut metrics = FsmMetrics::default();
        metrics.record_state_entry(CallState::Init);

        Self {
            call_id: call_id.into(),
            agent_config,
            hedge_engine,
            base_prompt: base_prompt.into(),
            state: CallState::Init,
            call_start,
            analyzer_state: AnalyzerState::default(),
            principle_state: PrincipleEngineState::default(),
            used_fillers: HashSet::new(),
            pending_filler: None,
            turn_number: 0,
            last_user_text: None,
            last_turn_metadata: None,
            checkpoints: Vec::new(),
            metrics,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn metrics(&self) -> &FsmMetrics {
        &self.metrics
    }

    /// Take the metadata computed for the most recently finished turn, if
    /// any. Call once per turn after `ResponseComplete`; returns `None` if
    /// already taken or no turn has finished yet.
    pub fn take_turn_metadata(&mut self) -> Option<TurnMetadata> {
        self.last_turn_metadata.take()
    }

    /// Arms the INIT setup timer. Call once right after construction.
    pub fn start(&self) -> Vec<CallAction> {
        vec![CallAction::ArmTimer(
            TimerKind::InitSetup,
            Duration::from_secs(voxloop_config::constants::fsm::INIT_SETUP_SECS),
        )]
    }

    fn enter(&mut self, state: CallState) {
        tracing::debug!(call_id = %self.call_id, from = self.state.as_str(), to = state.as_str(), "fsm transition");
        self.state = state;
        self.metrics.record_state_entry(state);
    }

    /// Collapses the instantaneous `CALL_ENDING -> ENDED` row: there is no
    /// observable dwell time in CALL_ENDING, so reaching it always finishes
    /// the same tick.
    fn end_call(&mut self, mut actions: Vec<CallAction>) -> Vec<CallAction> {
        self.enter(CallState::CallEnding);
        actions.push(CallAction::CloseLlmSession);
        actions.push(CallAction::FinalizeCall);
        actions.push(CallAction::EmitWebhook);
        self.enter(CallState::Ended);
        actions
    }

    fn voicemail_branch(&mut self, answered_by: AnsweredBy) -> Option<Vec<CallAction>> {
        if answered_by != AnsweredBy::Machine || !self.agent_config.limits.voicemail_detection {
            return None;
        }

        let actions = match self.agent_config.limits.voicemail_action {
            VoicemailAction::HangUp => vec![],
            VoicemailAction::LeaveMessage => {
                let message = self.agent_config.limits.voicemail_message.clone().unwrap_or_default();
                vec![CallAction::SendText(message)]
            }
            VoicemailAction::Transfer => {
                vec![CallAction::LogError(
                    "voicemail transfer requested; no generic transfer action, ending call".into(),
                )]
            }
        };

        Some(self.end_call(actions))
    }

    fn system_instruction_for_turn(&mut self, transcript: &str) -> TurnAnalysis {
        let analysis = ConversationAnalyzer::analyze(
            &mut self.analyzer_state,
            self.turn_number,
            transcript,
            self.last_user_text.as_deref(),
        );
        let principle = PrincipleEngine::select(
            &mut self.principle_state,
            analysis.stage,
            analysis.profile,
            &analysis.objections,
        );

        let objection_fragment = analysis
            .objections
            .first()
            .map(|o| format!(" Customer objection signal: {o:?}."))
            .unwrap_or_default();

        let instruction = format!(
            "{base} {principle_fragment} Stage: {stage:?}.{objection_fragment} Respond in {language}.",
            base = self.base_prompt,
            principle_fragment = principle.system_instruction_fragment(),
            stage = analysis.stage,
            language = analysis.language.code(),
        );

        self.last_user_text = Some(transcript.to_string());
        self.last_turn_metadata = Some(TurnMetadata {
            stage: analysis.stage,
            profile: analysis.profile,
            objections: analysis.objections,
            applied_principle: principle,
            language: analysis.language,
            sentiment: analysis.sentiment,
            filler_clip_id: None,
        });
        TurnAnalysis { instruction, principle, language: analysis.language, profile: analysis.profile }
    }

    /// Advance the machine. `at` is the wall-clock time the event was
    /// observed, used for caps checks and checkpoint stamps.
    pub fn transition(&mut self, event: CallEvent, at: DateTime<Utc>) -> Result<Vec<CallAction>> {
        if self.state.is_terminal() {
            return Ok(vec![]);
        }

        if let CallEvent::AnsweredByDetected(answered_by) = event {
            if let Some(actions) = self.voicemail_branch(answered_by) {
                return Ok(actions);
            }
            return Ok(vec![]);
        }

        use CallState::*;

        match (self.state, event) {
            (Init, CallEvent::SetupOk) => {
                self.enter(Welcome);
                Ok(vec![
                    CallAction::CancelTimer(TimerKind::InitSetup),
                    CallAction::PlayWelcome { text: self.agent_config.welcome_message.clone() },
                    CallAction::ArmTimer(
                        TimerKind::Welcome,
                        Duration::from_secs(voxloop_config::constants::fsm::WELCOME_MAX_SECS),
                    ),
                ])
            }
            (Init, CallEvent::SetupFailed) | (Init, CallEvent::Timeout(TimerKind::InitSetup)) => {
                Ok(self.end_call(vec![CallAction::PersistStatus(CallStatus::Failed)]))
            }

            (Welcome, CallEvent::WelcomeAudioFinished)
            | (Welcome, CallEvent::Timeout(TimerKind::Welcome)) => {
                self.enter(Listening);
                Ok(vec![CallAction::CancelTimer(TimerKind::Welcome), CallAction::StartVad])
            }

            (Listening, CallEvent::SpeechStart) => {
                self.enter(HumanSpeaking);
                Ok(vec![
                    CallAction::StartBuffering,
                    CallAction::ArmTimer(
                        TimerKind::HumanSpeakingMax,
                        Duration::from_secs(voxloop_config::constants::fsm::HUMAN_SPEAKING_MAX_SECS),
                    ),
                ])
            }
            (Listening, CallEvent::MaxDurationExceeded) | (Listening, CallEvent::ManualHangup) => {
                Ok(self.end_call(vec![]))
            }

            (HumanSpeaking, CallEvent::AudioChunk) => Ok(vec![CallAction::ForwardAudioToLlm]),
            (HumanSpeaking, CallEvent::SpeechEnd { transcript }) => {
                self.turn_number += 1;
                let analysis = self.system_instruction_for_turn(&transcript);
                self.enter(Thinking);

                let mut actions = vec![
                    CallAction::CancelTimer(TimerKind::HumanSpeakingMax),
                    CallAction::UpdateSystemInstruction(analysis.instruction),
                    CallAction::ArmTimer(
                        TimerKind::Thinking,
                        Duration::from_secs(voxloop_config::constants::fsm::THINKING_TIMEOUT_SECS),
                    ),
                ];

                if self.agent_config.speech.wants_filler() {
                    let clip = self.hedge_engine.select_filler(
                        analysis.language,
                        analysis.principle,
                        analysis.profile,
                        &self.used_fillers,
                    );
                    self.pending_filler = Some(clip);
                    actions.push(CallAction::ArmTimer(
                        TimerKind::FillerGrace,
                        Duration::from_millis(voxloop_config::constants::fsm::FILLER_GRACE_MS),
                    ));
                }

                Ok(actions)
            }
            (HumanSpeaking, CallEvent::Timeout(TimerKind::HumanSpeakingMax)) => {
                Ok(self.end_call(vec![]))
            }

            (Thinking, CallEvent::Timeout(TimerKind::FillerGrace)) => {
                if let Some(clip) = self.pending_filler.take() {
                    self.used_fillers.insert(clip.id.clone());
                    self.metrics.fillers_played += 1;
                    if let Some(metadata) = self.last_turn_metadata.as_mut() {
                        metadata.filler_clip_id = Some(clip.id.clone());
                    }
                    Ok(vec![CallAction::StartFiller(clip)])
                } else {
                    Ok(vec![])
                }
            }
            (Thinking, CallEvent::LlmResponseStart) => {
                self.enter(Responding);
                self.pending_filler = None;
                Ok(vec![
                    CallAction::CancelTimer(TimerKind::Thinking),
                    CallAction::CancelTimer(TimerKind::FillerGrace),
                    CallAction::StopFiller,
                    CallAction::ArmTimer(
                        TimerKind::RespondingMax,
                        Duration::from_secs(voxloop_config::constants::fsm::RESPONDING_MAX_SECS),
                    ),
                ])
            }
            (Thinking, CallEvent::Timeout(TimerKind::Thinking)) | (Thinking, CallEvent::LlmError) => {
                self.metrics.error_count += 1;
                self.enter(Listening);
                self.pending_filler = None;
                Ok(vec![
                    CallAction::LogError("LLM did not respond in time".into()),
                    CallAction::StopFiller,
                    CallAction::CancelTimer(TimerKind::FillerGrace),
                ])
            }

            (Responding, CallEvent::InterruptionDetected) => {
                self.metrics.interruptions += 1;
                self.enter(Listening);
                Ok(vec![
                    CallAction::CancelLlmResponse,
                    CallAction::CancelTimer(TimerKind::RespondingMax),
                ])
            }
            (Responding, CallEvent::ResponseComplete)
            | (Responding, CallEvent::Timeout(TimerKind::RespondingMax)) => {
                self.enter(ResponseComplete);
                Ok(vec![
                    CallAction::CancelTimer(TimerKind::RespondingMax),
                    CallAction::ArmTimer(
                        TimerKind::ResponseCompleteGrace,
                        Duration::from_millis(
                            voxloop_config::constants::fsm::RESPONSE_COMPLETE_GRACE_MS,
                        ),
                    ),
                ])
            }

            (ResponseComplete, CallEvent::Timeout(TimerKind::ResponseCompleteGrace)) => {
                let elapsed_sec = (at - self.call_start).num_seconds().max(0) as u32;
                if elapsed_sec >= self.agent_config.limits.max_call_duration_sec {
                    Ok(self.end_call(vec![]))
                } else {
                    self.enter(Listening);
                    Ok(vec![])
                }
            }

            (state, event) => Err(FsmError::InvalidTransition { state, event: format!("{event:?}") }),
        }
    }

    /// Force the machine back to LISTENING after a successful mid-call LLM
    /// reconnect (spec §7/scenario 6: "the state machine resumes in
    /// LISTENING"). Safe to call from any non-terminal state; clears any
    /// pending filler and cancels whichever of THINKING/RESPONDING's timers
    /// happened to be armed.
    pub fn recover_to_listening(&mut self) -> Vec<CallAction> {
        if self.state.is_terminal() {
            return vec![];
        }
        self.pending_filler = None;
        self.enter(CallState::Listening);
        vec![
            CallAction::CancelTimer(TimerKind::HumanSpeakingMax),
            CallAction::CancelTimer(TimerKind::Thinking),
            CallAction::CancelTimer(TimerKind::FillerGrace),
            CallAction::CancelTimer(TimerKind::RespondingMax),
            CallAction::CancelTimer(TimerKind::ResponseCompleteGrace),
            CallAction::StopFiller,
        ]
    }

    /// Snapshot enough state to resume after a crash/restart.
    pub fn checkpoint(&mut self) -> CallStateCheckpoint {
        let checkpoint = CallStateCheckpoint {
            index: self.checkpoints.len(),
            state: self.state,
            turn_number: self.turn_number,
            used_fillers: self.used_fillers.clone(),
            taken_at: Utc::now(),
        };
        self.checkpoints.push(checkpoint.clone());
        self.metrics.checkpoint_count += 1;
        checkpoint
    }

    pub fn restore(&mut self, index: usize) -> Result<()> {
        let checkpoint = self.checkpoints.get(index).cloned().ok_or(FsmError::NoCheckpoint(index))?;
        self.state = checkpoint.state;
        self.turn_number = checkpoint.turn_number;
        self.used_fillers = checkpoint.used_fillers;
        self.metrics.restore_count += 1;
        Ok(())
    }
}
