use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use voxloop_core::{
    AgentConfig, BackgroundNoise, CallLimits, SpeechConfig, StartBehavior, VoicemailAction,
    VoiceProfile,
};
use voxloop_fsm::{CallAction, CallEvent, CallState, CallStateMachine, TimerKind};
use voxloop_intelligence::HedgeEngine;
use voxloop_provider::AnsweredBy;

fn agent_config() -> AgentConfig {
    AgentConfig {
        id: "agent-1".into(),
        name: "Test Agent".into(),
        prompt: "You are a helpful voice agent.".into(),
        welcome_message: "Hello, thanks for calling.".into(),
        characteristics: vec![],
        voice_profile: VoiceProfile { voice_id: "v1".into(), language_code: "en".into() },
        speech: SpeechConfig::new(1.0, 0.5, 0.5, 0.5, BackgroundNoise::Quiet),
        limits: CallLimits {
            max_call_duration_sec: 600,
            silence_detection_ms: 800,
            voicemail_detection: true,
            voicemail_action: VoicemailAction::LeaveMessage,
            voicemail_message: Some("Please call us back.".into()),
        },
        start_behavior: StartBehavior::WaitForHuman,
        knowledge_base: vec![],
    }
}

fn machine() -> CallStateMachine {
    let hedge = Arc::new(HedgeEngine::new(vec![], 4));
    CallStateMachine::new("call-1", agent_config(), hedge, "base prompt", Utc::now())
}

#[test]
fn happy_path_through_one_full_turn() {
    let mut m = machine();
    let t0 = Utc::now();

    let actions = m.transition(CallEvent::SetupOk, t0).unwrap();
    assert_eq!(m.state(), CallState::Welcome);
    assert!(actions.iter().any(|a| matches!(a, CallAction::PlayWelcome { .. })));

    m.transition(CallEvent::WelcomeAudioFinished, t0).unwrap();
    assert_eq!(m.state(), CallState::Listening);

    m.transition(CallEvent::SpeechStart, t0).unwrap();
    assert_eq!(m.state(), CallState::HumanSpeaking);

    let actions = m
        .transition(CallEvent::SpeechEnd { transcript: "I'm interested, tell me more".into() }, t0)
        .unwrap();
    assert_eq!(m.state(), CallState::Thinking);
    assert!(actions.iter().any(|a| matches!(a, CallAction::UpdateSystemInstruction(_))));

    m.transition(CallEvent::LlmResponseStart, t0).unwrap();
    assert_eq!(m.state(), CallState::Responding);

    m.transition(CallEvent::ResponseComplete, t0).unwrap();
    assert_eq!(m.state(), CallState::ResponseComplete);

    m.transition(CallEvent::Timeout(TimerKind::ResponseCompleteGrace), t0).unwrap();
    assert_eq!(m.state(), CallState::Listening);
}

#[test]
fn interruption_during_responding_returns_to_listening_and_counts() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupOk, t0).unwrap();
    m.transition(CallEvent::WelcomeAudioFinished, t0).unwrap();
    m.transition(CallEvent::SpeechStart, t0).unwrap();
    m.transition(CallEvent::SpeechEnd { transcript: "hello".into() }, t0).unwrap();
    m.transition(CallEvent::LlmResponseStart, t0).unwrap();

    let actions = m.transition(CallEvent::InterruptionDetected, t0).unwrap();
    assert_eq!(m.state(), CallState::Listening);
    assert!(actions.iter().any(|a| matches!(a, CallAction::CancelLlmResponse)));
    assert_eq!(m.metrics().interruptions, 1);
}

#[test]
fn setup_failure_ends_the_call_and_persists_failed() {
    let mut m = machine();
    let t0 = Utc::now();
    let actions = m.transition(CallEvent::SetupFailed, t0).unwrap();
    assert_eq!(m.state(), CallState::Ended);
    assert!(actions.iter().any(|a| matches!(a, CallAction::PersistStatus(_))));
    assert!(actions.iter().any(|a| matches!(a, CallAction::FinalizeCall)));
}

#[test]
fn voicemail_leave_message_sends_text_then_ends() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupOk, t0).unwrap();

    let actions = m.transition(CallEvent::AnsweredByDetected(AnsweredBy::Machine), t0).unwrap();
    assert_eq!(m.state(), CallState::Ended);
    assert!(actions.iter().any(|a| matches!(a, CallAction::SendText(text) if text == "Please call us back.")));
}

#[test]
fn human_answered_does_not_trigger_voicemail_branch() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupOk, t0).unwrap();
    let actions = m.transition(CallEvent::AnsweredByDetected(AnsweredBy::Human), t0).unwrap();
    assert!(actions.is_empty());
    assert_eq!(m.state(), CallState::Welcome);
}

#[test]
fn max_duration_ends_call_at_response_complete_grace() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupOk, t0).unwrap();
    m.transition(CallEvent::WelcomeAudioFinished, t0).unwrap();
    m.transition(CallEvent::SpeechStart, t0).unwrap();
    m.transition(CallEvent::SpeechEnd { transcript: "hi".into() }, t0).unwrap();
    m.transition(CallEvent::LlmResponseStart, t0).unwrap();
    m.transition(CallEvent::ResponseComplete, t0).unwrap();

    let later = t0 + ChronoDuration::seconds(601);
    m.transition(CallEvent::Timeout(TimerKind::ResponseCompleteGrace), later).unwrap();
    assert_eq!(m.state(), CallState::Ended);
}

#[test]
fn checkpoint_and_restore_round_trip_state() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupOk, t0).unwrap();
    m.transition(CallEvent::WelcomeAudioFinished, t0).unwrap();
    let checkpoint = m.checkpoint();
    assert_eq!(checkpoint.state, CallState::Listening);

    m.transition(CallEvent::SpeechStart, t0).unwrap();
    assert_eq!(m.state(), CallState::HumanSpeaking);

    m.restore(checkpoint.index).unwrap();
    assert_eq!(m.state(), CallState::Listening);
}

#[test]
fn reconnect_recovery_resets_to_listening_from_thinking() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupOk, t0).unwrap();
    m.transition(CallEvent::WelcomeAudioFinished, t0).unwrap();
    m.transition(CallEvent::SpeechStart, t0).unwrap();
    m.transition(CallEvent::SpeechEnd { transcript: "hello".into() }, t0).unwrap();
    assert_eq!(m.state(), CallState::Thinking);

    let actions = m.recover_to_listening();
    assert_eq!(m.state(), CallState::Listening);
    assert!(actions.iter().any(|a| matches!(a, CallAction::CancelTimer(TimerKind::Thinking))));
    assert!(actions.iter().any(|a| matches!(a, CallAction::StopFiller)));
}

#[test]
fn reconnect_recovery_resets_to_listening_from_responding() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupOk, t0).unwrap();
    m.transition(CallEvent::WelcomeAudioFinished, t0).unwrap();
    m.transition(CallEvent::SpeechStart, t0).unwrap();
    m.transition(CallEvent::SpeechEnd { transcript: "hello".into() }, t0).unwrap();
    m.transition(CallEvent::LlmResponseStart, t0).unwrap();
    assert_eq!(m.state(), CallState::Responding);

    let actions = m.recover_to_listening();
    assert_eq!(m.state(), CallState::Listening);
    assert!(actions.iter().any(|a| matches!(a, CallAction::CancelTimer(TimerKind::RespondingMax))));
}

#[test]
fn recover_to_listening_is_a_no_op_once_terminal() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupFailed, t0).unwrap();
    assert_eq!(m.state(), CallState::Ended);

    let actions = m.recover_to_listening();
    assert!(actions.is_empty());
    assert_eq!(m.state(), CallState::Ended);
}

#[test]
fn events_once_terminal_are_ignored_rather_than_erroring() {
    let mut m = machine();
    let t0 = Utc::now();
    m.transition(CallEvent::SetupFailed, t0).unwrap();
    assert_eq!(m.state(), CallState::Ended);
    let actions = m.transition(CallEvent::SpeechStart, t0).unwrap();
    assert!(actions.is_empty());
}
