//! `Call`: the central entity. Owns its `Turn` sequence and `metrics`
//! exclusively; status transitions are monotonic and idempotent —
//! re-delivered carrier webhooks with an older status are ignored, and
//! nothing transitions out of a terminal status.

use crate::audit::AuditLog;
use crate::error::{CoreError, Result};
use crate::turn::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    Init,
    Dialing,
    Ringing,
    Answered,
    InProgress,
    Completed,
    Failed,
    NoAnswer,
    Busy,
    Voicemail,
}

impl CallStatus {
    /// Position in the main-line progression. Terminal alternatives to
    /// `Completed` share its rank: any of them can be reached from anywhere
    /// earlier in the main line, but none can be left once entered.
    fn rank(&self) -> u8 {
        match self {
            CallStatus::Init => 0,
            CallStatus::Dialing => 1,
            CallStatus::Ringing => 2,
            CallStatus::Answered => 3,
            CallStatus::InProgress => 4,
            CallStatus::Completed
            | CallStatus::Failed
            | CallStatus::NoAnswer
            | CallStatus::Busy
            | CallStatus::Voicemail => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 5
    }
}

/// Conversation-level disposition, orthogonal to the terminal `CallStatus`
/// (e.g. a `Completed` call can still end in `Declined`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    Converted,
    FollowUp,
    Declined,
    Escalated,
    Abandoned,
    LlmUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallMetrics {
    pub interruptions: u32,
    pub fillers_played: u32,
    pub average_sentiment: f32,
    pub bottleneck_stage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    /// Opaque correlation id threaded through `tracing` spans for this
    /// call, so log lines from the three per-call workers can be joined.
    pub trace_id: String,
    pub agent_id: String,
    pub provider_id: String,
    pub from_e164: String,
    pub to_e164: String,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_sec: u32,
    pub provider_call_id: Option<String>,
    pub recording_url: Option<String>,
    pub transcript: Vec<Turn>,
    pub metrics: CallMetrics,
    pub outcome: Option<CallOutcome>,
    /// Append-only, hash-chained lifecycle audit trail; purely additive
    /// instrumentation, independent of the transcript.
    pub audit: AuditLog,
}

impl Call {
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        provider_id: impl Into<String>,
        from_e164: impl Into<String>,
        to_e164: impl Into<String>,
        direction: CallDirection,
        started_at: DateTime<Utc>,
    ) -> Self {
        let id = id.into();
        let trace_id = uuid::Uuid::new_v4().to_string();
        let mut audit = AuditLog::default();
        audit.append("call_created", started_at, format!("id={id}"));

        Self {
            id,
            trace_id,
            agent_id: agent_id.into(),
            provider_id: provider_id.into(),
            from_e164: from_e164.into(),
            to_e164: to_e164.into(),
            direction,
            status: CallStatus::Init,
            started_at,
            answered_at: None,
            ended_at: None,
            duration_sec: 0,
            provider_call_id: None,
            recording_url: None,
            transcript: Vec::new(),
            metrics: CallMetrics::default(),
            outcome: None,
            audit,
        }
    }

    /// Apply a status transition. Returns `true` if it was applied, `false`
    /// if it was ignored (same status re-delivered, a stale/out-of-order
    /// status, or the call is already terminal).
    pub fn transition_status(&mut self, new: CallStatus, at: DateTime<Utc>) -> bool {
        if self.status == new {
            return false;
        }
        if self.status.is_terminal() {
            return false;
        }
        if new.rank() < self.status.rank() {
            return false;
        }

        if new == CallStatus::Answered && self.answered_at.is_none() {
            self.answered_at = Some(at);
        }
        if new.is_terminal() {
            self.ended_at = Some(at);
            self.duration_sec = self
                .answered_at
                .map(|answered| (at - answered).num_seconds().max(0) as u32)
                .unwrap_or(0);
        }

        self.status = new;
        self.audit.append(format!("status:{new:?}"), at, "");
        true
    }

    /// Append the next turn. Enforces strictly increasing `turn_number`.
    pub fn append_turn(&mut self, turn: Turn) -> Result<()> {
        let expected = self.transcript.len() as u32 + 1;
        if turn.turn_number != expected {
            return Err(CoreError::TurnOutOfOrder {
                expected,
                got: turn.turn_number,
            });
        }
        let at = turn.timestamp;
        self.transcript.push(turn);
        self.audit.append("turn_appended", at, format!("turn_number={expected}"));
        Ok(())
    }

    pub fn attach_recording(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.audit.append("recording_attached", Utc::now(), url.clone());
        self.recording_url = Some(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn call() -> Call {
        Call::new("c1", "a1", "p1", "+15550000000", "+15551230001", CallDirection::Outbound, Utc::now())
    }

    #[test]
    fn status_transitions_advance_monotonically() {
        let mut c = call();
        let t0 = c.started_at;
        assert!(c.transition_status(CallStatus::Dialing, t0));
        assert!(c.transition_status(CallStatus::InProgress, t0 + Duration::seconds(1)));
        assert!(c.transition_status(CallStatus::Completed, t0 + Duration::seconds(5)));
        assert_eq!(c.status, CallStatus::Completed);
        assert_eq!(c.duration_sec, 5);
    }

    #[test]
    fn out_of_order_status_is_ignored() {
        let mut c = call();
        let t0 = c.started_at;
        assert!(c.transition_status(CallStatus::InProgress, t0));
        assert!(!c.transition_status(CallStatus::Dialing, t0));
        assert_eq!(c.status, CallStatus::InProgress);
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut c = call();
        let t0 = c.started_at;
        assert!(c.transition_status(CallStatus::Failed, t0));
        assert!(!c.transition_status(CallStatus::InProgress, t0));
        assert!(!c.transition_status(CallStatus::Completed, t0));
        assert_eq!(c.status, CallStatus::Failed);
    }

    #[test]
    fn repeated_status_delivery_is_idempotent() {
        let mut c = call();
        let t0 = c.started_at;
        assert!(c.transition_status(CallStatus::Dialing, t0));
        assert!(!c.transition_status(CallStatus::Dialing, t0));
    }

    #[test]
    fn turns_must_arrive_in_order() {
        let mut c = call();
        let turn = |n| Turn {
            turn_number: n,
            user_text: "hi".into(),
            agent_text: None,
            stage: crate::classification::Stage::Awareness,
            profile: crate::classification::CustomerProfile::Analytical,
            objections: vec![],
            applied_principle: crate::classification::Principle::Liking,
            language: crate::classification::Language::En,
            sentiment: 0.5,
            filler_clip_id: None,
            timestamp: Utc::now(),
        };

        assert!(c.append_turn(turn(1)).is_ok());
        assert!(c.append_turn(turn(3)).is_err());
        assert!(c.append_turn(turn(2)).is_ok());
    }
}
