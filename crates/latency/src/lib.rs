//! `LatencyTracker`: per-call timing stages and bottleneck classification
//! (spec §4.10). One instance per call, fed timestamps from the state
//! machine and media bridge as the call progresses; read back by
//! `CallStore::FinalizeCall` to populate `CallMetrics::bottleneck_stage`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BottleneckStage {
    WsConnect,
    SessionConnect,
    FirstAudio,
    Response,
}

impl BottleneckStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BottleneckStage::WsConnect => "wsConnect",
            BottleneckStage::SessionConnect => "sessionConnect",
            BottleneckStage::FirstAudio => "firstAudio",
            BottleneckStage::Response => "response",
        }
    }
}

/// One user turn's thinking-to-speaking latency.
#[derive(Debug, Clone, Default)]
struct TurnLatency {
    user_speech_detected: Option<DateTime<Utc>>,
    response_start: Option<DateTime<Utc>>,
    first_response_audio: Option<DateTime<Utc>>,
}

impl TurnLatency {
    /// `responseLatency = firstResponseAudio - userSpeechDetected` (spec).
    fn response_latency_ms(&self) -> Option<i64> {
        let start = self.user_speech_detected?;
        let end = self.first_response_audio?;
        Some((end - start).num_milliseconds().max(0))
    }
}

#[derive(Debug, Default)]
struct Stages {
    call_start: Option<DateTime<Utc>>,
    ws_open: Option<DateTime<Utc>>,
    session_ready: Option<DateTime<Utc>>,
    first_outbound_audio: Option<DateTime<Utc>>,
    turns: Vec<TurnLatency>,
}

pub struct LatencyTracker {
    call_id: String,
    stages: Mutex<Stages>,
}

impl LatencyTracker {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), stages: Mutex::new(Stages::default()) }
    }

    pub fn record_call_start(&self, at: DateTime<Utc>) {
        self.stages.lock().call_start.get_or_insert(at);
    }

    pub fn record_ws_open(&self, at: DateTime<Utc>) {
        self.stages.lock().ws_open.get_or_insert(at);
    }

    pub fn record_session_ready(&self, at: DateTime<Utc>) {
        self.stages.lock().session_ready.get_or_insert(at);
    }

    /// First outbound audio frame ever sent for this call (welcome message
    /// or first response), used for the `firstAudio` bottleneck bucket.
    pub fn record_first_outbound_audio(&self, at: DateTime<Utc>) {
        self.stages.lock().first_outbound_audio.get_or_insert(at);
    }

    /// A new user turn just ended (VAD `SpeechEnd`, entering THINKING).
    /// Opens a fresh per-turn latency record.
    pub fn begin_turn(&self, at: DateTime<Utc>) {
        let mut stages = self.stages.lock();
        stages.turns.push(TurnLatency { user_speech_detected: Some(at), ..Default::default() });
    }

    pub fn record_response_start(&self, at: DateTime<Utc>) {
        let mut stages = self.stages.lock();
        if let Some(turn) = stages.turns.last_mut() {
            turn.response_start.get_or_insert(at);
        }
    }

    pub fn record_first_response_audio(&self, at: DateTime<Utc>) {
        let mut stages = self.stages.lock();
        if let Some(turn) = stages.turns.last_mut() {
            turn.first_response_audio.get_or_insert(at);
        }
    }

    /// All completed per-turn `responseLatency` values, in turn order.
    pub fn per_turn_response_latencies_ms(&self) -> Vec<i64> {
        self.stages.lock().turns.iter().filter_map(TurnLatency::response_latency_ms).collect()
    }

    /// `argmax` over `{wsConnect, sessionConnect, firstAudio, response}`.
    /// `response` uses the slowest completed turn, since one slow turn is
    /// enough to flag the call.
    pub fn bottleneck(&self) -> Option<BottleneckStage> {
        let stages = self.stages.lock();

        let ws_connect = duration_ms(stages.call_start, stages.ws_open);
        let session_connect = duration_ms(stages.ws_open, stages.session_ready);
        let first_audio = duration_ms(stages.session_ready, stages.first_outbound_audio);
        let response = stages
            .turns
            .iter()
            .filter_map(TurnLatency::response_latency_ms)
            .max();

        let candidates: [(BottleneckStage, Option<i64>); 4] = [
            (BottleneckStage::WsConnect, ws_connect),
            (BottleneckStage::SessionConnect, session_connect),
            (BottleneckStage::FirstAudio, first_audio),
            (BottleneckStage::Response, response),
        ];

        candidates
            .into_iter()
            .filter_map(|(stage, ms)| ms.map(|ms| (stage, ms)))
            .max_by_key(|(_, ms)| *ms)
            .map(|(stage, ms)| {
                tracing::debug!(call_id = %self.call_id, stage = stage.as_str(), ms, "latency bottleneck");
                stage
            })
    }
}

fn duration_ms(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<i64> {
    Some((end? - start?).num_milliseconds().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn per_turn_latency_matches_spec_formula() {
        let tracker = LatencyTracker::new("c1");
        let t0 = Utc::now();
        tracker.begin_turn(t0);
        tracker.record_response_start(t0 + Duration::milliseconds(100));
        tracker.record_first_response_audio(t0 + Duration::milliseconds(400));

        assert_eq!(tracker.per_turn_response_latencies_ms(), vec![400]);
    }

    #[test]
    fn bottleneck_picks_the_slowest_stage() {
        let tracker = LatencyTracker::new("c1");
        let t0 = Utc::now();
        tracker.record_call_start(t0);
        tracker.record_ws_open(t0 + Duration::milliseconds(50)); // ws_connect=50
        tracker.record_session_ready(t0 + Duration::milliseconds(100)); // session_connect=50
        tracker.record_first_outbound_audio(t0 + Duration::milliseconds(2000)); // first_audio=1900

        assert_eq!(tracker.bottleneck(), Some(BottleneckStage::FirstAudio));
    }

    #[test]
    fn bottleneck_is_none_with_no_data() {
        let tracker = LatencyTracker::new("c1");
        assert_eq!(tracker.bottleneck(), None);
    }

    #[test]
    fn multiple_turns_use_the_slowest_for_bottleneck() {
        let tracker = LatencyTracker::new("c1");
        let t0 = Utc::now();
        tracker.record_call_start(t0);
        tracker.record_ws_open(t0 + Duration::milliseconds(10));
        tracker.record_session_ready(t0 + Duration::milliseconds(20));
        tracker.record_first_outbound_audio(t0 + Duration::milliseconds(30));

        tracker.begin_turn(t0 + Duration::seconds(1));
        tracker.record_first_response_audio(t0 + Duration::seconds(1) + Duration::milliseconds(300));

        tracker.begin_turn(t0 + Duration::seconds(5));
        tracker.record_first_response_audio(t0 + Duration::seconds(5) + Duration::milliseconds(3000));

        assert_eq!(tracker.per_turn_response_latencies_ms(), vec![300, 3000]);
        assert_eq!(tracker.bottleneck(), Some(BottleneckStage::Response));
    }
}
