//! Carrier media-socket wire envelope (spec §6): JSON control frames with
//! `event∈{connected,start,media,mark,stop}`, the event-specific payload
//! nested under a key matching the event name. This does not fit serde's
//! internally/adjacently tagged representations (the content key's *name*
//! varies with the tag, not just its presence), so the raw shape is
//! deserialized positionally and converted into `CarrierEvent`.

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub call_sid: String,
    pub stream_sid: String,
    pub media_format: MediaFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    pub track: String,
    pub chunk: String,
    pub timestamp: String,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPayload {
    pub call_sid: String,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    event: String,
    start: Option<StartPayload>,
    media: Option<MediaPayload>,
    mark: Option<MarkPayload>,
    stop: Option<StopPayload>,
}

#[derive(Debug, Clone)]
pub enum CarrierEvent {
    Connected,
    Start(StartPayload),
    Media(MediaPayload),
    Mark(MarkPayload),
    Stop(StopPayload),
}

impl CarrierEvent {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: RawEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| MediaError::MalformedEnvelope(e.to_string()))?;

        match raw.event.as_str() {
            "connected" => Ok(CarrierEvent::Connected),
            "start" => raw
                .start
                .map(CarrierEvent::Start)
                .ok_or_else(|| MediaError::MalformedEnvelope("start event missing `start` field".into())),
            "media" => raw
                .media
                .map(CarrierEvent::Media)
                .ok_or_else(|| MediaError::MalformedEnvelope("media event missing `media` field".into())),
            "mark" => raw
                .mark
                .map(CarrierEvent::Mark)
                .ok_or_else(|| MediaError::MalformedEnvelope("mark event missing `mark` field".into())),
            "stop" => raw
                .stop
                .map(CarrierEvent::Stop)
                .ok_or_else(|| MediaError::MalformedEnvelope("stop event missing `stop` field".into())),
            other => Err(MediaError::UnsupportedEvent(other.to_string())),
        }
    }
}

/// Build one outbound wire frame: `{event:"media", media:{track:"outbound",
/// chunk, timestamp, payload}}`, exactly the envelope shape of an inbound
/// media frame but with `track:"outbound"`.
pub fn build_outbound_media_frame(stream_sid: &str, sequence: u64, timestamp_ms: u64, mulaw: &[u8]) -> Vec<u8> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let frame = serde_json::json!({
        "event": "media",
        "streamSid": stream_sid,
        "media": {
            "track": "outbound",
            "chunk": sequence.to_string(),
            "timestamp": timestamp_ms.to_string(),
            "payload": STANDARD.encode(mulaw),
        }
    });
    serde_json::to_vec(&frame).expect("outbound media frame always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_event() {
        let raw = br#"{"event":"start","start":{"callSid":"c1","streamSid":"s1","mediaFormat":{"encoding":"audio/mulaw","sampleRate":8000,"channels":1}}}"#;
        match CarrierEvent::parse(raw).unwrap() {
            CarrierEvent::Start(payload) => {
                assert_eq!(payload.call_sid, "c1");
                assert_eq!(payload.media_format.sample_rate, 8000);
            }
            other => panic!("expected Start, got {other:?}"),
        }
    }

    #[test]
    fn parses_media_event() {
        let raw = br#"{"event":"media","media":{"track":"inbound","chunk":"1","timestamp":"20","payload":"AAAA"}}"#;
        match CarrierEvent::parse(raw).unwrap() {
            CarrierEvent::Media(payload) => assert_eq!(payload.track, "inbound"),
            other => panic!("expected Media, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_rejected_without_panicking() {
        let raw = br#"{"event":"bogus"}"#;
        assert!(matches!(CarrierEvent::parse(raw), Err(MediaError::UnsupportedEvent(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(CarrierEvent::parse(b"not json").is_err());
    }

    #[test]
    fn outbound_frame_round_trips_through_parse() {
        let wire = build_outbound_media_frame("s1", 5, 100, &[0u8; 160]);
        match CarrierEvent::parse(&wire).unwrap() {
            CarrierEvent::Media(payload) => {
                assert_eq!(payload.track, "outbound");
                assert_eq!(payload.chunk, "5");
            }
            other => panic!("expected Media, got {other:?}"),
        }
    }
}

impl std::fmt::Display for CarrierEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CarrierEvent::Connected => "connected",
            CarrierEvent::Start(_) => "start",
            CarrierEvent::Media(_) => "media",
            CarrierEvent::Mark(_) => "mark",
            CarrierEvent::Stop(_) => "stop",
        };
        write!(f, "{name}")
    }
}
