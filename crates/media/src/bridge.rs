//! `MediaBridge`: the long-lived per-call frame socket handler (spec §4.9).
//! Demuxes the carrier envelope, decodes inbound mu-law into 16 kHz PCM for
//! the VAD/LLM path, and encodes outbound 24 kHz PCM from the LLM/hedge
//! path back into exactly-20ms mu-law wire frames. Backpressure is explicit
//! in both directions: the outbound queue drops the oldest frame past
//! `outbound_queue_max_ms`; the inbound path disconnects past
//! `inbound_queue_max_ms` of unconsumed backlog.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use voxloop_codec::{AudioFrame, Channels, SampleRate};
use voxloop_config::MediaBridgeSettings;

use crate::envelope::{build_outbound_media_frame, CarrierEvent, MediaPayload, StartPayload};
use crate::error::{MediaError, Result};

const OUTBOUND_FRAME_MS: u64 = 20;

struct QueuedOutboundFrame {
    wire_bytes: Vec<u8>,
    enqueued_at: Instant,
}

/// `BridgeStatus` summarizes what's known about the attached carrier leg,
/// read by the per-call session driver to decide whether to start feeding
/// frames yet.
#[derive(Debug, Clone, Default)]
pub struct BridgeStatus {
    pub call_sid: Option<String>,
    pub stream_sid: Option<String>,
    pub started: bool,
}

pub struct MediaBridge {
    config: MediaBridgeSettings,
    status: Mutex<BridgeStatus>,
    inbound_tx: mpsc::Sender<AudioFrame>,
    inbound_rx: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
    inbound_sequence: AtomicU64,
    outbound_sequence: AtomicU64,
    outbound_queue: Mutex<VecDeque<QueuedOutboundFrame>>,
    outbound_timestamp_ms: AtomicU64,
    dropped_outbound_frames: AtomicU64,
}

impl MediaBridge {
    pub fn new(config: MediaBridgeSettings) -> Self {
        // One inbound slot per 20ms frame in the configured lag budget; a
        // full channel is exactly the "carrier too slow" condition.
        let capacity = (config.inbound_queue_max_ms / OUTBOUND_FRAME_MS).max(1) as usize;
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);

        Self {
            config,
            status: Mutex::new(BridgeStatus::default()),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            inbound_sequence: AtomicU64::new(0),
            outbound_sequence: AtomicU64::new(0),
            outbound_queue: Mutex::new(VecDeque::new()),
            outbound_timestamp_ms: AtomicU64::new(0),
            dropped_outbound_frames: AtomicU64::new(0),
        }
    }

    /// Take the inbound frame receiver. Call once; the session driver reads
    /// from it for the lifetime of the call.
    pub fn take_inbound_receiver(&self) -> Option<mpsc::Receiver<AudioFrame>> {
        self.inbound_rx.lock().take()
    }

    pub fn status(&self) -> BridgeStatus {
        self.status.lock().clone()
    }

    /// Handle one parsed carrier envelope frame. Returns `Ok(Some(frame))`
    /// when a `media` event decoded into a new 16 kHz inbound frame, `Ok(None)`
    /// for control events that don't produce audio, and `Err` on a protocol
    /// violation or carrier-too-slow backpressure trip.
    pub async fn handle_event(&self, event: CarrierEvent) -> Result<Option<AudioFrame>> {
        match event {
            CarrierEvent::Connected => Ok(None),
            CarrierEvent::Start(start) => {
                self.on_start(start);
                Ok(None)
            }
            CarrierEvent::Media(media) => self.on_media(media).await.map(Some),
            CarrierEvent::Mark(_) => Ok(None),
            CarrierEvent::Stop(_) => {
                self.status.lock().started = false;
                Ok(None)
            }
        }
    }

    fn on_start(&self, start: StartPayload) {
        let mut status = self.status.lock();
        status.call_sid = Some(start.call_sid);
        status.stream_sid = Some(start.stream_sid);
        status.started = true;
    }

    async fn on_media(&self, media: MediaPayload) -> Result<AudioFrame> {
        if !self.status.lock().started {
            return Err(MediaError::NotStarted);
        }

        let mulaw = STANDARD
            .decode(&media.payload)
            .map_err(|e| MediaError::MalformedEnvelope(format!("invalid base64 payload: {e}")))?;

        let sequence = self.inbound_sequence.fetch_add(1, Ordering::Relaxed);
        let frame_8k = AudioFrame::from_mulaw(&mulaw, sequence);
        let frame_16k = frame_8k.resample(SampleRate::Hz16000);

        match self.inbound_tx.try_send(frame_16k.clone()) {
            Ok(()) => Ok(frame_16k),
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::counter!("media_bridge_inbound_disconnects").increment(1);
                Err(MediaError::CarrierTooSlow)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MediaError::CarrierTooSlow),
        }
    }

    /// Encode one 24 kHz PCM frame (LLM output or a hedge filler) down to
    /// 8 kHz mu-law and enqueue it as 20ms wire frames. Drops the oldest
    /// queued frame when the backlog exceeds `outbound_queue_max_ms`.
    pub fn enqueue_outbound_pcm24(&self, frame_24k: &AudioFrame) {
        let stream_sid = self.status.lock().stream_sid.clone().unwrap_or_default();
        let frame_8k = frame_24k.resample(SampleRate::Hz8000).to_mono();

        let chunk_samples = SampleRate::Hz8000.samples_per_ms() as usize * OUTBOUND_FRAME_MS as usize;
        for chunk in frame_8k.split(chunk_samples) {
            let mulaw = chunk.to_mulaw();
            let sequence = self.outbound_sequence.fetch_add(1, Ordering::Relaxed);
            let timestamp_ms = self.outbound_timestamp_ms.fetch_add(OUTBOUND_FRAME_MS, Ordering::Relaxed);
            let wire_bytes = build_outbound_media_frame(&stream_sid, sequence, timestamp_ms, &mulaw);

            let mut queue = self.outbound_queue.lock();
            queue.push_back(QueuedOutboundFrame { wire_bytes, enqueued_at: Instant::now() });
            self.trim_outbound_backlog(&mut queue);
        }
    }

    fn trim_outbound_backlog(&self, queue: &mut VecDeque<QueuedOutboundFrame>) {
        let max_ms = self.config.outbound_queue_max_ms;
        while (queue.len() as u64) * OUTBOUND_FRAME_MS > max_ms {
            queue.pop_front();
            self.dropped_outbound_frames.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("media_bridge_outbound_frames_dropped").increment(1);
        }
    }

    /// Build a synthetic frame directly from raw PCM16 bytes at `rate`,
    /// used by the hedge engine and LLM adapter which hand over bytes, not
    /// `AudioFrame`s.
    pub fn enqueue_outbound_pcm16(&self, pcm16: &[u8], rate: SampleRate) {
        let frame = AudioFrame::from_pcm16(pcm16, rate, Channels::Mono, 0);
        self.enqueue_outbound_pcm24(&frame);
    }

    /// Pop the next ready-to-send wire frame, if any.
    pub fn next_outbound_wire_frame(&self) -> Option<Vec<u8>> {
        self.outbound_queue.lock().pop_front().map(|f| f.wire_bytes)
    }

    pub fn outbound_queue_depth_ms(&self) -> u64 {
        self.outbound_queue.lock().len() as u64 * OUTBOUND_FRAME_MS
    }

    /// Drop every queued-but-unsent outbound frame. Used to honor the
    /// filler policy's "stop at LLMResponseStart" (spec §4.8): a filler
    /// clip is enqueued whole up front, so stopping it means discarding
    /// whatever of it is still sitting in the outbound queue rather than
    /// letting it keep draining out after the LLM starts responding.
    pub fn flush_outbound(&self) -> u64 {
        let mut queue = self.outbound_queue.lock();
        let flushed = queue.len() as u64;
        queue.clear();
        flushed
    }

    pub fn dropped_outbound_frame_count(&self) -> u64 {
        self.dropped_outbound_frames.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{MediaFormat, StartPayload};
    use voxloop_codec::Channels;

    fn config() -> MediaBridgeSettings {
        MediaBridgeSettings { outbound_queue_max_ms: 500, inbound_queue_max_ms: 1000, outbound_frame_ms: 20 }
    }

    fn start_event() -> CarrierEvent {
        CarrierEvent::Start(StartPayload {
            call_sid: "c1".into(),
            stream_sid: "s1".into(),
            media_format: MediaFormat { encoding: "audio/mulaw".into(), sample_rate: 8000, channels: 1 },
        })
    }

    #[tokio::test]
    async fn media_before_start_is_rejected() {
        let bridge = MediaBridge::new(config());
        let media = CarrierEvent::Media(MediaPayload {
            track: "inbound".into(),
            chunk: "1".into(),
            timestamp: "20".into(),
            payload: STANDARD.encode([0u8; 160]),
        });
        assert!(matches!(bridge.handle_event(media).await, Err(MediaError::NotStarted)));
    }

    #[tokio::test]
    async fn media_after_start_decodes_to_16khz() {
        let bridge = MediaBridge::new(config());
        bridge.handle_event(start_event()).await.unwrap();

        let media = CarrierEvent::Media(MediaPayload {
            track: "inbound".into(),
            chunk: "1".into(),
            timestamp: "20".into(),
            payload: STANDARD.encode([0u8; 160]),
        });
        let frame = bridge.handle_event(media).await.unwrap().unwrap();
        assert_eq!(frame.sample_rate, SampleRate::Hz16000);
    }

    #[tokio::test]
    async fn outbound_frames_are_exactly_20ms_mulaw() {
        let bridge = MediaBridge::new(config());
        bridge.handle_event(start_event()).await.unwrap();

        let samples = vec![0.1f32; SampleRate::Hz24000.samples_per_ms() as usize * 60];
        let frame = AudioFrame::new(samples, SampleRate::Hz24000, Channels::Mono, 0);
        bridge.enqueue_outbound_pcm24(&frame);

        let mut count = 0;
        while let Some(wire) = bridge.next_outbound_wire_frame() {
            match CarrierEvent::parse(&wire).unwrap() {
                CarrierEvent::Media(payload) => {
                    let decoded = STANDARD.decode(&payload.payload).unwrap();
                    assert_eq!(decoded.len(), 160); // 20ms @ 8kHz mu-law
                }
                other => panic!("expected Media frame, got {other:?}"),
            }
            count += 1;
        }
        assert_eq!(count, 3); // 60ms / 20ms
    }

    #[tokio::test]
    async fn outbound_backlog_drops_oldest_past_budget() {
        let bridge = MediaBridge::new(config());
        bridge.handle_event(start_event()).await.unwrap();

        // Each call enqueues ~1000ms, well past the 500ms budget.
        let samples = vec![0.1f32; SampleRate::Hz24000.samples_per_ms() as usize * 1000];
        let frame = AudioFrame::new(samples, SampleRate::Hz24000, Channels::Mono, 0);
        bridge.enqueue_outbound_pcm24(&frame);

        assert!(bridge.outbound_queue_depth_ms() <= 500);
        assert!(bridge.dropped_outbound_frame_count() > 0);
    }

    #[tokio::test]
    async fn inbound_backlog_past_budget_disconnects() {
        let bridge = MediaBridge::new(MediaBridgeSettings {
            outbound_queue_max_ms: 500,
            inbound_queue_max_ms: 40, // 2 frames of budget
            outbound_frame_ms: 20,
        });
        bridge.handle_event(start_event()).await.unwrap();
        // Never drain the inbound receiver, so the channel fills up.

        let media = || {
            CarrierEvent::Media(MediaPayload {
                track: "inbound".into(),
                chunk: "1".into(),
                timestamp: "20".into(),
                payload: STANDARD.encode([0u8; 160]),
            })
        };

        let mut saw_disconnect = false;
        for _ in 0..10 {
            if let Err(MediaError::CarrierTooSlow) = bridge.handle_event(media()).await {
                saw_disconnect = true;
                break;
            }
        }
        assert!(saw_disconnect);
    }
}
