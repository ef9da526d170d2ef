//! Energy-threshold VAD with a silence-hangover timer.
//!
//! Mutable per-call state lives behind a single `parking_lot::Mutex` rather
//! than split across several fields — at one call per frame and several
//! frames a second, one lock acquisition per `process_frame` beats juggling
//! independent locks for each counter.

use crate::config::VadConfig;
use voxloop_codec::AudioFrame;

#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    SpeechStart,
    AudioChunk(AudioFrame),
    SpeechEnd { silence_duration_ms: u64 },
}

#[derive(Debug, Default)]
struct VadMutableState {
    in_speech: bool,
    speech_ms_accum: u64,
    silence_ms_accum: u64,
}

pub struct VoiceActivityDetector {
    config: VadConfig,
    state: parking_lot::Mutex<VadMutableState>,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            state: parking_lot::Mutex::new(VadMutableState::default()),
        }
    }

    /// Feed one frame, returning zero or more events in arrival order.
    pub fn process_frame(&self, frame: AudioFrame) -> Vec<VadEvent> {
        let frame_ms = frame.duration_ms();
        let above_threshold = frame.energy_db >= self.config.energy_threshold_db;

        let mut state = self.state.lock();
        let mut events = Vec::with_capacity(2);

        if above_threshold {
            state.silence_ms_accum = 0;

            if state.in_speech {
                events.push(VadEvent::AudioChunk(frame));
            } else {
                state.speech_ms_accum += frame_ms;
                if state.speech_ms_accum >= self.config.min_speech_ms {
                    state.in_speech = true;
                    state.speech_ms_accum = 0;
                    events.push(VadEvent::SpeechStart);
                    events.push(VadEvent::AudioChunk(frame));
                }
            }
        } else if state.in_speech {
            state.silence_ms_accum += frame_ms;
            if state.silence_ms_accum >= self.config.silence_hangover_ms {
                let silence_duration_ms = state.silence_ms_accum;
                state.in_speech = false;
                state.silence_ms_accum = 0;
                events.push(VadEvent::SpeechEnd { silence_duration_ms });
            } else {
                events.push(VadEvent::AudioChunk(frame));
            }
        } else {
            state.speech_ms_accum = 0;
        }

        events
    }

    pub fn is_speaking(&self) -> bool {
        self.state.lock().in_speech
    }

    /// Reset to initial silence state, used between calls when the detector
    /// is reused.
    pub fn reset(&self) {
        *self.state.lock() = VadMutableState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxloop_codec::{Channels, SampleRate};

    fn frame(energy_samples: &[f32]) -> AudioFrame {
        // 20ms @ 16kHz = 320 samples.
        let mut samples = energy_samples.to_vec();
        samples.resize(320, *energy_samples.last().unwrap_or(&0.0));
        AudioFrame::new(samples, SampleRate::Hz16000, Channels::Mono, 0)
    }

    fn silent_frame() -> AudioFrame {
        frame(&vec![0.0; 320])
    }

    fn loud_frame() -> AudioFrame {
        frame(&vec![0.5; 320])
    }

    #[test]
    fn speech_start_requires_sustained_energy() {
        let vad = VoiceActivityDetector::new(VadConfig {
            min_speech_ms: 40,
            ..VadConfig::default()
        });

        // First 20ms loud frame alone should not cross min_speech_ms=40.
        let events = vad.process_frame(loud_frame());
        assert!(events.is_empty());

        // Second consecutive loud frame crosses the threshold.
        let events = vad.process_frame(loud_frame());
        assert!(matches!(events[0], VadEvent::SpeechStart));
        assert!(matches!(events[1], VadEvent::AudioChunk(_)));
    }

    #[test]
    fn speech_end_after_hangover_exactly_once() {
        let vad = VoiceActivityDetector::new(VadConfig {
            min_speech_ms: 20,
            silence_hangover_ms: 40,
            ..VadConfig::default()
        });

        vad.process_frame(loud_frame()); // crosses min_speech_ms, SpeechStart
        assert!(vad.is_speaking());

        vad.process_frame(silent_frame()); // 20ms silence, below hangover
        assert!(vad.is_speaking());

        let events = vad.process_frame(silent_frame()); // 40ms silence total
        assert!(matches!(events[0], VadEvent::SpeechEnd { .. }));
        assert!(!vad.is_speaking());

        // A further silent frame must not emit a second SpeechEnd.
        let events = vad.process_frame(silent_frame());
        assert!(events.is_empty());
    }

    #[test]
    fn resets_pre_speech_accumulation_on_dropout() {
        let vad = VoiceActivityDetector::new(VadConfig {
            min_speech_ms: 60,
            ..VadConfig::default()
        });

        vad.process_frame(loud_frame()); // 20ms accumulated
        vad.process_frame(silent_frame()); // dropout resets accumulator
        let events = vad.process_frame(loud_frame()); // only 20ms again
        assert!(events.is_empty());
    }
}
