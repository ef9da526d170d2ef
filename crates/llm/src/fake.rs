//! An in-memory `LlmSession` double for tests that don't want a live
//! WebSocket: a scripted queue of `LlmEvent`s played back on `next_event`,
//! with calls recorded for assertions.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::event::LlmEvent;
use crate::session::LlmSession;

#[derive(Default)]
pub struct FakeCallLog {
    pub audio_frames_sent: usize,
    pub texts_sent: Vec<String>,
    pub instructions: Vec<String>,
    pub cancels: usize,
}

pub struct FakeLlmSession {
    events_rx: Mutex<mpsc::UnboundedReceiver<LlmEvent>>,
    log: Mutex<FakeCallLog>,
}

impl FakeLlmSession {
    pub fn new(scripted_events: Vec<LlmEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in scripted_events {
            let _ = tx.send(event);
        }
        Self { events_rx: Mutex::new(rx), log: Mutex::new(FakeCallLog::default()) }
    }

    pub fn log(&self) -> parking_lot::MutexGuard<'_, FakeCallLog> {
        self.log.lock()
    }
}

#[async_trait]
impl LlmSession for FakeLlmSession {
    async fn send_audio(&self, _pcm16_16k: &[u8]) -> Result<()> {
        self.log.lock().audio_frames_sent += 1;
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.log.lock().texts_sent.push(text.to_string());
        Ok(())
    }

    async fn update_system_instruction(&self, instruction: &str) -> Result<()> {
        self.log.lock().instructions.push(instruction.to_string());
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.log.lock().cancels += 1;
        Ok(())
    }

    async fn next_event(&self) -> Option<LlmEvent> {
        self.events_rx.lock().recv().await
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plays_back_scripted_events_in_order() {
        let fake = FakeLlmSession::new(vec![LlmEvent::ResponseStart, LlmEvent::ResponseComplete]);
        assert!(matches!(fake.next_event().await, Some(LlmEvent::ResponseStart)));
        assert!(matches!(fake.next_event().await, Some(LlmEvent::ResponseComplete)));
        assert!(fake.next_event().await.is_none());
    }

    #[tokio::test]
    async fn records_calls_for_assertions() {
        let fake = FakeLlmSession::new(vec![]);
        fake.send_audio(&[0u8; 4]).await.unwrap();
        fake.cancel().await.unwrap();
        fake.update_system_instruction("be terse").await.unwrap();
        let log = fake.log();
        assert_eq!(log.audio_frames_sent, 1);
        assert_eq!(log.cancels, 1);
        assert_eq!(log.instructions, vec!["be terse".to_string()]);
    }
}
