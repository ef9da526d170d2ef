//! In-memory [`CallStore`], for tests and for running the server without a
//! ScyllaDB cluster on hand. Same monotonic-status-guard semantics as
//! [`crate::call_store::ScyllaCallStore`], backed by a `DashMap` instead of
//! a wide-column table.

use async_trait::async_trait;
use dashmap::DashMap;
use voxloop_core::{Call, Turn};

use crate::call_store::CallStore;
use crate::error::{Result, StoreError};

#[derive(Default)]
pub struct InMemoryCallStore {
    calls: DashMap<String, Call>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn create_call(&self, call: &Call) -> Result<()> {
        self.calls.insert(call.id.clone(), call.clone());
        Ok(())
    }

    async fn get_call(&self, call_id: &str) -> Result<Option<Call>> {
        Ok(self.calls.get(call_id).map(|c| c.clone()))
    }

    async fn save_call(&self, call: &Call) -> Result<()> {
        let mut entry = self.calls.entry(call.id.clone());
        match &mut entry {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                if status_rank(call.status) < status_rank(existing.get().status) {
                    tracing::warn!(
                        call_id = %call.id,
                        incoming = ?call.status,
                        existing = ?existing.get().status,
                        "refusing to persist stale call status"
                    );
                    return Ok(());
                }
                existing.insert(call.clone());
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(call.clone());
            }
        }
        Ok(())
    }

    async fn append_turn(&self, call_id: &str, turn: &Turn) -> Result<()> {
        let mut call = self
            .calls
            .get_mut(call_id)
            .ok_or_else(|| StoreError::NotFound(call_id.to_string()))?;
        call.append_turn(turn.clone())?;
        Ok(())
    }

    async fn attach_recording(&self, call_id: &str, url: &str) -> Result<()> {
        let mut call = self
            .calls
            .get_mut(call_id)
            .ok_or_else(|| StoreError::NotFound(call_id.to_string()))?;
        call.attach_recording(url);
        Ok(())
    }
}

/// Mirrors `call_store::status_rank`; kept private-per-module rather than
/// shared since `CallStatus`'s own ranking stays intentionally unexported.
fn status_rank(status: voxloop_core::CallStatus) -> u8 {
    use voxloop_core::CallStatus::*;
    match status {
        Init => 0,
        Dialing => 1,
        Ringing => 2,
        Answered => 3,
        InProgress => 4,
        Completed | Failed | NoAnswer | Busy | Voicemail => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use voxloop_core::{CallDirection, CallStatus};

    fn call() -> Call {
        Call::new("c1", "a1", "p1", "+15550000000", "+15551230001", CallDirection::Outbound, Utc::now())
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryCallStore::new();
        let c = call();
        store.create_call(&c).await.unwrap();
        let fetched = store.get_call(&c.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, c.id);
    }

    #[tokio::test]
    async fn get_missing_call_returns_none() {
        let store = InMemoryCallStore::new();
        assert!(store.get_call("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_refuses_stale_status() {
        let store = InMemoryCallStore::new();
        let mut c = call();
        c.transition_status(CallStatus::InProgress, c.started_at);
        store.create_call(&c).await.unwrap();

        let mut stale = c.clone();
        stale.status = CallStatus::Dialing;
        store.save_call(&stale).await.unwrap();

        let fetched = store.get_call(&c.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, CallStatus::InProgress);
    }

    #[tokio::test]
    async fn append_turn_on_missing_call_errors() {
        let store = InMemoryCallStore::new();
        let turn = Turn {
            turn_number: 1,
            user_text: "hi".into(),
            agent_text: None,
            stage: voxloop_core::Stage::Awareness,
            profile: voxloop_core::CustomerProfile::Analytical,
            objections: vec![],
            applied_principle: voxloop_core::Principle::Liking,
            language: voxloop_core::Language::En,
            sentiment: 0.0,
            filler_clip_id: None,
            timestamp: Utc::now(),
        };
        assert!(store.append_turn("missing", &turn).await.is_err());
    }
}
