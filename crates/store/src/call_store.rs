//! `CallStore`: durable `Call`/`Turn` persistence. Trait-plus-Scylla-impl
//! shape, with the whole record stored as a JSON column, applied here to
//! `Call` (with its `transcript` turns embedded).
//!
//! Writes from the call's hot path are not allowed to block the
//! conversation on a slow database: callers that are off the latency-
//! critical path (e.g. `append_turn`, `attach_recording`) should use
//! [`retry_persist`] rather than propagating a single failed write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::frame::response::result::Row;
use voxloop_core::{Call, CallStatus, Turn};

use crate::client::ScyllaClient;
use crate::error::{Result, StoreError};

/// Mirrors `CallStatus`'s internal ordering so a monotonic check can also
/// be expressed in storage (`status_rank` column), without requiring core
/// to expose its private ranking function.
fn status_rank(status: CallStatus) -> i32 {
    match status {
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

fn status_str(status: CallStatus) -> &'static str {
    match status {
        CallStatus::Init => "init",
        CallStatus::Dialing => "dialing",
        CallStatus::Ringing => "ringing",
        CallStatus::Answered => "answered",
        CallStatus::InProgress => "in_progress",
        CallStatus::Completed => "completed",
        CallStatus::Failed => "failed",
        CallStatus::NoAnswer => "no_answer",
        CallStatus::Busy => "busy",
        CallStatus::Voicemail => "voicemail",
    }
}

#[async_trait]
pub trait CallStore: Send + Sync {
    async fn create_call(&self, call: &Call) -> Result<()>;
    async fn get_call(&self, call_id: &str) -> Result<Option<Call>>;
    /// Persists `call` as-is. The caller (normally `Call::transition_status`
    /// / `append_turn`, already enforced in-process) is the source of
    /// truth for whether the new state is a legal transition; the store
    /// only refuses to overwrite a row whose persisted `status_rank` is
    /// already ahead of the incoming one, guarding against an out-of-order
    /// write landing after a newer one.
    async fn save_call(&self, call: &Call) -> Result<()>;
    async fn append_turn(&self, call_id: &str, turn: &Turn) -> Result<()>;
    async fn attach_recording(&self, call_id: &str, url: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct ScyllaCallStore {
    client: ScyllaClient,
}

impl ScyllaCallStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_call(&self, row: Row) -> Result<Call> {
        let (_call_id, _agent_id, _provider_id, _status, _status_rank, _recording_url, _started_at, _updated_at, call_json): (
            String,
            String,
            String,
            String,
            i32,
            Option<String>,
            i64,
            i64,
            String,
        ) = row.into_typed().map_err(|e| StoreError::InvalidData(e.to_string()))?;

        serde_json::from_str(&call_json).map_err(|e| StoreError::InvalidData(e.to_string()))
    }
}

#[async_trait]
impl CallStore for ScyllaCallStore {
    async fn create_call(&self, call: &Call) -> Result<()> {
        let query = format!(
            "INSERT INTO {}.calls (
                call_id, agent_id, provider_id, status, status_rank,
                recording_url, started_at, updated_at, call_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        let now = Utc::now();
        let call_json = serde_json::to_string(call).map_err(|e| StoreError::InvalidData(e.to_string()))?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &call.id,
                    &call.agent_id,
                    &call.provider_id,
                    status_str(call.status),
                    status_rank(call.status),
                    &call.recording_url,
                    call.started_at.timestamp_millis(),
                    now.timestamp_millis(),
                    call_json,
                ),
            )
            .await?;

        tracing::info!(call_id = %call.id, agent_id = %call.agent_id, "call created in store");
        Ok(())
    }

    async fn get_call(&self, call_id: &str) -> Result<Option<Call>> {
        let query = format!(
            "SELECT call_id, agent_id, provider_id, status, status_rank,
                    recording_url, started_at, updated_at, call_json
             FROM {}.calls WHERE call_id = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (call_id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                return Ok(Some(self.row_to_call(row)?));
            }
        }

        Ok(None)
    }

    async fn save_call(&self, call: &Call) -> Result<()> {
        if let Some(existing) = self.get_call(&call.id).await? {
            if status_rank(call.status) < status_rank(existing.status) {
                tracing::warn!(
                    call_id = %call.id,
                    incoming = ?call.status,
                    existing = ?existing.status,
                    "refusing to persist stale call status"
                );
                return Ok(());
            }
        }

        let query = format!(
            "UPDATE {}.calls SET
                agent_id = ?, provider_id = ?, status = ?, status_rank = ?,
                recording_url = ?, updated_at = ?, call_json = ?
             WHERE call_id = ?",
            self.client.keyspace()
        );

        let call_json = serde_json::to_string(call).map_err(|e| StoreError::InvalidData(e.to_string()))?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &call.agent_id,
                    &call.provider_id,
                    status_str(call.status),
                    status_rank(call.status),
                    &call.recording_url,
                    Utc::now().timestamp_millis(),
                    call_json,
                    &call.id,
                ),
            )
            .await?;

        Ok(())
    }

    async fn append_turn(&self, call_id: &str, turn: &Turn) -> Result<()> {
        let mut call = self
            .get_call(call_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(call_id.to_string()))?;

        call.append_turn(turn.clone())?;
        self.save_call(&call).await
    }

    async fn attach_recording(&self, call_id: &str, url: &str) -> Result<()> {
        let mut call = self
            .get_call(call_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(call_id.to_string()))?;

        call.attach_recording(url);
        self.save_call(&call).await
    }
}

/// Retries a non-critical-path store write up to 3 times with a short
/// backoff, logging (rather than propagating) a final failure. Spec §7:
/// persistence failures must never interrupt a live conversation.
pub async fn retry_persist<F, Fut>(operation: &str, call_id: &str, mut f: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    const ATTEMPTS: u32 = 3;
    let mut last_err = None;

    for attempt in 1..=ATTEMPTS {
        match f().await {
            Ok(()) => return,
            Err(e) => {
                tracing::warn!(call_id, operation, attempt, error = %e, "store write failed, retrying");
                last_err = Some(e);
                tokio::time::sleep(std::time::Duration::from_millis(50 * attempt as u64)).await;
            }
        }
    }

    tracing::error!(
        call_id,
        operation,
        error = ?last_err,
        "store write failed after retries, giving up without interrupting the call"
    );
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_rank_matches_core_ordering() {
        assert!(status_rank(CallStatus::Init) < status_rank(CallStatus::Dialing));
        assert!(status_rank(CallStatus::Dialing) < status_rank(CallStatus::InProgress));
        assert_eq!(status_rank(CallStatus::Completed), status_rank(CallStatus::Failed));
        assert_eq!(status_rank(CallStatus::Completed), status_rank(CallStatus::Voicemail));
    }

    #[tokio::test]
    async fn retry_persist_gives_up_after_three_attempts() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let attempts = AtomicU32::new(0);

        retry_persist("test_op", "call-1", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Query("boom".into())) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
