//! ScyllaDB schema for the `calls` table: one row per `Call`, its `Turn`
//! sequence embedded as a JSON blob — one document per call, containing
//! embedded turns. `status_rank` mirrors `CallStatus::rank()` so a lightweight transaction
//! can enforce monotonic transitions at the storage layer too, in addition
//! to the in-process check `Call::transition_status` already does.

use scylla::Session;

use crate::error::Result;

pub async fn create_keyspace(session: &Session, keyspace: &str, replication_factor: u8) -> Result<()> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );
    session.query_unpaged(query, &[]).await?;
    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<()> {
    let calls_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.calls (
            call_id TEXT PRIMARY KEY,
            agent_id TEXT,
            provider_id TEXT,
            status TEXT,
            status_rank INT,
            recording_url TEXT,
            started_at TIMESTAMP,
            updated_at TIMESTAMP,
            call_json TEXT
        )
    "#,
        keyspace
    );
    session.query_unpaged(calls_table, &[]).await?;

    tracing::info!("call store schema created");
    Ok(())
}
