//! Durable `Call`/`Turn` persistence on ScyllaDB.
//!
//! A `Call` (with its `Turn` transcript embedded) is stored as a single
//! row: the whole record serialized as a JSON blob in one column, with a handful of indexed
//! scalar columns (`status`, `status_rank`) alongside it for cheap
//! filtering without a full deserialize.

pub mod call_store;
pub mod client;
pub mod error;
pub mod memory;
pub mod schema;

pub use call_store::{retry_persist, CallStore, ScyllaCallStore};
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::{Result, StoreError};
pub use memory::InMemoryCallStore;

/// Connects to ScyllaDB, ensures the `calls` table exists, and returns a
/// ready-to-use [`ScyllaCallStore`].
pub async fn init(config: ScyllaConfig) -> Result<ScyllaCallStore> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaCallStore::new(client))
}
