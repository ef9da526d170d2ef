use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("scylla connection error: {0}")]
    Connection(String),

    #[error("schema migration error: {0}")]
    Schema(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("stored call record is corrupt: {0}")]
    InvalidData(String),

    #[error("no call found with id {0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] voxloop_core::CoreError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<scylla::transport::errors::NewSessionError> for StoreError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

impl From<scylla::transport::errors::QueryError> for StoreError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        StoreError::Query(err.to_string())
    }
}
