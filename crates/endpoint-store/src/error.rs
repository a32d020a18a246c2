//! Record store errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Store returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Status code the record store reported for this failure.
    pub fn status(&self) -> u16 {
        match self {
            StoreError::TableNotFound(_) => 404,
            StoreError::InvalidKey(_) => 400,
            StoreError::Status { status, .. } => *status,
            StoreError::Serialization(_) => 500,
        }
    }
}
