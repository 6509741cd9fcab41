//! Error types for the vault funder

use alloy::rpc::json_rpc::RpcError;
use alloy::transports::TransportError;
use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the vault funder
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Deterministic JSON-RPC error response, e.g. `execution reverted`
    #[error("Call rejected by node: {0}")]
    CallRejected(String),

    #[error("RPC timeout after {0}ms")]
    RpcTimeout(u64),

    #[error("Chain id mismatch: expected {expected}, node reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    // Transaction errors
    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    #[error("Transaction reverted: {0}")]
    TransactionReverted(String),

    #[error("Transaction {0} not final after {1}s")]
    FinalityTimeout(String, u64),

    // Orchestration errors
    #[error("Vault resolution failed: {0}")]
    Resolution(String),

    #[error("Vault state report failed: {0}")]
    Reporting(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    ///
    /// Only read calls are ever retried. A reverted or dropped write is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Rpc(_) | Error::RpcTimeout(_))
    }

    /// Wrap any error as a resolution failure, keeping its message
    pub fn into_resolution(self) -> Self {
        match self {
            Error::Resolution(_) => self,
            other => Error::Resolution(other.to_string()),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        match e {
            // The node answered; asking again gives the same answer
            RpcError::ErrorResp(payload) => Error::CallRejected(payload.to_string()),
            other => Error::Rpc(other.to_string()),
        }
    }
}

impl From<alloy::contract::Error> for Error {
    fn from(e: alloy::contract::Error) -> Self {
        match e {
            alloy::contract::Error::TransportError(t) => Error::from(t),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("JSON error: {}", e))
    }
}
