use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tvm::Address;

/// Errors reported by a chain access backend
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("no transaction for message {message_hash} after {waited:?}")]
    ConfirmationTimeout { message_hash: String, waited: Duration },

    #[error("get-method `{method}` failed with exit code {exit_code}")]
    GetMethodFailed { method: String, exit_code: i32 },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// A confirmed transaction carrying the submitted external message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: [u8; 32],
    pub lt: u64,
    pub now: u32,
}

impl TransactionRecord {
    /// Transaction id as handed out to callers: base64 (standard alphabet) of the hash
    pub fn id(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.hash)
    }
}

/// A TVM stack value as exchanged with get-methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    Num(BigUint),
    Cell(String),
    Slice(String),
}

impl StackEntry {
    pub fn as_num(&self) -> Option<&BigUint> {
        match self {
            StackEntry::Num(n) => Some(n),
            _ => None,
        }
    }
}

/// HTTP client parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientParams {
    /// Per-request timeout, seconds
    pub timeout: Option<u64>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Delay between confirmation polls, milliseconds
    pub poll_interval: Option<u64>,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            timeout: Some(5),
            api_key: None,
            base_url: None,
            poll_interval: Some(1500),
        }
    }
}

/// Chain access used by the wallet: account state, submission and confirmation
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Current sequence number of a wallet contract
    async fn get_seqno(&self, address: &Address) -> Result<u32, ApiError>;

    /// Balance in nanotons
    async fn get_balance(&self, address: &Address) -> Result<u64, ApiError>;

    /// Submits a serialized external message (BoC bytes)
    async fn send_message(&self, boc: &[u8]) -> Result<(), ApiError>;

    /// Waits until a transaction with the given inbound message hash appears on `address`
    async fn await_confirmation(
        &self,
        address: &Address,
        message_hash: &[u8; 32],
        timeout: Duration,
    ) -> Result<TransactionRecord, ApiError>;

    async fn run_get_method(
        &self,
        address: &Address,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_standard_alphabet() {
        let record = TransactionRecord {
            hash: [0xfb; 32],
            lt: 1,
            now: 0,
        };
        let id = record.id();
        assert_eq!(id.len(), 44);
        assert!(id.starts_with("+/v7"));
    }

    #[test]
    fn test_client_params_partial_json() {
        let params: ClientParams = serde_json::from_str(r#"{"api_key": "k"}"#).unwrap();
        assert_eq!(params.api_key.as_deref(), Some("k"));
        assert_eq!(params.timeout, Some(5));
        assert_eq!(params.poll_interval, Some(1500));
    }
}
