//! Error types for message composition and batched submission

use std::time::Duration;

use thiserror::Error;

use crate::client::ApiError;
use crate::tvm::{AddressError, CellError};

/// Failure to encode a single transfer instruction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Cell(#[from] CellError),

    #[error("transfer amount must be greater than zero")]
    ZeroAmount,

    #[error("amount {0} does not fit into 120 bits")]
    AmountOverflow(u128),

    #[error("comment of {len} bytes exceeds the {max} byte limit")]
    CommentTooLong { len: usize, max: usize },
}

/// Failure of a batched transfer
#[derive(Debug, Error)]
pub enum TransferError {
    /// Instruction `index` (zero-based, input order) could not be encoded
    #[error("instruction #{index}: {source}")]
    Encoding {
        index: usize,
        #[source]
        source: EncodingError,
    },

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("batch is empty")]
    EmptyBatch,

    #[error("batch of {count} messages exceeds the wallet limit of {max}")]
    TooManyMessages { count: usize, max: usize },

    #[error("submission rejected: {reason}")]
    SubmissionRejected { reason: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The envelope was submitted but no transaction was observed in time.
    ///
    /// **The envelope may still be included on chain.** Resubmitting the
    /// same instructions without first checking the wallet seqno or looking
    /// up `message_hash` can execute the transfers twice.
    #[error("no confirmation for message {message_hash} after {waited:?}")]
    ConfirmationTimeout { message_hash: String, waited: Duration },

    #[error("get-method `{method}` failed with exit code {exit_code}")]
    GetMethodFailed { method: String, exit_code: i32 },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("unexpected chain response: {0}")]
    InvalidResponse(String),
}

impl From<ApiError> for TransferError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(e) => TransferError::Network(e),
            ApiError::AccountNotFound(a) => TransferError::AccountNotFound(a),
            ApiError::Rejected(reason) => TransferError::SubmissionRejected { reason },
            ApiError::ConfirmationTimeout {
                message_hash,
                waited,
            } => TransferError::ConfirmationTimeout {
                message_hash,
                waited,
            },
            ApiError::GetMethodFailed { method, exit_code } => {
                TransferError::GetMethodFailed { method, exit_code }
            }
            ApiError::InvalidResponse(e) => TransferError::InvalidResponse(e),
        }
    }
}

/// Cell errors outside instruction encoding (envelope assembly) mean the
/// composition itself is wrong, not the caller's input.
impl From<CellError> for TransferError {
    fn from(err: CellError) -> Self {
        TransferError::InvariantViolation(err.to_string())
    }
}
