use std::time::Duration;

use tokio::time::Instant;

use crate::client::{ApiError, TransactionRecord};
use crate::error::TransferError;
use crate::messages::InternalMessage;
use crate::tvm::serialize_boc;
use crate::wallet::account::WalletAccount;
use crate::wallet::envelope::{Envelope, WalletId, check_batch_size};

/// Default lifetime of a signed envelope
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(60);

/// Packs composed messages into one signed envelope, submits it and waits
/// for the wallet transaction that executes it
#[derive(Debug, Clone)]
pub struct BatchSender {
    wallet_id: WalletId,
    message_ttl: Duration,
}

impl BatchSender {
    pub fn new(wallet_id: WalletId, message_ttl: Duration) -> Self {
        Self {
            wallet_id,
            message_ttl,
        }
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    /// Envelope valid for `message_ttl` from `now` (unix seconds)
    pub fn build_envelope(
        &self,
        messages: Vec<InternalMessage>,
        seqno: u32,
        now: u32,
    ) -> Result<Envelope, TransferError> {
        let valid_until = now.saturating_add(self.message_ttl.as_secs() as u32);
        Envelope::new(messages, seqno, self.wallet_id.id(), valid_until)
    }

    /// Signs and submits `messages` as one envelope and waits at most `timeout`
    /// (counted from this call) for its transaction.
    ///
    /// The envelope is submitted exactly once. A [`TransferError::ConfirmationTimeout`]
    /// does not mean the transfer failed.
    pub async fn send_and_wait(
        &self,
        account: &WalletAccount,
        messages: Vec<InternalMessage>,
        timeout: Duration,
    ) -> Result<TransactionRecord, TransferError> {
        check_batch_size(messages.len())?;
        let deadline = Instant::now() + timeout;

        let _guard = account.lock_submission().await;

        let seqno = account.seqno().await?;
        let now = chrono::Utc::now().timestamp().max(0) as u32;
        let count = messages.len();
        let envelope = self.build_envelope(messages, seqno, now)?;

        let signed = envelope.sign(account.signer())?;
        let external = signed.external_message(account.address())?;
        let message_hash = external.hash();
        let boc = serialize_boc(&external, true)?;

        log::info!(
            "Submitting {} message(s) from {} with seqno {} (message hash {})",
            count,
            account.address(),
            seqno,
            hex::encode(message_hash)
        );
        account.api().send_message(&boc).await?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransferError::ConfirmationTimeout {
                message_hash: hex::encode(message_hash),
                waited: timeout,
            });
        }

        let wait_started = Instant::now();
        let confirmation = account
            .api()
            .await_confirmation(account.address(), &message_hash, remaining);
        let record = match tokio::time::timeout(remaining, confirmation).await {
            Ok(result) => result.map_err(|e| match e {
                ApiError::ConfirmationTimeout { message_hash, .. } => {
                    TransferError::ConfirmationTimeout {
                        message_hash,
                        waited: timeout,
                    }
                }
                e => e.into(),
            })?,
            Err(_) => {
                return Err(TransferError::ConfirmationTimeout {
                    message_hash: hex::encode(message_hash),
                    waited: timeout,
                });
            }
        };

        log::info!(
            "⏱️  Confirmed seqno {} in {:.3}s: transaction {}",
            seqno,
            wait_started.elapsed().as_secs_f64(),
            record.id()
        );
        account.record_confirmed(seqno).await;

        Ok(record)
    }
}

impl Default for BatchSender {
    fn default() -> Self {
        Self::new(WalletId::mainnet(0), DEFAULT_MESSAGE_TTL)
    }
}
