//! Batched jetton and NFT transfers from a V5R1 wallet
//!
//! [`Wallet`] ties the pieces together: instructions are composed into
//! internal messages ([`crate::messages`]), packed into one signed
//! [`Envelope`] by the [`BatchSender`] and submitted through the account's
//! [`ChainApi`](crate::client::ChainApi). The result of a successful transfer
//! is the base64 hash of the wallet transaction.

pub mod account;
pub mod envelope;
pub mod sender;
pub mod signer;


use std::sync::Arc;
use std::time::Duration;

use crate::client::{ChainApi, ToncenterV3Client};
use crate::config::{ConfigError, WalletConfig};
use crate::error::TransferError;
use crate::messages::{InternalMessage, JettonTransfer, NftTransfer, TransferOptions};
use crate::tvm::Address;

pub use account::{WalletAccount, WalletAccountState};
pub use envelope::{Envelope, MAX_MESSAGES, SignedEnvelope, WalletId};
pub use sender::{BatchSender, DEFAULT_MESSAGE_TTL};
pub use signer::{Ed25519Signer, KeyError, Signer};

/// Handle for sending token transfers from one wallet
#[derive(Debug)]
pub struct Wallet {
    account: WalletAccount,
    sender: BatchSender,
    options: TransferOptions,
}

impl Wallet {
    pub fn new(account: WalletAccount, sender: BatchSender, options: TransferOptions) -> Self {
        Self {
            account,
            sender,
            options,
        }
    }

    /// Wallet backed by the toncenter v3 API
    pub fn from_config(config: &WalletConfig) -> Result<Self, ConfigError> {
        let api: Arc<dyn ChainApi> = Arc::new(ToncenterV3Client::new(Some(config.client.clone()))?);
        Self::with_api(config, api)
    }

    /// Wallet using the given chain backend
    pub fn with_api(config: &WalletConfig, api: Arc<dyn ChainApi>) -> Result<Self, ConfigError> {
        let account = WalletAccount::new(config.wallet_address()?, Arc::new(config.signer()?), api);
        let sender = BatchSender::new(config.wallet_id(), config.message_ttl());

        log::debug!("Wallet {:?} ready", account);
        Ok(Self::new(account, sender, config.transfer_options()))
    }

    pub fn account(&self) -> &WalletAccount {
        &self.account
    }

    pub fn address(&self) -> &Address {
        self.account.address()
    }

    /// Balance in nanotons
    pub async fn balance(&self) -> Result<u64, TransferError> {
        self.account.balance().await
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.account.public_key()
    }

    pub async fn public_key_of(&self, wallet: &Address) -> Result<[u8; 32], TransferError> {
        self.account.public_key_of(wallet).await
    }

    /// Composes one message per jetton payout, in input order
    pub fn compose_jetton_transfers(
        &self,
        jetton_wallet: &Address,
        response: &Address,
        transfers: &[JettonTransfer],
    ) -> Result<Vec<InternalMessage>, TransferError> {
        transfers
            .iter()
            .enumerate()
            .map(|(index, transfer)| {
                transfer
                    .compose(jetton_wallet, response, &self.options)
                    .map_err(|source| TransferError::Encoding { index, source })
            })
            .collect()
    }

    /// Composes one message per NFT transfer, in input order
    pub fn compose_nft_transfers(
        &self,
        response: &Address,
        transfers: &[NftTransfer],
    ) -> Result<Vec<InternalMessage>, TransferError> {
        transfers
            .iter()
            .enumerate()
            .map(|(index, transfer)| {
                transfer
                    .compose(response, &self.options)
                    .map_err(|source| TransferError::Encoding { index, source })
            })
            .collect()
    }

    /// Sends jettons held by `jetton_wallet` (the sender's jetton wallet contract)
    /// in one envelope. `response` receives the excess gas.
    ///
    /// Returns the base64 hash of the confirmed wallet transaction.
    pub async fn transfer_jetton(
        &self,
        jetton_wallet: &str,
        response: &str,
        transfers: &[JettonTransfer],
        timeout: Duration,
    ) -> Result<String, TransferError> {
        let jetton_wallet = Address::parse(jetton_wallet)?;
        let response = Address::parse(response)?;

        let messages = self.compose_jetton_transfers(&jetton_wallet, &response, transfers)?;
        log::debug!(
            "Composed {} jetton transfer(s) via {}",
            messages.len(),
            jetton_wallet
        );

        let record = self
            .sender
            .send_and_wait(&self.account, messages, timeout)
            .await?;
        Ok(record.id())
    }

    /// Transfers NFT items in one envelope. `response` receives the excess gas.
    ///
    /// Returns the base64 hash of the confirmed wallet transaction.
    pub async fn transfer_nft(
        &self,
        response: &str,
        transfers: &[NftTransfer],
        timeout: Duration,
    ) -> Result<String, TransferError> {
        let response = Address::parse(response)?;

        let messages = self.compose_nft_transfers(&response, transfers)?;
        log::debug!("Composed {} NFT transfer(s)", messages.len());

        let record = self
            .sender
            .send_and_wait(&self.account, messages, timeout)
            .await?;
        Ok(record.id())
    }
}
