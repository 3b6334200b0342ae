//! Wallet service configuration
//!
//! Loaded from JSON; every field except the wallet address and secret key has
//! a default.
//!
//! ```json
//! {
//!     "address": "UQ...",
//!     "secret_key": "<hex seed>",
//!     "network_global_id": -239,
//!     "client": { "api_key": "...", "base_url": "https://toncenter.com/api/v3" }
//! }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{ApiError, ClientParams};
use crate::messages::{DEFAULT_FORWARD_AMOUNT, DEFAULT_FORWARD_RESERVE, TransferOptions};
use crate::tvm::{Address, AddressError};
use crate::wallet::{Ed25519Signer, KeyError, WalletId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid wallet address: {0}")]
    Address(#[from] AddressError),

    #[error("invalid secret key: {0}")]
    SecretKey(#[from] KeyError),

    #[error("cannot create client: {0}")]
    Client(#[from] ApiError),
}

#[derive(Derivative, Clone, Serialize, Deserialize)]
#[derivative(Debug)]
#[serde(default)]
pub struct WalletConfig {
    /// Address of the deployed V5R1 wallet contract
    pub address: String,
    /// Hex Ed25519 seed (or `seed || public key`)
    #[derivative(Debug = "ignore")]
    pub secret_key: String,
    pub network_global_id: i32,
    pub workchain: i8,
    pub subwallet: u16,
    /// Envelope lifetime, seconds
    pub message_ttl: u64,
    /// Value attached to each token transfer message, nanotons
    pub forward_reserve: u128,
    /// `forward_ton_amount` of each transfer, nanotons
    pub forward_amount: u128,
    /// Confirmation wait, seconds
    pub confirmation_timeout: u64,
    pub client: ClientParams,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            secret_key: String::new(),
            network_global_id: WalletId::MAINNET_GLOBAL_ID,
            workchain: 0,
            subwallet: 0,
            message_ttl: 60,
            forward_reserve: DEFAULT_FORWARD_RESERVE,
            forward_amount: DEFAULT_FORWARD_AMOUNT,
            confirmation_timeout: 60,
            client: ClientParams::default(),
        }
    }
}

impl WalletConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("Loading config from {}", path.display());
        std::fs::read_to_string(path)?.parse()
    }

    pub fn wallet_address(&self) -> Result<Address, ConfigError> {
        Ok(Address::parse(&self.address)?)
    }

    pub fn signer(&self) -> Result<Ed25519Signer, ConfigError> {
        Ok(Ed25519Signer::from_hex(&self.secret_key)?)
    }

    pub fn wallet_id(&self) -> WalletId {
        WalletId {
            network_global_id: self.network_global_id,
            workchain: self.workchain,
            subwallet: self.subwallet,
        }
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            forward_reserve: self.forward_reserve,
            forward_amount: self.forward_amount,
        }
    }

    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout)
    }
}

impl FromStr for WalletConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}
